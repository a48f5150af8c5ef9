pub mod bbox;
pub mod config;
pub mod controller;
pub mod grid;
pub mod parse_rle;
pub mod rule_set;
pub mod scheduler;
pub mod shared;

mod parse_util;

pub type WorldOffset = i64;

/// A cell position on the unbounded grid.
pub type Pos = (WorldOffset, WorldOffset);
