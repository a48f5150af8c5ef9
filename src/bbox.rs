use core::fmt::Debug;
use std::ops::RangeInclusive;

use crate::Pos;
use crate::WorldOffset;

/// Integer Axis-Aligned Bounding Box. Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    pub min_x: WorldOffset,
    pub min_y: WorldOffset,
    pub max_x: WorldOffset,
    pub max_y: WorldOffset,
}

impl Aabb {
    /// The box covering the single position `p`.
    pub const fn point((x, y): Pos) -> Self {
        Aabb {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Tight box around `points`. There is no box around nothing, so this is `None` for an empty
    /// iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Pos>,
    {
        let mut points = points.into_iter();
        let mut b = Aabb::point(*points.next()?);

        for p in points {
            b.add(p);
        }

        Some(b)
    }

    /// Grow the box so that it covers `p`.
    pub fn add(&mut self, &(x, y): &Pos) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// The box pushed out by `n` cells on every side, stopping at the edge of the world.
    pub const fn expand(&self, n: WorldOffset) -> Self {
        Aabb {
            min_x: self.min_x.saturating_sub(n),
            min_y: self.min_y.saturating_sub(n),
            max_x: self.max_x.saturating_add(n),
            max_y: self.max_y.saturating_add(n),
        }
    }

    pub fn contains(&self, &(x, y): &Pos) -> bool {
        self.xs().contains(&x) && self.ys().contains(&y)
    }

    /// Whether `other` lies entirely within `self`.
    pub fn encloses(&self, other: &Aabb) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn xs(&self) -> RangeInclusive<WorldOffset> {
        self.min_x..=self.max_x
    }

    pub fn ys(&self) -> RangeInclusive<WorldOffset> {
        self.min_y..=self.max_y
    }

    pub fn width(&self) -> u64 {
        self.max_x.abs_diff(self.min_x).saturating_add(1)
    }

    pub fn height(&self) -> u64 {
        self.max_y.abs_diff(self.min_y).saturating_add(1)
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;

    #[test]
    fn from_no_points() {
        assert_eq!(Aabb::from_points(&[]), None);
    }

    #[test]
    fn tight_around_points() {
        let b = Aabb::from_points(&[(4, 4), (4, 1), (-1, 1), (1, 6)]).unwrap();

        assert_eq!(
            b,
            Aabb {
                min_x: -1,
                min_y: 1,
                max_x: 4,
                max_y: 6
            }
        );
        assert_eq!((b.width(), b.height()), (6, 6));
    }

    #[test]
    fn expand_encloses() {
        let b = Aabb::point((0, 0));
        let e = b.expand(1);

        assert!(e.encloses(&b));
        assert!(!b.encloses(&e));
        assert!(e.contains(&(-1, 1)));
        assert!(!e.contains(&(2, 0)));
    }

    #[test]
    fn expand_stops_at_world_edge() {
        let b = Aabb::point((i64::MAX, i64::MIN)).expand(1);

        assert_eq!(
            b,
            Aabb {
                min_x: i64::MAX - 1,
                min_y: i64::MIN,
                max_x: i64::MAX,
                max_y: i64::MIN + 1
            }
        );

        let world = Aabb {
            min_x: i64::MIN,
            min_y: 0,
            max_x: i64::MAX,
            max_y: 0,
        };
        assert_eq!(world.width(), u64::MAX);
    }
}
