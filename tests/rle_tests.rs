use std::collections::HashSet;

use sparse_life::Pos;
use sparse_life::grid::GridState;
use sparse_life::parse_rle;
use sparse_life::rule_set::B3S23;

#[test]
fn test_patterns() -> anyhow::Result<()> {
    let pattern_dir = std::fs::read_dir("tests/rle_pats")?;
    let mut tested = 0;
    let mut failed = Vec::new();

    for entry in pattern_dir {
        let path = entry?.path();
        let bytes = std::fs::read(&path)?;

        match parse_rle::read_pattern(&bytes) {
            Ok(pattern) if pattern.grid.is_empty() => {
                failed.push((path.clone(), anyhow::anyhow!("no live cells")))
            }
            Ok(_) => tested += 1,
            Err(e) => failed.push((path.clone(), e.into())),
        }
    }

    if !failed.is_empty() {
        for (path, err) in &failed {
            eprintln!("Failed to parse {:?}: {:#}", path, err);
        }

        panic!(
            "{}/{} patterns failed to parse",
            failed.len(),
            tested + failed.len()
        );
    }

    println!("Successfully parsed {} RLE patterns", tested);

    Ok(())
}

fn load(name: &str) -> anyhow::Result<parse_rle::Pattern> {
    let bytes = std::fs::read(format!("tests/rle_pats/{name}"))?;

    Ok(parse_rle::read_pattern(&bytes)?)
}

#[test]
fn gosper_gun_emits_a_glider() -> anyhow::Result<()> {
    let pattern = load("gosperglidergun.rle")?;
    let mut grid = pattern.grid;

    assert_eq!(pattern.name.as_deref(), Some("Gosper glider gun"));
    assert_eq!(grid.len(), 36);

    let start = grid.bounding_box()?;
    assert_eq!((start.width(), start.height()), (36, 9));

    for _ in 0..30 {
        grid.step()?;
    }

    // One period later the gun is back, plus the 5 cells of the glider it fired.
    assert_eq!(grid.len(), 41);
    assert!(grid.bounding_box()?.encloses(&start));

    Ok(())
}

#[test]
fn crlf_blinker_oscillates() -> anyhow::Result<()> {
    let pattern = load("blinker.rle")?;
    let mut grid = pattern.grid;
    let start: HashSet<Pos> = grid.cells().copied().collect();

    assert_eq!(grid.rules(), B3S23);
    assert_eq!(start, [(0, 0), (1, 0), (2, 0)].into_iter().collect());

    grid.step()?;
    grid.step()?;

    assert_eq!(grid.cells().copied().collect::<HashSet<Pos>>(), start);

    Ok(())
}

#[test]
fn vertical_bar_end_to_end() -> anyhow::Result<()> {
    let mut grid: GridState = parse_rle::read_pattern(b"o$o$o!")?.grid;

    grid.step()?;

    let next: HashSet<Pos> = grid.cells().copied().collect();
    assert_eq!(next, [(-1, -1), (0, -1), (1, -1)].into_iter().collect());

    Ok(())
}
