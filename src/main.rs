use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::bail;
use crossterm::cursor;
use crossterm::event;
use crossterm::event::Event as CtEvent;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::execute;
use crossterm::queue;
use crossterm::style;
use crossterm::terminal;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sparse_life::WorldOffset;
use sparse_life::config::Config;
use sparse_life::config::USAGE;
use sparse_life::controller::SimulationController;
use sparse_life::grid::GridState;
use sparse_life::parse_rle::Pattern;
use sparse_life::parse_rle::read_pattern;

const R_PENTOMINO: &[u8] = b"#N R-pentomino\nx = 3, y = 3, rule = B3/S23\nb2o$2o$bo!\n";

/// Cells moved per pan key press
const PAN_STEP: WorldOffset = 8;

enum Event {
    Toggle,
    Start,
    Stop,
    Faster,
    Slower,
    Move { dx: WorldOffset, dy: WorldOffset },
    Recenter,
    Resize { cols: u16, rows: u16 },
    Exit,
}

fn handle_event(event: CtEvent) -> Option<Event> {
    match event {
        CtEvent::Key(KeyEvent {
            kind: KeyEventKind::Release,
            ..
        }) => None,
        CtEvent::Key(key_event) => match key_event {
            KeyEvent {
                code: KeyCode::Char('q'),
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => Some(Event::Exit),
            KeyEvent {
                code: KeyCode::Char(c),
                ..
            } => match c {
                ' ' => Some(Event::Toggle),
                's' => Some(Event::Start),
                'p' => Some(Event::Stop),
                '+' | '=' => Some(Event::Faster),
                '-' => Some(Event::Slower),
                'h' => Some(Event::Move { dx: -PAN_STEP, dy: 0 }),
                'l' => Some(Event::Move { dx: PAN_STEP, dy: 0 }),
                'k' => Some(Event::Move { dx: 0, dy: PAN_STEP }),
                'j' => Some(Event::Move { dx: 0, dy: -PAN_STEP }),
                '0' => Some(Event::Recenter),
                _ => None,
            },
            _ => None,
        },
        CtEvent::Resize(cols, rows) => Some(Event::Resize { cols, rows }),
        _ => None,
    }
}

/// The part of the world shown in the terminal, one cell per character.
struct View {
    /// World position drawn at the middle of the screen
    center: (WorldOffset, WorldOffset),
    cols: u16,
    rows: u16,
}

impl View {
    fn center_on(&mut self, grid: &GridState) {
        if let Ok(b) = grid.bounding_box() {
            self.center = ((b.min_x + b.max_x) / 2, (b.min_y + b.max_y) / 2);
        }
    }

    /// Draw the grid, leaving the last terminal row for the status line.
    fn draw(&self, out: &mut impl Write, grid: &GridState, status: &str) -> io::Result<()> {
        let (cx, cy) = self.center;
        let left = cx - WorldOffset::from(self.cols / 2);
        let top = cy + WorldOffset::from(self.rows / 2);

        let mut line = String::with_capacity(self.cols as usize * 3);

        for r in 0..self.rows.saturating_sub(1) {
            let y = top - WorldOffset::from(r);

            line.clear();
            line.extend((0..self.cols).map(|c| {
                let x = left + WorldOffset::from(c);
                if grid.contains(&(x, y)) { '█' } else { ' ' }
            }));

            queue!(out, cursor::MoveTo(0, r), style::Print(&line))?;
        }

        queue!(
            out,
            cursor::MoveTo(0, self.rows.saturating_sub(1)),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(status),
        )?;

        out.flush()
    }
}

fn load_pattern(config: &Config) -> anyhow::Result<Pattern> {
    let pattern = match &config.pattern {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;

            read_pattern(&bytes).with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => read_pattern(R_PENTOMINO).context("Failed to parse built-in pattern")?,
    };

    if pattern.grid.is_empty() {
        bail!("Pattern has no live cells");
    }

    info!(
        name = pattern.name.as_deref().unwrap_or("unnamed"),
        cells = pattern.grid.len(),
        rules = %pattern.grid.rules(),
        "Loaded pattern"
    );

    Ok(pattern)
}

/// Scale the frequency, keeping the old one if the new one is out of range.
fn change_frequency(sim: &SimulationController, factor: f64) {
    if let Err(e) = sim.set_frequency(sim.frequency() * factor) {
        warn!("Keeping {:.1} Hz: {e}", sim.frequency());
    }
}

fn run(sim: &SimulationController, config: &Config) -> anyhow::Result<()> {
    let mut stdout = io::stdout();

    let (cols, rows) = terminal::size()?;
    let mut view = View {
        center: (0, 0),
        cols,
        rows,
    };
    view.center_on(&sim.grid());

    let frame_time = config.frame_time();
    let mut redraw = true;

    loop {
        if event::poll(frame_time)? {
            match handle_event(event::read()?) {
                None => {}
                Some(Event::Exit) => break,
                Some(Event::Toggle) => {
                    sim.toggle();
                }
                Some(Event::Start) => sim.start(),
                Some(Event::Stop) => sim.stop(),
                Some(Event::Faster) => change_frequency(sim, 2.0),
                Some(Event::Slower) => change_frequency(sim, 0.5),
                Some(Event::Move { dx, dy }) => {
                    view.center = (view.center.0 + dx, view.center.1 + dy);
                }
                Some(Event::Recenter) => view.center_on(&sim.grid()),
                Some(Event::Resize { cols, rows }) => {
                    view.cols = cols;
                    view.rows = rows;
                    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
                }
            }

            redraw = true;
        }

        // Clearing before the read means a generation published mid-draw re-marks dirty
        if sim.take_dirty() || redraw {
            let grid = sim.grid();
            let status = format!(
                "gen {}  pop {}  {:.1} Hz  {}  [space] run/pause  [+/-] speed  [hjkl] pan  [q] quit",
                grid.generation(),
                grid.len(),
                sim.frequency(),
                if sim.is_running() { "running" } else { "paused" },
            );

            view.draw(&mut stdout, &grid, &status)?;
            redraw = false;
        }
    }

    Ok(())
}

/// Send logs to `path`. Stdout and stderr both belong to the terminal view while it runs.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args(std::env::args().skip(1)).context(USAGE)?;

    if let Some(path) = &config.log_file {
        init_logging(path)?;
    }

    let pattern = load_pattern(&config)?;
    let sim = SimulationController::new(pattern.grid, &config.simulation)?;

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::Clear(terminal::ClearType::All)
    )?;

    let res = run(&sim, &config);

    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    sim.shutdown();

    res
}
