use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::scheduler::SchedulerError;
use crate::scheduler::period_from_frequency;

/// How the simulation is driven.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Generations per second while running
    pub frequency_hz: f64,

    /// Whether stepping starts right away, rather than waiting for a start
    pub start_running: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 10.0,
            start_running: false,
        }
    }
}

impl SimulationConfig {
    pub fn period(&self) -> Result<Duration, SchedulerError> {
        period_from_frequency(self.frequency_hz)
    }
}

/// Command line configuration for the terminal front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// RLE file to load. A built-in pattern is used when absent.
    pub pattern: Option<PathBuf>,

    pub simulation: SimulationConfig,

    /// Redraws per second of the terminal view
    pub render_fps: u32,

    /// Where log lines go. The terminal view owns the screen, so without a file nothing is
    /// logged.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: None,
            simulation: SimulationConfig::default(),
            render_fps: 30,
            log_file: None,
        }
    }
}

pub const USAGE: &str = "usage: sparse-life [PATTERN.rle] [--hz N] [--fps N] [--run] [--log FILE]";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing value for {flag}")]
    MissingValue { flag: String },

    #[error("Invalid value \"{value}\" for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("Unknown argument \"{arg}\"")]
    UnknownArgument { arg: String },

    #[error("Only one pattern file may be given")]
    ExtraPattern,
}

impl Config {
    /// Parse arguments, not including the program name.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--hz" => {
                    let hz: f64 = value(&arg, args.next())?;

                    if period_from_frequency(hz).is_err() {
                        return Err(ConfigError::InvalidValue {
                            flag: arg.clone(),
                            value: hz.to_string(),
                        });
                    }

                    config.simulation.frequency_hz = hz;
                }
                "--fps" => {
                    let fps: u32 = value(&arg, args.next())?;

                    if fps == 0 {
                        return Err(ConfigError::InvalidValue {
                            flag: arg.clone(),
                            value: fps.to_string(),
                        });
                    }

                    config.render_fps = fps;
                }
                "--run" => config.simulation.start_running = true,
                "--log" => {
                    let path: PathBuf = value(&arg, args.next())?;
                    config.log_file = Some(path);
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownArgument {
                        arg: flag.to_string(),
                    });
                }
                _ => {
                    if config.pattern.is_some() {
                        return Err(ConfigError::ExtraPattern);
                    }

                    config.pattern = Some(PathBuf::from(arg));
                }
            }
        }

        Ok(config)
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.render_fps.max(1)
    }
}

fn value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, ConfigError> {
    let Some(value) = value else {
        return Err(ConfigError::MissingValue {
            flag: flag.to_string(),
        });
    };

    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::Config;
    use super::ConfigError;

    #[test]
    fn defaults() {
        let config = Config::from_args(Vec::<String>::new()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.simulation.period().unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn all_flags() {
        let config = Config::from_args(["gun.rle", "--hz", "2.5", "--fps", "60", "--run"]).unwrap();

        assert_eq!(config.pattern, Some(PathBuf::from("gun.rle")));
        assert_eq!(config.simulation.frequency_hz, 2.5);
        assert!(config.simulation.start_running);
        assert_eq!(config.render_fps, 60);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn log_file() {
        let config = Config::from_args(["--log", "life.log"]).unwrap();

        assert_eq!(config.log_file, Some(PathBuf::from("life.log")));
        assert_eq!(config.pattern, None);

        assert!(matches!(
            Config::from_args(["--log"]),
            Err(ConfigError::MissingValue { .. })
        ));
    }

    #[test]
    fn bad_values() {
        assert!(matches!(
            Config::from_args(["--hz"]),
            Err(ConfigError::MissingValue { .. })
        ));
        assert!(matches!(
            Config::from_args(["--hz", "fast"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_args(["--hz", "0"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_args(["--fps", "0"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_args(["--verbose"]),
            Err(ConfigError::UnknownArgument { .. })
        ));
        assert!(matches!(
            Config::from_args(["a.rle", "b.rle"]),
            Err(ConfigError::ExtraPattern)
        ));
    }
}
