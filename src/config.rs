// config.rs - Command-line interface configuration
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::constants::{DEFAULT_BAUD, DEFAULT_INTERVAL_SECS};
use crate::state::Mode;
use crate::theme::Background;

/// Device name that selects the no-op trigger link instead of a serial port.
pub const NULL_DEVICE: &str = "null";

#[derive(Parser, Debug, Clone)]
#[command(name = "image-automater")]
#[command(about = "Start a slideshow of images in a folder", long_about = None)]
pub struct Cli {
    /// Folder containing the images
    pub folder: PathBuf,

    /// Interval between images in seconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: f32,

    /// Background color (name or #rrggbb)
    #[arg(short, long, default_value = "black")]
    pub background: String,

    /// Include images from subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Advance on `next` from this serial device instead of a timer ("null" for no device)
    #[arg(short, long, value_name = "DEVICE")]
    pub trigger: Option<PathBuf>,

    /// Baud rate of the trigger device
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Run in a window instead of full-screen
    #[arg(long)]
    pub windowed: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDevice {
    Serial { path: PathBuf, baud: u32 },
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub folder: PathBuf,
    pub recursive: bool,
    pub mode: Mode,
    pub trigger: Option<TriggerDevice>,
    pub background: Background,
    pub windowed: bool,
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let trigger = cli.trigger.map(|path| {
            if path.as_os_str() == NULL_DEVICE {
                TriggerDevice::Null
            } else {
                TriggerDevice::Serial {
                    path,
                    baud: cli.baud,
                }
            }
        });

        // The interval is ignored in trigger mode, so it is only checked here.
        let mode = match trigger {
            Some(_) => Mode::Trigger,
            None => {
                if !cli.interval.is_finite() || cli.interval <= 0.0 {
                    return Err(ConfigError::InvalidInterval(cli.interval));
                }
                let interval = Duration::try_from_secs_f32(cli.interval)
                    .map_err(|_| ConfigError::InvalidInterval(cli.interval))?;
                Mode::Interval(interval)
            }
        };

        Ok(Config {
            folder: cli.folder,
            recursive: cli.recursive,
            mode,
            trigger,
            background: Background::parse(&cli.background),
            windowed: cli.windowed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["image-automater"];
        argv.extend_from_slice(args);
        Config::try_from(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_to_one_second_interval() {
        let cfg = config(&["photos"]).unwrap();
        assert_eq!(cfg.folder, PathBuf::from("photos"));
        assert_eq!(cfg.mode, Mode::Interval(Duration::from_secs(1)));
        assert_eq!(cfg.trigger, None);
        assert_eq!(cfg.background, Background::BLACK);
        assert!(!cfg.recursive);
        assert!(!cfg.windowed);
    }

    #[test]
    fn fractional_interval_and_flags() {
        let cfg = config(&["photos", "-i", "0.25", "-r", "-b", "#ff8000", "--windowed"]).unwrap();
        assert_eq!(cfg.mode, Mode::Interval(Duration::from_millis(250)));
        assert!(cfg.recursive);
        assert!(cfg.windowed);
        assert_eq!(cfg.background, Background::rgb(255, 128, 0));
    }

    #[test]
    fn trigger_device_selects_trigger_mode() {
        let cfg = config(&["photos", "--trigger", "/dev/ttyUSB0", "--baud", "115200", "-i", "0"]).unwrap();
        assert_eq!(cfg.mode, Mode::Trigger);
        assert_eq!(
            cfg.trigger,
            Some(TriggerDevice::Serial {
                path: "/dev/ttyUSB0".into(),
                baud: 115200
            })
        );
    }

    #[test]
    fn null_device_uses_stub_link() {
        let cfg = config(&["photos", "-t", "null"]).unwrap();
        assert_eq!(cfg.trigger, Some(TriggerDevice::Null));
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        assert_eq!(config(&["photos", "-i", "0"]), Err(ConfigError::InvalidInterval(0.0)));
        assert!(config(&["photos", "--interval=-2"]).is_err());
    }

    #[test]
    fn interval_too_large_for_a_duration_is_rejected() {
        assert_eq!(config(&["photos", "-i", "1e30"]), Err(ConfigError::InvalidInterval(1e30)));
    }

    #[test]
    fn folder_is_required() {
        assert!(Cli::try_parse_from(["image-automater"]).is_err());
    }
}
