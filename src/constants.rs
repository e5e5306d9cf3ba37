use std::time::Duration;

pub const WINDOW_WIDTH: i32 = 1280;             // Initial window width when not full-screen
pub const WINDOW_HEIGHT: i32 = 720;             // Initial window height when not full-screen
pub const FPS: u32 = 30;                        // Frames per second of the display loop

pub const DEFAULT_INTERVAL_SECS: f32 = 1.0;     // Seconds between images in interval mode
pub const DEFAULT_BAUD: u32 = 9600;             // Serial baud rate of the trigger device

pub const TOKEN_POLL_SLICE: Duration = Duration::from_millis(50); // Max time a token wait blocks before re-checking commands
pub const MIN_POLL_SLICE: Duration = Duration::from_millis(1); // Shorter slices would spin on an idle link
pub const MAX_TOKEN_LEN: usize = 64;            // Longest accepted line on the trigger link (bytes)

pub const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(100);
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
pub const RETRY_MAX_ATTEMPTS: u32 = 8;
pub const RETRY_JITTER: f32 = 0.25;             // Fraction of the delay added as random jitter

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];
