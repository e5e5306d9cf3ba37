//! Slideshow that advances on a timer or on a serial trigger device.
//!
//! The [`engine`] decides when to show the next image. It renders through a
//! [`display::DisplaySink`] and, in trigger mode, talks to the device through
//! a [`link::TriggerLink`]: the device sends `next`, the engine answers
//! `capture` once the new image has been handed to the display.

pub mod config;
pub mod constants;
pub mod display;
pub mod engine;
pub mod image_set;
pub mod link;
pub mod retry;
pub mod screen;
pub mod state;
pub mod texture_loader;
pub mod theme;

pub use display::{DisplayError, DisplaySink};
pub use engine::{Controller, Engine, EngineError, EngineOptions};
pub use image_set::{ImageSet, ImageSetError};
pub use link::{LinkError, Token, TriggerLink};
pub use state::{Lifecycle, Mode};
