//! Main-thread half of the raylib display: turns engine requests into frames.

use std::sync::mpsc::{Receiver, TryRecvError};

use log::{debug, warn};
use raylib::prelude::*;

use crate::display::DisplayRequest;
use crate::texture_loader::load_texture_with_exif_rotation;
use crate::theme::Background;

pub struct Screen {
    requests: Receiver<DisplayRequest>,
    background: Color,
    current: Option<Texture2D>,
    released: bool,
}

impl Screen {
    pub fn new(requests: Receiver<DisplayRequest>, background: Background) -> Self {
        Self {
            requests,
            background: background.into(),
            current: None,
            released: false,
        }
    }

    /// Applies pending requests. Returns false once the display was released.
    pub fn update(&mut self, rl: &mut RaylibHandle, thread: &RaylibThread) -> bool {
        // Only the newest image matters when several queued up in one frame.
        let mut latest = None;
        loop {
            match self.requests.try_recv() {
                Ok(DisplayRequest::Show(path)) => latest = Some(path),
                Ok(DisplayRequest::Release) => {
                    self.released = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.released = true;
                    break;
                }
            }
        }

        if let Some(path) = latest {
            if !self.released {
                match load_texture_with_exif_rotation(rl, thread, &path) {
                    Ok(texture) => {
                        debug!("Displaying {}", path.display());
                        self.current = Some(texture);
                    }
                    Err(e) => warn!("Keeping previous image: {:#}", e),
                }
            }
        }

        !self.released
    }

    pub fn draw(&self, d: &mut RaylibDrawHandle) {
        d.clear_background(self.background);

        if let Some(texture) = &self.current {
            let tex_width = texture.width() as f32;
            let tex_height = texture.height() as f32;
            let dest = fit_rect(
                tex_width,
                tex_height,
                d.get_screen_width() as f32,
                d.get_screen_height() as f32,
            );
            d.draw_texture_pro(
                texture,
                Rectangle::new(0.0, 0.0, tex_width, tex_height),
                dest,
                Vector2::new(0.0, 0.0),
                0.0,
                Color::WHITE,
            );
        }
    }
}

/// Largest rectangle with the texture's aspect ratio centered on the screen.
pub fn fit_rect(tex_width: f32, tex_height: f32, screen_width: f32, screen_height: f32) -> Rectangle {
    if tex_width <= 0.0 || tex_height <= 0.0 {
        return Rectangle::new(0.0, 0.0, 0.0, 0.0);
    }
    let scale = (screen_width / tex_width).min(screen_height / tex_height);
    let width = tex_width * scale;
    let height = tex_height * scale;
    Rectangle::new(
        (screen_width - width) * 0.5,
        (screen_height - height) * 0.5,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_letterboxed() {
        let r = fit_rect(2000.0, 1000.0, 1000.0, 1000.0);
        assert_eq!((r.x, r.y, r.width, r.height), (0.0, 250.0, 1000.0, 500.0));
    }

    #[test]
    fn tall_image_is_pillarboxed() {
        let r = fit_rect(500.0, 1000.0, 1920.0, 1080.0);
        assert_eq!((r.width, r.height), (540.0, 1080.0));
        assert_eq!((r.x, r.y), (690.0, 0.0));
    }

    #[test]
    fn small_image_is_scaled_up() {
        let r = fit_rect(100.0, 100.0, 400.0, 200.0);
        assert_eq!((r.x, r.y, r.width, r.height), (100.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn degenerate_texture_draws_nothing() {
        let r = fit_rect(0.0, 10.0, 100.0, 100.0);
        assert_eq!((r.width, r.height), (0.0, 0.0));
    }
}
