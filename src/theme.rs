use log::warn;
use raylib::prelude::Color;

/// Background color painted behind the current image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Background {
    pub const BLACK: Background = Background::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts a color name or `#rrggbb`; anything else falls back to black.
    pub fn parse(name: &str) -> Self {
        match Self::try_parse(name) {
            Some(color) => color,
            None => {
                warn!("Failed to parse color {:?}, using black instead", name);
                Self::BLACK
            }
        }
    }

    pub fn try_parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let named = match name.to_ascii_lowercase().as_str() {
            "black" => Some(Self::rgb(0, 0, 0)),
            "white" => Some(Self::rgb(255, 255, 255)),
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 255, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "yellow" => Some(Self::rgb(255, 255, 0)),
            "cyan" => Some(Self::rgb(0, 255, 255)),
            "magenta" => Some(Self::rgb(255, 0, 255)),
            _ => None,
        };
        named.or_else(|| parse_hex(name))
    }
}

fn parse_hex(text: &str) -> Option<Background> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Background::rgb(channel(0)?, channel(2)?, channel(4)?))
}

impl Default for Background {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<Background> for Color {
    fn from(bg: Background) -> Self {
        Color::new(bg.r, bg.g, bg.b, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors() {
        assert_eq!(Background::parse("white"), Background::rgb(255, 255, 255));
        assert_eq!(Background::parse("Magenta"), Background::rgb(255, 0, 255));
        assert_eq!(Background::parse("cyan"), Background::rgb(0, 255, 255));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Background::parse("#1a2B3c"), Background::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(Background::try_parse("#12345"), None);
        assert_eq!(Background::try_parse("#gg0000"), None);
        assert_eq!(Background::try_parse("123456"), None);
    }

    #[test]
    fn unknown_falls_back_to_black() {
        assert_eq!(Background::parse("mauve"), Background::BLACK);
        assert_eq!(Background::parse(""), Background::BLACK);
    }

    #[test]
    fn converts_to_opaque_raylib_color() {
        let color: Color = Background::rgb(1, 2, 3).into();
        assert_eq!((color.r, color.g, color.b, color.a), (1, 2, 3, 255));
    }
}
