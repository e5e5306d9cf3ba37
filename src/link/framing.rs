//! Newline-delimited token framing for the trigger link.
//!
//! Bytes may arrive in arbitrary fragments. A token is only produced once
//! its terminating `\n` has been received, so a partial `ne` never matches
//! and `nextnext` without a delimiter is never mistaken for two tokens.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::constants::MAX_TOKEN_LEN;

pub const DELIMITER: u8 = b'\n';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Device asks the engine to advance.
    Next,
    /// Engine reports that an image has just been displayed.
    Capture,
    Other(String),
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Token::Next => "next",
            Token::Capture => "capture",
            Token::Other(text) => text,
        }
    }

    /// Wire form, including the delimiter.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.as_str().len() + 1);
        bytes.extend_from_slice(self.as_str().as_bytes());
        bytes.push(DELIMITER);
        bytes
    }
}

impl FromStr for Token {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.eq_ignore_ascii_case("next") {
            Token::Next
        } else if s.eq_ignore_ascii_case("capture") {
            Token::Capture
        } else {
            Token::Other(s.to_string())
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulates raw bytes and yields complete tokens.
#[derive(Debug, Default)]
pub struct TokenDecoder {
    line: Vec<u8>,
    overflowed: bool,
    ready: VecDeque<Token>,
}

impl TokenDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == DELIMITER {
                self.finish_line();
            } else if self.overflowed {
                // Drop everything until the next delimiter.
            } else if self.line.len() >= MAX_TOKEN_LEN {
                warn!("Discarding over-long line on trigger link");
                self.line.clear();
                self.overflowed = true;
            } else {
                self.line.push(byte);
            }
        }
    }

    pub fn next_token(&mut self) -> Option<Token> {
        self.ready.pop_front()
    }

    /// Bytes received since the last delimiter.
    pub fn pending(&self) -> usize {
        self.line.len()
    }

    fn finish_line(&mut self) {
        if self.overflowed {
            self.overflowed = false;
            self.line.clear();
            return;
        }
        let text = String::from_utf8_lossy(&self.line);
        let text = text.trim();
        if !text.is_empty() {
            // Infallible
            if let Ok(token) = text.parse() {
                self.ready.push_back(token);
            }
        }
        self.line.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut TokenDecoder) -> Vec<Token> {
        std::iter::from_fn(|| decoder.next_token()).collect()
    }

    #[test]
    fn fragmented_token_is_recognized_only_when_complete() {
        let mut decoder = TokenDecoder::new();
        decoder.push(b"ne");
        assert_eq!(decoder.next_token(), None);
        decoder.push(b"xt");
        assert_eq!(decoder.next_token(), None);
        assert_eq!(decoder.pending(), 4);
        decoder.push(b"\n");
        assert_eq!(drain(&mut decoder), vec![Token::Next]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn several_tokens_in_one_read() {
        let mut decoder = TokenDecoder::new();
        decoder.push(b"foo\r\nnext\n\n  NEXT \ncapture\n");
        assert_eq!(
            drain(&mut decoder),
            vec![
                Token::Other("foo".into()),
                Token::Next,
                Token::Next,
                Token::Capture
            ]
        );
    }

    #[test]
    fn undelimited_repetition_is_not_a_token() {
        let mut decoder = TokenDecoder::new();
        decoder.push(b"nextnext");
        assert_eq!(decoder.next_token(), None);
        decoder.push(b"\n");
        assert_eq!(drain(&mut decoder), vec![Token::Other("nextnext".into())]);
    }

    #[test]
    fn overlong_line_is_discarded_up_to_delimiter() {
        let mut decoder = TokenDecoder::new();
        decoder.push(&[b'x'; MAX_TOKEN_LEN + 10]);
        decoder.push(b"next\nnext\n");
        assert_eq!(drain(&mut decoder), vec![Token::Next]);
    }

    #[test]
    fn encode_appends_delimiter() {
        assert_eq!(Token::Capture.encode(), b"capture\n".to_vec());
        assert_eq!(Token::Next.to_string(), "next");
    }
}
