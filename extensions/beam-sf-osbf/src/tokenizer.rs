//! Splits message text into normalized word tokens.
//!
//! A token is a run of alphanumeric characters, lower-cased and cut off after
//! [`MAX_TOKEN_LEN`] characters. Anything else (punctuation, whitespace, the
//! replacement character left behind by undecodable bytes) separates tokens.

use std::borrow::Cow;
use std::str::CharIndices;

/// Longest token kept, in characters. Longer runs are truncated.
pub const MAX_TOKEN_LEN: usize = 64;

/// Restartable iterator over the tokens of a text. Cloning it yields an
/// independent iterator starting from the same position.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    chars: CharIndices<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokens {
            chars: text.char_indices(),
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut token = String::new();
        let mut len = 0;

        for (_, c) in self.chars.by_ref() {
            if !c.is_alphanumeric() {
                if len > 0 {
                    break;
                }
                continue;
            }
            if len < MAX_TOKEN_LEN {
                token.extend(c.to_lowercase());
            }
            len += 1;
        }

        (len > 0).then_some(token)
    }
}

/// Tokenizes already decoded text
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens::new(text)
}

/// Decodes raw bytes for tokenization. Invalid UTF-8 sequences become
/// replacement characters, which act as token boundaries.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}
