//! Whitespace- and column-aware tokenizer for worksheet text.
//!
//! Tokens are maximal runs of non-whitespace characters. Each token records its character span
//! and its zero-based line/column, so the loader can enforce the column-1 rules and report
//! precise positions.

use crate::line_index::Position;
use std::iter::Peekable;
use std::str::CharIndices;

/// A single whitespace-delimited token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token text.
    pub text: &'a str,
    /// Byte offset of the token in the source text.
    pub byte_start: usize,
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
    /// Position of the first character.
    pub position: Position,
}

impl<'a> Token<'a> {
    /// Returns `true` if the token begins in column 1, i.e. starts a new statement.
    pub fn starts_statement(&self) -> bool {
        self.position.is_column_one()
    }
}

fn is_worksheet_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Iterator over the tokens of a worksheet text.
pub struct Tokenizer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    char_offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer positioned at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
            char_offset: 0,
            line: 0,
            column: 0,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let (byte, ch) = self.chars.next()?;
        self.char_offset += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some((byte, ch))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !is_worksheet_whitespace(ch) {
                break;
            }
            self.bump();
        }

        let &(byte_start, _) = self.chars.peek()?;
        let start = self.char_offset;
        let position = Position::new(self.line, self.column);
        let mut byte_end = byte_start;
        while let Some(&(byte, ch)) = self.chars.peek() {
            if is_worksheet_whitespace(ch) {
                break;
            }
            byte_end = byte + ch.len_utf8();
            self.bump();
        }

        let token = Token {
            text: &self.text[byte_start..byte_end],
            byte_start,
            start,
            end: self.char_offset,
            position,
        };
        tracing::trace!(text = token.text, %position, "token");
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_carry_positions() {
        let tokens: Vec<_> = Tokenizer::new("h1:: |- ph\n  ( ps )\nqed").collect();
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, ["h1::", "|-", "ph", "(", "ps", ")", "qed"]);

        assert!(tokens[0].starts_statement());
        assert_eq!(tokens[3].position, Position::new(1, 2));
        assert!(!tokens[3].starts_statement());
        assert_eq!(tokens[6].position, Position::new(2, 0));
        assert!(tokens[6].starts_statement());
        assert_eq!((tokens[6].start, tokens[6].end), (20, 23));
    }

    #[test]
    fn test_leading_whitespace_is_not_column_one() {
        let first = Tokenizer::new("\t$(").next().unwrap();
        assert_eq!(first.position, Position::new(0, 1));
        assert!(!first.starts_statement());
    }

    #[test]
    fn test_multibyte_offsets() {
        let tokens: Vec<_> = Tokenizer::new("* φ∀ x").collect();
        assert_eq!(tokens[1].text, "φ∀");
        assert_eq!((tokens[1].start, tokens[1].end), (2, 4));
        assert_eq!(tokens[2].start, 5);
        assert_eq!(tokens[2].byte_start, "* φ∀ ".len());
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(Tokenizer::new("").count(), 0);
        assert_eq!(Tokenizer::new(" \n\t \r\n").count(), 0);
    }
}
