//! Compressed proof codec.
//!
//! A compressed proof lists the labels it uses (beyond the theorem's mandatory hypotheses, which
//! are numbered implicitly first) and then refers to them by index. Each index is written in
//! mixed radix: the least significant digit in base [`COMPRESS_LOW_BASE`] using `A`-`T`, every
//! higher digit in base [`COMPRESS_HIGH_BASE`] using `U`-`Y`, most significant first. `Z` marks
//! the preceding step as saved for reuse, and `?` stands for an unknown step.

use indexmap::IndexSet;
use thiserror::Error;

/// Base of the final (least significant) digit.
pub const COMPRESS_LOW_BASE: usize = 20;
/// Base of every other digit.
pub const COMPRESS_HIGH_BASE: usize = 5;

const LOW_DIGITS: &[u8; COMPRESS_LOW_BASE] = b"ABCDEFGHIJKLMNOPQRST";
const HIGH_DIGITS: &[u8; COMPRESS_HIGH_BASE] = b"UVWXY";

/// Marks the previous step as saved.
pub const REPEAT_MARKER: char = 'Z';
/// An unknown step.
pub const UNKNOWN_MARKER: char = '?';

/// One decoded element of the code section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCode {
    /// Zero-based index into mandatory hypotheses, then the label list, then saved steps.
    Index(usize),
    /// `Z`: save the previous step.
    Repeat,
    /// `?`: unknown step.
    Unknown,
}

/// A proof in compressed form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedProof {
    /// Labels listed between `(` and `)`.
    pub labels: Vec<String>,
    /// Decoded code section.
    pub codes: Vec<ProofCode>,
}

/// Errors produced while decoding a code section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressError {
    #[error("invalid character '{0}' in compressed proof")]
    /// Character outside `A`-`Z` and `?`.
    InvalidCharacter(char),

    #[error("'Z' must follow a complete step")]
    /// `Z` at the start or after another `Z` or high digit.
    MisplacedRepeat,

    #[error("'?' cannot appear inside a number")]
    /// `?` after high digits.
    MisplacedUnknown,

    #[error("compressed proof ends in the middle of a number")]
    /// Trailing `U`-`Y` digits.
    DanglingDigits,

    #[error("compressed proof number is too large")]
    /// Index overflow.
    Overflow,
}

/// Encode a zero-based index.
pub fn encode_integer(index: usize) -> String {
    let mut digits = vec![LOW_DIGITS[index % COMPRESS_LOW_BASE]];
    let mut rest = index / COMPRESS_LOW_BASE;
    while rest > 0 {
        rest -= 1;
        digits.push(HIGH_DIGITS[rest % COMPRESS_HIGH_BASE]);
        rest /= COMPRESS_HIGH_BASE;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Decode the code section of a compressed proof. Whitespace is ignored.
pub fn decode_proof_codes(text: &str) -> Result<Vec<ProofCode>, CompressError> {
    let mut codes = Vec::new();
    let mut value = 0usize;
    let mut pending_high = false;
    let mut can_save = false;

    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        match ch {
            'A'..='T' => {
                let digit = ch as usize - 'A' as usize;
                value = value
                    .checked_mul(COMPRESS_LOW_BASE)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(CompressError::Overflow)?;
                codes.push(ProofCode::Index(value));
                value = 0;
                pending_high = false;
                can_save = true;
            }
            'U'..='Y' => {
                let digit = ch as usize - 'U' as usize;
                value = value
                    .checked_mul(COMPRESS_HIGH_BASE)
                    .and_then(|v| v.checked_add(digit + 1))
                    .ok_or(CompressError::Overflow)?;
                pending_high = true;
                can_save = false;
            }
            REPEAT_MARKER => {
                if !can_save {
                    return Err(CompressError::MisplacedRepeat);
                }
                codes.push(ProofCode::Repeat);
                can_save = false;
            }
            UNKNOWN_MARKER => {
                if pending_high {
                    return Err(CompressError::MisplacedUnknown);
                }
                codes.push(ProofCode::Unknown);
                can_save = false;
            }
            other => return Err(CompressError::InvalidCharacter(other)),
        }
    }

    if pending_high {
        return Err(CompressError::DanglingDigits);
    }
    Ok(codes)
}

/// Compress an RPN proof.
///
/// `mandatory_hyps` are numbered first and never listed; every other label gets the next index
/// the first time it appears in `rpn` and reuses that index afterwards. A `?` entry becomes
/// [`ProofCode::Unknown`].
pub fn compress_proof<S: AsRef<str>>(mandatory_hyps: &[S], rpn: &[S]) -> CompressedProof {
    let mut used: IndexSet<&str> = mandatory_hyps.iter().map(AsRef::as_ref).collect();
    let implicit = used.len();

    let codes = rpn
        .iter()
        .map(|label| match label.as_ref() {
            "?" => ProofCode::Unknown,
            label => ProofCode::Index(used.insert_full(label).0),
        })
        .collect();

    CompressedProof {
        labels: used
            .iter()
            .skip(implicit)
            .map(|label| label.to_string())
            .collect(),
        codes,
    }
}

impl CompressedProof {
    /// The code section as text, without spaces.
    pub fn code_text(&self) -> String {
        let mut out = String::new();
        for code in &self.codes {
            match code {
                ProofCode::Index(i) => out.push_str(&encode_integer(*i)),
                ProofCode::Repeat => out.push(REPEAT_MARKER),
                ProofCode::Unknown => out.push(UNKNOWN_MARKER),
            }
        }
        out
    }

    /// Returns `true` if any step is unknown.
    pub fn is_incomplete(&self) -> bool {
        self.codes.contains(&ProofCode::Unknown)
    }
}

/// Render a `$= ( labels ) CODES $.` block wrapped at `width` columns, continuation lines
/// indented by `indent` spaces. The result ends with a newline.
pub fn format_generated_proof(proof: &CompressedProof, width: usize, indent: usize) -> String {
    let mut writer = ProofWriter::new(width, indent);
    writer.word("$=");
    writer.word("(");
    for label in &proof.labels {
        writer.word(label);
    }
    writer.word(")");
    writer.run(&proof.code_text());
    writer.word("$.");
    writer.finish()
}

struct ProofWriter {
    out: String,
    line_len: usize,
    at_line_start: bool,
    width: usize,
    indent: usize,
}

impl ProofWriter {
    fn new(width: usize, indent: usize) -> Self {
        Self {
            out: String::new(),
            line_len: 0,
            at_line_start: true,
            width: width.max(indent + 2),
            indent,
        }
    }

    fn new_line(&mut self) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat_n(' ', self.indent));
        self.line_len = self.indent;
        self.at_line_start = true;
    }

    fn room(&self) -> usize {
        let gap = usize::from(!self.at_line_start);
        self.width.saturating_sub(self.line_len + gap)
    }

    fn word(&mut self, word: &str) {
        let len = word.chars().count();
        if !self.at_line_start && self.room() < len {
            self.new_line();
        }
        if !self.at_line_start {
            self.out.push(' ');
            self.line_len += 1;
        }
        self.out.push_str(word);
        self.line_len += len;
        self.at_line_start = false;
    }

    /// Codes may be broken anywhere, so fill each line to the margin.
    fn run(&mut self, codes: &str) {
        let mut rest = codes;
        while !rest.is_empty() {
            if self.room() == 0 {
                self.new_line();
            }
            let (chunk, tail) = rest.split_at(self.room().min(rest.len()));
            self.word(chunk);
            rest = tail;
        }
    }

    fn finish(mut self) -> String {
        self.out.push('\n');
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_integer(text: &str) -> usize {
        match decode_proof_codes(text).unwrap().as_slice() {
            [ProofCode::Index(i)] => *i,
            other => panic!("expected a single index, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode_integer(0), "A");
        assert_eq!(encode_integer(19), "T");
        assert_eq!(encode_integer(20), "UA");
        assert_eq!(encode_integer(119), "YT");
        assert_eq!(encode_integer(120), "UUA");
        assert!(!encode_integer(7_654_321).contains('0'));
    }

    #[test]
    fn test_round_trip_first_ten_thousand() {
        for i in 0..10_000 {
            assert_eq!(decode_integer(&encode_integer(i)), i, "index {i}");
        }
    }

    #[test]
    fn test_compress_dedups_and_skips_mandatory() {
        let mandatory = ["wph", "wps", "syl.1"];
        let rpn = ["wph", "wps", "syl.1", "ax-1", "ax-mp", "ax-1", "?", "ax-mp"];
        let proof = compress_proof(&mandatory, &rpn);

        assert_eq!(proof.labels, ["ax-1", "ax-mp"]);
        assert_eq!(
            proof.codes,
            [0, 1, 2, 3, 4, 3]
                .into_iter()
                .map(ProofCode::Index)
                .chain([ProofCode::Unknown, ProofCode::Index(4)])
                .collect::<Vec<_>>()
        );
        assert_eq!(proof.code_text(), "ABCDED?E");
        assert!(proof.is_incomplete());
    }

    #[test]
    fn test_decode_repeat_and_errors() {
        assert_eq!(
            decode_proof_codes("AB Z UA").unwrap(),
            [
                ProofCode::Index(0),
                ProofCode::Index(1),
                ProofCode::Repeat,
                ProofCode::Index(20)
            ]
        );
        assert_eq!(decode_proof_codes("ZA"), Err(CompressError::MisplacedRepeat));
        assert_eq!(decode_proof_codes("AZZ"), Err(CompressError::MisplacedRepeat));
        assert_eq!(decode_proof_codes("AU"), Err(CompressError::DanglingDigits));
        assert_eq!(decode_proof_codes("U?"), Err(CompressError::MisplacedUnknown));
        assert_eq!(
            decode_proof_codes("a"),
            Err(CompressError::InvalidCharacter('a'))
        );
    }

    #[test]
    fn test_format_wraps_at_width() {
        let proof = CompressedProof {
            labels: vec!["ax-mp".into(), "a1i".into()],
            codes: (0..40).map(ProofCode::Index).collect(),
        };
        let text = format_generated_proof(&proof, 30, 4);
        assert!(text.starts_with("$= ( ax-mp a1i ) "));
        assert!(text.ends_with("$.\n"));
        for line in text.lines() {
            assert!(line.chars().count() <= 30, "line too long: {line:?}");
        }
        for line in text.lines().skip(1) {
            assert!(line.starts_with("    "));
        }
        let codes: String = text
            .lines()
            .flat_map(|l| l.split_whitespace())
            .filter(|w| w.chars().all(|c| c.is_ascii_uppercase()))
            .collect();
        assert_eq!(decode_proof_codes(&codes).unwrap(), proof.codes);
    }
}
