//! Error types.
//!
//! [`StructuralError`] is produced by the loader and the finale phase; it aborts a load and marks
//! the worksheet structurally broken. [`WorksheetError`] covers operations on an already loaded
//! worksheet.

use crate::line_index::Position;
use crate::messages::{Message, MessageRange};
use std::fmt;
use thiserror::Error;

/// What went wrong while loading a worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralErrorKind {
    #[error("statement does not begin in column 1")]
    /// A statement starts after leading whitespace.
    NotColumnOne,

    #[error("the worksheet is empty")]
    /// No tokens at all.
    EmptyWorksheet,

    #[error("the worksheet must begin with a header statement '$('")]
    /// The first statement is not a header.
    MissingHeader,

    #[error("a second header statement '$(' was found")]
    /// Header seen twice.
    DuplicateHeader,

    #[error("malformed header: expected '{expected}', found '{found}'")]
    /// Header tokens do not match the fixed layout.
    MalformedHeader {
        /// Expected token or token prefix.
        expected: &'static str,
        /// Token found instead (empty at end of input).
        found: String,
    },

    #[error("the header does not name a theorem (THEOREM=<label>)")]
    /// `THEOREM=` is blank or `?`.
    MissingTheoremLabel,

    #[error("LOC_AFTER label '{0}' is not in the database")]
    /// A new theorem's insert-after label is unknown.
    UnknownLocAfter(String),

    #[error("end of input reached before the footer statement '$)'")]
    /// Input ended without `$)`.
    MissingFooter,

    #[error("the footer statement '$)' was reached before a 'qed' step")]
    /// `$)` before any `qed` step.
    FooterBeforeQed,

    #[error("text follows the footer statement '$)'")]
    /// Tokens after the footer.
    TextAfterFooter,

    #[error("unrecognized statement '{0}'")]
    /// Column-1 token that starts no known statement.
    UnrecognizedStatement(String),

    #[error("step number is missing or '?'")]
    /// Blank or `?` step id.
    MissingStepId,

    #[error("step number '{0}' is not a positive integer")]
    /// Non-numeric, zero or negative step id.
    InvalidStepId(String),

    #[error("step number '{0}' is used more than once")]
    /// Two steps share a numeric id.
    DuplicateStepId(String),

    #[error("a hypothesis step cannot be named 'qed'")]
    /// `hqed`.
    HypothesisQed,

    #[error("step prefix '{0}' has more than three ':'-separated fields")]
    /// More than two `:` delimiters.
    TooManyPrefixFields(String),

    #[error("a hypothesis step cannot reference hypotheses")]
    /// Non-empty hyp field on an `h` step.
    HypothesisHasHyps,

    #[error("a hypothesis step cannot use a '#' local reference")]
    /// `#` escape on an `h` step.
    HypothesisLocalRef,

    #[error("hypothesis '{0}' does not name a previous step")]
    /// Hyp entry names an unknown or later step.
    UnknownHypStep(String),

    #[error("step '{0}' follows the 'qed' step")]
    /// A proof step after `qed`.
    StepAfterQed(String),

    #[error("no 'qed' step was found")]
    /// Input ended without a `qed` step.
    MissingQed,

    #[error("a '$d' statement needs at least two variables")]
    /// `$d` with fewer than two symbols.
    DistinctVarsTooFew,

    #[error("variable '{0}' is repeated in a '$d' statement")]
    /// `$d x x`.
    DistinctVarsRepeated(String),

    #[error("hypothesis step '{0}' follows a derivation step")]
    /// `h` step after the first derivation step.
    HypothesisAfterDerivation(String),

    #[error("local reference '#{0}' does not match a previous step number or label")]
    /// `#x` with no prior match.
    LocalRefNotFound(String),

    #[error("local reference '#{0}' points at a step that is itself a local reference")]
    /// `#x` resolving to another local-ref step.
    ChainedLocalRef(String),

    #[error("the 'qed' step cannot be a local reference")]
    /// `qed:...:#x`.
    QedLocalRef,

    #[error("local reference '#' is empty")]
    /// Bare `#`.
    EmptyLocalRef,

    #[error("the worksheet has {found} hypothesis steps but the theorem has {expected}")]
    /// Hyp-step count differs from the theorem's logical hypotheses.
    HypCountMismatch {
        /// Logical hypothesis count of the theorem.
        expected: usize,
        /// Hypothesis steps in the worksheet.
        found: usize,
    },

    #[error("the cursor is not positioned on a derivation step")]
    /// Step-selector request without a derivation step under the cursor.
    SelectorCursorNotOnStep,

    #[error("the generated proof is not terminated by '$.'")]
    /// `$=` without `$.`.
    UnterminatedProof,

    #[error("malformed compressed proof: {0}")]
    /// Bad label list or code characters.
    MalformedCompressedProof(String),

    #[error("a second generated proof '$=' was found")]
    /// Two `$=` blocks.
    DuplicateGeneratedProof,

    #[error("the generated proof '$=' appears before the 'qed' step")]
    /// `$=` before `qed`.
    ProofBeforeQed,

    #[error("internal error: {0}")]
    /// Broken internal invariant.
    Internal(String),
}

impl StructuralErrorKind {
    /// Stable message code.
    pub fn code(&self) -> &'static str {
        use StructuralErrorKind::*;
        match self {
            NotColumnOne => "E-PA-0101",
            EmptyWorksheet => "E-PA-0102",
            MissingHeader => "E-PA-0103",
            DuplicateHeader => "E-PA-0104",
            MalformedHeader { .. } => "E-PA-0105",
            MissingTheoremLabel => "E-PA-0106",
            UnknownLocAfter(_) => "E-PA-0107",
            MissingFooter => "E-PA-0108",
            FooterBeforeQed => "E-PA-0109",
            TextAfterFooter => "E-PA-0110",
            UnrecognizedStatement(_) => "E-PA-0111",
            MissingStepId => "E-PA-0201",
            InvalidStepId(_) => "E-PA-0202",
            DuplicateStepId(_) => "E-PA-0203",
            HypothesisQed => "E-PA-0204",
            TooManyPrefixFields(_) => "E-PA-0205",
            HypothesisHasHyps => "E-PA-0206",
            HypothesisLocalRef => "E-PA-0207",
            UnknownHypStep(_) => "E-PA-0208",
            StepAfterQed(_) => "E-PA-0209",
            MissingQed => "E-PA-0210",
            DistinctVarsTooFew => "E-PA-0211",
            DistinctVarsRepeated(_) => "E-PA-0212",
            HypothesisAfterDerivation(_) => "E-PA-0213",
            LocalRefNotFound(_) => "E-PA-0301",
            ChainedLocalRef(_) => "E-PA-0302",
            QedLocalRef => "E-PA-0303",
            EmptyLocalRef => "E-PA-0304",
            HypCountMismatch { .. } => "E-PA-0401",
            SelectorCursorNotOnStep => "E-PA-0402",
            UnterminatedProof => "E-PA-0501",
            MalformedCompressedProof(_) => "E-PA-0502",
            DuplicateGeneratedProof => "E-PA-0503",
            ProofBeforeQed => "E-PA-0504",
            Internal(_) => "A-PA-0901",
        }
    }
}

/// A structural error with the context needed to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    /// What went wrong.
    pub kind: StructuralErrorKind,
    /// Theorem label from the header, once known.
    pub theorem: Option<String>,
    /// Step id, if the error concerns one step.
    pub step: Option<String>,
    /// Source position of the offending token, if any.
    pub position: Option<Position>,
    /// Character span of the offending token, if any.
    pub range: Option<MessageRange>,
}

impl StructuralError {
    /// Create an error with no context yet.
    pub fn new(kind: StructuralErrorKind) -> Self {
        Self {
            kind,
            theorem: None,
            step: None,
            position: None,
            range: None,
        }
    }

    /// Attach the step the error concerns.
    pub fn at_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Attach a source position and character span.
    pub fn at(mut self, position: Position, start: usize, end: usize) -> Self {
        self.position = Some(position);
        self.range = Some(MessageRange::new(start, end));
        self
    }

    /// Stable message code.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Convert into a message for the worksheet's message list.
    pub fn to_message(&self) -> Message {
        let mut text = self.to_string();
        // Display already leads with the code.
        if let Some(rest) = text.strip_prefix(self.code()) {
            text = rest.trim_start().to_string();
        }
        let message = Message::new(self.code(), text);
        match self.range {
            Some(range) => message.with_range(range),
            None => message,
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())?;
        if let Some(theorem) = &self.theorem {
            write!(f, " Theorem {theorem}")?;
        }
        if let Some(step) = &self.step {
            write!(f, " Step {step}")?;
        }
        if let Some(position) = &self.position {
            write!(f, " ({position})")?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for StructuralError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<StructuralErrorKind> for StructuralError {
    fn from(kind: StructuralErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Errors returned by operations on a loaded worksheet.
#[derive(Debug, Error)]
pub enum WorksheetError {
    #[error("the worksheet has structural errors; fix them before continuing")]
    /// The worksheet failed to load cleanly.
    StructurallyBroken,

    #[error("step '{0}' does not exist")]
    /// An edit referenced a missing step.
    UnknownStep(String),

    #[error("theorem '{0}' is not in the database")]
    /// A skeleton was requested for an unknown theorem.
    UnknownTheorem(String),

    #[error("renumber interval must be positive")]
    /// Renumbering with interval 0.
    ZeroRenumberInterval,

    #[error("renumbering with interval {0} overflows the step number range")]
    /// The last renumbered step would not fit in a step number.
    RenumberOverflow(u32),

    #[error("invalid edit: {0}")]
    /// A processor produced an edit that cannot be applied.
    InvalidEdit(String),

    #[error("the request was cancelled")]
    /// The cooperative cancellation flag was raised.
    Cancelled,

    #[error("processor failed: {0}")]
    /// The external processor reported an error.
    Processor(String),
}
