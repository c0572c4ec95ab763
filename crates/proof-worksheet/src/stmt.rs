//! Worksheet statements.
//!
//! A worksheet is an ordered list of [`Stmt`]s. Each statement keeps its raw text (so output is
//! the input unless something was edited) and a [`StmtKind`] payload describing what the text
//! means.

use crate::compress::CompressedProof;
use crate::cursor::CursorField;
use crate::error::StructuralErrorKind;
use crate::line_index::Position;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

static WORK_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&[A-Z][0-9]+$").unwrap_or_else(|e| panic!("work variable pattern: {e}"))
});

/// Returns `true` if `symbol` is a work variable such as `&W1` or `&C12`.
pub fn is_work_var(symbol: &str) -> bool {
    WORK_VAR.is_match(symbol)
}

/// Identity of a statement, stable for the life of one worksheet even when statements are
/// removed or inserted around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub(crate) u32);

/// A proof step identifier: a positive integer or the reserved `qed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepId {
    /// Numbered step.
    Number(u32),
    /// The final step.
    Qed,
}

impl StepId {
    /// Reserved name of the final step.
    pub const QED: &'static str = "qed";

    /// Parse a step field. `qed` is matched case-insensitively.
    pub fn parse(text: &str) -> Result<Self, StructuralErrorKind> {
        let text = text.trim();
        if text.is_empty() || text == "?" {
            return Err(StructuralErrorKind::MissingStepId);
        }
        if text.eq_ignore_ascii_case(Self::QED) {
            return Ok(StepId::Qed);
        }
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StructuralErrorKind::InvalidStepId(text.to_string()));
        }
        match text.parse::<u32>() {
            Ok(0) | Err(_) => Err(StructuralErrorKind::InvalidStepId(text.to_string())),
            Ok(n) => Ok(StepId::Number(n)),
        }
    }

    /// Returns `true` for `qed`.
    pub fn is_qed(&self) -> bool {
        matches!(self, StepId::Qed)
    }

    /// The numeric value, if this is not `qed`.
    pub fn number(&self) -> Option<u32> {
        match self {
            StepId::Number(n) => Some(*n),
            StepId::Qed => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepId::Number(n) => write!(f, "{n}"),
            StepId::Qed => f.write_str(Self::QED),
        }
    }
}

/// One entry of a derivation step's hypothesis list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HypRef {
    /// A previous step.
    Step(StepId),
    /// Blank or `?`: not yet known.
    Unknown,
    /// `#x`: the first previous step whose id or ref label is `x`. Gone after loading.
    LocalRef(String),
}

impl fmt::Display for HypRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypRef::Step(id) => write!(f, "{id}"),
            HypRef::Unknown => f.write_str("?"),
            HypRef::LocalRef(target) => write!(f, "#{target}"),
        }
    }
}

/// A formula as a list of math symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Formula {
    symbols: Vec<String>,
}

impl Formula {
    /// Build from symbols.
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Split formula text on whitespace.
    pub fn parse(text: &str) -> Self {
        Self::new(text.split_whitespace().map(str::to_string).collect())
    }

    /// The symbols.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Leading symbol (the type code).
    pub fn type_code(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }

    /// Returns `true` if any symbol is a work variable.
    pub fn has_work_vars(&self) -> bool {
        self.symbols.iter().any(|s| is_work_var(s))
    }

    /// Returns `true` if the formula has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbols.join(" "))
    }
}

/// `$( <MM> <PROOF_ASST> THEOREM=<label> LOC_AFTER=<label>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderStmt {
    /// Theorem label.
    pub theorem: String,
    /// Insert-after label for a new theorem; `None` when blank or `?`.
    pub loc_after: Option<String>,
}

/// `*` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentStmt {
    /// Comment text after the leading `*`, as written.
    pub text: String,
}

/// `$d x y ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctVarsStmt {
    /// Variables that must be pairwise distinct.
    pub vars: Vec<String>,
}

/// The body of a `$= ... $.` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofBody {
    /// `( labels ) CODES`.
    Compressed(CompressedProof),
    /// Plain RPN label list.
    Normal(Vec<String>),
}

/// `$= ... $.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProofStmt {
    /// Parsed proof.
    pub proof: ProofBody,
}

/// Fields shared by hypothesis and derivation steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCore {
    /// Step identifier.
    pub id: StepId,
    /// Reference label (hypothesis or assertion), if given.
    pub ref_label: Option<String>,
    /// Step formula, if given.
    pub formula: Option<Formula>,
    /// Depth in the proof tree, counted from `qed` (0).
    pub level: usize,
}

/// `h<n>::<ref> <formula>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HypothesisStep {
    /// Common step fields.
    pub core: StepCore,
}

/// Unification outcome for a derivation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerifyStatus {
    /// Not unified yet.
    #[default]
    Unverified,
    /// Unified and proved.
    Unified,
    /// Unification was attempted and failed.
    Failed,
}

/// Outcome of the distinct-variable check for a derivation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DjVarsStatus {
    /// Not checked yet.
    #[default]
    Unchecked,
    /// All restrictions satisfied.
    Ok,
    /// Restrictions missing from the theorem's `$d` set (fixable by adding `$d`).
    SoftError,
    /// Restrictions violated.
    HardError,
}

/// `<n>:<hyps>:<ref> <formula>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationStep {
    /// Common step fields.
    pub core: StepCore,
    /// Hypotheses in order.
    pub hyps: Vec<HypRef>,
    /// `#x` escape in place of a ref label; cleared once resolved.
    pub local_ref: Option<String>,
    /// RPN proof labels once the step is unified.
    pub proof: Option<Vec<String>>,
    /// Unification outcome.
    pub verify_status: VerifyStatus,
    /// Distinct-variable check outcome.
    pub dj_vars_status: DjVarsStatus,
    /// Created by the "Derive" feature rather than typed by the user.
    pub derive_auto: bool,
    /// The formula mentions work variables.
    pub has_work_vars: bool,
}

impl DerivationStep {
    /// A step still needing work: missing ref or formula, unknown hyps, or work variables.
    pub fn is_incomplete(&self) -> bool {
        self.core.ref_label.is_none()
            || self.core.formula.is_none()
            || self.has_work_vars
            || self.hyps.iter().any(|h| !matches!(h, HypRef::Step(_)))
    }

    /// Step ids this step depends on.
    pub fn hyp_steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.hyps.iter().filter_map(|h| match h {
            HypRef::Step(id) => Some(*id),
            _ => None,
        })
    }
}

/// Tagged statement payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `$(` header.
    Header(HeaderStmt),
    /// `$)` footer.
    Footer,
    /// `*` comment.
    Comment(CommentStmt),
    /// `$d` statement.
    DistinctVars(DistinctVarsStmt),
    /// `h` step.
    Hypothesis(HypothesisStep),
    /// Derivation step.
    Derivation(DerivationStep),
    /// `$=` block.
    GeneratedProof(GeneratedProofStmt),
}

/// One statement with its text and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub(crate) id: StmtId,
    pub(crate) kind: StmtKind,
    /// Raw text from the first column-1 token up to the next one (trailing newlines included).
    pub(crate) text: String,
    /// Byte length of the leading token (the step prefix for proof steps).
    pub(crate) lead_len: usize,
    /// Character offset of the first character.
    pub(crate) start: usize,
    pub(crate) position: Position,
}

impl Stmt {
    /// Stable statement id.
    pub fn id(&self) -> StmtId {
        self.id
    }

    /// Statement payload.
    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }

    /// Raw statement text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines the statement occupies.
    pub fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }

    /// Character span in the worksheet text.
    pub fn span(&self) -> Range<usize> {
        self.start..self.start + self.text.chars().count()
    }

    /// Position of the first character.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Common step fields, for proof steps.
    pub fn step(&self) -> Option<&StepCore> {
        match &self.kind {
            StmtKind::Hypothesis(h) => Some(&h.core),
            StmtKind::Derivation(d) => Some(&d.core),
            _ => None,
        }
    }

    pub(crate) fn step_mut(&mut self) -> Option<&mut StepCore> {
        match &mut self.kind {
            StmtKind::Hypothesis(h) => Some(&mut h.core),
            StmtKind::Derivation(d) => Some(&mut d.core),
            _ => None,
        }
    }

    /// Step id, for proof steps.
    pub fn step_id(&self) -> Option<StepId> {
        self.step().map(|s| s.id)
    }

    /// Derivation payload, if this is a derivation step.
    pub fn as_derivation(&self) -> Option<&DerivationStep> {
        match &self.kind {
            StmtKind::Derivation(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn as_derivation_mut(&mut self) -> Option<&mut DerivationStep> {
        match &mut self.kind {
            StmtKind::Derivation(d) => Some(d),
            _ => None,
        }
    }

    /// Returns `true` for hypothesis and derivation steps.
    pub fn is_proof_step(&self) -> bool {
        self.step().is_some()
    }

    /// The leading token as currently written.
    pub fn prefix(&self) -> &str {
        &self.text[..self.lead_len]
    }

    /// The prefix token this step would have if written from its fields.
    pub fn render_prefix(&self) -> Option<String> {
        match &self.kind {
            StmtKind::Hypothesis(h) => Some(format!(
                "h{}::{}",
                h.core.id,
                h.core.ref_label.as_deref().unwrap_or("")
            )),
            StmtKind::Derivation(d) => {
                let hyps = d
                    .hyps
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let reference = match (&d.local_ref, &d.core.ref_label) {
                    (Some(local), _) => format!("#{local}"),
                    (None, Some(label)) => label.clone(),
                    (None, None) => String::new(),
                };
                Some(format!("{}:{}:{}", d.core.id, hyps, reference))
            }
            _ => None,
        }
    }

    /// Rewrite the prefix token from the step fields, keeping the rest of the text. Returns
    /// `true` if the text changed.
    pub(crate) fn regenerate_prefix(&mut self) -> bool {
        let Some(prefix) = self.render_prefix() else {
            return false;
        };
        if prefix == self.prefix() {
            return false;
        }
        let mut text = String::with_capacity(prefix.len() + self.text.len() - self.lead_len);
        text.push_str(&prefix);
        text.push_str(&self.text[self.lead_len..]);
        self.lead_len = prefix.len();
        self.text = text;
        true
    }

    /// Replace everything after the prefix with ` body`, keeping trailing blank lines.
    pub(crate) fn replace_body(&mut self, body: &str) {
        let rest = &self.text[self.lead_len..];
        let trailing = &rest[rest.trim_end().len()..];
        let trailing = if trailing.contains('\n') {
            trailing.to_string()
        } else {
            "\n".to_string()
        };
        self.text = format!("{} {body}{trailing}", self.prefix());
    }

    /// Character offset of `field` relative to the statement start.
    pub fn field_offset(&self, field: CursorField) -> usize {
        let prefix = self.prefix();
        let colon = |n: usize| {
            prefix
                .char_indices()
                .filter(|&(_, c)| c == ':')
                .nth(n)
                .map(|(b, _)| prefix[..b].chars().count() + 1)
                .unwrap_or_else(|| prefix.chars().count())
        };
        match field {
            CursorField::Text => 0,
            CursorField::Step => usize::from(matches!(self.kind, StmtKind::Hypothesis(_))),
            CursorField::Hyp => colon(0),
            CursorField::Ref => colon(1),
            CursorField::Formula => {
                let rest = &self.text[self.lead_len..];
                let lead = rest.chars().take_while(|c| c.is_whitespace()).count();
                if lead == rest.chars().count() {
                    prefix.chars().count()
                } else {
                    prefix.chars().count() + lead
                }
            }
        }
    }

    /// The field under a character offset relative to the statement start.
    pub fn field_at(&self, offset: usize) -> CursorField {
        if !self.is_proof_step() {
            return CursorField::Text;
        }
        let prefix_chars = self.prefix().chars().count();
        if offset > prefix_chars {
            return CursorField::Formula;
        }
        let colons = self
            .prefix()
            .chars()
            .take(offset)
            .filter(|&c| c == ':')
            .count();
        match colons {
            0 => CursorField::Step,
            1 => CursorField::Hyp,
            _ => CursorField::Ref,
        }
    }
}
