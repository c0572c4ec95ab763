#![warn(missing_docs)]
//! Proof Worksheet - Headless Metamath Proof Worksheet Engine
//!
//! # Overview
//!
//! `proof-worksheet` turns the text of a proof worksheet into validated, structured statements
//! and back. It does not unify, search or verify proofs; those are external processors that read
//! a loaded [`Worksheet`] and return [`WorksheetEdit`]s.
//!
//! # Core Features
//!
//! - **Strict Loader**: single-pass, column-sensitive state machine with coded structural errors
//! - **Step Model**: closed statement enum, unique step ids, a single trailing `qed`
//! - **Local References**: `#x` escapes spliced into direct hypothesis references
//! - **Renumbering**: `k, 2k, 3k, ...` with hypothesis lists rewritten in place
//! - **Cursor Tracking**: set-once cursor bound by statement id, resolved lazily to line/column
//! - **Compressed Proofs**: Metamath mixed-radix codec and `$=` block formatting
//! - **Step Selector Store**: bounded candidate list with MORE/END sentinel
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Processing (WorksheetProcessor, edits)     │  ← External unifier seam
//! ├─────────────────────────────────────────────┤
//! │  Worksheet (finale, renumber, local refs)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Loader (statement state machine)           │  ← Grammar
//! ├─────────────────────────────────────────────┤
//! │  Statements & Cursor                        │  ← Data model
//! ├─────────────────────────────────────────────┤
//! │  Tokenizer & Line Index (Rope-based)        │  ← Text access
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use proof_worksheet::{LoadRequest, StepId, TheoremTable, Worksheet, WorksheetSettings};
//!
//! let text = "\
//! $( <MM> <PROOF_ASST> THEOREM=syllogism LOC_AFTER=
//! h1:: |- ( ph -> ps )
//! h2:: |- ( ps -> ch )
//! 3:2: |- ( ph -> ( ps -> ch ) )
//! 4:3: |- ( ( ph -> ps ) -> ( ph -> ch ) )
//! qed:1,4: |- ( ph -> ch )
//! $)
//! ";
//!
//! let settings = WorksheetSettings::default();
//! let logic = TheoremTable::new();
//! let mut ws = Worksheet::load(text, &LoadRequest::default(), &settings, &logic);
//!
//! assert!(!ws.has_structural_errors());
//! assert_eq!(ws.hyp_step_count(), 2);
//! assert_eq!(ws.qed_step().and_then(|s| s.step_id()), Some(StepId::Qed));
//!
//! ws.renumber(10).unwrap();
//! assert!(ws.output_text().contains("qed:10,40:"));
//! ```
//!
//! # Module Description
//!
//! - [`tokenizer`] - whitespace tokens with column-1 detection
//! - [`line_index`] - Rope based offset/line/column conversion
//! - [`stmt`] - statement and step model
//! - [`worksheet`] - loading, finale and serialization
//! - [`cursor`] - set-once cursor
//! - [`compress`] - compressed proof codec
//! - [`selector`] - step selector result store
//! - [`processing`] - processor seam and edits
//! - [`messages`] / [`error`] - coded messages and error types
//! - [`settings`] - YAML settings
//! - [`logic`] - logic system lookups

pub mod compress;
pub mod cursor;
pub mod error;
pub mod line_index;
mod loader;
mod local_ref;
pub mod logic;
pub mod messages;
pub mod processing;
mod renumber;
pub mod selector;
pub mod settings;
pub mod stmt;
pub mod tokenizer;
pub mod worksheet;

pub use compress::{
    COMPRESS_HIGH_BASE, COMPRESS_LOW_BASE, CompressError, CompressedProof, ProofCode,
    compress_proof, decode_proof_codes, encode_integer, format_generated_proof,
};
pub use cursor::{Cursor, CursorField, CursorLocation};
pub use error::{StructuralError, StructuralErrorKind, WorksheetError};
pub use line_index::{LineIndex, Position};
pub use logic::{HypothesisInfo, LogicSystem, TheoremInfo, TheoremTable};
pub use messages::{Message, MessageRange, Messages, Severity};
pub use processing::{WorksheetEdit, WorksheetProcessor};
pub use selector::{STEP_SELECTOR_END, STEP_SELECTOR_MORE, StepSelectorItem, StepSelectorStore};
pub use settings::{CursorPlacement, SettingsError, WorksheetSettings};
pub use stmt::{
    DerivationStep, DjVarsStatus, Formula, HypRef, ProofBody, StepId, Stmt, StmtId, StmtKind,
    VerifyStatus,
};
pub use tokenizer::{Token, Tokenizer};
pub use worksheet::{LoadRequest, Worksheet, skeleton_text};
