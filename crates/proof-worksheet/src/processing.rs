//! Processor seam for unification and proof search.
//!
//! A [`WorksheetProcessor`] reads a loaded worksheet and returns [`WorksheetEdit`]s; the
//! worksheet applies them itself via [`Worksheet::apply_edits`]. Processors never mutate the
//! worksheet directly, and nothing runs against a structurally broken worksheet.

use crate::compress::{CompressedProof, format_generated_proof};
use crate::cursor::CursorField;
use crate::error::WorksheetError;
use crate::settings::WorksheetSettings;
use crate::stmt::{
    DerivationStep, DistinctVarsStmt, DjVarsStatus, Formula, GeneratedProofStmt, HypRef,
    ProofBody, StepCore, StepId, StmtKind, VerifyStatus,
};
use crate::worksheet::Worksheet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A change to a loaded worksheet produced by a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorksheetEdit {
    /// Fill in or replace a step's reference label.
    SetStepRef {
        /// Target step.
        step: StepId,
        /// New label.
        ref_label: String,
    },
    /// Replace a step's formula.
    SetStepFormula {
        /// Target step.
        step: StepId,
        /// New formula.
        formula: Formula,
    },
    /// Record the outcome of unifying a derivation step.
    SetStepStatus {
        /// Target step.
        step: StepId,
        /// Unification outcome.
        verify_status: VerifyStatus,
        /// Distinct-variable check outcome.
        dj_vars_status: DjVarsStatus,
        /// RPN proof of the step, when unified.
        proof: Option<Vec<String>>,
    },
    /// Insert a new derivation step (the "Derive" feature). It gets the next free step number.
    InsertDerivedStep {
        /// The new step goes immediately before this one.
        before: StepId,
        /// Hypotheses of the new step.
        hyps: Vec<StepId>,
        /// Reference label, if known.
        ref_label: Option<String>,
        /// Formula of the new step.
        formula: Formula,
    },
    /// Add a `$d` statement before the generated proof (or the footer).
    InsertDistinctVars {
        /// Variables, at least two.
        vars: Vec<String>,
    },
    /// Add the final compressed proof, replacing any existing `$=` block.
    InsertGeneratedProof {
        /// The proof.
        proof: CompressedProof,
    },
    /// Move the cursor to a step field.
    PlaceCursor {
        /// Target step.
        step: StepId,
        /// Field within the step.
        field: CursorField,
    },
}

/// Something that computes edits for a worksheet, such as a unifier.
pub trait WorksheetProcessor {
    /// The error type returned by [`WorksheetProcessor::process`].
    type Error: fmt::Display;

    /// Compute edits to apply to `worksheet`.
    fn process(&mut self, worksheet: &Worksheet) -> Result<Vec<WorksheetEdit>, Self::Error>;
}

impl Worksheet {
    /// Apply edits in order. Stops at the first edit that cannot be applied; earlier edits stay
    /// applied.
    pub fn apply_edits<I>(
        &mut self,
        edits: I,
        settings: &WorksheetSettings,
    ) -> Result<(), WorksheetError>
    where
        I: IntoIterator<Item = WorksheetEdit>,
    {
        if self.structural_errors {
            return Err(WorksheetError::StructurallyBroken);
        }
        for edit in edits {
            tracing::debug!(?edit, "applying edit");
            self.apply_edit(edit, settings)?;
        }
        self.compute_levels();
        Ok(())
    }

    /// Run a processor and apply its edits. `cancel` is checked once, before the processor runs.
    pub fn apply_processor<P>(
        &mut self,
        processor: &mut P,
        settings: &WorksheetSettings,
        cancel: &AtomicBool,
    ) -> Result<(), WorksheetError>
    where
        P: WorksheetProcessor,
    {
        if self.structural_errors {
            return Err(WorksheetError::StructurallyBroken);
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(WorksheetError::Cancelled);
        }
        let edits = processor
            .process(self)
            .map_err(|e| WorksheetError::Processor(e.to_string()))?;
        self.apply_edits(edits, settings)
    }

    fn step_index(&self, step: StepId) -> Result<usize, WorksheetError> {
        self.stmts
            .iter()
            .position(|s| s.step_id() == Some(step))
            .ok_or_else(|| WorksheetError::UnknownStep(step.to_string()))
    }

    /// Index of the `$=` block, or of the footer when there is none.
    fn proof_slot(&self) -> usize {
        let footer = self
            .stmts
            .iter()
            .rposition(|s| matches!(s.kind, StmtKind::Footer))
            .unwrap_or(self.stmts.len());
        self.stmts
            .iter()
            .position(|s| matches!(s.kind, StmtKind::GeneratedProof(_)))
            .unwrap_or(footer)
    }

    fn apply_edit(
        &mut self,
        edit: WorksheetEdit,
        settings: &WorksheetSettings,
    ) -> Result<(), WorksheetError> {
        match edit {
            WorksheetEdit::SetStepRef { step, ref_label } => {
                let index = self.step_index(step)?;
                let stmt = &mut self.stmts[index];
                if let Some(d) = stmt.as_derivation_mut() {
                    d.local_ref = None;
                }
                if let Some(core) = stmt.step_mut() {
                    core.ref_label = Some(ref_label);
                }
                stmt.regenerate_prefix();
                self.recompute_spans();
            }
            WorksheetEdit::SetStepFormula { step, formula } => {
                let index = self.step_index(step)?;
                let stmt = &mut self.stmts[index];
                stmt.replace_body(&formula.to_string());
                if let Some(d) = stmt.as_derivation_mut() {
                    d.has_work_vars = formula.has_work_vars();
                }
                if let Some(core) = stmt.step_mut() {
                    core.formula = Some(formula);
                }
                self.recompute_spans();
            }
            WorksheetEdit::SetStepStatus {
                step,
                verify_status,
                dj_vars_status,
                proof,
            } => {
                let index = self.step_index(step)?;
                let d = self.stmts[index].as_derivation_mut().ok_or_else(|| {
                    WorksheetError::InvalidEdit(format!("step {step} is not a derivation step"))
                })?;
                d.verify_status = verify_status;
                d.dj_vars_status = dj_vars_status;
                d.proof = proof;
            }
            WorksheetEdit::InsertDerivedStep {
                before,
                hyps,
                ref_label,
                formula,
            } => {
                let index = self.step_index(before)?;
                if self.stmts[index..]
                    .iter()
                    .any(|s| matches!(s.kind, StmtKind::Hypothesis(_)))
                {
                    return Err(WorksheetError::InvalidEdit(format!(
                        "a derived step cannot go before hypothesis steps (before step {before})"
                    )));
                }
                if let Some(missing) = hyps
                    .iter()
                    .find(|h| !self.stmts[..index].iter().any(|s| s.step_id() == Some(**h)))
                {
                    return Err(WorksheetError::UnknownStep(missing.to_string()));
                }
                let number = self.next_auto_step_number();
                let id = StepId::Number(number);
                let hyp_text = hyps
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let text = format!(
                    "{id}:{hyp_text}:{} {formula}\n",
                    ref_label.as_deref().unwrap_or("")
                );
                let has_work_vars = formula.has_work_vars();
                let step = DerivationStep {
                    core: StepCore {
                        id,
                        ref_label,
                        formula: Some(formula),
                        level: 0,
                    },
                    hyps: hyps.into_iter().map(HypRef::Step).collect(),
                    local_ref: None,
                    proof: None,
                    verify_status: VerifyStatus::Unverified,
                    dj_vars_status: DjVarsStatus::Unchecked,
                    derive_auto: true,
                    has_work_vars,
                };
                self.insert_stmt(index, StmtKind::Derivation(step), text);
                self.greatest_step_nbr = number;
            }
            WorksheetEdit::InsertDistinctVars { vars } => {
                if vars.len() < 2 {
                    return Err(WorksheetError::InvalidEdit(
                        "a $d statement needs at least two variables".into(),
                    ));
                }
                let text = format!("$d {}\n", vars.join(" "));
                let index = self.proof_slot();
                let kind = StmtKind::DistinctVars(DistinctVarsStmt { vars });
                let id = self.insert_stmt(index, kind, text);
                self.dj_vars.push(id);
            }
            WorksheetEdit::InsertGeneratedProof { proof } => {
                let text = format_generated_proof(
                    &proof,
                    settings.proof_text_width,
                    settings.proof_indent,
                );
                let index = self.proof_slot();
                if let Some(existing) = self
                    .stmts
                    .get(index)
                    .filter(|s| matches!(s.kind, StmtKind::GeneratedProof(_)))
                    .map(|s| s.id())
                {
                    self.remove_stmts(&[existing]);
                }
                self.insert_stmt(
                    index,
                    StmtKind::GeneratedProof(GeneratedProofStmt {
                        proof: ProofBody::Compressed(proof),
                    }),
                    text,
                );
            }
            WorksheetEdit::PlaceCursor { step, field } => {
                let index = self.step_index(step)?;
                let id = self.stmts[index].id();
                self.cursor.rebind(id, field, index, self.generation);
            }
        }
        Ok(())
    }
}
