//! The worksheet: ordered statements plus the indices derived from them.
//!
//! A worksheet is built fresh from text on every edit cycle by [`Worksheet::load`], which never
//! fails outright. Structural errors abort the load, set a sticky broken flag and land in the
//! message list; anything that needs a valid worksheet checks
//! [`Worksheet::has_structural_errors`] first.

use crate::cursor::{Cursor, CursorField, CursorLocation};
use crate::error::{StructuralError, StructuralErrorKind, WorksheetError};
use crate::line_index::{LineIndex, Position};
use crate::loader::Loader;
use crate::local_ref;
use crate::logic::{LogicSystem, TheoremInfo};
use crate::messages::Messages;
use crate::settings::{CursorPlacement, WorksheetSettings};
use crate::stmt::{
    DerivationStep, DistinctVarsStmt, GeneratedProofStmt, StepId, Stmt, StmtId, StmtKind,
};
use std::collections::HashMap;
use std::fmt::Write;

/// Per-load options supplied by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRequest {
    /// Character offset of the editor caret, if known.
    pub cursor_offset: Option<usize>,
    /// The host wants step-selector candidates for the step under the cursor.
    pub step_selector_search: bool,
}

/// One loaded proof worksheet.
#[derive(Debug, Clone)]
pub struct Worksheet {
    pub(crate) theorem: Option<String>,
    pub(crate) loc_after: Option<String>,
    pub(crate) new_theorem: bool,
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) greatest_step_nbr: u32,
    pub(crate) hyp_step_cnt: usize,
    pub(crate) qed: Option<StmtId>,
    pub(crate) dj_vars: Vec<StmtId>,
    pub(crate) structural_errors: bool,
    pub(crate) messages: Messages,
    pub(crate) cursor: Cursor,
    pub(crate) step_selector_step: Option<StmtId>,
    next_stmt_id: u32,
    /// Bumped whenever statements are removed or inserted.
    pub(crate) generation: u64,
}

impl Worksheet {
    fn empty(cursor_offset: Option<usize>) -> Self {
        Self {
            theorem: None,
            loc_after: None,
            new_theorem: true,
            stmts: Vec::new(),
            greatest_step_nbr: 0,
            hyp_step_cnt: 0,
            qed: None,
            dj_vars: Vec::new(),
            structural_errors: false,
            messages: Messages::new(),
            cursor: Cursor::new(cursor_offset),
            step_selector_step: None,
            next_stmt_id: 0,
            generation: 0,
        }
    }

    /// Load worksheet text.
    ///
    /// Always returns a worksheet. On a structural error the statements loaded so far are kept,
    /// [`has_structural_errors`](Self::has_structural_errors) is `true` and the error is the last
    /// entry of [`messages`](Self::messages).
    pub fn load(
        text: &str,
        request: &LoadRequest,
        settings: &WorksheetSettings,
        logic: &dyn LogicSystem,
    ) -> Self {
        let mut ws = Self::empty(request.cursor_offset);

        let mut result = Loader::new(text, &mut ws, settings, logic).run();
        if result.is_ok() {
            result = ws.finale(request, settings, logic);
        }
        if let Err(err) = result {
            ws.mark_broken(err);
        }

        tracing::info!(
            theorem = ws.theorem.as_deref().unwrap_or("?"),
            statements = ws.stmts.len(),
            broken = ws.structural_errors,
            messages = ws.messages.len(),
            "worksheet loaded"
        );
        ws
    }

    /// Build and load a fresh worksheet for an existing theorem: header, one `h` step per
    /// logical hypothesis, an empty `qed` step carrying the conclusion, and the footer.
    pub fn skeleton(
        label: &str,
        logic: &dyn LogicSystem,
        settings: &WorksheetSettings,
    ) -> Result<Self, WorksheetError> {
        let info = logic
            .theorem(label)
            .ok_or_else(|| WorksheetError::UnknownTheorem(label.to_string()))?;
        let text = skeleton_text(info);
        Ok(Self::load(&text, &LoadRequest::default(), settings, logic))
    }

    fn mark_broken(&mut self, mut err: StructuralError) {
        if err.theorem.is_none() {
            err.theorem = self.theorem.clone();
        }
        tracing::warn!(code = err.code(), "{err}");
        self.messages.push(err.to_message());
        self.structural_errors = true;
    }

    fn finale(
        &mut self,
        request: &LoadRequest,
        settings: &WorksheetSettings,
        logic: &dyn LogicSystem,
    ) -> Result<(), StructuralError> {
        if request.step_selector_search {
            tracing::debug!("finale: step selector request");
            self.resolve_step_selector()?;
        }

        let spliced = local_ref::resolve_local_refs(self)?;
        tracing::debug!(spliced, "finale: local references");
        self.check_qed()?;

        self.dj_vars = self
            .stmts
            .iter()
            .filter(|s| matches!(s.kind, StmtKind::DistinctVars(_)))
            .map(Stmt::id)
            .collect();

        self.check_hyp_count(logic)?;
        self.compute_levels();
        self.place_cursor(settings.cursor_placement);
        Ok(())
    }

    fn resolve_step_selector(&mut self) -> Result<(), StructuralError> {
        let target = self
            .cursor
            .statement()
            .and_then(|id| self.stmt(id))
            .filter(|s| s.as_derivation().is_some())
            .map(Stmt::id);
        match target {
            Some(id) => {
                self.step_selector_step = Some(id);
                Ok(())
            }
            None => Err(StructuralErrorKind::SelectorCursorNotOnStep.into()),
        }
    }

    /// The loader guarantees a trailing `qed`; splicing must not have lost it.
    fn check_qed(&self) -> Result<(), StructuralError> {
        let last = self.proof_steps().last().map(Stmt::id);
        match self.qed {
            Some(qed) if last == Some(qed) => Ok(()),
            _ => Err(StructuralErrorKind::Internal(
                "the qed step is missing or is not the last proof step".into(),
            )
            .into()),
        }
    }

    fn check_hyp_count(&self, logic: &dyn LogicSystem) -> Result<(), StructuralError> {
        let Some(info) = self.theorem.as_deref().and_then(|t| logic.theorem(t)) else {
            return Ok(());
        };
        let expected = info.logical_hyp_count();
        if expected == self.hyp_step_cnt {
            return Ok(());
        }
        let mut err = StructuralError::new(StructuralErrorKind::HypCountMismatch {
            expected,
            found: self.hyp_step_cnt,
        });
        // Reported against the header, which names the theorem.
        if let Some(header) = self.stmts.first() {
            let start = header.span().start;
            err = err.at(header.position(), start, start + header.lead_len);
        }
        Err(err)
    }

    /// Levels count hops from `qed` along hypothesis lists, taking the longest path.
    pub(crate) fn compute_levels(&mut self) {
        let mut levels: HashMap<StepId, usize> = HashMap::new();
        for stmt in self.stmts.iter().rev() {
            let Some(step) = stmt.as_derivation() else {
                continue;
            };
            let level = if step.core.id.is_qed() {
                0
            } else {
                match levels.get(&step.core.id) {
                    Some(&level) => level,
                    None => continue,
                }
            };
            levels.entry(step.core.id).or_insert(level);
            for hyp in step.hyp_steps() {
                let entry = levels.entry(hyp).or_insert(0);
                *entry = (*entry).max(level + 1);
            }
        }
        for stmt in &mut self.stmts {
            if let Some(core) = stmt.step_mut() {
                core.level = levels.get(&core.id).copied().unwrap_or(0);
            }
        }
    }

    fn place_cursor(&mut self, placement: CursorPlacement) {
        if self.cursor.is_set() {
            return;
        }
        let mut incomplete = self
            .stmts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_derivation().is_some_and(DerivationStep::is_incomplete));
        let chosen = match placement {
            CursorPlacement::FirstIncomplete => incomplete.next(),
            CursorPlacement::LastIncomplete => incomplete.last(),
            CursorPlacement::AsIs => match self.cursor.input_offset() {
                Some(offset) => {
                    self.cursor.set_offset(offset);
                    return;
                }
                None => None,
            },
        };
        let chosen = chosen.map(|(i, s)| (i, s.id(), incomplete_field(s)));
        let chosen = chosen.or_else(|| {
            let qed = self.qed?;
            Some((self.index_of(qed)?, qed, CursorField::Ref))
        });
        if let Some((index, id, field)) = chosen {
            tracing::debug!(?placement, ?field, "finale: cursor placed");
            self.cursor.set_statement(id, field, index, self.generation);
        }
    }

    pub(crate) fn alloc_id(&mut self) -> StmtId {
        let id = StmtId(self.next_stmt_id);
        self.next_stmt_id += 1;
        id
    }

    /// Recompute statement start offsets and positions from the statement texts.
    pub(crate) fn recompute_spans(&mut self) {
        let mut offset = 0;
        let mut line = 0;
        for stmt in &mut self.stmts {
            stmt.start = offset;
            stmt.position = Position::new(line, 0);
            offset += stmt.text.chars().count();
            line += stmt.text.matches('\n').count();
        }
    }

    /// Remove statements, clearing any cursor or selector binding to them.
    pub(crate) fn remove_stmts(&mut self, ids: &[StmtId]) {
        if ids.is_empty() {
            return;
        }
        self.stmts.retain(|s| !ids.contains(&s.id));
        for &id in ids {
            self.cursor.forget_statement(id);
            self.dj_vars.retain(|&d| d != id);
            if self.step_selector_step == Some(id) {
                self.step_selector_step = None;
            }
        }
        self.generation += 1;
        self.recompute_spans();
    }

    /// Insert a statement before `index`, taking ownership of its text.
    pub(crate) fn insert_stmt(&mut self, index: usize, kind: StmtKind, text: String) -> StmtId {
        let lead_len = text
            .find(|c: char| c.is_whitespace())
            .unwrap_or(text.len());
        let stmt = Stmt {
            id: self.alloc_id(),
            kind,
            text,
            lead_len,
            start: 0,
            position: Position::default(),
        };
        let id = stmt.id;
        self.stmts.insert(index.min(self.stmts.len()), stmt);
        self.generation += 1;
        self.recompute_spans();
        id
    }

    /// Theorem label from the header.
    pub fn theorem(&self) -> Option<&str> {
        self.theorem.as_deref()
    }

    /// LOC_AFTER label, when given.
    pub fn loc_after(&self) -> Option<&str> {
        self.loc_after.as_deref()
    }

    /// `true` if the theorem is not in the database yet.
    pub fn is_new_theorem(&self) -> bool {
        self.new_theorem
    }

    /// Returns `true` if the last load or rebuild hit a structural error.
    pub fn has_structural_errors(&self) -> bool {
        self.structural_errors
    }

    /// All statements in textual order.
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    /// Look up a statement by id.
    pub fn stmt(&self, id: StmtId) -> Option<&Stmt> {
        self.stmts.iter().find(|s| s.id == id)
    }

    /// Index of a statement by id.
    pub fn index_of(&self, id: StmtId) -> Option<usize> {
        self.stmts.iter().position(|s| s.id == id)
    }

    /// Hypothesis and derivation steps in order.
    pub fn proof_steps(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts.iter().filter(|s| s.is_proof_step())
    }

    /// Find a proof step by step id.
    pub fn step(&self, id: StepId) -> Option<&Stmt> {
        self.proof_steps().find(|s| s.step_id() == Some(id))
    }

    /// The `qed` step.
    pub fn qed_step(&self) -> Option<&Stmt> {
        self.qed.and_then(|id| self.stmt(id))
    }

    /// Number of hypothesis steps.
    pub fn hyp_step_count(&self) -> usize {
        self.hyp_step_cnt
    }

    /// Largest numeric step id.
    pub fn greatest_step_number(&self) -> u32 {
        self.greatest_step_nbr
    }

    /// `$d` statements in order.
    pub fn dj_vars(&self) -> impl Iterator<Item = &DistinctVarsStmt> {
        self.dj_vars
            .iter()
            .filter_map(|&id| match &self.stmt(id)?.kind {
                StmtKind::DistinctVars(d) => Some(d),
                _ => None,
            })
    }

    /// The `$=` block, if present.
    pub fn generated_proof(&self) -> Option<&GeneratedProofStmt> {
        self.stmts.iter().find_map(|s| match &s.kind {
            StmtKind::GeneratedProof(p) => Some(p),
            _ => None,
        })
    }

    /// Derivation steps still needing work.
    pub fn incomplete_steps(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts
            .iter()
            .filter(|s| s.as_derivation().is_some_and(DerivationStep::is_incomplete))
    }

    /// Messages collected during loading and editing.
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// The cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The cursor resolved against the current text.
    pub fn cursor_location(&self) -> Option<CursorLocation> {
        self.cursor.resolve(self)
    }

    /// The step a step-selector search was requested for.
    pub fn step_selector_step(&self) -> Option<&Stmt> {
        self.step_selector_step.and_then(|id| self.stmt(id))
    }

    /// Changes whenever statements are inserted or removed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next free step number for an inserted step.
    pub fn next_auto_step_number(&self) -> u32 {
        self.greatest_step_nbr.saturating_add(1)
    }

    /// The worksheet as text: every statement's current text, in order.
    pub fn output_text(&self) -> String {
        self.stmts.iter().map(|s| s.text.as_str()).collect()
    }

    /// Line index over [`output_text`](Self::output_text).
    pub fn line_index(&self) -> LineIndex {
        LineIndex::from_text(&self.output_text())
    }
}

/// Field to put the cursor in for an incomplete step.
fn incomplete_field(stmt: &Stmt) -> CursorField {
    let Some(step) = stmt.as_derivation() else {
        return CursorField::Text;
    };
    if step.core.ref_label.is_none() {
        CursorField::Ref
    } else if step.core.formula.is_none() || step.has_work_vars {
        CursorField::Formula
    } else {
        CursorField::Hyp
    }
}

/// Worksheet text for a fresh proof of `info`.
pub fn skeleton_text(info: &TheoremInfo) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "$( <MM> <PROOF_ASST> THEOREM={}  LOC_AFTER=?\n",
        info.label
    );
    for (i, hyp) in info.hypotheses.iter().enumerate() {
        let _ = writeln!(text, "h{}::{} {}", i + 1, hyp.label, hyp.formula);
    }
    let _ = writeln!(text, "qed:: {}", info.conclusion);
    text.push_str("\n$)\n");
    text
}
