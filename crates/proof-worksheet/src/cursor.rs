//! Worksheet cursor.
//!
//! The cursor is assigned at most once per load: either bound to a statement and field while
//! statements are read, or placed by the finale phase. Later attempts are ignored. A statement
//! binding is held by [`StmtId`], so removing statements never leaves it pointing at the wrong
//! text; removing the bound statement clears it.

use crate::line_index::{LineIndex, Position};
use crate::stmt::StmtId;
use crate::worksheet::Worksheet;

/// The part of a statement the cursor sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CursorField {
    /// Anywhere in a non-step statement.
    #[default]
    Text,
    /// Step id field.
    Step,
    /// Hypothesis list field.
    Hyp,
    /// Reference label field.
    Ref,
    /// Formula.
    Formula,
}

/// A resolved cursor location in the worksheet text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLocation {
    /// Character offset.
    pub offset: usize,
    /// Zero-based line and column.
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Offset(usize),
    Statement {
        stmt: StmtId,
        field: CursorField,
        /// Index of `stmt` when bound; valid while the worksheet generation is unchanged.
        index: usize,
        generation: u64,
    },
}

/// Set-once cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    input_offset: Option<usize>,
    target: Option<Target>,
}

impl Cursor {
    /// Create an unassigned cursor remembering the caller's offset.
    pub fn new(input_offset: Option<usize>) -> Self {
        Self {
            input_offset,
            target: None,
        }
    }

    /// The offset supplied with the load request.
    pub fn input_offset(&self) -> Option<usize> {
        self.input_offset
    }

    /// Returns `true` once the cursor has been assigned.
    pub fn is_set(&self) -> bool {
        self.target.is_some()
    }

    /// Bind to a statement field. Returns `false` if the cursor was already assigned.
    pub(crate) fn set_statement(
        &mut self,
        stmt: StmtId,
        field: CursorField,
        index: usize,
        generation: u64,
    ) -> bool {
        if self.is_set() {
            return false;
        }
        self.target = Some(Target::Statement {
            stmt,
            field,
            index,
            generation,
        });
        true
    }

    /// Place at a raw character offset. Returns `false` if the cursor was already assigned.
    pub(crate) fn set_offset(&mut self, offset: usize) -> bool {
        if self.is_set() {
            return false;
        }
        self.target = Some(Target::Offset(offset));
        true
    }

    /// Drop the binding if it points at `stmt`.
    pub(crate) fn forget_statement(&mut self, stmt: StmtId) {
        if self.statement() == Some(stmt) {
            self.target = None;
        }
    }

    /// Force a new binding, replacing any previous assignment.
    pub(crate) fn rebind(
        &mut self,
        stmt: StmtId,
        field: CursorField,
        index: usize,
        generation: u64,
    ) {
        self.target = None;
        self.set_statement(stmt, field, index, generation);
    }

    /// The bound statement, if any.
    pub fn statement(&self) -> Option<StmtId> {
        match self.target {
            Some(Target::Statement { stmt, .. }) => Some(stmt),
            _ => None,
        }
    }

    /// The bound field, if bound to a statement.
    pub fn field(&self) -> Option<CursorField> {
        match self.target {
            Some(Target::Statement { field, .. }) => Some(field),
            _ => None,
        }
    }

    /// Resolve to an offset and line/column in the worksheet's current text.
    pub fn resolve(&self, ws: &Worksheet) -> Option<CursorLocation> {
        let offset = match self.target? {
            Target::Offset(offset) => offset,
            Target::Statement {
                stmt,
                field,
                index,
                generation,
            } => {
                let stmts = ws.stmts();
                let found = if generation == ws.generation() {
                    stmts.get(index).filter(|s| s.id() == stmt)
                } else {
                    None
                };
                let found = found.or_else(|| stmts.iter().find(|s| s.id() == stmt))?;
                found.span().start + found.field_offset(field)
            }
        };

        let index = LineIndex::from_text(&ws.output_text());
        let offset = offset.min(index.char_count());
        Some(CursorLocation {
            offset,
            position: index.char_offset_to_position(offset),
        })
    }
}
