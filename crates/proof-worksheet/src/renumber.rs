//! Step renumbering.

use crate::error::WorksheetError;
use crate::stmt::{HypRef, StepId, Stmt};
use crate::worksheet::Worksheet;
use std::collections::HashMap;

impl Worksheet {
    /// Renumber steps `interval, 2 * interval, ...` in textual order. `qed` keeps its name.
    ///
    /// Hypothesis lists are rewritten to the new numbers and step prefixes regenerated; the
    /// cursor stays bound to the same statement. Returns the number of statements whose text
    /// changed.
    pub fn renumber(&mut self, interval: u32) -> Result<usize, WorksheetError> {
        if interval == 0 {
            return Err(WorksheetError::ZeroRenumberInterval);
        }
        if self.structural_errors {
            return Err(WorksheetError::StructurallyBroken);
        }

        let mut renumbered: HashMap<StepId, StepId> = HashMap::new();
        let mut next = 0u32;
        for core in self.stmts.iter().filter_map(Stmt::step) {
            if core.id.is_qed() {
                continue;
            }
            next = next
                .checked_add(interval)
                .ok_or(WorksheetError::RenumberOverflow(interval))?;
            renumbered.insert(core.id, StepId::Number(next));
        }

        let mut changed = 0;
        for stmt in &mut self.stmts {
            if let Some(core) = stmt.step_mut() {
                if let Some(&to) = renumbered.get(&core.id) {
                    core.id = to;
                }
            }
            if let Some(step) = stmt.as_derivation_mut() {
                for hyp in &mut step.hyps {
                    if let HypRef::Step(id) = hyp {
                        if let Some(&to) = renumbered.get(id) {
                            *id = to;
                        }
                    }
                }
            }
            if stmt.regenerate_prefix() {
                changed += 1;
            }
        }

        self.greatest_step_nbr = next;
        self.recompute_spans();
        tracing::debug!(interval, steps = renumbered.len(), changed, "renumbered");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::TheoremTable;
    use crate::settings::WorksheetSettings;
    use crate::worksheet::LoadRequest;

    #[test]
    fn test_zero_interval_rejected() {
        let text = "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\nqed::ax-1 |- a\n$)\n";
        let mut ws = Worksheet::load(
            text,
            &LoadRequest::default(),
            &WorksheetSettings::default(),
            &TheoremTable::new(),
        );
        assert!(matches!(
            ws.renumber(0),
            Err(WorksheetError::ZeroRenumberInterval)
        ));
    }

    #[test]
    fn test_broken_worksheet_rejected() {
        let mut ws = Worksheet::load(
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n$)\n",
            &LoadRequest::default(),
            &WorksheetSettings::default(),
            &TheoremTable::new(),
        );
        assert!(ws.has_structural_errors());
        assert!(matches!(
            ws.renumber(1),
            Err(WorksheetError::StructurallyBroken)
        ));
    }
}
