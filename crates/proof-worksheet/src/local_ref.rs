//! `#` local references.
//!
//! A derivation step whose ref field reads `#x` stands for "the first earlier step whose id or
//! ref label is `x`". Steps that cite it are rewritten to cite that target directly and the
//! local-ref step is removed. A `#x` entry in a hypothesis list is resolved the same way in
//! place.

use crate::error::{StructuralError, StructuralErrorKind};
use crate::messages::{Message, MessageRange};
use crate::stmt::{Formula, HypRef, StepId, StmtId};
use crate::worksheet::Worksheet;
use std::collections::HashMap;

/// Local-ref step and target formulas differ.
pub(crate) const MSG_LOCAL_REF_FORMULA: &str = "E-PA-0603";

struct Prior {
    id: StepId,
    ref_label: Option<String>,
    formula: Option<Formula>,
    is_local_ref: bool,
}

impl Prior {
    fn matches(&self, target: &str) -> bool {
        self.id.to_string() == target || self.ref_label.as_deref() == Some(target)
    }
}

/// First earlier step matching `target`; chained local references are rejected.
fn find_target<'p>(
    prior: &'p [Prior],
    target: &str,
) -> Result<&'p Prior, StructuralErrorKind> {
    match prior.iter().find(|p| p.matches(target)) {
        None => Err(StructuralErrorKind::LocalRefNotFound(target.to_string())),
        Some(p) if p.is_local_ref => Err(StructuralErrorKind::ChainedLocalRef(target.to_string())),
        Some(p) => Ok(p),
    }
}

/// Resolve every local reference and splice out local-ref steps. Returns the number of steps
/// removed.
pub(crate) fn resolve_local_refs(ws: &mut Worksheet) -> Result<usize, StructuralError> {
    let mut prior: Vec<Prior> = Vec::new();
    let mut redirect: HashMap<StepId, StepId> = HashMap::new();
    let mut doomed: Vec<StmtId> = Vec::new();
    let mut changed: Vec<usize> = Vec::new();
    let mut mismatches: Vec<(String, String, MessageRange)> = Vec::new();

    for (index, stmt) in ws.stmts.iter_mut().enumerate() {
        let range = MessageRange::new(stmt.span().start, stmt.span().start + stmt.lead_len);
        let position = stmt.position();
        let stmt_id = stmt.id();
        let Some(step) = stmt.as_derivation_mut() else {
            if let Some(core) = stmt.step() {
                prior.push(Prior {
                    id: core.id,
                    ref_label: core.ref_label.clone(),
                    formula: core.formula.clone(),
                    is_local_ref: false,
                });
            }
            continue;
        };
        let step_name = step.core.id.to_string();
        let fail = |kind: StructuralErrorKind| {
            StructuralError::new(kind)
                .at_step(step_name.clone())
                .at(position, range.start, range.end)
        };

        let mut rewritten = false;
        for hyp in &mut step.hyps {
            let resolved = match hyp {
                HypRef::LocalRef(target) => find_target(&prior, target).map_err(fail)?.id,
                HypRef::Step(id) => match redirect.get(id) {
                    Some(&to) => to,
                    None => continue,
                },
                HypRef::Unknown => continue,
            };
            *hyp = HypRef::Step(resolved);
            rewritten = true;
        }
        if rewritten {
            changed.push(index);
        }

        let is_local_ref = match &step.local_ref {
            Some(target) => {
                let found = find_target(&prior, target).map_err(fail)?;
                if let (Some(mine), Some(theirs)) = (&step.core.formula, &found.formula) {
                    if mine != theirs {
                        mismatches.push((step_name.clone(), found.id.to_string(), range));
                    }
                }
                redirect.insert(step.core.id, found.id);
                doomed.push(stmt_id);
                true
            }
            None => false,
        };

        prior.push(Prior {
            id: step.core.id,
            ref_label: step.core.ref_label.clone(),
            formula: step.core.formula.clone(),
            is_local_ref,
        });
    }

    for (step, target, range) in mismatches {
        let theorem = ws.theorem.as_deref().unwrap_or("?");
        ws.messages.push(
            Message::new(
                MSG_LOCAL_REF_FORMULA,
                format!(
                    "Theorem {theorem} Step {step}: formula differs from local reference target step {target}"
                ),
            )
            .with_range(range),
        );
    }

    for index in changed {
        ws.stmts[index].regenerate_prefix();
    }
    ws.recompute_spans();
    ws.remove_stmts(&doomed);
    Ok(doomed.len())
}

#[cfg(test)]
mod tests {
    use crate::error::StructuralErrorKind;
    use crate::logic::TheoremTable;
    use crate::settings::WorksheetSettings;
    use crate::stmt::{HypRef, StepId};
    use crate::worksheet::{LoadRequest, Worksheet};

    fn load(body: &str) -> Worksheet {
        let text = format!("$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n{body}$)\n");
        Worksheet::load(
            &text,
            &LoadRequest::default(),
            &WorksheetSettings::default(),
            &TheoremTable::new(),
        )
    }

    #[test]
    fn test_hyp_entry_local_ref_by_label() {
        let ws = load("1::ax-1 |- a\n2:#ax-1:ax-mp |- b\nqed:2:a1i |- c\n");
        assert!(!ws.has_structural_errors(), "{}", ws.messages());
        let step = ws
            .step(StepId::Number(2))
            .and_then(|s| s.as_derivation())
            .unwrap();
        assert_eq!(step.hyps, [HypRef::Step(StepId::Number(1))]);
        assert!(ws.output_text().contains("\n2:1:ax-mp |- b\n"));
    }

    #[test]
    fn test_chained_local_ref_rejected() {
        let ws = load("1::ax-1 |- a\n2::#1 |- a\n3::#2 |- a\nqed:3:a1i |- c\n");
        assert!(ws.has_structural_errors());
        let code = StructuralErrorKind::ChainedLocalRef(String::new()).code();
        assert!(ws.messages().find(code).is_some(), "{}", ws.messages());
    }

    #[test]
    fn test_missing_target_rejected() {
        let ws = load("1::ax-1 |- a\n2::#9 |- a\nqed:2:a1i |- c\n");
        assert!(ws.has_structural_errors());
        let code = StructuralErrorKind::LocalRefNotFound(String::new()).code();
        assert!(ws.messages().find(code).is_some(), "{}", ws.messages());
    }

    #[test]
    fn test_formula_mismatch_is_reported() {
        let ws = load("1::ax-1 |- a\n2::#1 |- b\nqed:2:a1i |- c\n");
        assert!(!ws.has_structural_errors(), "{}", ws.messages());
        assert!(ws.messages().find(super::MSG_LOCAL_REF_FORMULA).is_some());
        assert!(ws.step(StepId::Number(2)).is_none());
    }
}
