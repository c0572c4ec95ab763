use pretty_assertions::assert_eq;
use proof_worksheet::{
    CursorField, DjVarsStatus, Formula, LoadRequest, Position, ProofBody, StepId, TheoremTable,
    VerifyStatus, Worksheet, WorksheetEdit, WorksheetError, WorksheetProcessor,
    WorksheetSettings, compress_proof,
};
use std::sync::atomic::AtomicBool;

const SYLLOGISM: &str = "\
$( <MM> <PROOF_ASST> THEOREM=syllogism LOC_AFTER=
h1:: |- ( ph -> ps )
h2:: |- ( ps -> ch )
3:2: |- ( ph -> ( ps -> ch ) )
4:3: |- ( ( ph -> ps ) -> ( ph -> ch ) )
qed:1,4: |- ( ph -> ch )
$)
";

/// Stands in for a unifier that already knows the answer.
struct CannedUnifier;

impl WorksheetProcessor for CannedUnifier {
    type Error = WorksheetError;

    fn process(&mut self, worksheet: &Worksheet) -> Result<Vec<WorksheetEdit>, Self::Error> {
        if worksheet.qed_step().is_none() {
            return Err(WorksheetError::UnknownStep("qed".into()));
        }
        let set_ref = |step, label: &str| WorksheetEdit::SetStepRef {
            step,
            ref_label: label.to_string(),
        };
        let mandatory = ["wph", "wps", "wch", "syllogism.1", "syllogism.2"];
        let rpn = [
            "wph", "wps", "wch", "syllogism.2", "a1i", "a2i", "syllogism.1", "ax-mp",
        ];
        Ok(vec![
            set_ref(StepId::Number(3), "a1i"),
            set_ref(StepId::Number(4), "a2i"),
            set_ref(StepId::Qed, "ax-mp"),
            WorksheetEdit::SetStepStatus {
                step: StepId::Qed,
                verify_status: VerifyStatus::Unified,
                dj_vars_status: DjVarsStatus::Ok,
                proof: Some(rpn.iter().map(|s| s.to_string()).collect()),
            },
            WorksheetEdit::InsertDistinctVars {
                vars: vec!["ph".into(), "ps".into()],
            },
            WorksheetEdit::InsertGeneratedProof {
                proof: compress_proof(&mandatory, &rpn),
            },
            WorksheetEdit::PlaceCursor {
                step: StepId::Qed,
                field: CursorField::Formula,
            },
        ])
    }
}

fn load(text: &str) -> Worksheet {
    Worksheet::load(
        text,
        &LoadRequest::default(),
        &WorksheetSettings::default(),
        &TheoremTable::new(),
    )
}

#[test]
fn test_unifier_edits_are_folded_back() {
    let settings = WorksheetSettings::default();
    let mut ws = load(SYLLOGISM);
    ws.apply_processor(&mut CannedUnifier, &settings, &AtomicBool::new(false))
        .unwrap();

    assert_eq!(
        ws.output_text(),
        "\
$( <MM> <PROOF_ASST> THEOREM=syllogism LOC_AFTER=
h1:: |- ( ph -> ps )
h2:: |- ( ps -> ch )
3:2:a1i |- ( ph -> ( ps -> ch ) )
4:3:a2i |- ( ( ph -> ps ) -> ( ph -> ch ) )
qed:1,4:ax-mp |- ( ph -> ch )
$d ph ps
$= ( a1i a2i ax-mp ) ABCEFGDH $.
$)
"
    );
    assert_eq!(ws.incomplete_steps().count(), 0);
    assert_eq!(ws.dj_vars().count(), 1);

    let qed = ws.qed_step().and_then(|s| s.as_derivation()).unwrap();
    assert_eq!(qed.verify_status, VerifyStatus::Unified);
    assert_eq!(qed.proof.as_ref().map(Vec::len), Some(8));

    assert_eq!(ws.cursor().field(), Some(CursorField::Formula));
    assert_eq!(
        ws.cursor_location().unwrap().position,
        Position::new(5, "qed:1,4:ax-mp ".len())
    );

    // The folded-back text is a valid worksheet again.
    let reloaded = load(&ws.output_text());
    assert!(!reloaded.has_structural_errors(), "{}", reloaded.messages());
    let Some(ProofBody::Compressed(proof)) = reloaded.generated_proof().map(|p| &p.proof) else {
        panic!("expected a compressed proof");
    };
    assert_eq!(proof.labels, ["a1i", "a2i", "ax-mp"]);
}

#[test]
fn test_generated_proof_is_replaced() {
    let settings = WorksheetSettings::default();
    let mut ws = load(SYLLOGISM);
    let proof = |rpn: &[&str]| WorksheetEdit::InsertGeneratedProof {
        proof: compress_proof(&[] as &[&str], rpn),
    };
    ws.apply_edits([proof(&["ax-1"])], &settings).unwrap();
    ws.apply_edits([proof(&["ax-2", "ax-2"])], &settings).unwrap();

    let proofs = ws
        .stmts()
        .iter()
        .filter(|s| s.text().starts_with("$="))
        .map(|s| s.text())
        .collect::<Vec<_>>();
    assert_eq!(proofs, ["$= ( ax-2 ) AA $.\n"]);
    assert!(ws.output_text().ends_with("$= ( ax-2 ) AA $.\n$)\n"));
}

#[test]
fn test_derived_step_gets_next_number() {
    let settings = WorksheetSettings::default();
    let mut ws = load(SYLLOGISM);
    ws.apply_edits(
        [WorksheetEdit::InsertDerivedStep {
            before: StepId::Number(4),
            hyps: vec![StepId::Number(3)],
            ref_label: None,
            formula: Formula::parse("|- ( &W1 -> ch )"),
        }],
        &settings,
    )
    .unwrap();

    assert_eq!(ws.greatest_step_number(), 5);
    let stmt = ws.step(StepId::Number(5)).unwrap();
    assert_eq!(stmt.text(), "5:3: |- ( &W1 -> ch )\n");
    assert_eq!(stmt.position(), Position::new(4, 0));
    let step = stmt.as_derivation().unwrap();
    assert!(step.derive_auto);
    assert!(step.has_work_vars);

    let err = ws
        .apply_edits(
            [WorksheetEdit::InsertDerivedStep {
                before: StepId::Number(3),
                hyps: vec![StepId::Number(4)],
                ref_label: None,
                formula: Formula::parse("|- ph"),
            }],
            &settings,
        )
        .unwrap_err();
    assert!(matches!(err, WorksheetError::UnknownStep(step) if step == "4"));
}

#[test]
fn test_derived_step_cannot_precede_hypotheses() {
    let settings = WorksheetSettings::default();
    let mut ws = load(SYLLOGISM);
    let before = ws.output_text();
    let err = ws
        .apply_edits(
            [WorksheetEdit::InsertDerivedStep {
                before: StepId::Number(2),
                hyps: vec![],
                ref_label: None,
                formula: Formula::parse("|- ph"),
            }],
            &settings,
        )
        .unwrap_err();
    assert!(matches!(err, WorksheetError::InvalidEdit(_)));
    assert_eq!(ws.output_text(), before);

    // Right after the last hypothesis is fine, and the result still loads.
    ws.apply_edits(
        [WorksheetEdit::InsertDerivedStep {
            before: StepId::Number(3),
            hyps: vec![StepId::Number(1)],
            ref_label: None,
            formula: Formula::parse("|- ph"),
        }],
        &settings,
    )
    .unwrap();
    let reloaded = load(&ws.output_text());
    assert!(!reloaded.has_structural_errors(), "{}", reloaded.messages());
}

#[test]
fn test_set_formula_rewrites_body() {
    let settings = WorksheetSettings::default();
    let mut ws = load(SYLLOGISM);
    ws.apply_edits(
        [WorksheetEdit::SetStepFormula {
            step: StepId::Number(3),
            formula: Formula::parse("|- ( ph -> &W2 )"),
        }],
        &settings,
    )
    .unwrap();
    let stmt = ws.step(StepId::Number(3)).unwrap();
    assert_eq!(stmt.text(), "3:2: |- ( ph -> &W2 )\n");
    assert!(stmt.as_derivation().unwrap().has_work_vars);

    let err = ws
        .apply_edits(
            [WorksheetEdit::InsertDistinctVars {
                vars: vec!["ph".into()],
            }],
            &settings,
        )
        .unwrap_err();
    assert!(matches!(err, WorksheetError::InvalidEdit(_)));
}
