use pretty_assertions::assert_eq;
use proof_worksheet::{
    HypRef, LoadRequest, MessageRange, ProofBody, Severity, StepId, StmtKind,
    StructuralErrorKind, TheoremInfo, TheoremTable, Worksheet, WorksheetSettings,
};

const SYLLOGISM: &str = "\
$( <MM> <PROOF_ASST> THEOREM=syllogism LOC_AFTER=
h1:: |- ( ph -> ps )
h2:: |- ( ps -> ch )
3:2: |- ( ph -> ( ps -> ch ) )
4:3: |- ( ( ph -> ps ) -> ( ph -> ch ) )
qed:1,4: |- ( ph -> ch )
$)
";

fn load(text: &str) -> Worksheet {
    Worksheet::load(
        text,
        &LoadRequest::default(),
        &WorksheetSettings::default(),
        &TheoremTable::new(),
    )
}

fn wrap(body: &str) -> String {
    format!("$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n{body}$)\n")
}

/// Code of the structural error that broke the load.
fn broken_code(ws: &Worksheet) -> &'static str {
    assert!(ws.has_structural_errors(), "expected a structural error");
    ws.messages()
        .iter()
        .last()
        .map(|m| m.code)
        .unwrap_or_default()
}

#[test]
fn test_minimal_worksheet_loads() {
    let ws = load(SYLLOGISM);

    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    assert!(ws.messages().is_empty());
    assert_eq!(ws.theorem(), Some("syllogism"));
    assert_eq!(ws.loc_after(), None);
    assert!(ws.is_new_theorem());
    assert_eq!(ws.hyp_step_count(), 2);
    assert_eq!(
        ws.qed_step()
            .and_then(|s| s.step_id())
            .map(|id| id.to_string()),
        Some("qed".to_string())
    );
    // Four steps ahead of qed.
    assert_eq!(ws.proof_steps().count(), 5);
    assert_eq!(
        ws.proof_steps()
            .filter(|s| s.step_id() != Some(StepId::Qed))
            .count(),
        4
    );
    assert_eq!(ws.greatest_step_number(), 4);
    assert_eq!(ws.output_text(), SYLLOGISM);

    let qed = ws.qed_step().and_then(|s| s.as_derivation()).unwrap();
    assert_eq!(
        qed.hyps,
        [HypRef::Step(StepId::Number(1)), HypRef::Step(StepId::Number(4))]
    );
}

#[test]
fn test_duplicate_step_ids_rejected() {
    let ws = load(&wrap("1::ax-1 |- a\n01::ax-1 |- b\nqed:1:ax-mp |- c\n"));
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::DuplicateStepId(String::new()).code()
    );

    let ws = load(&wrap("h1::t.1 |- a\n1::ax-1 |- b\nqed:1:ax-mp |- c\n"));
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::DuplicateStepId(String::new()).code()
    );
}

#[test]
fn test_qed_must_be_last_step() {
    let ws = load(&wrap(
        "1::ax-1 |- a\nqed:1:ax-mp |- c\n* trailing comment\n$d x y\n2::ax-1 |- b\n",
    ));
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::StepAfterQed(String::new()).code()
    );

    let ws = load(&wrap("1::ax-1 |- a\nqed:1:ax-mp |- c\n* trailing comment\n$d x y\n"));
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    assert_eq!(ws.dj_vars().count(), 1);
}

#[test]
fn test_statement_must_start_in_column_one() {
    let ws = load(" $( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\nqed::a |- a\n$)\n");
    assert_eq!(broken_code(&ws), StructuralErrorKind::NotColumnOne.code());

    // Continuation lines are fine; a stray column-1 symbol is not.
    let ws = load(&wrap("qed::ax-1 |- ( ph\n  -> ps )\n"));
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    let ws = load(&wrap("qed::ax-1 |- ( ph\n-> ps )\n"));
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::UnrecognizedStatement(String::new()).code()
    );
}

#[test]
fn test_header_and_footer_errors() {
    let cases = [
        ("", StructuralErrorKind::EmptyWorksheet.code()),
        ("qed::a |- a\n$)\n", StructuralErrorKind::MissingHeader.code()),
        (
            "$( <MM> THEOREM=t LOC_AFTER=?\nqed::a |- a\n$)\n",
            "E-PA-0105",
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=? LOC_AFTER=?\nqed::a |- a\n$)\n",
            StructuralErrorKind::MissingTheoremLabel.code(),
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\nqed::a |- a\n",
            StructuralErrorKind::MissingFooter.code(),
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n1::a |- a\n",
            StructuralErrorKind::MissingQed.code(),
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n1::a |- a\n$)\n",
            StructuralErrorKind::FooterBeforeQed.code(),
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\nqed::a |- a\n$)\n* late\n",
            StructuralErrorKind::TextAfterFooter.code(),
        ),
        (
            "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n\
             $( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=?\n",
            StructuralErrorKind::DuplicateHeader.code(),
        ),
    ];
    for (text, code) in cases {
        let ws = load(text);
        assert_eq!(broken_code(&ws), code, "input: {text:?}");
    }
}

#[test]
fn test_step_field_errors() {
    let cases = [
        ("?::ax-1 |- a\n", StructuralErrorKind::MissingStepId.code()),
        ("0::ax-1 |- a\n", "E-PA-0202"),
        ("x1::ax-1 |- a\n", "E-PA-0202"),
        ("ax-1 |- a\n", StructuralErrorKind::UnrecognizedStatement(String::new()).code()),
        ("1:2::ax-1 |- a\n", "E-PA-0205"),
        ("hqed::t.1 |- a\n", StructuralErrorKind::HypothesisQed.code()),
        ("h1:2:t.1 |- a\n", StructuralErrorKind::HypothesisHasHyps.code()),
        ("h1::#2 |- a\n", StructuralErrorKind::HypothesisLocalRef.code()),
        ("1:7:ax-1 |- a\n", "E-PA-0208"),
        ("1::ax-1 |- a\nh2::t.1 |- b\n", "E-PA-0213"),
        ("1::# |- a\n", StructuralErrorKind::EmptyLocalRef.code()),
        ("1::ax-1 |- a\nqed:1:#1 |- a\n", StructuralErrorKind::QedLocalRef.code()),
        ("$d x\nqed::a |- a\n", StructuralErrorKind::DistinctVarsTooFew.code()),
        ("$d x y x\nqed::a |- a\n", "E-PA-0212"),
    ];
    for (body, code) in cases {
        let ws = load(&wrap(body));
        assert_eq!(broken_code(&ws), code, "body: {body:?}");
    }
}

#[test]
fn test_structural_error_message_names_theorem_and_step() {
    let ws = load(&wrap("5::ax-1 |- a\n5::ax-1 |- b\nqed:5:ax-mp |- c\n"));
    let message = ws.messages().iter().last().unwrap();
    assert_eq!(message.severity, Severity::Error);
    assert!(message.text.starts_with("Theorem t Step 5 (line 3, column 1):"), "{message}");
    let range = message.range.unwrap();
    assert_eq!(range.end - range.start, "5::ax-1".len());
}

#[test]
fn test_hypothesis_count_checked_for_known_theorem() {
    let mut table = TheoremTable::new();
    table.insert(TheoremInfo {
        label: "syllogism".into(),
        hypotheses: vec![],
        conclusion: "|- ( ph -> ch )".into(),
        mandatory_frame: vec![],
    });
    let ws = Worksheet::load(
        SYLLOGISM,
        &LoadRequest::default(),
        &WorksheetSettings::default(),
        &table,
    );
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::HypCountMismatch {
            expected: 0,
            found: 2
        }
        .code()
    );
    assert!(!ws.is_new_theorem());

    let message = ws.messages().iter().last().unwrap();
    assert!(message.text.contains("(line 1, column 1)"), "{message}");
    assert_eq!(message.range, Some(MessageRange::new(0, "$(".len())));
}

#[test]
fn test_loc_after_rules() {
    let mut table = TheoremTable::new();
    table.insert_label("ax-mp");

    let known = "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=ax-mp\nqed::a |- a\n$)\n";
    let ws = Worksheet::load(
        known,
        &LoadRequest::default(),
        &WorksheetSettings::default(),
        &table,
    );
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    assert_eq!(ws.loc_after(), Some("ax-mp"));

    let unknown = "$( <MM> <PROOF_ASST> THEOREM=t LOC_AFTER=nosuch\nqed::a |- a\n$)\n";
    let ws = Worksheet::load(
        unknown,
        &LoadRequest::default(),
        &WorksheetSettings::default(),
        &table,
    );
    assert_eq!(
        broken_code(&ws),
        StructuralErrorKind::UnknownLocAfter(String::new()).code()
    );
}

#[test]
fn test_validation_messages_do_not_break_load() {
    let ws = load(&wrap("h1::t.1\n2:1:ax-1 wff ph\nqed:2:ax-mp |- ( &W1 -> ph )\n"));
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    assert!(ws.messages().find("E-PA-0601").is_some());
    assert!(ws.messages().find("E-PA-0602").is_some());
    assert_eq!(ws.messages().error_count(), 2);

    let qed = ws.qed_step().and_then(|s| s.as_derivation()).unwrap();
    assert!(qed.has_work_vars);
    assert!(qed.is_incomplete());
}

#[test]
fn test_generated_proof_block() {
    let ws = load(&wrap(
        "qed::ax-mp |- a\n$= ( ax-1 ax-mp )\n    ABZC $.\n",
    ));
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    let Some(ProofBody::Compressed(proof)) = ws.generated_proof().map(|p| &p.proof) else {
        panic!("expected a compressed proof");
    };
    assert_eq!(proof.labels, ["ax-1", "ax-mp"]);
    assert_eq!(proof.code_text(), "ABZC");

    let ws = load(&wrap("qed::ax-mp |- a\n$= wph wps ax-mp $.\n"));
    let Some(ProofBody::Normal(labels)) = ws.generated_proof().map(|p| &p.proof) else {
        panic!("expected a normal proof");
    };
    assert_eq!(labels, &["wph", "wps", "ax-mp"]);

    let cases = [
        ("qed::ax-mp |- a\n$= ( ax-1 ABZC $.\n", "E-PA-0502"),
        ("qed::ax-mp |- a\n$= ( ax-1 ) AZZ $.\n", "E-PA-0502"),
        ("qed::ax-mp |- a\n$= ( ax-1 ) AB\n", StructuralErrorKind::UnterminatedProof.code()),
        ("$= ( ax-1 ) AB $.\nqed::ax-mp |- a\n", StructuralErrorKind::ProofBeforeQed.code()),
        (
            "qed::ax-mp |- a\n$= ( ) A $.\n$= ( ) A $.\n",
            StructuralErrorKind::DuplicateGeneratedProof.code(),
        ),
    ];
    for (body, code) in cases {
        assert_eq!(broken_code(&load(&wrap(body))), code, "body: {body:?}");
    }
}

#[test]
fn test_statement_kinds_in_order() {
    let ws = load(&wrap("* note\nh1:t.1 |- a\nqed:1:ax-mp |- b\n"));
    assert!(!ws.has_structural_errors(), "{}", ws.messages());
    let kinds: Vec<&str> = ws
        .stmts()
        .iter()
        .map(|s| match s.kind() {
            StmtKind::Header(_) => "header",
            StmtKind::Footer => "footer",
            StmtKind::Comment(_) => "comment",
            StmtKind::DistinctVars(_) => "dj",
            StmtKind::Hypothesis(_) => "hyp",
            StmtKind::Derivation(_) => "step",
            StmtKind::GeneratedProof(_) => "proof",
        })
        .collect();
    assert_eq!(kinds, ["header", "comment", "hyp", "step", "footer"]);

    let hyp = ws.step(StepId::Number(1)).and_then(|s| s.step()).unwrap();
    assert_eq!(hyp.ref_label.as_deref(), Some("t.1"));
}
