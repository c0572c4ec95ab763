//! Worksheet loader.
//!
//! A single forward pass over the token stream. Every statement starts with a column-1 token;
//! the statement's own loader consumes continuation tokens up to the next column-1 token and
//! hands that token back to the main loop. Nothing is re-read.

use crate::compress::{CompressedProof, decode_proof_codes};
use crate::error::{StructuralError, StructuralErrorKind};
use crate::logic::LogicSystem;
use crate::messages::{Message, MessageRange};
use crate::settings::WorksheetSettings;
use crate::stmt::{
    CommentStmt, DerivationStep, DistinctVarsStmt, DjVarsStatus, Formula, GeneratedProofStmt,
    HeaderStmt, HypRef, HypothesisStep, ProofBody, StepCore, StepId, Stmt, StmtId, StmtKind,
    VerifyStatus,
};
use crate::tokenizer::{Token, Tokenizer};
use crate::worksheet::Worksheet;

/// Fixed header tokens after `$(`.
const HEADER_MM: &str = "<MM>";
const HEADER_PROOF_ASST: &str = "<PROOF_ASST>";
const HEADER_THEOREM: &str = "THEOREM=";
const HEADER_LOC_AFTER: &str = "LOC_AFTER=";

/// Validation message codes (non-fatal).
pub(crate) const MSG_FORMULA_TYPE: &str = "E-PA-0601";
pub(crate) const MSG_HYP_NO_FORMULA: &str = "E-PA-0602";
pub(crate) const MSG_LOC_AFTER_IGNORED: &str = "I-PA-0701";

type LoadResult<'a> = Result<Option<Token<'a>>, StructuralError>;

pub(crate) struct Loader<'a, 'w> {
    source: &'a str,
    tokens: Tokenizer<'a>,
    ws: &'w mut Worksheet,
    settings: &'w WorksheetSettings,
    logic: &'w dyn LogicSystem,
    /// Step ids seen so far, in order.
    seen_steps: Vec<StepId>,
    header_seen: bool,
    footer_seen: bool,
    qed_seen: bool,
    derivation_seen: bool,
    proof_seen: bool,
}

impl<'a, 'w> Loader<'a, 'w> {
    pub(crate) fn new(
        source: &'a str,
        ws: &'w mut Worksheet,
        settings: &'w WorksheetSettings,
        logic: &'w dyn LogicSystem,
    ) -> Self {
        Self {
            source,
            tokens: Tokenizer::new(source),
            ws,
            settings,
            logic,
            seen_steps: Vec::new(),
            header_seen: false,
            footer_seen: false,
            qed_seen: false,
            derivation_seen: false,
            proof_seen: false,
        }
    }

    /// Load every statement. Stops after the footer.
    pub(crate) fn run(mut self) -> Result<(), StructuralError> {
        let mut next = self.tokens.next();
        let Some(first) = next else {
            return Err(StructuralErrorKind::EmptyWorksheet.into());
        };
        if first.starts_statement() && first.text != "$(" {
            return Err(self.fail(StructuralErrorKind::MissingHeader, &first));
        }

        while !self.footer_seen {
            let Some(token) = next else {
                let kind = if self.qed_seen {
                    StructuralErrorKind::MissingFooter
                } else {
                    StructuralErrorKind::MissingQed
                };
                return Err(kind.into());
            };
            next = self.load(token)?;
        }

        if let Some(extra) = next {
            return Err(self.fail(StructuralErrorKind::TextAfterFooter, &extra));
        }
        Ok(())
    }

    /// Load one statement starting at `token`; returns the token starting the next one.
    fn load(&mut self, token: Token<'a>) -> LoadResult<'a> {
        if !token.starts_statement() {
            return Err(self.fail(StructuralErrorKind::NotColumnOne, &token));
        }
        tracing::debug!(token = token.text, position = %token.position, "statement");

        match token.text {
            "$(" => self.load_header(token),
            "$)" => self.load_footer(token),
            "$=" => self.load_generated_proof(token),
            "$d" => self.load_distinct_vars(token),
            text if text.starts_with('*') => self.load_comment(token),
            text if text.starts_with(['h', 'H']) => self.load_hypothesis(token),
            text if text.contains(':')
                || text.starts_with(|c: char| c.is_ascii_digit())
                || text.eq_ignore_ascii_case(StepId::QED) =>
            {
                self.load_derivation(token)
            }
            text => Err(self.fail(
                StructuralErrorKind::UnrecognizedStatement(text.to_string()),
                &token,
            )),
        }
    }

    fn fail(&self, kind: StructuralErrorKind, token: &Token<'_>) -> StructuralError {
        StructuralError::new(kind).at(token.position, token.start, token.end)
    }

    fn fail_step(
        &self,
        kind: StructuralErrorKind,
        token: &Token<'_>,
        step: &str,
    ) -> StructuralError {
        self.fail(kind, token).at_step(step)
    }

    fn validation(&mut self, code: &'static str, text: String, token: &Token<'_>) {
        let theorem = self.ws.theorem.as_deref().unwrap_or("?");
        self.ws.messages.push(
            Message::new(code, format!("Theorem {theorem} ({}): {text}", token.position))
                .with_range(MessageRange::new(token.start, token.end)),
        );
    }

    /// Consume continuation tokens up to the next column-1 token.
    fn continuation(&mut self) -> (Vec<Token<'a>>, Option<Token<'a>>) {
        let mut body = Vec::new();
        for token in self.tokens.by_ref() {
            if token.starts_statement() {
                return (body, Some(token));
            }
            body.push(token);
        }
        (body, None)
    }

    /// Record a statement spanning from `first` to `next` (or end of input).
    fn push(&mut self, first: &Token<'a>, next: Option<&Token<'a>>, kind: StmtKind) -> StmtId {
        let end = next.map_or(self.source.len(), |t| t.byte_start);
        let stmt = Stmt {
            id: self.ws.alloc_id(),
            kind,
            text: self.source[first.byte_start..end].to_string(),
            lead_len: first.text.len(),
            start: first.start,
            position: first.position,
        };
        let id = stmt.id;

        if let Some(offset) = self.ws.cursor.input_offset() {
            let span = stmt.span();
            let at_end = next.is_none() && offset == span.end;
            if span.contains(&offset) || at_end {
                let field = stmt.field_at(offset - span.start);
                let index = self.ws.stmts.len();
                if self
                    .ws
                    .cursor
                    .set_statement(id, field, index, self.ws.generation)
                {
                    tracing::debug!(offset, ?field, "cursor bound during load");
                }
            }
        }

        self.ws.stmts.push(stmt);
        id
    }

    fn load_header(&mut self, token: Token<'a>) -> LoadResult<'a> {
        if self.header_seen {
            return Err(self.fail(StructuralErrorKind::DuplicateHeader, &token));
        }
        self.header_seen = true;

        let (body, next) = self.continuation();
        let mut fields = body.iter();
        let expect = |expected: &'static str, found: Option<&Token<'_>>| {
            let err = StructuralErrorKind::MalformedHeader {
                expected,
                found: found.map(|t| t.text.to_string()).unwrap_or_default(),
            };
            match found {
                Some(t) => StructuralError::new(err).at(t.position, t.start, t.end),
                None => StructuralError::new(err).at(token.position, token.start, token.end),
            }
        };

        for fixed in [HEADER_MM, HEADER_PROOF_ASST] {
            match fields.next() {
                Some(t) if t.text == fixed => {}
                other => return Err(expect(fixed, other)),
            }
        }

        let theorem_token = fields.next();
        let theorem = theorem_token
            .and_then(|t| t.text.strip_prefix(HEADER_THEOREM))
            .ok_or_else(|| expect("THEOREM=<label>", theorem_token))?;
        if theorem.is_empty() || theorem == "?" {
            return Err(self.fail(StructuralErrorKind::MissingTheoremLabel, &token));
        }
        self.ws.theorem = Some(theorem.to_string());

        let loc_token = fields.next();
        let loc_after = loc_token
            .and_then(|t| t.text.strip_prefix(HEADER_LOC_AFTER))
            .ok_or_else(|| expect("LOC_AFTER=<label>", loc_token))?;
        let loc_after = match loc_after {
            "" | "?" => None,
            label => Some(label.to_string()),
        };

        if let Some(extra) = fields.next() {
            return Err(expect("end of header", Some(extra)));
        }

        self.ws.new_theorem = self.logic.theorem(theorem).is_none();
        if let Some(label) = &loc_after {
            let loc = loc_token.copied().unwrap_or(token);
            if !self.ws.new_theorem {
                self.validation(
                    MSG_LOC_AFTER_IGNORED,
                    format!("LOC_AFTER={label} is ignored for an existing theorem"),
                    &loc,
                );
            } else if !self.logic.has_label(label) {
                return Err(self.fail(StructuralErrorKind::UnknownLocAfter(label.clone()), &loc));
            }
        }
        self.ws.loc_after = loc_after.clone();

        self.push(
            &token,
            next.as_ref(),
            StmtKind::Header(HeaderStmt {
                theorem: theorem.to_string(),
                loc_after,
            }),
        );
        Ok(next)
    }

    fn load_footer(&mut self, token: Token<'a>) -> LoadResult<'a> {
        if !self.qed_seen {
            return Err(self.fail(StructuralErrorKind::FooterBeforeQed, &token));
        }
        let (body, next) = self.continuation();
        if let Some(extra) = body.first() {
            return Err(self.fail(StructuralErrorKind::TextAfterFooter, extra));
        }
        self.push(&token, next.as_ref(), StmtKind::Footer);
        self.footer_seen = true;
        Ok(next)
    }

    fn load_comment(&mut self, token: Token<'a>) -> LoadResult<'a> {
        let (_, next) = self.continuation();
        let end = next.as_ref().map_or(self.source.len(), |t| t.byte_start);
        let text = self.source[token.byte_start + 1..end].trim_end().to_string();
        self.push(&token, next.as_ref(), StmtKind::Comment(CommentStmt { text }));
        Ok(next)
    }

    fn load_distinct_vars(&mut self, token: Token<'a>) -> LoadResult<'a> {
        let (body, next) = self.continuation();
        if body.len() < 2 {
            return Err(self.fail(StructuralErrorKind::DistinctVarsTooFew, &token));
        }
        let mut vars: Vec<String> = Vec::with_capacity(body.len());
        for var in &body {
            if vars.iter().any(|v| v == var.text) {
                return Err(self.fail(
                    StructuralErrorKind::DistinctVarsRepeated(var.text.to_string()),
                    var,
                ));
            }
            vars.push(var.text.to_string());
        }
        self.push(
            &token,
            next.as_ref(),
            StmtKind::DistinctVars(DistinctVarsStmt { vars }),
        );
        Ok(next)
    }

    fn load_generated_proof(&mut self, token: Token<'a>) -> LoadResult<'a> {
        if !self.qed_seen {
            return Err(self.fail(StructuralErrorKind::ProofBeforeQed, &token));
        }
        if self.proof_seen {
            return Err(self.fail(StructuralErrorKind::DuplicateGeneratedProof, &token));
        }
        self.proof_seen = true;

        let (body, next) = self.continuation();
        let Some(end) = body.iter().position(|t| t.text == "$.") else {
            return Err(self.fail(StructuralErrorKind::UnterminatedProof, &token));
        };
        if let Some(extra) = body.get(end + 1) {
            return Err(self.fail(
                StructuralErrorKind::MalformedCompressedProof(format!(
                    "unexpected '{}' after '$.'",
                    extra.text
                )),
                extra,
            ));
        }

        let words = &body[..end];
        let proof = match words.first() {
            Some(open) if open.text == "(" => {
                let Some(close) = words.iter().position(|t| t.text == ")") else {
                    return Err(self.fail(
                        StructuralErrorKind::MalformedCompressedProof(
                            "label list is not closed by ')'".into(),
                        ),
                        open,
                    ));
                };
                let labels = words[1..close]
                    .iter()
                    .map(|t| t.text.to_string())
                    .collect();
                let code_text: String = words[close + 1..].iter().map(|t| t.text).collect();
                let codes = decode_proof_codes(&code_text).map_err(|e| {
                    self.fail(
                        StructuralErrorKind::MalformedCompressedProof(e.to_string()),
                        &token,
                    )
                })?;
                ProofBody::Compressed(CompressedProof { labels, codes })
            }
            _ => ProofBody::Normal(words.iter().map(|t| t.text.to_string()).collect()),
        };

        self.push(
            &token,
            next.as_ref(),
            StmtKind::GeneratedProof(GeneratedProofStmt { proof }),
        );
        Ok(next)
    }

    /// Split `step:hyp:ref` into its three fields; missing trailing fields are empty.
    fn split_prefix<'t>(
        &self,
        token: &Token<'t>,
        prefix: &'t str,
    ) -> Result<[&'t str; 3], StructuralError> {
        let mut fields = prefix.split(':');
        let step = fields.next().unwrap_or_default();
        let hyp = fields.next().unwrap_or_default();
        let reference = fields.next().unwrap_or_default();
        if fields.next().is_some() {
            return Err(self.fail(
                StructuralErrorKind::TooManyPrefixFields(token.text.to_string()),
                token,
            ));
        }
        Ok([step, hyp, reference])
    }

    /// Validate a new step id against everything seen so far.
    fn check_step_id(&mut self, token: &Token<'_>, field: &str) -> Result<StepId, StructuralError> {
        let id = StepId::parse(field).map_err(|kind| self.fail_step(kind, token, field))?;
        if self.qed_seen {
            return Err(self.fail_step(
                StructuralErrorKind::StepAfterQed(field.to_string()),
                token,
                field,
            ));
        }
        if self.seen_steps.contains(&id) {
            return Err(self.fail_step(
                StructuralErrorKind::DuplicateStepId(field.to_string()),
                token,
                field,
            ));
        }
        if let StepId::Number(n) = id {
            self.ws.greatest_step_nbr = self.ws.greatest_step_nbr.max(n);
        }
        self.seen_steps.push(id);
        Ok(id)
    }

    /// Collect the formula following a step prefix.
    fn formula(&mut self, step: &str, token: &Token<'a>) -> (Option<Formula>, Option<Token<'a>>) {
        let (body, next) = self.continuation();
        if body.is_empty() {
            return (None, next);
        }
        let formula = Formula::new(body.iter().map(|t| t.text.to_string()).collect());
        if formula.type_code() != Some(self.settings.provable_type.as_str()) {
            let found = formula.type_code().unwrap_or_default().to_string();
            self.validation(
                MSG_FORMULA_TYPE,
                format!(
                    "Step {step}: formula must begin with '{}', found '{found}'",
                    self.settings.provable_type
                ),
                body.first().unwrap_or(token),
            );
        }
        (Some(formula), next)
    }

    fn load_hypothesis(&mut self, token: Token<'a>) -> LoadResult<'a> {
        let prefix = &token.text[1..];
        let [step, mut hyp, mut reference] = self.split_prefix(&token, prefix)?;
        // `h1:ref` is accepted as well as `h1::ref`.
        if prefix.matches(':').count() == 1 {
            (hyp, reference) = ("", hyp);
        }
        if step.trim().eq_ignore_ascii_case(StepId::QED) {
            return Err(self.fail_step(StructuralErrorKind::HypothesisQed, &token, step));
        }
        let id = self.check_step_id(&token, step)?;
        if self.derivation_seen {
            return Err(self.fail_step(
                StructuralErrorKind::HypothesisAfterDerivation(step.to_string()),
                &token,
                step,
            ));
        }
        if !hyp.trim().is_empty() {
            return Err(self.fail_step(StructuralErrorKind::HypothesisHasHyps, &token, step));
        }
        if reference.starts_with('#') {
            return Err(self.fail_step(StructuralErrorKind::HypothesisLocalRef, &token, step));
        }

        let (formula, next) = self.formula(step, &token);
        if formula.is_none() {
            self.validation(
                MSG_HYP_NO_FORMULA,
                format!("Step {step}: hypothesis step has no formula"),
                &token,
            );
        }

        self.ws.hyp_step_cnt += 1;
        self.push(
            &token,
            next.as_ref(),
            StmtKind::Hypothesis(HypothesisStep {
                core: StepCore {
                    id,
                    ref_label: label_field(reference),
                    formula,
                    level: 0,
                },
            }),
        );
        Ok(next)
    }

    fn load_derivation(&mut self, token: Token<'a>) -> LoadResult<'a> {
        let [step, mut hyp, mut reference] = self.split_prefix(&token, token.text)?;
        // `2:#1` is a local-ref step, the same as `2::#1`.
        if token.text.matches(':').count() == 1 && hyp.starts_with('#') {
            (hyp, reference) = ("", hyp);
        }
        let id = self.check_step_id(&token, step)?;
        self.derivation_seen = true;

        let mut hyps = Vec::new();
        if !hyp.trim().is_empty() {
            for entry in hyp.split(',').map(str::trim) {
                hyps.push(self.hyp_entry(&token, step, entry)?);
            }
        }

        let (ref_label, local_ref) = match reference.strip_prefix('#') {
            Some("") => {
                return Err(self.fail_step(StructuralErrorKind::EmptyLocalRef, &token, step));
            }
            Some(_) if id.is_qed() => {
                return Err(self.fail_step(StructuralErrorKind::QedLocalRef, &token, step));
            }
            Some(target) => (None, Some(target.to_string())),
            None => (label_field(reference), None),
        };

        let (formula, next) = self.formula(step, &token);
        let has_work_vars = formula.as_ref().is_some_and(Formula::has_work_vars);
        let stmt = self.push(
            &token,
            next.as_ref(),
            StmtKind::Derivation(DerivationStep {
                core: StepCore {
                    id,
                    ref_label,
                    formula,
                    level: 0,
                },
                hyps,
                local_ref,
                proof: None,
                verify_status: VerifyStatus::Unverified,
                dj_vars_status: DjVarsStatus::Unchecked,
                derive_auto: false,
                has_work_vars,
            }),
        );

        if id.is_qed() {
            self.qed_seen = true;
            self.ws.qed = Some(stmt);
        }
        Ok(next)
    }

    fn hyp_entry(
        &self,
        token: &Token<'_>,
        step: &str,
        entry: &str,
    ) -> Result<HypRef, StructuralError> {
        if entry.is_empty() || entry == "?" {
            return Ok(HypRef::Unknown);
        }
        if let Some(target) = entry.strip_prefix('#') {
            if target.is_empty() {
                return Err(self.fail_step(StructuralErrorKind::EmptyLocalRef, token, step));
            }
            return Ok(HypRef::LocalRef(target.to_string()));
        }
        let unknown = || {
            self.fail_step(
                StructuralErrorKind::UnknownHypStep(entry.to_string()),
                token,
                step,
            )
        };
        let id = StepId::parse(entry).map_err(|_| unknown())?;
        if !self.seen_steps[..self.seen_steps.len().saturating_sub(1)].contains(&id) {
            return Err(unknown());
        }
        Ok(HypRef::Step(id))
    }
}

/// A ref field value: blank and `?` mean "none".
fn label_field(text: &str) -> Option<String> {
    match text.trim() {
        "" | "?" => None,
        label => Some(label.to_string()),
    }
}
