// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Specification annotations.
//!
//! Doc-tag payloads go back through the front end's [`AnnotationParser`] and
//! then through the expression converter in spec mode. Each annotation is
//! processed as an isolated diagnostics batch: if anything goes wrong the
//! batch is withdrawn and collapsed into a single error naming the
//! annotation, so one broken tag produces one diagnostic and never poisons
//! the function body.
//!
//! `modifies` tags become synthesized frame postconditions: every state
//! variable must equal its entry value outside the declared paths.

use boogie_ast::{Expr, ExprRef, ProcDecl, Specification};
use sol_model::{BinaryOperator, DocTag, DocTagKind, Loc, NodeId, VariableDeclaration};

use crate::context::{TranslationContext, BALANCE, THIS};
use crate::encoding;
use crate::expression::ExpressionConverter;

/// A converted annotation expression with its range and overflow side
/// conditions and the original text for diagnostics.
#[derive(Debug, Clone)]
pub struct AnnotationExpr {
    pub expr: ExprRef,
    pub text: String,
    pub tccs: Vec<ExprRef>,
    pub ocs: Vec<ExprRef>,
    pub loc: Loc,
}

/// One `modifies` clause: a state-variable path, optionally guarded by a
/// condition evaluated in the entry state.
#[derive(Debug, Clone)]
pub struct ModifiesSpec {
    pub target: AnnotationExpr,
    pub cond: Option<AnnotationExpr>,
}

/// Parse and convert one annotation snippet in the scope of `scope`.
/// Failures collapse into a single diagnostic and yield `None`.
pub fn parse_annotation(
    ctx: &mut TranslationContext,
    text: &str,
    scope: NodeId,
    loc: &Loc,
) -> Option<AnnotationExpr> {
    let mark = ctx.reporter.mark();
    let converted = match ctx.parser.parse_expression(text, scope, ctx.model) {
        Ok(parsed) => {
            let res = ExpressionConverter::convert(ctx, &parsed, true);
            if !res.stmts.is_empty() {
                ctx.error(loc, "annotation would introduce intermediate statements");
            }
            Some(res)
        }
        Err(err) => {
            ctx.error(loc, err.to_string());
            None
        }
    };
    if ctx.reporter.errors_since(mark) {
        ctx.reporter.drain_from(mark);
        ctx.error(
            loc,
            format!("error(s) while processing annotation '{}'", text),
        );
        return None;
    }
    let res = converted.expect("BUG: annotation conversion missing without errors");
    Some(AnnotationExpr {
        expr: res.expr,
        text: text.to_string(),
        tccs: res.tccs,
        ocs: res.ocs,
        loc: loc.clone(),
    })
}

/// All annotations of one kind among `tags`, parsed in `scope`.
pub fn gather(
    ctx: &mut TranslationContext,
    tags: &[DocTag],
    kind: DocTagKind,
    scope: NodeId,
) -> Vec<AnnotationExpr> {
    let mut result = vec![];
    for tag in tags {
        match tag.classify() {
            Some((k, text)) if k == kind => {
                if let Some(ann) = parse_annotation(ctx, text, scope, &tag.loc) {
                    result.push(ann);
                }
            }
            _ => {}
        }
    }
    result
}

/// Whether any tag opts the function into the contract invariants.
pub fn includes_contract_invariants(tags: &[DocTag]) -> bool {
    tags.iter()
        .any(|t| matches!(t.classify(), Some((DocTagKind::ContractInvariantsInclude, _))))
}

/// Collect the `modifies` clauses of a function. Returns the parsed clauses
/// plus a flag for `modifies all`, which waives frame synthesis entirely.
pub fn gather_modifies(
    ctx: &mut TranslationContext,
    tags: &[DocTag],
    scope: NodeId,
) -> (Vec<ModifiesSpec>, bool) {
    let mut specs = vec![];
    let mut all = false;
    for tag in tags {
        let Some((DocTagKind::Modifies, text)) = tag.classify() else {
            continue;
        };
        let (target_text, cond_text) = match text.split_once(" if ") {
            Some((t, c)) => (t.trim(), Some(c.trim())),
            None => (text.trim(), None),
        };
        if target_text == "all" {
            ctx.warning(&tag.loc, "'modifies all' disables frame checking");
            all = true;
            continue;
        }
        let Some(target) = parse_annotation(ctx, target_text, scope, &tag.loc) else {
            continue;
        };
        if chain_root(&target.expr).is_none() {
            ctx.error(&tag.loc, "modifies target must be a state variable path");
            continue;
        }
        let cond = match cond_text {
            Some(c) => match parse_annotation(ctx, c, scope, &tag.loc) {
                Some(cond) => Some(cond),
                None => continue,
            },
            None => None,
        };
        specs.push(ModifiesSpec { target, cond });
    }
    (specs, all)
}

/// The root variable of a select chain, if the expression is one.
fn chain_root(expr: &ExprRef) -> Option<String> {
    match &**expr {
        Expr::Id(name) => Some(name.clone()),
        Expr::ArrSel { base, .. } | Expr::DtSel { base, .. } => chain_root(base),
        _ => None,
    }
}

/// Synthesize frame postconditions from the `modifies` clauses: for every
/// state variable, the post value must equal the entry value with each
/// declared (and enabled) path overwritten by its current contents.
pub fn add_modifies_specs(
    ctx: &mut TranslationContext,
    proc: &mut ProcDecl,
    specs: &[ModifiesSpec],
    state_vars: &[std::rc::Rc<VariableDeclaration>],
    is_payable: bool,
    loc: &Loc,
) {
    for var in state_vars {
        let name = ctx.mangle(var.id);
        let mut expected = Expr::old(Expr::id(name.clone()));
        for spec in specs {
            if chain_root(&spec.target.expr).as_deref() != Some(name.as_str()) {
                continue;
            }
            // Re-read the declared path from the snapshot and overwrite it
            // with the current contents, so only that path may differ.
            let rebased = Expr::replace_base(&spec.target.expr, expected.clone());
            let (_, updated) = Expr::select_to_update(&rebased, spec.target.expr.clone());
            expected = match &spec.cond {
                Some(cond) => Expr::cond(Expr::old(cond.expr.clone()), updated, expected),
                None => updated,
            };
        }
        proc.ensures.push(Specification::new(
            Expr::eq(Expr::id(name), expected),
            ctx.attrs(
                loc,
                format!("Function might modify '{}' illegally", var.name),
            ),
        ));
    }
    // The contract balance is framed separately: payable functions may only
    // be credited, everyone else must leave it unchanged unless a clause
    // names it.
    if !specs
        .iter()
        .any(|s| chain_root(&s.target.expr).as_deref() == Some(BALANCE))
    {
        let this_bal = Expr::arr_sel(Expr::id(BALANCE), Expr::id(THIS));
        let frame = if is_payable {
            encoding::env_compare(
                ctx,
                BinaryOperator::Gte,
                this_bal.clone(),
                Expr::old(this_bal),
            )
        } else {
            Expr::eq(this_bal.clone(), Expr::old(this_bal))
        };
        proc.ensures.push(Specification::new(
            frame,
            ctx.attrs(loc, "Function might modify the balance illegally"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use boogie_ast::BoogieType;
    use sol_model::{
        AnnotationParser, ContractDefinition, ContractKind, ExprKind, LiteralValue,
        SolExpression, SolType, SourceModel, SourceUnit,
    };

    use crate::Options;

    /// Maps fixed snippets to canned resolved expressions.
    struct CannedParser;

    impl AnnotationParser for CannedParser {
        fn parse_expression(
            &self,
            text: &str,
            _scope: NodeId,
            _model: &SourceModel,
        ) -> anyhow::Result<SolExpression> {
            match text {
                "x >= 0" => Ok(SolExpression {
                    id: 100,
                    loc: Loc::default(),
                    ty: SolType::Bool,
                    kind: ExprKind::BinaryOp {
                        op: sol_model::BinaryOperator::Gte,
                        lhs: Box::new(state_var_ref(101)),
                        rhs: Box::new(SolExpression {
                            id: 102,
                            loc: Loc::default(),
                            ty: SolType::uint(256),
                            kind: ExprKind::Literal(LiteralValue::Number(0.into())),
                        }),
                    },
                }),
                "x" => Ok(state_var_ref(103)),
                "x = 1" => Ok(SolExpression {
                    id: 104,
                    loc: Loc::default(),
                    ty: SolType::uint(256),
                    kind: ExprKind::Assignment {
                        op: None,
                        lhs: Box::new(state_var_ref(105)),
                        rhs: Box::new(SolExpression {
                            id: 106,
                            loc: Loc::default(),
                            ty: SolType::uint(256),
                            kind: ExprKind::Literal(LiteralValue::Number(1.into())),
                        }),
                    },
                }),
                "true" => Ok(SolExpression {
                    id: 107,
                    loc: Loc::default(),
                    ty: SolType::Bool,
                    kind: ExprKind::Literal(LiteralValue::Bool(true)),
                }),
                _ => anyhow::bail!("cannot parse '{}'", text),
            }
        }
    }

    fn state_var_ref(id: NodeId) -> SolExpression {
        SolExpression {
            id,
            loc: Loc::default(),
            ty: SolType::uint(256),
            kind: ExprKind::Identifier {
                name: "x".to_string(),
                referenced: 2,
            },
        }
    }

    fn fixture() -> SourceModel {
        let x = Rc::new(VariableDeclaration {
            id: 2,
            loc: Loc::default(),
            name: "x".to_string(),
            ty: SolType::uint(256),
            value: None,
            is_state: true,
        });
        let contract = Rc::new(ContractDefinition {
            id: 1,
            loc: Loc::default(),
            name: "C".to_string(),
            kind: ContractKind::Contract,
            linearized_bases: vec![1],
            state_vars: vec![x],
            functions: vec![],
            modifiers: vec![],
            structs: vec![],
            enums: vec![],
            events: vec![],
            doc_tags: vec![],
        });
        SourceModel::new(vec![SourceUnit {
            file: "c.sol".to_string(),
            contracts: vec![contract],
        }])
    }

    #[test]
    fn successful_annotation_leaves_no_diagnostics() {
        let model = fixture();
        let mut ctx = TranslationContext::new(&model, Options::default(), &CannedParser);
        let ann = parse_annotation(&mut ctx, "x >= 0", 1, &Loc::default());
        let ann = ann.expect("annotation should convert");
        assert_eq!(ann.expr.to_string(), "(x#2[__this] >= 0)");
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn unparsable_annotation_collapses_to_one_error() {
        let model = fixture();
        let mut ctx = TranslationContext::new(&model, Options::default(), &CannedParser);
        let ann = parse_annotation(&mut ctx, "not parsable", 1, &Loc::default());
        assert!(ann.is_none());
        assert_eq!(ctx.reporter.error_count(), 1);
        let msg = ctx.reporter.diagnostics()[0].message.clone();
        assert!(msg.contains("not parsable"));
    }

    #[test]
    fn side_effecting_annotation_is_rejected() {
        let model = fixture();
        let mut ctx = TranslationContext::new(&model, Options::default(), &CannedParser);
        let ann = parse_annotation(&mut ctx, "x = 1", 1, &Loc::default());
        assert!(ann.is_none());
        // Collapsed: exactly one error despite the inner report.
        assert_eq!(ctx.reporter.error_count(), 1);
    }

    #[test]
    fn modifies_clause_splits_target_and_condition() {
        let model = fixture();
        let mut ctx = TranslationContext::new(&model, Options::default(), &CannedParser);
        let tags = vec![
            DocTag::notice("modifies x if true", Loc::default()),
            DocTag::notice("modifies all", Loc::default()),
        ];
        let (specs, all) = gather_modifies(&mut ctx, &tags, 1);
        assert!(all);
        assert_eq!(specs.len(), 1);
        assert!(specs[0].cond.is_some());
        assert_eq!(chain_root(&specs[0].target.expr).as_deref(), Some("x#2"));
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn frame_conditions_cover_every_state_variable() {
        let model = fixture();
        let mut ctx = TranslationContext::new(&model, Options::default(), &CannedParser);
        let tags = vec![DocTag::notice("modifies x", Loc::default())];
        let (specs, all) = gather_modifies(&mut ctx, &tags, 1);
        assert!(!all);
        let mut proc = ProcDecl::new("f");
        proc.params.push(("__this".to_string(), BoogieType::Int));
        let contract = model.contract(1).clone();
        add_modifies_specs(
            &mut ctx,
            &mut proc,
            &specs,
            &model.all_state_vars(&contract),
            false,
            &Loc::default(),
        );
        // One frame per state variable plus the balance frame.
        assert_eq!(proc.ensures.len(), 2);
        let first = proc.ensures[0].expr.to_string();
        assert_eq!(
            first,
            "(x#2 == old(x#2)[__this := x#2[__this]])"
        );
        let balance = proc.ensures[1].expr.to_string();
        assert_eq!(balance, "(__balance[__this] == old(__balance[__this]))");
    }
}
