// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Declaration and statement conversion.
//!
//! Contracts become groups of global declarations, functions become
//! procedures with implicit `__this`/`__msg_sender`/`__msg_value` parameters.
//! Modifiers and base constructors are inlined under fresh naming scopes;
//! `return` jumps to the return label of the innermost inlined copy, so a
//! function with k modifiers carries k+1 labels.
//!
//! Per-function protocol: diagnostics are marked on entry, and if conversion
//! reported any error the procedure body is replaced by a havoc of the
//! contract state, marked `{:skipped}`. Annotation failures never reach this
//! path, they collapse inside `specs`.

use std::rc::Rc;

use boogie_ast::{Attr, Block, BoogieType, Decl, Expr, ExprRef, ProcDecl, Specification, Stmt};
use sol_model::{
    BinaryOperator, ContractDefinition, ContractKind, DocTag, DocTagKind, ExprKind,
    FunctionDefinition, Loc, ModifierInvocation, SolExpression, SolStatement, StmtKind,
    VariableDeclaration,
};

use crate::context::{
    TranslationContext, BALANCE, MSG_SENDER, MSG_VALUE, OVERFLOW_FLAG, THIS,
};
use crate::encoding;
use crate::expression::{ExprResult, ExpressionConverter};
use crate::specs;

pub fn convert_model(ctx: &mut TranslationContext) {
    let model = ctx.model;
    for unit in model.units() {
        for contract in &unit.contracts {
            convert_contract(ctx, contract.clone());
        }
    }
}

fn convert_contract(ctx: &mut TranslationContext, contract: Rc<ContractDefinition>) {
    log::debug!("translating contract '{}'", contract.name);
    ctx.set_current_contract(contract.clone());
    ctx.add_decl(Decl::comment(format!("Contract '{}'", contract.name)));

    // State variables, inherited ones included; shared base declarations
    // deduplicate by name.
    for var in ctx.model.all_state_vars(&contract) {
        let ty = ctx.state_var_type(&var.ty, &var.loc);
        let name = ctx.mangle(var.id);
        ctx.add_decl(Decl::var(name, ty));
    }

    ctx.invariants = specs::gather(
        ctx,
        &contract.doc_tags,
        DocTagKind::Invariant,
        contract.id,
    );

    for fun in &contract.functions {
        FunctionConverter::convert(ctx, contract.clone(), fun.clone());
    }

    if contract.kind == ContractKind::Contract {
        if contract.constructor().is_none() {
            let has_state = !ctx.model.all_state_vars(&contract).is_empty();
            if has_state || !ctx.invariants.is_empty() {
                synthesize_constructor(ctx, &contract);
            }
        }
        if !ctx.invariants.is_empty() {
            synthesize_eth_receive(ctx, &contract);
        }
    }
}

/// The implicit constructor of a contract without a declared one: state
/// initialization plus the contract invariants as postconditions.
fn synthesize_constructor(ctx: &mut TranslationContext, contract: &Rc<ContractDefinition>) {
    let mut proc = ProcDecl::new(format!("__constructor#{}", contract.id));
    proc.params = implicit_params(ctx);
    let mut conv = FunctionConverter::new(ctx, contract.clone(), None);
    let mut block = Block::new();
    conv.entry_assumptions(&mut block, false);
    conv.constructor_prologue(&mut block);
    proc.locals = conv.locals;
    proc.body = Some(block);
    add_invariant_specs(ctx, &mut proc, false, true);
    ctx.add_decl(Decl::Proc(proc));
}

/// Checks that the contract invariants survive a plain ether transfer to the
/// contract.
fn synthesize_eth_receive(ctx: &mut TranslationContext, contract: &Rc<ContractDefinition>) {
    let mut proc = ProcDecl::new(format!("{}_eth_receive", contract.name));
    let amount = "__amount".to_string();
    proc.params = vec![
        (THIS.to_string(), ctx.address_type()),
        (amount.clone(), ctx.int_type(256)),
    ];
    let this_bal = Expr::arr_sel(Expr::id(BALANCE), Expr::id(THIS));
    let mut block = Block::new();
    let zero = encoding::env_zero(ctx);
    let nonneg = encoding::env_compare(ctx, BinaryOperator::Gte, Expr::id(amount.clone()), zero);
    block.push(Stmt::assume(nonneg));
    let credit = encoding::env_arith(ctx, BinaryOperator::Add, this_bal, Expr::id(amount));
    block.push(Stmt::assign(
        Expr::id(BALANCE),
        Expr::arr_upd(Expr::id(BALANCE), Expr::id(THIS), credit),
    ));
    proc.body = Some(block);
    for inv in ctx.invariants.clone() {
        for side in inv.tccs.iter().chain(inv.ocs.iter()) {
            proc.requires.push(Specification::plain(side.clone()));
            proc.ensures.push(Specification::plain(side.clone()));
        }
        proc.requires.push(Specification::plain(inv.expr.clone()));
        proc.ensures.push(Specification::new(
            inv.expr.clone(),
            ctx.attrs(
                &inv.loc,
                format!("Invariant '{}' might not hold when receiving ether.", inv.text),
            ),
        ));
    }
    ctx.add_decl(Decl::Proc(proc));
}

fn implicit_params(ctx: &TranslationContext) -> Vec<(String, BoogieType)> {
    vec![
        (THIS.to_string(), ctx.address_type()),
        (MSG_SENDER.to_string(), ctx.address_type()),
        (MSG_VALUE.to_string(), ctx.int_type(256)),
    ]
}

/// Attach the contract invariants to a procedure contract.
fn add_invariant_specs(
    ctx: &mut TranslationContext,
    proc: &mut ProcDecl,
    as_requires: bool,
    as_ensures: bool,
) {
    for inv in ctx.invariants.clone() {
        for side in inv.tccs.iter().chain(inv.ocs.iter()) {
            if as_requires {
                proc.requires.push(Specification::plain(side.clone()));
            }
            if as_ensures {
                proc.ensures.push(Specification::plain(side.clone()));
            }
        }
        if as_requires {
            proc.requires.push(Specification::plain(inv.expr.clone()));
        }
        if as_ensures {
            proc.ensures.push(Specification::new(
                inv.expr.clone(),
                ctx.attrs(
                    &inv.loc,
                    format!("Invariant '{}' might not hold.", inv.text),
                ),
            ));
        }
    }
}

struct FunctionConverter<'a, 'env> {
    ctx: &'a mut TranslationContext<'env>,
    contract: Rc<ContractDefinition>,
    fun: Option<Rc<FunctionDefinition>>,
    /// Modifier invocations to inline, base-constructor entries filtered out.
    mods: Vec<ModifierInvocation>,
    locals: Vec<(String, BoogieType)>,
    return_labels: Vec<String>,
    next_return: u32,
    /// `$continue` targets of the enclosing loops.
    loop_stack: Vec<String>,
    /// Current modifier inlining depth, consumed by `_` placeholders.
    level: usize,
    uses_overflow: bool,
}

impl<'a, 'env> FunctionConverter<'a, 'env> {
    fn new(
        ctx: &'a mut TranslationContext<'env>,
        contract: Rc<ContractDefinition>,
        fun: Option<Rc<FunctionDefinition>>,
    ) -> Self {
        let mods = fun
            .as_ref()
            .map(|f| {
                f.modifiers
                    .iter()
                    .filter(|m| ctx.model.modifier(m.referenced).is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        FunctionConverter {
            ctx,
            contract,
            fun,
            mods,
            locals: vec![],
            return_labels: vec![],
            next_return: 0,
            loop_stack: vec![],
            level: 0,
            uses_overflow: false,
        }
    }

    fn convert(
        ctx: &'a mut TranslationContext<'env>,
        contract: Rc<ContractDefinition>,
        fun: Rc<FunctionDefinition>,
    ) {
        let mark = ctx.reporter.mark();
        let name = if fun.is_constructor() {
            format!("__constructor#{}", contract.id)
        } else {
            ctx.mangle(fun.id)
        };
        let mut proc = ProcDecl::new(name);
        proc.params = implicit_params(ctx);
        for param in &fun.params {
            let ty = ctx.type_of(&param.ty, &param.loc);
            proc.params.push((ctx.mangle(param.id), ty));
        }
        for ret in &fun.returns {
            let ty = ctx.type_of(&ret.ty, &ret.loc);
            proc.returns.push((ctx.mangle(ret.id), ty));
        }

        let mut conv = FunctionConverter::new(ctx, contract.clone(), Some(fun.clone()));
        let mut block = Block::new();
        conv.entry_assumptions(&mut block, fun.is_payable);
        conv.default_returns(&mut block);
        if fun.is_constructor() {
            conv.constructor_prologue(&mut block);
        }
        if fun.body.is_some() {
            conv.inline_level(0, &mut block);
        } else {
            // Unimplemented (virtual or interface) function: the call may do
            // anything to the contract state.
            conv.havoc_state(&mut block);
        }
        let uses_overflow = conv.uses_overflow;
        let mut locals = std::mem::take(&mut conv.locals);
        drop(conv);

        if ctx.options.overflow && uses_overflow {
            locals.push((OVERFLOW_FLAG.to_string(), BoogieType::Bool));
            block.stmts.insert(
                0,
                Stmt::assign(Expr::id(OVERFLOW_FLAG), Expr::bool_lit(false)),
            );
            block.push(Stmt::assert(
                Expr::not(Expr::id(OVERFLOW_FLAG)),
                ctx.attrs(&fun.loc, "Overflow might occur."),
            ));
        }
        proc.locals = locals;
        proc.body = Some(block);

        // Doc-tag pre- and postconditions, parsed in the function's scope.
        for pre in specs::gather(ctx, &fun.doc_tags, DocTagKind::Precondition, fun.id) {
            for side in pre.tccs.iter().chain(pre.ocs.iter()) {
                proc.requires.push(Specification::plain(side.clone()));
            }
            let attrs = ctx.attrs(
                &pre.loc,
                format!("Precondition '{}' might not hold.", pre.text),
            );
            proc.requires.push(Specification::new(pre.expr, attrs));
        }
        for post in specs::gather(ctx, &fun.doc_tags, DocTagKind::Postcondition, fun.id) {
            for side in post.tccs.iter().chain(post.ocs.iter()) {
                proc.ensures.push(Specification::plain(side.clone()));
            }
            let attrs = ctx.attrs(
                &post.loc,
                format!("Postcondition '{}' might not hold.", post.text),
            );
            proc.ensures.push(Specification::new(post.expr, attrs));
        }

        // Contract invariants: assumed and checked on the public surface,
        // only established by the constructor, opted into by annotation
        // otherwise.
        let included = specs::includes_contract_invariants(&fun.doc_tags);
        if fun.is_constructor() {
            add_invariant_specs(ctx, &mut proc, false, true);
        } else if (fun.is_public() || included) && !ctx.invariants.is_empty() {
            add_invariant_specs(ctx, &mut proc, true, true);
        }

        if ctx.options.modifies_analysis && fun.is_public() && !fun.is_constructor() {
            let (mod_specs, all) = specs::gather_modifies(ctx, &fun.doc_tags, fun.id);
            if !all {
                let state_vars = ctx.model.all_state_vars(&contract);
                specs::add_modifies_specs(
                    ctx,
                    &mut proc,
                    &mod_specs,
                    &state_vars,
                    fun.is_payable,
                    &fun.loc,
                );
            }
        }

        if ctx.reporter.errors_since(mark) {
            degrade(ctx, &mut proc, &contract, &fun);
        }
        ctx.add_decl(Decl::Proc(proc));
    }

    // ---------- body scaffolding ----------

    /// Entry-state assumptions: typed ranges for parameters and state, a
    /// non-negative message value, and the payable credit.
    fn entry_assumptions(&mut self, block: &mut Block, payable: bool) {
        let zero = encoding::env_zero(self.ctx);
        if payable {
            block.push(Stmt::assume(encoding::env_compare(
                self.ctx,
                BinaryOperator::Gte,
                Expr::id(MSG_VALUE),
                zero.clone(),
            )));
        } else {
            // Sending ether to a non-payable function reverts before entry.
            block.push(Stmt::assume(Expr::eq(Expr::id(MSG_VALUE), zero.clone())));
        }
        let this_bal = Expr::arr_sel(Expr::id(BALANCE), Expr::id(THIS));
        block.push(Stmt::assume(encoding::env_compare(
            self.ctx,
            BinaryOperator::Gte,
            this_bal.clone(),
            zero,
        )));
        if let Some(fun) = self.fun.clone() {
            for param in &fun.params {
                let name = Expr::id(self.ctx.mangle(param.id));
                if let Some(tcc) = encoding::tcc_for(self.ctx, &name, &param.ty) {
                    block.push(Stmt::assume(tcc));
                }
            }
        }
        for var in self.ctx.model.all_state_vars(&self.contract) {
            let value = Expr::arr_sel(Expr::id(self.ctx.mangle(var.id)), Expr::id(THIS));
            if let Some(tcc) = encoding::tcc_for(self.ctx, &value, &var.ty) {
                block.push(Stmt::assume(tcc));
            }
        }
        if payable {
            let credit = encoding::env_arith(
                self.ctx,
                BinaryOperator::Add,
                this_bal,
                Expr::id(MSG_VALUE),
            );
            block.push(Stmt::assign(
                Expr::id(BALANCE),
                Expr::arr_upd(Expr::id(BALANCE), Expr::id(THIS), credit),
            ));
        }
    }

    /// Named return values start out zero-initialized.
    fn default_returns(&mut self, block: &mut Block) {
        let Some(fun) = self.fun.clone() else {
            return;
        };
        for ret in &fun.returns {
            if let Some(default) = encoding::default_value(self.ctx, &ret.ty, &ret.loc) {
                block.push(Stmt::assign(
                    Expr::id(self.ctx.mangle(ret.id)),
                    default,
                ));
            }
        }
    }

    /// State initialization and inlined base constructors, base-to-derived
    /// over the linearization. Also used by the synthesized implicit
    /// constructor.
    fn constructor_prologue(&mut self, block: &mut Block) {
        let bases: Vec<_> = self
            .contract
            .linearized_bases
            .iter()
            .rev()
            .cloned()
            .collect();
        for base_id in bases {
            let base = self.ctx.model.contract(base_id).clone();
            for var in &base.state_vars {
                self.init_state_var(var, block);
            }
            if base_id == self.contract.id {
                continue;
            }
            if let Some(bctor) = base.constructor().cloned() {
                self.inline_base_constructor(&base, &bctor, block);
            }
        }
    }

    fn init_state_var(&mut self, var: &Rc<VariableDeclaration>, block: &mut Block) {
        let target = Expr::arr_sel(
            Expr::id(self.ctx.mangle(var.id)),
            Expr::id(THIS),
        );
        let value = match &var.value {
            Some(init) => {
                let res = ExpressionConverter::convert(self.ctx, init, false);
                Some(self.drain(res, block))
            }
            None => encoding::default_value(self.ctx, &var.ty, &var.loc),
        };
        if let Some(value) = value {
            let (root, update) = Expr::select_to_update(&target, value);
            block.push(Stmt::assign(root, update));
        }
    }

    /// A base constructor runs inside its own naming scope; its arguments
    /// come from the invocation list on the derived constructor (evaluated
    /// in the derived scope, before the push).
    fn inline_base_constructor(
        &mut self,
        base: &Rc<ContractDefinition>,
        bctor: &Rc<FunctionDefinition>,
        block: &mut Block,
    ) {
        let args: Vec<SolExpression> = self
            .fun
            .as_ref()
            .and_then(|f| {
                f.modifiers
                    .iter()
                    .find(|m| m.referenced == base.id || m.referenced == bctor.id)
                    .map(|m| m.args.clone())
            })
            .unwrap_or_default();
        let mut arg_values = vec![];
        for arg in &args {
            let res = ExpressionConverter::convert(self.ctx, arg, false);
            arg_values.push(self.drain(res, block));
        }
        self.ctx.push_extra_scope(bctor.id);
        for (param, value) in bctor.params.iter().zip(arg_values) {
            let name = self.ctx.mangle(param.id);
            let ty = self.ctx.type_of(&param.ty, &param.loc);
            self.locals.push((name.clone(), ty));
            block.push(Stmt::assign(Expr::id(name), value));
        }
        let label = self.push_return_label();
        if let Some(body) = &bctor.body {
            self.stmt(body, block);
        }
        block.push(Stmt::label(label));
        self.return_labels.pop();
        self.ctx.pop_extra_scope();
    }

    // ---------- modifier inlining ----------

    fn push_return_label(&mut self) -> String {
        let label = format!("$return{}", self.next_return);
        self.next_return += 1;
        self.return_labels.push(label.clone());
        label
    }

    fn current_return_label(&self) -> String {
        self.return_labels
            .last()
            .expect("BUG: return outside any return scope")
            .clone()
    }

    /// Inline level `level`: the next modifier, or the function body once
    /// every modifier is open. Each level ends with its own return label.
    fn inline_level(&mut self, level: usize, block: &mut Block) {
        let label = self.push_return_label();
        let saved = self.level;
        self.level = level;
        if level < self.mods.len() {
            self.inline_modifier(level, block);
        } else {
            let fun = self.fun.clone().expect("BUG: inlining without a function");
            if let Some(body) = &fun.body {
                self.stmt(body, block);
            }
        }
        self.level = saved;
        block.push(Stmt::label(label));
        self.return_labels.pop();
    }

    fn inline_modifier(&mut self, level: usize, block: &mut Block) {
        let minv = self.mods[level].clone();
        let mdef = self
            .ctx
            .model
            .modifier(minv.referenced)
            .expect("BUG: filtered modifier invocation has no definition")
            .clone();
        let mut arg_values = vec![];
        for arg in &minv.args {
            let res = ExpressionConverter::convert(self.ctx, arg, false);
            arg_values.push(self.drain(res, block));
        }
        self.ctx.push_extra_scope(mdef.id);
        for (param, value) in mdef.params.iter().zip(arg_values) {
            let name = self.ctx.mangle(param.id);
            let ty = self.ctx.type_of(&param.ty, &param.loc);
            self.locals.push((name.clone(), ty));
            block.push(Stmt::assign(Expr::id(name), value));
        }
        self.stmt(&mdef.body, block);
        self.ctx.pop_extra_scope();
    }

    // ---------- statements ----------

    /// Convert one expression and flush its side outputs into `block`:
    /// carrier statements first, then range assumptions for fresh values,
    /// then overflow-flag updates.
    fn drain(&mut self, res: ExprResult, block: &mut Block) -> ExprRef {
        block.extend(res.stmts);
        for tcc in res.tccs {
            block.push(Stmt::assume(tcc));
        }
        for oc in res.ocs {
            self.uses_overflow = true;
            block.push(Stmt::assign(
                Expr::id(OVERFLOW_FLAG),
                Expr::or(Expr::id(OVERFLOW_FLAG), Expr::not(oc)),
            ));
        }
        for decl in res.decls {
            self.add_local(decl.0, decl.1);
        }
        res.expr
    }

    /// Locals keep their declaration-derived names, so converting the same
    /// statement again (peeled loop iterations) must not redeclare.
    fn add_local(&mut self, name: String, ty: BoogieType) {
        if !self.locals.iter().any(|(n, _)| *n == name) {
            self.locals.push((name, ty));
        }
    }

    fn convert_expr(&mut self, e: &SolExpression, block: &mut Block) -> ExprRef {
        let res = ExpressionConverter::convert(self.ctx, e, false);
        self.drain(res, block)
    }

    fn stmt(&mut self, s: &SolStatement, block: &mut Block) {
        match &s.kind {
            StmtKind::Block(stmts) => {
                for inner in stmts {
                    self.stmt(inner, block);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.convert_expr(cond, block);
                let mut then_block = Block::new();
                self.stmt(then_branch, &mut then_block);
                let else_block = else_branch.as_ref().map(|els| {
                    let mut b = Block::new();
                    self.stmt(els, &mut b);
                    b
                });
                block.push(Stmt::IfElse {
                    cond: c,
                    then_block,
                    else_block,
                });
            }
            StmtKind::While {
                cond,
                body,
                doc_tags,
            } => self.while_loop(cond, None, body, doc_tags, block),
            StmtKind::For {
                init,
                cond,
                update,
                body,
                doc_tags,
            } => {
                if let Some(init) = init {
                    self.stmt(init, block);
                }
                let always = SolExpression {
                    id: s.id,
                    loc: s.loc.clone(),
                    ty: sol_model::SolType::Bool,
                    kind: ExprKind::Literal(sol_model::LiteralValue::Bool(true)),
                };
                self.while_loop(
                    cond.as_ref().unwrap_or(&always),
                    update.as_deref(),
                    body,
                    doc_tags,
                    block,
                );
            }
            StmtKind::DoWhile {
                cond,
                body,
                doc_tags,
            } => self.do_while_loop(cond, body, doc_tags, block),
            StmtKind::Break => {
                if self.loop_stack.is_empty() {
                    self.ctx.error(&s.loc, "break outside of a loop");
                } else {
                    block.push(Stmt::Break);
                }
            }
            StmtKind::Continue => match self.loop_stack.last() {
                Some(label) => block.push(Stmt::goto(label.clone())),
                None => self.ctx.error(&s.loc, "continue outside of a loop"),
            },
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    let v = self.convert_expr(value, block);
                    self.assign_returns(v, &s.loc, block);
                }
                block.push(Stmt::goto(self.current_return_label()));
            }
            StmtKind::Throw => block.push(Stmt::assume(Expr::bool_lit(false))),
            StmtKind::Emit(_) => {
                self.ctx
                    .warning(&s.loc, "emit statement has no verification semantics, ignored");
            }
            StmtKind::VarDecl { vars, init } => self.var_decl(s, vars, init.as_ref(), block),
            StmtKind::Expression(e) => {
                self.convert_expr(e, block);
            }
            StmtKind::Placeholder => self.inline_level(self.level + 1, block),
            StmtKind::InlineAssembly => {
                self.ctx.error(&s.loc, "inline assembly is not supported");
            }
        }
    }

    fn assign_returns(&mut self, value: ExprRef, loc: &Loc, block: &mut Block) {
        let Some(fun) = self.fun.clone() else {
            return;
        };
        if fun.returns.is_empty() {
            return;
        }
        let values: Vec<ExprRef> = match &*value {
            Expr::Tuple(elems) => elems.clone(),
            _ => vec![value],
        };
        if values.len() != fun.returns.len() {
            self.ctx.error(loc, "return value arity mismatch");
            return;
        }
        for (ret, v) in fun.returns.iter().zip(values) {
            block.push(Stmt::assign(Expr::id(self.ctx.mangle(ret.id)), v));
        }
    }

    fn var_decl(
        &mut self,
        s: &SolStatement,
        vars: &[Option<Rc<VariableDeclaration>>],
        init: Option<&SolExpression>,
        block: &mut Block,
    ) {
        for var in vars.iter().flatten() {
            let name = self.ctx.mangle(var.id);
            let ty = self.ctx.type_of(&var.ty, &var.loc);
            self.add_local(name, ty);
        }
        match init {
            Some(init) => {
                let value = self.convert_expr(init, block);
                let values: Vec<ExprRef> = match &*value {
                    Expr::Tuple(elems) => elems.clone(),
                    _ => vec![value],
                };
                if values.len() != vars.len() {
                    self.ctx.error(&s.loc, "declaration arity mismatch");
                    return;
                }
                for (var, v) in vars.iter().zip(values) {
                    if let Some(var) = var {
                        block.push(Stmt::assign(Expr::id(self.ctx.mangle(var.id)), v));
                    }
                }
            }
            None => {
                for var in vars.iter().flatten() {
                    let name = self.ctx.mangle(var.id);
                    match encoding::default_value(self.ctx, &var.ty, &var.loc) {
                        Some(default) => block.push(Stmt::assign(Expr::id(name), default)),
                        // Reference types get a fresh, unconstrained pointer.
                        None => block.push(Stmt::havoc(vec![name])),
                    }
                }
            }
        }
    }

    // ---------- loops ----------

    fn while_loop(
        &mut self,
        cond: &SolExpression,
        update: Option<&SolStatement>,
        body: &SolStatement,
        doc_tags: &[DocTag],
        block: &mut Block,
    ) {
        let mut cond_block = Block::new();
        let c = self.convert_expr(cond, &mut cond_block);
        block.extend(cond_block.stmts.clone());

        let mut loop_body = self.loop_body(body, update);
        loop_body.extend(cond_block.stmts);
        // After the body: the no-overflow invariant depends on flag uses
        // recorded during conversion.
        let invariants = self.loop_invariants(doc_tags);
        block.push(Stmt::While {
            cond: c,
            invariants,
            body: loop_body,
        });
    }

    /// The first iteration runs unconditionally before the loop proper; the
    /// loop invariants are checked after it. The body is converted twice,
    /// which is why continue labels are numbered freshly per conversion.
    fn do_while_loop(
        &mut self,
        cond: &SolExpression,
        body: &SolStatement,
        doc_tags: &[DocTag],
        block: &mut Block,
    ) {
        let first = self.loop_body(body, None);
        let mut cond_block = Block::new();
        let c = self.convert_expr(cond, &mut cond_block);
        let mut loop_body = self.loop_body(body, None);
        loop_body.extend(cond_block.stmts.clone());
        let invariants = self.loop_invariants(doc_tags);

        block.extend(first.stmts);
        for inv in &invariants {
            block.push(Stmt::assert(inv.expr.clone(), inv.attrs.clone()));
        }
        block.extend(cond_block.stmts);
        block.push(Stmt::While {
            cond: c,
            invariants,
            body: loop_body,
        });
    }

    /// One conversion of a loop body: body statements, the continue label,
    /// then the update statement (for loops). Condition side effects are
    /// appended by the caller.
    fn loop_body(&mut self, body: &SolStatement, update: Option<&SolStatement>) -> Block {
        let continue_label = format!("$continue#{}", self.ctx.fresh_id());
        self.loop_stack.push(continue_label.clone());
        let mut loop_body = Block::new();
        self.stmt(body, &mut loop_body);
        loop_body.push(Stmt::label(continue_label));
        if let Some(update) = update {
            self.stmt(update, &mut loop_body);
        }
        self.loop_stack.pop();
        loop_body
    }

    /// Doc-tag loop invariants (with their range side conditions), plus the
    /// no-overflow invariant when tracking is on.
    fn loop_invariants(&mut self, doc_tags: &[DocTag]) -> Vec<Specification> {
        let scope = match &self.fun {
            Some(f) => f.id,
            None => self.contract.id,
        };
        let mut invariants = vec![];
        if self.ctx.options.overflow && self.uses_overflow {
            invariants.push(Specification::plain(Expr::not(Expr::id(OVERFLOW_FLAG))));
        }
        for ann in specs::gather(self.ctx, doc_tags, DocTagKind::Invariant, scope) {
            for side in ann.tccs.iter().chain(ann.ocs.iter()) {
                invariants.push(Specification::plain(side.clone()));
            }
            let attrs = self.ctx.attrs(
                &ann.loc,
                format!("Loop invariant '{}' might not hold.", ann.text),
            );
            invariants.push(Specification::new(ann.expr, attrs));
        }
        invariants
    }

    // ---------- degradation ----------

    fn havoc_state(&mut self, block: &mut Block) {
        let mut vars: Vec<String> = self
            .ctx
            .model
            .all_state_vars(&self.contract)
            .iter()
            .map(|v| self.ctx.mangle(v.id))
            .collect();
        vars.push(BALANCE.to_string());
        block.push(Stmt::havoc(vars));
    }
}

/// Replace the body of a procedure whose conversion reported errors: the
/// errors stay on record, the procedure havocs the contract state and is
/// marked so downstream tooling can tell it was not verified.
fn degrade(
    ctx: &mut TranslationContext,
    proc: &mut ProcDecl,
    contract: &Rc<ContractDefinition>,
    fun: &Rc<FunctionDefinition>,
) {
    log::warn!(
        "function '{}' could not be translated, emitting havoc body",
        fun.name
    );
    let mut vars: Vec<String> = ctx
        .model
        .all_state_vars(contract)
        .iter()
        .map(|v| ctx.mangle(v.id))
        .collect();
    vars.push(BALANCE.to_string());
    let mut block = Block::new();
    block.push(Stmt::comment("Function body could not be translated"));
    block.push(Stmt::havoc(vars));
    proc.locals.clear();
    proc.requires.clear();
    proc.ensures.clear();
    proc.body = Some(block);
    proc.attrs.push(Attr::flag("skipped"));
    proc.attrs.push(Attr::message(format!(
        "Function '{}' could not be translated",
        fun.name
    )));
}

#[cfg(test)]
mod tests {
    use super::*;

    use sol_model::{
        AnnotationParser, BinaryOperator, CallKind, FunctionKind, LiteralValue, MagicVar,
        ModifierDefinition, NodeId, SolType, SourceModel, SourceUnit, Visibility,
    };

    use crate::{translate, Encoding, Options};

    struct NoParser;
    impl AnnotationParser for NoParser {
        fn parse_expression(
            &self,
            _text: &str,
            _scope: NodeId,
            _model: &SourceModel,
        ) -> anyhow::Result<SolExpression> {
            anyhow::bail!("no parser in tests")
        }
    }

    fn expr(id: NodeId, ty: SolType, kind: ExprKind) -> SolExpression {
        SolExpression {
            id,
            loc: Loc::default(),
            ty,
            kind,
        }
    }

    fn stmt(id: NodeId, kind: StmtKind) -> SolStatement {
        SolStatement {
            id,
            loc: Loc::default(),
            kind,
        }
    }

    fn state_var(id: NodeId, name: &str) -> Rc<VariableDeclaration> {
        Rc::new(VariableDeclaration {
            id,
            loc: Loc::default(),
            name: name.to_string(),
            ty: SolType::uint(256),
            value: None,
            is_state: true,
        })
    }

    fn fun(
        id: NodeId,
        name: &str,
        modifiers: Vec<ModifierInvocation>,
        body: SolStatement,
    ) -> Rc<FunctionDefinition> {
        Rc::new(FunctionDefinition {
            id,
            loc: Loc::default(),
            name: name.to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::Public,
            is_payable: false,
            params: vec![],
            returns: vec![],
            modifiers,
            body: Some(body),
            doc_tags: vec![],
        })
    }

    fn contract_with(
        functions: Vec<Rc<FunctionDefinition>>,
        modifiers: Vec<Rc<ModifierDefinition>>,
    ) -> SourceModel {
        let contract = Rc::new(ContractDefinition {
            id: 1,
            loc: Loc::default(),
            name: "C".to_string(),
            kind: ContractKind::Contract,
            linearized_bases: vec![1],
            state_vars: vec![state_var(2, "x")],
            functions,
            modifiers,
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

    fn proc_by_name<'p>(
        program: &'p boogie_ast::Program,
        name: &str,
    ) -> &'p ProcDecl {
        program
            .decls()
            .iter()
            .find_map(|d| match d {
                Decl::Proc(p) if p.name == name => Some(p),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no procedure '{}'", name))
    }

    fn count_labels(block: &Block, prefix: &str) -> usize {
        block
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Label(l) if l.starts_with(prefix) => 1,
                Stmt::IfElse {
                    then_block,
                    else_block,
                    ..
                } => {
                    count_labels(then_block, prefix)
                        + else_block
                            .as_ref()
                            .map(|b| count_labels(b, prefix))
                            .unwrap_or(0)
                }
                Stmt::While { body, .. } => count_labels(body, prefix),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn modifiers_inline_with_one_label_per_level() {
        // modifier m() { _; }  used twice: 2 modifiers, 3 return labels.
        let mdef = Rc::new(ModifierDefinition {
            id: 10,
            loc: Loc::default(),
            name: "m".to_string(),
            params: vec![],
            body: stmt(11, StmtKind::Block(vec![stmt(12, StmtKind::Placeholder)])),
        });
        let minv = ModifierInvocation {
            loc: Loc::default(),
            name: "m".to_string(),
            referenced: 10,
            args: vec![],
        };
        let f = fun(
            20,
            "f",
            vec![minv.clone(), minv],
            stmt(21, StmtKind::Return(None)),
        );
        let model = contract_with(vec![f], vec![mdef]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        let body = proc.body.as_ref().expect("body");
        assert_eq!(count_labels(body, "$return"), 3);
    }

    #[test]
    fn untranslatable_function_degrades_to_havoc() {
        let f = fun(20, "f", vec![], stmt(21, StmtKind::InlineAssembly));
        let model = contract_with(vec![f], vec![]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        assert!(proc.attrs.iter().any(|a| a.name == "skipped"));
        let body = proc.body.as_ref().expect("body");
        assert!(body
            .stmts
            .iter()
            .any(|s| matches!(s, Stmt::Havoc { vars } if vars.contains(&"x#2".to_string()))));
    }

    #[test]
    fn while_loop_reruns_condition_side_effects() {
        // while (x < g()) { x = x + 1; }  with g an internal function, so
        // the condition carries a call statement that must re-run at the
        // end of each iteration.
        let g = Rc::new(FunctionDefinition {
            id: 30,
            loc: Loc::default(),
            name: "g".to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::Internal,
            is_payable: false,
            params: vec![],
            returns: vec![Rc::new(VariableDeclaration {
                id: 31,
                loc: Loc::default(),
                name: String::new(),
                ty: SolType::uint(256),
                value: None,
                is_state: false,
            })],
            modifiers: vec![],
            body: Some(stmt(32, StmtKind::Return(Some(expr(
                33,
                SolType::uint(256),
                ExprKind::Literal(LiteralValue::Number(7.into())),
            ))))),
            doc_tags: vec![],
        });
        let x_ref = || {
            expr(
                40,
                SolType::uint(256),
                ExprKind::Identifier {
                    name: "x".to_string(),
                    referenced: 2,
                },
            )
        };
        let cond = expr(
            41,
            SolType::Bool,
            ExprKind::BinaryOp {
                op: BinaryOperator::Lt,
                lhs: Box::new(x_ref()),
                rhs: Box::new(expr(
                    42,
                    SolType::uint(256),
                    ExprKind::Call {
                        kind: CallKind::Function,
                        callee: Box::new(expr(
                            43,
                            SolType::Function,
                            ExprKind::Identifier {
                                name: "g".to_string(),
                                referenced: 30,
                            },
                        )),
                        args: vec![],
                    },
                )),
            },
        );
        let body = stmt(
            44,
            StmtKind::Expression(expr(
                45,
                SolType::uint(256),
                ExprKind::Assignment {
                    op: None,
                    lhs: Box::new(x_ref()),
                    rhs: Box::new(expr(
                        46,
                        SolType::uint(256),
                        ExprKind::BinaryOp {
                            op: BinaryOperator::Add,
                            lhs: Box::new(x_ref()),
                            rhs: Box::new(expr(
                                47,
                                SolType::uint(256),
                                ExprKind::Literal(LiteralValue::Number(1.into())),
                            )),
                        },
                    )),
                },
            )),
        );
        let f = fun(
            20,
            "f",
            vec![],
            stmt(
                48,
                StmtKind::While {
                    cond,
                    body: Box::new(body),
                    doc_tags: vec![],
                },
            ),
        );
        let model = contract_with(vec![f, g], vec![]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        let body = proc.body.as_ref().expect("body");
        let call_count = |b: &Block| {
            b.stmts
                .iter()
                .filter(|s| matches!(s, Stmt::Call { proc, .. } if proc == "g#30"))
                .count()
        };
        // Once before the loop, once at the end of the body.
        assert_eq!(call_count(body), 1);
        let while_body = body
            .stmts
            .iter()
            .find_map(|s| match s {
                Stmt::While { body, .. } => Some(body),
                _ => None,
            })
            .expect("while statement");
        assert_eq!(call_count(while_body), 1);
        assert_eq!(count_labels(while_body, "$continue"), 1);
    }

    #[test]
    fn implicit_constructor_initializes_state() {
        let model = contract_with(vec![], vec![]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "__constructor#1");
        let body = proc.body.as_ref().expect("body");
        let assigns_x = body.stmts.iter().any(|s| match s {
            Stmt::Assign { lhs, .. } => lhs[0] == Expr::id("x#2"),
            _ => false,
        });
        assert!(assigns_x);
    }

    #[test]
    fn overflow_tracking_adds_flag_and_final_check() {
        // x = x + 1 under Int encoding with overflow checking.
        let x_ref = || {
            expr(
                40,
                SolType::uint(256),
                ExprKind::Identifier {
                    name: "x".to_string(),
                    referenced: 2,
                },
            )
        };
        let body = stmt(
            41,
            StmtKind::Expression(expr(
                42,
                SolType::uint(256),
                ExprKind::Assignment {
                    op: Some(BinaryOperator::Add),
                    lhs: Box::new(x_ref()),
                    rhs: Box::new(expr(
                        43,
                        SolType::uint(256),
                        ExprKind::Literal(LiteralValue::Number(1.into())),
                    )),
                },
            )),
        );
        let f = fun(20, "f", vec![], body);
        let model = contract_with(vec![f], vec![]);
        let options = Options {
            overflow: true,
            ..Options::default()
        };
        let (program, reporter) = translate(&model, options, &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        assert!(proc
            .locals
            .iter()
            .any(|(n, _)| n == OVERFLOW_FLAG));
        let body = proc.body.as_ref().expect("body");
        assert!(matches!(
            body.stmts.first(),
            Some(Stmt::Assign { lhs, .. }) if lhs[0] == Expr::id(OVERFLOW_FLAG)
        ));
        assert!(matches!(body.stmts.last(), Some(Stmt::Assert { .. })));
    }

    #[test]
    fn loop_overflow_invariant_sees_body_arithmetic() {
        // while (true) { x += 1; } with overflow checking: the loop must
        // carry the no-overflow invariant even though the flag is first
        // used inside the body.
        let x_ref = || {
            expr(
                40,
                SolType::uint(256),
                ExprKind::Identifier {
                    name: "x".to_string(),
                    referenced: 2,
                },
            )
        };
        let body = stmt(
            41,
            StmtKind::Expression(expr(
                42,
                SolType::uint(256),
                ExprKind::Assignment {
                    op: Some(BinaryOperator::Add),
                    lhs: Box::new(x_ref()),
                    rhs: Box::new(expr(
                        43,
                        SolType::uint(256),
                        ExprKind::Literal(LiteralValue::Number(1.into())),
                    )),
                },
            )),
        );
        let w = stmt(
            44,
            StmtKind::While {
                cond: expr(45, SolType::Bool, ExprKind::Literal(LiteralValue::Bool(true))),
                body: Box::new(body),
                doc_tags: vec![],
            },
        );
        let f = fun(20, "f", vec![], w);
        let model = contract_with(vec![f], vec![]);
        let options = Options {
            overflow: true,
            ..Options::default()
        };
        let (program, reporter) = translate(&model, options, &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        let body = proc.body.as_ref().expect("body");
        let invariants = body
            .stmts
            .iter()
            .find_map(|s| match s {
                Stmt::While { invariants, .. } => Some(invariants),
                _ => None,
            })
            .expect("while statement");
        assert!(invariants
            .iter()
            .any(|i| i.expr == Expr::not(Expr::id(OVERFLOW_FLAG))));
    }

    #[test]
    fn bv_overflow_tracking_guards_addition() {
        // f(uint a) returns (uint) { return a + 1; } under bit-vectors with
        // overflow checking: bv addition, a flag update guarded by the
        // widened check, the sum assigned to the result, one return label.
        let a = Rc::new(VariableDeclaration {
            id: 50,
            loc: Loc::default(),
            name: "a".to_string(),
            ty: SolType::uint(256),
            value: None,
            is_state: false,
        });
        let ret = Rc::new(VariableDeclaration {
            id: 51,
            loc: Loc::default(),
            name: String::new(),
            ty: SolType::uint(256),
            value: None,
            is_state: false,
        });
        let body = stmt(
            52,
            StmtKind::Return(Some(expr(
                53,
                SolType::uint(256),
                ExprKind::BinaryOp {
                    op: BinaryOperator::Add,
                    lhs: Box::new(expr(
                        54,
                        SolType::uint(256),
                        ExprKind::Identifier {
                            name: "a".to_string(),
                            referenced: 50,
                        },
                    )),
                    rhs: Box::new(expr(
                        55,
                        SolType::uint(256),
                        ExprKind::Literal(LiteralValue::Number(1.into())),
                    )),
                },
            ))),
        );
        let f = Rc::new(FunctionDefinition {
            id: 20,
            loc: Loc::default(),
            name: "f".to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::Public,
            is_payable: false,
            params: vec![a],
            returns: vec![ret],
            modifiers: vec![],
            body: Some(body),
            doc_tags: vec![],
        });
        let model = contract_with(vec![f], vec![]);
        let options = Options {
            encoding: Encoding::Bv,
            overflow: true,
            ..Options::default()
        };
        let (program, reporter) = translate(&model, options, &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        assert!(proc.locals.iter().any(|(n, _)| n == OVERFLOW_FLAG));
        let body = proc.body.as_ref().expect("body");
        let flag_updates = body
            .stmts
            .iter()
            .filter(|s| match s {
                Stmt::Assign { lhs, rhs } => {
                    lhs[0] == Expr::id(OVERFLOW_FLAG)
                        && rhs[0].to_string().contains("bv512add")
                }
                _ => false,
            })
            .count();
        assert_eq!(flag_updates, 1);
        assert!(body.stmts.iter().any(|s| match s {
            Stmt::Assign { lhs, rhs } => {
                lhs[0] == Expr::id("$result#51")
                    && rhs[0].to_string() == "bv256add(a#50, 1bv256)"
            }
            _ => false,
        }));
        assert_eq!(count_labels(body, "$return"), 1);
        assert!(matches!(body.stmts.last(), Some(Stmt::Assert { .. })));
    }

    #[test]
    fn payable_entry_keeps_bit_vector_bookkeeping() {
        // Balance and message value under Bv must go through the bv
        // builtins, never mathematical operators.
        let f = Rc::new(FunctionDefinition {
            id: 20,
            loc: Loc::default(),
            name: "f".to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::Public,
            is_payable: true,
            params: vec![],
            returns: vec![],
            modifiers: vec![],
            body: Some(stmt(21, StmtKind::Return(None))),
            doc_tags: vec![],
        });
        let model = contract_with(vec![f], vec![]);
        let options = Options {
            encoding: Encoding::Bv,
            ..Options::default()
        };
        let (program, reporter) = translate(&model, options, &NoParser);
        assert!(!reporter.has_errors());
        let text = program.to_string();
        assert!(text.contains("bv256uge(__msg_value, 0bv256)"));
        assert!(text.contains("__balance[__this := bv256add(__balance[__this], __msg_value)]"));
        assert!(!text.contains("__msg_value >= 0"));
    }

    #[test]
    fn do_while_body_locals_are_declared_once() {
        // do { uint y = 1; } while (false);  the body converts twice but
        // the local is declared once.
        let y = Rc::new(VariableDeclaration {
            id: 60,
            loc: Loc::default(),
            name: "y".to_string(),
            ty: SolType::uint(256),
            value: None,
            is_state: false,
        });
        let body = stmt(
            61,
            StmtKind::VarDecl {
                vars: vec![Some(y)],
                init: Some(expr(
                    62,
                    SolType::uint(256),
                    ExprKind::Literal(LiteralValue::Number(1.into())),
                )),
            },
        );
        let dw = stmt(
            63,
            StmtKind::DoWhile {
                cond: expr(64, SolType::Bool, ExprKind::Literal(LiteralValue::Bool(false))),
                body: Box::new(body),
                doc_tags: vec![],
            },
        );
        let f = fun(20, "f", vec![], dw);
        let model = contract_with(vec![f], vec![]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        assert_eq!(
            proc.locals.iter().filter(|(n, _)| n == "y#60").count(),
            1
        );
    }

    #[test]
    fn sender_magic_flows_into_requires_free_body() {
        // function f() public { require(msg.sender == msg.sender); }
        let sender = || {
            expr(
                50,
                SolType::Address,
                ExprKind::MemberAccess {
                    base: Box::new(expr(51, SolType::Address, ExprKind::Magic(MagicVar::Msg))),
                    member: "sender".to_string(),
                    referenced: None,
                },
            )
        };
        let body = stmt(
            52,
            StmtKind::Expression(expr(
                53,
                SolType::Bool,
                ExprKind::Call {
                    kind: CallKind::Function,
                    callee: Box::new(expr(
                        54,
                        SolType::Function,
                        ExprKind::Identifier {
                            name: "require".to_string(),
                            referenced: 9999,
                        },
                    )),
                    args: vec![expr(
                        55,
                        SolType::Bool,
                        ExprKind::BinaryOp {
                            op: BinaryOperator::Eq,
                            lhs: Box::new(sender()),
                            rhs: Box::new(sender()),
                        },
                    )],
                },
            )),
        );
        let f = fun(20, "f", vec![], body);
        let model = contract_with(vec![f], vec![]);
        let (program, reporter) = translate(&model, Options::default(), &NoParser);
        assert!(!reporter.has_errors());
        let proc = proc_by_name(&program, "f#20");
        let body = proc.body.as_ref().expect("body");
        let has_assume = body.stmts.iter().any(|s| match s {
            Stmt::Assume { expr } => {
                expr == &Expr::eq(Expr::id(MSG_SENDER), Expr::id(MSG_SENDER))
            }
            _ => false,
        });
        assert!(has_assume);
    }
}
