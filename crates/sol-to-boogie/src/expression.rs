// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Expression conversion.
//!
//! Converting a source expression yields the Boogie expression plus four
//! kinds of side output: statements that must run first (call lowering,
//! compound assignments), fresh local declarations, type-correctness
//! conditions, and overflow conditions. The statement converter drains them
//! in that order at every statement boundary.
//!
//! User-level problems report a diagnostic and return the error sentinel;
//! conversion itself never aborts.

use std::collections::BTreeMap;

use boogie_ast::{BoogieType, Expr, ExprRef, Stmt};
use num::{BigInt, ToPrimitive};
use sol_model::{
    BinaryOperator, CallKind, DeclKind, ExprKind, LiteralValue, Loc, MagicVar, NodeId, QuantOp,
    SolExpression, SolType, UnaryOperator,
};

use crate::context::{
    TranslationContext, BALANCE, BLOCK_NUMBER, MSG_SENDER, MSG_VALUE, NOW, THIS,
};
use crate::encoding::{self, ArithResult};
use crate::Encoding;

/// Everything produced by converting one expression.
pub struct ExprResult {
    pub expr: ExprRef,
    pub stmts: Vec<Stmt>,
    pub decls: Vec<(String, BoogieType)>,
    pub tccs: Vec<ExprRef>,
    pub ocs: Vec<ExprRef>,
}

pub struct ExpressionConverter<'a, 'env> {
    ctx: &'a mut TranslationContext<'env>,
    /// Inside an annotation: `old` and quantifiers allowed, calls are not.
    in_spec: bool,
    stmts: Vec<Stmt>,
    decls: Vec<(String, BoogieType)>,
    tccs: Vec<ExprRef>,
    ocs: Vec<ExprRef>,
    bound: BTreeMap<NodeId, String>,
}

/// Width and signedness of a type for arithmetic purposes.
fn int_info(ty: &SolType) -> (u16, bool) {
    match ty {
        SolType::Int { bits, signed } => (*bits, *signed),
        SolType::Address | SolType::Contract { .. } => (160, false),
        SolType::FixedBytes(n) => (*n as u16 * 8, false),
        _ => (256, false),
    }
}

impl<'a, 'env> ExpressionConverter<'a, 'env> {
    pub fn convert(
        ctx: &'a mut TranslationContext<'env>,
        expr: &SolExpression,
        in_spec: bool,
    ) -> ExprResult {
        let mut conv = ExpressionConverter {
            ctx,
            in_spec,
            stmts: vec![],
            decls: vec![],
            tccs: vec![],
            ocs: vec![],
            bound: BTreeMap::new(),
        };
        let expr = conv.expr(expr);
        ExprResult {
            expr,
            stmts: conv.stmts,
            decls: conv.decls,
            tccs: conv.tccs,
            ocs: conv.ocs,
        }
    }

    fn err(&mut self, loc: &Loc, message: impl Into<String>) -> ExprRef {
        self.ctx.error(loc, message);
        Expr::error()
    }

    fn arith(&mut self, r: ArithResult) -> ExprRef {
        if let Some(oc) = r.oc {
            self.ocs.push(oc);
        }
        r.expr
    }

    fn expr(&mut self, e: &SolExpression) -> ExprRef {
        match &e.kind {
            ExprKind::Identifier { name, referenced } => {
                self.identifier(name, *referenced, &e.loc)
            }
            ExprKind::Magic(MagicVar::This) => Expr::id(THIS),
            ExprKind::Magic(_) => {
                panic!("BUG: magic object used outside member access")
            }
            ExprKind::Literal(value) => self.literal(value, &e.ty, &e.loc),
            ExprKind::MemberAccess {
                base,
                member,
                referenced,
            } => self.member(e, base, member, *referenced),
            ExprKind::IndexAccess { base, index } => self.index(e, base, index.as_deref()),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                let c = self.expr(cond);
                let t = self.expr(then_expr);
                let f = self.expr(else_expr);
                Expr::cond(c, t, f)
            }
            ExprKind::UnaryOp { op, prefix, sub } => self.unary(e, *op, *prefix, sub),
            ExprKind::BinaryOp { op, lhs, rhs } => self.binary(e, *op, lhs, rhs),
            ExprKind::Assignment { op, lhs, rhs } => self.assignment(e, *op, lhs, rhs),
            ExprKind::Tuple { components } => self.tuple(e, components),
            ExprKind::Call {
                kind,
                callee,
                args,
            } => self.call(e, *kind, callee, args),
            ExprKind::Old(sub) => {
                if !self.in_spec {
                    return self.err(&e.loc, "old() is only allowed in annotations");
                }
                let s = self.expr(sub);
                Expr::old(s)
            }
            ExprKind::Quantified { op, bound, body } => {
                if !self.in_spec {
                    return self.err(&e.loc, "quantifiers are only allowed in annotations");
                }
                let mut vars = vec![];
                for v in bound {
                    let name = format!("{}#{}", v.name, v.id);
                    let ty = self.ctx.type_of(&v.ty, &v.loc);
                    self.bound.insert(v.id, name.clone());
                    vars.push((name, ty));
                }
                let b = self.expr(body);
                for v in bound {
                    self.bound.remove(&v.id);
                }
                match op {
                    QuantOp::Forall => Expr::forall(vars, b),
                    QuantOp::Exists => Expr::exists(vars, b),
                }
            }
        }
    }

    fn identifier(&mut self, name: &str, referenced: NodeId, loc: &Loc) -> ExprRef {
        if let Some(bound) = self.bound.get(&referenced) {
            return Expr::id(bound.clone());
        }
        match self.ctx.model.decl_info(referenced) {
            Some(info) if info.kind == DeclKind::StateVariable => {
                // State variables are maps over addresses, read at the
                // receiver.
                Expr::arr_sel(Expr::id(self.ctx.mangle(referenced)), Expr::id(THIS))
            }
            Some(_) => Expr::id(self.ctx.mangle(referenced)),
            None => self.err(loc, format!("unresolved identifier '{}'", name)),
        }
    }

    fn literal(&mut self, value: &LiteralValue, ty: &SolType, loc: &Loc) -> ExprRef {
        match (value, ty) {
            (LiteralValue::Bool(b), _) => Expr::bool_lit(*b),
            (LiteralValue::Str(s), _) => self.ctx.intern_string(s),
            (LiteralValue::Number(_), SolType::RationalConst) => {
                self.err(loc, "rational literals are not supported")
            }
            (LiteralValue::Number(v), SolType::Address | SolType::Contract { .. }) => {
                self.ctx.intern_address(v)
            }
            (LiteralValue::Number(v), SolType::IntConst(_)) => Expr::int_lit(v.clone()),
            (LiteralValue::Number(v), _) => {
                let (bits, _) = int_info(ty);
                encoding::int_literal(self.ctx, v, bits)
            }
        }
    }

    fn member(
        &mut self,
        e: &SolExpression,
        base: &SolExpression,
        member: &str,
        referenced: Option<NodeId>,
    ) -> ExprRef {
        // Environment objects.
        if let ExprKind::Magic(magic) = &base.kind {
            return match (magic, member) {
                (MagicVar::Msg, "sender") => Expr::id(MSG_SENDER),
                (MagicVar::Msg, "value") => Expr::id(MSG_VALUE),
                (MagicVar::Block, "number") => Expr::id(BLOCK_NUMBER),
                (MagicVar::Block, "timestamp") => Expr::id(NOW),
                _ => self.err(&e.loc, format!("unsupported member '{}'", member)),
            };
        }
        // Enum values: `Color.Red` becomes the member's index.
        if let SolType::Enum { def, .. } = &e.ty {
            if let ExprKind::Identifier { referenced, .. } = &base.kind {
                if referenced == def {
                    let en = self.ctx.model.enum_def(*def);
                    let idx = en
                        .members
                        .iter()
                        .position(|m| m == member)
                        .expect("BUG: enum member not found in definition");
                    return Expr::int_lit(BigInt::from(idx));
                }
            }
        }
        if member == "balance"
            && matches!(base.ty, SolType::Address | SolType::Contract { .. })
        {
            let addr = self.expr(base);
            return Expr::arr_sel(Expr::id(BALANCE), addr);
        }
        match &base.ty {
            SolType::Struct { def, location, .. } => {
                let info = self.ctx.struct_info(*def, *location, &e.loc);
                let field =
                    referenced.expect("BUG: struct member access without resolved field");
                let field = self.ctx.mangle(field);
                let base_e = self.expr(base);
                let value = match &info.heap {
                    Some(heap) => Expr::arr_sel(Expr::id(heap.clone()), base_e),
                    None => base_e,
                };
                Expr::dt_sel(value, field, info.constr, info.members)
            }
            SolType::Array {
                base: elem,
                location,
                ..
            } if member == "length" => {
                let info = self.ctx.array_info(elem, *location, &e.loc);
                let base_e = self.expr(base);
                let value = match &info.heap {
                    Some(heap) => Expr::arr_sel(Expr::id(heap.clone()), base_e),
                    None => base_e,
                };
                Expr::dt_sel(value, "length", info.constr, info.members)
            }
            _ => self.err(&e.loc, format!("unsupported member access '{}'", member)),
        }
    }

    fn index(
        &mut self,
        e: &SolExpression,
        base: &SolExpression,
        index: Option<&SolExpression>,
    ) -> ExprRef {
        let Some(index) = index else {
            return self.err(&e.loc, "index access without index");
        };
        match &base.ty {
            SolType::Mapping { .. } => {
                let b = self.expr(base);
                let i = self.expr(index);
                Expr::arr_sel(b, i)
            }
            SolType::Array {
                base: elem,
                location,
                ..
            } => {
                let info = self.ctx.array_info(elem, *location, &e.loc);
                let base_e = self.expr(base);
                let value = match &info.heap {
                    Some(heap) => Expr::arr_sel(Expr::id(heap.clone()), base_e),
                    None => base_e,
                };
                let contents = Expr::dt_sel(value, "arr", info.constr, info.members);
                let i = self.expr(index);
                Expr::arr_sel(contents, i)
            }
            SolType::FixedBytes(_) => self.err(&e.loc, "indexing fixed bytes is not supported"),
            _ => self.err(&e.loc, "unsupported index access"),
        }
    }

    fn unary(
        &mut self,
        e: &SolExpression,
        op: UnaryOperator,
        prefix: bool,
        sub: &SolExpression,
    ) -> ExprRef {
        let (bits, signed) = int_info(&e.ty);
        match op {
            UnaryOperator::Not | UnaryOperator::Neg | UnaryOperator::BitNot => {
                let s = self.expr(sub);
                let r = encoding::encode_unary(self.ctx, &e.loc, op, s, bits, signed);
                self.arith(r)
            }
            UnaryOperator::Inc | UnaryOperator::Dec => {
                let lhs = self.expr(sub);
                let one = encoding::int_literal(self.ctx, &BigInt::from(1u8), bits);
                let bop = if op == UnaryOperator::Inc {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Sub
                };
                let r = encoding::encode_binary(
                    self.ctx,
                    &e.loc,
                    bop,
                    lhs.clone(),
                    one,
                    bits,
                    signed,
                );
                let value = self.arith(r);
                if prefix {
                    self.emit_assign(lhs.clone(), value, &e.loc);
                    lhs
                } else {
                    let tmp = format!("$tmp#{}", e.id);
                    let ty = self.ctx.type_of(&e.ty, &e.loc);
                    self.decls.push((tmp.clone(), ty));
                    self.stmts.push(Stmt::assign(Expr::id(tmp.clone()), lhs.clone()));
                    self.emit_assign(lhs, value, &e.loc);
                    Expr::id(tmp)
                }
            }
            UnaryOperator::Delete => {
                let lhs = self.expr(sub);
                match encoding::default_value(self.ctx, &sub.ty, &e.loc) {
                    Some(default) => {
                        self.emit_assign(lhs, default.clone(), &e.loc);
                        default
                    }
                    None => self.err(&e.loc, "delete is not supported for this type"),
                }
            }
        }
    }

    fn binary(
        &mut self,
        e: &SolExpression,
        op: BinaryOperator,
        lhs: &SolExpression,
        rhs: &SolExpression,
    ) -> ExprRef {
        if op == BinaryOperator::Pow {
            return self.power(e, lhs, rhs);
        }
        // Interned strings only support (in)equality.
        if matches!(lhs.ty, SolType::String(_))
            && !matches!(op, BinaryOperator::Eq | BinaryOperator::Neq)
        {
            return self.err(&e.loc, "strings only support equality comparison");
        }
        let l = self.expr(lhs);
        let r = self.expr(rhs);
        // Comparisons take their width from the operands, arithmetic from
        // the result type.
        let (bits, signed) = match op {
            BinaryOperator::Lt | BinaryOperator::Gt | BinaryOperator::Lte | BinaryOperator::Gte => {
                int_info(&lhs.ty)
            }
            _ => int_info(&e.ty),
        };
        let res = encoding::encode_binary(self.ctx, &e.loc, op, l, r, bits, signed);
        self.arith(res)
    }

    fn power(&mut self, e: &SolExpression, lhs: &SolExpression, rhs: &SolExpression) -> ExprRef {
        if self.ctx.options.encoding == Encoding::Bv {
            return self.err(&e.loc, "exponentiation is not supported with bit-vectors");
        }
        let exp = match &rhs.kind {
            ExprKind::Literal(LiteralValue::Number(v)) => v.to_u32(),
            _ => None,
        };
        let Some(exp) = exp.filter(|v| *v <= 256) else {
            return self.err(&e.loc, "exponent must be a small integer literal");
        };
        if let ExprKind::Literal(LiteralValue::Number(base)) = &lhs.kind {
            return Expr::int_lit(base.pow(exp));
        }
        let base = self.expr(lhs);
        let (bits, signed) = int_info(&e.ty);
        let mut result = Expr::int_lit(1);
        for _ in 0..exp {
            result = Expr::bin_op(boogie_ast::BinOp::Mul, result, base.clone());
        }
        if self.ctx.options.overflow {
            self.ocs.push(encoding::range_condition(&result, bits, signed));
        }
        result
    }

    fn tuple(&mut self, e: &SolExpression, components: &[Option<SolExpression>]) -> ExprRef {
        let mut elems = vec![];
        for c in components {
            match c {
                Some(c) => elems.push(self.expr(c)),
                None => return self.err(&e.loc, "empty tuple component in value position"),
            }
        }
        if elems.len() == 1 {
            elems.pop().expect("BUG: singleton tuple is empty")
        } else {
            Expr::tuple(elems)
        }
    }

    fn assignment(
        &mut self,
        e: &SolExpression,
        op: Option<BinaryOperator>,
        lhs: &SolExpression,
        rhs: &SolExpression,
    ) -> ExprRef {
        if let ExprKind::Tuple { components } = &lhs.kind {
            if op.is_some() {
                return self.err(&e.loc, "compound assignment to a tuple");
            }
            let rhs_e = self.expr(rhs);
            let elems: Vec<ExprRef> = match &*rhs_e {
                Expr::Tuple(v) => v.clone(),
                _ => vec![rhs_e.clone()],
            };
            if elems.len() != components.len() {
                return self.err(&e.loc, "tuple assignment arity mismatch");
            }
            for (c, value) in components.iter().zip(elems) {
                if let Some(c) = c {
                    let l = self.expr(c);
                    self.emit_assign(l, value, &e.loc);
                }
            }
            return rhs_e;
        }
        let rhs_e = self.expr(rhs);
        let lhs_e = self.expr(lhs);
        let value = match op {
            None => rhs_e,
            Some(bop) => {
                let (bits, signed) = int_info(&lhs.ty);
                let r = encoding::encode_binary(
                    self.ctx,
                    &e.loc,
                    bop,
                    lhs_e.clone(),
                    rhs_e,
                    bits,
                    signed,
                );
                self.arith(r)
            }
        };
        self.emit_assign(lhs_e.clone(), value, &e.loc);
        lhs_e
    }

    /// Lower an assignment to a converted target: plain variables assign
    /// directly, select chains become functional updates of their root.
    fn emit_assign(&mut self, lhs: ExprRef, value: ExprRef, loc: &Loc) {
        match &*lhs {
            Expr::Id(_) => self.stmts.push(Stmt::assign(lhs, value)),
            Expr::ArrSel { .. } | Expr::DtSel { .. } => {
                let (root, update) = Expr::select_to_update(&lhs, value);
                self.stmts.push(Stmt::assign(root, update));
            }
            Expr::Error => {}
            _ => {
                self.err(loc, "expression is not assignable");
            }
        }
    }

    fn call(
        &mut self,
        e: &SolExpression,
        kind: CallKind,
        callee: &SolExpression,
        args: &[SolExpression],
    ) -> ExprRef {
        // Shadow sums are pure and allowed anywhere, including annotations.
        if let ExprKind::Identifier { name, .. } = &callee.kind {
            if name == crate::context::SUM_UINT || name == crate::context::SUM_INT {
                if args.len() != 1 {
                    return self.err(&e.loc, "sum takes exactly one argument");
                }
                let arg = self.expr(&args[0]);
                return Expr::fun_call(name.clone(), vec![arg]);
            }
        }
        match kind {
            CallKind::TypeConversion => self.conversion(e, args),
            CallKind::StructConstructor => self.struct_constructor(e, args),
            CallKind::Function => {
                if self.in_spec {
                    return self.err(&e.loc, "function calls are not allowed in annotations");
                }
                self.function_call(e, callee, args)
            }
        }
    }

    fn conversion(&mut self, e: &SolExpression, args: &[SolExpression]) -> ExprRef {
        if args.len() != 1 {
            return self.err(&e.loc, "type conversion takes exactly one argument");
        }
        let src = &args[0];
        let value = self.expr(src);
        if let SolType::Enum { .. } = &e.ty {
            // Casting an integer into an enum must land on a member.
            if let Some(tcc) = encoding::tcc_for(self.ctx, &value, &e.ty) {
                self.tccs.push(tcc);
            }
            return value;
        }
        let (to_bits, _) = int_info(&e.ty);
        let (from_bits, from_signed) = int_info(&src.ty);
        match self.ctx.options.encoding {
            Encoding::Bv if to_bits > from_bits => {
                let fun = self.ctx.bv_extend(from_signed, from_bits, to_bits);
                Expr::fun_call(fun, vec![value])
            }
            Encoding::Bv if to_bits < from_bits => {
                let fun = self.ctx.bv_extract(from_bits, to_bits);
                Expr::fun_call(fun, vec![value])
            }
            Encoding::Mod if to_bits < from_bits => Expr::bin_op(
                boogie_ast::BinOp::Mod,
                value,
                Expr::int_lit(encoding::pow2(to_bits)),
            ),
            _ => value,
        }
    }

    fn struct_constructor(&mut self, e: &SolExpression, args: &[SolExpression]) -> ExprRef {
        let SolType::Struct { def, location, .. } = &e.ty else {
            return self.err(&e.loc, "struct constructor with non-struct type");
        };
        let info = self.ctx.struct_info(*def, *location, &e.loc);
        let Some(heap) = info.heap.clone() else {
            return self.err(&e.loc, "struct constructor must produce a memory struct");
        };
        let values: Vec<ExprRef> = args.iter().map(|a| self.expr(a)).collect();
        let ptr = format!("$new#{}", e.id);
        let ptr_ty = BoogieType::named(format!("{}_ptr", info.datatype));
        self.decls.push((ptr.clone(), ptr_ty));
        self.stmts.push(Stmt::havoc(vec![ptr.clone()]));
        self.stmts.push(Stmt::assign(
            Expr::id(heap.clone()),
            Expr::arr_upd(
                Expr::id(heap),
                Expr::id(ptr.clone()),
                Expr::fun_call(info.constr, values),
            ),
        ));
        Expr::id(ptr)
    }

    fn function_call(
        &mut self,
        e: &SolExpression,
        callee: &SolExpression,
        args: &[SolExpression],
    ) -> ExprRef {
        match &callee.kind {
            ExprKind::Identifier { name, referenced } => {
                match self.ctx.model.decl_info(*referenced) {
                    None => self.builtin_call(e, name, args),
                    Some(info) if info.kind == DeclKind::Function => {
                        // Internal call: receiver and message context are
                        // unchanged.
                        self.emit_call(
                            e,
                            *referenced,
                            Expr::id(THIS),
                            Expr::id(MSG_SENDER),
                            Expr::id(MSG_VALUE),
                            args,
                        )
                    }
                    Some(_) => self.err(&e.loc, format!("cannot call '{}'", name)),
                }
            }
            ExprKind::MemberAccess {
                base,
                member,
                referenced,
            } => self.member_call(e, base, member, *referenced, args),
            _ => self.err(&e.loc, "unsupported call target"),
        }
    }

    fn builtin_call(&mut self, e: &SolExpression, name: &str, args: &[SolExpression]) -> ExprRef {
        match name {
            "assert" => {
                let Some(arg) = args.first() else {
                    return self.err(&e.loc, "assert takes a condition");
                };
                let cond = self.expr(arg);
                let attrs = self.ctx.attrs(&e.loc, "Assertion might not hold.");
                self.stmts.push(Stmt::assert(cond, attrs));
                Expr::bool_lit(true)
            }
            "require" => {
                let Some(arg) = args.first() else {
                    return self.err(&e.loc, "require takes a condition");
                };
                let cond = self.expr(arg);
                // A failing require reverts; the path is simply cut.
                self.stmts.push(Stmt::assume(cond));
                Expr::bool_lit(true)
            }
            "revert" => {
                self.stmts.push(Stmt::assume(Expr::bool_lit(false)));
                Expr::bool_lit(true)
            }
            "keccak256" | "sha256" | "ripemd160" | "ecrecover" | "addmod" | "mulmod"
            | "blockhash" => {
                for a in args {
                    self.expr(a);
                }
                let tmp = format!("{}#{}", name, e.id);
                let ty = self.ctx.type_of(&e.ty, &e.loc);
                self.decls.push((tmp.clone(), ty));
                self.stmts.push(Stmt::havoc(vec![tmp.clone()]));
                Expr::id(tmp)
            }
            _ => self.err(&e.loc, format!("unsupported builtin '{}'", name)),
        }
    }

    fn member_call(
        &mut self,
        e: &SolExpression,
        base: &SolExpression,
        member: &str,
        referenced: Option<NodeId>,
        args: &[SolExpression],
    ) -> ExprRef {
        // Address builtins.
        if matches!(base.ty, SolType::Address) {
            return match member {
                "transfer" => {
                    let Some(amount) = args.first() else {
                        return self.err(&e.loc, "transfer takes an amount");
                    };
                    let target = self.expr(base);
                    let amount = self.expr(amount);
                    let moved = self.transfer_stmts(&e.loc, target, amount);
                    self.stmts.extend(moved);
                    Expr::bool_lit(true)
                }
                "send" => {
                    let Some(amount) = args.first() else {
                        return self.err(&e.loc, "send takes an amount");
                    };
                    let target = self.expr(base);
                    let amount = self.expr(amount);
                    let tmp = format!("send#{}", e.id);
                    self.decls.push((tmp.clone(), BoogieType::Bool));
                    self.stmts.push(Stmt::havoc(vec![tmp.clone()]));
                    let body = self.transfer_stmts(&e.loc, target, amount);
                    self.stmts.push(Stmt::IfElse {
                        cond: Expr::id(tmp.clone()),
                        then_block: boogie_ast::Block::from(body),
                        else_block: None,
                    });
                    Expr::id(tmp)
                }
                "call" | "delegatecall" | "staticcall" => {
                    for a in args {
                        self.expr(a);
                    }
                    log::warn!("low-level {} treated as nondeterministic", member);
                    let tmp = format!("{}#{}", member, e.id);
                    self.decls.push((tmp.clone(), BoogieType::Bool));
                    self.stmts.push(Stmt::havoc(vec![tmp.clone()]));
                    Expr::id(tmp)
                }
                _ => self.err(&e.loc, format!("unsupported address member '{}'", member)),
            };
        }
        // External calls and getters on contract-typed expressions.
        if let SolType::Contract { .. } = base.ty {
            let target = self.expr(base);
            if let Some(referenced) = referenced {
                match self.ctx.model.decl_info(referenced).map(|i| i.kind) {
                    Some(DeclKind::Function) => {
                        // External call: the caller becomes the sender.
                        let no_value =
                            encoding::int_literal(self.ctx, &BigInt::from(0u8), 256);
                        return self.emit_call(
                            e,
                            referenced,
                            target,
                            Expr::id(THIS),
                            no_value,
                            args,
                        );
                    }
                    Some(DeclKind::StateVariable) => {
                        // Public getter: a map read at the target address.
                        let var = Expr::id(self.ctx.mangle(referenced));
                        return Expr::arr_sel(var, target);
                    }
                    _ => {}
                }
            }
        }
        self.err(&e.loc, format!("unsupported call to member '{}'", member))
    }

    /// Balance movement for `transfer`/`send`: sufficient funds assumed,
    /// then both balances updated, all in the active arithmetic encoding.
    fn transfer_stmts(&mut self, loc: &Loc, target: ExprRef, amount: ExprRef) -> Vec<Stmt> {
        let this_bal = Expr::arr_sel(Expr::id(BALANCE), Expr::id(THIS));
        let target_bal = Expr::arr_sel(Expr::id(BALANCE), target.clone());
        let enough = encoding::encode_binary(
            self.ctx,
            loc,
            BinaryOperator::Gte,
            this_bal.clone(),
            amount.clone(),
            256,
            false,
        );
        let enough = self.arith(enough);
        let debit = encoding::encode_binary(
            self.ctx,
            loc,
            BinaryOperator::Sub,
            this_bal,
            amount.clone(),
            256,
            false,
        );
        let debit = self.arith(debit);
        let credit = encoding::encode_binary(
            self.ctx,
            loc,
            BinaryOperator::Add,
            target_bal,
            amount,
            256,
            false,
        );
        let credit = self.arith(credit);
        vec![
            Stmt::assume(enough),
            Stmt::assign(
                Expr::id(BALANCE),
                Expr::arr_upd(Expr::id(BALANCE), Expr::id(THIS), debit),
            ),
            Stmt::assign(
                Expr::id(BALANCE),
                Expr::arr_upd(Expr::id(BALANCE), target, credit),
            ),
        ]
    }

    /// A lowered procedure call: fresh result temporaries named after the
    /// callee and the call site, implicit receiver/sender/value arguments
    /// first.
    fn emit_call(
        &mut self,
        e: &SolExpression,
        fun_id: NodeId,
        receiver: ExprRef,
        sender: ExprRef,
        value: ExprRef,
        args: &[SolExpression],
    ) -> ExprRef {
        let fun = self.ctx.model.function(fun_id).clone();
        let proc = self.ctx.mangle(fun_id);
        let mut call_args = vec![receiver, sender, value];
        for a in args {
            call_args.push(self.expr(a));
        }
        let mut returns = vec![];
        let mut results = vec![];
        for (i, r) in fun.returns.iter().enumerate() {
            let tmp = if fun.returns.len() == 1 {
                format!("{}#{}", fun.name, e.id)
            } else {
                format!("{}#{}#{}", fun.name, e.id, i)
            };
            let ty = self.ctx.type_of(&r.ty, &e.loc);
            self.decls.push((tmp.clone(), ty));
            let result = Expr::id(tmp.clone());
            if let Some(tcc) = encoding::tcc_for(self.ctx, &result, &r.ty) {
                self.tccs.push(tcc);
            }
            returns.push(tmp);
            results.push(result);
        }
        self.stmts.push(Stmt::call(proc, call_args, returns));
        match results.len() {
            0 => Expr::bool_lit(true),
            1 => results.pop().expect("BUG: missing call result"),
            _ => Expr::tuple(results),
        }
    }
}
