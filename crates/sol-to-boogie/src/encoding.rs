// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Encoding-aware arithmetic.
//!
//! The same source operation renders three ways: plain mathematical
//! operators (`Int`), calls to lazily declared SMT builtins (`Bv`), or
//! mathematical operators wrapped at the type bounds (`Mod`). Overflow
//! conditions say "the unwrapped result is in range" under the mathematical
//! encodings, and "the operation at twice the width agrees with the widened
//! result" under `Bv`; the converters turn their negation into updates of
//! the overflow flag.

use boogie_ast::{BinOp, Expr, ExprRef, UnOp};
use num::BigInt;
use sol_model::{BinaryOperator, Loc, SolType, UnaryOperator};

use crate::context::TranslationContext;
use crate::Encoding;

/// An encoded arithmetic operation; `oc` is the no-overflow condition when
/// overflow tracking applies to this operation.
pub struct ArithResult {
    pub expr: ExprRef,
    pub oc: Option<ExprRef>,
}

impl ArithResult {
    fn plain(expr: ExprRef) -> Self {
        ArithResult { expr, oc: None }
    }
}

pub fn pow2(bits: u16) -> BigInt {
    BigInt::from(1u8) << bits
}

/// `lower <= e && e <= upper` for the given integer width.
pub fn range_condition(e: &ExprRef, bits: u16, signed: bool) -> ExprRef {
    let (lower, upper) = if signed {
        let half = pow2(bits - 1);
        (-half.clone(), half - 1)
    } else {
        (BigInt::from(0u8), pow2(bits) - 1)
    };
    Expr::and(
        Expr::lte(Expr::int_lit(lower), e.clone()),
        Expr::lte(e.clone(), Expr::int_lit(upper)),
    )
}

/// Wrap a mathematical result back into the type's value range.
fn wrap(e: ExprRef, bits: u16, signed: bool) -> ExprRef {
    if signed {
        let half = Expr::int_lit(pow2(bits - 1));
        let shifted = Expr::bin_op(BinOp::Add, e, half.clone());
        let wrapped = Expr::bin_op(BinOp::Mod, shifted, Expr::int_lit(pow2(bits)));
        Expr::bin_op(BinOp::Sub, wrapped, half)
    } else {
        Expr::bin_op(BinOp::Mod, e, Expr::int_lit(pow2(bits)))
    }
}

/// An integer literal in the current encoding.
pub fn int_literal(ctx: &TranslationContext, value: &BigInt, bits: u16) -> ExprRef {
    match ctx.options.encoding {
        Encoding::Bv => {
            // Bit-vector literals are unsigned; negative values wrap.
            let m = pow2(bits);
            let v = ((value % &m) + &m) % m;
            Expr::bv_lit(v, bits as u32)
        }
        _ => Expr::int_lit(value.clone()),
    }
}

/// No-overflow condition under `Bv`: the operation redone at twice the
/// width agrees with the widened narrow result.
fn bv_no_overflow(
    ctx: &mut TranslationContext,
    short: &str,
    smt: &str,
    bits: u16,
    signed: bool,
    lhs: ExprRef,
    rhs: ExprRef,
    narrow: ExprRef,
) -> ExprRef {
    let wide = bits * 2;
    let ext = ctx.bv_extend(signed, bits, wide);
    let wide_fun = ctx.bv_binary(short, smt, wide, false);
    let wide_result = Expr::fun_call(
        wide_fun,
        vec![
            Expr::fun_call(ext.clone(), vec![lhs]),
            Expr::fun_call(ext.clone(), vec![rhs]),
        ],
    );
    Expr::eq(wide_result, Expr::fun_call(ext, vec![narrow]))
}

/// 256-bit unsigned arithmetic over the environment's bookkeeping values
/// (`__balance` entries, `__msg_value`). Never overflow-tracked.
pub fn env_arith(
    ctx: &mut TranslationContext,
    op: BinaryOperator,
    lhs: ExprRef,
    rhs: ExprRef,
) -> ExprRef {
    let (short, smt, bop) = match op {
        BinaryOperator::Add => ("add", "bvadd", BinOp::Add),
        BinaryOperator::Sub => ("sub", "bvsub", BinOp::Sub),
        _ => panic!("BUG: environment arithmetic is add/sub only"),
    };
    if ctx.options.encoding == Encoding::Bv {
        let fun = ctx.bv_binary(short, smt, 256, false);
        Expr::fun_call(fun, vec![lhs, rhs])
    } else {
        Expr::bin_op(bop, lhs, rhs)
    }
}

/// Unsigned 256-bit comparison for the same bookkeeping values.
pub fn env_compare(
    ctx: &mut TranslationContext,
    op: BinaryOperator,
    lhs: ExprRef,
    rhs: ExprRef,
) -> ExprRef {
    if ctx.options.encoding == Encoding::Bv {
        let fun = bv_compare(ctx, op, false, 256);
        return Expr::fun_call(fun, vec![lhs, rhs]);
    }
    let bop = match op {
        BinaryOperator::Lt => BinOp::Lt,
        BinaryOperator::Gt => BinOp::Gt,
        BinaryOperator::Lte => BinOp::Lte,
        BinaryOperator::Gte => BinOp::Gte,
        _ => panic!("BUG: not a comparison operator"),
    };
    Expr::bin_op(bop, lhs, rhs)
}

pub fn env_zero(ctx: &TranslationContext) -> ExprRef {
    int_literal(ctx, &BigInt::from(0u8), 256)
}

fn bv_compare(ctx: &mut TranslationContext, op: BinaryOperator, signed: bool, bits: u16) -> String {
    let (short, smt) = match (op, signed) {
        (BinaryOperator::Lt, false) => ("ult", "bvult"),
        (BinaryOperator::Lt, true) => ("slt", "bvslt"),
        (BinaryOperator::Gt, false) => ("ugt", "bvugt"),
        (BinaryOperator::Gt, true) => ("sgt", "bvsgt"),
        (BinaryOperator::Lte, false) => ("ule", "bvule"),
        (BinaryOperator::Lte, true) => ("sle", "bvsle"),
        (BinaryOperator::Gte, false) => ("uge", "bvuge"),
        (BinaryOperator::Gte, true) => ("sge", "bvsge"),
        _ => panic!("BUG: not a comparison operator"),
    };
    ctx.bv_binary(short, smt, bits, true)
}

pub fn encode_binary(
    ctx: &mut TranslationContext,
    loc: &Loc,
    op: BinaryOperator,
    lhs: ExprRef,
    rhs: ExprRef,
    bits: u16,
    signed: bool,
) -> ArithResult {
    let encoding = ctx.options.encoding;
    let track = ctx.options.overflow;
    match op {
        BinaryOperator::And => ArithResult::plain(Expr::and(lhs, rhs)),
        BinaryOperator::Or => ArithResult::plain(Expr::or(lhs, rhs)),
        BinaryOperator::Eq => ArithResult::plain(Expr::eq(lhs, rhs)),
        BinaryOperator::Neq => ArithResult::plain(Expr::neq(lhs, rhs)),
        BinaryOperator::Lt | BinaryOperator::Gt | BinaryOperator::Lte | BinaryOperator::Gte => {
            if encoding == Encoding::Bv {
                let fun = bv_compare(ctx, op, signed, bits);
                ArithResult::plain(Expr::fun_call(fun, vec![lhs, rhs]))
            } else {
                let bop = match op {
                    BinaryOperator::Lt => BinOp::Lt,
                    BinaryOperator::Gt => BinOp::Gt,
                    BinaryOperator::Lte => BinOp::Lte,
                    _ => BinOp::Gte,
                };
                ArithResult::plain(Expr::bin_op(bop, lhs, rhs))
            }
        }
        BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul => {
            if encoding == Encoding::Bv {
                let (short, smt) = match op {
                    BinaryOperator::Add => ("add", "bvadd"),
                    BinaryOperator::Sub => ("sub", "bvsub"),
                    _ => ("mul", "bvmul"),
                };
                let fun = ctx.bv_binary(short, smt, bits, false);
                let expr = Expr::fun_call(fun, vec![lhs.clone(), rhs.clone()]);
                let oc = if track {
                    Some(bv_no_overflow(
                        ctx,
                        short,
                        smt,
                        bits,
                        signed,
                        lhs,
                        rhs,
                        expr.clone(),
                    ))
                } else {
                    None
                };
                return ArithResult { expr, oc };
            }
            let bop = match op {
                BinaryOperator::Add => BinOp::Add,
                BinaryOperator::Sub => BinOp::Sub,
                _ => BinOp::Mul,
            };
            let raw = Expr::bin_op(bop, lhs, rhs);
            let oc = track.then(|| range_condition(&raw, bits, signed));
            let expr = match encoding {
                Encoding::Mod => wrap(raw, bits, signed),
                _ => raw,
            };
            ArithResult { expr, oc }
        }
        BinaryOperator::Div | BinaryOperator::Mod => {
            if encoding == Encoding::Bv {
                let (short, smt) = match (op, signed) {
                    (BinaryOperator::Div, false) => ("udiv", "bvudiv"),
                    (BinaryOperator::Div, true) => ("sdiv", "bvsdiv"),
                    (_, false) => ("urem", "bvurem"),
                    (_, true) => ("srem", "bvsrem"),
                };
                let fun = ctx.bv_binary(short, smt, bits, false);
                return ArithResult::plain(Expr::fun_call(fun, vec![lhs, rhs]));
            }
            let bop = if op == BinaryOperator::Div {
                BinOp::Div
            } else {
                BinOp::Mod
            };
            ArithResult::plain(Expr::bin_op(bop, lhs, rhs))
        }
        BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::BitXor => {
            if encoding == Encoding::Bv {
                let (short, smt) = match op {
                    BinaryOperator::BitAnd => ("and", "bvand"),
                    BinaryOperator::BitOr => ("or", "bvor"),
                    _ => ("xor", "bvxor"),
                };
                let fun = ctx.bv_binary(short, smt, bits, false);
                ArithResult::plain(Expr::fun_call(fun, vec![lhs, rhs]))
            } else {
                ctx.error(loc, "bitwise operation requires bit-precise encoding");
                ArithResult::plain(Expr::error())
            }
        }
        BinaryOperator::Shl | BinaryOperator::Shr => {
            if encoding == Encoding::Bv {
                let (short, smt) = match (op, signed) {
                    (BinaryOperator::Shl, _) => ("shl", "bvshl"),
                    (_, false) => ("lshr", "bvlshr"),
                    (_, true) => ("ashr", "bvashr"),
                };
                let fun = ctx.bv_binary(short, smt, bits, false);
                ArithResult::plain(Expr::fun_call(fun, vec![lhs, rhs]))
            } else {
                ctx.error(loc, "shift operation requires bit-precise encoding");
                ArithResult::plain(Expr::error())
            }
        }
        BinaryOperator::Pow => {
            panic!("BUG: exponentiation must be lowered before arithmetic encoding")
        }
    }
}

pub fn encode_unary(
    ctx: &mut TranslationContext,
    loc: &Loc,
    op: UnaryOperator,
    sub: ExprRef,
    bits: u16,
    signed: bool,
) -> ArithResult {
    let encoding = ctx.options.encoding;
    let track = ctx.options.overflow;
    match op {
        UnaryOperator::Not => ArithResult::plain(Expr::not(sub)),
        UnaryOperator::Neg => {
            if encoding == Encoding::Bv {
                let fun = ctx.bv_unary("neg", "bvneg", bits);
                let expr = Expr::fun_call(fun, vec![sub.clone()]);
                let oc = if track {
                    let wide = bits * 2;
                    let ext = ctx.bv_extend(signed, bits, wide);
                    let wide_fun = ctx.bv_unary("neg", "bvneg", wide);
                    Some(Expr::eq(
                        Expr::fun_call(wide_fun, vec![Expr::fun_call(ext.clone(), vec![sub])]),
                        Expr::fun_call(ext, vec![expr.clone()]),
                    ))
                } else {
                    None
                };
                return ArithResult { expr, oc };
            }
            let raw = Expr::un_op(UnOp::Neg, sub);
            let oc = track.then(|| range_condition(&raw, bits, signed));
            let expr = match encoding {
                Encoding::Mod => wrap(raw, bits, signed),
                _ => raw,
            };
            ArithResult { expr, oc }
        }
        UnaryOperator::BitNot => {
            if encoding == Encoding::Bv {
                let fun = ctx.bv_unary("not", "bvnot", bits);
                ArithResult::plain(Expr::fun_call(fun, vec![sub]))
            } else {
                ctx.error(loc, "bitwise negation requires bit-precise encoding");
                ArithResult::plain(Expr::error())
            }
        }
        UnaryOperator::Inc | UnaryOperator::Dec | UnaryOperator::Delete => {
            panic!("BUG: mutating unary operator reached arithmetic encoding")
        }
    }
}

/// Type-correctness condition: the range every value of `ty` inhabits under
/// mathematical-integer encodings. Bit-vectors carry their range in the
/// type.
pub fn tcc_for(ctx: &TranslationContext, expr: &ExprRef, ty: &SolType) -> Option<ExprRef> {
    if ctx.options.encoding == Encoding::Bv {
        return None;
    }
    match ty {
        SolType::Int { bits, signed } => Some(range_condition(expr, *bits, *signed)),
        SolType::Address | SolType::Contract { .. } => Some(range_condition(expr, 160, false)),
        SolType::FixedBytes(n) => Some(range_condition(expr, *n as u16 * 8, false)),
        SolType::Enum { def, .. } => {
            let count = ctx.model.enum_def(*def).members.len();
            Some(Expr::and(
                Expr::lte(Expr::int_lit(0), expr.clone()),
                Expr::bin_op(
                    BinOp::Lt,
                    expr.clone(),
                    Expr::int_lit(BigInt::from(count)),
                ),
            ))
        }
        _ => None,
    }
}

/// The zero-equivalent initial value, when the type has one.
pub fn default_value(ctx: &mut TranslationContext, ty: &SolType, _loc: &Loc) -> Option<ExprRef> {
    match ty {
        SolType::Bool => Some(Expr::bool_lit(false)),
        SolType::Int { bits, .. } => Some(int_literal(ctx, &BigInt::from(0u8), *bits)),
        SolType::Address | SolType::Contract { .. } => {
            Some(int_literal(ctx, &BigInt::from(0u8), 160))
        }
        SolType::FixedBytes(n) => Some(int_literal(ctx, &BigInt::from(0u8), *n as u16 * 8)),
        SolType::Enum { .. } => Some(Expr::int_lit(0)),
        SolType::String(_) => Some(ctx.intern_string("")),
        _ => None,
    }
}
