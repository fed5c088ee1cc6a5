// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boogie expressions and attributes.
//!
//! Expressions are immutable and shared through `Rc`: converters freely reuse
//! subtrees (the receiver address, interned literals, invariant bodies)
//! without cloning whole trees. Structural equality and ordering let the
//! translation context deduplicate by value.

use std::rc::Rc;

use num::BigInt;
use serde::{Deserialize, Serialize};

use crate::types::BoogieType;

/// Shared handle to an expression node.
pub type ExprRef = Rc<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Implies,
    Iff,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Lte => "<=",
            BinOp::Gte => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "==>",
            BinOp::Iff => "<==>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantKind {
    Forall,
    Exists,
}

/// A Boogie expression.
///
/// `Error` is the sentinel produced after a reported user error: it keeps the
/// surrounding conversion going and is never emitted into a healthy function
/// body (the function gets degraded instead).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Error,
    Id(String),
    IntLit(BigInt),
    /// Bit-vector literal, printed `<value>bv<bits>`.
    BvLit { value: BigInt, bits: u32 },
    BoolLit(bool),
    StringLit(String),
    BinOp {
        op: BinOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },
    UnOp {
        op: UnOp,
        sub: ExprRef,
    },
    FunCall {
        fun: String,
        args: Vec<ExprRef>,
    },
    Cond {
        cond: ExprRef,
        then_expr: ExprRef,
        else_expr: ExprRef,
    },
    /// Map/array select `base[index]`.
    ArrSel {
        base: ExprRef,
        index: ExprRef,
    },
    /// Functional map update `base[index := value]`.
    ArrUpd {
        base: ExprRef,
        index: ExprRef,
        value: ExprRef,
    },
    /// Datatype member select `member#constr(base)`. Carries the constructor
    /// name and the ordered member list so an update can re-apply the
    /// constructor.
    DtSel {
        base: ExprRef,
        member: String,
        constr: String,
        members: Vec<String>,
    },
    /// Datatype update: the constructor re-applied with one member replaced.
    DtUpd {
        base: ExprRef,
        member: String,
        value: ExprRef,
        constr: String,
        members: Vec<String>,
    },
    Quant {
        kind: QuantKind,
        vars: Vec<(String, BoogieType)>,
        body: ExprRef,
    },
    Old(ExprRef),
    /// Comma list used on either side of a parallel assignment.
    Tuple(Vec<ExprRef>),
}

impl Expr {
    pub fn error() -> ExprRef {
        Rc::new(Expr::Error)
    }

    pub fn id(name: impl Into<String>) -> ExprRef {
        Rc::new(Expr::Id(name.into()))
    }

    pub fn int_lit(value: impl Into<BigInt>) -> ExprRef {
        Rc::new(Expr::IntLit(value.into()))
    }

    pub fn bv_lit(value: impl Into<BigInt>, bits: u32) -> ExprRef {
        Rc::new(Expr::BvLit {
            value: value.into(),
            bits,
        })
    }

    pub fn bool_lit(value: bool) -> ExprRef {
        Rc::new(Expr::BoolLit(value))
    }

    pub fn string_lit(value: impl Into<String>) -> ExprRef {
        Rc::new(Expr::StringLit(value.into()))
    }

    pub fn bin_op(op: BinOp, lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Rc::new(Expr::BinOp { op, lhs, rhs })
    }

    pub fn un_op(op: UnOp, sub: ExprRef) -> ExprRef {
        Rc::new(Expr::UnOp { op, sub })
    }

    pub fn not(sub: ExprRef) -> ExprRef {
        Self::un_op(UnOp::Not, sub)
    }

    pub fn neg(sub: ExprRef) -> ExprRef {
        Self::un_op(UnOp::Neg, sub)
    }

    pub fn eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Eq, lhs, rhs)
    }

    pub fn neq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Neq, lhs, rhs)
    }

    pub fn and(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Or, lhs, rhs)
    }

    pub fn implies(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Implies, lhs, rhs)
    }

    pub fn lte(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Lte, lhs, rhs)
    }

    pub fn gte(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        Self::bin_op(BinOp::Gte, lhs, rhs)
    }

    pub fn fun_call(fun: impl Into<String>, args: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expr::FunCall {
            fun: fun.into(),
            args,
        })
    }

    pub fn cond(cond: ExprRef, then_expr: ExprRef, else_expr: ExprRef) -> ExprRef {
        Rc::new(Expr::Cond {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn arr_sel(base: ExprRef, index: ExprRef) -> ExprRef {
        Rc::new(Expr::ArrSel { base, index })
    }

    pub fn arr_upd(base: ExprRef, index: ExprRef, value: ExprRef) -> ExprRef {
        Rc::new(Expr::ArrUpd { base, index, value })
    }

    pub fn dt_sel(
        base: ExprRef,
        member: impl Into<String>,
        constr: impl Into<String>,
        members: Vec<String>,
    ) -> ExprRef {
        Rc::new(Expr::DtSel {
            base,
            member: member.into(),
            constr: constr.into(),
            members,
        })
    }

    pub fn dt_upd(
        base: ExprRef,
        member: impl Into<String>,
        value: ExprRef,
        constr: impl Into<String>,
        members: Vec<String>,
    ) -> ExprRef {
        Rc::new(Expr::DtUpd {
            base,
            member: member.into(),
            value,
            constr: constr.into(),
            members,
        })
    }

    pub fn forall(vars: Vec<(String, BoogieType)>, body: ExprRef) -> ExprRef {
        Rc::new(Expr::Quant {
            kind: QuantKind::Forall,
            vars,
            body,
        })
    }

    pub fn exists(vars: Vec<(String, BoogieType)>, body: ExprRef) -> ExprRef {
        Rc::new(Expr::Quant {
            kind: QuantKind::Exists,
            vars,
            body,
        })
    }

    pub fn old(sub: ExprRef) -> ExprRef {
        Rc::new(Expr::Old(sub))
    }

    pub fn tuple(elems: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expr::Tuple(elems))
    }

    pub fn is_select(expr: &ExprRef) -> bool {
        matches!(**expr, Expr::ArrSel { .. } | Expr::DtSel { .. })
    }

    pub fn is_error(expr: &ExprRef) -> bool {
        matches!(**expr, Expr::Error)
    }

    /// Rewrite an assignment whose target is a select chain into an
    /// assignment to the chain's root variable. `base[i].m := v` becomes
    /// `base := base[i := constr(..., v, ...)]`; the returned pair is
    /// (root, rewritten right-hand side). The target must be a select.
    pub fn select_to_update(lhs: &ExprRef, value: ExprRef) -> (ExprRef, ExprRef) {
        let (base, upd) = match &**lhs {
            Expr::ArrSel { base, index } => (
                base,
                Expr::arr_upd(base.clone(), index.clone(), value),
            ),
            Expr::DtSel {
                base,
                member,
                constr,
                members,
            } => (
                base,
                Expr::dt_upd(
                    base.clone(),
                    member.clone(),
                    value,
                    constr.clone(),
                    members.clone(),
                ),
            ),
            _ => panic!("BUG: select-to-update applied to a non-select expression"),
        };
        if Self::is_select(base) {
            Self::select_to_update(base, upd)
        } else {
            (base.clone(), upd)
        }
    }

    /// Replace the root of a select chain, keeping every select on the way.
    /// Used by frame-condition synthesis to re-read a modified path from a
    /// snapshot of the variable.
    pub fn replace_base(chain: &ExprRef, new_base: ExprRef) -> ExprRef {
        match &**chain {
            Expr::ArrSel { base, index } => {
                Expr::arr_sel(Self::replace_base(base, new_base), index.clone())
            }
            Expr::DtSel {
                base,
                member,
                constr,
                members,
            } => Expr::dt_sel(
                Self::replace_base(base, new_base),
                member.clone(),
                constr.clone(),
                members.clone(),
            ),
            _ => new_base,
        }
    }
}

/// Value of an attribute: `{:message "overflow"}`, `{:sourceloc "a.sol", 12}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrValue {
    Str(String),
    Num(i64),
    Expr(ExprRef),
}

/// A Boogie attribute `{:name value, ...}` attached to statements,
/// specifications and declarations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attr {
    pub name: String,
    pub values: Vec<AttrValue>,
}

impl Attr {
    pub fn new(name: impl Into<String>, values: Vec<AttrValue>) -> Self {
        Attr {
            name: name.into(),
            values,
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, vec![])
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new("message", vec![AttrValue::Str(text.into())])
    }

    pub fn source_loc(file: impl Into<String>, line: u32) -> Self {
        Self::new(
            "sourceloc",
            vec![AttrValue::Str(file.into()), AttrValue::Num(line as i64)],
        )
    }
}
