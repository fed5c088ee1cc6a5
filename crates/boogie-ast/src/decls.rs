// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Top-level Boogie declarations.

use crate::exprs::{Attr, ExprRef};
use crate::stmts::Block;
use crate::types::BoogieType;

/// A pre-/postcondition or loop invariant: an expression plus the attributes
/// (source location, message) reported when it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    pub expr: ExprRef,
    pub attrs: Vec<Attr>,
}

impl Specification {
    pub fn new(expr: ExprRef, attrs: Vec<Attr>) -> Self {
        Specification { expr, attrs }
    }

    pub fn plain(expr: ExprRef) -> Self {
        Specification {
            expr,
            attrs: vec![],
        }
    }
}

/// A procedure: signature, contract and optional body. Bodies carry their
/// local variable declarations separately so converters can keep appending
/// fresh temporaries while statements are being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcDecl {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub params: Vec<(String, BoogieType)>,
    pub returns: Vec<(String, BoogieType)>,
    pub requires: Vec<Specification>,
    pub ensures: Vec<Specification>,
    pub modifies: Vec<String>,
    pub locals: Vec<(String, BoogieType)>,
    pub body: Option<Block>,
}

impl ProcDecl {
    pub fn new(name: impl Into<String>) -> Self {
        ProcDecl {
            name: name.into(),
            attrs: vec![],
            params: vec![],
            returns: vec![],
            requires: vec![],
            ensures: vec![],
            modifies: vec![],
            locals: vec![],
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Comment(String),
    /// `type name;` or `type name = alias;`
    TypeAlias {
        name: String,
        alias: Option<BoogieType>,
    },
    /// Printed in the constructor-function datatype encoding:
    /// a `{:datatype}` type plus a `{:constructor}` function.
    DataType {
        name: String,
        constr: String,
        members: Vec<(String, BoogieType)>,
    },
    Axiom(ExprRef),
    Const {
        name: String,
        ty: BoogieType,
        unique: bool,
    },
    Var {
        name: String,
        ty: BoogieType,
    },
    Func {
        name: String,
        attrs: Vec<Attr>,
        params: Vec<(String, BoogieType)>,
        returns: BoogieType,
        body: Option<ExprRef>,
    },
    Proc(ProcDecl),
    /// Verbatim Boogie text, emitted as-is.
    Code(String),
}

impl Decl {
    pub fn comment(text: impl Into<String>) -> Decl {
        Decl::Comment(text.into())
    }

    pub fn type_alias(name: impl Into<String>, alias: Option<BoogieType>) -> Decl {
        Decl::TypeAlias {
            name: name.into(),
            alias,
        }
    }

    pub fn datatype(
        name: impl Into<String>,
        constr: impl Into<String>,
        members: Vec<(String, BoogieType)>,
    ) -> Decl {
        Decl::DataType {
            name: name.into(),
            constr: constr.into(),
            members,
        }
    }

    pub fn constant(name: impl Into<String>, ty: BoogieType, unique: bool) -> Decl {
        Decl::Const {
            name: name.into(),
            ty,
            unique,
        }
    }

    pub fn var(name: impl Into<String>, ty: BoogieType) -> Decl {
        Decl::Var {
            name: name.into(),
            ty,
        }
    }

    pub fn function(
        name: impl Into<String>,
        attrs: Vec<Attr>,
        params: Vec<(String, BoogieType)>,
        returns: BoogieType,
        body: Option<ExprRef>,
    ) -> Decl {
        Decl::Func {
            name: name.into(),
            attrs,
            params,
            returns,
            body,
        }
    }

    /// The registration name, used for by-name deduplication. Comments,
    /// axioms and verbatim code are anonymous and never deduplicated.
    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::TypeAlias { name, .. }
            | Decl::DataType { name, .. }
            | Decl::Const { name, .. }
            | Decl::Var { name, .. }
            | Decl::Func { name, .. } => Some(name),
            Decl::Proc(p) => Some(&p.name),
            Decl::Comment(_) | Decl::Axiom(_) | Decl::Code(_) => None,
        }
    }
}
