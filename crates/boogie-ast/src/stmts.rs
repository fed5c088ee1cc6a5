// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boogie statements.

use crate::decls::Specification;
use crate::exprs::{Attr, ExprRef};

/// An ordered list of statements, the body of a procedure, loop or branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new() -> Self {
        Block::default()
    }

    pub fn from(stmts: Vec<Stmt>) -> Self {
        Block { stmts }
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Stmt>) {
        self.stmts.extend(stmts);
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assert {
        expr: ExprRef,
        attrs: Vec<Attr>,
    },
    Assume {
        expr: ExprRef,
    },
    /// Parallel assignment; `lhs` and `rhs` have the same length.
    Assign {
        lhs: Vec<ExprRef>,
        rhs: Vec<ExprRef>,
    },
    Havoc {
        vars: Vec<String>,
    },
    Goto {
        targets: Vec<String>,
    },
    Call {
        proc: String,
        args: Vec<ExprRef>,
        returns: Vec<String>,
    },
    Comment(String),
    IfElse {
        cond: ExprRef,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: ExprRef,
        invariants: Vec<Specification>,
        body: Block,
    },
    Break,
    Label(String),
}

impl Stmt {
    pub fn assert(expr: ExprRef, attrs: Vec<Attr>) -> Stmt {
        Stmt::Assert { expr, attrs }
    }

    pub fn assume(expr: ExprRef) -> Stmt {
        Stmt::Assume { expr }
    }

    pub fn assign(lhs: ExprRef, rhs: ExprRef) -> Stmt {
        Stmt::Assign {
            lhs: vec![lhs],
            rhs: vec![rhs],
        }
    }

    pub fn assign_many(lhs: Vec<ExprRef>, rhs: Vec<ExprRef>) -> Stmt {
        assert_eq!(lhs.len(), rhs.len(), "BUG: unbalanced parallel assignment");
        Stmt::Assign { lhs, rhs }
    }

    pub fn havoc(vars: Vec<String>) -> Stmt {
        Stmt::Havoc { vars }
    }

    pub fn goto(target: impl Into<String>) -> Stmt {
        Stmt::Goto {
            targets: vec![target.into()],
        }
    }

    pub fn call(proc: impl Into<String>, args: Vec<ExprRef>, returns: Vec<String>) -> Stmt {
        Stmt::Call {
            proc: proc.into(),
            args,
            returns,
        }
    }

    pub fn comment(text: impl Into<String>) -> Stmt {
        Stmt::Comment(text.into())
    }

    pub fn label(name: impl Into<String>) -> Stmt {
        Stmt::Label(name.into())
    }
}
