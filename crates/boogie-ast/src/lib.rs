// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boogie IR
//!
//! This crate provides the Boogie program model the translation passes build,
//! together with its textual printer. It knows nothing about the source
//! language - producing well-formed Boogie from source contracts is the
//! responsibility of the translation crates.

mod decls;
mod exprs;
mod program;
mod stmts;
mod types;
mod writer;

// Expression tree and attributes
pub use exprs::{Attr, AttrValue, BinOp, Expr, ExprRef, QuantKind, UnOp};

// Statements and blocks
pub use stmts::{Block, Stmt};

// Declarations and specifications
pub use decls::{Decl, ProcDecl, Specification};

// Programs
pub use program::Program;

// Boogie types
pub use types::BoogieType;
