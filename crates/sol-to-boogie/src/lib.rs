// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Solidity-to-Boogie translation
//!
//! Lowers a resolved contract model into a flat Boogie program: contracts
//! become groups of global declarations, functions become procedures with
//! implicit receiver/sender/value parameters, state variables become maps
//! over addresses, and doc-tag annotations become specifications. The
//! output is deterministic; user-level problems are collected in the
//! diagnostics reporter while translation degrades and continues.

pub mod context;
pub mod converter;
pub mod encoding;
pub mod expression;
pub mod specs;

use serde::{Deserialize, Serialize};
use sol_model::{AnnotationParser, Reporter, SourceModel};

pub use boogie_ast::Program;
pub use context::TranslationContext;
pub use expression::{ExprResult, ExpressionConverter};
pub use specs::AnnotationExpr;

/// How integer arithmetic is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Mathematical integers; sub-word types get range conditions.
    Int,
    /// SMT bit-vectors via lazily declared builtins.
    Bv,
    /// Mathematical integers with explicit wraparound at type bounds.
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub encoding: Encoding,
    /// Track arithmetic overflow in a per-procedure flag and check it.
    pub overflow: bool,
    /// Synthesize frame ("modifies") postconditions for public functions.
    pub modifies_analysis: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            encoding: Encoding::Int,
            overflow: false,
            modifies_analysis: false,
        }
    }
}

/// Translate a whole source model into one Boogie program. The reporter
/// carries every diagnostic raised on the way; callers decide how to render
/// them and whether the run counts as failed.
pub fn translate(
    model: &SourceModel,
    options: Options,
    parser: &dyn AnnotationParser,
) -> (Program, Reporter) {
    let mut ctx = TranslationContext::new(model, options, parser);
    converter::convert_model(&mut ctx);
    ctx.finish()
}
