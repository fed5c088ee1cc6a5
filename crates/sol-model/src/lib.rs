// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resolved source-contract model
//!
//! This crate defines the fully resolved, typed contract AST the translation
//! passes consume, together with the seams to the front end: documentation
//! tags, the annotation re-parsing service, and the diagnostics reporter.
//! Parsing and name/type resolution themselves live outside this workspace;
//! everything here assumes a well-formed input.

pub mod annotations;
pub mod ast;
pub mod model;
pub mod reporter;
pub mod types;

// Node identity and locations
pub use model::{DeclInfo, DeclKind, Loc, NodeId, SourceModel};

// Declarations
pub use ast::{
    ContractDefinition, ContractKind, EnumDefinition, EventDefinition, FunctionDefinition,
    FunctionKind, ModifierDefinition, ModifierInvocation, SourceUnit, StructDefinition,
    VariableDeclaration, Visibility,
};

// Expressions and statements
pub use ast::{
    BinaryOperator, CallKind, ExprKind, LiteralValue, MagicVar, QuantOp, SolExpression,
    SolStatement, StmtKind, UnaryOperator,
};

// Types
pub use types::{DataLocation, SolType};

// Annotations and diagnostics
pub use annotations::{AnnotationParser, DocTag, DocTagKind};
pub use reporter::Reporter;
