// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! The resolved contract AST.
//!
//! Definitions are shared through `Rc`: a contract owns its members, and the
//! `SourceModel` registry hands out the same handles when resolving by id.
//! Every expression and statement carries its node id, location and (for
//! expressions) its resolved type.

use std::rc::Rc;

use num::BigInt;
use serde::{Deserialize, Serialize};

use crate::annotations::DocTag;
use crate::model::{Loc, NodeId};
use crate::types::SolType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    BitNot,
    Neg,
    Inc,
    Dec,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Function,
    TypeConversion,
    StructConstructor,
}

/// Built-in environment objects; their members (`msg.sender`, `block.number`)
/// are resolved by the converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagicVar {
    This,
    Msg,
    Block,
    Tx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantOp {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    Number(BigInt),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolExpression {
    pub id: NodeId,
    pub loc: Loc,
    pub ty: SolType,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Plain (`op` is `None`) or compound (`+=` etc.) assignment.
    Assignment {
        op: Option<BinaryOperator>,
        lhs: Box<SolExpression>,
        rhs: Box<SolExpression>,
    },
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<SolExpression>,
        rhs: Box<SolExpression>,
    },
    UnaryOp {
        op: UnaryOperator,
        prefix: bool,
        sub: Box<SolExpression>,
    },
    Conditional {
        cond: Box<SolExpression>,
        then_expr: Box<SolExpression>,
        else_expr: Box<SolExpression>,
    },
    Call {
        kind: CallKind,
        callee: Box<SolExpression>,
        args: Vec<SolExpression>,
    },
    MemberAccess {
        base: Box<SolExpression>,
        member: String,
        referenced: Option<NodeId>,
    },
    IndexAccess {
        base: Box<SolExpression>,
        index: Option<Box<SolExpression>>,
    },
    Identifier {
        name: String,
        referenced: NodeId,
    },
    Magic(MagicVar),
    Literal(LiteralValue),
    Tuple {
        /// Empty slots come from Solidity's `(a, , c)` form.
        components: Vec<Option<SolExpression>>,
    },
    /// Annotation-only: the entry-state value of the sub-expression.
    Old(Box<SolExpression>),
    /// Annotation-only: quantified expression with its bound variables.
    Quantified {
        op: QuantOp,
        bound: Vec<Rc<VariableDeclaration>>,
        body: Box<SolExpression>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolStatement {
    pub id: NodeId,
    pub loc: Loc,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<SolStatement>),
    If {
        cond: SolExpression,
        then_branch: Box<SolStatement>,
        else_branch: Option<Box<SolStatement>>,
    },
    While {
        cond: SolExpression,
        body: Box<SolStatement>,
        doc_tags: Vec<DocTag>,
    },
    DoWhile {
        cond: SolExpression,
        body: Box<SolStatement>,
        doc_tags: Vec<DocTag>,
    },
    For {
        init: Option<Box<SolStatement>>,
        cond: Option<SolExpression>,
        update: Option<Box<SolStatement>>,
        body: Box<SolStatement>,
        doc_tags: Vec<DocTag>,
    },
    Break,
    Continue,
    Return(Option<SolExpression>),
    Throw,
    Emit(SolExpression),
    /// Local declaration, possibly a tuple destructuring with gaps.
    VarDecl {
        vars: Vec<Option<Rc<VariableDeclaration>>>,
        init: Option<SolExpression>,
    },
    Expression(SolExpression),
    /// The `_` statement inside a modifier body.
    Placeholder,
    InlineAssembly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Constructor,
    Function,
    Fallback,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub ty: SolType,
    pub value: Option<SolExpression>,
    pub is_state: bool,
}

/// A modifier (or base-constructor) invocation on a function header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierInvocation {
    pub loc: Loc,
    pub name: String,
    pub referenced: NodeId,
    pub args: Vec<SolExpression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub is_payable: bool,
    pub params: Vec<Rc<VariableDeclaration>>,
    pub returns: Vec<Rc<VariableDeclaration>>,
    pub modifiers: Vec<ModifierInvocation>,
    pub body: Option<SolStatement>,
    pub doc_tags: Vec<DocTag>,
}

impl FunctionDefinition {
    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public | Visibility::External)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub params: Vec<Rc<VariableDeclaration>>,
    pub body: SolStatement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub fields: Vec<Rc<VariableDeclaration>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDefinition {
    pub id: NodeId,
    pub loc: Loc,
    pub name: String,
    pub kind: ContractKind,
    /// C3-linearized base list, the contract itself first, root base last.
    pub linearized_bases: Vec<NodeId>,
    pub state_vars: Vec<Rc<VariableDeclaration>>,
    pub functions: Vec<Rc<FunctionDefinition>>,
    pub modifiers: Vec<Rc<ModifierDefinition>>,
    pub structs: Vec<Rc<StructDefinition>>,
    pub enums: Vec<Rc<EnumDefinition>>,
    pub events: Vec<Rc<EventDefinition>>,
    pub doc_tags: Vec<DocTag>,
}

impl ContractDefinition {
    pub fn constructor(&self) -> Option<&Rc<FunctionDefinition>> {
        self.functions.iter().find(|f| f.is_constructor())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceUnit {
    pub file: String,
    pub contracts: Vec<Rc<ContractDefinition>>,
}
