// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! The source model registry.
//!
//! Construction is two-pass: the front end hands over the owned definition
//! trees, then `SourceModel::new` walks them once and registers every
//! declaration by id. Lookups by id afterwards are total; a dangling id in a
//! resolved AST is a bug, not an input error.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{
    ContractDefinition, EnumDefinition, FunctionDefinition, ModifierDefinition, SolStatement,
    SourceUnit, StmtKind, StructDefinition, VariableDeclaration,
};
use crate::types::SolType;

/// Identifier of an AST node or declaration, unique per program.
pub type NodeId = u32;

/// A source location. `span` is the byte range inside the registered source
/// text, when the front end provides one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Loc {
    pub file: String,
    pub line: u32,
    pub span: Option<codespan::Span>,
}

impl Loc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Loc {
            file: file.into(),
            line,
            span: None,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Contract,
    StateVariable,
    LocalVariable,
    Parameter,
    Function,
    Modifier,
    Struct,
    StructField,
    Enum,
    Event,
}

/// Per-declaration facts used by name mangling and scope checks.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    pub name: String,
    pub kind: DeclKind,
    /// Enclosing declaration (function for locals, contract for members).
    pub scope: Option<NodeId>,
    pub ty: Option<SolType>,
    pub loc: Loc,
}

#[derive(Debug, Default)]
pub struct SourceModel {
    units: Vec<SourceUnit>,
    decls: BTreeMap<NodeId, DeclInfo>,
    contracts: BTreeMap<NodeId, Rc<ContractDefinition>>,
    functions: BTreeMap<NodeId, Rc<FunctionDefinition>>,
    modifiers: BTreeMap<NodeId, Rc<ModifierDefinition>>,
    structs: BTreeMap<NodeId, Rc<StructDefinition>>,
    enums: BTreeMap<NodeId, Rc<EnumDefinition>>,
    variables: BTreeMap<NodeId, Rc<VariableDeclaration>>,
}

impl SourceModel {
    pub fn new(units: Vec<SourceUnit>) -> Self {
        let mut model = SourceModel {
            units,
            ..SourceModel::default()
        };
        for unit in model.units.clone() {
            for contract in &unit.contracts {
                model.register_contract(contract);
            }
        }
        model
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn decl_info(&self, id: NodeId) -> Option<&DeclInfo> {
        self.decls.get(&id)
    }

    pub fn contract(&self, id: NodeId) -> &Rc<ContractDefinition> {
        self.contracts
            .get(&id)
            .expect("BUG: contract id not registered in source model")
    }

    pub fn is_contract(&self, id: NodeId) -> bool {
        self.contracts.contains_key(&id)
    }

    pub fn function(&self, id: NodeId) -> &Rc<FunctionDefinition> {
        self.functions
            .get(&id)
            .expect("BUG: function id not registered in source model")
    }

    pub fn modifier(&self, id: NodeId) -> Option<&Rc<ModifierDefinition>> {
        self.modifiers.get(&id)
    }

    pub fn struct_def(&self, id: NodeId) -> &Rc<StructDefinition> {
        self.structs
            .get(&id)
            .expect("BUG: struct id not registered in source model")
    }

    pub fn enum_def(&self, id: NodeId) -> &Rc<EnumDefinition> {
        self.enums
            .get(&id)
            .expect("BUG: enum id not registered in source model")
    }

    pub fn variable(&self, id: NodeId) -> Option<&Rc<VariableDeclaration>> {
        self.variables.get(&id)
    }

    /// Whether `ancestor` appears on the scope chain of `decl`.
    pub fn in_scope(&self, decl: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(decl);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.decls.get(&id).and_then(|d| d.scope);
        }
        false
    }

    /// All state variables visible in a contract, inherited ones first
    /// (base-to-derived order over the linearization).
    pub fn all_state_vars(&self, contract: &ContractDefinition) -> Vec<Rc<VariableDeclaration>> {
        let mut vars = vec![];
        for base_id in contract.linearized_bases.iter().rev() {
            let base = self.contract(*base_id);
            vars.extend(base.state_vars.iter().cloned());
        }
        vars
    }

    fn register(&mut self, id: NodeId, info: DeclInfo) {
        self.decls.insert(id, info);
    }

    fn register_var(&mut self, var: &Rc<VariableDeclaration>, kind: DeclKind, scope: NodeId) {
        self.register(
            var.id,
            DeclInfo {
                name: var.name.clone(),
                kind,
                scope: Some(scope),
                ty: Some(var.ty.clone()),
                loc: var.loc.clone(),
            },
        );
        self.variables.insert(var.id, var.clone());
    }

    fn register_contract(&mut self, contract: &Rc<ContractDefinition>) {
        self.register(
            contract.id,
            DeclInfo {
                name: contract.name.clone(),
                kind: DeclKind::Contract,
                scope: None,
                ty: None,
                loc: contract.loc.clone(),
            },
        );
        self.contracts.insert(contract.id, contract.clone());
        for var in &contract.state_vars {
            self.register_var(var, DeclKind::StateVariable, contract.id);
        }
        for st in &contract.structs {
            self.register(
                st.id,
                DeclInfo {
                    name: st.name.clone(),
                    kind: DeclKind::Struct,
                    scope: Some(contract.id),
                    ty: None,
                    loc: st.loc.clone(),
                },
            );
            self.structs.insert(st.id, st.clone());
            for field in &st.fields {
                self.register_var(field, DeclKind::StructField, st.id);
            }
        }
        for en in &contract.enums {
            self.register(
                en.id,
                DeclInfo {
                    name: en.name.clone(),
                    kind: DeclKind::Enum,
                    scope: Some(contract.id),
                    ty: None,
                    loc: en.loc.clone(),
                },
            );
            self.enums.insert(en.id, en.clone());
        }
        for ev in &contract.events {
            self.register(
                ev.id,
                DeclInfo {
                    name: ev.name.clone(),
                    kind: DeclKind::Event,
                    scope: Some(contract.id),
                    ty: None,
                    loc: ev.loc.clone(),
                },
            );
        }
        for mdef in &contract.modifiers {
            self.register(
                mdef.id,
                DeclInfo {
                    name: mdef.name.clone(),
                    kind: DeclKind::Modifier,
                    scope: Some(contract.id),
                    ty: None,
                    loc: mdef.loc.clone(),
                },
            );
            self.modifiers.insert(mdef.id, mdef.clone());
            for param in &mdef.params {
                self.register_var(param, DeclKind::Parameter, mdef.id);
            }
            self.register_locals(&mdef.body, mdef.id);
        }
        for fun in &contract.functions {
            self.register(
                fun.id,
                DeclInfo {
                    name: fun.name.clone(),
                    kind: DeclKind::Function,
                    scope: Some(contract.id),
                    ty: None,
                    loc: fun.loc.clone(),
                },
            );
            self.functions.insert(fun.id, fun.clone());
            for param in fun.params.iter().chain(fun.returns.iter()) {
                self.register_var(param, DeclKind::Parameter, fun.id);
            }
            if let Some(body) = &fun.body {
                self.register_locals(body, fun.id);
            }
        }
    }

    fn register_locals(&mut self, stmt: &SolStatement, scope: NodeId) {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.register_locals(s, scope);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.register_locals(then_branch, scope);
                if let Some(els) = else_branch {
                    self.register_locals(els, scope);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                self.register_locals(body, scope);
            }
            StmtKind::For {
                init, update, body, ..
            } => {
                if let Some(init) = init {
                    self.register_locals(init, scope);
                }
                if let Some(update) = update {
                    self.register_locals(update, scope);
                }
                self.register_locals(body, scope);
            }
            StmtKind::VarDecl { vars, .. } => {
                for var in vars.iter().flatten() {
                    self.register_var(var, DeclKind::LocalVariable, scope);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ContractKind;

    fn var(id: NodeId, name: &str) -> Rc<VariableDeclaration> {
        Rc::new(VariableDeclaration {
            id,
            loc: Loc::default(),
            name: name.to_string(),
            ty: SolType::uint(256),
            value: None,
            is_state: true,
        })
    }

    #[test]
    fn registration_and_scope_chain() {
        let contract = Rc::new(ContractDefinition {
            id: 1,
            loc: Loc::default(),
            name: "C".to_string(),
            kind: ContractKind::Contract,
            linearized_bases: vec![1],
            state_vars: vec![var(2, "x")],
            functions: vec![],
            modifiers: vec![],
            structs: vec![],
            enums: vec![],
            events: vec![],
            doc_tags: vec![],
        });
        let model = SourceModel::new(vec![SourceUnit {
            file: "c.sol".to_string(),
            contracts: vec![contract],
        }]);
        assert_eq!(model.decl_info(2).map(|d| d.name.as_str()), Some("x"));
        assert!(model.in_scope(2, 1));
        assert!(!model.in_scope(1, 2));
        assert_eq!(model.all_state_vars(model.contract(1)).len(), 1);
    }
}
