// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Flat Boogie programs.

use std::collections::BTreeSet;

use crate::decls::Decl;

/// An ordered list of top-level declarations. Registration is append-only
/// and deduplicates named declarations by name: auxiliary declarations (bv
/// builtins, memory array datatypes, interned literals) are requested at
/// every use site and must land in the output once.
#[derive(Debug, Clone, Default)]
pub struct Program {
    decls: Vec<Decl>,
    names: BTreeSet<String>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Append a declaration unless one with the same name was already added.
    /// Returns whether the declaration was actually appended.
    pub fn add_decl(&mut self, decl: Decl) -> bool {
        if let Some(name) = decl.name() {
            if !self.names.insert(name.to_string()) {
                return false;
            }
        }
        self.decls.push(decl);
        true
    }

    pub fn has_decl(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn decls(&self) -> &[Decl] {
        &self.decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoogieType;

    #[test]
    fn named_decls_deduplicate() {
        let mut p = Program::new();
        assert!(p.add_decl(Decl::var("x", BoogieType::Int)));
        assert!(!p.add_decl(Decl::var("x", BoogieType::Int)));
        assert!(p.add_decl(Decl::comment("one")));
        assert!(p.add_decl(Decl::comment("two")));
        assert_eq!(p.decls().len(), 3);
        assert!(p.has_decl("x"));
    }
}
