// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boogie type terms.

/// A Boogie type as it appears in declarations, parameters and bound
/// variables. Named types cover synonyms, datatypes and uninterpreted types
/// alike: a type prints as its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoogieType {
    Int,
    Bool,
    /// Fixed-width bit-vector, `bv<N>`.
    Bv(u32),
    /// A type referred to by name (synonym, datatype, uninterpreted).
    Named(String),
    /// Map type `[K]V`.
    Map {
        key: Box<BoogieType>,
        value: Box<BoogieType>,
    },
}

impl BoogieType {
    pub fn named(name: impl Into<String>) -> Self {
        BoogieType::Named(name.into())
    }

    pub fn map(key: BoogieType, value: BoogieType) -> Self {
        BoogieType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// The value type of a map, for drilling through chained selects.
    /// Panics when applied to a non-map type, which indicates the caller
    /// lost track of the shape it built.
    pub fn map_value(&self) -> &BoogieType {
        match self {
            BoogieType::Map { value, .. } => value,
            _ => panic!("BUG: map_value on non-map Boogie type"),
        }
    }
}
