// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Source-language types, as annotated on every resolved expression.

use num::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataLocation {
    Storage,
    Memory,
    Calldata,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SolType {
    Bool,
    /// Signed or unsigned integer of 8..=256 bits.
    Int { bits: u16, signed: bool },
    Address,
    /// `bytes1`..`bytes32`.
    FixedBytes(u8),
    String(DataLocation),
    Array {
        base: Box<SolType>,
        /// `None` for dynamically sized arrays.
        length: Option<BigUint>,
        location: DataLocation,
    },
    Mapping {
        key: Box<SolType>,
        value: Box<SolType>,
    },
    Struct {
        def: NodeId,
        name: String,
        location: DataLocation,
    },
    Enum { def: NodeId, name: String },
    Contract { def: NodeId, name: String },
    Tuple(Vec<SolType>),
    /// The type of an integer literal before implicit conversion.
    IntConst(BigInt),
    /// A rational literal with a fractional part.
    RationalConst,
    Function,
}

impl SolType {
    pub fn uint(bits: u16) -> Self {
        SolType::Int {
            bits,
            signed: false,
        }
    }

    pub fn int(bits: u16) -> Self {
        SolType::Int { bits, signed: true }
    }

    /// Whether values of this type live behind a data location (arrays,
    /// structs, strings) rather than being copied by value.
    pub fn is_reference_type(&self) -> bool {
        matches!(
            self,
            SolType::Array { .. } | SolType::Struct { .. } | SolType::String(_)
        )
    }
}
