// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-program translation state.
//!
//! The context owns the Boogie program under construction and every piece of
//! state the converters share: name mangling with inlining scopes, the type
//! mapping with its lazily created auxiliary declarations, the bit-vector
//! builtin cache, literal interning, and the current contract's invariants.

use std::collections::BTreeMap;
use std::rc::Rc;

use boogie_ast::{Attr, AttrValue, BoogieType, Decl, Expr, ExprRef, Program};
use num::BigInt;
use sol_model::{
    AnnotationParser, ContractDefinition, DataLocation, Loc, NodeId, Reporter, SolType,
    SourceModel,
};

use crate::specs::AnnotationExpr;
use crate::{Encoding, Options};

// Names fixed by the encoding.
pub const THIS: &str = "__this";
pub const MSG_SENDER: &str = "__msg_sender";
pub const MSG_VALUE: &str = "__msg_value";
pub const BALANCE: &str = "__balance";
pub const NOW: &str = "__now";
pub const BLOCK_NUMBER: &str = "__block_number";
pub const OVERFLOW_FLAG: &str = "__verifier_overflow";
pub const ADDRESS_TYPE: &str = "address_t";
pub const ERROR_TYPE: &str = "__ERROR_UNSUPPORTED_TYPE";
pub const SUM_INT: &str = "__verifier_sum_int";
pub const SUM_UINT: &str = "__verifier_sum_uint";

/// Names of the auxiliary declarations backing an array type: the
/// `{arr, length}` datatype, and for memory arrays the pointer synonym plus
/// the heap variable holding the contents.
#[derive(Debug, Clone)]
pub struct ArrayInfo {
    pub datatype: String,
    pub constr: String,
    pub members: Vec<String>,
    pub heap: Option<String>,
}

/// Same for a struct type.
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub datatype: String,
    pub constr: String,
    pub members: Vec<String>,
    pub heap: Option<String>,
}

pub struct TranslationContext<'env> {
    pub model: &'env SourceModel,
    pub options: Options,
    pub parser: &'env dyn AnnotationParser,
    pub reporter: Reporter,
    program: Program,
    next_id: u32,
    /// Stack of (scope id, owning declaration) pushed while inlining
    /// modifier and base-constructor copies.
    extra_scopes: Vec<(u32, NodeId)>,
    current_contract: Option<Rc<ContractDefinition>>,
    /// Invariants of the current contract, parsed once per contract.
    pub invariants: Vec<AnnotationExpr>,
    string_lits: BTreeMap<String, String>,
    address_lits: BTreeMap<BigInt, String>,
}

impl<'env> TranslationContext<'env> {
    pub fn new(
        model: &'env SourceModel,
        options: Options,
        parser: &'env dyn AnnotationParser,
    ) -> Self {
        let mut ctx = TranslationContext {
            model,
            options,
            parser,
            reporter: Reporter::new(),
            program: Program::new(),
            next_id: 0,
            extra_scopes: vec![],
            current_contract: None,
            invariants: vec![],
            string_lits: BTreeMap::new(),
            address_lits: BTreeMap::new(),
        };
        ctx.add_prelude();
        ctx
    }

    fn add_prelude(&mut self) {
        let addr_alias = match self.options.encoding {
            Encoding::Bv => BoogieType::Bv(160),
            _ => BoogieType::Int,
        };
        self.add_decl(Decl::comment(
            "Automatically generated by the sol-to-boogie translator",
        ));
        self.add_decl(Decl::type_alias(ADDRESS_TYPE, Some(addr_alias)));
        let uint256 = self.int_type(256);
        self.add_decl(Decl::var(
            BALANCE,
            BoogieType::map(self.address_type(), uint256.clone()),
        ));
        self.add_decl(Decl::var(NOW, uint256.clone()));
        self.add_decl(Decl::var(BLOCK_NUMBER, uint256));
        // Shadow sum functions usable in annotations; polymorphic over the
        // key type, so emitted verbatim.
        self.add_decl(Decl::Code(format!(
            "function {}<T>([T]int) returns (int);",
            SUM_UINT
        )));
        self.add_decl(Decl::Code(format!(
            "function {}<T>([T]int) returns (int);",
            SUM_INT
        )));
    }

    /// Hand back the finished program together with the diagnostics.
    pub fn finish(self) -> (Program, Reporter) {
        (self.program, self.reporter)
    }

    pub fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_decl(&mut self, decl: Decl) -> bool {
        self.program.add_decl(decl)
    }

    pub fn has_decl(&self, name: &str) -> bool {
        self.program.has_decl(name)
    }

    pub fn error(&mut self, loc: &Loc, message: impl Into<String>) {
        self.reporter.error(loc, message);
    }

    pub fn warning(&mut self, loc: &Loc, message: impl Into<String>) {
        self.reporter.warning(loc, message);
    }

    /// Attributes identifying a check: source position plus message.
    pub fn attrs(&self, loc: &Loc, message: impl Into<String>) -> Vec<Attr> {
        vec![
            Attr::message(message),
            Attr::source_loc(loc.file.clone(), loc.line),
        ]
    }

    pub fn set_current_contract(&mut self, contract: Rc<ContractDefinition>) {
        self.current_contract = Some(contract);
        self.invariants.clear();
    }

    pub fn current_contract(&self) -> &Rc<ContractDefinition> {
        self.current_contract
            .as_ref()
            .expect("BUG: no contract is being translated")
    }

    // ---------- name mangling ----------

    /// Begin an inlined copy of `owner`'s declarations: locals declared
    /// inside get an extra `#<n>` suffix until the matching pop.
    pub fn push_extra_scope(&mut self, owner: NodeId) -> u32 {
        let id = self.fresh_id();
        self.extra_scopes.push((id, owner));
        id
    }

    pub fn pop_extra_scope(&mut self) {
        if self.extra_scopes.pop().is_none() {
            panic!("BUG: extra scope stack underflow");
        }
    }

    /// The Boogie name of a source declaration: `name#<id>`, suffixed once
    /// per active inlining scope that encloses the declaration.
    pub fn mangle(&self, decl: NodeId) -> String {
        let info = self
            .model
            .decl_info(decl)
            .expect("BUG: mangling an unregistered declaration");
        let base = if info.name.is_empty() {
            "$result".to_string()
        } else {
            info.name.clone()
        };
        let mut name = format!("{}#{}", base, decl);
        for (scope_id, owner) in &self.extra_scopes {
            if decl != *owner && self.model.in_scope(decl, *owner) {
                name.push_str(&format!("#{}", scope_id));
            }
        }
        name
    }

    // ---------- types ----------

    pub fn address_type(&self) -> BoogieType {
        BoogieType::named(ADDRESS_TYPE)
    }

    pub fn int_type(&self, bits: u16) -> BoogieType {
        match self.options.encoding {
            Encoding::Bv => BoogieType::Bv(bits as u32),
            _ => BoogieType::Int,
        }
    }

    /// Map a source type to Boogie, creating auxiliary declarations on first
    /// use. Unsupported types report an error and map to the error type.
    pub fn type_of(&mut self, ty: &SolType, loc: &Loc) -> BoogieType {
        match ty {
            SolType::Bool => BoogieType::Bool,
            SolType::Int { bits, .. } => self.int_type(*bits),
            SolType::Address | SolType::Contract { .. } => self.address_type(),
            SolType::FixedBytes(n) => self.int_type(*n as u16 * 8),
            SolType::Enum { .. } => BoogieType::Int,
            // Strings are interned: values are opaque integers.
            SolType::String(_) => BoogieType::Int,
            SolType::IntConst(_) => BoogieType::Int,
            SolType::Mapping { key, value } => {
                let k = self.type_of(key, loc);
                let v = self.type_of(value, loc);
                BoogieType::map(k, v)
            }
            SolType::Array { base, location, .. } => {
                let info = self.array_info(base, *location, loc);
                match info.heap {
                    // Memory arrays are pointers into the heap variable.
                    Some(_) => BoogieType::named(format!("{}_ptr", info.datatype)),
                    None => BoogieType::named(info.datatype),
                }
            }
            SolType::Struct { def, location, .. } => {
                let info = self.struct_info(*def, *location, loc);
                match info.heap {
                    Some(_) => BoogieType::named(format!("{}_ptr", info.datatype)),
                    None => BoogieType::named(info.datatype),
                }
            }
            SolType::Tuple(_) | SolType::RationalConst | SolType::Function => {
                self.error(loc, format!("unsupported type {:?}", ty));
                BoogieType::named(ERROR_TYPE)
            }
        }
    }

    /// The global backing a state variable: a map from contract address to
    /// the variable's value.
    pub fn state_var_type(&mut self, ty: &SolType, loc: &Loc) -> BoogieType {
        let value = self.type_of(ty, loc);
        BoogieType::map(self.address_type(), value)
    }

    /// A stable identifier for a type, usable inside declaration names.
    fn type_key(&mut self, ty: &SolType, loc: &Loc) -> String {
        let printed = self.type_of(ty, loc).to_string();
        printed
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '#' { c } else { '_' })
            .collect()
    }

    /// The `{arr, length}` datatype for arrays over `base`, plus the heap
    /// variable when the array lives in memory. Declarations are created on
    /// first use and deduplicated by name afterwards.
    pub fn array_info(
        &mut self,
        base: &SolType,
        location: DataLocation,
        loc: &Loc,
    ) -> ArrayInfo {
        let key = self.type_key(base, loc);
        let datatype = format!("{}_arr", key);
        let constr = format!("{}#constr", datatype);
        let base_ty = self.type_of(base, loc);
        let index_ty = self.int_type(256);
        self.add_decl(Decl::datatype(
            datatype.clone(),
            constr.clone(),
            vec![
                ("arr".to_string(), BoogieType::map(index_ty.clone(), base_ty)),
                ("length".to_string(), index_ty),
            ],
        ));
        let heap = match location {
            DataLocation::Storage => None,
            DataLocation::Memory | DataLocation::Calldata => {
                let ptr = format!("{}_ptr", datatype);
                let heap = format!("__mem_arr_{}", key);
                self.add_decl(Decl::type_alias(ptr.clone(), Some(BoogieType::Int)));
                self.add_decl(Decl::var(
                    heap.clone(),
                    BoogieType::map(BoogieType::named(ptr), BoogieType::named(&datatype)),
                ));
                Some(heap)
            }
        };
        ArrayInfo {
            datatype,
            constr,
            members: vec!["arr".to_string(), "length".to_string()],
            heap,
        }
    }

    /// The datatype of a struct definition (one constructor, one member per
    /// field), plus the heap variable for memory instances.
    pub fn struct_info(&mut self, def: NodeId, location: DataLocation, loc: &Loc) -> StructInfo {
        let st = self.model.struct_def(def).clone();
        let datatype = format!("{}#{}", st.name, st.id);
        let constr = format!("{}#constr", datatype);
        let fields: Vec<(String, BoogieType)> = st
            .fields
            .iter()
            .map(|f| {
                let fty = self.type_of(&f.ty, loc);
                (self.mangle(f.id), fty)
            })
            .collect();
        let members = fields.iter().map(|(n, _)| n.clone()).collect();
        self.add_decl(Decl::datatype(datatype.clone(), constr.clone(), fields));
        let heap = match location {
            DataLocation::Storage => None,
            DataLocation::Memory | DataLocation::Calldata => {
                let ptr = format!("{}_ptr", datatype);
                let heap = format!("__mem_struct_{}#{}", st.name, st.id);
                self.add_decl(Decl::type_alias(ptr.clone(), Some(BoogieType::Int)));
                self.add_decl(Decl::var(
                    heap.clone(),
                    BoogieType::map(BoogieType::named(ptr), BoogieType::named(&datatype)),
                ));
                Some(heap)
            }
        };
        StructInfo {
            datatype,
            constr,
            members,
            heap,
        }
    }

    // ---------- bit-vector builtins ----------

    /// Declare (once) and name a binary bit-vector builtin, e.g.
    /// `bv256add` backed by SMT `bvadd`.
    pub fn bv_binary(&mut self, short: &str, smt: &str, bits: u16, returns_bool: bool) -> String {
        let name = format!("bv{}{}", bits, short);
        if !self.has_decl(&name) {
            let operand = BoogieType::Bv(bits as u32);
            let ret = if returns_bool {
                BoogieType::Bool
            } else {
                operand.clone()
            };
            self.add_decl(Decl::function(
                name.clone(),
                vec![Attr::new("bvbuiltin", vec![AttrValue::Str(smt.to_string())])],
                vec![(String::new(), operand.clone()), (String::new(), operand)],
                ret,
                None,
            ));
        }
        name
    }

    pub fn bv_unary(&mut self, short: &str, smt: &str, bits: u16) -> String {
        let name = format!("bv{}{}", bits, short);
        if !self.has_decl(&name) {
            let operand = BoogieType::Bv(bits as u32);
            self.add_decl(Decl::function(
                name.clone(),
                vec![Attr::new("bvbuiltin", vec![AttrValue::Str(smt.to_string())])],
                vec![(String::new(), operand.clone())],
                operand,
                None,
            ));
        }
        name
    }

    /// Width-changing builtins for explicit conversions.
    pub fn bv_extend(&mut self, signed: bool, from: u16, to: u16) -> String {
        let (short, smt) = if signed {
            ("signext", "sign_extend")
        } else {
            ("zeroext", "zero_extend")
        };
        let name = format!("bv{}{}{}", from, short, to);
        if !self.has_decl(&name) {
            self.add_decl(Decl::function(
                name.clone(),
                vec![Attr::new(
                    "bvbuiltin",
                    vec![AttrValue::Str(format!("{} {}", smt, to - from))],
                )],
                vec![(String::new(), BoogieType::Bv(from as u32))],
                BoogieType::Bv(to as u32),
                None,
            ));
        }
        name
    }

    pub fn bv_extract(&mut self, from: u16, to: u16) -> String {
        let name = format!("bv{}extract{}", from, to);
        if !self.has_decl(&name) {
            self.add_decl(Decl::function(
                name.clone(),
                vec![Attr::new(
                    "bvbuiltin",
                    vec![AttrValue::Str(format!("(_ extract {} 0)", to - 1))],
                )],
                vec![(String::new(), BoogieType::Bv(from as u32))],
                BoogieType::Bv(to as u32),
                None,
            ));
        }
        name
    }

    // ---------- literal interning ----------

    /// One unique constant per distinct string literal.
    pub fn intern_string(&mut self, value: &str) -> ExprRef {
        if let Some(name) = self.string_lits.get(value) {
            return Expr::id(name.clone());
        }
        let name = format!("__string_lit#{}", self.fresh_id());
        self.add_decl(Decl::constant(name.clone(), BoogieType::Int, true));
        self.string_lits.insert(value.to_string(), name.clone());
        Expr::id(name)
    }

    /// One unique constant per distinct address literal.
    pub fn intern_address(&mut self, value: &BigInt) -> ExprRef {
        if let Some(name) = self.address_lits.get(value) {
            return Expr::id(name.clone());
        }
        let name = format!("__address_lit#{}", self.fresh_id());
        let ty = self.address_type();
        self.add_decl(Decl::constant(name.clone(), ty, true));
        self.address_lits.insert(value.clone(), name.clone());
        Expr::id(name)
    }
}
