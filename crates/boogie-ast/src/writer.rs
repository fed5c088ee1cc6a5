// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Textual printer.
//!
//! Printing is deterministic: same program, same text. Expressions are fully
//! parenthesized so no reader ever has to know Boogie's precedence table.

use std::fmt;

use itertools::Itertools;

use crate::decls::{Decl, ProcDecl, Specification};
use crate::exprs::{Attr, AttrValue, Expr, QuantKind};
use crate::program::Program;
use crate::stmts::{Block, Stmt};
use crate::types::BoogieType;

impl fmt::Display for BoogieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoogieType::Int => write!(f, "int"),
            BoogieType::Bool => write!(f, "bool"),
            BoogieType::Bv(bits) => write!(f, "bv{}", bits),
            BoogieType::Named(name) => write!(f, "{}", name),
            BoogieType::Map { key, value } => write!(f, "[{}]{}", key, value),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "\"{}\"", s),
            AttrValue::Num(n) => write!(f, "{}", n),
            AttrValue::Expr(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{:{}", self.name)?;
        if !self.values.is_empty() {
            write!(f, " {}", self.values.iter().format(", "))?;
        }
        write!(f, "}}")
    }
}

fn write_attrs(f: &mut fmt::Formatter<'_>, attrs: &[Attr]) -> fmt::Result {
    for attr in attrs {
        write!(f, "{} ", attr)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Error => write!(f, "__ERROR"),
            Expr::Id(name) => write!(f, "{}", name),
            Expr::IntLit(v) => write!(f, "{}", v),
            Expr::BvLit { value, bits } => write!(f, "{}bv{}", value, bits),
            Expr::BoolLit(b) => write!(f, "{}", b),
            Expr::StringLit(s) => write!(f, "\"{}\"", s),
            Expr::BinOp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::UnOp { op, sub } => write!(f, "{}({})", op.symbol(), sub),
            Expr::FunCall { fun, args } => {
                write!(f, "{}({})", fun, args.iter().format(", "))
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "(if {} then {} else {})", cond, then_expr, else_expr),
            Expr::ArrSel { base, index } => write!(f, "{}[{}]", base, index),
            Expr::ArrUpd { base, index, value } => {
                write!(f, "{}[{} := {}]", base, index, value)
            }
            Expr::DtSel {
                base,
                member,
                constr,
                ..
            } => write!(f, "{}#{}({})", member, constr, base),
            Expr::DtUpd {
                base,
                member,
                value,
                constr,
                members,
            } => {
                write!(f, "{}(", constr)?;
                let mut first = true;
                for m in members {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    if m == member {
                        write!(f, "{}", value)?;
                    } else {
                        write!(f, "{}#{}({})", m, constr, base)?;
                    }
                }
                write!(f, ")")
            }
            Expr::Quant { kind, vars, body } => {
                let kw = match kind {
                    QuantKind::Forall => "forall",
                    QuantKind::Exists => "exists",
                };
                write!(
                    f,
                    "({} {} :: {})",
                    kw,
                    vars.iter().format_with(", ", |(n, t), g| g(&format_args!(
                        "{}: {}",
                        n, t
                    ))),
                    body
                )
            }
            Expr::Old(sub) => write!(f, "old({})", sub),
            Expr::Tuple(elems) => write!(f, "{}", elems.iter().format(", ")),
        }
    }
}

fn indent(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        write!(f, "\t")?;
    }
    Ok(())
}

fn write_spec(
    f: &mut fmt::Formatter<'_>,
    kind: &str,
    spec: &Specification,
    level: usize,
) -> fmt::Result {
    indent(f, level)?;
    write!(f, "{} ", kind)?;
    write_attrs(f, &spec.attrs)?;
    writeln!(f, "{};", spec.expr)
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, level: usize) -> fmt::Result {
    for stmt in &block.stmts {
        write_stmt(f, stmt, level)?;
    }
    Ok(())
}

fn write_if(
    f: &mut fmt::Formatter<'_>,
    cond: &Expr,
    then_block: &Block,
    else_block: &Option<Block>,
    level: usize,
) -> fmt::Result {
    writeln!(f, "if ({}) {{", cond)?;
    write_block(f, then_block, level + 1)?;
    indent(f, level)?;
    write!(f, "}}")?;
    if let Some(els) = else_block {
        // Collapse a lone nested if into an `else if` chain.
        if let [Stmt::IfElse {
            cond,
            then_block,
            else_block,
        }] = els.stmts.as_slice()
        {
            write!(f, " else ")?;
            return write_if(f, cond, then_block, else_block, level);
        }
        writeln!(f, " else {{")?;
        write_block(f, els, level + 1)?;
        indent(f, level)?;
        write!(f, "}}")?;
    }
    writeln!(f)
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, level: usize) -> fmt::Result {
    match stmt {
        Stmt::Label(name) => {
            indent(f, level)?;
            return writeln!(f, "{}:", name);
        }
        _ => indent(f, level)?,
    }
    match stmt {
        Stmt::Assert { expr, attrs } => {
            write!(f, "assert ")?;
            write_attrs(f, attrs)?;
            writeln!(f, "{};", expr)
        }
        Stmt::Assume { expr } => writeln!(f, "assume {};", expr),
        Stmt::Assign { lhs, rhs } => writeln!(
            f,
            "{} := {};",
            lhs.iter().format(", "),
            rhs.iter().format(", ")
        ),
        Stmt::Havoc { vars } => writeln!(f, "havoc {};", vars.iter().format(", ")),
        Stmt::Goto { targets } => writeln!(f, "goto {};", targets.iter().format(", ")),
        Stmt::Call {
            proc,
            args,
            returns,
        } => {
            write!(f, "call ")?;
            if !returns.is_empty() {
                write!(f, "{} := ", returns.iter().format(", "))?;
            }
            writeln!(f, "{}({});", proc, args.iter().format(", "))
        }
        Stmt::Comment(text) => writeln!(f, "// {}", text),
        Stmt::IfElse {
            cond,
            then_block,
            else_block,
        } => write_if(f, cond, then_block, else_block, level),
        Stmt::While {
            cond,
            invariants,
            body,
        } => {
            writeln!(f, "while ({})", cond)?;
            for inv in invariants {
                write_spec(f, "invariant", inv, level + 1)?;
            }
            indent(f, level)?;
            writeln!(f, "{{")?;
            write_block(f, body, level + 1)?;
            indent(f, level)?;
            writeln!(f, "}}")
        }
        Stmt::Break => writeln!(f, "break;"),
        Stmt::Label(_) => unreachable!(),
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[(String, BoogieType)]) -> fmt::Result {
    write!(
        f,
        "{}",
        params.iter().format_with(", ", |(n, t), g| {
            if n.is_empty() {
                g(&format_args!("{}", t))
            } else {
                g(&format_args!("{}: {}", n, t))
            }
        })
    )
}

fn write_proc(f: &mut fmt::Formatter<'_>, proc: &ProcDecl) -> fmt::Result {
    write!(f, "procedure ")?;
    write_attrs(f, &proc.attrs)?;
    write!(f, "{}(", proc.name)?;
    write_params(f, &proc.params)?;
    write!(f, ")")?;
    if !proc.returns.is_empty() {
        writeln!(f)?;
        indent(f, 1)?;
        write!(f, "returns (")?;
        write_params(f, &proc.returns)?;
        write!(f, ")")?;
    }
    if proc.body.is_none() {
        write!(f, ";")?;
    }
    writeln!(f)?;
    for spec in &proc.requires {
        write_spec(f, "requires", spec, 1)?;
    }
    for spec in &proc.ensures {
        write_spec(f, "ensures", spec, 1)?;
    }
    if !proc.modifies.is_empty() {
        indent(f, 1)?;
        writeln!(f, "modifies {};", proc.modifies.iter().format(", "))?;
    }
    if let Some(body) = &proc.body {
        writeln!(f, "{{")?;
        for (name, ty) in &proc.locals {
            indent(f, 1)?;
            writeln!(f, "var {}: {};", name, ty)?;
        }
        write_block(f, body, 1)?;
        writeln!(f, "}}")?;
    }
    Ok(())
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Comment(text) => writeln!(f, "// {}", text),
            Decl::TypeAlias { name, alias } => match alias {
                Some(ty) => writeln!(f, "type {} = {};", name, ty),
                None => writeln!(f, "type {};", name),
            },
            Decl::DataType {
                name,
                constr,
                members,
            } => {
                writeln!(f, "type {{:datatype}} {};", name)?;
                write!(f, "function {{:constructor}} {}(", constr)?;
                write_params(f, members)?;
                writeln!(f, ") returns ({});", name)
            }
            Decl::Axiom(expr) => writeln!(f, "axiom {};", expr),
            Decl::Const { name, ty, unique } => {
                let uq = if *unique { "unique " } else { "" };
                writeln!(f, "const {}{}: {};", uq, name, ty)
            }
            Decl::Var { name, ty } => writeln!(f, "var {}: {};", name, ty),
            Decl::Func {
                name,
                attrs,
                params,
                returns,
                body,
            } => {
                write!(f, "function ")?;
                write_attrs(f, attrs)?;
                write!(f, "{}(", name)?;
                write_params(f, params)?;
                write!(f, ") returns ({})", returns)?;
                match body {
                    Some(b) => writeln!(f, " {{ {} }}", b),
                    None => writeln!(f, ";"),
                }
            }
            Decl::Proc(proc) => write_proc(f, proc),
            Decl::Code(text) => writeln!(f, "{}", text),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in self.decls() {
            write!(f, "{}", decl)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::decls::{Decl, ProcDecl, Specification};
    use crate::exprs::{Attr, BinOp, Expr};
    use crate::stmts::{Block, Stmt};
    use crate::types::BoogieType;

    #[test]
    fn expressions_print_fully_parenthesized() {
        let e = Expr::bin_op(
            BinOp::Add,
            Expr::id("x"),
            Expr::bin_op(BinOp::Mul, Expr::int_lit(2), Expr::id("y")),
        );
        assert_eq!(e.to_string(), "(x + (2 * y))");
        assert_eq!(Expr::not(Expr::id("b")).to_string(), "!(b)");
        assert_eq!(Expr::bv_lit(255, 8).to_string(), "255bv8");
        assert_eq!(
            Expr::cond(Expr::id("c"), Expr::int_lit(1), Expr::int_lit(0)).to_string(),
            "(if c then 1 else 0)"
        );
        assert_eq!(Expr::old(Expr::id("x")).to_string(), "old(x)");
    }

    #[test]
    fn select_and_update_print() {
        let sel = Expr::arr_sel(Expr::id("bal"), Expr::id("__this"));
        assert_eq!(sel.to_string(), "bal[__this]");
        let upd = Expr::arr_upd(Expr::id("bal"), Expr::id("__this"), Expr::int_lit(0));
        assert_eq!(upd.to_string(), "bal[__this := 0]");
    }

    #[test]
    fn datatype_select_and_update_print() {
        let members = vec!["x".to_string(), "y".to_string()];
        let sel = Expr::dt_sel(Expr::id("p"), "x", "Pair#7#constr", members.clone());
        assert_eq!(sel.to_string(), "x#Pair#7#constr(p)");
        let upd = Expr::dt_upd(Expr::id("p"), "y", Expr::int_lit(3), "Pair#7#constr", members);
        assert_eq!(
            upd.to_string(),
            "Pair#7#constr(x#Pair#7#constr(p), 3)"
        );
    }

    #[test]
    fn quantifier_prints() {
        let q = Expr::forall(
            vec![("i#1".to_string(), BoogieType::Int)],
            Expr::gte(Expr::arr_sel(Expr::id("a"), Expr::id("i#1")), Expr::int_lit(0)),
        );
        assert_eq!(q.to_string(), "(forall i#1: int :: (a[i#1] >= 0))");
    }

    #[test]
    fn while_with_invariants_prints() {
        let w = Stmt::While {
            cond: Expr::bin_op(BinOp::Lt, Expr::id("i"), Expr::id("n")),
            invariants: vec![Specification::new(
                Expr::gte(Expr::id("i"), Expr::int_lit(0)),
                vec![Attr::message("loop bound")],
            )],
            body: Block::from(vec![Stmt::assign(
                Expr::id("i"),
                Expr::bin_op(BinOp::Add, Expr::id("i"), Expr::int_lit(1)),
            )]),
        };
        let d = Decl::Proc(ProcDecl {
            body: Some(Block::from(vec![w])),
            ..ProcDecl::new("loop#1")
        });
        assert_eq!(
            d.to_string(),
            "procedure loop#1()\n\
             {\n\
             \twhile ((i < n))\n\
             \t\tinvariant {:message \"loop bound\"} (i >= 0);\n\
             \t{\n\
             \t\ti := (i + 1);\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn else_if_chain_collapses() {
        let inner = Stmt::IfElse {
            cond: Expr::id("b"),
            then_block: Block::from(vec![Stmt::Break]),
            else_block: None,
        };
        let outer = Stmt::IfElse {
            cond: Expr::id("a"),
            then_block: Block::new(),
            else_block: Some(Block::from(vec![inner])),
        };
        let d = Decl::Proc(ProcDecl {
            body: Some(Block::from(vec![outer])),
            ..ProcDecl::new("p")
        });
        assert!(d.to_string().contains("} else if (b) {"));
    }

    #[test]
    fn procedure_header_and_specs_print() {
        let mut p = ProcDecl::new("withdraw#12");
        p.params = vec![
            ("__this".to_string(), BoogieType::named("address_t")),
            ("amount#3".to_string(), BoogieType::Int),
        ];
        p.returns = vec![("ok#4".to_string(), BoogieType::Bool)];
        p.requires = vec![Specification::new(
            Expr::gte(Expr::id("amount#3"), Expr::int_lit(0)),
            vec![Attr::source_loc("a.sol", 4)],
        )];
        p.modifies = vec!["bal#1".to_string()];
        let text = Decl::Proc(p).to_string();
        assert_eq!(
            text,
            "procedure withdraw#12(__this: address_t, amount#3: int)\n\
             \treturns (ok#4: bool);\n\
             \trequires {:sourceloc \"a.sol\", 4} (amount#3 >= 0);\n\
             \tmodifies bal#1;\n"
        );
    }

    #[test]
    fn datatype_decl_prints_constructor_encoding() {
        let d = Decl::datatype(
            "Pair#7",
            "Pair#7#constr",
            vec![
                ("x".to_string(), BoogieType::Int),
                ("y".to_string(), BoogieType::Int),
            ],
        );
        assert_eq!(
            d.to_string(),
            "type {:datatype} Pair#7;\n\
             function {:constructor} Pair#7#constr(x: int, y: int) returns (Pair#7);\n"
        );
    }

    #[test]
    fn bv_builtin_function_prints() {
        let d = Decl::function(
            "bv256add",
            vec![Attr::new(
                "bvbuiltin",
                vec![crate::exprs::AttrValue::Str("bvadd".to_string())],
            )],
            vec![
                ("".to_string(), BoogieType::Bv(256)),
                ("".to_string(), BoogieType::Bv(256)),
            ],
            BoogieType::Bv(256),
            None,
        );
        assert_eq!(
            d.to_string(),
            "function {:bvbuiltin \"bvadd\"} bv256add(bv256, bv256) returns (bv256);\n"
        );
    }
}
