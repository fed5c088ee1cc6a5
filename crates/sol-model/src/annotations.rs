// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Documentation-tag annotations and the re-parsing seam.
//!
//! Specifications are written in doc comments (`/// @notice invariant ...`).
//! The front end hands the tags over verbatim; the translation passes send
//! the expression text back through [`AnnotationParser`] to get a resolved,
//! typed expression in the annotated node's scope.

use once_cell::sync::Lazy;

use crate::ast::SolExpression;
use crate::model::{Loc, NodeId, SourceModel};

/// A raw documentation tag, e.g. `("notice", "invariant x == sum(balances)")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub tag: String,
    pub content: String,
    pub loc: Loc,
}

impl DocTag {
    pub fn notice(content: impl Into<String>, loc: Loc) -> Self {
        DocTag {
            tag: "notice".to_string(),
            content: content.into(),
            loc,
        }
    }

    /// Classify a tag by its content prefix, returning the payload text.
    /// Unrecognized tags are plain documentation and are ignored.
    pub fn classify(&self) -> Option<(DocTagKind, &str)> {
        if self.tag != "notice" {
            return None;
        }
        for (prefix, kind) in TAGS.iter() {
            if let Some(rest) = self.content.strip_prefix(prefix) {
                return Some((*kind, rest.trim()));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTagKind {
    /// Contract invariant or loop invariant, depending on the annotated node.
    Invariant,
    Precondition,
    Postcondition,
    Modifies,
    /// Opt a non-public function into the contract invariants.
    ContractInvariantsInclude,
}

static TAGS: Lazy<Vec<(&'static str, DocTagKind)>> = Lazy::new(|| {
    vec![
        // Longest prefixes first so `invariant` never shadows the others.
        (
            "contract_invariants_include",
            DocTagKind::ContractInvariantsInclude,
        ),
        ("precondition", DocTagKind::Precondition),
        ("postcondition", DocTagKind::Postcondition),
        ("invariant", DocTagKind::Invariant),
        ("modifies", DocTagKind::Modifies),
    ]
});

/// Name/type resolution service for annotation snippets. Implemented by the
/// front end; the translation passes never parse text themselves. `scope` is
/// the annotated declaration, in which identifiers of the snippet resolve.
pub trait AnnotationParser {
    fn parse_expression(
        &self,
        text: &str,
        scope: NodeId,
        model: &SourceModel,
    ) -> anyhow::Result<SolExpression>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_prefix() {
        let t = |c: &str| DocTag::notice(c, Loc::default());
        assert_eq!(
            t("invariant x > 0").classify(),
            Some((DocTagKind::Invariant, "x > 0"))
        );
        assert_eq!(
            t("modifies x[msg.sender] if c").classify(),
            Some((DocTagKind::Modifies, "x[msg.sender] if c"))
        );
        assert_eq!(
            t("contract_invariants_include").classify(),
            Some((DocTagKind::ContractInvariantsInclude, ""))
        );
        assert_eq!(t("just prose").classify(), None);
        let other = DocTag {
            tag: "param".to_string(),
            content: "invariant-like".to_string(),
            loc: Loc::default(),
        };
        assert_eq!(other.classify(), None);
    }
}
