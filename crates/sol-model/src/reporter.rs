// Copyright (c) Solidity Prover Contributors
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics accumulator.
//!
//! Translation never aborts on user errors: diagnostics pile up here while
//! the passes degrade the affected constructs. The mark/drain pair supports
//! the two scoping protocols the converters need: per-function error checks
//! (errors stay reported, the function body is replaced) and isolated
//! annotation batches (errors are withdrawn and collapsed into one).

use std::collections::BTreeMap;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::WriteColor;

use crate::model::Loc;

pub struct Reporter {
    files: SimpleFiles<String, String>,
    file_ids: BTreeMap<String, usize>,
    diags: Vec<Diagnostic<usize>>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Reporter {
            files: SimpleFiles::new(),
            file_ids: BTreeMap::new(),
            diags: Vec::new(),
        }
    }

    /// Register source text so later diagnostics for this file get labeled
    /// excerpts. Optional: locations in unregistered files degrade to notes.
    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let id = self.files.add(name.clone(), text.into());
        self.file_ids.insert(name, id);
    }

    pub fn error(&mut self, loc: &Loc, message: impl Into<String>) {
        self.push(Severity::Error, loc, message.into());
    }

    pub fn warning(&mut self, loc: &Loc, message: impl Into<String>) {
        self.push(Severity::Warning, loc, message.into());
    }

    fn push(&mut self, severity: Severity, loc: &Loc, message: String) {
        let mut diag = Diagnostic::new(severity).with_message(message);
        match (self.file_ids.get(&loc.file), loc.span) {
            (Some(&fid), Some(span)) => {
                let range = span.start().to_usize()..span.end().to_usize();
                diag = diag.with_labels(vec![Label::primary(fid, range)]);
            }
            _ if !loc.file.is_empty() => {
                diag = diag.with_notes(vec![loc.to_string()]);
            }
            _ => {}
        }
        self.diags.push(diag);
    }

    /// Current position, for later scoping checks or drains.
    pub fn mark(&self) -> usize {
        self.diags.len()
    }

    /// Withdraw every diagnostic recorded since `mark`.
    pub fn drain_from(&mut self, mark: usize) -> Vec<Diagnostic<usize>> {
        self.diags.split_off(mark)
    }

    pub fn errors_since(&self, mark: usize) -> bool {
        self.diags[mark..].iter().any(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors_since(0)
    }

    pub fn error_count(&self) -> usize {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic<usize>] {
        &self.diags
    }

    /// Render all diagnostics to a terminal writer.
    pub fn emit(&self, writer: &mut dyn WriteColor) -> anyhow::Result<()> {
        let config = term::Config::default();
        for diag in &self.diags {
            term::emit(writer, &config, &self.files, diag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_reporter_is_empty() {
        let r = Reporter::default();
        assert!(!r.has_errors());
        assert_eq!(r.error_count(), 0);
        assert!(r.diagnostics().is_empty());
    }

    #[test]
    fn mark_and_drain_isolate_batches() {
        let mut r = Reporter::new();
        r.warning(&Loc::new("a.sol", 1), "kept");
        let mark = r.mark();
        r.error(&Loc::new("a.sol", 2), "isolated");
        assert!(r.errors_since(mark));
        let batch = r.drain_from(mark);
        assert_eq!(batch.len(), 1);
        assert!(!r.has_errors());
        assert_eq!(r.diagnostics().len(), 1);
    }

    #[test]
    fn unregistered_file_degrades_to_note() {
        let mut r = Reporter::new();
        r.error(&Loc::new("missing.sol", 7), "boom");
        assert_eq!(r.error_count(), 1);
        assert_eq!(r.diagnostics()[0].notes, vec!["missing.sol:7".to_string()]);
    }
}
