//! The five-level diagnostic system and the per-file badness counter.
//!
//! Diagnostics raised during analysis are data, not control flow: every
//! non-fatal diagnostic is pushed into a [`DiagnosticSink`] and analysis
//! continues so that one run surfaces as many findings as possible. Only a
//! `fatal` diagnostic, or the badness counter crossing the configured
//! threshold at end of file, turns into a [`crate::error::RattrError`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Severity of one diagnostic.
///
/// `Rattr` is reserved for meta-diagnostics about the analyser itself (a
/// plugin misbehaving, a cache record that can't be parsed) rather than
/// about the program under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Rattr,
    Fatal,
}

impl Severity {
    /// Whether this severity increments the badness counter.
    ///
    /// `Info` is purely informational; everything from `Warning` up counts
    /// against the threshold, `Fatal` included (a fatal diagnostic always
    /// exceeds any threshold since it also short-circuits the run).
    pub fn badness(self) -> u32 {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 1,
            Severity::Rattr => 1,
            Severity::Fatal => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Rattr => "rattr",
            Severity::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

/// One diagnostic record: a severity, a message, and the file/location it
/// was raised against (location is optional -- some diagnostics, like "too
/// many positional arguments", are about a call site with no single AST
/// token to blame if the culprit wasn't passed through).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}: {}", loc, self.severity, self.message),
            None => write!(f, "{}: {}: {}", self.file.display(), self.severity, self.message),
        }
    }
}

/// Accumulates diagnostics for one run and tracks badness against a
/// configured threshold.
///
/// A threshold of `0` is "strict" mode: any non-info diagnostic fails the
/// run. `permissive(n)` allows up to `n` points of badness before the file
/// is considered to have failed (spec's `--strict` / `--permissive N`).
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    badness: u32,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    /// Record a diagnostic. Returns `true` if this diagnostic was fatal, so
    /// the caller can unwind immediately without consulting the threshold.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let is_fatal = diagnostic.severity == Severity::Fatal;
        self.badness += diagnostic.severity.badness();
        self.diagnostics.push(diagnostic);
        is_fatal
    }

    pub fn badness(&self) -> u32 {
        self.badness
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_within_threshold(&self, threshold: u32) -> bool {
        self.badness <= threshold
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(severity: Severity) -> Diagnostic {
        Diagnostic {
            severity,
            message: "test".into(),
            file: "m.py".into(),
            location: None,
        }
    }

    #[test]
    fn info_does_not_increase_badness() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(Severity::Info));
        assert_eq!(sink.badness(), 0);
    }

    #[test]
    fn warning_and_error_each_add_one() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(Severity::Warning));
        sink.push(diag(Severity::Error));
        assert_eq!(sink.badness(), 2);
    }

    #[test]
    fn push_reports_fatal() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.push(diag(Severity::Warning)));
        assert!(sink.push(diag(Severity::Fatal)));
        assert!(sink.has_fatal());
    }

    #[test]
    fn threshold_strict_mode_fails_on_any_badness() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(Severity::Warning));
        assert!(!sink.is_within_threshold(0));
        assert!(sink.is_within_threshold(1));
    }

    #[test]
    fn display_with_location_includes_position() {
        let mut d = diag(Severity::Warning);
        d.location = Some(Location::new(3, 1, "m.py"));
        assert_eq!(d.to_string(), "m.py:3:1: warning: test");
    }
}
