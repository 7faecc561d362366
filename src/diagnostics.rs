//! Structured diagnostics: a primary message and site plus ordered notes,
//! accumulated into an [`ErrorLog`] and rendered in source order.
use std::fmt;

use crate::source_map::SourceRange;

/// A single note attached to a [`Diagnostic`], e.g. "first defined here".
#[derive(Debug, Clone)]
pub struct Note {
    pub message: String,
    pub range: SourceRange,
}

/// One diagnostic: a primary message/site plus an ordered list of notes.
///
/// Two diagnostics compare equal iff their messages and all ranges
/// (primary and notes, in order) match; this lets validation passes dedupe
/// identical findings without caring which pass produced them.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub primary: SourceRange,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, primary: SourceRange) -> Self {
        Diagnostic {
            message: message.into(),
            primary,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, range: SourceRange) -> Self {
        self.notes.push(Note {
            message: message.into(),
            range,
        });
        self
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.primary == other.primary
            && self.notes.len() == other.notes.len()
            && self
                .notes
                .iter()
                .zip(other.notes.iter())
                .all(|(a, b)| a.message == b.message && a.range == b.range)
    }
}
impl Eq for Diagnostic {}

fn format_range_suffix(range: &SourceRange) -> String {
    let (start_line, start_col) = range.start_position().line_column();
    if range.start == range.end {
        return format!("{}.{}", start_line, start_col);
    }
    let (end_line, end_col) = {
        // end is exclusive; report the last included column/line.
        let last = range.end.saturating_sub(1).max(range.start);
        range.file.line_column(last)
    };
    if end_line == start_line {
        format!("{}.{}-{}", start_line, start_col, end_col)
    } else {
        format!("{}.{}-{}:{}", start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{}: error: {}",
            self.primary.file.url(),
            format_range_suffix(&self.primary),
            self.message
        )?;
        for (i, note) in self.notes.iter().enumerate() {
            writeln!(
                f,
                "{}:{}: note({}): {}",
                note.range.file.url(),
                format_range_suffix(&note.range),
                i + 1,
                note.message
            )?;
        }
        Ok(())
    }
}

/// An ordered set of [`Diagnostic`]s accumulated during a validation pass.
///
/// Diagnostics are collected unordered within a pass and only sorted when
/// rendered, by their primary range's start position; within the same
/// position, insertion order is preserved (a stable sort).
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorLog {
    pub fn new() -> Self {
        ErrorLog::default()
    }

    /// Appends `diagnostic` unless an equal one is already present.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn extend(&mut self, other: ErrorLog) {
        for d in other.diagnostics {
            self.push(d);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Diagnostics sorted by primary range start position, stable on ties.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut v: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        v.sort_by(|a, b| {
            debug_assert_eq!(a.primary.file, b.primary.file, "diagnostics span one file per report");
            a.primary.start.cmp(&b.primary.start)
        });
        v
    }

    /// Renders every diagnostic, sorted, one after another.
    pub fn report(&self) -> String {
        self.sorted()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Keeps only the first `max` diagnostics in report order (sorted by
    /// primary range start), dropping the rest. A no-op if already within
    /// `max`.
    pub fn truncate_sorted(&mut self, max: usize) {
        if self.diagnostics.len() > max {
            let mut sorted: Vec<Diagnostic> = self.sorted().into_iter().cloned().collect();
            sorted.truncate(max);
            self.diagnostics = sorted;
        }
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_map::SourceFile;

    fn range(file: &SourceFile, start: usize, end: usize) -> SourceRange {
        SourceRange::new(file.clone(), start, end)
    }

    #[test]
    fn dedupes_equal_diagnostics() {
        let f = SourceFile::new("mem://a", "abcdef", 1);
        let mut log = ErrorLog::new();
        log.push(Diagnostic::new("boom", range(&f, 0, 1)));
        log.push(Diagnostic::new("boom", range(&f, 0, 1)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn sorts_by_primary_start() {
        let f = SourceFile::new("mem://a", "abcdef", 1);
        let mut log = ErrorLog::new();
        log.push(Diagnostic::new("second", range(&f, 3, 4)));
        log.push(Diagnostic::new("first", range(&f, 0, 1)));
        let sorted = log.sorted();
        assert_eq!(sorted[0].message, "first");
        assert_eq!(sorted[1].message, "second");
    }

    #[test]
    fn truncate_sorted_keeps_earliest_diagnostics() {
        let f = SourceFile::new("mem://a", "abcdef", 1);
        let mut log = ErrorLog::new();
        log.push(Diagnostic::new("c", range(&f, 4, 5)));
        log.push(Diagnostic::new("a", range(&f, 0, 1)));
        log.push(Diagnostic::new("b", range(&f, 2, 3)));
        log.truncate_sorted(2);
        assert_eq!(log.len(), 2);
        let msgs: Vec<_> = log.sorted().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, vec!["a", "b"]);
    }

    #[test]
    fn renders_expected_format() {
        let f = SourceFile::new("mem://a.ebnf", "x ::= y\n", 1);
        let mut log = ErrorLog::new();
        log.push(
            Diagnostic::new("undefined symbol `y`", range(&f, 5, 6))
                .with_note("referenced here", range(&f, 5, 6)),
        );
        let report = log.report();
        assert!(report.starts_with("mem://a.ebnf:1.6: error: undefined symbol `y`\n"));
        assert!(report.contains("mem://a.ebnf:1.6: note(1): referenced here\n"));
    }
}
