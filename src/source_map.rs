//! Files, positions and half-open ranges over source text, with O(log N)
//! line/column resolution.
use std::cmp::Ordering;
use std::rc::Rc;

/// An immutable source file: a URL, its text, and the precomputed line-start
/// table used to resolve 1-based (line, column) pairs.
///
/// Two [`SourceFile`]s compare equal iff their `url`s match; the text is not
/// considered (a file is identified by where it came from, not re-hashed on
/// every comparison).
#[derive(Debug, Clone)]
pub struct SourceFile {
    url: Rc<str>,
    text: Rc<str>,
    /// Byte index of the first character of each line. Always starts with 0.
    line_starts: Rc<[usize]>,
    /// 1-based line number of `line_starts[0]`, for fragments embedded in a
    /// larger document (e.g. a grammar block extracted from markdown).
    start_line: usize,
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}
impl Eq for SourceFile {}
impl std::hash::Hash for SourceFile {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl SourceFile {
    /// Builds a source file from `text` known by `url`, as if it began at
    /// `start_line` (1-based). Embedded fragments (e.g. a grammar code block
    /// pulled out of a larger document) pass the line their first character
    /// occupies in the host document; everything else passes `1`.
    pub fn new(url: impl Into<Rc<str>>, text: impl Into<Rc<str>>, start_line: usize) -> Self {
        let text = text.into();
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceFile {
            url: url.into(),
            text,
            line_starts: line_starts.into(),
            start_line,
        }
    }

    /// The sentinel file used for synthesized AST nodes that have no real
    /// source location (e.g. `Quantified` expansions the lowering invents).
    pub fn none() -> Self {
        SourceFile {
            url: Rc::from("<none>"),
            text: Rc::from(""),
            line_starts: Rc::from([0usize].as_slice()),
            start_line: 1,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_none(&self) -> bool {
        self.url.as_ref() == "<none>"
    }

    /// Converts a byte index into this file's text to a 1-based (line, column).
    ///
    /// Binary-searches the line-start table, so this is O(log N) in the
    /// number of lines rather than a linear rescan.
    pub fn line_column(&self, index: usize) -> (usize, usize) {
        let line0 = match self.line_starts.binary_search(&index) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = index - self.line_starts[line0] + 1;
        (line0 + self.start_line, column)
    }

    /// Converts a 1-based (line, column) back to a byte index into this
    /// file's text. Inverse of [`SourceFile::line_column`].
    pub fn index(&self, line: usize, column: usize) -> usize {
        let line0 = line - self.start_line;
        self.line_starts[line0] + column - 1
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A single position within one [`SourceFile`]: a byte index into its text.
///
/// Ordering and equality are only meaningful when comparing positions within
/// the same file; comparing across files is a contract violation (debug
/// builds assert it).
#[derive(Debug, Clone)]
pub struct SourcePosition {
    pub file: SourceFile,
    pub index: usize,
}

impl SourcePosition {
    pub fn new(file: SourceFile, index: usize) -> Self {
        SourcePosition { file, index }
    }

    pub fn none() -> Self {
        SourcePosition {
            file: SourceFile::none(),
            index: 0,
        }
    }

    pub fn line_column(&self) -> (usize, usize) {
        self.file.line_column(self.index)
    }
}

impl PartialEq for SourcePosition {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.index == other.index
    }
}
impl Eq for SourcePosition {}

impl PartialOrd for SourcePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.file != other.file {
            return None;
        }
        Some(self.index.cmp(&other.index))
    }
}

/// A half-open `[start, end)` range of positions within a single file.
#[derive(Debug, Clone)]
pub struct SourceRange {
    pub file: SourceFile,
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(file: SourceFile, start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        SourceRange { file, start, end }
    }

    /// The sentinel "none" range for synthesized AST nodes (e.g. the fresh
    /// nonterminals a `Quantified` expansion introduces during lowering).
    pub fn none() -> Self {
        SourceRange {
            file: SourceFile::none(),
            start: 0,
            end: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.file.is_none()
    }

    pub fn start_position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.start)
    }

    pub fn end_position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.end)
    }

    pub fn text(&self) -> &str {
        &self.file.text()[self.start..self.end]
    }

    pub fn contains(&self, other: &SourceRange) -> bool {
        self.file == other.file && self.start <= other.start && other.end <= self.end
    }

    /// Returns a new range spanning from `self.start` to `other.end`. Both
    /// ranges must be in the same file.
    pub fn extend(&self, other: &SourceRange) -> SourceRange {
        debug_assert_eq!(self.file, other.file, "cannot extend across files");
        SourceRange::new(self.file.clone(), self.start, other.end.max(self.end))
    }

    /// The smallest range containing both `self` and `other`. Both ranges
    /// must be in the same file.
    pub fn union(&self, other: &SourceRange) -> SourceRange {
        debug_assert_eq!(self.file, other.file, "cannot union across files");
        SourceRange::new(
            self.file.clone(),
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }
}

impl PartialEq for SourceRange {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.start == other.start && self.end == other.end
    }
}
impl Eq for SourceRange {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_round_trips() {
        let f = SourceFile::new("mem://a", "abc\ndef\nghi", 1);
        assert_eq!(f.line_column(0), (1, 1));
        assert_eq!(f.line_column(4), (2, 1));
        assert_eq!(f.line_column(9), (3, 2));
        assert_eq!(f.index(2, 1), 4);
        assert_eq!(f.index(3, 2), 9);
    }

    #[test]
    fn start_line_offsets_embedded_fragments() {
        let f = SourceFile::new("mem://doc.md", "a\nb", 10);
        assert_eq!(f.line_column(0), (10, 1));
        assert_eq!(f.line_column(2), (11, 1));
    }

    #[test]
    fn files_compare_by_url_only() {
        let a = SourceFile::new("mem://a", "same", 1);
        let b = SourceFile::new("mem://a", "different", 1);
        assert_eq!(a, b);
        let c = SourceFile::new("mem://c", "same", 1);
        assert_ne!(a, c);
    }

    #[test]
    fn range_contains_and_union() {
        let f = SourceFile::new("mem://a", "0123456789", 1);
        let outer = SourceRange::new(f.clone(), 0, 10);
        let inner = SourceRange::new(f.clone(), 2, 5);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        let a = SourceRange::new(f.clone(), 0, 3);
        let b = SourceRange::new(f.clone(), 6, 9);
        let u = a.union(&b);
        assert_eq!((u.start, u.end), (0, 9));
    }

    #[test]
    fn none_range_is_recognizable() {
        assert!(SourceRange::none().is_none());
        assert!(!SourceRange::new(SourceFile::new("mem://a", "x", 1), 0, 1).is_none());
    }
}
