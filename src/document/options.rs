//! Options for reading and writing flow documents.

/// Controls how a document is read and written.
///
/// The defaults keep everything the reader sees and write it back
/// unchanged, which is what a lossless round trip needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Re-indent output with this many spaces. Whitespace-only text nodes
    /// are dropped on write when set, since the writer supplies its own.
    pub indent: Option<usize>,
    /// Keep whitespace-only text nodes when reading.
    pub keep_whitespace: bool,
    /// Keep comments when reading.
    pub keep_comments: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            indent: None,
            keep_whitespace: true,
            keep_comments: true,
        }
    }
}

impl XmlOptions {
    /// Options that drop incidental whitespace and pretty-print with `indent` spaces.
    pub fn pretty(indent: usize) -> Self {
        Self {
            indent: Some(indent),
            keep_whitespace: false,
            keep_comments: true,
        }
    }
}
