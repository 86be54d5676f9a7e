/// Tree-sitter based front end.
///
/// Extractors parse source files with tree-sitter and lower the result into
/// the language-neutral [`crate::syntax`] tree.
mod go_extractor;

pub use go_extractor::GoExtractor;

use crate::errors::Result;
use crate::syntax::SourceFile;

/// Trait for language-specific front ends.
pub trait LanguageExtractor: Send + Sync {
    /// File extensions this extractor handles (without leading dot).
    fn extensions(&self) -> &[&str];

    /// Human-readable language name.
    fn language_name(&self) -> &str;

    /// Parses `source` and lowers it into a [`SourceFile`].
    ///
    /// `file_path` names the unit; `base` is the global offset assigned to the
    /// file's first byte by the [`crate::syntax::SourceMap`]. A source that
    /// does not parse cleanly is an error: the unit contributes nothing.
    fn extract(&self, file_path: &str, source: &str, base: usize) -> Result<SourceFile>;

    /// Whether this extractor handles the given path, judged by extension.
    fn handles(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| self.extensions().contains(&ext))
            .unwrap_or(false)
    }
}
