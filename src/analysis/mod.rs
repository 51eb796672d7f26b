//! Source analysis.
//!
//! - [`scanner`] classifies text offsets as code, comment or string
//! - [`source`] resolves class names and finds capability usages

pub mod scanner;
pub mod source;

pub use scanner::{CodeMatches, CodePattern, LexicalScanner, ScanState};
pub use source::{Import, SourceAnalyzer, SourceFile, SourceUsage};
