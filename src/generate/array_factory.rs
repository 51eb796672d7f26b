//! Array-factory dispatch stub.
//!
//! Lists the concrete element types a module creates arrays of reflectively,
//! so ahead-of-time targets can emit a factory for each.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::generate::{Artifact, GenerateError, Transaction, GENERATED_HEADER};

pub const ARRAY_FACTORY_FILE: &str = "array-factory.txt";

/// Sorted, deduplicated element types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayFactory {
    types: BTreeSet<String>,
}

impl ArrayFactory {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArrayFactory {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn types(&self) -> &BTreeSet<String> {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// One `type = type[]::new` line per element type.
    pub fn render(&self) -> String {
        let mut out = format!("{GENERATED_HEADER}\n");
        for ty in &self.types {
            out.push_str(&format!("{ty} = {ty}[]::new\n"));
        }
        out
    }
}

/// The array-factory file of one module; deleted when empty.
#[derive(Debug, Clone)]
pub struct ArrayFactoryArtifact {
    pub path: PathBuf,
    pub factory: ArrayFactory,
}

impl Artifact for ArrayFactoryArtifact {
    fn name(&self) -> &'static str {
        "array factory"
    }

    fn plan(&self, tx: &Transaction<'_, '_>) -> Result<(), GenerateError> {
        if self.factory.is_empty() {
            tx.delete(&self.path);
        } else {
            tx.write(&self.path, self.factory.render());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{emit, FileSynthesizer};
    use crate::test_support::capture_shell;
    use tempfile::TempDir;

    #[test]
    fn test_render_sorted_unique() {
        let factory = ArrayFactory::new(["com.b.Item", "com.a.Node", "com.b.Item"]);
        assert_eq!(
            factory.render(),
            format!("{GENERATED_HEADER}\ncom.a.Node = com.a.Node[]::new\ncom.b.Item = com.b.Item[]::new\n")
        );
    }

    #[test]
    fn test_write_then_delete_when_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(ARRAY_FACTORY_FILE);
        let shell = capture_shell();
        let synth = FileSynthesizer::new(&shell);

        let artifact = ArrayFactoryArtifact {
            path: path.clone(),
            factory: ArrayFactory::new(["com.a.Node"]),
        };
        assert_eq!(emit(&synth, &artifact).unwrap().created, 1);

        let empty = ArrayFactoryArtifact {
            path: path.clone(),
            factory: ArrayFactory::default(),
        };
        assert_eq!(emit(&synth, &empty).unwrap().deleted, 1);
        assert!(!path.exists());
    }
}
