//! Generated build artifacts.
//!
//! Each artifact family implements [`Artifact`]: it turns resolved module
//! data into text and queues the resulting writes and deletes on a
//! transaction. [`emit`] runs one artifact inside its own nested transaction
//! so a driver can compose any number of them under one outer commit.
//!
//! Artifacts of a module live under its output directory
//! (`build/generated` by default):
//!
//! - `module.{toml,json,properties}` - dependency manifest ([`manifest`])
//! - `<target>/services.registry` - capability providers ([`registry`])
//! - `array-factory.txt` - reflective array element types ([`array_factory`])
//! - `resources.index` - embedded resource accessors ([`resources`])

pub mod array_factory;
pub mod manifest;
pub mod registry;
pub mod resources;
pub mod transaction;

use thiserror::Error;

pub use array_factory::ArrayFactory;
pub use manifest::{ManifestFlavor, ResolvedManifest};
pub use registry::ServiceRegistry;
pub use resources::ResourceIndex;
pub use transaction::{
    CommitReport, FileSynthesizer, SynthesisError, TextFileOperation, Transaction,
};

/// First line of every generated text artifact that allows comments.
pub const GENERATED_HEADER: &str = "# Generated by shipyard. Do not edit.";

/// Errors raised while generating artifacts.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("failed to render {artifact}")]
    Render {
        artifact: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A family of generated files.
pub trait Artifact {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Queue the operations that bring the files up to date.
    fn plan(&self, tx: &Transaction<'_, '_>) -> Result<(), GenerateError>;
}

/// Run one artifact in its own transaction.
pub fn emit(synthesizer: &FileSynthesizer<'_>, artifact: &dyn Artifact) -> Result<CommitReport, GenerateError> {
    let tx = synthesizer.open();
    artifact.plan(&tx)?;
    tracing::trace!(artifact = artifact.name(), operations = tx.len(), "planned artifact");
    Ok(tx.commit()?)
}
