//! Move package compilation.
//!
//! # Data Flow
//! ```text
//! package dir + named address bindings
//!     → builder.rs (external `aptos move build-publish-payload`)
//!     → JSON publish payload on disk
//!     → artifact.rs (decode metadata + module bytecode)
//!     → CompiledModule
//! ```
//!
//! Compilation failures are fatal to a deployment; nothing here retries.

pub mod artifact;
pub mod builder;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::types::AccountAddress;

pub use builder::AptosCliCompiler;

/// Errors produced while compiling a package or reading its artifact.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// The external compiler failed, could not be launched, or produced nothing.
    #[error("Compile error: {0}")]
    Compile(String),

    /// The artifact exists but does not decode into a publishable package.
    #[error("Artifact parse error: {0}")]
    ArtifactParse(String),

    #[error("Compiler I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compile-time substitution of a symbolic address used in Move source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAddressBinding {
    pub name: String,
    pub address: AccountAddress,
}

impl NamedAddressBinding {
    pub fn new(name: impl Into<String>, address: AccountAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for NamedAddressBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.address)
    }
}

/// Publishable package: metadata blob plus one bytecode blob per module.
///
/// Both parts are guaranteed non-empty by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct CompiledModule {
    metadata: Vec<u8>,
    bytecode: Vec<Vec<u8>>,
}

impl CompiledModule {
    pub fn new(metadata: Vec<u8>, bytecode: Vec<Vec<u8>>) -> Result<Self, CompilerError> {
        if metadata.is_empty() {
            return Err(CompilerError::ArtifactParse("package metadata is empty".to_string()));
        }
        if bytecode.is_empty() {
            return Err(CompilerError::ArtifactParse("package contains no modules".to_string()));
        }
        if let Some(idx) = bytecode.iter().position(Vec::is_empty) {
            return Err(CompilerError::ArtifactParse(format!("module #{} has empty bytecode", idx)));
        }
        Ok(Self { metadata, bytecode })
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn bytecode(&self) -> &[Vec<u8>] {
        &self.bytecode
    }

    pub fn module_count(&self) -> usize {
        self.bytecode.len()
    }

    /// Total payload size in bytes.
    pub fn size(&self) -> usize {
        self.metadata.len() + self.bytecode.iter().map(Vec::len).sum::<usize>()
    }
}

impl fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModule")
            .field("metadata_len", &self.metadata.len())
            .field("modules", &self.bytecode.len())
            .finish()
    }
}

/// Turns a Move package into a [`CompiledModule`].
#[async_trait]
pub trait ModuleCompiler: Send + Sync {
    async fn compile(
        &self,
        package_dir: &Path,
        output_path: &Path,
        bindings: &[NamedAddressBinding],
    ) -> Result<CompiledModule, CompilerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_module_rejects_empty_parts() {
        assert!(matches!(
            CompiledModule::new(Vec::new(), vec![vec![1]]),
            Err(CompilerError::ArtifactParse(_))
        ));
        assert!(matches!(
            CompiledModule::new(vec![1], Vec::new()),
            Err(CompilerError::ArtifactParse(_))
        ));
        assert!(matches!(
            CompiledModule::new(vec![1], vec![vec![1], Vec::new()]),
            Err(CompilerError::ArtifactParse(_))
        ));
    }

    #[test]
    fn test_binding_display() {
        let binding = NamedAddressBinding::new("SpudCoin", "0xA1".parse().unwrap());
        assert!(binding.to_string().starts_with("SpudCoin=0x000"));
        assert!(binding.to_string().ends_with("a1"));
    }

    #[test]
    fn test_size() {
        let module = CompiledModule::new(vec![1, 2], vec![vec![3], vec![4, 5, 6]]).unwrap();
        assert_eq!(module.size(), 6);
        assert_eq!(module.module_count(), 2);
    }
}
