//! External compiler invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::compiler::artifact::read_artifact;
use crate::compiler::{CompiledModule, CompilerError, ModuleCompiler, NamedAddressBinding};
use crate::config::schema::CompilerConfig;

/// Longest stderr excerpt carried in a compile error.
const STDERR_EXCERPT_LEN: usize = 2048;

/// [`ModuleCompiler`] backed by the Aptos CLI.
#[derive(Debug, Clone)]
pub struct AptosCliCompiler {
    binary: PathBuf,
    subcommand: Vec<OsString>,
    extra_args: Vec<String>,
}

impl AptosCliCompiler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            subcommand: vec!["move".into(), "build-publish-payload".into()],
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(&config.binary).with_extra_args(config.extra_args.clone())
    }

    /// Replace the `move build-publish-payload` subcommand.
    pub fn with_subcommand<I, S>(mut self, subcommand: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.subcommand = subcommand.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Full argument list for one invocation.
    pub fn command_args(
        &self,
        package_dir: &Path,
        output_path: &Path,
        bindings: &[NamedAddressBinding],
    ) -> Vec<OsString> {
        let mut args = self.subcommand.clone();
        args.push("--package-dir".into());
        args.push(package_dir.into());
        args.push("--json-output-file".into());
        args.push(output_path.into());
        if !bindings.is_empty() {
            let named = bindings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            args.push("--named-addresses".into());
            args.push(named.into());
        }
        args.push("--assume-yes".into());
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }
}

#[async_trait]
impl ModuleCompiler for AptosCliCompiler {
    async fn compile(
        &self,
        package_dir: &Path,
        output_path: &Path,
        bindings: &[NamedAddressBinding],
    ) -> Result<CompiledModule, CompilerError> {
        // A stale artifact would mask a compiler that silently wrote nothing.
        match tokio::fs::remove_file(output_path).await {
            Ok(()) => tracing::debug!(path = %output_path.display(), "Removed stale artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CompilerError::Io(e)),
        }

        let args = self.command_args(package_dir, output_path, bindings);
        tracing::info!(
            binary = %self.binary.display(),
            package_dir = %package_dir.display(),
            bindings = bindings.len(),
            "Compiling package"
        );

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CompilerError::Compile(format!("failed to launch {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(STDERR_EXCERPT_LEN).collect();
            return Err(CompilerError::Compile(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                excerpt.trim()
            )));
        }

        if !output_path.exists() {
            return Err(CompilerError::Compile(format!(
                "compiler succeeded but wrote no artifact at {}",
                output_path.display()
            )));
        }

        let module = read_artifact(output_path).await?;
        tracing::info!(
            modules = module.module_count(),
            size_bytes = module.size(),
            "Package compiled"
        );
        Ok(module)
    }
}
