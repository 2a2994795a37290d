// SPDX-License-Identifier: Apache-2.0

//! Reproducing the unsigned enclave from source with a container build.

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::error::ToolError;
use crate::process;

pub const DEFAULT_ENCLAVE_FILENAME: &str = "Enclave.so";

/// Where the build exports its result, i.e. `--output type=...,dest=...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub kind: String,
    pub destination: PathBuf,
}

impl Default for OutputDescriptor {
    fn default() -> Self {
        Self {
            kind: "local".to_string(),
            destination: PathBuf::from("out"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildSpec {
    pub context_path: PathBuf,
    pub output: OutputDescriptor,
    /// Extra `--key value` pairs handed to the builder untouched, in order.
    pub options: Vec<(String, String)>,
    pub unsigned_enclave_filename: String,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            context_path: PathBuf::from("."),
            output: OutputDescriptor::default(),
            options: Vec::new(),
            unsigned_enclave_filename: DEFAULT_ENCLAVE_FILENAME.to_string(),
        }
    }
}

impl BuildSpec {
    /// Where the build leaves the unsigned enclave.
    pub fn unsigned_enclave(&self) -> PathBuf {
        self.output
            .destination
            .join(&self.unsigned_enclave_filename)
    }
}

/// Parse `KEY=VALUE` (or a bare `KEY` flag) for a passthrough build option.
pub fn parse_option(s: &str) -> Result<(String, String), String> {
    let (key, value) = match s.find('=') {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    };

    let key = key.trim_start_matches('-');
    if key.is_empty() {
        return Err(format!("missing option name in '{}'", s));
    }

    Ok((key.replace('_', "-"), value.to_string()))
}

/// Materializes an unsigned enclave from a source tree.
pub trait Builder {
    fn build(
        &self,
        context_path: &Path,
        output: &OutputDescriptor,
        options: &[(String, String)],
    ) -> Result<(), ToolError>;
}

/// `docker buildx build`, exporting the build stage to the filesystem.
#[derive(Clone, Debug)]
pub struct DockerBuild {
    docker_path: PathBuf,
    timeout: Option<Duration>,
}

impl DockerBuild {
    pub fn new(docker_path: PathBuf) -> Self {
        Self {
            docker_path,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(
        &self,
        context_path: &Path,
        output: &OutputDescriptor,
        options: &[(String, String)],
    ) -> Command {
        let mut cmd = Command::new(&self.docker_path);
        cmd.arg("buildx").arg("build").arg("--output").arg(format!(
            "type={},dest={}",
            output.kind,
            output.destination.display()
        ));

        for (key, value) in options {
            cmd.arg(format!("--{}", key));
            if !value.is_empty() {
                cmd.arg(value);
            }
        }

        cmd.arg(context_path);
        cmd
    }
}

impl Builder for DockerBuild {
    fn build(
        &self,
        context_path: &Path,
        output: &OutputDescriptor,
        options: &[(String, String)],
    ) -> Result<(), ToolError> {
        let cmd = self.command(context_path, output, options);
        process::run(cmd, self.timeout)
    }
}
