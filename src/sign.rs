// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use tempfile::NamedTempFile;

use crate::error::ToolError;
use crate::process;

/// Development key compiled into the binary, used when the auditor names
/// none. It only reproduces MRENCLAVE; MRSIGNER will differ from any
/// enclave that was not signed with this exact key.
pub const DEFAULT_KEY_PEM: &[u8] = include_bytes!("../data/signing_key.pem");

/// Produces a signed enclave from an unsigned one.
pub trait Signer {
    fn sign(
        &self,
        unsigned_enclave: &Path,
        signing_key: &Path,
        output: &Path,
        config: &Path,
    ) -> Result<(), ToolError>;
}

/// Drives the Intel SGX SDK `sgx_sign` tool.
#[derive(Clone, Debug)]
pub struct SgxSign {
    sgx_sign_path: PathBuf,
    timeout: Option<Duration>,
}

impl SgxSign {
    /// Pick the `sgx_sign` binary: an explicit path wins, then the one
    /// shipped in `$SGX_SDK/bin/x64`, then whatever is on `PATH`.
    pub fn locate(explicit: Option<PathBuf>, sgx_sdk: Option<PathBuf>) -> Self {
        let path = explicit
            .or_else(|| {
                sgx_sdk
                    .map(|sdk| sdk.join("bin").join("x64").join("sgx_sign"))
                    .filter(|p| p.is_file())
            })
            .unwrap_or_else(|| PathBuf::from("sgx_sign"));

        Self::from(path)
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.sgx_sign_path
    }

    pub fn command(
        &self,
        unsigned_enclave: &Path,
        config_path: &Path,
        private_key: &Path,
        output_enclave: &Path,
    ) -> Command {
        let mut cmd = Command::new(&self.sgx_sign_path);
        cmd.arg("sign")
            .arg("-enclave")
            .arg(unsigned_enclave)
            .arg("-config")
            .arg(config_path)
            .arg("-key")
            .arg(private_key)
            .arg("-out")
            .arg(output_enclave);
        cmd
    }
}

impl From<PathBuf> for SgxSign {
    fn from(sgx_sign_path: PathBuf) -> Self {
        Self {
            sgx_sign_path,
            timeout: None,
        }
    }
}

impl Signer for SgxSign {
    fn sign(
        &self,
        unsigned_enclave: &Path,
        signing_key: &Path,
        output: &Path,
        config: &Path,
    ) -> Result<(), ToolError> {
        let cmd = self.command(unsigned_enclave, config, signing_key, output);
        process::run(cmd, self.timeout)?;

        if !output.is_file() {
            return Err(ToolError::MissingOutput {
                program: self.sgx_sign_path.display().to_string(),
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Materialize the bundled development key. The file is removed when the
/// returned handle is dropped.
pub fn default_key() -> io::Result<NamedTempFile> {
    let mut key = tempfile::Builder::new()
        .prefix("sgxaudit-key-")
        .suffix(".pem")
        .tempfile()?;
    key.write_all(DEFAULT_KEY_PEM)?;
    key.flush()?;
    log::info!("no signing key given, using bundled development key");
    Ok(key)
}
