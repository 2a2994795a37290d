// SPDX-License-Identifier: Apache-2.0

//! The verification workflow: sign the candidate enclave with a known key,
//! decode both enclaves and compare their identity fields.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::compare::{compare, ReproducibilityReport};
use crate::error::{Artifact, Error, Result, ToolError};
use crate::rebuild::{BuildSpec, Builder};
use crate::record::AttestationRecord;
use crate::sigstruct::Decoder;
use crate::sign::{self, Signer};

const SIGNED_ENCLAVE_NAME: &str = "audit_enclave.signed.so";

/// Private per-run directory for the freshly signed enclave, so concurrent
/// runs never write to the same path.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("sgxaudit-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn signed_enclave(&self) -> PathBuf {
        self.dir.path().join(SIGNED_ENCLAVE_NAME)
    }

    /// Keep the directory on disk after the run, returning its path.
    pub fn keep(self) -> PathBuf {
        self.dir.into_path()
    }
}

pub struct Verifier<'a> {
    signer: &'a dyn Signer,
    decoder: &'a dyn Decoder,
}

impl<'a> Verifier<'a> {
    pub fn new(signer: &'a dyn Signer, decoder: &'a dyn Decoder) -> Self {
        Self { signer, decoder }
    }

    /// Sign `unsigned_enclave` into `output` and compare it against the
    /// reference `signed_enclave`.
    ///
    /// Without a `signing_key` the bundled development key is used. The
    /// reference is decoded before anything is signed.
    pub fn verify(
        &self,
        signed_enclave: &Path,
        unsigned_enclave: &Path,
        enclave_config: &Path,
        signing_key: Option<&Path>,
        output: &Path,
    ) -> Result<ReproducibilityReport> {
        let inputs = [
            Some(signed_enclave),
            Some(unsigned_enclave),
            Some(enclave_config),
            signing_key,
        ];
        if inputs.iter().flatten().any(|input| same_file(output, input)) {
            return Err(Error::PathCollision(output.to_path_buf()));
        }

        let default_key;
        let signing_key = match signing_key {
            Some(key) => key,
            None => {
                default_key = sign::default_key().map_err(|source| Error::Io {
                    context: "unable to write default signing key".to_string(),
                    source,
                })?;
                default_key.path()
            }
        };

        let expected = self.decode(Artifact::Reference, signed_enclave)?;

        if !unsigned_enclave.is_file() {
            return Err(Error::Io {
                context: format!(
                    "unable to find unsigned enclave {}",
                    unsigned_enclave.display()
                ),
                source: io::ErrorKind::NotFound.into(),
            });
        }

        log::info!(
            "signing {} into {}",
            unsigned_enclave.display(),
            output.display()
        );
        self.signer
            .sign(unsigned_enclave, signing_key, output, enclave_config)
            .map_err(Error::Sign)?;

        let computed = self.decode(Artifact::Rebuilt, output)?;
        let report = compare(&expected, &computed);

        if !report.is_reproducible() {
            log::info!("mismatching fields: {:?}", report.mismatches());
        }

        Ok(report)
    }

    /// Build the unsigned enclave from source first, then [`Self::verify`]
    /// it against `signed_enclave`.
    ///
    /// Reconciling against a third-party attestation report is not
    /// implemented; passing one fails before anything is built.
    #[allow(clippy::too_many_arguments)]
    pub fn verify_from_build(
        &self,
        builder: &dyn Builder,
        spec: &BuildSpec,
        signed_enclave: &Path,
        enclave_config: &Path,
        attestation_report: Option<&Path>,
        signing_key: Option<&Path>,
        output: &Path,
    ) -> Result<ReproducibilityReport> {
        if attestation_report.is_some() {
            return Err(Error::Unsupported(
                "comparison against an attestation report after a rebuild",
            ));
        }

        log::info!("building enclave from {}", spec.context_path.display());
        builder
            .build(&spec.context_path, &spec.output, &spec.options)
            .map_err(Error::Build)?;

        let unsigned_enclave = spec.unsigned_enclave();
        if !unsigned_enclave.is_file() {
            return Err(Error::Build(ToolError::MissingOutput {
                program: "build".to_string(),
                path: unsigned_enclave,
            }));
        }

        self.verify(
            signed_enclave,
            &unsigned_enclave,
            enclave_config,
            signing_key,
            output,
        )
    }

    fn decode(&self, artifact: Artifact, path: &Path) -> Result<AttestationRecord> {
        self.decoder.decode(path).map_err(|source| Error::Decode {
            artifact,
            path: path.to_path_buf(),
            source,
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }

    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
