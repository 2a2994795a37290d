// SPDX-License-Identifier: Apache-2.0

//! Failure taxonomy for a verification run. A run either completes with a
//! report (which may contain mismatches) or fails with one of these; the two
//! outcomes are never folded together.

use std::{fmt, io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which enclave a decode failure refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    /// The distributed signed enclave under audit.
    Reference,
    /// The enclave signed during this run.
    Rebuilt,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Reference => write!(f, "reference signed enclave"),
            Artifact::Rebuilt => write!(f, "freshly signed enclave"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("enclave build failed")]
    Build(#[source] ToolError),

    #[error("enclave signing failed")]
    Sign(#[source] ToolError),

    #[error("unable to decode {artifact} {}", .path.display())]
    Decode {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("output path {} collides with an input path", .0.display())]
    PathCollision(PathBuf),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// Why an external tool (docker, sgx_sign) did not produce its artifact.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unable to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} succeeded but {} does not exist", .path.display())]
    MissingOutput { program: String, path: PathBuf },

    #[error("i/o error while running {program}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// The file does not hold a readable SIGSTRUCT.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unable to read file")]
    Io(#[from] io::Error),

    #[error("neither an ELF enclave nor a raw SIGSTRUCT")]
    Format,

    #[error("unsupported ELF: {0}")]
    UnsupportedElf(&'static str),

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("no .note.sgxmeta section")]
    MissingMetadata,

    #[error("unexpected note name in .note.sgxmeta")]
    NoteName,

    #[error("bad SGX metadata magic {0:#018x}")]
    MetadataMagic(u64),

    #[error("invalid SIGSTRUCT: {0}")]
    Sigstruct(String),
}
