#![allow(dead_code)]

pub mod fixture;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const SGXAUDIT: &'static str = env!("CARGO_BIN_EXE_sgxaudit");

pub const H1: [u8; 32] = [0x11; 32];
pub const H2: [u8; 32] = [0x22; 32];

pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub fn run_sgxaudit(arglist: &[&str]) -> Run {
    let output = std::process::Command::new(SGXAUDIT)
        .args(arglist)
        .env_remove("SGX_SIGN")
        .env_remove("SGX_SDK")
        .env_remove("DOCKER")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    Run {
        code: output.status.code(),
        stdout: String::from_utf8(output.stdout).unwrap(),
        stderr: String::from_utf8(output.stderr).unwrap(),
    }
}

/// A scratch directory holding enclaves, configs and fake tools.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }

    pub fn write(&self, name: &str, data: &[u8]) -> String {
        let path = self.path(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// An ELF enclave with the given MRENCLAVE, ISVPRODID 1 and ISVSVN 0.
    pub fn enclave(&self, name: &str, mrenclave: [u8; 32]) -> String {
        let css = fixture::sigstruct(mrenclave, 0x42, 1, 0);
        self.write(name, &fixture::enclave_elf(&css))
    }

    pub fn config(&self) -> String {
        self.write("Enclave.config.xml", b"<EnclaveConfiguration/>\n")
    }

    pub fn executable(&self, name: &str, body: &str) -> String {
        let path = self.write(name, format!("#!/bin/sh\n{}\n", body).as_bytes());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// `sgx_sign` stand-in: the "unsigned" enclave already carries its
    /// SIGSTRUCT, so signing is a copy. Arguments are logged to sign.log.
    pub fn fake_sgx_sign(&self) -> String {
        self.executable(
            "sgx_sign",
            r#"echo "$@" >> "$(dirname "$0")/sign.log"
while [ $# -gt 0 ]; do
  case "$1" in
    -enclave) enclave="$2"; shift ;;
    -out) out="$2"; shift ;;
  esac
  shift
done
cp "$enclave" "$out""#,
        )
    }

    /// `docker` stand-in exporting `enclave` to the requested destination.
    /// Arguments are logged to docker.log.
    pub fn fake_docker(&self, enclave: &str) -> String {
        self.executable(
            "docker",
            &format!(
                r#"echo "$@" >> "$(dirname "$0")/docker.log"
while [ $# -gt 0 ]; do
  case "$1" in
    --output) dest="${{2#*dest=}}"; shift ;;
  esac
  shift
done
mkdir -p "$dest"
cp "{}" "$dest/Enclave.so""#,
                enclave
            ),
        )
    }

    pub fn failing_tool(&self, name: &str, message: &str) -> String {
        self.executable(name, &format!("echo '{}' >&2\nexit 1", message))
    }

    pub fn log(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(name)).ok()
    }

    pub fn exists(&self, name: &str) -> bool {
        Path::new(&self.path(name)).exists()
    }

    pub fn dir_path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}
