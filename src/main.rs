// SPDX-License-Identifier: Apache-2.0

#![deny(clippy::all)]

mod compare;
mod error;
mod process;
mod rebuild;
mod record;
mod render;
mod sign;
mod sigstruct;
mod verify;

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::compare::ReproducibilityReport;
use crate::rebuild::{BuildSpec, DockerBuild, OutputDescriptor};
use crate::render::{Colored, Plain, Style};
use crate::sign::SgxSign;
use crate::sigstruct::SigstructDecoder;
use crate::verify::{Scratch, Verifier};

/// Exit status of a completed run in which a reported field did not match.
const EXIT_MISMATCH: i32 = 3;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Sgxaudit {
    #[command(subcommand)]
    pub cmd: SgxauditCmd,

    /// Do not print the report; the exit status still tells the outcome
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// When to color text output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

#[derive(Subcommand)]
enum SgxauditCmd {
    /// Sign an unsigned enclave and compare it with a distributed signed enclave
    Verify {
        /// Signed enclave under audit
        #[arg(value_name = "signed-enclave", required = true)]
        signed_enclave: PathBuf,

        /// Unsigned enclave to sign and compare
        #[arg(value_name = "unsigned-enclave", required = true)]
        unsigned_enclave: PathBuf,

        /// Enclave configuration used for signing
        #[arg(value_name = "enclave-config", required = true)]
        enclave_config: PathBuf,

        #[command(flatten)]
        sign: SignArgs,

        /// Include MRSIGNER in the report and the exit status
        #[arg(long, default_value_t = false)]
        show_mrsigner: bool,
    },

    /// Rebuild the enclave from source, sign it and compare it with a
    /// distributed signed enclave
    Rebuild {
        /// Signed enclave under audit
        #[arg(value_name = "signed-enclave", required = true)]
        signed_enclave: PathBuf,

        /// Enclave configuration used for signing
        #[arg(value_name = "enclave-config", required = true)]
        enclave_config: PathBuf,

        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        sign: SignArgs,

        /// Include MRSIGNER in the report and the exit status
        #[arg(long, default_value_t = false)]
        show_mrsigner: bool,
    },

    /// Print the identity fields of a signed enclave or SIGSTRUCT file
    Show {
        #[arg(value_name = "enclave", required = true)]
        enclave: PathBuf,
    },
}

#[derive(Args)]
struct SignArgs {
    /// Private key to sign with [default: bundled development key]
    #[arg(long, value_name = "key")]
    key: Option<PathBuf>,

    /// Where to write the freshly signed enclave [default: a new private
    /// temporary directory]
    #[arg(long, value_name = "out")]
    out: Option<PathBuf>,

    /// Keep the temporary directory holding the freshly signed enclave
    #[arg(long, default_value_t = false, conflicts_with = "out")]
    keep: bool,

    /// Path to the sgx_sign tool
    #[arg(long, env = "SGX_SIGN", value_name = "sgx-sign")]
    sgx_sign: Option<PathBuf>,

    /// Intel SGX SDK installation searched for bin/x64/sgx_sign
    #[arg(long, env = "SGX_SDK", value_name = "sdk")]
    sgx_sdk: Option<PathBuf>,

    /// Give up on a build or signing step after this many seconds
    #[arg(long, value_name = "seconds")]
    timeout: Option<u64>,
}

impl SignArgs {
    fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    fn signer(&self) -> SgxSign {
        let signer =
            SgxSign::locate(self.sgx_sign.clone(), self.sgx_sdk.clone()).timeout(self.timeout());
        log::debug!("using {}", signer.path().display());
        signer
    }
}

#[derive(Args)]
struct BuildArgs {
    /// Build context (source root)
    #[arg(long, value_name = "dir", default_value = ".")]
    context: PathBuf,

    /// Build output type
    #[arg(long, value_name = "type", default_value = "local")]
    output_type: String,

    /// Build output destination
    #[arg(long, value_name = "dir", default_value = "out")]
    dest: PathBuf,

    /// File name of the unsigned enclave inside the build output
    #[arg(long, value_name = "name", default_value = rebuild::DEFAULT_ENCLAVE_FILENAME)]
    enclave_filename: String,

    /// Extra build option, passed on as --KEY VALUE
    #[arg(long = "build-opt", value_name = "KEY=VALUE", value_parser = rebuild::parse_option)]
    build_opts: Vec<(String, String)>,

    /// Path to the docker tool
    #[arg(long, env = "DOCKER", value_name = "docker", default_value = "docker")]
    docker: PathBuf,

    /// IAS attestation report to compare against (not supported yet)
    #[arg(long, value_name = "report")]
    ias_report: Option<PathBuf>,
}

impl BuildArgs {
    fn spec(&self) -> BuildSpec {
        BuildSpec {
            context_path: self.context.clone(),
            output: OutputDescriptor {
                kind: self.output_type.clone(),
                destination: self.dest.clone(),
            },
            options: self.build_opts.clone(),
            unsigned_enclave_filename: self.enclave_filename.clone(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        }
    }
}

struct Output {
    quiet: bool,
    format: Format,
    color: ColorChoice,
}

impl Output {
    /// Print `report`, returning whether every shown field matched.
    fn report(&self, report: &ReproducibilityReport, show_signer: bool) -> Result<bool> {
        if !self.quiet {
            match self.format {
                Format::Text => {
                    let style: &dyn Style = if self.color.enabled() {
                        &Colored
                    } else {
                        &Plain
                    };
                    print!("{}", render::text(report, show_signer, style));
                }
                Format::Json => println!(
                    "{}",
                    render::json(report, show_signer).context("unable to serialize report")?
                ),
            }
        }

        Ok(render::visible(report, show_signer)
            .iter()
            .all(|e| e.matches))
    }
}

/// Run `f` with the signed-enclave output path: `--out` if given, otherwise
/// a path in a fresh scratch directory.
fn with_output<F>(sign: &SignArgs, f: F) -> Result<ReproducibilityReport>
where
    F: FnOnce(&Path) -> error::Result<ReproducibilityReport>,
{
    if let Some(out) = &sign.out {
        return Ok(f(out.as_path())?);
    }

    let scratch = Scratch::new().context("unable to create scratch directory")?;
    let result = f(scratch.signed_enclave().as_path());

    if sign.keep {
        let dir = scratch.keep();
        log::info!("kept scratch directory {}", dir.display());
    }

    Ok(result?)
}

fn main() -> Result<()> {
    env_logger::init();

    let sgxaudit = Sgxaudit::parse();
    let output = Output {
        quiet: sgxaudit.quiet,
        format: sgxaudit.format,
        color: sgxaudit.color,
    };

    let status = match sgxaudit.cmd {
        SgxauditCmd::Verify {
            signed_enclave,
            unsigned_enclave,
            enclave_config,
            sign,
            show_mrsigner,
        } => audit::verify_cmd(
            &output,
            signed_enclave,
            unsigned_enclave,
            enclave_config,
            sign,
            show_mrsigner,
        ),
        SgxauditCmd::Rebuild {
            signed_enclave,
            enclave_config,
            build,
            sign,
            show_mrsigner,
        } => audit::rebuild_cmd(
            &output,
            signed_enclave,
            enclave_config,
            build,
            sign,
            show_mrsigner,
        ),
        SgxauditCmd::Show { enclave } => show::cmd(&output, enclave).map(|_| true),
    };

    match status {
        Ok(true) => Ok(()),
        Ok(false) => exit(EXIT_MISMATCH),
        Err(e) => Err(e),
    }
}

mod audit {
    use super::*;

    pub fn verify_cmd(
        output: &Output,
        signed_enclave: PathBuf,
        unsigned_enclave: PathBuf,
        enclave_config: PathBuf,
        sign: SignArgs,
        show_mrsigner: bool,
    ) -> Result<bool> {
        let signer = sign.signer();
        let verifier = Verifier::new(&signer, &SigstructDecoder);

        let report = with_output(&sign, |out| {
            verifier.verify(
                &signed_enclave,
                &unsigned_enclave,
                &enclave_config,
                sign.key.as_deref(),
                out,
            )
        })?;

        output.report(&report, show_mrsigner)
    }

    pub fn rebuild_cmd(
        output: &Output,
        signed_enclave: PathBuf,
        enclave_config: PathBuf,
        build: BuildArgs,
        sign: SignArgs,
        show_mrsigner: bool,
    ) -> Result<bool> {
        let signer = sign.signer();
        let builder = DockerBuild::new(build.docker.clone()).timeout(sign.timeout());
        let verifier = Verifier::new(&signer, &SigstructDecoder);
        let spec = build.spec();

        let report = with_output(&sign, |out| {
            verifier.verify_from_build(
                &builder,
                &spec,
                &signed_enclave,
                &enclave_config,
                build.ias_report.as_deref(),
                sign.key.as_deref(),
                out,
            )
        })?;

        output.report(&report, show_mrsigner)
    }
}

mod show {
    use super::*;

    pub fn cmd(output: &Output, enclave: PathBuf) -> Result<()> {
        let record = sigstruct::from_enclave_file(&enclave)
            .context(format!("unable to decode {}", enclave.display()))?;

        if output.quiet {
            return Ok(());
        }

        match output.format {
            Format::Text => {
                println!("mrenclave: {}", record.mrenclave());
                println!("mrsigner: {}", record.mrsigner());
                println!("isvprodid: {}", record.isvprodid());
                println!("isvsvn: {}", record.isvsvn());
            }
            Format::Json => println!(
                "{}",
                serde_json::to_string_pretty(&record).context("unable to serialize record")?
            ),
        }

        Ok(())
    }
}
