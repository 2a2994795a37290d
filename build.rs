// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::{env, fs, io, process};

const MAN_PAGES: [&str; 1] = ["sgxaudit"];

fn main() {
    let outdir = match env::var_os("OUT_DIR") {
        Some(outdir) => PathBuf::from(outdir),
        None => panic!("OUT_DIR environment variable not defined."),
    };
    fs::create_dir_all(&outdir).unwrap();

    for page in MAN_PAGES {
        let source = Path::new("docs").join(format!("{}.1.adoc", page));
        println!("cargo:rerun-if-changed={}", source.display());

        // A missing asciidoctor only costs us the man page.
        if let Err(err) = asciidoctor(&source, &outdir.join(format!("{}.1", page))) {
            println!("man page {} not generated: {} (is asciidoctor installed?)", page, err);
        }
    }
}

fn asciidoctor(source: &Path, target: &Path) -> io::Result<()> {
    let source = env::current_dir()?.join(source);

    let status = process::Command::new("asciidoctor")
        .args(["--doctype", "manpage", "--backend", "manpage", "--out-file"])
        .arg(target)
        .arg(&source)
        .status()?;

    if !status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("asciidoctor exited with {:?}", status.code()),
        ));
    }

    Ok(())
}
