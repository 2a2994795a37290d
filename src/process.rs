// SPDX-License-Identifier: Apache-2.0

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `cmd` to completion, blocking the caller.
///
/// Output is spooled to anonymous temporary files, never pipes, since we
/// only poll the child when a timeout is set. Stderr is returned verbatim in
/// [`ToolError::Failed`].
pub fn run(mut cmd: Command, timeout: Option<Duration>) -> Result<(), ToolError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::debug!("running {:?}", cmd);

    let mut stdout = tempfile::tempfile().map_err(|e| io_error(&program, e))?;
    let mut stderr = tempfile::tempfile().map_err(|e| io_error(&program, e))?;

    cmd.stdin(Stdio::null())
        .stdout(stdout.try_clone().map_err(|e| io_error(&program, e))?)
        .stderr(stderr.try_clone().map_err(|e| io_error(&program, e))?);

    let mut child = cmd.spawn().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;

    let status = match timeout {
        None => child.wait().map_err(|e| io_error(&program, e))?,
        Some(timeout) => match wait_timeout(&mut child, timeout)
            .map_err(|e| io_error(&program, e))?
        {
            Some(status) => status,
            None => return Err(ToolError::Timeout { program, timeout }),
        },
    };

    let out = slurp(&mut stdout).map_err(|e| io_error(&program, e))?;
    let err = slurp(&mut stderr).map_err(|e| io_error(&program, e))?;
    log::debug!("{} stdout: {}", program, out.trim_end());

    if !status.success() {
        return Err(ToolError::Failed {
            program,
            status,
            stderr: err.trim_end().to_string(),
        });
    }

    log::debug!("{} stderr: {}", program, err.trim_end());
    Ok(())
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        if Instant::now() >= deadline {
            log::warn!("killing child {} after {:?}", child.id(), timeout);
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn slurp(file: &mut File) -> io::Result<String> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn io_error(program: &str, source: io::Error) -> ToolError {
    ToolError::Io {
        program: program.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn success() {
        run(sh("echo hello"), None).unwrap();
    }

    #[test]
    fn failure_carries_stderr() {
        match run(sh("echo 'bad key' >&2; exit 3"), None) {
            Err(ToolError::Failed { stderr, status, .. }) => {
                assert_eq!(stderr, "bad key");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_program() {
        let cmd = Command::new("/nonexistent/sgxaudit-tool");
        assert!(matches!(run(cmd, None), Err(ToolError::Spawn { .. })));
    }

    #[test]
    fn timeout_kills_child() {
        let start = Instant::now();
        let res = run(sh("sleep 10"), Some(Duration::from_millis(200)));
        assert!(matches!(res, Err(ToolError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn large_output_does_not_block() {
        run(sh("head -c 1048576 /dev/zero"), Some(Duration::from_secs(30))).unwrap();
    }
}
