use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;

/// One external client invocation: program, arguments, and any
/// process-scoped environment variables.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("'{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("'{program}' {status}: {output}")]
    Failed {
        program: String,
        status: String,
        output: String,
    },

    #[error("i/o failure while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Launches external client programs and wires their standard streams.
/// Injected into connectors so tests can substitute a recording fake
/// and assert on argument lists without real database tools.
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing combined stdout/stderr; used for
    /// connectivity probes where the output is purely diagnostic.
    fn run(&self, inv: &Invocation) -> Result<(), RunError>;

    /// Stream the child's stdout into `sink`. Stderr is captured
    /// separately and attached to the error on non-zero exit.
    fn run_to_sink(&self, inv: &Invocation, sink: &mut dyn Write) -> Result<(), RunError>;

    /// Feed `source` into the child's stdin. Stderr is captured
    /// separately and attached to the error on non-zero exit.
    fn run_from_source(&self, inv: &Invocation, source: &mut dyn Read) -> Result<(), RunError>;
}

/// The real process launcher backed by `std::process::Command`.
pub struct SystemRunner;

impl SystemRunner {
    fn command(inv: &Invocation) -> Command {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args);
        for (key, value) in &inv.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn_error(inv: &Invocation, err: io::Error) -> RunError {
        if err.kind() == io::ErrorKind::NotFound {
            RunError::ToolNotFound(inv.program.clone())
        } else {
            RunError::Io {
                program: inv.program.clone(),
                source: err,
            }
        }
    }

    fn io_error(inv: &Invocation, source: io::Error) -> RunError {
        RunError::Io {
            program: inv.program.clone(),
            source,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, inv: &Invocation) -> Result<(), RunError> {
        let output = Self::command(inv)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(inv, e))?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(RunError::Failed {
                program: inv.program.clone(),
                status: output.status.to_string(),
                output: combined.trim().to_string(),
            });
        }
        Ok(())
    }

    fn run_to_sink(&self, inv: &Invocation, sink: &mut dyn Write) -> Result<(), RunError> {
        let mut child = Self::command(inv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(inv, e))?;

        let mut stdout = child.stdout.take().expect("stdout is piped");
        let stderr = child.stderr.take().expect("stderr is piped");
        // Drain stderr on its own thread so a chatty tool cannot fill
        // the pipe and deadlock against the stdout copy.
        let stderr_thread = thread::spawn(move || read_lossy(stderr));

        let copied = io::copy(&mut stdout, sink);
        // Close the read end before reaping: if the sink failed
        // mid-stream, a tool with more output than the pipe buffer
        // would otherwise block on a full pipe and wait() would never
        // return. Closing delivers EPIPE and the tool exits.
        drop(stdout);
        let status = child.wait().map_err(|e| Self::io_error(inv, e))?;
        let diagnostics = stderr_thread.join().unwrap_or_default();

        // A sink failure is the root cause; the child's exit status is
        // only a consequence of the severed pipe.
        copied.map_err(|e| Self::io_error(inv, e))?;
        if !status.success() {
            return Err(RunError::Failed {
                program: inv.program.clone(),
                status: status.to_string(),
                output: diagnostics.trim().to_string(),
            });
        }
        Ok(())
    }

    fn run_from_source(&self, inv: &Invocation, source: &mut dyn Read) -> Result<(), RunError> {
        let mut child = Self::command(inv)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(inv, e))?;

        let stderr = child.stderr.take().expect("stderr is piped");
        let stderr_thread = thread::spawn(move || read_lossy(stderr));

        // Scope the handle so the child sees EOF once the copy is done.
        let fed = {
            let mut stdin = child.stdin.take().expect("stdin is piped");
            io::copy(source, &mut stdin)
        };

        let status = child.wait().map_err(|e| Self::io_error(inv, e))?;
        let diagnostics = stderr_thread.join().unwrap_or_default();

        if !status.success() {
            return Err(RunError::Failed {
                program: inv.program.clone(),
                status: status.to_string(),
                output: diagnostics.trim().to_string(),
            });
        }
        fed.map_err(|e| Self::io_error(inv, e))?;
        Ok(())
    }
}

fn read_lossy(mut source: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = source.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_reports_missing_binary_as_tool_not_found() {
        let inv = Invocation::new("definitely-not-a-real-tool-4739");
        match SystemRunner.run(&inv) {
            Err(RunError::ToolNotFound(tool)) => {
                assert_eq!(tool, "definitely-not-a-real-tool-4739")
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn run_captures_diagnostic_output_on_failure() {
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("echo nope >&2; exit 3");
        match SystemRunner.run(&inv) {
            Err(RunError::Failed { output, .. }) => assert!(output.contains("nope")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn run_to_sink_streams_child_stdout() {
        let inv = Invocation::new("sh").arg("-c").arg("printf hello");
        let mut sink = Vec::new();
        SystemRunner.run_to_sink(&inv, &mut sink).unwrap();
        assert_eq!(sink, b"hello");
    }

    #[test]
    fn run_to_sink_attaches_stderr_on_nonzero_exit() {
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("printf partial; echo boom >&2; exit 1");
        let mut sink = Vec::new();
        match SystemRunner.run_to_sink(&inv, &mut sink) {
            Err(RunError::Failed { output, .. }) => assert!(output.contains("boom")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn run_to_sink_returns_promptly_when_the_sink_fails_mid_stream() {
        struct FailingSink;

        impl Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "no space left"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        // 1 MiB of output, far more than the pipe buffer holds: the
        // child must be cut loose instead of blocking on a full pipe.
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("dd if=/dev/zero bs=1024 count=1024 2>/dev/null");
        match SystemRunner.run_to_sink(&inv, &mut FailingSink) {
            Err(RunError::Io { source, .. }) => {
                assert!(source.to_string().contains("no space left"))
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn run_from_source_feeds_child_stdin() {
        // `grep -q` exits 0 only if the pattern arrived on stdin.
        let inv = Invocation::new("sh").arg("-c").arg("grep -q marker");
        let mut source = &b"has marker inside\n"[..];
        SystemRunner.run_from_source(&inv, &mut source).unwrap();
    }

    #[test]
    fn invocation_builder_accumulates_args_and_env() {
        let inv = Invocation::new("psql")
            .arg("-h")
            .arg("localhost")
            .env("PGPASSWORD", "secret");
        assert_eq!(inv.program, "psql");
        assert_eq!(inv.args, vec!["-h", "localhost"]);
        assert_eq!(
            inv.env,
            vec![("PGPASSWORD".to_string(), "secret".to_string())]
        );
    }
}
