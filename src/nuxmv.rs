//! nuXmv as a feasibility oracle.
//!
//! Each query runs one `nuXmv -source <script>` process:
//!
//! ```text
//! set on_failure_script_quits 1
//! read_model -i "<model>"
//! go
//! check_ltlspec -p "!(<query>)"
//! show_traces -v
//! quit
//! ```
//!
//! `-- specification ... is false` means the negated query has a counterexample, i.e.
//! the query is feasible and the (verbose) trace is its witness.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::OracleError;
use crate::formula::negate;
use crate::oracle::{Oracle, Query, Verdict};
use crate::trace::Trace;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct NuXmvOracle {
    binary: PathBuf,
    model: PathBuf,
    timeout: Duration,
    setup: Vec<String>,
}

impl NuXmvOracle {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        let model = model.into();
        let model = std::fs::canonicalize(&model).unwrap_or(model);
        Self {
            binary: PathBuf::from("nuXmv"),
            model,
            timeout: Duration::from_secs(60),
            setup: vec!["go".to_string()],
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Commands run between `read_model` and `check_ltlspec` (default: `go`).
    pub fn with_setup(mut self, setup: Vec<String>) -> Self {
        self.setup = setup;
        self
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    /// The command script checking the negation of `formula`.
    pub fn script(&self, formula: &str) -> Result<String, OracleError> {
        if formula.contains('"') || formula.contains('\n') {
            return Err(OracleError::RejectedQuery(format!(
                "formula must not contain quotes or newlines: `{}`",
                formula
            )));
        }
        let model = self.model.display().to_string();
        if model.contains('"') {
            return Err(OracleError::RejectedQuery(format!("model path `{}` contains a quote", model)));
        }

        let mut script = String::new();
        script.push_str("set on_failure_script_quits 1\n");
        script.push_str(&format!("read_model -i \"{}\"\n", model));
        for command in &self.setup {
            script.push_str(command);
            script.push('\n');
        }
        script.push_str(&format!("check_ltlspec -p \"{}\"\n", negate(formula)));
        script.push_str("show_traces -v\n");
        script.push_str("quit\n");
        Ok(script)
    }

    fn run(&self, script: &str) -> Result<String, OracleError> {
        let mut file = tempfile::Builder::new().prefix("ctd-").suffix(".cmd").tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let mut child = Command::new(&self.binary)
            .arg("-source")
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => OracleError::Spawn {
                    binary: self.binary.clone(),
                    source,
                },
                _ => OracleError::Io(source),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OracleError::Process {
                status: "spawned".to_string(),
                stderr: "stdout unavailable".to_string(),
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OracleError::Process {
                status: "spawned".to_string(),
                stderr: "stderr unavailable".to_string(),
            })?;
        let stdout_task = thread::spawn(move || read_stream(stdout));
        let stderr_task = thread::spawn(move || read_stream(stderr));

        let status = wait_for_exit(&mut child, self.timeout);
        let stdout = join_stream(stdout_task)?;
        let stderr = join_stream(stderr_task)?;
        let status = status?;

        if !status.success() {
            return Err(OracleError::Process {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(format!("{}\n{}", stdout, stderr))
    }
}

impl Oracle for NuXmvOracle {
    fn decide(&mut self, query: &Query) -> Result<Verdict, OracleError> {
        let script = self.script(query.formula())?;
        debug!("nuXmv: {}", query);
        trace!("nuXmv script:\n{}", script);
        let output = self.run(&script)?;
        parse_output(&output)
    }
}

/// Interpret nuXmv output for a single negated specification.
pub fn parse_output(output: &str) -> Result<Verdict, OracleError> {
    let mut verdict = None;
    let mut verdict_end = 0;
    let mut offset = 0;
    for line in output.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.starts_with("-- specification") {
            if trimmed.ends_with("is false") {
                verdict = Some(false);
                verdict_end = offset;
            } else if trimmed.ends_with("is true") {
                verdict = Some(true);
                verdict_end = offset;
            }
        }
    }

    match verdict {
        None => Err(OracleError::UnparseableOutput),
        Some(true) => Ok(Verdict::Infeasible),
        Some(false) => {
            let rest = &output[verdict_end..];
            // `check_ltlspec` prints a trace and `show_traces -v` prints it again in full;
            // only the last description is read.
            let start = rest.rfind("Trace Description:").unwrap_or(0);
            let trace = Trace::parse_nuxmv(&rest[start..])?;
            if trace.is_empty() {
                return Err(OracleError::MalformedTrace("counterexample without states".to_string()));
            }
            Ok(Verdict::Feasible(trace))
        }
    }
}

fn read_stream<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join_stream(task: thread::JoinHandle<std::io::Result<String>>) -> Result<String, OracleError> {
    task.join()
        .map_err(|_| OracleError::Process {
            status: "reader".to_string(),
            stderr: "output reader thread panicked".to_string(),
        })?
        .map_err(OracleError::Io)
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> Result<ExitStatus, OracleError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(OracleError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
