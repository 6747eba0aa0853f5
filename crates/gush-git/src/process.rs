use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use gush_core::error::GushError;

/// Result of running one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ProcessOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

/// Something that can execute a program and capture its output.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<ProcessOutput, GushError>;
}

/// Runs commands as real child processes.
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<ProcessOutput, GushError> {
        tracing::debug!("running {program} {}", args.join(" "));
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| GushError::GitError {
                message: format!("failed to run {program} {}: {e}", args.join(" ")),
            })?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

/// Records every command line and answers from a table of canned outputs.
///
/// Lines without a canned answer succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, ProcessOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `line` (program and arguments joined by spaces) with `output`.
    pub fn respond(self, line: &str, output: ProcessOutput) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(line.to_string(), output);
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, _dir: &Path, program: &str, args: &[String]) -> Result<ProcessOutput, GushError> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.clone());
        Ok(self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&line)
            .cloned()
            .unwrap_or_else(|| ProcessOutput::ok("")))
    }
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for std::sync::Arc<T> {
    fn run(&self, dir: &Path, program: &str, args: &[String]) -> Result<ProcessOutput, GushError> {
        (**self).run(dir, program, args)
    }
}

/// One entry of a command batch.
#[derive(Debug, Clone)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Keep going (and report) instead of failing when the command exits non-zero.
    pub allow_failures: bool,
}

impl CommandLine {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            allow_failures: false,
        }
    }

    pub fn allow_failures(mut self) -> Self {
        self.allow_failures = true;
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs batches of commands in a working directory.
pub struct ProcessHelper {
    runner: Box<dyn ProcessRunner>,
    dir: PathBuf,
}

impl ProcessHelper {
    pub fn new(runner: Box<dyn ProcessRunner>, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
        }
    }

    /// Helper running real processes in `dir`.
    pub fn system(dir: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(SystemRunner), dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run a single command, returning its output whatever the exit status.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<ProcessOutput, GushError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(&self.dir, program, &args)
    }

    /// Run commands in order, stopping at the first failure that is not allowed.
    pub fn run_commands(&self, commands: &[CommandLine]) -> Result<Vec<ProcessOutput>, GushError> {
        let mut outputs = Vec::with_capacity(commands.len());
        for cmd in commands {
            let out = self.runner.run(&self.dir, &cmd.program, &cmd.args)?;
            if !out.success {
                if !cmd.allow_failures {
                    return Err(GushError::GitError {
                        message: format!("{} failed: {}", cmd.display(), out.stderr.trim()),
                    });
                }
                tracing::warn!("{} failed: {}", cmd.display(), out.stderr.trim());
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_run_commands_stops_on_failure() {
        let runner = Arc::new(
            RecordingRunner::new().respond("git fetch origin", ProcessOutput::failed("offline")),
        );
        let helper = ProcessHelper::new(Box::new(runner.clone()), "/tmp");
        let err = helper
            .run_commands(&[
                CommandLine::new("git", &["fetch", "origin"]),
                CommandLine::new("git", &["status"]),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("git fetch origin failed: offline"));
        assert_eq!(runner.calls(), vec!["git fetch origin"]);
    }

    #[test]
    fn test_run_commands_allows_flagged_failures() {
        let runner = Arc::new(
            RecordingRunner::new().respond("git fetch origin", ProcessOutput::failed("offline")),
        );
        let helper = ProcessHelper::new(Box::new(runner.clone()), "/tmp");
        let outputs = helper
            .run_commands(&[
                CommandLine::new("git", &["fetch", "origin"]).allow_failures(),
                CommandLine::new("git", &["status"]),
            ])
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(!outputs[0].success);
        assert_eq!(runner.calls(), vec!["git fetch origin", "git status"]);
    }

    #[test]
    fn test_system_runner_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let helper = ProcessHelper::system(dir.path());
        // cargo is on PATH whenever the test suite runs
        let out = helper.run("cargo", &["--version"]).unwrap();
        assert!(out.success);
        assert!(out.stdout.starts_with("cargo "));

        let out = helper.run("cargo", &["no-such-subcommand-for-gush"]).unwrap();
        assert!(!out.success);
    }
}
