//! The only boundary through which the control plane touches the operating system.
//!
//! Every backend interaction (certificate issuance, revocation, status queries)
//! is an external command run through a [`CommandGateway`]. Failures of any
//! kind, including timeouts and missing binaries, come back as a
//! [`CommandOutput`] with `succeeded == false`; the gateway never returns an
//! error to its caller.

mod process;
mod template;
mod tracing;

use std::fmt;

pub use process::ProcessGateway;
pub use template::{CommandTemplate, TemplateError};
pub use tracing::TracedGateway;

/// A program and its arguments, passed to the OS without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;

        for arg in &self.args {
            write!(f, " {arg}")?;
        }

        Ok(())
    }
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    /// Exit code when the process ran to completion and was not killed by a signal.
    pub exit_code: Option<i32>,
    /// The process was killed because it exceeded the gateway timeout.
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stderr: stderr.into(),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
pub trait CommandGateway: Send + Sync {
    /// Runs the command to completion or until the gateway timeout elapses.
    async fn execute(&self, command: &CommandLine) -> CommandOutput;
}
