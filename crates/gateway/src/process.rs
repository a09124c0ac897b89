use std::{process::Stdio, time::Duration};

use config::GatewayConfig;
use tokio::process::Command;

use crate::{CommandGateway, CommandLine, CommandOutput};

/// Runs commands as child processes with a hard timeout.
///
/// A timed out child is killed when its output future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessGateway {
    timeout: Duration,
}

impl ProcessGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            timeout: config.timeout,
        }
    }
}

#[async_trait::async_trait]
impl CommandGateway for ProcessGateway {
    async fn execute(&self, command: &CommandLine) -> CommandOutput {
        log::debug!("executing `{command}`");

        let mut child = Command::new(&command.program);

        child
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, child.output()).await {
            Err(_) => {
                log::warn!("`{}` timed out after {:?}", command.program, self.timeout);

                CommandOutput {
                    timed_out: true,
                    ..CommandOutput::failure(format!(
                        "command `{}` timed out after {} seconds",
                        command.program,
                        self.timeout.as_secs_f64()
                    ))
                }
            }
            Ok(Err(err)) => {
                log::warn!("failed to launch `{}`: {err}", command.program);
                CommandOutput::failure(format!("failed to launch `{}`: {err}", command.program))
            }
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    succeeded: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                    timed_out: false,
                };

                if !result.succeeded {
                    log::debug!("`{}` exited with {}", command.program, output.status);
                }

                result
            }
        }
    }
}
