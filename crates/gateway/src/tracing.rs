use fastrace::{Span, future::FutureExt, prelude::LocalSpan};

use crate::{CommandGateway, CommandLine, CommandOutput};

/// Wrapper that adds a span to every executed command
pub struct TracedGateway<G> {
    inner: G,
}

impl<G> TracedGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<G: CommandGateway> CommandGateway for TracedGateway<G> {
    async fn execute(&self, command: &CommandLine) -> CommandOutput {
        let span = Span::enter_with_local_parent("gateway:execute");

        span.add_property(|| ("process.executable.name", command.program.clone()));
        span.add_property(|| ("process.args_count", command.args.len().to_string()));

        let fut = async move {
            let output = self.inner.execute(command).await;

            LocalSpan::add_property(|| ("process.succeeded", output.succeeded.to_string()));

            if let Some(code) = output.exit_code {
                LocalSpan::add_property(|| ("process.exit.code", code.to_string()));
            }

            if !output.succeeded {
                LocalSpan::add_property(|| ("error", "true"));
                LocalSpan::add_property(|| {
                    (
                        "error.type",
                        match (output.timed_out, output.exit_code) {
                            (true, _) => "timeout",
                            (false, Some(_)) => "exit_status",
                            (false, None) => "abnormal_exit",
                        },
                    )
                });
            }

            output
        };

        fut.in_span(span).await
    }
}
