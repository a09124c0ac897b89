use serde::Deserialize;

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Print finished trace spans to stderr.
    pub console_traces: bool,
}
