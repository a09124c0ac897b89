use std::{path::Path, str::FromStr};

use anyhow::bail;
use indoc::indoc;
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use std::fmt::Write;
use toml::Value;

use crate::{Config, NAME_PLACEHOLDER, SERVICE_PLACEHOLDER};

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref().to_path_buf();
    let content = std::fs::read_to_string(&path)?;
    let mut raw_config: Value = toml::from_str(&content)?;

    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;

    validate_commands(&config)?;
    validate_services(&config)?;
    validate_admin(&config)?;
    validate_provisioning(&config)?;

    Ok(config)
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => {
                let mut p = String::new();

                for segment in path {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]")?,
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                bail!("Failed to expand dynamic string at path '{p}': {err}");
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

pub(crate) fn validate_commands(config: &Config) -> anyhow::Result<()> {
    let commands = [
        ("provisioning.issue", &config.provisioning.issue, Some(NAME_PLACEHOLDER)),
        ("provisioning.revoke", &config.provisioning.revoke, Some(NAME_PLACEHOLDER)),
        ("status.query", &config.status.query, Some(SERVICE_PLACEHOLDER)),
        ("status.uptime", &config.status.uptime, None),
    ];

    for (key, argv, placeholder) in commands {
        let Some(program) = argv.first() else {
            bail!("Command `{key}` is empty. It must contain at least the program to execute.");
        };

        if program.trim().is_empty() {
            bail!("Command `{key}` has an empty program name.");
        }

        if let Some(placeholder) = placeholder
            && !argv.iter().skip(1).any(|arg| arg.contains(placeholder))
        {
            bail!("Command `{key}` must pass `{placeholder}` in one of its arguments.");
        }
    }

    if config.provisioning.artifacts.extension.contains(['/', '\\']) {
        bail!(
            "provisioning.artifacts.extension must not contain path separators, got '{}'",
            config.provisioning.artifacts.extension
        );
    }

    Ok(())
}

pub(crate) fn validate_services(config: &Config) -> anyhow::Result<()> {
    if config.services.is_empty() {
        bail!(indoc! {r#"
            No services configured. At least one backend service is required for the status view.

            Example configuration:

              [services.openvpn]
              container = "openvpn-server"
        "#});
    }

    for (name, service) in &config.services {
        if service.container.trim().is_empty() {
            bail!("Service '{name}' has an empty container name.");
        }
    }

    Ok(())
}

pub(crate) fn validate_admin(config: &Config) -> anyhow::Result<()> {
    if config.admin.username.trim().is_empty() {
        bail!("admin.username must not be empty.");
    }

    if config.server.auth.enabled && config.admin.password.is_none() {
        bail!(indoc! {r#"
            Operator authentication is enabled but no admin password is configured.

            Either set a password, preferably from the environment:

              [admin]
              password = "{{ env.ADMIN_PASSWORD }}"

            or disable authentication explicitly:

              [server.auth]
              enabled = false
        "#});
    }

    Ok(())
}

/// A reservation must outlive the slowest issuance, otherwise a second attempt
/// for the same name can claim it while the first command still runs.
pub(crate) fn validate_provisioning(config: &Config) -> anyhow::Result<()> {
    let ttl = config.provisioning.reservation_ttl;
    let timeout = config.gateway.timeout;

    if ttl <= timeout {
        bail!(
            "provisioning.reservation_ttl ({}) must be longer than gateway.timeout ({}).",
            seconds(ttl),
            seconds(timeout)
        );
    }

    Ok(())
}

fn seconds(duration: std::time::Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}
