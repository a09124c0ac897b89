//! Strings that may reference environment variables.
//!
//! A value such as `"{{ env.ADMIN_PASSWORD }}"` is expanded when parsed. Text
//! outside of the braces is kept verbatim, so `"redis://{{ env.REDIS_HOST }}:6379"`
//! works as expected. Brace pairs that do not start with `env.` are left alone.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};

static ENV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("environment pattern must compile")
});

/// A value parsed from a string after environment substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicString<T>(T);

impl<T> DynamicString<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for DynamicString<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MissingVariable(String),
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingVariable(name) => write!(f, "environment variable not found: `{name}`"),
            Error::Parse(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl<T> FromStr for DynamicString<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expanded = expand(s)?;
        let value = expanded.parse().map_err(|err: T::Err| Error::Parse(err.to_string()))?;

        Ok(Self(value))
    }
}

impl<'de, T> Deserialize<'de> for DynamicString<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn expand(input: &str) -> Result<String, Error> {
    let mut missing = None;

    let expanded = ENV_PATTERN.replace_all(input, |captures: &Captures<'_>| {
        let name = &captures[1];

        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(Error::MissingVariable(name)),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use insta::assert_snapshot;

    use super::DynamicString;

    #[test]
    fn plain_string_is_untouched() {
        let value: DynamicString<String> = "redis://redis:6379/0".parse().unwrap();
        assert_eq!(value.into_inner(), "redis://redis:6379/0");
    }

    #[test]
    fn substitutes_variables() {
        temp_env::with_var("VPNADMIN_TEST_HOST", Some("10.0.0.5"), || {
            let value: DynamicString<String> = "redis://{{ env.VPNADMIN_TEST_HOST }}:6379".parse().unwrap();
            assert_eq!(value.into_inner(), "redis://10.0.0.5:6379");
        });
    }

    #[test]
    fn missing_variable() {
        temp_env::with_var_unset("VPNADMIN_TEST_UNSET", || {
            let error = "{{env.VPNADMIN_TEST_UNSET}}".parse::<DynamicString<String>>().unwrap_err();
            assert_snapshot!(error, @"environment variable not found: `VPNADMIN_TEST_UNSET`");
        });
    }

    #[test]
    fn non_env_braces_are_kept() {
        let value: DynamicString<String> = "{{.Status}}".parse().unwrap();
        assert_eq!(value.into_inner(), "{{.Status}}");
    }

    #[test]
    fn parses_into_target_type() {
        temp_env::with_var("VPNADMIN_TEST_PORT", Some("8443"), || {
            let value: DynamicString<SocketAddr> = "127.0.0.1:{{ env.VPNADMIN_TEST_PORT }}".parse().unwrap();
            assert_eq!(value.port(), 8443);
        });
    }
}
