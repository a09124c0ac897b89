use crate::CommandLine;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("command template is empty")]
    Empty,
}

/// An argument vector with `{key}` placeholders.
///
/// Substitution happens per argument, so a value can never split into several
/// arguments or reach a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(argv: &[String]) -> Result<Self, TemplateError> {
        let (program, args) = argv.split_first().ok_or(TemplateError::Empty)?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn render(&self, values: &[(&str, &str)]) -> CommandLine {
        let args = self
            .args
            .iter()
            .map(|arg| {
                values.iter().fold(arg.clone(), |arg, (key, value)| {
                    arg.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect();

        CommandLine {
            program: self.program.clone(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandTemplate, TemplateError};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn renders_placeholders() {
        let template = CommandTemplate::new(&argv(&["docker", "ps", "--filter", "name={service}"])).unwrap();
        let command = template.render(&[("service", "openvpn-server")]);

        assert_eq!(command.program, "docker");
        assert_eq!(command.args, ["ps", "--filter", "name=openvpn-server"]);
    }

    #[test]
    fn leaves_unknown_braces() {
        let template = CommandTemplate::new(&argv(&["docker", "--format", "{{.Status}}", "{name}"])).unwrap();
        let command = template.render(&[("name", "alice")]);

        assert_eq!(command.args, ["--format", "{{.Status}}", "alice"]);
    }

    #[test]
    fn value_stays_a_single_argument() {
        let template = CommandTemplate::new(&argv(&["easyrsa", "revoke", "{name}"])).unwrap();
        let command = template.render(&[("name", "bob the builder")]);

        assert_eq!(command.args, ["revoke", "bob the builder"]);
    }

    #[test]
    fn empty_template() {
        assert_eq!(CommandTemplate::new(&[]), Err(TemplateError::Empty));
    }
}
