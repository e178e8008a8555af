//! Upstream launch command.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::SupervisorConfig;
use crate::supervisor::SupervisorError;

/// Placeholder in command arguments replaced by the upstream port.
pub const PORT_PLACEHOLDER: &str = "${PORT}";

/// Resolved program, arguments and environment requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub required_env: Vec<String>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            required_env: Vec::new(),
        }
    }

    /// Build from config, substituting the upstream port into every argument.
    pub fn from_config(config: &SupervisorConfig, port: u16) -> Result<Self, SupervisorError> {
        let port = port.to_string();
        let mut parts = config
            .command
            .iter()
            .map(|part| part.replace(PORT_PLACEHOLDER, &port));

        let program = parts.next().ok_or(SupervisorError::EmptyCommand)?;
        if program.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        Ok(Self {
            program,
            args: parts.collect(),
            required_env: config.required_env.clone(),
        })
    }

    /// Fail if a required variable is missing from the environment.
    pub fn check_env(&self) -> Result<(), SupervisorError> {
        match self
            .required_env
            .iter()
            .find(|name| std::env::var_os(name.as_str()).is_none())
        {
            Some(missing) => Err(SupervisorError::MissingEnv(missing.clone())),
            None => Ok(()),
        }
    }

    /// The process command. The child inherits stdout and stderr.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}
