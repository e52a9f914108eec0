use std::process::{Command, Stdio};

use tracing::{info, warn};

/// Host power-off command run at the end of an unattended session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerOff {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for PowerOff {
    fn default() -> Self {
        Self {
            program: "sudo".to_string(),
            args: vec!["shutdown".to_string(), "now".to_string()],
        }
    }
}

impl PowerOff {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Spawn the command without waiting for it. Returns whether it started.
    pub fn invoke(&self) -> bool {
        match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!(program = %self.program, pid = child.id(), "power-off command started");
                true
            }
            Err(err) => {
                warn!(program = %self.program, error = %err, "power-off command failed to start");
                false
            }
        }
    }
}
