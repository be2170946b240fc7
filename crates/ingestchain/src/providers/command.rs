use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::CommandTemplate;
use crate::error::StepError;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external tool described by a [`CommandTemplate`].
#[derive(Debug, Clone)]
pub struct CommandRunner {
    template: CommandTemplate,
}

impl CommandRunner {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }

    pub fn program(&self) -> &str {
        &self.template.program
    }

    /// Arguments with `{input}` and `{output}` substituted.
    pub fn render_args(&self, input: &str, output: &str) -> Vec<String> {
        self.template
            .args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, input)
                    .replace(OUTPUT_PLACEHOLDER, output)
            })
            .collect()
    }

    /// Runs the tool and returns its stdout. A non-zero exit status is an
    /// error carrying stderr.
    pub fn run(&self, input: &str, output: &str) -> Result<String, StepError> {
        let args = self.render_args(input, output);
        debug!("Running {} {:?}", self.template.program, args);

        let result = Command::new(&self.template.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.tool_error(format!("failed to start: {}", e)))?;

        if !result.status.success() {
            return Err(self.tool_error(format!(
                "exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&result.stdout).to_string())
    }

    /// Runs the tool with `data` piped to its stdin.
    pub fn run_with_stdin(&self, data: &[u8]) -> Result<String, StepError> {
        let args = self.render_args("-", "-");
        debug!("Piping {} bytes to {}", data.len(), self.template.program);

        let mut child = Command::new(&self.template.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.tool_error(format!("failed to start: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data)
                .map_err(|e| self.tool_error(format!("failed to write stdin: {}", e)))?;
        }

        let result = child
            .wait_with_output()
            .map_err(|e| self.tool_error(e.to_string()))?;

        if !result.status.success() {
            return Err(self.tool_error(format!(
                "exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&result.stdout).to_string())
    }

    fn tool_error(&self, message: String) -> StepError {
        StepError::Tool {
            tool: self.template.program.clone(),
            message,
        }
    }
}
