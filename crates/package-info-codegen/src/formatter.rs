//! Content formatters applied to the rendered module
//!
//! A formatter only changes layout. The external formatters pipe the text
//! through `black` or `ruff` on stdin/stdout.

use crate::errors::FormatError;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Settings handed to a formatter before first use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOptions {
    pub line_length: usize,
    /// Working directory for external tools, so they pick up project config
    pub project_root: PathBuf,
}

pub trait ContentFormatter {
    fn init(&mut self, _options: &FormatterOptions) -> Result<(), FormatError> {
        Ok(())
    }

    fn format_content(&self, content: &str) -> Result<String, FormatError>;
}

/// Returns content unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughFormatter;

impl ContentFormatter for PassthroughFormatter {
    fn format_content(&self, content: &str) -> Result<String, FormatError> {
        Ok(content.to_string())
    }
}

/// Trims trailing whitespace, caps blank runs at two lines, ends with one newline.
/// Lines that are part of a triple-quoted string are kept verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizeFormatter;

const TRIPLE_QUOTES: [&str; 2] = ["\"\"\"", "'''"];

/// Triple-quoted string still open after `line`, given the one open before it
fn open_string_after(line: &str, mut open: Option<&'static str>) -> Option<&'static str> {
    let mut rest = line;
    loop {
        match open {
            Some(delimiter) => match rest.find(delimiter) {
                Some(index) => {
                    rest = &rest[index + delimiter.len()..];
                    open = None;
                }
                None => return open,
            },
            None => {
                let next = TRIPLE_QUOTES
                    .iter()
                    .filter_map(|d| rest.find(d).map(|index| (index, *d)))
                    .min_by_key(|(index, _)| *index);
                match next {
                    Some((index, delimiter)) => {
                        rest = &rest[index + delimiter.len()..];
                        open = Some(delimiter);
                    }
                    None => return None,
                }
            }
        }
    }
}

impl ContentFormatter for NormalizeFormatter {
    fn format_content(&self, content: &str) -> Result<String, FormatError> {
        let mut out = String::with_capacity(content.len());
        let mut blank_run = 0usize;
        let mut open = None;

        for raw in content.lines() {
            let open_before = open;
            open = open_string_after(raw, open_before);
            if open_before.is_some() || open.is_some() {
                blank_run = 0;
                out.push_str(raw);
                out.push('\n');
                continue;
            }

            let line = raw.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 2 || out.is_empty() {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }

        while out.ends_with("\n\n") {
            out.pop();
        }
        if out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Which external tool a [`CommandFormatter`] drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTool {
    Black,
    Ruff,
}

impl ExternalTool {
    pub fn program(self) -> &'static str {
        match self {
            ExternalTool::Black => "black",
            ExternalTool::Ruff => "ruff",
        }
    }

    fn args(self, line_length: usize) -> Vec<String> {
        let line_length = line_length.to_string();
        match self {
            ExternalTool::Black => vec![
                "--quiet".to_string(),
                "--line-length".to_string(),
                line_length,
                "-".to_string(),
            ],
            ExternalTool::Ruff => vec![
                "format".to_string(),
                "--line-length".to_string(),
                line_length,
                "-".to_string(),
            ],
        }
    }
}

/// Runs an external formatter over stdin/stdout
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    tool: ExternalTool,
    options: Option<FormatterOptions>,
}

impl CommandFormatter {
    pub fn new(tool: ExternalTool) -> Self {
        Self {
            tool,
            options: None,
        }
    }

    pub fn black() -> Self {
        Self::new(ExternalTool::Black)
    }

    pub fn ruff() -> Self {
        Self::new(ExternalTool::Ruff)
    }

    pub fn command_line(&self) -> Vec<String> {
        let line_length = self
            .options
            .as_ref()
            .map_or(crate::DEFAULT_LINE_LENGTH, |o| o.line_length);
        let mut line = vec![self.tool.program().to_string()];
        line.extend(self.tool.args(line_length));
        line
    }
}

impl ContentFormatter for CommandFormatter {
    fn init(&mut self, options: &FormatterOptions) -> Result<(), FormatError> {
        self.options = Some(options.clone());
        Ok(())
    }

    fn format_content(&self, content: &str) -> Result<String, FormatError> {
        let program = self.tool.program();
        let command_line = self.command_line();
        debug!("Running formatter: {}", command_line.join(" "));

        let executable =
            which::which(program).map_err(|_| FormatError::NotFound(program.to_string()))?;
        let mut command = Command::new(executable);
        command
            .args(&command_line[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(options) = &self.options {
            command.current_dir(&options.project_root);
        }

        let mut child = command.spawn().map_err(|source| FormatError::Spawn {
            program: program.to_string(),
            source,
        })?;

        // stdin is fed from its own thread while we drain stdout
        let writer = child.stdin.take().map(|mut stdin| {
            let input = content.to_string();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(result) => result?,
                Err(_) => {
                    return Err(FormatError::Failed {
                        program: program.to_string(),
                        status: "stdin writer panicked".to_string(),
                        stderr: String::new(),
                    })
                }
            }
        }

        if !output.status.success() {
            return Err(FormatError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput(program.to_string()))
    }
}
