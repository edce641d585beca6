//! Output formatting for build results.

use crate::cli::OutputFormat;
use crate::orchestrator::BuildSummary;
use bundler_host::{Message, OutputModule};

/// Severity of a build message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Formatter for build output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a build message.
    pub fn print_message(&self, severity: Severity, message: &Message) {
        println!("{}", self.format_message(severity, message));
    }

    /// Print a generated module.
    pub fn print_module(&self, module: &OutputModule) {
        println!("{}", self.format_module(module));
    }

    /// Print the summary.
    pub fn print_summary(&self, summary: &BuildSummary) {
        if self.format == OutputFormat::Human {
            println!();
        }
        println!("{}", self.format_summary(summary));
    }

    pub fn format_message(&self, severity: Severity, message: &Message) -> String {
        match self.format {
            OutputFormat::Human => {
                let severity_str = match severity {
                    Severity::Error => "\x1b[31merror\x1b[0m",
                    Severity::Warning => "\x1b[33mwarning\x1b[0m",
                };
                format!("{}: {}", severity_str, message.format())
            }
            OutputFormat::Json => serde_json::json!({
                "type": "message",
                "severity": severity.as_str(),
                "file": message.file(),
                "namespace": message.location.as_ref().map(|l| l.namespace.as_str()),
                "plugin": message.plugin_name,
                "message": message.text,
            })
            .to_string(),
        }
    }

    pub fn format_module(&self, module: &OutputModule) -> String {
        match self.format {
            OutputFormat::Human => format!(
                "\x1b[36m// {}:{} ({})\x1b[0m\n{}",
                module.namespace,
                module.path,
                module.loader.as_str(),
                module.contents.trim_end()
            ),
            OutputFormat::Json => serde_json::json!({
                "type": "module",
                "namespace": module.namespace,
                "path": module.path,
                "loader": module.loader,
                "contents": module.contents,
            })
            .to_string(),
        }
    }

    pub fn format_summary(&self, summary: &BuildSummary) -> String {
        match self.format {
            OutputFormat::Human => {
                let mut lines = Vec::new();
                if summary.error_count == 0 && summary.warning_count == 0 {
                    lines.push(format!(
                        "\x1b[32m✓\x1b[0m Built {} entries into {} modules ({}ms)",
                        summary.entry_count, summary.module_count, summary.duration_ms
                    ));
                } else {
                    if summary.error_count > 0 {
                        lines.push(format!(
                            "\x1b[31m✗\x1b[0m Found {} error{} in {} entries",
                            summary.error_count,
                            plural(summary.error_count),
                            summary.entry_count
                        ));
                    }
                    if summary.warning_count > 0 {
                        lines.push(format!(
                            "\x1b[33m⚠\x1b[0m Found {} warning{}",
                            summary.warning_count,
                            plural(summary.warning_count)
                        ));
                    }
                    lines.push(format!("Time: {}ms", summary.duration_ms));
                }
                lines.join("\n")
            }
            OutputFormat::Json => serde_json::json!({
                "type": "summary",
                "entries": summary.entry_count,
                "modules": summary.module_count,
                "errors": summary.error_count,
                "warnings": summary.warning_count,
                "duration_ms": summary.duration_ms,
            })
            .to_string(),
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
