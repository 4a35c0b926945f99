//! Colored terminal presentation of run events

use colored::Colorize;
use rebalance_core::{Reporter, RunEvent, Severity};

/// Prints run events, one line each.
///
/// Per-step detail (copy, verify, replace, record) is only shown when
/// `detailed` is set. Warnings and errors go to stderr; with `to_stderr`
/// every line does, so stdout can carry machine-readable output.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    detailed: bool,
    to_stderr: bool,
}

impl ConsoleReporter {
    pub fn new(detailed: bool, to_stderr: bool) -> Self {
        Self {
            detailed,
            to_stderr,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &RunEvent<'_>) {
        if !self.detailed && is_step_detail(event) {
            return;
        }

        let message = event.to_string();
        let line = match (event.severity(), event) {
            (Severity::Error, _) => format!("{} {}", "error:".red().bold(), message.red()),
            (Severity::Warn, _) => format!("{} {}", "warning:".yellow().bold(), message),
            (Severity::Info, RunEvent::Started { .. } | RunEvent::Finished { .. }) => {
                message.green().bold().to_string()
            }
            (Severity::Info, RunEvent::Progress { .. }) => message.cyan().to_string(),
            (Severity::Info, _) => message.dimmed().to_string(),
        };

        if self.to_stderr || event.severity() > Severity::Info {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

fn is_step_detail(event: &RunEvent<'_>) -> bool {
    matches!(
        event,
        RunEvent::Copying { .. }
            | RunEvent::Verifying { .. }
            | RunEvent::Replacing { .. }
            | RunEvent::Recorded { .. }
            | RunEvent::Rebalanced { .. }
    )
}
