//! Console output for messages that are not part of a report.
//!
//! Reports (banners, status lines, `Regenerating ...`) go to the writer the
//! command was given. Everything here goes to stderr so that a redirected
//! report stays clean.

use colored::Colorize;

/// Prints `ERROR: <message>` with a bold red prefix.
pub fn error(message: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), message);
}

/// Prints `WARNING: <message>` with a bold yellow prefix.
pub fn warning(message: &str) {
    eprintln!("{} {}", "WARNING:".yellow().bold(), message);
}
