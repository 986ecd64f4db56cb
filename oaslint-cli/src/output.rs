use oaslint::{LintReport, Severity, Violation};
use serde::Serialize;
use std::io::{self, Write};

// ANSI color codes
pub struct Colors {
    reset: &'static str,
    bold: &'static str,
    dim: &'static str,
    red: &'static str,
    yellow: &'static str,
    blue: &'static str,
    gray: &'static str,
}

impl Colors {
    #[must_use]
    pub fn new() -> Self {
        // Check if stdout is a TTY (terminal)
        if atty::is(atty::Stream::Stdout) {
            Self {
                reset: "\x1b[0m",
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                red: "\x1b[91m",    // errors
                yellow: "\x1b[93m", // warnings
                blue: "\x1b[94m",   // infos
                gray: "\x1b[90m",   // rule names
            }
        } else {
            Self::plain()
        }
    }

    #[must_use]
    pub fn plain() -> Self {
        Self {
            reset: "",
            bold: "",
            dim: "",
            red: "",
            yellow: "",
            blue: "",
            gray: "",
        }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.red,
            Severity::Warning => self.yellow,
            Severity::Info => self.blue,
        }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self::new()
    }
}

/// Lint results of one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(flatten)]
    pub report: LintReport,
}

/// Writes one block per file with violations, followed by a summary line.
///
/// # Errors
///
/// Returns an error if writing to `out` fails
pub fn render_text<W: Write>(out: &mut W, reports: &[FileReport], colors: &Colors) -> io::Result<()> {
    let mut totals = (0_usize, 0_usize, 0_usize);

    for file in reports {
        totals.0 += file.report.errors.len();
        totals.1 += file.report.warnings.len();
        totals.2 += file.report.infos.len();
        if file.report.is_empty() {
            continue;
        }

        writeln!(out, "{}{}{}", colors.bold, file.file, colors.reset)?;
        for violation in file.report.violations() {
            render_violation(out, violation, colors)?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "{} files checked: {}{} errors{}, {}{} warnings{}, {} infos",
        reports.len(),
        colors.red,
        totals.0,
        colors.reset,
        colors.yellow,
        totals.1,
        colors.reset,
        totals.2
    )
}

fn render_violation<W: Write>(out: &mut W, violation: &Violation, colors: &Colors) -> io::Result<()> {
    let severity = violation.severity.to_string();
    writeln!(
        out,
        "  {}{severity:<8}{} {}{}{}  {} {}({}){}",
        colors.severity_color(violation.severity),
        colors.reset,
        colors.dim,
        violation.dotted_path(),
        colors.reset,
        violation.message,
        colors.gray,
        violation.rule,
        colors.reset
    )
}
