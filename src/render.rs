// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use colorful::Colorful;

use crate::compare::{Entry, Field, ReproducibilityReport};

/// How emphasis is applied to rendered text.
pub trait Style {
    fn heading(&self, text: &str) -> String;
    fn good(&self, text: &str) -> String;
    fn bad(&self, text: &str) -> String;
}

/// No escape codes; for pipes, files and other non-interactive consumers.
pub struct Plain;

impl Style for Plain {
    fn heading(&self, text: &str) -> String {
        text.to_string()
    }

    fn good(&self, text: &str) -> String {
        text.to_string()
    }

    fn bad(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Terminal colors.
pub struct Colored;

impl Style for Colored {
    fn heading(&self, text: &str) -> String {
        format!("{}", text.bold())
    }

    fn good(&self, text: &str) -> String {
        format!("{}", text.green())
    }

    fn bad(&self, text: &str) -> String {
        format!("{}", text.red())
    }
}

/// Entries that should be shown. MRSIGNER is private unless asked for.
pub fn visible(report: &ReproducibilityReport, show_signer: bool) -> Vec<Entry> {
    report
        .entries()
        .into_iter()
        .filter(|e| show_signer || e.field != Field::MrSigner)
        .collect()
}

pub struct Text<'a> {
    report: &'a ReproducibilityReport,
    show_signer: bool,
    style: &'a dyn Style,
}

impl<'a> Text<'a> {
    pub fn new(report: &'a ReproducibilityReport, show_signer: bool, style: &'a dyn Style) -> Self {
        Self {
            report,
            show_signer,
            style,
        }
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.style.heading("Reproducibility Report"))?;
        writeln!(f, "{}", self.style.heading("----------------------"))?;

        for entry in visible(self.report, self.show_signer) {
            let matches = entry.matches.to_string();
            let computed = entry.computed.to_string();

            writeln!(f, "{}", self.style.heading(&format!("{}:", entry.field)))?;
            if entry.matches {
                writeln!(f, "   matches: {}", self.style.good(&matches))?;
                writeln!(f, "   expected: {}", entry.expected)?;
                writeln!(f, "   computed: {}", computed)?;
            } else {
                writeln!(f, "   matches: {}", self.style.bad(&matches))?;
                writeln!(f, "   expected: {}", entry.expected)?;
                writeln!(f, "   computed: {}", self.style.bad(&computed))?;
            }
        }

        Ok(())
    }
}

pub fn text(report: &ReproducibilityReport, show_signer: bool, style: &dyn Style) -> String {
    Text::new(report, show_signer, style).to_string()
}

pub fn json(report: &ReproducibilityReport, show_signer: bool) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&visible(report, show_signer))
}
