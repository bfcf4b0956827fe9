use std::fmt::{self, Display, Formatter};

use humantime::format_duration;

use crate::cli::replay::{ReplayStep, ReplaySummary};
use crate::utils::format_hex;

use super::painter::Painter;
use super::table::Table;

/// Renders one replayed command and the notifications it produced.
pub(crate) struct ReplayStepView<'a> {
    index: usize,
    step: &'a ReplayStep,
    painter: &'a Painter,
}

impl<'a> ReplayStepView<'a> {
    pub(crate) fn new(index: usize, step: &'a ReplayStep, painter: &'a Painter) -> Self {
        Self {
            index,
            step,
            painter,
        }
    }
}

impl Display for ReplayStepView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = match (self.step.sequence(), self.step.error()) {
            (Some(sequence), _) => self.painter.success(format!("sequence {sequence}")),
            (None, Some(error)) => self.painter.failure(error),
            (None, None) => self.painter.muted("no sequence"),
        };
        write!(
            f,
            "{} {} {}",
            self.painter.muted(format!("[{:04}]", self.index)),
            self.painter.frame(self.step.command()),
            status
        )?;

        for notification in self.step.notifications() {
            write!(
                f,
                "\n  {} {} {}",
                self.painter
                    .muted(format!("+{}", format_duration(notification.offset()))),
                self.painter.frame(notification.text()),
                self.painter
                    .muted(format!("raw={}", format_hex(notification.bytes())))
            )?;
        }
        Ok(())
    }
}

/// Renders the session state at the end of a replay.
pub(crate) struct ReplaySummaryView<'a> {
    summary: &'a ReplaySummary,
    painter: &'a Painter,
}

impl<'a> ReplaySummaryView<'a> {
    pub(crate) fn new(summary: &'a ReplaySummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ReplaySummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let identity = if self.summary.identity().is_empty() {
            self.painter.muted("<empty>")
        } else {
            self.painter.frame(self.summary.identity())
        };
        let table = Table::key_value(
            self.painter,
            vec![
                ("commands", self.summary.commands().to_string()),
                ("notifications", self.summary.notifications().to_string()),
                ("pending_value", self.painter.frame(self.summary.pending_value())),
                ("identity", identity),
            ],
        );
        write!(f, "{}", self.painter.heading("Session:"))?;
        write!(f, "\n{table}")
    }
}
