use std::fmt::{self, Display, Formatter};

use crate::table::CommandTable;

use super::painter::Painter;
use super::table::Table;

/// Renders every command of a table with its response frames in delivery order.
pub(crate) struct CommandTableView<'a> {
    table: &'a CommandTable,
    painter: &'a Painter,
}

impl<'a> CommandTableView<'a> {
    pub(crate) fn new(table: &'a CommandTable, painter: &'a Painter) -> Self {
        Self { table, painter }
    }
}

impl Display for CommandTableView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .table
            .iter()
            .map(|(command, sequence)| {
                let frames = sequence
                    .iter()
                    .map(|frame| self.painter.frame(frame.to_string()))
                    .collect::<Vec<_>>()
                    .join("\n");
                vec![
                    self.painter.value(command.to_string()),
                    sequence.len().to_string(),
                    frames,
                ]
            })
            .collect();
        let grid = Table::grid(["command", "count", "frames"], rows);

        write!(f, "{}", self.painter.heading("Command table:"))?;
        write!(f, "\n{grid}")?;
        if let Some(fallback) = self.table.fallback() {
            write!(
                f,
                "\n{} {}",
                self.painter.muted("unknown commands:"),
                self.painter.frame(fallback.to_string())
            )?;
        }
        Ok(())
    }
}
