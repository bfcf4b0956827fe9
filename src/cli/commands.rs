use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::command::OutputFormat;
use crate::cli::write_json_line;
use crate::table::{CommandTable, TroubleCode, elm327_table};
use crate::terminal::TerminalClient;

use super::ui::{CommandTableView, Painter};

/// Arguments for the `commands` command.
#[derive(Debug, Default, Args)]
pub struct CommandsArgs {
    /// Diagnostic trouble codes to answer mode `03` with.
    #[arg(value_name = "CODE")]
    codes: Vec<TroubleCode>,
}

impl CommandsArgs {
    #[must_use]
    pub fn new(codes: Vec<TroubleCode>) -> Self {
        Self { codes }
    }
}

/// One command table row as emitted in JSON output.
#[derive(Debug, Serialize)]
struct CommandRecord {
    command: String,
    frames: Vec<String>,
}

/// Executes the `commands` command.
pub(crate) fn run<W>(
    args: &CommandsArgs,
    out: &mut W,
    output_format: OutputFormat,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let table = elm327_table(&args.codes)?;
    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", CommandTableView::new(&table, &painter))?;
        }
        OutputFormat::Json => {
            for record in records(&table) {
                write_json_line(out, &record)?;
            }
        }
    }
    Ok(())
}

fn records(table: &CommandTable) -> Vec<CommandRecord> {
    table
        .iter()
        .map(|(command, sequence)| CommandRecord {
            command: command.to_string(),
            frames: sequence.iter().map(ToString::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn records_keep_table_order() {
        let table = CommandTable::builder()
            .entry("ATE0\r", ["ATE0\r", "OK\r\r>"])
            .entry("0100\r", ["4100BEEA813\r", "\r>"])
            .build()
            .expect("table should build");

        let records = records(&table);

        assert_eq!(2, records.len());
        assert_eq!("ATE0\\r", records[0].command);
        assert_eq!(vec!["ATE0\\r", "OK\\r\\r>"], records[0].frames);
        assert_eq!("0100\\r", records[1].command);
    }
}
