use std::io;

use anyhow::Result;
use serde::Serialize;

pub(crate) mod command;
pub(crate) mod commands;
pub(crate) mod replay;
pub(crate) mod serve;
pub(crate) mod ui;

pub use self::command::{Args, Command, EmulationArgs, LogLevel, OutputFormat, OverlapArg};
pub use self::commands::CommandsArgs;
pub use self::replay::ReplayArgs;
pub use self::serve::ServeArgs;

/// Writes one JSON document followed by a newline.
pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
