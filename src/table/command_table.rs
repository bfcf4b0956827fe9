use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;
use tracing::instrument;

use super::frame::{CommandFrame, ResponseFrame, ResponseSequence};
use crate::utils::escape_frame;

/// Errors returned while building a command table.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TableError {
    #[error("command `{command}` has no response frames")]
    EmptySequence { command: String },
    #[error("command `{command}` is defined more than once")]
    DuplicateCommand { command: String },
}

/// Immutable mapping from exact command frames to their ordered response frames.
///
/// Lookups are byte-exact: no case folding, trimming or prefix matching is applied, so
/// `atz\r` and `ATZ` both miss an `ATZ\r` entry.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: IndexMap<CommandFrame, ResponseSequence>,
    fallback: Option<ResponseFrame>,
}

impl CommandTable {
    /// Starts building a command table.
    ///
    /// ```
    /// let table = carmock::CommandTable::builder()
    ///     .entry("ATZ\r", ["OK\r\r>"])
    ///     .build()?;
    /// assert!(table.lookup(b"ATZ\r").is_some());
    /// # Ok::<(), carmock::TableError>(())
    /// ```
    #[must_use]
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::default()
    }

    /// Returns the response sequence for an exact command frame.
    #[must_use]
    #[instrument(skip(self, frame), level = "trace", fields(frame = %escape_frame(frame)))]
    pub fn lookup(&self, frame: &[u8]) -> Option<&ResponseSequence> {
        self.entries.get(frame)
    }

    /// Returns the frame sent once in answer to an unknown command, if the table defines one.
    #[must_use]
    pub fn fallback(&self) -> Option<&ResponseFrame> {
        self.fallback.as_ref()
    }

    /// Returns the number of commands in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table has no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = (&CommandFrame, &ResponseSequence)> {
        self.entries.iter()
    }
}

/// Accumulates table entries and validates them on `build`.
#[derive(Debug, Default)]
pub struct CommandTableBuilder {
    entries: Vec<(CommandFrame, Vec<ResponseFrame>)>,
    fallback: Option<ResponseFrame>,
}

impl CommandTableBuilder {
    /// Adds one command and its response frames in delivery order.
    #[must_use]
    pub fn entry<I, F>(mut self, command: impl AsRef<[u8]>, frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        let frames = frames
            .into_iter()
            .map(|frame| ResponseFrame::new(frame.as_ref()))
            .collect();
        self.entries
            .push((CommandFrame::new(command.as_ref()), frames));
        self
    }

    /// Sets the frame answered once for unknown commands.
    #[must_use]
    pub fn fallback(mut self, frame: impl AsRef<[u8]>) -> Self {
        self.fallback = Some(ResponseFrame::new(frame.as_ref()));
        self
    }

    /// Validates the entries and freezes the table.
    ///
    /// # Errors
    ///
    /// Returns an error when a command has no frames or appears twice.
    pub fn build(self) -> Result<CommandTable, TableError> {
        let mut entries = IndexMap::with_capacity(self.entries.len());
        for (command, frames) in self.entries {
            let Some(sequence) = ResponseSequence::new(frames) else {
                return Err(TableError::EmptySequence {
                    command: command.to_string(),
                });
            };
            match entries.entry(command) {
                Entry::Occupied(occupied) => {
                    return Err(TableError::DuplicateCommand {
                        command: occupied.key().to_string(),
                    });
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(sequence);
                }
            }
        }

        Ok(CommandTable {
            entries,
            fallback: self.fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn table() -> CommandTable {
        CommandTable::builder()
            .entry("ATZ\r", ["OK\r\r>"])
            .entry("0100\r", ["4100BEEA813\r", "\r>"])
            .build()
            .expect("table should build")
    }

    #[test]
    fn lookup_returns_frames_in_authored_order() {
        let table = table();
        let sequence = table.lookup(b"0100\r").expect("0100 should be known");

        let frames: Vec<&[u8]> = sequence.iter().map(ResponseFrame::as_bytes).collect();
        assert_eq!(vec![&b"4100BEEA813\r"[..], &b"\r>"[..]], frames);
    }

    #[rstest]
    #[case::lower_case(b"atz\r".as_slice())]
    #[case::missing_terminator(b"ATZ".as_slice())]
    #[case::extra_whitespace(b" ATZ\r".as_slice())]
    #[case::crlf(b"ATZ\r\n".as_slice())]
    #[case::prefix(b"AT".as_slice())]
    fn lookup_is_byte_exact(#[case] frame: &[u8]) {
        assert_eq!(None, table().lookup(frame));
    }

    #[test]
    fn build_rejects_empty_sequence() {
        let result = CommandTable::builder()
            .entry("ATZ\r", Vec::<&str>::new())
            .build();
        assert_matches!(
            result,
            Err(TableError::EmptySequence { command }) if command == "ATZ\\r"
        );
    }

    #[test]
    fn build_rejects_duplicate_commands() {
        let result = CommandTable::builder()
            .entry("ATZ\r", ["OK\r\r>"])
            .entry("ATZ\r", ["ELM327 v1.5\r\r>"])
            .build();
        assert_matches!(result, Err(TableError::DuplicateCommand { .. }));
    }

    #[test]
    fn iter_preserves_authoring_order() {
        let commands: Vec<String> = table().iter().map(|(command, _)| command.to_string()).collect();
        assert_eq!(vec!["ATZ\\r".to_string(), "0100\\r".to_string()], commands);
    }

    #[test]
    fn fallback_is_optional() {
        assert_eq!(None, table().fallback());

        let with_fallback = CommandTable::builder()
            .entry("ATZ\r", ["OK\r\r>"])
            .fallback("?\r\r>")
            .build()
            .expect("table should build");
        assert_eq!(
            Some(&ResponseFrame::from("?\r\r>")),
            with_fallback.fallback()
        );
    }
}
