use super::command_table::{CommandTable, TableError};
use super::trouble_code::{TroubleCode, stored_codes_response};

/// Answer an ELM327 gives to a command it does not understand.
pub(crate) const UNKNOWN_COMMAND_FRAME: &[u8] = b"?\r\r>";

const VIN_FIRST_FRAME: &str = "014\n0: 49 02 01 57 56 57\n";
const VIN_SECOND_FRAME: &str = "1: 41 41 37 41 4A 31 43\n2: 57 32 39 30 37 35 33";

/// Builds the default ELM327 v1.5 command table.
///
/// The mode 03 entry reports `codes` as the stored trouble codes.
///
/// # Errors
///
/// Returns an error if the built-in entries are inconsistent.
pub fn elm327_table(codes: &[TroubleCode]) -> Result<CommandTable, TableError> {
    CommandTable::builder()
        // Initialisation burst sent by common OBD apps in one write.
        .entry(
            "ATZ\rATE0\r\r\r\r\r\r\r\r\r",
            ["ATZ\r", "\r\rELM327 v1.5\r\r>"],
        )
        .entry("\r\r", ["\r", "?\r\r>"])
        .entry("ATE0\r", ["ATE0\r", "OK\r\r>"])
        .entry("ATL0\r", ["OK\r\r>"])
        .entry("ATS0\r", ["OK\r\r>"])
        .entry("ATH0\r", ["OK\r\r>"])
        .entry("ATSP0\r", ["OK\r\r>"])
        .entry("ATI\r", ["ELM327 v1.5\r\r>"])
        .entry("AT@1\r", ["OBDII to RS232 Interpreter\r\r>"])
        .entry("0100\r", ["4100BEEA813\r", "\r>"])
        .entry("0105\r", ["41054F\r", "\r>"])
        .entry("010C\r", ["410C1AF8\r", "\r>"])
        .entry("010D\r", ["410D28\r", "\r>"])
        .entry("03\r", [stored_codes_response(codes)])
        .entry(
            "0902\r",
            ["SEAR", "CH", "ING...\r", VIN_FIRST_FRAME, VIN_SECOND_FRAME],
        )
        .fallback(UNKNOWN_COMMAND_FRAME)
        .build()
}
