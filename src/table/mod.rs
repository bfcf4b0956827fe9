mod command_table;
mod elm327;
mod frame;
mod trouble_code;

pub use self::command_table::{CommandTable, CommandTableBuilder, TableError};
pub use self::elm327::elm327_table;
pub(crate) use self::elm327::UNKNOWN_COMMAND_FRAME;
pub use self::frame::{CommandFrame, FrameLiteral, FrameLiteralError, ResponseFrame, ResponseSequence};
pub use self::trouble_code::{TroubleCode, TroubleCodeError, TroubleSystem};
pub(crate) use self::trouble_code::identity_text;
