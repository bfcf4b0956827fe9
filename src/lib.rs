mod app;
mod cli;
mod engine;
mod error;
mod protocol;
mod table;
mod telemetry;
mod terminal;
mod transport;
mod utils;

pub use app::{run, run_with_clients, run_with_log_level};
pub use cli::{
    Args, Command, CommandsArgs, EmulationArgs, LogLevel, OutputFormat, OverlapArg, ReplayArgs,
    ServeArgs,
};
pub use engine::{
    DEFAULT_FRAME_INTERVAL, EngineConfig, MalformedWritePolicy, OverlapPolicy, SequenceId,
    Session, SessionEngine,
};
pub use error::{EmulatorError, EngineError, TransportError};
pub use protocol::{DEFAULT_LOCAL_NAME, MAX_LOCAL_NAME_LEN};
pub use table::{
    CommandFrame, CommandTable, CommandTableBuilder, FrameLiteral, FrameLiteralError,
    ResponseFrame, ResponseSequence, TableError, TroubleCode, TroubleCodeError, TroubleSystem,
    elm327_table,
};
pub use terminal::TerminalClient;
pub use transport::{
    Advertisement, AttStatus, DEFAULT_BIND_ADDRESS, Notifier, Peripheral, PeripheralAdapter,
    RecordedNotification, RecordingNotifier, ServeSummary, TcpPeripheral, WriteReply,
};
