mod command_table_view;
mod painter;
mod replay_view;
mod serve_view;
mod table;

pub(crate) use self::command_table_view::CommandTableView;
pub(crate) use self::painter::Painter;
pub(crate) use self::replay_view::{ReplayStepView, ReplaySummaryView};
pub(crate) use self::serve_view::{ServeReadyView, ServeSummaryView};
