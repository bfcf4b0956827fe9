use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

use humantime::format_duration;
use serde::Serialize;

use crate::engine::SessionEngine;
use crate::protocol;
use crate::transport::{Advertisement, ServeSummary};
use crate::utils::escape_frame;

use super::painter::Painter;
use super::table::Table;

/// Machine-readable form of [`ServeReadyView`].
#[derive(Debug, Serialize)]
pub(crate) struct ServeReadyRecord {
    address: String,
    local_name: String,
    service_uuid: &'static str,
    characteristic_uuid: &'static str,
    frame_interval: String,
    overlap_policy: String,
    commands: usize,
    identity: String,
}

/// Renders the adapter details once the transport is listening.
pub(crate) struct ServeReadyView<'a> {
    address: SocketAddr,
    advertisement: &'a Advertisement,
    engine: &'a SessionEngine,
    painter: &'a Painter,
}

impl<'a> ServeReadyView<'a> {
    pub(crate) fn new(
        address: SocketAddr,
        advertisement: &'a Advertisement,
        engine: &'a SessionEngine,
        painter: &'a Painter,
    ) -> Self {
        Self {
            address,
            advertisement,
            engine,
            painter,
        }
    }

    pub(crate) fn record(&self) -> ServeReadyRecord {
        let config = self.engine.config();
        ServeReadyRecord {
            address: self.address.to_string(),
            local_name: self.advertisement.local_name().to_string(),
            service_uuid: self.advertisement.service_uuid(),
            characteristic_uuid: self.advertisement.characteristic_uuid(),
            frame_interval: format_duration(config.frame_interval()).to_string(),
            overlap_policy: config.overlap_policy().to_string(),
            commands: self.engine.table().len(),
            identity: escape_frame(self.engine.on_read_requested()),
        }
    }
}

impl Display for ServeReadyView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let record = self.record();
        let identity = if record.identity.is_empty() {
            self.painter.muted("<empty>")
        } else {
            self.painter.frame(&record.identity)
        };
        let table = Table::key_value(
            self.painter,
            vec![
                ("address", self.painter.value(&record.address)),
                ("local_name", self.painter.value(&record.local_name)),
                ("frame_interval", record.frame_interval),
                ("overlap", record.overlap_policy),
                ("commands", record.commands.to_string()),
                ("identity", identity),
            ],
        );

        let endpoints = Table::grid(
            ["endpoint", "uuid", "properties"],
            protocol::endpoints()
                .map(|endpoint| {
                    let properties = endpoint
                        .properties()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    vec![
                        endpoint.name().to_string(),
                        self.painter.value(endpoint.uuid()),
                        properties,
                    ]
                })
                .collect(),
        );

        write!(f, "{}", self.painter.heading("Emulated adapter:"))?;
        write!(f, "\n{table}")?;
        write!(f, "\n{endpoints}")
    }
}

/// Renders the counters reported after serving stops.
pub(crate) struct ServeSummaryView<'a> {
    summary: &'a ServeSummary,
    painter: &'a Painter,
}

impl<'a> ServeSummaryView<'a> {
    pub(crate) fn new(summary: &'a ServeSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ServeSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let refused = if self.summary.refused() > 0 {
            self.painter
                .failure(format!("{} refused", self.summary.refused()))
        } else {
            self.painter.muted("0 refused")
        };
        write!(
            f,
            "{} {} {}, {}, {}",
            self.painter.heading("Stopped:"),
            self.painter.value(format!(
                "{} connection(s)",
                self.summary.connections()
            )),
            refused,
            self.painter
                .muted(format!("{} write(s)", self.summary.writes())),
            self.painter.muted(format!("{} read(s)", self.summary.reads())),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::engine::EngineConfig;
    use crate::table::elm327_table;
    use crate::transport::RecordingNotifier;

    #[tokio::test]
    async fn ready_view_lists_endpoints_with_properties() {
        let table = std::sync::Arc::new(elm327_table(&[]).expect("default table should build"));
        let engine = SessionEngine::start(
            EngineConfig::default(),
            table,
            std::sync::Arc::new(RecordingNotifier::default()),
        );
        let advertisement = Advertisement::default();
        let painter = Painter::new(false);
        let address: SocketAddr = "127.0.0.1:35000".parse().expect("address should parse");

        let rendered = ServeReadyView::new(address, &advertisement, &engine, &painter).to_string();

        assert!(rendered.starts_with("Emulated adapter:"));
        assert!(rendered.contains("4F9289BC-7CCE-45B4-AD12-4D142BF62C28"));
        assert!(rendered.contains("write,read,notify"));
        assert!(rendered.contains("OBD-II command/response"));
    }

    #[test]
    fn summary_lists_counters_without_colour() {
        let summary = ServeSummary {
            connections: 2,
            refused: 1,
            writes: 7,
            reads: 3,
        };
        let painter = Painter::new(false);

        assert_eq!(
            "Stopped: 2 connection(s) 1 refused, 7 write(s), 3 read(s)",
            ServeSummaryView::new(&summary, &painter).to_string()
        );
    }
}
