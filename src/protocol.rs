use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Longest local name the advertisement packet leaves room for.
pub const MAX_LOCAL_NAME_LEN: usize = 8;

/// Local name advertised when none is configured.
pub const DEFAULT_LOCAL_NAME: &str = "CarMock";

/// GATT endpoints exposed by the emulated adapter.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumIter)]
pub(crate) enum EndpointId {
    /// Primary service carrying the adapter characteristic.
    AdapterService,
    /// Characteristic accepting command writes, serving reads and sending notifications.
    AdapterCharacteristic,
}

/// Operations a characteristic supports.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub(crate) enum CharacteristicProperty {
    #[strum(to_string = "write")]
    Write,
    #[strum(to_string = "read")]
    Read,
    #[strum(to_string = "notify")]
    Notify,
}

/// Descriptive metadata for one endpoint.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct EndpointMetadata {
    name: &'static str,
    uuid: &'static str,
    properties: &'static [CharacteristicProperty],
}

impl EndpointMetadata {
    /// Human-readable endpoint name.
    #[must_use]
    pub(crate) fn name(self) -> &'static str {
        self.name
    }

    /// Endpoint UUID.
    #[must_use]
    pub(crate) fn uuid(self) -> &'static str {
        self.uuid
    }

    /// Characteristic properties; empty for services.
    #[must_use]
    pub(crate) fn properties(self) -> &'static [CharacteristicProperty] {
        self.properties
    }
}

/// Returns metadata for one endpoint.
pub(crate) fn endpoint_metadata(endpoint: EndpointId) -> EndpointMetadata {
    match endpoint {
        EndpointId::AdapterService => EndpointMetadata {
            name: "OBD-II adapter service",
            uuid: "4F9289BC-7CCE-45B4-AD12-4D142BF62C28",
            properties: &[],
        },
        EndpointId::AdapterCharacteristic => EndpointMetadata {
            name: "OBD-II command/response",
            uuid: "F411CC51-B103-412F-B503-6A2432B5B7AE",
            properties: &[
                CharacteristicProperty::Write,
                CharacteristicProperty::Read,
                CharacteristicProperty::Notify,
            ],
        },
    }
}

/// Metadata for every endpoint, service first.
pub(crate) fn endpoints() -> impl Iterator<Item = EndpointMetadata> {
    EndpointId::iter().map(endpoint_metadata)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn adapter_characteristic_supports_write_read_notify() {
        let characteristic = endpoint_metadata(EndpointId::AdapterCharacteristic);
        assert_eq!(
            "write,read,notify",
            characteristic
                .properties()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        );
    }

    #[test]
    fn endpoints_list_service_before_characteristic() {
        let names: Vec<_> = endpoints().map(EndpointMetadata::name).collect();
        assert_eq!(
            vec!["OBD-II adapter service", "OBD-II command/response"],
            names
        );
    }

    #[test]
    fn service_uuid_matches_advertised_service() {
        let service = endpoint_metadata(EndpointId::AdapterService);
        assert_eq!("4F9289BC-7CCE-45B4-AD12-4D142BF62C28", service.uuid());
        assert!(service.properties().is_empty());
    }
}
