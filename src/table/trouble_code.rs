use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// Errors returned when parsing a diagnostic trouble code.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TroubleCodeError {
    #[error("trouble code `{value}` must be exactly five characters")]
    InvalidLength { value: String },
    #[error("trouble code `{value}` must start with P, C, B or U")]
    InvalidSystem { value: String },
    #[error("trouble code `{value}` must have 0-3 as its second character")]
    InvalidCategory { value: String },
    #[error("trouble code `{value}` must end with three hexadecimal digits")]
    InvalidFault { value: String },
}

/// Vehicle system a trouble code belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TroubleSystem {
    Powertrain,
    Chassis,
    Body,
    Network,
}

impl TroubleSystem {
    fn letter(self) -> char {
        match self {
            Self::Powertrain => 'P',
            Self::Chassis => 'C',
            Self::Body => 'B',
            Self::Network => 'U',
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Powertrain => 0b00,
            Self::Chassis => 0b01,
            Self::Body => 0b10,
            Self::Network => 0b11,
        }
    }
}

/// A five-character SAE J2012 diagnostic trouble code such as `P0301`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TroubleCode {
    system: TroubleSystem,
    category: u8,
    fault: u16,
}

impl TroubleCode {
    /// Returns the vehicle system.
    #[must_use]
    pub fn system(self) -> TroubleSystem {
        self.system
    }

    /// Encodes the code as the two bytes an adapter reports in a mode 03 answer.
    #[must_use]
    pub fn to_bytes(self) -> [u8; 2] {
        let high = (self.system.bits() << 6) | (self.category << 4) | ((self.fault >> 8) as u8);
        [high, (self.fault & 0xFF) as u8]
    }
}

impl Display for TroubleCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{:03X}",
            self.system.letter(),
            self.category,
            self.fault
        )
    }
}

impl FromStr for TroubleCode {
    type Err = TroubleCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_uppercase();
        let chars: Vec<char> = normalised.chars().collect();
        if chars.len() != 5 {
            return Err(TroubleCodeError::InvalidLength {
                value: value.to_string(),
            });
        }

        let system = match chars[0] {
            'P' => TroubleSystem::Powertrain,
            'C' => TroubleSystem::Chassis,
            'B' => TroubleSystem::Body,
            'U' => TroubleSystem::Network,
            _ => {
                return Err(TroubleCodeError::InvalidSystem {
                    value: value.to_string(),
                });
            }
        };
        let category = chars[1]
            .to_digit(4)
            .ok_or_else(|| TroubleCodeError::InvalidCategory {
                value: value.to_string(),
            })?;
        if !chars[2..].iter().all(char::is_ascii_hexdigit) {
            return Err(TroubleCodeError::InvalidFault {
                value: value.to_string(),
            });
        }
        let fault = u16::from_str_radix(&normalised[2..], 16).map_err(|_| {
            TroubleCodeError::InvalidFault {
                value: value.to_string(),
            }
        })?;

        Ok(Self {
            system,
            category: category as u8,
            fault,
        })
    }
}

/// Renders the identity string served to read requests: codes joined by `,`.
pub(crate) fn identity_text(codes: &[TroubleCode]) -> String {
    codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the mode 03 (stored trouble codes) answer for a set of codes.
pub(crate) fn stored_codes_response(codes: &[TroubleCode]) -> String {
    let count = u8::try_from(codes.len()).unwrap_or(u8::MAX);
    let encoded: String = codes
        .iter()
        .take(usize::from(count))
        .map(|code| hex::encode_upper(code.to_bytes()))
        .collect();
    format!("43{count:02X}{encoded}\r\r>")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("P0301", [0x03, 0x01])]
    #[case("C1234", [0x52, 0x34])]
    #[case("B0001", [0x80, 0x01])]
    #[case("U3FFF", [0xFF, 0xFF])]
    fn to_bytes_matches_j2012_encoding(#[case] code: &str, #[case] expected: [u8; 2]) {
        let parsed: TroubleCode = code.parse().expect("code should parse");
        assert_eq!(expected, parsed.to_bytes());
    }

    #[test]
    fn parse_normalises_case_and_round_trips_display() {
        let parsed: TroubleCode = "p0a1f".parse().expect("lower-case code should parse");
        assert_eq!("P0A1F", parsed.to_string());
    }

    #[rstest]
    #[case("P030")]
    #[case("P03011")]
    fn parse_rejects_wrong_length(#[case] code: &str) {
        assert_matches!(
            code.parse::<TroubleCode>(),
            Err(TroubleCodeError::InvalidLength { .. })
        );
    }

    #[test]
    fn parse_rejects_unknown_system() {
        assert_matches!(
            "X0301".parse::<TroubleCode>(),
            Err(TroubleCodeError::InvalidSystem { .. })
        );
    }

    #[test]
    fn parse_rejects_out_of_range_category() {
        assert_matches!(
            "P4301".parse::<TroubleCode>(),
            Err(TroubleCodeError::InvalidCategory { .. })
        );
    }

    #[test]
    fn parse_rejects_non_hex_fault() {
        assert_matches!(
            "P03G1".parse::<TroubleCode>(),
            Err(TroubleCodeError::InvalidFault { .. })
        );
    }

    #[test]
    fn stored_codes_response_lists_count_and_codes() {
        let codes: Vec<TroubleCode> = ["P0301", "P0420"]
            .iter()
            .map(|code| code.parse().expect("code should parse"))
            .collect();
        assert_eq!("430203010420\r\r>", stored_codes_response(&codes));
        assert_eq!("P0301,P0420", identity_text(&codes));
    }

    #[test]
    fn stored_codes_response_without_codes() {
        assert_eq!("4300\r\r>", stored_codes_response(&[]));
        assert_eq!("", identity_text(&[]));
    }
}
