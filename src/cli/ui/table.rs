use std::fmt::{self, Display, Formatter};

use tabled::builder::Builder;
use tabled::settings::Style as TableStyle;

use super::painter::Painter;

/// Rounded terminal table rendered through `Display`.
#[derive(Debug)]
pub(crate) struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn grid(
        headers: impl IntoIterator<Item = impl Into<String>>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Two-column table with muted field names.
    pub(crate) fn key_value(painter: &Painter, rows: Vec<(&str, String)>) -> Self {
        let rows = rows
            .into_iter()
            .map(|(field, value)| vec![painter.muted(field), value])
            .collect();
        Self::grid(["field", "value"], rows)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(&self.headers);
        for row in &self.rows {
            builder.push_record(row);
        }
        let mut table = builder.build();
        table.with(TableStyle::rounded());
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_renders_headers_before_rows() {
        let table = Table::grid(
            ["command", "frames"],
            vec![
                vec!["ATE0\\r".into(), "OK\\r\\r>".into()],
                vec!["0100\\r".into(), "\\r>".into()],
            ],
        )
        .to_string();

        let header = table.find("command").expect("header should render");
        let first = table.find("ATE0\\r").expect("first row should render");
        let second = table.find("0100\\r").expect("second row should render");
        assert!(header < first && first < second);
        assert!(table.starts_with('╭'));
    }

    #[test]
    fn key_value_renders_plain_field_names_without_colour() {
        let painter = Painter::new(false);
        let table = Table::key_value(&painter, vec![("address", "127.0.0.1:35000".into())])
            .to_string();

        assert!(table.contains("address"));
        assert!(table.contains("127.0.0.1:35000"));
        assert!(!table.contains('\u{1b}'));
    }
}
