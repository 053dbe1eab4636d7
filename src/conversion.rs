//! Optional numeric/boolean result coercion.
//!
//! PostgreSQL-style drivers hand every column back as text; when the
//! `convert_numeric`/`convert_boolean` options are set, fetched rows are
//! coerced into typed values using the backend-reported column types.

use crate::backend::BackendCursor;
use crate::config::Options;
use crate::types::RowValues;

const INTEGER_TYPES: &[&str] = &[
    "int",
    "int2",
    "int4",
    "int8",
    "serial2",
    "serial4",
    "serial8",
    "smallint",
    "bigint",
    "serial",
    "smallserial",
    "bigserial",
    // SQLite declared types
    "integer",
];

const FLOAT_TYPES: &[&str] = &[
    "real", "float", "float4", "float8", "double", "numeric",
];

const BOOLEAN_TYPES: &[&str] = &["bool", "boolean"];

/// Column indices to coerce, derived once per executed statement from the
/// cursor's column metadata.
#[derive(Debug, Clone, Default)]
pub struct ConversionMap {
    integers: Vec<usize>,
    floats: Vec<usize>,
    booleans: Vec<usize>,
}

impl ConversionMap {
    #[must_use]
    pub fn from_cursor(cursor: &dyn BackendCursor, column_count: usize) -> Self {
        let mut map = ConversionMap::default();
        for idx in 0..column_count {
            let Some(type_name) = cursor.column_type(idx) else {
                continue;
            };
            let type_name = type_name.to_ascii_lowercase();
            if BOOLEAN_TYPES.contains(&type_name.as_str()) {
                map.booleans.push(idx);
            }
            if INTEGER_TYPES.contains(&type_name.as_str()) {
                map.integers.push(idx);
            }
            if FLOAT_TYPES.contains(&type_name.as_str()) {
                map.floats.push(idx);
            }
        }
        map
    }

    /// Coerce one row's values in place according to the options.
    pub fn convert(&self, values: &mut [RowValues], options: &Options) {
        if options.convert_numeric() {
            for &idx in &self.integers {
                if let Some(RowValues::Text(s)) = values.get(idx) {
                    if let Ok(parsed) = s.trim().parse::<i64>() {
                        values[idx] = RowValues::Int(parsed);
                    }
                }
            }
            for &idx in &self.floats {
                if let Some(RowValues::Text(s)) = values.get(idx) {
                    if let Ok(parsed) = s.trim().parse::<f64>() {
                        values[idx] = RowValues::Float(parsed);
                    }
                }
            }
        }
        if options.convert_boolean() {
            for &idx in &self.booleans {
                match values.get(idx) {
                    Some(RowValues::Text(s)) if s == "t" => values[idx] = RowValues::Bool(true),
                    Some(RowValues::Text(s)) if s == "f" => values[idx] = RowValues::Bool(false),
                    Some(RowValues::Int(1)) => values[idx] = RowValues::Bool(true),
                    Some(RowValues::Int(0)) => values[idx] = RowValues::Bool(false),
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MaterializedCursor;

    fn map() -> ConversionMap {
        let cursor = MaterializedCursor::new(
            vec!["n".into(), "f".into(), "b".into(), "s".into()],
            vec!["int4".into(), "float8".into(), "bool".into(), "text".into()],
            Vec::new(),
        );
        ConversionMap::from_cursor(&cursor, 4)
    }

    fn all_on() -> Options {
        Options::default()
            .with_convert_numeric(true)
            .with_convert_boolean(true)
    }

    #[test]
    fn text_columns_coerce_by_reported_type() {
        let mut values = vec![
            RowValues::Text("42".into()),
            RowValues::Text("1.5".into()),
            RowValues::Text("t".into()),
            RowValues::Text("42".into()),
        ];
        map().convert(&mut values, &all_on());
        assert_eq!(
            values,
            vec![
                RowValues::Int(42),
                RowValues::Float(1.5),
                RowValues::Bool(true),
                RowValues::Text("42".into()),
            ]
        );
    }

    #[test]
    fn disabled_options_leave_values_untouched() {
        let mut values = vec![
            RowValues::Text("42".into()),
            RowValues::Text("1.5".into()),
            RowValues::Text("f".into()),
            RowValues::Text("x".into()),
        ];
        map().convert(&mut values, &Options::default());
        assert_eq!(values[0], RowValues::Text("42".into()));
        assert_eq!(values[2], RowValues::Text("f".into()));
    }

    #[test]
    fn integer_booleans_coerce_for_sqlite_style_backends() {
        let cursor = MaterializedCursor::new(
            vec!["b".into()],
            vec!["BOOLEAN".into()],
            Vec::new(),
        );
        let map = ConversionMap::from_cursor(&cursor, 1);
        let mut values = vec![RowValues::Int(1)];
        map.convert(&mut values, &all_on());
        assert_eq!(values, vec![RowValues::Bool(true)]);
    }
}
