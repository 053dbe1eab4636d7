//! Helpers that turn column/value records into INSERT and UPDATE
//! arguments, with cast-aware placeholder generation.

use crate::backend::Backend;
use crate::types::RowValues;

/// One column value, optionally paired with an explicit target SQL type
/// for cast-aware placeholder generation (`?::uuid`).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub value: RowValues,
    pub cast: Option<String>,
}

impl ColumnValue {
    #[must_use]
    pub fn new(value: RowValues) -> Self {
        Self { value, cast: None }
    }

    #[must_use]
    pub fn with_cast(value: RowValues, cast: impl Into<String>) -> Self {
        Self {
            value,
            cast: Some(cast.into()),
        }
    }
}

impl From<RowValues> for ColumnValue {
    fn from(value: RowValues) -> Self {
        ColumnValue::new(value)
    }
}

/// Compiled INSERT pieces: column names, value fragments (placeholders or
/// casted placeholders), and the arguments in column order.
#[derive(Debug, Clone, Default)]
pub struct InsertArguments {
    pub columns: Vec<String>,
    pub values: Vec<String>,
    pub arguments: Vec<RowValues>,
}

/// Compiled UPDATE pieces: `SET` fragments and the arguments in column
/// order.
#[derive(Debug, Clone, Default)]
pub struct UpdateArguments {
    pub columns: Vec<String>,
    pub arguments: Vec<RowValues>,
}

/// Build [`InsertArguments`] from a record of `(column, value)` pairs.
#[must_use]
pub fn compile_insert_args(
    record: &[(&str, ColumnValue)],
    placeholder: char,
    backend: &dyn Backend,
) -> InsertArguments {
    let mut insert = InsertArguments::default();
    for (column, column_value) in record {
        insert.columns.push((*column).to_string());
        insert
            .values
            .push(backend.insert_value_fragment(placeholder, column_value.cast.as_deref()));
        insert.arguments.push(column_value.value.clone());
    }
    insert
}

/// Build [`UpdateArguments`] from a record of `(column, value)` pairs.
#[must_use]
pub fn compile_update_args(
    record: &[(&str, ColumnValue)],
    placeholder: char,
    backend: &dyn Backend,
) -> UpdateArguments {
    let mut update = UpdateArguments::default();
    for (column, column_value) in record {
        update
            .columns
            .push(backend.update_set_fragment(column, placeholder, column_value.cast.as_deref()));
        update.arguments.push(column_value.value.clone());
    }
    update
}
