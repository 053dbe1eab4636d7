use regex::Regex;

use crate::backend::Backend;
use crate::error::SqlDbdError;
use crate::types::RowValues;

/// Declared type of a named bind, selecting its escape path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindType {
    /// Rendered as bare numeric literals; lists join with commas for
    /// `IN (...)`-style expansion (the template supplies the parentheses).
    Numeric,
    /// Rendered through the binary-escape path.
    Binary,
    /// Everything else funnels through the same scalar-escape operation as
    /// positional arguments.
    #[default]
    Scalar,
}

/// A scalar or an ordered sequence bound under one name.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Single(RowValues),
    List(Vec<RowValues>),
}

impl From<RowValues> for BindValue {
    fn from(value: RowValues) -> Self {
        BindValue::Single(value)
    }
}

impl From<Vec<RowValues>> for BindValue {
    fn from(values: Vec<RowValues>) -> Self {
        BindValue::List(values)
    }
}

/// One named bind: `(name, value, declared type, optional column)`.
///
/// Immutable once added to a statement; binds accumulate in declaration
/// order and are applied in a single pass at execute time, after positional
/// placeholder compilation.
#[derive(Debug, Clone)]
pub struct Bind {
    pub name: String,
    pub value: BindValue,
    pub data_type: BindType,
    pub column: Option<String>,
}

impl Bind {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<BindValue>,
        data_type: BindType,
        column: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            data_type,
            column,
        }
    }
}

/// Replace every occurrence of `bind`'s token in `query` with the escaped
/// representation of its value.
///
/// The token must be immediately followed by an optional `::cast` and then
/// whitespace or a closing delimiter (`)` or `]`); both are preserved in
/// the output. A token at the very end of the template therefore does not
/// match — a known limitation inherited from the token grammar, worked
/// around by trailing whitespace in the template.
///
/// # Errors
/// Returns `ParameterError` for values that make no sense under the
/// declared type (for example a text value bound as `Numeric`).
pub fn replace_bind(
    query: &str,
    bind: &Bind,
    backend: &dyn Backend,
) -> Result<String, SqlDbdError> {
    let rendered = render_value(bind, backend)?;
    let pattern = format!(r"{}(::\w+)?([\s\)\]])", regex::escape(&bind.name));
    let re = Regex::new(&pattern)
        .map_err(|e| SqlDbdError::ParameterError(format!("bad bind name '{}': {e}", bind.name)))?;
    let replaced = re.replace_all(query, |caps: &regex::Captures<'_>| {
        let cast = caps.get(1).map_or("", |m| m.as_str());
        let delim = caps.get(2).map_or("", |m| m.as_str());
        format!("{rendered}{cast}{delim}")
    });
    Ok(replaced.into_owned())
}

/// Apply `binds` to `query` in declaration order.
///
/// # Errors
/// Propagates the first rendering failure.
pub fn apply_binds(
    query: String,
    binds: &[Bind],
    backend: &dyn Backend,
) -> Result<String, SqlDbdError> {
    let mut query = query;
    for bind in binds {
        query = replace_bind(&query, bind, backend)?;
    }
    Ok(query)
}

fn render_value(bind: &Bind, backend: &dyn Backend) -> Result<String, SqlDbdError> {
    match bind.data_type {
        BindType::Numeric => match &bind.value {
            BindValue::Single(value) => numeric_literal(&bind.name, value),
            BindValue::List(values) => {
                let parts = values
                    .iter()
                    .map(|v| numeric_literal(&bind.name, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(","))
            }
        },
        BindType::Binary => match &bind.value {
            BindValue::Single(RowValues::Blob(bytes)) => Ok(backend.escape_binary(bytes)),
            BindValue::Single(RowValues::Null) => Ok("NULL".to_string()),
            other => Err(SqlDbdError::ParameterError(format!(
                "binary bind '{}' requires a blob or NULL, got {other:?}",
                bind.name
            ))),
        },
        BindType::Scalar => match &bind.value {
            BindValue::Single(value) => Ok(backend.escape_scalar(value)),
            BindValue::List(values) => Ok(values
                .iter()
                .map(|v| backend.escape_scalar(v))
                .collect::<Vec<_>>()
                .join(",")),
        },
    }
}

fn numeric_literal(name: &str, value: &RowValues) -> Result<String, SqlDbdError> {
    match value {
        RowValues::Int(i) => Ok(i.to_string()),
        RowValues::Float(f) => Ok(f.to_string()),
        RowValues::Null => Ok("NULL".to_string()),
        other => Err(SqlDbdError::ParameterError(format!(
            "numeric bind '{name}' requires an integer, float, or NULL, got {other:?}"
        ))),
    }
}
