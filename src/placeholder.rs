use crate::backend::Backend;
use crate::error::SqlDbdError;
use crate::types::{ExecMode, RowValues};

/// A query template resolved against backend parameter syntax.
///
/// In `Prepared` mode `text` carries backend-native positional parameters
/// and `args` the values to bind, in template order. In `Inline` mode every
/// placeholder has been replaced with an escaped literal and `args` is
/// empty.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub text: String,
    pub args: Vec<RowValues>,
}

/// Rewrite a template's positional placeholders.
///
/// Detection is a single left-to-right character scan of the raw template;
/// only the configured placeholder character is ever substituted. There is
/// no SQL lexing, so a placeholder character inside a string literal in the
/// caller's own SQL is indistinguishable from a real placeholder — a
/// documented caveat of this layer, not something it tries to fix.
///
/// # Errors
/// Returns `ArgumentCountMismatch` unless the placeholder count equals the
/// argument count exactly.
pub fn compile(
    query: &str,
    placeholder: char,
    params: &[RowValues],
    mode: ExecMode,
    backend: &dyn Backend,
) -> Result<CompiledQuery, SqlDbdError> {
    let expected = query.chars().filter(|c| *c == placeholder).count();
    if expected != params.len() {
        return Err(SqlDbdError::ArgumentCountMismatch {
            expected,
            supplied: params.len(),
            query: query.to_string(),
        });
    }

    if expected == 0 {
        return Ok(CompiledQuery {
            text: query.to_string(),
            args: Vec::new(),
        });
    }

    let mut text = String::with_capacity(query.len() + expected * 4);
    let mut next = params.iter();
    let mut position = 0usize;
    for ch in query.chars() {
        if ch != placeholder {
            text.push(ch);
            continue;
        }
        match mode {
            ExecMode::Prepared => {
                position += 1;
                text.push_str(&backend.native_placeholder(position));
            }
            ExecMode::Inline => {
                // Count check above guarantees the iterator is not empty.
                if let Some(value) = next.next() {
                    text.push_str(&backend.escape_scalar(value));
                }
            }
        }
    }

    let args = match mode {
        ExecMode::Prepared => params.to_vec(),
        ExecMode::Inline => Vec::new(),
    };

    Ok(CompiledQuery { text, args })
}
