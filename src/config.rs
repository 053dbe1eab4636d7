use std::fmt;
use std::sync::Arc;

use crate::cache::CacheStore;

/// Immutable connection parameters plus an optional shared cache store.
///
/// Owned by the application and shared (via `Arc`) by every statement
/// handle derived from the same connection.
#[derive(Clone, Default)]
pub struct Config {
    host: String,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    cache_store: Option<Arc<dyn CacheStore>>,
}

impl Config {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Attach a shared cache store, enabling `Statement::cache`.
    #[must_use]
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    #[must_use]
    pub fn cache_store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache_store.as_ref()
    }

    /// libpq-style `key=value` connection string.
    #[must_use]
    pub fn dsn(&self, application_name: &str) -> String {
        let mut dsn = format!("host={} ", self.host);
        if let Some(database) = &self.database {
            dsn.push_str(&format!("dbname={database} "));
        }
        if let Some(username) = &self.username {
            dsn.push_str(&format!("user={username} "));
        }
        if let Some(password) = &self.password {
            dsn.push_str(&format!("password={password} "));
        }
        if let Some(port) = self.port {
            dsn.push_str(&format!("port={port} "));
        }
        dsn.push_str(&format!("application_name={application_name}"));
        dsn
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cache_store", &self.cache_store.is_some())
            .finish()
    }
}

/// Behavioral flags, copied by value into every derived statement handle.
#[derive(Debug, Clone)]
pub struct Options {
    convert_numeric: bool,
    convert_boolean: bool,
    prepare_execute: bool,
    on_demand: bool,
    placeholder: char,
    application_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            convert_numeric: false,
            convert_boolean: false,
            prepare_execute: false,
            on_demand: true,
            placeholder: '?',
            application_name: "sql-dbd".to_string(),
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce text columns of numeric type into `Int`/`Float` on fetch.
    #[must_use]
    pub fn with_convert_numeric(mut self, convert: bool) -> Self {
        self.convert_numeric = convert;
        self
    }

    /// Coerce boolean-typed columns into `Bool` on fetch.
    #[must_use]
    pub fn with_convert_boolean(mut self, convert: bool) -> Self {
        self.convert_boolean = convert;
        self
    }

    /// Execute through backend-native prepared statements instead of
    /// inlining escaped literals.
    #[must_use]
    pub fn with_prepare_execute(mut self, prepare: bool) -> Self {
        self.prepare_execute = prepare;
        self
    }

    /// Defer connecting until the first operation that needs a live
    /// backend (default).
    #[must_use]
    pub fn with_on_demand(mut self, on_demand: bool) -> Self {
        self.on_demand = on_demand;
        self
    }

    /// The positional placeholder character (default `?`).
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    #[must_use]
    pub fn convert_numeric(&self) -> bool {
        self.convert_numeric
    }

    #[must_use]
    pub fn convert_boolean(&self) -> bool {
        self.convert_boolean
    }

    #[must_use]
    pub fn prepare_execute(&self) -> bool {
        self.prepare_execute
    }

    #[must_use]
    pub fn on_demand(&self) -> bool {
        self.on_demand
    }

    #[must_use]
    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }
}
