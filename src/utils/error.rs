use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Query,
    Output,
}

// SQLSTATE classes worth another attempt: connection exceptions, insufficient
// resources, operator intervention, serialization failure and deadlock.
const TRANSIENT_STATES: &[&str] = &["57P01", "57P02", "57P03", "40001", "40P01"];
const TRANSIENT_CLASSES: &[&str] = &["08", "53"];

impl DiffError {
    /// SQLSTATE code reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            DiffError::Database(e) => e.code().map(|c| c.code()),
            _ => None,
        }
    }

    /// Whether the failure is operational and the statement may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            DiffError::Database(e) => {
                if e.is_closed() {
                    return true;
                }
                match e.code() {
                    Some(code) => is_transient_state(code.code()),
                    // without a SQLSTATE only socket failures are worth retrying
                    None => std::error::Error::source(e)
                        .is_some_and(|source| source.is::<std::io::Error>()),
                }
            }
            DiffError::IoError(_) => true,
            _ => false,
        }
    }

    /// Undefined table or object.
    pub fn is_undefined_object(&self) -> bool {
        matches!(self.sql_state(), Some("42P01") | Some("42704"))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DiffError::ConfigError { .. }
            | DiffError::MissingConfigError { .. }
            | DiffError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DiffError::Database(_) if self.is_transient() => ErrorCategory::Connection,
            DiffError::Database(_) => ErrorCategory::Query,
            DiffError::IoError(_) | DiffError::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Connection => format!("Could not talk to the database: {}", self),
            ErrorCategory::Query => format!("A comparison query failed: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check --firstdb/--seconddb and the other flags, or the --config file"
            }
            ErrorCategory::Connection => {
                "Make sure both databases are reachable, or raise --max-retries"
            }
            ErrorCategory::Query => {
                "Check that the user can read the catalog and every table in the schema"
            }
            ErrorCategory::Output => "Check that the --report path is writable",
        }
    }

    /// Process exit code for an aborted run. Comparison failures use 1.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

fn is_transient_state(code: &str) -> bool {
    TRANSIENT_STATES.contains(&code) || TRANSIENT_CLASSES.iter().any(|c| code.starts_with(c))
}
