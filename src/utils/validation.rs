use crate::utils::error::{DiffError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// userinfo up to the last '@' before the path
static URL_PASSWORD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"://([^:/@]*):[^/]*@").ok());
// libpq values are either single-quoted with backslash escapes or end at whitespace
static KEY_VALUE_PASSWORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bpassword\s*=\s*)('(?:[^'\\]|\\.)*(?:'|$)|\S+)").ok()
});

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Accepts both URL (`postgres://...`) and key/value (`host=... dbname=...`) forms.
pub fn validate_connection_string(field_name: &str, conn: &str) -> Result<()> {
    if conn.trim().is_empty() {
        return Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: conn.to_string(),
            reason: "Connection string cannot be empty".to_string(),
        });
    }

    if !conn.contains("://") {
        return Ok(());
    }

    match Url::parse(conn) {
        Ok(url) => match url.scheme() {
            "postgres" | "postgresql" => Ok(()),
            scheme => Err(DiffError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: redact_password(conn),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: redact_password(conn),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| DiffError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DiffError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Masks the password of a connection string so it can be logged.
pub fn redact_password(conn: &str) -> String {
    if conn.contains("://") {
        if let Ok(mut url) = Url::parse(conn) {
            if url.password().is_none() {
                return conn.to_string();
            }
            if url.set_password(Some("***")).is_ok() {
                return url.to_string();
            }
        }
        return mask(&URL_PASSWORD, conn, "://${1}:***@");
    }
    mask(&KEY_VALUE_PASSWORD, conn, "${1}***")
}

fn mask(pattern: &Option<Regex>, conn: &str, replacement: &str) -> String {
    match pattern {
        Some(re) => re.replace_all(conn, replacement).into_owned(),
        None => "***".to_string(),
    }
}
