use thiserror::Error;

/// Errors surfaced by card, session, account and transfer operations.
///
/// `NotFoundOrForbidden` never distinguishes a missing record from one owned
/// by somebody else. `Storage` keeps the underlying SQLite error as its source
/// but only ever displays a generic message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("not found")]
    NotFoundOrForbidden,

    #[error("malformed import data at line {line} ({processed} rows read before it)")]
    MalformedImportRow {
        line: u64,
        processed: usize,
        #[source]
        source: csv::Error,
    },

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    #[error("internal storage error")]
    Storage(#[from] rusqlite::Error),

    #[error("export failed")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Failures the end user can't act on; these get logged with full detail.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Export(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_hides_detail() {
        let err = Error::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.to_string(), "internal storage error");
        assert!(err.is_internal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_uniform() {
        assert_eq!(Error::NotFoundOrForbidden.to_string(), "not found");
        assert!(!Error::NotFoundOrForbidden.is_internal());
    }

    #[test]
    fn validation_names_the_field() {
        let err = Error::validation("topic", "may not be blank");
        assert_eq!(err.to_string(), "invalid topic: may not be blank");
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "topic"),
            _ => panic!("Expected Validation error"),
        }
    }
}
