//! Error types for the scanning engine.
//!
//! Two scopes, two types. [`ScanError`] covers failures that abort a whole
//! invocation (unknown type, unreachable source, missing required input) and
//! always reaches the caller typed. [`IntrospectError`] covers failures
//! scoped to a single artifact (one table, one collection); scanners log
//! those and skip the artifact, so they never escape the library.

use std::io;
use thiserror::Error;

/// Result type for single-artifact introspection calls.
pub type IntrospectResult<T> = Result<T, IntrospectError>;

/// Errors that abort a scan or probe invocation.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Normalization produced a type with no registered scanning strategy.
    #[error("unknown source type: {raw} (normalized: {canonical})")]
    UnknownSourceType {
        /// The spelling the caller supplied.
        raw: String,
        /// What normalization produced.
        canonical: String,
    },

    /// Network/auth/malformed-descriptor failure during probe or handle
    /// acquisition. The driver's own message is preserved in `detail`.
    #[error("connection failed: {detail}")]
    Connection {
        /// Driver-reported failure text.
        detail: String,
    },

    /// A document-kind scan could not resolve any target database.
    #[error("no target database name could be resolved")]
    MissingDatabaseName,

    /// A file-kind scan was requested without a file path.
    #[error("file source requires a file path")]
    FileRequired,

    /// File extension not recognized by the inferencer.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The offending extension (lower-cased, may be empty).
        extension: String,
    },

    /// A strategy produced an object sequence violating the output
    /// contract. Indicates a bug in a scanner, not in the source.
    #[error("inconsistent scan output: {0}")]
    Assembly(#[from] AssemblyError),
}

impl ScanError {
    /// Classify any driver failure as a connection error, keeping its text.
    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection {
            detail: err.to_string(),
        }
    }

    /// Check if this error means the source could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this error was raised before any I/O took place.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::UnknownSourceType { .. }
                | Self::MissingDatabaseName
                | Self::FileRequired
                | Self::UnsupportedFormat { .. }
        )
    }
}

/// Ordering or vocabulary violations caught while assembling a result.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A member object referenced a container that was never emitted.
    #[error("member {name} references missing container {container}")]
    OrphanedMember {
        /// The member's own name.
        name: String,
        /// The container it claimed.
        container: String,
    },

    /// An object kind does not belong to the result's source family.
    #[error("object kind {kind} does not belong to source family {family}")]
    ForeignKind {
        /// The offending object kind.
        kind: String,
        /// The family tag of the result.
        family: String,
    },
}

/// Errors from one introspection call against one artifact.
///
/// Wraps each wire driver's error type so scanners can `?` freely and decide
/// at the call site whether the failure is artifact-scoped (log and skip) or
/// invocation-scoped (convert via [`ScanError::connection`]).
#[derive(Error, Debug)]
pub enum IntrospectError {
    /// SQLite driver failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Postgres/MySQL driver failure.
    #[error("sql driver: {0}")]
    Sql(#[from] sqlx::Error),

    /// SQL Server driver failure.
    #[error("sql server: {0}")]
    Tds(#[from] tiberius::error::Error),

    /// MongoDB driver failure.
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Delimited-file parse failure.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook parse failure.
    #[error("excel: {0}")]
    Excel(#[from] calamine::Error),

    /// Filesystem failure.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Anything the driver reports as plain text.
    #[error("{0}")]
    Other(String),
}

impl IntrospectError {
    /// Create an error from plain text.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<IntrospectError> for ScanError {
    fn from(err: IntrospectError) -> Self {
        ScanError::connection(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_preserves_driver_text() {
        let err = ScanError::connection("login failed for user 'scan'");
        assert_eq!(
            err.to_string(),
            "connection failed: login failed for user 'scan'"
        );
        assert!(err.is_connection());
    }

    #[test]
    fn test_pre_io_errors_classified() {
        assert!(ScanError::FileRequired.is_invalid_request());
        assert!(ScanError::MissingDatabaseName.is_invalid_request());
        assert!(ScanError::UnknownSourceType {
            raw: "oracle".into(),
            canonical: "oracle".into(),
        }
        .is_invalid_request());
        assert!(!ScanError::connection("down").is_invalid_request());
    }

    #[test]
    fn test_assembly_error_message() {
        let err = ScanError::from(AssemblyError::OrphanedMember {
            name: "age".into(),
            container: "users".into(),
        });
        assert_eq!(
            err.to_string(),
            "inconsistent scan output: member age references missing container users"
        );
    }
}
