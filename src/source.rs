//! Source types and the spelling normalizer.
//!
//! Callers name sources in whatever spelling their tooling uses ("Azure
//! SQL", "pg", "mongo"). [`normalize`] folds those to one canonical tag,
//! [`SourceType`] is the closed set of tags with a registered scanning
//! strategy, and [`SourceDescriptor`] pairs a parsed type with the opaque
//! connection string for one invocation.
//!
//! # Example
//!
//! ```ignore
//! use metascan::source::{normalize, SourceDescriptor, SourceType};
//!
//! assert_eq!(normalize("Azure SQL"), "sqlserver");
//! let source = SourceDescriptor::new("pg", "postgres://scan@db/analytics")?;
//! assert_eq!(source.source_type, SourceType::Postgres);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScanError;

/// Normalize a caller-facing source-type spelling to its canonical tag.
///
/// Trims, lower-cases, strips spaces and hyphens, then resolves known
/// aliases. Unmapped input is returned folded rather than rejected, so the
/// caller decides how to treat an unrecognized tag. Idempotent: canonical
/// tags map to themselves.
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();

    let canonical = match folded.as_str() {
        "azure" | "azuresql" | "azuresqldb" | "azuredb" | "azuremssql" | "mssql" | "sqlserver"
        | "microsoftsql" => "sqlserver",
        "postgres" | "postgresql" | "pg" => "postgresql",
        "mysql" => "mysql",
        "sqlite" => "sqlite",
        "mongo" | "mongodb" => "mongodb",
        "csv" => "csv",
        "excel" | "xlsx" | "xls" => "excel",
        _ => return folded,
    };
    canonical.to_string()
}

/// Source kinds with a registered scanning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// PostgreSQL
    #[serde(rename = "postgresql")]
    Postgres,
    /// MySQL
    MySql,
    /// Microsoft SQL Server (including Azure SQL)
    SqlServer,
    /// SQLite (file or in-memory)
    Sqlite,
    /// MongoDB
    MongoDb,
    /// Delimited text file
    Csv,
    /// Excel workbook (xlsx/xls)
    Excel,
}

impl SourceType {
    /// Parse a canonical tag. Aliases are not accepted here; run
    /// [`normalize`] first.
    pub fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "postgresql" => Some(SourceType::Postgres),
            "mysql" => Some(SourceType::MySql),
            "sqlserver" => Some(SourceType::SqlServer),
            "sqlite" => Some(SourceType::Sqlite),
            "mongodb" => Some(SourceType::MongoDb),
            "csv" => Some(SourceType::Csv),
            "excel" => Some(SourceType::Excel),
            _ => None,
        }
    }

    /// The canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Postgres => "postgresql",
            SourceType::MySql => "mysql",
            SourceType::SqlServer => "sqlserver",
            SourceType::Sqlite => "sqlite",
            SourceType::MongoDb => "mongodb",
            SourceType::Csv => "csv",
            SourceType::Excel => "excel",
        }
    }

    /// The scanning family this type dispatches to.
    pub fn family(&self) -> SourceFamily {
        match self {
            SourceType::Postgres | SourceType::MySql | SourceType::SqlServer | SourceType::Sqlite => {
                SourceFamily::Sql
            }
            SourceType::MongoDb => SourceFamily::Mongo,
            SourceType::Csv | SourceType::Excel => SourceFamily::File,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Family tag carried on every scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFamily {
    /// Relational sources introspected through catalog queries.
    Sql,
    /// Document stores inferred by sampling.
    Mongo,
    /// Flat files inferred from a bounded prefix.
    File,
}

impl SourceFamily {
    /// The wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Sql => "sql",
            SourceFamily::Mongo => "mongo",
            SourceFamily::File => "file",
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source to scan: a parsed type plus the opaque connection string.
///
/// Immutable per invocation. The connection string's format is owned by the
/// dialect adapter: a URL for Postgres/MySQL/MongoDB, a file path (or
/// `:memory:`) for SQLite, an ADO.NET-style string for SQL Server, a file
/// path for file sources.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Canonical source type.
    pub source_type: SourceType,
    /// Credential/address string, opaque to everything but the adapter.
    pub connection_string: String,
}

impl SourceDescriptor {
    /// Build a descriptor from a caller-facing type spelling.
    ///
    /// Runs [`normalize`] and rejects tags with no registered strategy.
    pub fn new(
        raw_type: &str,
        connection_string: impl Into<String>,
    ) -> Result<Self, ScanError> {
        let canonical = normalize(raw_type);
        let source_type = SourceType::from_canonical(&canonical).ok_or_else(|| {
            ScanError::UnknownSourceType {
                raw: raw_type.to_string(),
                canonical: canonical.clone(),
            }
        })?;
        Ok(Self {
            source_type,
            connection_string: connection_string.into(),
        })
    }

    /// Build a descriptor from an already-parsed type.
    pub fn from_type(source_type: SourceType, connection_string: impl Into<String>) -> Self {
        Self {
            source_type,
            connection_string: connection_string.into(),
        }
    }

    /// The scanning family this descriptor dispatches to.
    pub fn family(&self) -> SourceFamily {
        self.source_type.family()
    }
}

/// Supported source types as (display label, canonical tag) pairs, for
/// callers building selection UIs.
pub fn catalog() -> &'static [(&'static str, &'static str)] {
    &[
        ("PostgreSQL", "postgresql"),
        ("MySQL", "mysql"),
        ("SQL Server", "sqlserver"),
        ("SQLite", "sqlite"),
        ("MongoDB", "mongodb"),
        ("CSV", "csv"),
        ("Excel", "excel"),
    ]
}
