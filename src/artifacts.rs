//! Artifact listings without a full scan.
//!
//! [`list_artifacts`] answers "what is there" for one artifact kind: names
//! only (plus approximate row counts for SQL Server tables), no columns, no
//! sampling. Kinds a source cannot answer degrade to an empty listing
//! rather than failing, so callers can iterate over kinds without dialect
//! checks; only an unreachable source is an error.

use mongodb::Client;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::document;
use crate::error::{IntrospectResult, ScanError};
use crate::source::{SourceDescriptor, SourceFamily};
use crate::sql::{open_introspector, resolve_schema, PermissionGrant, SqlDialectKind};

/// The artifact kinds a listing can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Base tables.
    Tables,
    /// Views.
    Views,
    /// Stored procedures (SQL Server).
    Procedures,
    /// Collections (MongoDB).
    Collections,
    /// Database permission grants (SQL Server).
    Permissions,
}

impl ArtifactKind {
    /// The kind's tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Tables => "tables",
            ArtifactKind::Views => "views",
            ArtifactKind::Procedures => "procedures",
            ArtifactKind::Collections => "collections",
            ArtifactKind::Permissions => "permissions",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tables" | "table" => Ok(ArtifactKind::Tables),
            "views" | "view" => Ok(ArtifactKind::Views),
            "procedures" | "procedure" => Ok(ArtifactKind::Procedures),
            "collections" | "collection" => Ok(ArtifactKind::Collections),
            "permissions" => Ok(ArtifactKind::Permissions),
            other => Err(format!("unknown artifact kind: {other}")),
        }
    }
}

/// One named artifact.
#[derive(Debug, Clone, Serialize)]
pub struct NamedArtifact {
    /// Artifact name.
    pub name: String,
    /// Approximate row count, where the source keeps one cheaply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
}

/// A listing: names for most kinds, grants for `permissions`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ArtifactListing {
    /// Named artifacts.
    Named(Vec<NamedArtifact>),
    /// Permission grants.
    Permissions(Vec<PermissionGrant>),
}

impl ArtifactListing {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            ArtifactListing::Named(items) => items.len(),
            ArtifactListing::Permissions(grants) => grants.len(),
        }
    }

    /// Whether the listing has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// List one artifact kind for a source.
pub async fn list_artifacts(
    source: &SourceDescriptor,
    database: Option<&str>,
    kind: ArtifactKind,
) -> Result<ArtifactListing, ScanError> {
    match source.family() {
        SourceFamily::Sql => list_relational(source, database, kind).await,
        SourceFamily::Mongo => list_document(source, database, kind).await,
        // Files have exactly one artifact, the file itself.
        SourceFamily::File => Ok(ArtifactListing::Named(Vec::new())),
    }
}

async fn list_relational(
    source: &SourceDescriptor,
    database: Option<&str>,
    kind: ArtifactKind,
) -> Result<ArtifactListing, ScanError> {
    let dialect = match SqlDialectKind::for_source(source.source_type) {
        Some(dialect) => dialect,
        None => return Ok(ArtifactListing::Named(Vec::new())),
    };
    let db_names = database.map(|db| vec![db.to_string()]);
    let schema = resolve_schema(dialect, db_names.as_deref());
    let schema = schema.as_deref();

    let mut handle = open_introspector(dialect, &source.connection_string)
        .await
        .map_err(ScanError::connection)?;

    let listing = match kind {
        ArtifactKind::Tables => {
            let names = degrade(handle.table_names(schema).await, kind);
            let counts = degrade(handle.table_row_counts(schema).await, kind);
            ArtifactListing::Named(
                names
                    .into_iter()
                    .map(|name| {
                        let row_count = counts.get(&name).copied();
                        NamedArtifact { name, row_count }
                    })
                    .collect(),
            )
        }
        ArtifactKind::Views => named(degrade(handle.view_names(schema).await, kind)),
        ArtifactKind::Procedures => named(degrade(handle.procedure_names(schema).await, kind)),
        ArtifactKind::Collections => ArtifactListing::Named(Vec::new()),
        ArtifactKind::Permissions => {
            ArtifactListing::Permissions(degrade(handle.permissions().await, kind))
        }
    };

    if let Err(err) = handle.close().await {
        tracing::debug!(dialect = %dialect, error = %err, "close after listing failed");
    }
    Ok(listing)
}

async fn list_document(
    source: &SourceDescriptor,
    database: Option<&str>,
    kind: ArtifactKind,
) -> Result<ArtifactListing, ScanError> {
    if kind != ArtifactKind::Collections {
        return Ok(ArtifactListing::Named(Vec::new()));
    }
    let db_name = match database {
        Some(db) => db.to_string(),
        None => document::database_from_uri(&source.connection_string)
            .unwrap_or_else(|| "test".to_string()),
    };
    let client = Client::with_uri_str(&source.connection_string)
        .await
        .map_err(ScanError::connection)?;
    document::ping(&client, &db_name)
        .await
        .map_err(ScanError::connection)?;

    let names = match client.database(&db_name).list_collection_names().await {
        Ok(names) => names,
        Err(err) => {
            tracing::warn!(database = %db_name, error = %err, "listing collections failed, reporting none");
            Vec::new()
        }
    };
    Ok(named(names))
}

fn named(names: Vec<String>) -> ArtifactListing {
    ArtifactListing::Named(
        names
            .into_iter()
            .map(|name| NamedArtifact {
                name,
                row_count: None,
            })
            .collect(),
    )
}

fn degrade<T: Default>(result: IntrospectResult<T>, kind: ArtifactKind) -> T {
    match result {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(kind = %kind, error = %err, "listing failed, reporting none");
            T::default()
        }
    }
}
