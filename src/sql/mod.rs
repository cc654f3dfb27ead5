//! Relational schema introspection.
//!
//! One shared walk produces the flat object sequence for every SQL-family
//! source; the dialect differences live behind [`SqlIntrospector`], an
//! object-safe async trait with one adapter per driver:
//!
//! ```text
//! RelationalScanner
//!     │ resolve schema, apply name filter
//!     ▼
//! introspect_all ──────────────┐ per-artifact failures: logged, skipped
//!     │                        │
//!     ▼                        ▼
//! SqlIntrospector     tables → columns/pk, views, procedures → params
//!     ├── SqliteIntrospector   (rusqlite, sqlite_master + PRAGMA)
//!     ├── PostgresIntrospector (sqlx, pg_catalog + information_schema)
//!     ├── MySqlIntrospector    (sqlx, information_schema)
//!     └── MssqlIntrospector    (tiberius, INFORMATION_SCHEMA + sys.*)
//! ```
//!
//! Capability gating follows the dialect: stored procedures exist only for
//! SQL Server, so [`SqlDialectKind::supports_procedures`] short-circuits the
//! procedure pass elsewhere and the trait's default methods degrade to empty
//! lists.

mod mssql;
mod mysql;
mod postgres;
mod sqlite;

pub use mssql::MssqlIntrospector;
pub use mysql::MySqlIntrospector;
pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{IntrospectResult, ScanError};
use crate::metadata::{assemble, MetadataObject, ObjectType, ScanResult};
use crate::scan::{ArtifactFilter, ScanRequest, SourceScanner};
use crate::source::{SourceDescriptor, SourceFamily, SourceType};

/// SQL-family dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialectKind {
    /// PostgreSQL
    Postgres,
    /// MySQL
    MySql,
    /// Microsoft SQL Server
    SqlServer,
    /// SQLite
    Sqlite,
}

impl SqlDialectKind {
    /// Map a canonical source type to its dialect, if relational.
    pub fn for_source(source_type: SourceType) -> Option<Self> {
        match source_type {
            SourceType::Postgres => Some(SqlDialectKind::Postgres),
            SourceType::MySql => Some(SqlDialectKind::MySql),
            SourceType::SqlServer => Some(SqlDialectKind::SqlServer),
            SourceType::Sqlite => Some(SqlDialectKind::Sqlite),
            _ => None,
        }
    }

    /// Dialect name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialectKind::Postgres => "postgres",
            SqlDialectKind::MySql => "mysql",
            SqlDialectKind::SqlServer => "sqlserver",
            SqlDialectKind::Sqlite => "sqlite",
        }
    }

    /// Whether stored procedures can be enumerated on this dialect.
    ///
    /// Only SQL Server exposes them through a catalog the scanner reads;
    /// elsewhere the procedure pass is skipped entirely.
    pub fn supports_procedures(&self) -> bool {
        matches!(self, SqlDialectKind::SqlServer)
    }

    /// Whether this dialect has a schema concept worth resolving.
    pub fn supports_schemas(&self) -> bool {
        !matches!(self, SqlDialectKind::Sqlite)
    }

    /// The schema used when the request names none.
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            SqlDialectKind::SqlServer => Some("dbo"),
            _ => None,
        }
    }
}

impl fmt::Display for SqlDialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolve the active schema for a scan.
///
/// SQLite has no schema concept; SQL Server falls back to `dbo`; other
/// dialects fall back to the driver default (`None`). An explicit first
/// `db_names` entry overrides the fallback everywhere except SQLite. Empty
/// entries count as absent.
pub fn resolve_schema(dialect: SqlDialectKind, db_names: Option<&[String]>) -> Option<String> {
    if !dialect.supports_schemas() {
        return None;
    }
    let explicit = db_names
        .and_then(|names| names.first())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    match explicit {
        Some(name) => Some(name.to_string()),
        None => dialect.default_schema().map(str::to_string),
    }
}

/// One column as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Display-string type (dialect's own rendering).
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

/// One declared procedure parameter as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    /// Parameter name (SQL Server keeps the `@` prefix).
    pub name: String,
    /// Catalog type name.
    pub type_name: String,
    /// Whether the parameter is declared OUTPUT.
    pub is_output: bool,
}

/// One database permission grant (SQL Server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Principal the permission applies to.
    pub grantee: String,
    /// Principal kind (SQL_USER, DATABASE_ROLE, ...).
    pub principal_type: String,
    /// Permission name (SELECT, EXECUTE, ...).
    pub permission: String,
    /// Grant state (GRANT, DENY, ...).
    pub state: String,
}

/// An open introspection handle for one relational source.
///
/// Scoped to one invocation: opened by [`open_introspector`], closed by the
/// caller on every exit path. Default methods degrade to empty results for
/// capabilities a dialect lacks, matching the scanner's
/// absence-is-not-an-error policy.
#[async_trait]
pub trait SqlIntrospector: Send {
    /// The dialect behind this handle.
    fn dialect(&self) -> SqlDialectKind;

    /// Run the liveness probe (`SELECT 1`).
    async fn probe(&mut self) -> IntrospectResult<()>;

    /// Base-table names in the schema, source order.
    async fn table_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>>;

    /// View names in the schema.
    async fn view_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>>;

    /// Stored-procedure names in the schema.
    async fn procedure_names(&mut self, _schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Columns of one table or view, declaration order.
    async fn columns(
        &mut self,
        schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<ColumnInfo>>;

    /// Primary-key column names of one table, key order.
    async fn primary_key(
        &mut self,
        schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<String>>;

    /// Declared parameters of one procedure, declaration order.
    async fn procedure_params(
        &mut self,
        _schema: Option<&str>,
        _procedure: &str,
    ) -> IntrospectResult<Vec<ParamInfo>> {
        Ok(Vec::new())
    }

    /// Approximate row counts per table, where the dialect keeps them cheap.
    async fn table_row_counts(
        &mut self,
        _schema: Option<&str>,
    ) -> IntrospectResult<HashMap<String, i64>> {
        Ok(HashMap::new())
    }

    /// Database permission grants, where the dialect exposes them.
    async fn permissions(&mut self) -> IntrospectResult<Vec<PermissionGrant>> {
        Ok(Vec::new())
    }

    /// Release the underlying connection.
    async fn close(self: Box<Self>) -> IntrospectResult<()>;
}

/// Open the introspection handle for a relational source.
pub async fn open_introspector(
    dialect: SqlDialectKind,
    connection_string: &str,
) -> IntrospectResult<Box<dyn SqlIntrospector>> {
    match dialect {
        SqlDialectKind::Sqlite => Ok(Box::new(SqliteIntrospector::open(connection_string)?)),
        SqlDialectKind::Postgres => {
            Ok(Box::new(PostgresIntrospector::connect(connection_string).await?))
        }
        SqlDialectKind::MySql => Ok(Box::new(MySqlIntrospector::connect(connection_string).await?)),
        SqlDialectKind::SqlServer => {
            Ok(Box::new(MssqlIntrospector::connect(connection_string).await?))
        }
    }
}

/// 'YES'/'NO' nullability flags used by `information_schema`.
pub(crate) fn yes_no(flag: &str) -> bool {
    flag.eq_ignore_ascii_case("yes")
}

/// The scanning strategy for every SQL-family source.
///
/// Stateless; one value serves all four dialects, so the registry maps each
/// relational type to a clone of the same instance.
#[derive(Debug, Default)]
pub struct RelationalScanner;

impl RelationalScanner {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }

    fn dialect_for(source: &SourceDescriptor) -> Result<SqlDialectKind, ScanError> {
        SqlDialectKind::for_source(source.source_type).ok_or_else(|| {
            ScanError::UnknownSourceType {
                raw: source.source_type.to_string(),
                canonical: source.source_type.to_string(),
            }
        })
    }
}

#[async_trait]
impl SourceScanner for RelationalScanner {
    fn family(&self) -> SourceFamily {
        SourceFamily::Sql
    }

    async fn probe(&self, source: &SourceDescriptor) -> Result<(), ScanError> {
        let dialect = Self::dialect_for(source)?;
        let mut handle = open_introspector(dialect, &source.connection_string)
            .await
            .map_err(ScanError::connection)?;
        let probed = handle.probe().await;
        if let Err(err) = handle.close().await {
            tracing::debug!(dialect = %dialect, error = %err, "close after probe failed");
        }
        probed.map_err(ScanError::connection)
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let dialect = Self::dialect_for(&request.source)?;
        let schema = resolve_schema(dialect, request.db_names.as_deref());
        let filter = request.artifact_filter();

        let mut handle = open_introspector(dialect, &request.source.connection_string)
            .await
            .map_err(ScanError::connection)?;
        tracing::debug!(dialect = %dialect, schema = schema.as_deref().unwrap_or("<default>"), "introspecting");

        let objects = introspect_all(handle.as_mut(), schema.as_deref(), &filter).await;

        if let Err(err) = handle.close().await {
            tracing::debug!(dialect = %dialect, error = %err, "close after scan failed");
        }
        Ok(assemble(SourceFamily::Sql, objects)?)
    }
}

/// Walk one relational source into the flat object sequence.
///
/// Containers are appended before their members; a failure on one artifact
/// is logged and skips only that artifact's members (the container, once
/// emitted, stays). A failure to enumerate a name list yields an empty list
/// for that artifact kind.
pub(crate) async fn introspect_all(
    handle: &mut dyn SqlIntrospector,
    schema: Option<&str>,
    filter: &ArtifactFilter,
) -> Vec<MetadataObject> {
    let mut objects = Vec::new();

    let tables = enumerate(handle.table_names(schema).await, filter, "tables");
    for table in tables {
        objects.push(MetadataObject::container(ObjectType::Table, &table));
        match table_members(handle, schema, &table, ObjectType::TableColumn).await {
            Ok(columns) => objects.extend(columns),
            Err(err) => {
                tracing::warn!(table = %table, error = %err, "skipping columns of one table");
            }
        }
    }

    let views = enumerate(handle.view_names(schema).await, filter, "views");
    for view in views {
        objects.push(MetadataObject::container(ObjectType::View, &view));
        match table_members(handle, schema, &view, ObjectType::ViewColumn).await {
            Ok(columns) => objects.extend(columns),
            Err(err) => {
                tracing::warn!(view = %view, error = %err, "skipping columns of one view");
            }
        }
    }

    if handle.dialect().supports_procedures() {
        let procedures = enumerate(handle.procedure_names(schema).await, filter, "procedures");
        for procedure in procedures {
            objects.push(MetadataObject::container(ObjectType::Procedure, &procedure));
            match handle.procedure_params(schema, &procedure).await {
                Ok(params) => {
                    objects.extend(params.into_iter().map(|p| param_member(&procedure, p)));
                }
                Err(err) => {
                    tracing::warn!(procedure = %procedure, error = %err, "skipping parameters of one procedure");
                }
            }
        }
    }

    objects
}

fn enumerate(
    names: IntrospectResult<Vec<String>>,
    filter: &ArtifactFilter,
    kind: &str,
) -> Vec<String> {
    match names {
        Ok(names) => filter.retain(names),
        Err(err) => {
            tracing::warn!(kind, error = %err, "name enumeration failed, reporting none");
            Vec::new()
        }
    }
}

async fn table_members(
    handle: &mut dyn SqlIntrospector,
    schema: Option<&str>,
    container: &str,
    kind: ObjectType,
) -> IntrospectResult<Vec<MetadataObject>> {
    // Views carry no primary-key metadata; their columns always report false.
    let pk: HashSet<String> = if kind == ObjectType::TableColumn {
        handle.primary_key(schema, container).await?.into_iter().collect()
    } else {
        HashSet::new()
    };
    let columns = handle.columns(schema, container).await?;
    Ok(columns
        .into_iter()
        .map(|column| {
            let in_pk = pk.contains(&column.name);
            MetadataObject::member(
                kind,
                container,
                column.name,
                vec![column.data_type],
                Some(column.nullable),
                Some(in_pk),
            )
        })
        .collect())
}

/// A parameter not marked OUTPUT is treated as nullable input; the flag is
/// the negation of `is_output`, and params never join a primary key.
fn param_member(procedure: &str, param: ParamInfo) -> MetadataObject {
    MetadataObject::member(
        ObjectType::ProcedureParam,
        procedure,
        param.name,
        vec![param.type_name],
        Some(!param.is_output),
        Some(false),
    )
}
