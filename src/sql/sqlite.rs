//! SQLite introspection over rusqlite.
//!
//! The connection string is the database path, `:memory:` included;
//! `sqlite:` and `sqlite://` prefixes are tolerated and stripped. Files are
//! opened read-only, so a missing database file fails the probe instead of
//! silently creating an empty one.

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};

use crate::error::IntrospectResult;
use crate::sql::{ColumnInfo, SqlDialectKind, SqlIntrospector};

/// Introspection handle over one rusqlite connection.
pub struct SqliteIntrospector {
    conn: Connection,
}

impl SqliteIntrospector {
    /// Open the database named by the connection string.
    pub fn open(connection_string: &str) -> IntrospectResult<Self> {
        let path = database_path(connection_string);
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        };
        Ok(Self { conn })
    }

    fn object_names(&mut self, kind: &str) -> IntrospectResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = ?1 AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let rows = stmt.query_map([kind], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn table_info(&mut self, table: &str) -> IntrospectResult<Vec<(String, String, bool, i64)>> {
        // PRAGMA takes no bind parameters; the identifier is quoted inline.
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? == 0,
                row.get::<_, i64>(5)?,
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl SqlIntrospector for SqliteIntrospector {
    fn dialect(&self) -> SqlDialectKind {
        SqlDialectKind::Sqlite
    }

    async fn probe(&mut self) -> IntrospectResult<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    async fn table_names(&mut self, _schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.object_names("table")
    }

    async fn view_names(&mut self, _schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.object_names("view")
    }

    async fn columns(
        &mut self,
        _schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<ColumnInfo>> {
        Ok(self
            .table_info(table)?
            .into_iter()
            .map(|(name, declared, nullable, _pk)| ColumnInfo {
                name,
                data_type: render_declared_type(&declared),
                nullable,
            })
            .collect())
    }

    async fn primary_key(
        &mut self,
        _schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<String>> {
        // The pk column is the 1-based position within a composite key.
        let mut members: Vec<(i64, String)> = self
            .table_info(table)?
            .into_iter()
            .filter(|(_, _, _, pk)| *pk > 0)
            .map(|(name, _, _, pk)| (pk, name))
            .collect();
        members.sort_by_key(|(pos, _)| *pos);
        Ok(members.into_iter().map(|(_, name)| name).collect())
    }

    async fn close(self: Box<Self>) -> IntrospectResult<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

fn database_path(connection_string: &str) -> &str {
    let trimmed = connection_string.trim();
    if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
        rest
    } else {
        trimmed
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render a declared column type the way reflection reports it.
///
/// Parameterized spellings (`VARCHAR(50)`) are kept verbatim upper-cased;
/// bare names collapse through SQLite's type-affinity rules, so `int`
/// reports `INTEGER` and `text` reports `TEXT`.
fn render_declared_type(declared: &str) -> String {
    let upper = declared.trim().to_uppercase();
    if upper.is_empty() {
        return "BLOB".to_string();
    }
    if upper.contains('(') {
        return upper;
    }
    let affinity = if upper.contains("INT") {
        "INTEGER"
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        "TEXT"
    } else if upper.contains("BLOB") {
        "BLOB"
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        "REAL"
    } else {
        "NUMERIC"
    };
    affinity.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(ddl: &str) -> SqliteIntrospector {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        SqliteIntrospector { conn }
    }

    #[test]
    fn test_database_path_strips_prefixes() {
        assert_eq!(database_path("/data/app.db"), "/data/app.db");
        assert_eq!(database_path("sqlite:///data/app.db"), "/data/app.db");
        assert_eq!(database_path("sqlite:app.db"), "app.db");
        assert_eq!(database_path(":memory:"), ":memory:");
    }

    #[test]
    fn test_declared_type_affinity() {
        assert_eq!(render_declared_type("int"), "INTEGER");
        assert_eq!(render_declared_type("BIGINT"), "INTEGER");
        assert_eq!(render_declared_type("text"), "TEXT");
        assert_eq!(render_declared_type("clob"), "TEXT");
        assert_eq!(render_declared_type("varchar(50)"), "VARCHAR(50)");
        assert_eq!(render_declared_type("double precision"), "REAL");
        assert_eq!(render_declared_type("blob"), "BLOB");
        assert_eq!(render_declared_type(""), "BLOB");
        assert_eq!(render_declared_type("boolean"), "NUMERIC");
    }

    #[tokio::test]
    async fn test_table_and_view_names_sorted() {
        let mut db = fixture(
            "CREATE TABLE zebra (id int);
             CREATE TABLE alpha (id int);
             CREATE VIEW v_all AS SELECT * FROM alpha;",
        );
        assert_eq!(db.table_names(None).await.unwrap(), vec!["alpha", "zebra"]);
        assert_eq!(db.view_names(None).await.unwrap(), vec!["v_all"]);
    }

    #[tokio::test]
    async fn test_columns_report_affinity_and_nullability() {
        let mut db = fixture("CREATE TABLE t (a int NOT NULL, b text, c varchar(50));");
        let columns = db.columns(None, "t").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "a");
        assert_eq!(columns[0].data_type, "INTEGER");
        assert!(!columns[0].nullable);
        assert_eq!(columns[1].data_type, "TEXT");
        assert!(columns[1].nullable);
        assert_eq!(columns[2].data_type, "VARCHAR(50)");
    }

    #[tokio::test]
    async fn test_composite_primary_key_in_key_order() {
        let mut db = fixture(
            "CREATE TABLE pairs (b int, a int, v text, PRIMARY KEY (a, b));",
        );
        assert_eq!(db.primary_key(None, "pairs").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_quoted_identifier_in_pragma() {
        let mut db = fixture("CREATE TABLE \"odd name\" (x int);");
        let columns = db.columns(None, "odd name").await.unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "x");
    }

    #[tokio::test]
    async fn test_probe_in_memory() {
        let mut db = SqliteIntrospector::open(":memory:").unwrap();
        db.probe().await.unwrap();
        Box::new(db).close().await.unwrap();
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(SqliteIntrospector::open("/nonexistent/dir/app.db").is_err());
    }
}
