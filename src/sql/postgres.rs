//! PostgreSQL introspection over sqlx.
//!
//! Connection strings are `postgres://` URLs. When the request names no
//! schema the queries fall back to `current_schema()`, i.e. whatever the
//! role's search path makes the driver default. Column types render through
//! `format_type`, so the display strings match what psql reports
//! (`integer`, `character varying(50)`, ...).

use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Row};

use crate::error::IntrospectResult;
use crate::sql::{ColumnInfo, SqlDialectKind, SqlIntrospector};

/// Introspection handle over one Postgres connection.
pub struct PostgresIntrospector {
    conn: PgConnection,
}

impl PostgresIntrospector {
    /// Connect to the database named by the URL.
    pub async fn connect(url: &str) -> IntrospectResult<Self> {
        let conn = PgConnection::connect(url).await?;
        Ok(Self { conn })
    }

    async fn relation_names(
        &mut self,
        schema: Option<&str>,
        table_type: &str,
    ) -> IntrospectResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name AS name
             FROM information_schema.tables
             WHERE table_schema = COALESCE($1::text, current_schema())
               AND table_type = $2
             ORDER BY table_name",
        )
        .bind(schema)
        .bind(table_type)
        .fetch_all(&mut self.conn)
        .await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("name")?))
            .collect()
    }
}

#[async_trait]
impl SqlIntrospector for PostgresIntrospector {
    fn dialect(&self) -> SqlDialectKind {
        SqlDialectKind::Postgres
    }

    async fn probe(&mut self) -> IntrospectResult<()> {
        sqlx::query("SELECT 1").fetch_one(&mut self.conn).await?;
        Ok(())
    }

    async fn table_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.relation_names(schema, "BASE TABLE").await
    }

    async fn view_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.relation_names(schema, "VIEW").await
    }

    async fn columns(
        &mut self,
        schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(
            "SELECT a.attname AS name,
                    pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                    NOT a.attnotnull AS is_nullable
             FROM pg_catalog.pg_attribute a
             JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
             JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
             WHERE n.nspname = COALESCE($1::text, current_schema())
               AND c.relname = $2
               AND a.attnum > 0
               AND NOT a.attisdropped
             ORDER BY a.attnum",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: row.try_get("data_type")?,
                    nullable: row.try_get("is_nullable")?,
                })
            })
            .collect()
    }

    async fn primary_key(
        &mut self,
        schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT kcu.column_name AS name
             FROM information_schema.table_constraints tc
             JOIN information_schema.key_column_usage kcu
               ON kcu.constraint_name = tc.constraint_name
              AND kcu.table_schema = tc.table_schema
             WHERE tc.constraint_type = 'PRIMARY KEY'
               AND tc.table_schema = COALESCE($1::text, current_schema())
               AND tc.table_name = $2
             ORDER BY kcu.ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut self.conn)
        .await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("name")?))
            .collect()
    }

    async fn close(self: Box<Self>) -> IntrospectResult<()> {
        let this = *self;
        this.conn.close().await?;
        Ok(())
    }
}
