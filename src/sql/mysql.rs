//! MySQL introspection over sqlx.
//!
//! Connection strings are `mysql://` URLs. When the request names no
//! database the queries fall back to `DATABASE()`, the connection's default
//! schema. Column types come from `COLUMN_TYPE`, the full display spelling
//! (`int`, `varchar(50)`, `decimal(10,2) unsigned`).

use async_trait::async_trait;
use sqlx::mysql::MySqlConnection;
use sqlx::{Connection, Row};

use crate::error::IntrospectResult;
use crate::sql::{yes_no, ColumnInfo, SqlDialectKind, SqlIntrospector};

/// Introspection handle over one MySQL connection.
pub struct MySqlIntrospector {
    conn: MySqlConnection,
}

impl MySqlIntrospector {
    /// Connect to the database named by the URL.
    pub async fn connect(url: &str) -> IntrospectResult<Self> {
        let conn = MySqlConnection::connect(url).await?;
        Ok(Self { conn })
    }

    async fn relation_names(
        &mut self,
        schema: Option<&str>,
        table_type: &str,
    ) -> IntrospectResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT TABLE_NAME AS name
             FROM information_schema.tables
             WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
               AND TABLE_TYPE = ?
             ORDER BY TABLE_NAME",
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
impl SqlIntrospector for MySqlIntrospector {
    fn dialect(&self) -> SqlDialectKind {
        SqlDialectKind::MySql
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
            "SELECT COLUMN_NAME AS name,
                    CAST(COLUMN_TYPE AS CHAR) AS data_type,
                    IS_NULLABLE AS is_nullable
             FROM information_schema.columns
             WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
               AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut self.conn)
        .await?;
        rows.iter()
            .map(|row| {
                let nullable: String = row.try_get("is_nullable")?;
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    data_type: row.try_get("data_type")?,
                    nullable: yes_no(&nullable),
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
            "SELECT COLUMN_NAME AS name
             FROM information_schema.key_column_usage
             WHERE CONSTRAINT_NAME = 'PRIMARY'
               AND TABLE_SCHEMA = COALESCE(?, DATABASE())
               AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
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
