//! SQL Server introspection over tiberius.
//!
//! Connection strings are ADO.NET style
//! (`Server=host,1433;Database=db;User Id=u;Password=p;TrustServerCertificate=true`).
//! Tables, views and columns come from `INFORMATION_SCHEMA`; procedures,
//! parameters, row counts and permission grants come from the `sys.*`
//! catalogs, which the other dialects have no counterpart for.

use async_trait::async_trait;
use std::collections::HashMap;
use tiberius::{Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::{IntrospectError, IntrospectResult};
use crate::sql::{
    yes_no, ColumnInfo, ParamInfo, PermissionGrant, SqlDialectKind, SqlIntrospector,
};

/// Introspection handle over one TDS connection.
pub struct MssqlIntrospector {
    client: Client<Compat<TcpStream>>,
}

impl MssqlIntrospector {
    /// Connect using an ADO.NET connection string.
    pub async fn connect(connection_string: &str) -> IntrospectResult<Self> {
        let config = Config::from_ado_string(connection_string)?;
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        let client = Client::connect(config, tcp.compat_write()).await?;
        Ok(Self { client })
    }

    async fn relation_names(
        &mut self,
        schema: Option<&str>,
        table_type: &str,
    ) -> IntrospectResult<Vec<String>> {
        let schema = schema.unwrap_or("dbo");
        let rows = self
            .client
            .query(
                "SELECT TABLE_NAME AS name
                 FROM INFORMATION_SCHEMA.TABLES
                 WHERE TABLE_SCHEMA = @P1 AND TABLE_TYPE = @P2
                 ORDER BY TABLE_NAME",
                &[&schema, &table_type],
            )
            .await?
            .into_first_result()
            .await?;
        names_from(&rows)
    }
}

#[async_trait]
impl SqlIntrospector for MssqlIntrospector {
    fn dialect(&self) -> SqlDialectKind {
        SqlDialectKind::SqlServer
    }

    async fn probe(&mut self) -> IntrospectResult<()> {
        self.client
            .simple_query("SELECT 1")
            .await?
            .into_first_result()
            .await?;
        Ok(())
    }

    async fn table_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.relation_names(schema, "BASE TABLE").await
    }

    async fn view_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        self.relation_names(schema, "VIEW").await
    }

    async fn procedure_names(&mut self, schema: Option<&str>) -> IntrospectResult<Vec<String>> {
        let schema = schema.unwrap_or("dbo");
        let rows = self
            .client
            .query(
                "SELECT name
                 FROM sys.objects
                 WHERE type IN ('P', 'PC') AND schema_id = SCHEMA_ID(@P1)
                 ORDER BY name",
                &[&schema],
            )
            .await?
            .into_first_result()
            .await?;
        names_from(&rows)
    }

    async fn columns(
        &mut self,
        schema: Option<&str>,
        table: &str,
    ) -> IntrospectResult<Vec<ColumnInfo>> {
        let schema = schema.unwrap_or("dbo");
        let rows = self
            .client
            .query(
                "SELECT COLUMN_NAME AS name,
                        DATA_TYPE AS data_type,
                        IS_NULLABLE AS is_nullable
                 FROM INFORMATION_SCHEMA.COLUMNS
                 WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
                 ORDER BY ORDINAL_POSITION",
                &[&schema, &table],
            )
            .await?
            .into_first_result()
            .await?;
        rows.iter()
            .map(|row| {
                let nullable = required_str(row.try_get::<&str, _>("is_nullable")?, "is_nullable")?;
                Ok(ColumnInfo {
                    name: required_str(row.try_get::<&str, _>("name")?, "name")?,
                    data_type: required_str(row.try_get::<&str, _>("data_type")?, "data_type")?,
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
        let schema = schema.unwrap_or("dbo");
        let rows = self
            .client
            .query(
                "SELECT kcu.COLUMN_NAME AS name
                 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                 INNER JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                     ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                    AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
                    AND kcu.TABLE_NAME = tc.TABLE_NAME
                 WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                   AND tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
                 ORDER BY kcu.ORDINAL_POSITION",
                &[&schema, &table],
            )
            .await?
            .into_first_result()
            .await?;
        names_from(&rows)
    }

    async fn procedure_params(
        &mut self,
        schema: Option<&str>,
        procedure: &str,
    ) -> IntrospectResult<Vec<ParamInfo>> {
        let schema = schema.unwrap_or("dbo");
        let qualified = format!("{schema}.{procedure}");
        let rows = self
            .client
            .query(
                "SELECT p.name AS name,
                        t.name AS type_name,
                        p.is_output AS is_output
                 FROM sys.parameters p
                 INNER JOIN sys.types t ON p.user_type_id = t.user_type_id
                 WHERE p.object_id = OBJECT_ID(@P1)
                 ORDER BY p.parameter_id",
                &[&qualified],
            )
            .await?
            .into_first_result()
            .await?;
        rows.iter()
            .map(|row| {
                Ok(ParamInfo {
                    name: required_str(row.try_get::<&str, _>("name")?, "name")?,
                    type_name: required_str(row.try_get::<&str, _>("type_name")?, "type_name")?,
                    is_output: row.try_get::<bool, _>("is_output")?.unwrap_or(false),
                })
            })
            .collect()
    }

    async fn table_row_counts(
        &mut self,
        schema: Option<&str>,
    ) -> IntrospectResult<HashMap<String, i64>> {
        let schema = schema.unwrap_or("dbo");
        // index_id 0 is the heap, 1 the clustered index; together they cover
        // every table's base rows exactly once.
        let rows = self
            .client
            .query(
                "SELECT t.name AS name, SUM(p.rows) AS row_count
                 FROM sys.tables t
                 INNER JOIN sys.partitions p ON p.object_id = t.object_id
                 WHERE p.index_id IN (0, 1) AND t.schema_id = SCHEMA_ID(@P1)
                 GROUP BY t.name",
                &[&schema],
            )
            .await?
            .into_first_result()
            .await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            let name = required_str(row.try_get::<&str, _>("name")?, "name")?;
            let count = row.try_get::<i64, _>("row_count")?.unwrap_or(0);
            counts.insert(name, count);
        }
        Ok(counts)
    }

    async fn permissions(&mut self) -> IntrospectResult<Vec<PermissionGrant>> {
        let rows = self
            .client
            .query(
                "SELECT pr.name AS grantee,
                        pr.type_desc AS principal_type,
                        pe.permission_name AS permission,
                        pe.state_desc AS state
                 FROM sys.database_permissions pe
                 INNER JOIN sys.database_principals pr
                     ON pe.grantee_principal_id = pr.principal_id
                 ORDER BY pr.name, pe.permission_name",
                &[],
            )
            .await?
            .into_first_result()
            .await?;
        rows.iter()
            .map(|row| {
                Ok(PermissionGrant {
                    grantee: required_str(row.try_get::<&str, _>("grantee")?, "grantee")?,
                    principal_type: required_str(
                        row.try_get::<&str, _>("principal_type")?,
                        "principal_type",
                    )?,
                    permission: required_str(row.try_get::<&str, _>("permission")?, "permission")?,
                    state: required_str(row.try_get::<&str, _>("state")?, "state")?,
                })
            })
            .collect()
    }

    async fn close(self: Box<Self>) -> IntrospectResult<()> {
        let this = *self;
        this.client.close().await?;
        Ok(())
    }
}

fn names_from(rows: &[Row]) -> IntrospectResult<Vec<String>> {
    rows.iter()
        .map(|row| required_str(row.try_get::<&str, _>("name")?, "name"))
        .collect()
}

/// The catalog queries only select NOT NULL columns, so a NULL here means
/// the query and the server disagree about the schema of the catalog itself.
fn required_str(value: Option<&str>, column: &'static str) -> IntrospectResult<String> {
    value
        .map(str::to_string)
        .ok_or_else(|| IntrospectError::other(format!("catalog column {column} came back NULL")))
}
