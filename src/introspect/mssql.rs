use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{error, trace};

use super::SchemaReader;
use crate::prelude::DapgenError;
use crate::schema::ColumnMeta;

/// SQL Server metadata reader
///
/// tiberius is async-only, so the reader drives it on a private
/// current-thread runtime and exposes the same blocking contract as the
/// other readers.
pub struct MssqlReader {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
    schema: String,
}

impl MssqlReader {
    /// Connect using an ADO-style connection string
    pub fn connect(ado_string: &str, schema: &str) -> Result<Self, DapgenError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DapgenError::Connection(format!("Failed to start runtime: {}", e)))?;

        let config = Config::from_ado_string(ado_string)
            .map_err(|e| DapgenError::Connection(format!("Invalid connection string: {}", e)))?;

        let client = runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
                DapgenError::Connection(format!("Failed to open TCP connection: {}", e))
            })?;
            tcp.set_nodelay(true)
                .map_err(|e| DapgenError::Connection(e.to_string()))?;

            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| DapgenError::Connection(e.to_string()))
        })?;

        Ok(Self {
            runtime,
            client,
            schema: schema.to_string(),
        })
    }
}

impl SchemaReader for MssqlReader {
    fn list_tables(&mut self) -> Result<Vec<String>, DapgenError> {
        trace!(schema = ?self.schema, "Querying tables");

        let sql = r#"
            SELECT TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_TYPE = 'BASE TABLE'
                AND TABLE_SCHEMA = @P1
            ORDER BY TABLE_NAME
        "#;

        let schema = self.schema.clone();
        let client = &mut self.client;

        let rows = self
            .runtime
            .block_on(async {
                client
                    .query(sql, &[&schema])
                    .await?
                    .into_first_result()
                    .await
            })
            .map_err(|e| {
                error!(schema = ?schema, error = ?e, "Failed to query tables");
                DapgenError::Connection(format!("Failed to query tables: {}", e))
            })?;

        let tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get::<&str, _>("TABLE_NAME"))
            .map(|name| name.to_string())
            .collect();

        trace!(tables = ?tables, "Tables found");
        Ok(tables)
    }

    fn list_columns(&mut self, table: &str) -> Result<Vec<ColumnMeta>, DapgenError> {
        trace!(schema = ?self.schema, table = ?table, "Querying columns");

        let sql = r#"
            SELECT col.[name] AS column_name,
                typ.[name] AS column_type,
                col.is_nullable,
                col.is_identity,
                CAST(CASE WHEN col.default_object_id = 0 THEN 0 ELSE 1 END AS bit) AS has_default
            FROM sys.columns col
            JOIN sys.types typ ON col.system_type_id = typ.system_type_id
                AND col.user_type_id = typ.user_type_id
            WHERE col.object_id = OBJECT_ID(@P1)
            ORDER BY col.column_id
        "#;

        let qualified = format!("{}.{}", self.schema, table);
        let client = &mut self.client;

        let rows = self
            .runtime
            .block_on(async {
                client
                    .query(sql, &[&qualified])
                    .await?
                    .into_first_result()
                    .await
            })
            .map_err(|e| {
                error!(table = ?table, error = ?e, "Failed to query columns");
                DapgenError::Introspection {
                    table: table.to_string(),
                    message: format!("Failed to query columns: {}", e),
                }
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let column = ColumnMeta {
                name: row
                    .get::<&str, _>("column_name")
                    .unwrap_or_default()
                    .to_string(),
                native_type: row
                    .get::<&str, _>("column_type")
                    .unwrap_or_default()
                    .to_string(),
                is_nullable: row.get::<bool, _>("is_nullable").unwrap_or_default(),
                is_identity: row.get::<bool, _>("is_identity").unwrap_or_default(),
                has_default: row.get::<bool, _>("has_default").unwrap_or_default(),
            };

            trace!(
                column = ?column.name,
                native_type = ?column.native_type,
                is_nullable = ?column.is_nullable,
                is_identity = ?column.is_identity,
                has_default = ?column.has_default,
                "Read column"
            );

            columns.push(column);
        }

        Ok(columns)
    }
}
