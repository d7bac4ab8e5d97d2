use postgres::Client;
use tracing::{error, trace};

use super::SchemaReader;
use crate::prelude::DapgenError;
use crate::schema::ColumnMeta;

/// PostgreSQL metadata reader
pub struct PostgresReader<'a> {
    client: &'a mut Client,
    schema: String,
}

impl<'a> PostgresReader<'a> {
    pub fn new(client: &'a mut Client, schema: &str) -> Self {
        Self {
            client,
            schema: schema.to_string(),
        }
    }
}

impl SchemaReader for PostgresReader<'_> {
    fn list_tables(&mut self) -> Result<Vec<String>, DapgenError> {
        trace!(schema = ?self.schema, "Querying tables");

        let sql = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
                AND table_schema = $1
            ORDER BY table_name
        "#;

        let rows = self.client.query(sql, &[&self.schema]).map_err(|e| {
            error!(schema = ?self.schema, error = ?e, "Failed to query tables");
            DapgenError::Connection(format!("Failed to query tables: {}", e))
        })?;

        let tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        trace!(tables = ?tables, "Tables found");
        Ok(tables)
    }

    fn list_columns(&mut self, table: &str) -> Result<Vec<ColumnMeta>, DapgenError> {
        trace!(schema = ?self.schema, table = ?table, "Querying columns");

        // Serial and identity columns both expose a sequence through
        // pg_get_serial_sequence.
        let sql = r#"
            SELECT
                col.column_name,
                col.data_type,
                (col.is_nullable = 'YES') AS is_nullable,
                (pg_get_serial_sequence(format('%I.%I', col.table_schema, col.table_name), col.column_name) IS NOT NULL) AS is_identity,
                (col.column_default IS NOT NULL) AS has_default
            FROM information_schema.columns col
            WHERE col.table_schema = $1
                AND col.table_name = $2
            ORDER BY col.ordinal_position
        "#;

        let rows = self.client.query(sql, &[&self.schema, &table]).map_err(|e| {
            error!(
                schema = ?self.schema,
                table = ?table,
                error = ?e,
                "Failed to query columns"
            );
            DapgenError::Introspection {
                table: table.to_string(),
                message: format!("Failed to query columns: {}", e),
            }
        })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let column = ColumnMeta {
                name: row.get("column_name"),
                native_type: row.get("data_type"),
                is_nullable: row.get("is_nullable"),
                is_identity: row.get("is_identity"),
                has_default: row.get("has_default"),
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
