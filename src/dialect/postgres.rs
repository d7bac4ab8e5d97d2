//! PostgreSQL dialect

use super::{param_list, Dialect};

/// PostgreSQL SQL text and type mapping
///
/// Read-back uses a `RETURNING` clause after `VALUES`.
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn default_schema(&self) -> &'static str {
        "public"
    }

    fn map_type(&self, native_type: &str) -> String {
        let cs_type = match native_type.to_lowercase().as_str() {
            "bigint" | "int8" | "serial8" | "bigserial" => "long",
            "bytea" => "byte[]",
            "boolean" | "bool" => "bool",
            "char" | "character" | "character varying" | "varchar" | "text" => "string",
            "date" | "timestamp" | "timestamp without time zone" | "timestamp with time zone" => {
                "DateTime"
            }
            "timestamptz" => "DateTimeOffset",
            "numeric" | "decimal" | "money" => "decimal",
            "double precision" | "float8" => "double",
            "integer" | "int" | "int4" | "serial" | "serial4" => "int",
            "real" | "float4" => "float",
            "smallint" | "int2" | "smallserial" | "serial2" => "short",
            "time" | "time without time zone" | "time with time zone" => "TimeSpan",
            "uuid" => "Guid",
            _ => return format!("UNKNOWN_{native_type}"),
        };

        cs_type.to_string()
    }

    fn quote(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote(table))
    }

    fn select_where(&self, table: &str) -> String {
        format!("SELECT * FROM {} WHERE {{whereClause}}", self.quote(table))
    }

    fn select_by_id(&self, table: &str, id_column: &str) -> String {
        format!(
            "SELECT * FROM {} WHERE {} = @id",
            self.quote(table),
            self.quote(id_column)
        )
    }

    fn update_by_id(&self, table: &str, id_column: &str, columns: &[&str]) -> String {
        let assignments = columns
            .iter()
            .map(|c| format!("{} = @{c}", self.quote(c)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {assignments} WHERE {} = @{id_column}",
            self.quote(table),
            self.quote(id_column)
        )
    }

    fn delete_by_id(&self, table: &str, id_column: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = @{id_column}",
            self.quote(table),
            self.quote(id_column)
        )
    }

    fn basic_insert(&self, table: &str, columns: &[&str], read_back: &[&str]) -> String {
        let column_list = columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut query = format!(
            "INSERT INTO {} ({column_list}) VALUES ({})",
            self.quote(table),
            param_list(columns)
        );

        if !read_back.is_empty() {
            let returning_list = read_back
                .iter()
                .map(|c| self.quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            query.push_str(&format!(" RETURNING {returning_list}"));
        }

        query
    }

    fn advanced_insert(&self, table: &str) -> String {
        // Escaped for the C# interpolated string literal it is rendered into
        format!(
            "INSERT INTO \\\"{table}\\\" ({{string.Join(\", \", insertColumns.Select(x => $\"\\\"{{x}}\\\"\"))}}) VALUES ({{string.Join(\", \", insertColumns.Select(x => \"@\" + x))}}){{outputText}}"
        )
    }

    fn advanced_insert_output(&self) -> String {
        " RETURNING {string.Join(\", \", outputColumns.Select(x => $\"\\\"{x}\\\"\"))}".to_string()
    }
}
