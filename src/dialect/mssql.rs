//! SQL Server dialect

use super::{param_list, Dialect};

/// SQL Server SQL text and type mapping
///
/// Read-back uses an `OUTPUT INSERTED.*` clause placed before `VALUES`.
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn default_schema(&self) -> &'static str {
        "dbo"
    }

    fn map_type(&self, native_type: &str) -> String {
        let cs_type = match native_type.to_lowercase().as_str() {
            "bigint" => "long",
            "binary" | "image" | "rowversion" | "varbinary" => "byte[]",
            "bit" => "bool",
            "char" | "nchar" | "ntext" | "nvarchar" | "text" | "varchar" => "string",
            "date" | "datetime" | "datetime2" | "smalldatetime" => "DateTime",
            "datetimeoffset" => "DateTimeOffset",
            "decimal" | "money" | "numeric" | "smallmoney" => "decimal",
            "float" => "double",
            "int" => "int",
            "real" => "float",
            "smallint" => "short",
            "time" => "TimeSpan",
            "tinyint" => "byte",
            "uniqueidentifier" => "Guid",
            "xml" => "XDocument",
            _ => return format!("UNKNOWN_{native_type}"),
        };

        cs_type.to_string()
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{ident}]")
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

        if read_back.is_empty() {
            format!(
                "INSERT INTO {} ({column_list}) VALUES ({})",
                self.quote(table),
                param_list(columns)
            )
        } else {
            let output_list = read_back
                .iter()
                .map(|c| format!("INSERTED.{}", self.quote(c)))
                .collect::<Vec<_>>()
                .join(", ");

            format!(
                "INSERT INTO {} ({column_list}) OUTPUT {output_list} VALUES ({})",
                self.quote(table),
                param_list(columns)
            )
        }
    }

    fn advanced_insert(&self, table: &str) -> String {
        format!(
            "INSERT INTO {} ({{string.Join(\", \", insertColumns.Select(x => $\"[{{x}}]\"))}}) {{outputText}}VALUES ({{string.Join(\", \", insertColumns.Select(x => \"@\" + x))}})",
            self.quote(table)
        )
    }

    fn advanced_insert_output(&self) -> String {
        "OUTPUT {string.Join(\", \", outputColumns.Select(x => $\"INSERTED.[{x}]\"))} ".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_type_known() {
        let dialect = SqlServerDialect;
        assert_eq!(dialect.map_type("int"), "int");
        assert_eq!(dialect.map_type("bigint"), "long");
        assert_eq!(dialect.map_type("nvarchar"), "string");
        assert_eq!(dialect.map_type("datetime2"), "DateTime");
        assert_eq!(dialect.map_type("uniqueidentifier"), "Guid");
        assert_eq!(dialect.map_type("xml"), "XDocument");
    }

    #[test]
    fn test_map_type_case_insensitive() {
        let dialect = SqlServerDialect;
        assert_eq!(dialect.map_type("NVarChar"), "string");
        assert_eq!(dialect.map_type("INT"), "int");
    }

    #[test]
    fn test_map_type_unknown_is_tagged() {
        let dialect = SqlServerDialect;
        assert_eq!(dialect.map_type("geography"), "UNKNOWN_geography");
        assert!(!dialect.map_type("").is_empty());
    }

    #[test]
    fn test_select_queries() {
        let dialect = SqlServerDialect;
        assert_eq!(dialect.select_all("Users"), "SELECT * FROM [Users]");
        assert_eq!(
            dialect.select_where("Users"),
            "SELECT * FROM [Users] WHERE {whereClause}"
        );
        assert_eq!(
            dialect.select_by_id("Users", "Id"),
            "SELECT * FROM [Users] WHERE [Id] = @id"
        );
    }

    #[test]
    fn test_update_and_delete() {
        let dialect = SqlServerDialect;
        assert_eq!(
            dialect.update_by_id("Users", "Id", &["Email", "CreatedAt"]),
            "UPDATE [Users] SET [Email] = @Email, [CreatedAt] = @CreatedAt WHERE [Id] = @Id"
        );
        assert_eq!(
            dialect.delete_by_id("Users", "Id"),
            "DELETE FROM [Users] WHERE [Id] = @Id"
        );
    }

    #[test]
    fn test_basic_insert_without_read_back() {
        let dialect = SqlServerDialect;
        assert_eq!(
            dialect.basic_insert("Logs", &["Message", "Level"], &[]),
            "INSERT INTO [Logs] ([Message], [Level]) VALUES (@Message, @Level)"
        );
    }

    #[test]
    fn test_basic_insert_with_read_back() {
        let dialect = SqlServerDialect;
        assert_eq!(
            dialect.basic_insert("Users", &["Email"], &["Id"]),
            "INSERT INTO [Users] ([Email]) OUTPUT INSERTED.[Id] VALUES (@Email)"
        );
    }

    #[test]
    fn test_advanced_insert_fragments() {
        let dialect = SqlServerDialect;
        let insert = dialect.advanced_insert("Users");

        assert!(insert.starts_with("INSERT INTO [Users] ("));
        assert!(insert.contains("{outputText}VALUES"));
        assert!(dialect.advanced_insert_output().starts_with("OUTPUT "));
        assert!(dialect.advanced_insert_output().ends_with(' '));
    }
}
