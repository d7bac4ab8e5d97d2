//! C# code generator
//!
//! Renders one Dapper-compatible POCO class per table and, on request, an
//! aggregate `IDbConnection` extensions artifact with the CRUD methods for
//! every generated type.

use std::fs;
use std::path::Path;

use minijinja::Environment;
use tracing::{debug, info};

use crate::codegen::{CodeGenConfig, CodeGenerator};
use crate::dialect::Dialect;
use crate::error::DapgenError;
use crate::schema::{class_name, GeneratedProperty, GeneratedType, TableMeta};

const AUTO_GENERATED_HEADER: &str = "// <auto-generated>
// This code was generated by a tool.
// Changes to this file may cause incorrect behavior and will be lost if the code is regenerated.
// </auto-generated>

#nullable enable

";

/// C# code generator bound to one SQL dialect
pub struct CsharpGenerator {
    env: Environment<'static>,
    dialect: Box<dyn Dialect>,
}

impl CsharpGenerator {
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        let mut env = Environment::new();

        // Escape for a C# string literal
        env.add_filter("csstr", |value: String| {
            value.replace('\\', "\\\\").replace('"', "\\\"")
        });

        env.add_template("class", include_str!("templates/class.cs.jinja"))
            .expect("Failed to load class template");
        env.add_template("list", include_str!("templates/list.cs.jinja"))
            .expect("Failed to load list template");
        env.add_template("get_by_id", include_str!("templates/get_by_id.cs.jinja"))
            .expect("Failed to load get_by_id template");
        env.add_template(
            "insert_basic",
            include_str!("templates/insert_basic.cs.jinja"),
        )
        .expect("Failed to load insert_basic template");
        env.add_template(
            "insert_advanced",
            include_str!("templates/insert_advanced.cs.jinja"),
        )
        .expect("Failed to load insert_advanced template");
        env.add_template("save", include_str!("templates/save.cs.jinja"))
            .expect("Failed to load save template");
        env.add_template("update", include_str!("templates/update.cs.jinja"))
            .expect("Failed to load update template");
        env.add_template("delete", include_str!("templates/delete.cs.jinja"))
            .expect("Failed to load delete template");
        env.add_template("extensions", include_str!("templates/extensions.cs.jinja"))
            .expect("Failed to load extensions template");

        Self { env, dialect }
    }

    /// Render the per-table class artifact
    pub fn render_class(&self, ty: &GeneratedType, namespace: &str) -> Result<String, DapgenError> {
        let ctx = minijinja::context! {
            header => AUTO_GENERATED_HEADER,
            usings => collect_usings(ty),
            namespace => namespace,
            name => &ty.name,
            properties => ty.properties.iter().map(property_context).collect::<Vec<_>>(),
        };

        let rendered = self.render("class", ty, ctx)?;
        Ok(normalize(&rendered))
    }

    /// Render the aggregate extensions artifact for all generated types
    pub fn render_extensions(
        &self,
        types: &[GeneratedType],
        namespace: &str,
        database_name: &str,
    ) -> Result<String, DapgenError> {
        let blocks = types
            .iter()
            .map(|ty| self.render_table_methods(ty))
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = minijinja::context! {
            header => AUTO_GENERATED_HEADER,
            namespace => namespace,
            class_name => format!("{database_name}ConnectionExtensions"),
            body => blocks.join("\n"),
        };

        let template = self
            .env
            .get_template("extensions")
            .map_err(|e| DapgenError::CodeGen {
                table: "extensions".to_string(),
                message: format!("Template error: {}", e),
            })?;

        let rendered = template.render(ctx).map_err(|e| DapgenError::CodeGen {
            table: "extensions".to_string(),
            message: format!("Render error: {}", e),
        })?;

        Ok(normalize(&rendered))
    }

    /// Render all CRUD methods for one type
    ///
    /// List and Insert are always emitted; GetById, Save, Update and Delete
    /// only when the type has an identity column. Methods are separated by a
    /// blank line.
    pub fn render_table_methods(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let mut methods = vec![self.render_list(ty)?, self.render_insert(ty)?];

        if ty.has_identity() {
            methods.push(self.render_get_by_id(ty)?);
            methods.push(self.render_save(ty)?);
            methods.push(self.render_update(ty)?);
            methods.push(self.render_delete(ty)?);
        }

        Ok(methods.join("\n"))
    }

    fn render_list(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let ctx = minijinja::context! {
            name => &ty.name,
            select_all => self.dialect.select_all(&ty.table_name),
            select_where => self.dialect.select_where(&ty.table_name),
        };

        self.render_method("list", ty, ctx)
    }

    /// Strategy selection: a type with no defaulted write columns gets the
    /// fixed-shape insert; otherwise the generated code partitions the
    /// defaulted columns at call time.
    fn render_insert(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        if ty.default_properties().is_empty() {
            self.render_basic_insert(ty)
        } else {
            self.render_advanced_insert(ty)
        }
    }

    fn render_basic_insert(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let write = ty.write_properties();
        let read_back = ty.read_back_properties();

        let write_names: Vec<&str> = write.iter().map(|p| p.name.as_str()).collect();
        let read_back_names: Vec<&str> = read_back.iter().map(|p| p.name.as_str()).collect();

        let ctx = minijinja::context! {
            name => &ty.name,
            insert_query => self.dialect.basic_insert(&ty.table_name, &write_names, &read_back_names),
            read_back => read_back.iter().map(|p| property_context(p)).collect::<Vec<_>>(),
        };

        self.render_method("insert_basic", ty, ctx)
    }

    fn render_advanced_insert(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let read_back = ty.read_back_properties();
        let default_columns = ty.default_properties();
        let non_default: Vec<&GeneratedProperty> = ty
            .write_properties()
            .into_iter()
            .filter(|p| !p.has_default)
            .collect();

        let ctx = minijinja::context! {
            name => &ty.name,
            non_default_list => quoted_name_list(&non_default),
            read_back_list => quoted_name_list(&read_back),
            default_columns => default_columns.iter().map(|p| property_context(p)).collect::<Vec<_>>(),
            read_back => read_back.iter().map(|p| property_context(p)).collect::<Vec<_>>(),
            output_fragment => self.dialect.advanced_insert_output(),
            insert_fragment => self.dialect.advanced_insert(&ty.table_name),
        };

        self.render_method("insert_advanced", ty, ctx)
    }

    fn render_get_by_id(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let identity = self.identity(ty)?;

        let ctx = minijinja::context! {
            name => &ty.name,
            id_type => &identity.cs_type,
            select_by_id => self.dialect.select_by_id(&ty.table_name, &identity.name),
        };

        self.render_method("get_by_id", ty, ctx)
    }

    fn render_save(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let identity = self.identity(ty)?;

        let ctx = minijinja::context! {
            name => &ty.name,
            id_name => &identity.name,
        };

        self.render_method("save", ty, ctx)
    }

    fn render_update(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let identity = self.identity(ty)?;
        let write_names: Vec<&str> = ty
            .write_properties()
            .iter()
            .map(|p| p.name.as_str())
            .collect();

        let ctx = minijinja::context! {
            name => &ty.name,
            update_query => self.dialect.update_by_id(&ty.table_name, &identity.name, &write_names),
        };

        self.render_method("update", ty, ctx)
    }

    fn render_delete(&self, ty: &GeneratedType) -> Result<String, DapgenError> {
        let identity = self.identity(ty)?;

        let ctx = minijinja::context! {
            name => &ty.name,
            id_name => &identity.name,
            delete_query => self.dialect.delete_by_id(&ty.table_name, &identity.name),
        };

        self.render_method("delete", ty, ctx)
    }

    fn identity<'t>(&self, ty: &'t GeneratedType) -> Result<&'t GeneratedProperty, DapgenError> {
        ty.identity_property().ok_or_else(|| DapgenError::CodeGen {
            table: ty.table_name.clone(),
            message: "Method requires an identity column".to_string(),
        })
    }

    fn render_method(
        &self,
        template_name: &str,
        ty: &GeneratedType,
        ctx: minijinja::Value,
    ) -> Result<String, DapgenError> {
        let rendered = self.render(template_name, ty, ctx)?;
        Ok(normalize(&rendered))
    }

    fn render(
        &self,
        template_name: &str,
        ty: &GeneratedType,
        ctx: minijinja::Value,
    ) -> Result<String, DapgenError> {
        let template = self
            .env
            .get_template(template_name)
            .map_err(|e| DapgenError::CodeGen {
                table: ty.table_name.clone(),
                message: format!("Template error: {}", e),
            })?;

        template.render(ctx).map_err(|e| DapgenError::CodeGen {
            table: ty.table_name.clone(),
            message: format!("Render error: {}", e),
        })
    }

    /// Delete previously generated files from the output directory
    fn clean_generated(&self, output_dir: &Path) -> Result<(), DapgenError> {
        for entry in fs::read_dir(output_dir)? {
            let entry = entry?;
            let path = entry.path();

            let is_generated = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".g.cs"));

            if is_generated {
                info!(path = ?path, "Deleting file");
                fs::remove_file(&path)?;
            }
        }

        Ok(())
    }
}

impl CodeGenerator for CsharpGenerator {
    fn generate(&self, tables: &[TableMeta], config: &CodeGenConfig) -> Result<(), DapgenError> {
        info!(
            output = ?config.output_path,
            namespace = ?config.namespace,
            dialect = ?self.dialect.name(),
            "Generating C# code"
        );

        fs::create_dir_all(&config.output_path)?;

        if config.clean {
            self.clean_generated(&config.output_path)?;
        }

        let mut types = Vec::with_capacity(tables.len());
        for table in tables {
            let path = config
                .output_path
                .join(format!("{}.g.cs", class_name(&table.name)));

            info!(table = ?table.name, path = ?path, "Writing class file");

            // Destination check happens before any rendering work
            if !config.force && path.exists() {
                return Err(DapgenError::TargetExists { path });
            }

            let ty = GeneratedType::from_columns(&table.name, &table.columns, self.dialect.as_ref());
            let code = self.render_class(&ty, &config.namespace)?;
            fs::write(&path, code)?;
            debug!(path = ?path, "File written");

            types.push(ty);
        }

        if config.extensions {
            let path = config.output_path.join(format!(
                "{}ConnectionExtensions.g.cs",
                config.database_name
            ));

            info!(path = ?path, "Writing extensions file");

            if !config.force && path.exists() {
                return Err(DapgenError::TargetExists { path });
            }

            let code = self.render_extensions(&types, &config.namespace, &config.database_name)?;
            fs::write(&path, code)?;
            debug!(path = ?path, "File written");
        }

        info!(tables = tables.len(), "C# code generation complete");

        Ok(())
    }
}

/// Trim trailing whitespace and end with exactly one newline
fn normalize(rendered: &str) -> String {
    format!("{}\n", rendered.trim_end())
}

/// `"A", "B"` list for C# collection initializers; empty string when empty
fn quoted_name_list(properties: &[&GeneratedProperty]) -> String {
    properties
        .iter()
        .map(|p| format!("\"{}\"", p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn property_context(p: &GeneratedProperty) -> minijinja::Value {
    minijinja::context! {
        name => &p.name,
        cs_type => &p.cs_type,
        fallback => p.fallback_value(),
        initializer => initializer(p),
    }
}

/// Non-nullable string properties are initialized so the class is valid
/// under `#nullable enable`
fn initializer(p: &GeneratedProperty) -> Option<&'static str> {
    if p.cs_type == "string" {
        Some("string.Empty")
    } else {
        None
    }
}

/// Accumulate `using` declarations required by the property types
fn collect_usings(ty: &GeneratedType) -> Vec<String> {
    let mut usings = Vec::new();

    for p in &ty.properties {
        let required = match p.base_type() {
            "DateTime" | "DateTimeOffset" | "TimeSpan" | "Guid" => Some("System"),
            "XDocument" => Some("System.Xml.Linq"),
            _ => None,
        };

        if let Some(ns) = required {
            if !usings.iter().any(|u| u == ns) {
                usings.push(ns.to_string());
            }
        }
    }

    usings.sort();
    usings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqlServerDialect};
    use crate::schema::ColumnMeta;

    fn col(name: &str, native: &str, nullable: bool, identity: bool, default: bool) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            native_type: native.to_string(),
            is_nullable: nullable,
            is_identity: identity,
            has_default: default,
        }
    }

    fn mssql_generator() -> CsharpGenerator {
        CsharpGenerator::new(Box::new(SqlServerDialect))
    }

    fn users_type(generator: &CsharpGenerator) -> GeneratedType {
        let columns = vec![
            col("Id", "int", false, true, false),
            col("Email", "varchar", false, false, false),
            col("CreatedAt", "datetime", false, false, true),
        ];
        GeneratedType::from_columns("Users", &columns, generator.dialect.as_ref())
    }

    fn logs_type(generator: &CsharpGenerator) -> GeneratedType {
        let columns = vec![
            col("Message", "varchar", true, false, false),
            col("Level", "int", false, false, false),
        ];
        GeneratedType::from_columns("Logs", &columns, generator.dialect.as_ref())
    }

    #[test]
    fn test_class_rendering() {
        let generator = mssql_generator();
        let ty = users_type(&generator);

        let code = generator.render_class(&ty, "MyApp.Data").unwrap();

        assert!(code.starts_with("// <auto-generated>"));
        assert!(code.contains("#nullable enable"));
        assert!(code.contains("using System;"));
        assert!(code.contains("namespace MyApp.Data;"));
        assert!(code.contains("public class Users"));
        assert!(code.contains("    public int Id { get; set; }\n"));
        assert!(code.contains("    public string Email { get; set; } = string.Empty;\n"));
        assert!(code.contains("    public DateTime CreatedAt { get; set; }\n"));
    }

    #[test]
    fn test_class_property_order_matches_columns() {
        let generator = mssql_generator();
        let ty = users_type(&generator);

        let code = generator.render_class(&ty, "Project").unwrap();

        let id_pos = code.find("public int Id").unwrap();
        let email_pos = code.find("public string Email").unwrap();
        let created_pos = code.find("public DateTime CreatedAt").unwrap();
        assert!(id_pos < email_pos && email_pos < created_pos);
    }

    #[test]
    fn test_nullable_string_has_no_initializer() {
        let generator = mssql_generator();
        let ty = logs_type(&generator);

        let code = generator.render_class(&ty, "Project").unwrap();

        assert!(code.contains("    public string? Message { get; set; }\n"));
        assert!(!code.contains("Message { get; set; } ="));
    }

    #[test]
    fn test_method_set_with_identity() {
        let generator = mssql_generator();
        let ty = users_type(&generator);

        let methods = generator.render_table_methods(&ty).unwrap();

        assert!(methods.contains("GetUsersListAsync"));
        assert!(methods.contains("InsertAsync"));
        assert!(methods.contains("GetUsersByIdAsync"));
        assert!(methods.contains("SaveAsync"));
        assert!(methods.contains("UpdateAsync"));
        assert!(methods.contains("DeleteAsync"));
    }

    #[test]
    fn test_method_set_without_identity() {
        let generator = mssql_generator();
        let ty = logs_type(&generator);

        let methods = generator.render_table_methods(&ty).unwrap();

        assert!(methods.contains("GetLogsListAsync"));
        assert!(methods.contains("InsertAsync"));
        assert!(!methods.contains("ByIdAsync"));
        assert!(!methods.contains("SaveAsync"));
        assert!(!methods.contains("UpdateAsync"));
        assert!(!methods.contains("DeleteAsync"));
    }

    #[test]
    fn test_insert_strategy_selection() {
        let generator = mssql_generator();

        // Users has a defaulted write column, so the advanced shape is used
        let users = generator.render_table_methods(&users_type(&generator)).unwrap();
        assert!(users.contains("var insertColumns = new List<string>"));

        // Logs has none, so the basic shape is used
        let logs = generator.render_table_methods(&logs_type(&generator)).unwrap();
        assert!(!logs.contains("insertColumns"));
        assert!(logs.contains("await connection.ExecuteAsync(insertQuery, obj);"));
    }

    #[test]
    fn test_basic_insert_without_read_back_executes_for_effect() {
        let generator = mssql_generator();
        let logs = generator.render_table_methods(&logs_type(&generator)).unwrap();

        assert!(logs.contains(
            "var insertQuery = \"INSERT INTO [Logs] ([Message], [Level]) VALUES (@Message, @Level)\";"
        ));
        assert!(!logs.contains("insertedObj"));
    }

    #[test]
    fn test_advanced_insert_partitions_default_columns_at_runtime() {
        let generator = mssql_generator();
        let methods = generator.render_table_methods(&users_type(&generator)).unwrap();

        assert!(methods.contains("var insertColumns = new List<string> { \"Email\" };"));
        assert!(methods.contains("var outputColumns = new List<string> { \"Id\" };"));
        assert!(methods.contains(
            "if (obj.CreatedAt != default) { insertColumns.Add(\"CreatedAt\"); } else { outputColumns.Add(\"CreatedAt\"); }"
        ));
        assert!(methods.contains("var outputText = outputColumns.Any() ? $\"OUTPUT "));
        assert!(methods.contains("obj.Id = insertedObj?.Id ?? default;"));
        assert!(methods.contains(
            "if (obj.CreatedAt == default) { obj.CreatedAt = insertedObj?.CreatedAt ?? default; }"
        ));
    }

    #[test]
    fn test_advanced_insert_empty_output_list_renders_constructor() {
        let generator = mssql_generator();
        // No identity, but a defaulted column: read-back list starts empty
        let columns = vec![
            col("Name", "varchar", false, false, false),
            col("CreatedAt", "datetime", false, false, true),
        ];
        let ty = GeneratedType::from_columns("Jobs", &columns, generator.dialect.as_ref());

        let methods = generator.render_table_methods(&ty).unwrap();

        assert!(methods.contains("var outputColumns = new List<string>();"));
    }

    #[test]
    fn test_update_falls_back_to_insert_on_zero_rows() {
        let generator = mssql_generator();
        let methods = generator.render_table_methods(&users_type(&generator)).unwrap();

        assert!(methods.contains("var rowsAffected = await connection.ExecuteAsync(updateQuery, obj);"));
        assert!(methods.contains("if (rowsAffected == 0)\n        {\n            await connection.InsertAsync(obj);"));
    }

    #[test]
    fn test_save_dispatches_on_identity_default() {
        let generator = mssql_generator();
        let methods = generator.render_table_methods(&users_type(&generator)).unwrap();

        assert!(methods.contains("if (obj.Id == default)"));
    }

    #[test]
    fn test_delete_resets_identity() {
        let generator = mssql_generator();
        let methods = generator.render_table_methods(&users_type(&generator)).unwrap();

        assert!(methods.contains("var deleteQuery = \"DELETE FROM [Users] WHERE [Id] = @Id\";"));
        assert!(methods.contains("obj.Id = default;"));
    }

    #[test]
    fn test_postgres_read_back_uses_returning() {
        let generator = CsharpGenerator::new(Box::new(PostgresDialect));
        let columns = vec![
            col("id", "integer", false, true, true),
            col("email", "character varying", false, false, false),
        ];
        let ty = GeneratedType::from_columns("users", &columns, generator.dialect.as_ref());

        let methods = generator.render_table_methods(&ty).unwrap();

        assert!(methods.contains(
            "var insertQuery = \"INSERT INTO \\\"users\\\" (\\\"email\\\") VALUES (@email) RETURNING \\\"id\\\"\";"
        ));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let generator = mssql_generator();
        let ty = users_type(&generator);

        let first = generator.render_class(&ty, "Project").unwrap();
        let second = generator.render_class(&ty, "Project").unwrap();
        assert_eq!(first, second);

        let first_methods = generator.render_table_methods(&ty).unwrap();
        let second_methods = generator.render_table_methods(&ty).unwrap();
        assert_eq!(first_methods, second_methods);
    }

    #[test]
    fn test_extensions_method_order() {
        let generator = mssql_generator();
        let types = vec![users_type(&generator), logs_type(&generator)];

        let code = generator
            .render_extensions(&types, "Project", "Shop")
            .unwrap();

        assert!(code.contains("public static class ShopConnectionExtensions"));

        let list_pos = code.find("GetUsersListAsync").unwrap();
        let insert_pos = code.find("Task InsertAsync(this IDbConnection connection, Users obj)").unwrap();
        let by_id_pos = code.find("GetUsersByIdAsync").unwrap();
        let save_pos = code.find("SaveAsync").unwrap();
        let update_pos = code.find("UpdateAsync(this IDbConnection connection, Users obj)").unwrap();
        let delete_pos = code.find("DeleteAsync").unwrap();
        let logs_pos = code.find("GetLogsListAsync").unwrap();

        assert!(list_pos < insert_pos);
        assert!(insert_pos < by_id_pos);
        assert!(by_id_pos < save_pos);
        assert!(save_pos < update_pos);
        assert!(update_pos < delete_pos);
        assert!(delete_pos < logs_pos);
    }

    fn sample_tables() -> Vec<TableMeta> {
        vec![
            TableMeta {
                name: "Logs".to_string(),
                columns: vec![
                    col("Message", "varchar", true, false, false),
                    col("Level", "int", false, false, false),
                ],
            },
            TableMeta {
                name: "Users".to_string(),
                columns: vec![
                    col("Id", "int", false, true, false),
                    col("Email", "varchar", false, false, false),
                ],
            },
        ]
    }

    #[test]
    fn test_generate_writes_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mssql_generator();
        let config = CodeGenConfig::new(dir.path().to_path_buf(), "Shop").with_extensions(true);

        generator.generate(&sample_tables(), &config).unwrap();

        assert!(dir.path().join("Logs.g.cs").exists());
        assert!(dir.path().join("Users.g.cs").exists());
        assert!(dir.path().join("ShopConnectionExtensions.g.cs").exists());
    }

    #[test]
    fn test_generate_twice_with_force_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mssql_generator();
        let tables = sample_tables();
        let config = CodeGenConfig::new(dir.path().to_path_buf(), "Shop")
            .with_extensions(true)
            .with_force(true);

        generator.generate(&tables, &config).unwrap();
        let first = fs::read(dir.path().join("ShopConnectionExtensions.g.cs")).unwrap();

        generator.generate(&tables, &config).unwrap();
        let second = fs::read(dir.path().join("ShopConnectionExtensions.g.cs")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_without_force_fails_and_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mssql_generator();
        let tables = sample_tables();

        let existing = dir.path().join("Logs.g.cs");
        fs::write(&existing, "hand-edited").unwrap();

        let config = CodeGenConfig::new(dir.path().to_path_buf(), "Shop");
        let result = generator.generate(&tables, &config);

        assert!(matches!(result, Err(DapgenError::TargetExists { .. })));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "hand-edited");
    }

    #[test]
    fn test_clean_removes_only_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mssql_generator();

        fs::write(dir.path().join("Stale.g.cs"), "old").unwrap();
        fs::write(dir.path().join("Manual.cs"), "keep").unwrap();

        let config = CodeGenConfig::new(dir.path().to_path_buf(), "Shop").with_clean(true);
        generator.generate(&sample_tables(), &config).unwrap();

        assert!(!dir.path().join("Stale.g.cs").exists());
        assert!(dir.path().join("Manual.cs").exists());
    }
}
