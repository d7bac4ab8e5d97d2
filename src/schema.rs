//! Schema data structures
//!
//! These types represent database column metadata and the in-memory model of
//! a generated C# type. They form the contract between introspection
//! (produces) and code generation (consumes).

use tracing::warn;

use crate::dialect::Dialect;

/// Metadata for a single database column
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    /// Native type name as reported by the engine's catalog
    pub native_type: String,
    pub is_nullable: bool,
    /// Value is assigned by the engine on insert (SERIAL, IDENTITY)
    pub is_identity: bool,
    /// Engine supplies a value when the column is omitted from an insert
    pub has_default: bool,
}

/// A table with its columns in native ordinal order
#[derive(Debug, Clone)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
}

/// A property of a generated C# class
#[derive(Debug, Clone)]
pub struct GeneratedProperty {
    /// Identical to the column name
    pub name: String,
    /// Mapped C# type name, with a `?` suffix for nullable columns
    pub cs_type: String,
    /// Never written by insert/update
    pub readonly: bool,
    pub has_default: bool,
}

impl GeneratedProperty {
    /// C# type name without the nullable suffix
    pub fn base_type(&self) -> &str {
        self.cs_type.trim_end_matches('?')
    }

    /// C# expression used when a read-back value is absent
    ///
    /// Nullable strings fall back to `default` (null), so only the exact
    /// `string` type gets `string.Empty`.
    pub fn fallback_value(&self) -> &'static str {
        if self.cs_type == "string" {
            "string.Empty"
        } else {
            "default"
        }
    }
}

/// In-memory model of a generated C# class
///
/// Properties keep the native column order; the order is part of the output
/// contract (regenerating from unchanged metadata is byte-identical).
#[derive(Debug, Clone)]
pub struct GeneratedType {
    pub name: String,
    pub table_name: String,
    pub properties: Vec<GeneratedProperty>,
    /// Name of the identity column, if the table has one
    pub identity_column: Option<String>,
}

impl GeneratedType {
    /// Build the model for one table from its ordered column metadata
    pub fn from_columns(table_name: &str, columns: &[ColumnMeta], dialect: &dyn Dialect) -> Self {
        let name = class_name(table_name);

        let identity_column = columns
            .iter()
            .find(|col| col.is_identity)
            .map(|col| col.name.clone());

        let mut properties = Vec::with_capacity(columns.len());
        for col in columns {
            let mut cs_type = dialect.map_type(&col.native_type);

            if cs_type.starts_with("UNKNOWN_") {
                warn!(
                    table = ?table_name,
                    column = ?col.name,
                    native_type = ?col.native_type,
                    "No type mapping, emitting placeholder for manual fix-up"
                );
            }

            if col.is_nullable {
                cs_type.push('?');
            }

            properties.push(GeneratedProperty {
                name: col.name.clone(),
                cs_type,
                readonly: false,
                has_default: col.has_default,
            });
        }

        Self {
            name,
            table_name: table_name.to_string(),
            properties,
            identity_column,
        }
    }

    /// The identity column's property, if present
    pub fn identity_property(&self) -> Option<&GeneratedProperty> {
        let identity = self.identity_column.as_deref()?;
        self.properties.iter().find(|p| p.name == identity)
    }

    pub fn has_identity(&self) -> bool {
        self.identity_property().is_some()
    }

    /// Properties eligible to appear in INSERT/UPDATE statements
    ///
    /// The identity column is always excluded, regardless of its readonly
    /// flag, because its value is server-assigned.
    pub fn write_properties(&self) -> Vec<&GeneratedProperty> {
        self.properties
            .iter()
            .filter(|p| Some(p.name.as_str()) != self.identity_column.as_deref() && !p.readonly)
            .collect()
    }

    /// Properties whose post-write value must be re-fetched from the database
    pub fn read_back_properties(&self) -> Vec<&GeneratedProperty> {
        self.properties
            .iter()
            .filter(|p| Some(p.name.as_str()) == self.identity_column.as_deref() || p.readonly)
            .collect()
    }

    /// Write-set properties with a server-side default
    pub fn default_properties(&self) -> Vec<&GeneratedProperty> {
        self.write_properties()
            .into_iter()
            .filter(|p| p.has_default)
            .collect()
    }
}

/// Derive a C# class name from a table name
///
/// Whitespace is stripped, characters outside the identifier grammar are
/// replaced with underscores, and a leading digit gets an underscore prefix.
pub fn class_name(table_name: &str) -> String {
    let mut name: String = table_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    name
}
