//! Database introspection
//!
//! This module provides functionality for extracting table and column
//! metadata from databases. Each supported database has its own feature-gated
//! submodule; the pure dialect text lives in [`crate::dialect`].

use tracing::{debug, trace};

use crate::prelude::DapgenError;
use crate::schema::{ColumnMeta, TableMeta};

/// Filters to apply when resolving the target table set
#[derive(Debug, Default, Clone)]
pub struct TableFilter {
    /// Only include these tables (if Some)
    pub include: Option<Vec<String>>,
    /// Exclude these tables
    pub exclude: Option<Vec<String>>,
}

impl TableFilter {
    /// Check if a table should be included
    pub fn should_include(&self, table_name: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.iter().any(|t| t == table_name) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.iter().any(|t| t == table_name) {
                return false;
            }
        }

        true
    }
}

/// Trait for per-engine metadata readers
pub trait SchemaReader {
    /// List base tables in the configured schema, alphabetically
    fn list_tables(&mut self) -> Result<Vec<String>, DapgenError>;

    /// List a table's columns in native ordinal order
    ///
    /// Returns an empty vector (not an error) when the table has no columns
    /// matching the catalog filters.
    fn list_columns(&mut self, table: &str) -> Result<Vec<ColumnMeta>, DapgenError>;
}

/// Resolve the target table set and fetch column metadata for each table
///
/// Strictly sequential; the first failure aborts the run.
pub fn read_tables(
    reader: &mut dyn SchemaReader,
    filter: &TableFilter,
) -> Result<Vec<TableMeta>, DapgenError> {
    let all_table_names = reader.list_tables()?;
    debug!(count = ?all_table_names.len(), "Found all tables");

    let table_names: Vec<String> = all_table_names
        .into_iter()
        .filter(|name| filter.should_include(name))
        .collect();
    debug!(count = ?table_names.len(), "Tables after filtering");

    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in table_names {
        debug!(table = ?table_name, "Introspecting table");

        let columns = reader.list_columns(&table_name)?;
        trace!(table = ?table_name, columns = ?columns.len(), "Found columns");

        tables.push(TableMeta {
            name: table_name,
            columns,
        });
    }

    Ok(tables)
}

// Feature-gated database implementations
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresReader;

#[cfg(feature = "mssql")]
mod mssql;

#[cfg(feature = "mssql")]
pub use mssql::MssqlReader;
