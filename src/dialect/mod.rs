//! Database dialects
//!
//! A [`Dialect`] supplies everything engine-specific that does not require a
//! live connection: the native-to-C# type table and the SQL text used by the
//! generated CRUD methods. The renderer and orchestrator depend only on this
//! trait, so supporting a new engine means implementing it (plus a schema
//! reader in [`crate::introspect`]).

mod mssql;
mod postgres;

pub use mssql::SqlServerDialect;
pub use postgres::PostgresDialect;

/// Engine-specific SQL text and type mapping
///
/// All methods are pure string builders. The `select_where` result and the
/// two `advanced_*` fragments are destined for C# *interpolated* string
/// literals in the generated code: they keep `{...}` holes that the generated
/// code fills at call time, and the advanced fragments arrive pre-escaped for
/// a C# literal. Every other builder returns plain SQL.
pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Schema searched when the caller does not name one
    fn default_schema(&self) -> &'static str;

    /// Map a native type name to a C# type name
    ///
    /// Total: unmapped types yield an `UNKNOWN_<native>` placeholder so
    /// generation can proceed and surface the gap in the output.
    fn map_type(&self, native_type: &str) -> String;

    /// Quote an identifier (`[x]` on SQL Server, `"x"` on Postgres)
    fn quote(&self, ident: &str) -> String;

    fn select_all(&self, table: &str) -> String;

    /// Select with a `{whereClause}` hole filled by the generated code
    fn select_where(&self, table: &str) -> String;

    fn select_by_id(&self, table: &str, id_column: &str) -> String;

    fn update_by_id(&self, table: &str, id_column: &str, columns: &[&str]) -> String;

    fn delete_by_id(&self, table: &str, id_column: &str) -> String;

    /// Fixed-shape insert over the write set
    ///
    /// When `read_back` is non-empty the statement returns those columns via
    /// the dialect's mechanism (OUTPUT / RETURNING).
    fn basic_insert(&self, table: &str, columns: &[&str], read_back: &[&str]) -> String;

    /// Insert whose column and parameter lists are built per call by the
    /// generated code from `insertColumns`, with `{outputText}` spliced at
    /// the dialect-correct position
    fn advanced_insert(&self, table: &str) -> String;

    /// Output-clause fragment built per call from `outputColumns`
    fn advanced_insert_output(&self) -> String;
}

/// Render a `@Param` list for the given column names
pub(crate) fn param_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("@{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
