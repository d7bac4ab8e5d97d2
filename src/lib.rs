//! # dapgen
//!
//! Generate Dapper-style C# data access code from a live database schema
//!
//! This crate provides a CLI tool and library for introspecting database
//! schemas and scaffolding one POCO class per table plus CRUD extension
//! methods on `IDbConnection`.

pub mod codegen;
pub mod config;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod schema;

pub mod prelude {
    pub use crate::codegen::{CodeGenConfig, CodeGenerator, CsharpGenerator};
    pub use crate::config::DbConfig;
    pub use crate::dialect::{Dialect, PostgresDialect, SqlServerDialect};
    pub use crate::error::DapgenError;
    pub use crate::introspect::{SchemaReader, TableFilter};
    pub use crate::schema::{ColumnMeta, GeneratedProperty, GeneratedType, TableMeta};
}

#[cfg(feature = "postgres")]
pub use introspect::PostgresReader;

#[cfg(feature = "mssql")]
pub use introspect::MssqlReader;
