//! Code generation
//!
//! This module provides functionality for generating Dapper-style C# data
//! access code from the introspected table metadata.

use std::path::PathBuf;

use crate::error::DapgenError;
use crate::schema::TableMeta;

pub mod csharp;

pub use csharp::CsharpGenerator;

/// Configuration for code generation
#[derive(Debug, Clone)]
pub struct CodeGenConfig {
    /// Output directory
    pub output_path: PathBuf,
    /// C# namespace interpolated verbatim into each artifact
    pub namespace: String,
    /// Database name, used for the extensions artifact's name
    pub database_name: String,
    /// Overwrite existing artifacts
    pub force: bool,
    /// Delete previously generated files before writing
    pub clean: bool,
    /// Also emit the aggregate CRUD extensions artifact
    pub extensions: bool,
}

impl CodeGenConfig {
    pub fn new(output_path: PathBuf, database_name: &str) -> Self {
        Self {
            output_path,
            namespace: "Project".to_string(),
            database_name: database_name.to_string(),
            force: false,
            clean: false,
            extensions: false,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_extensions(mut self, extensions: bool) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Trait for language-specific code generators
pub trait CodeGenerator {
    /// Generate all artifacts for the given tables
    fn generate(&self, tables: &[TableMeta], config: &CodeGenConfig) -> Result<(), DapgenError>;
}
