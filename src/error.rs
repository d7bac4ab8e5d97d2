use std::path::PathBuf;

use thiserror::Error;

/// dapgen errors
#[derive(Error, Debug)]
pub enum DapgenError {
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Failed to introspect table '{table}': {message}")]
    Introspection { table: String, message: String },

    #[error("Code generation failed for table '{table}': {message}")]
    CodeGen { table: String, message: String },

    #[error("File \"{}\" already exists! Use --force to overwrite.", .path.display())]
    TargetExists { path: PathBuf },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
