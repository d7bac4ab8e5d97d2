use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dapgen::codegen::{CodeGenConfig, CodeGenerator, CsharpGenerator};
use dapgen::config::DbConfig;
use dapgen::dialect::{Dialect, PostgresDialect, SqlServerDialect};
use dapgen::introspect::TableFilter;
use dapgen::schema::TableMeta;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Database {
    Postgres,
    Mssql,
}

impl Database {
    fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Database::Postgres => Box::new(PostgresDialect),
            Database::Mssql => Box::new(SqlServerDialect),
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Database::Postgres => 5432,
            Database::Mssql => 1433,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dapgen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Target database engine
    database: Database,

    /// Output directory for generated files
    #[arg(short, long, default_value = "./generated")]
    output: PathBuf,

    /// C# namespace for generated files
    #[arg(short, long, default_value = "Project")]
    namespace: String,

    /// Database schema to introspect (default: engine's standard schema)
    #[arg(long)]
    schema: Option<String>,

    /// Path to .env file for connection config
    #[arg(long, default_value = "./.env")]
    env_file: PathBuf,

    /// Comma-separated list of tables to include (default: all)
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Comma-separated list of tables to exclude
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Overwrite existing generated files
    #[arg(short, long)]
    force: bool,

    /// Delete previously generated files before writing
    #[arg(long)]
    clean: bool,

    /// Also generate the aggregate connection-extensions file
    #[arg(short, long)]
    extensions: bool,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(e) = run() {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("dapgen v{}", env!("CARGO_PKG_VERSION"));
    info!(
        database = ?cli.database,
        output = ?cli.output,
        namespace = ?cli.namespace,
        extensions = ?cli.extensions,
        "Starting code generation"
    );

    // Load configuration
    let config = DbConfig::load(&cli.env_file, cli.database.default_port())
        .context("Failed to load database configuration")?;
    debug!(connection = ?config.redacted_connection_string(), "Loaded configuration");

    let dialect = cli.database.dialect();
    let schema_name = cli
        .schema
        .clone()
        .unwrap_or_else(|| dialect.default_schema().to_string());

    // Build table filter
    let filter = TableFilter {
        include: cli.tables,
        exclude: cli.exclude,
    };

    if filter.include.is_some() || filter.exclude.is_some() {
        debug!(filter = ?filter, "Table filter configured");
    }

    // Introspect database
    let tables = introspect_database(cli.database, &config, &schema_name, &filter)?;

    if tables.is_empty() {
        warn!("No tables found after filtering");
        return Ok(());
    }

    info!(tables = ?tables.len(), "Metadata ready for code generation");

    for table in &tables {
        debug!(table = ?table.name, columns = ?table.columns.len(), "Table");
    }

    let codegen_config = CodeGenConfig::new(cli.output, &config.database)
        .with_namespace(&cli.namespace)
        .with_force(cli.force)
        .with_clean(cli.clean)
        .with_extensions(cli.extensions);
    debug!(codegen_config = ?codegen_config, "Code generation config");

    let generator = CsharpGenerator::new(dialect);
    generator
        .generate(&tables, &codegen_config)
        .context("Failed to generate code")?;

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn introspect_database(
    database: Database,
    config: &DbConfig,
    schema_name: &str,
    filter: &TableFilter,
) -> Result<Vec<TableMeta>> {
    match database {
        Database::Postgres => introspect_postgres(config, schema_name, filter),
        Database::Mssql => introspect_mssql(config, schema_name, filter),
    }
}

#[cfg(feature = "postgres")]
fn introspect_postgres(
    config: &DbConfig,
    schema_name: &str,
    filter: &TableFilter,
) -> Result<Vec<TableMeta>> {
    use dapgen::introspect::read_tables;
    use dapgen::PostgresReader;
    use postgres::NoTls;

    info!(connection = ?config.redacted_connection_string(), "Connecting to PostgreSQL");

    let mut client = postgres::Client::connect(&config.postgres_connection_string(), NoTls)
        .with_context(|| {
            format!(
                "Failed to connect to PostgreSQL at {}",
                config.redacted_connection_string()
            )
        })?;

    info!("Connected to database");

    let mut reader = PostgresReader::new(&mut client, schema_name);
    let tables = read_tables(&mut reader, filter).context("Failed to introspect schema")?;

    Ok(tables)
}

#[cfg(not(feature = "postgres"))]
fn introspect_postgres(
    _config: &DbConfig,
    _schema_name: &str,
    _filter: &TableFilter,
) -> Result<Vec<TableMeta>> {
    anyhow::bail!("PostgreSQL support not enabled. Rebuild with --features postgres")
}

#[cfg(feature = "mssql")]
fn introspect_mssql(
    config: &DbConfig,
    schema_name: &str,
    filter: &TableFilter,
) -> Result<Vec<TableMeta>> {
    use dapgen::introspect::read_tables;
    use dapgen::MssqlReader;

    info!(connection = ?config.redacted_connection_string(), "Connecting to SQL Server");

    let mut reader = MssqlReader::connect(&config.mssql_connection_string(), schema_name)
        .with_context(|| {
            format!(
                "Failed to connect to SQL Server at {}",
                config.redacted_connection_string()
            )
        })?;

    info!("Connected to database");

    let tables = read_tables(&mut reader, filter).context("Failed to introspect schema")?;

    Ok(tables)
}

#[cfg(not(feature = "mssql"))]
fn introspect_mssql(
    _config: &DbConfig,
    _schema_name: &str,
    _filter: &TableFilter,
) -> Result<Vec<TableMeta>> {
    anyhow::bail!("SQL Server support not enabled. Rebuild with --features mssql")
}
