use anyhow::Context;
use clap::Parser;
use dbquery::catalog::CatalogConfig;
use dbquery::config::{self, CompilerConfig};
use dbquery::dialect::DialectKind;
use dbquery::query::QuerySpec;
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// dbquery - compile declarative queries to SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entity catalog (YAML)
    #[arg(long)]
    catalog: PathBuf,

    /// Query definition (YAML)
    #[arg(long)]
    query: PathBuf,

    /// Target dialect (oracle, mysql, postgresql, db2, sqlserver)
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Compiler configuration file (YAML); CLI options override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Schema used for tables without a configured schema
    #[arg(long)]
    default_schema: Option<String>,

    /// Schema mappings, `id=NAME[,id=NAME...]`
    #[arg(long, value_parser = parse_schemas, default_value = "")]
    schemas: HashMap<String, String>,

    /// Compare text case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Fail on ambiguous automatic joins
    #[arg(long)]
    strict_joins: bool,

    /// Leave unreferenced outer-joined tables out of FROM
    #[arg(long)]
    prune_outer_joins: bool,

    /// Compile the row count instead of the rows
    #[arg(long)]
    count: bool,

    /// Print SQL, binds and columns as JSON
    #[arg(long)]
    json: bool,
}

fn parse_schemas(value: &str) -> Result<HashMap<String, String>, String> {
    config::parse_schema_list(value).map_err(|e| e.to_string())
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            dialect: cli.dialect,
            default_schema: cli.default_schema.clone(),
            schemas: cli.schemas.clone(),
            case_sensitive: cli.case_sensitive,
            strict_joins: cli.strict_joins,
            prune_outer_joins: cli.prune_outer_joins,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut compiler_config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CompilerConfig::from_env().context("Invalid DBQUERY_* environment")?,
    };
    compiler_config.merge(CompilerConfig::from_cli(config::CliConfig::from(&cli))?);
    if compiler_config.dialect.is_none() {
        anyhow::bail!("No dialect given: use --dialect, DBQUERY_DIALECT or the configuration file");
    }

    let catalog = CatalogConfig::from_yaml_file(&cli.catalog)
        .and_then(CatalogConfig::build)
        .with_context(|| format!("Failed to load catalog {}", cli.catalog.display()))?;
    info!("Loaded {} entities from {}", catalog.len(), cli.catalog.display());

    let spec = QuerySpec::from_yaml_file(&cli.query)
        .with_context(|| format!("Failed to load query {}", cli.query.display()))?;

    let mut query = compiler_config
        .build_query(&spec, Arc::new(catalog))
        .context("Invalid query")?;
    if cli.count {
        query = query.to_count();
    }

    let compiler = compiler_config.build_compiler()?;
    let compiled = compiler.compile(&query).context("Compilation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&compiled)?);
    } else {
        println!("{}", compiled.sql);
        if !compiled.binds.is_empty() {
            let binds: Vec<String> = compiled.binds.iter().map(ToString::to_string).collect();
            println!("-- binds: {}", binds.join(", "));
        }
    }
    Ok(())
}
