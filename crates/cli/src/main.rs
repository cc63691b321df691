//! Vexpersist CLI - run a persistence unit's named queries, statements and
//! procedures from the shell

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use output::{render_record, render_rows, OutputFormat};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vexpersist_core::domain::{Params, ResultSet, SqlType, StoredProcedureParam, Value};
use vexpersist_core::port::{NamedQuery, SessionFactory, StoredProcedure};
use vexpersist_core::{PersistenceConfig, PersistentFacade, PersistentSessionFacade, ServiceLocator, VERSION};
use vexpersist_infra_sqlite::SqlitePersistenceProvider;

#[derive(Parser)]
#[command(name = "vexpersist")]
#[command(about = "Vexpersist persistence unit CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Persistence config file (TOML)
    #[arg(long, env = "VEXPERSIST_CONFIG", default_value = "vexpersist.toml")]
    config: PathBuf,

    /// Persistence unit to use
    #[arg(short, long, env = "VEXPERSIST_UNIT", default_value = "main")]
    unit: String,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(clap::Args, Debug, Default)]
struct ParamArgs {
    /// Named parameter, `key=value` (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    named: Vec<String>,

    /// Positional parameter (repeatable, bound to ?1, ?2, ...)
    #[arg(short = 'a', long = "arg", value_name = "VALUE")]
    positional: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured persistence units
    Units,

    /// Show the unit's named queries and procedures
    Catalog,

    /// Run a named query and print its rows
    Query {
        /// Named query
        name: String,

        #[command(flatten)]
        params: ParamArgs,

        /// First row of the window (needs --max)
        #[arg(long)]
        first: Option<usize>,

        /// Window size (needs --first)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Run a mutating named query and print the affected row count
    Exec {
        /// Named query
        name: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Call a stored procedure
    Call {
        /// Procedure name
        procedure: String,

        /// IN value (repeatable, in declaration order)
        #[arg(short = 'a', long = "arg", value_name = "VALUE")]
        args: Vec<String>,

        /// OUT parameter, `name:type[:scale]` (repeatable)
        #[arg(short, long, value_name = "NAME:TYPE[:SCALE]")]
        out: Vec<String>,

        /// Print the full result set instead of the OUT values
        #[arg(long)]
        rows: bool,
    },
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("VEXPERSIST_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("vexpersist=info"))
        .context("Failed to create env filter")?;

    // Logs go to stderr; stdout carries results
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn parse_params(args: &ParamArgs) -> Result<Params> {
    match (args.named.is_empty(), args.positional.is_empty()) {
        (true, true) => Ok(Params::none()),
        (false, true) => {
            let entries = args
                .named
                .iter()
                .map(|entry| {
                    entry
                        .split_once('=')
                        .map(|(k, v)| (k.trim().to_string(), Value::parse_literal(v)))
                        .with_context(|| format!("Expected KEY=VALUE, got '{}'", entry))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Params::named(entries))
        }
        (true, false) => Ok(Params::positional(
            args.positional.iter().map(|v| Value::parse_literal(v)),
        )),
        (false, false) => bail!("Use either --param or --arg, not both"),
    }
}

fn parse_out_param(spec: &str) -> Result<StoredProcedureParam> {
    let mut parts = spec.split(':');
    let name = parts.next().filter(|n| !n.is_empty());
    let sql_type = parts.next();
    let (Some(name), Some(sql_type)) = (name, sql_type) else {
        bail!("Expected NAME:TYPE[:SCALE], got '{}'", spec);
    };
    let sql_type = SqlType::from_str(sql_type)
        .with_context(|| format!("Invalid OUT parameter '{}'", spec))?;
    let mut param = StoredProcedureParam::out(name, sql_type);
    if let Some(scale) = parts.next() {
        param = param.with_scale(scale.parse().with_context(|| format!("Invalid scale in '{}'", spec))?);
    }
    if parts.next().is_some() {
        bail!("Expected NAME:TYPE[:SCALE], got '{}'", spec);
    }
    Ok(param)
}

async fn run(command: Commands, unit: &str, format: OutputFormat, config: PersistenceConfig) -> Result<()> {
    let provider = Arc::new(SqlitePersistenceProvider::new(config));
    let locator = ServiceLocator::new(provider.clone());
    let facade = PersistentFacade::local(&locator, unit);

    match command {
        // Answered from the config file in main
        Commands::Units | Commands::Catalog => {}

        Commands::Query {
            name,
            params,
            first,
            max,
        } => {
            let params = parse_params(&params)?;
            let queries = facade.named_query_factory().create_named_query();
            let rows = queries
                .find_by_named_query_windowed(&name, first, max, params)
                .await?;
            println!("{}", render_rows(&ResultSet::new(rows), format)?);
        }

        Commands::Exec { name, params } => {
            let params = parse_params(&params)?;
            let queries = facade.named_query_factory().create_named_query();
            let affected = queries.exec_by_named_query(&name, params).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "rows_affected": affected })),
                OutputFormat::Table => {
                    println!("{}", format!("✓ {} row(s) affected", affected).green().bold())
                }
            }
        }

        Commands::Call {
            procedure,
            args,
            out,
            rows,
        } => {
            let in_params: Vec<Value> = args.iter().map(|v| Value::parse_literal(v)).collect();
            let out_params = out
                .iter()
                .map(|spec| parse_out_param(spec))
                .collect::<Result<Vec<_>>>()?;

            let factory = provider.connect(unit).await?;
            let callable = factory.callable_connection().await?;
            let procedures = facade
                .stored_procedure_factory(callable.clone())
                .create_stored_procedure();

            if rows {
                let result = procedures
                    .get_by_stored_procedure_with(&procedure, &out_params, in_params)
                    .await?;
                println!("{}", render_rows(&result, format)?);
            } else {
                let values = procedures
                    .exec_stored_procedure_with(&procedure, &out_params, in_params)
                    .await?;
                if values.is_empty() && format == OutputFormat::Table {
                    println!("{}", format!("✓ {} completed", procedure).green().bold());
                } else {
                    println!("{}", render_record(&values, format)?);
                }
            }
            callable.close().await?;
            factory.close().await;
        }
    }

    locator.shutdown_all().await?;
    Ok(())
}

fn print_units(config: &PersistenceConfig) {
    println!("{}", "Persistence units".cyan().bold());
    println!();
    if config.units.is_empty() {
        println!("{}", "No units configured".yellow());
        return;
    }
    for (name, unit) in &config.units {
        println!(
            "  {} {}  ({} named queries, {} procedures)",
            name.bold(),
            unit.url,
            unit.named_queries.len(),
            unit.procedures.len()
        );
    }
}

fn print_catalog(config: &PersistenceConfig, unit_name: &str) -> Result<()> {
    let catalog = config.unit(unit_name)?.catalog()?;
    println!("{}", format!("Catalog of '{}'", unit_name).cyan().bold());
    println!();
    println!("  {}", "Named queries:".bold());
    for name in catalog.named_query_names() {
        let query = catalog.named_query(name)?;
        println!("    {} {}", name.green(), query.sql());
    }
    println!("  {}", "Procedures:".bold());
    for name in catalog.procedure_names() {
        let procedure = catalog.procedure(name)?;
        println!("    {}({})", name.green(), procedure.params.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    debug!("Vexpersist CLI v{}", VERSION);

    let config = PersistenceConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    info!(units = config.units.len(), "Configuration loaded");

    match cli.command {
        Commands::Units => print_units(&config),
        Commands::Catalog => print_catalog(&config, &cli.unit)?,
        command => run(command, &cli.unit, cli.format, config).await?,
    }

    Ok(())
}
