//! Command-line front end for calibration constant lookups.

use anyhow::{Context, Result};
use caldb_client::{CalibClient, provider::{FileProvider, HttpProvider}};
use caldb_util::parse_time_token;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

#[derive(Parser)]
#[command(name = "caldb", about = "Resolve named, versioned calibration constants", version)]
struct Cli {
    /// Backend connection string: a directory (or file:// URL) for the
    /// file backend, an http(s):// base URL for the networked one.
    /// Falls back to the CALDB_CONNECTION environment variable.
    #[arg(long, global = true)]
    connection: Option<String>,

    /// Default run number for namepaths that do not pin one.
    #[arg(long, global = true, default_value_t = 0)]
    run: i64,

    /// Default variation for namepaths that do not pin one.
    #[arg(long, global = true, default_value = "default")]
    variation: String,

    /// Default time qualifier (unix seconds or a calendar stamp).
    #[arg(long, global = true)]
    time: Option<String>,

    /// Bypass the assignment cache.
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a namepath and print the result as JSON.
    Get {
        /// Request namepath: /path/to/data[:run][:variation][:time]
        namepath: String,

        #[arg(long, value_enum, default_value_t = Shape::Table)]
        shape: Shape,

        #[arg(long = "type", value_enum, default_value_t = CellType::String)]
        cell_type: CellType,
    },
    /// List known dataset paths.
    Paths {
        /// Glob filter (`*` and `?`) applied to full table paths.
        #[arg(long, default_value = "*")]
        pattern: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    /// Rows of cell vectors.
    Table,
    /// Rows of column-name maps.
    TableMaps,
    /// Single row as a cell vector.
    Row,
    /// Single row as a column-name map.
    RowMap,
    /// A single constant.
    Value,
}

#[derive(Clone, Copy, ValueEnum)]
enum CellType {
    String,
    Int,
    Double,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match &cli.command {
        Command::Get {
            namepath,
            shape,
            cell_type,
        } => run_get(&client, namepath, *shape, *cell_type),
        Command::Paths { pattern } => {
            let paths = client.search_namepaths(pattern)?;
            println!("{}", serde_json::to_string_pretty(&paths)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_client(cli: &Cli) -> Result<CalibClient> {
    let connection = match &cli.connection {
        Some(value) => value.clone(),
        None => std::env::var("CALDB_CONNECTION")
            .context("no connection string: pass --connection or set CALDB_CONNECTION")?,
    };

    let provider: Box<dyn caldb_client::Provider> =
        if connection.starts_with("http://") || connection.starts_with("https://") {
            Box::new(HttpProvider::new())
        } else {
            Box::new(FileProvider::new())
        };

    let default_time = match &cli.time {
        Some(token) => parse_time_token(token)?,
        None => 0,
    };
    let client = CalibClient::with_defaults(provider, cli.run, cli.variation.clone(), default_time);
    if cli.no_cache {
        client.set_cache_enabled(false);
    }
    client
        .connect(&connection)
        .with_context(|| format!("cannot connect to '{connection}'"))?;
    Ok(client)
}

fn run_get(client: &CalibClient, namepath: &str, shape: Shape, cell_type: CellType) -> Result<()> {
    let result = match cell_type {
        CellType::String => shaped_json::<String>(client, namepath, shape)?,
        CellType::Int => shaped_json::<i64>(client, namepath, shape)?,
        CellType::Double => shaped_json::<f64>(client, namepath, shape)?,
    };

    match result {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => anyhow::bail!("no dataset found for '{namepath}'"),
    }
}

fn shaped_json<T>(
    client: &CalibClient,
    namepath: &str,
    shape: Shape,
) -> Result<Option<serde_json::Value>>
where
    T: caldb_client::CalibValue + serde::Serialize,
{
    let value = match shape {
        Shape::Table => client.get_table::<T>(namepath)?.map(|v| json!(v)),
        Shape::TableMaps => client.get_table_maps::<T>(namepath)?.map(|v| json!(v)),
        Shape::Row => client.get_row::<T>(namepath)?.map(|v| json!(v)),
        Shape::RowMap => client.get_row_map::<T>(namepath)?.map(|v| json!(v)),
        Shape::Value => client.get_value::<T>(namepath)?.map(|v| json!(v)),
    };
    Ok(value)
}
