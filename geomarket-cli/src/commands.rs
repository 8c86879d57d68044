//! Argument definitions and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geomarket_core::{GeoProvider, GeoRecord};
use geomarket_data::{DonutConfig, SqliteProvider, TableMapping, generate_donuts, write_table};

use crate::error::CliError;

/// Spatial query engine demo: generate synthetic records and query them.
#[derive(Debug, Parser)]
#[command(name = "geomarket", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate synthetic donut records into a SQLite database.
    Generate(GenerateArgs),
    /// Query a record database by bounding box or point.
    Query(QueryArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Database file to create.
    #[arg(long)]
    output: PathBuf,
    /// Table to create inside the database.
    #[arg(long, default_value = "records")]
    table: String,
    /// Number of shapes to generate.
    #[arg(long, default_value_t = 10_000)]
    count: usize,
    /// Generator seed; identical seeds give identical data sets.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Database file to query.
    #[arg(long)]
    database: PathBuf,
    /// Table holding the records.
    #[arg(long, default_value = "records")]
    table: String,
    /// Bounding box as xmin,ymin,xmax,ymax (degrees); coarse envelope match.
    #[arg(long, value_parser = parse_bbox, conflicts_with = "point")]
    bbox: Option<Bbox>,
    /// Point as x,y (degrees); exact containment match.
    #[arg(long, value_parser = parse_point)]
    point: Option<PointArg>,
    /// Attribute columns to include in the output, comma separated.
    #[arg(long, value_delimiter = ',')]
    attributes: Vec<String>,
    /// SQL filter fragment applied to every query.
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Bbox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[derive(Debug, Clone, Copy)]
struct PointArg {
    x: f64,
    y: f64,
}

fn parse_bbox(raw: &str) -> Result<Bbox, String> {
    match parse_floats(raw)?.as_slice() {
        &[xmin, ymin, xmax, ymax] => Ok(Bbox {
            xmin,
            ymin,
            xmax,
            ymax,
        }),
        other => Err(format!(
            "expected xmin,ymin,xmax,ymax; got {} values",
            other.len()
        )),
    }
}

fn parse_point(raw: &str) -> Result<PointArg, String> {
    match parse_floats(raw)?.as_slice() {
        &[x, y] => Ok(PointArg { x, y }),
        other => Err(format!("expected x,y; got {} values", other.len())),
    }
}

fn parse_floats(raw: &str) -> Result<Vec<f64>, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("not a number: {part}"))
        })
        .collect()
}

/// Run the parsed command.
pub fn dispatch(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Generate(args) => generate(args),
        Command::Query(args) => query(args),
    }
}

fn generate(args: &GenerateArgs) -> Result<(), CliError> {
    let config = DonutConfig {
        count: args.count,
        seed: args.seed,
        ..DonutConfig::default()
    };
    let records = generate_donuts(&config)?;
    let written = write_table(&args.output, &args.table, &records)?;
    println!("wrote {written} records to {}", args.output.display());
    Ok(())
}

fn query(args: &QueryArgs) -> Result<(), CliError> {
    let mut mapping = TableMapping::new(args.table.clone());
    if let Some(filter) = &args.filter {
        mapping = mapping.with_filter(filter.clone());
    }
    let provider = SqliteProvider::open(&args.database, mapping)?;

    let records: Vec<GeoRecord> = match (args.bbox, args.point) {
        (Some(bbox), None) => provider
            .query_bbox(bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax, &args.attributes)?
            .collect(),
        (None, Some(point)) => provider
            .query_point(point.x, point.y, &args.attributes)?
            .collect(),
        _ => return Err(CliError::MissingQueryTarget),
    };

    for record in &records {
        println!("{}", record_json(record));
    }
    eprintln!("{} records", records.len());
    Ok(())
}

fn record_json(record: &GeoRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "envelope": [
            record.envelope.min().x,
            record.envelope.min().y,
            record.envelope.max().x,
            record.envelope.max().y,
        ],
        "attributes": record.attributes,
    })
}
