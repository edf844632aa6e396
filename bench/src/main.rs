//! Fills a table with customer profiles, then measures random point lookups.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bolddb_storage::{AccessCounter, Row, Table, TableConfig};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bolddb-bench", about = "Point-lookup benchmark for BoldDB tables")]
struct Args {
    /// Directory holding the table file
    #[arg(long, env = "BOLDDB_DIR", default_value = "benchmarkdb")]
    dir: PathBuf,

    /// Table name; the file is `{dir}/{table}.table`
    #[arg(long, default_value = "customers")]
    table: String,

    /// Customer profiles to insert
    #[arg(long, default_value_t = 2000)]
    rows: u64,

    /// Random point lookups to run
    #[arg(long, default_value_t = 1000)]
    queries: u64,

    /// RNG seed for choosing lookup keys
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// fsync the table file on every flush
    #[arg(long)]
    sync: bool,
}

fn customer(i: u64) -> Row {
    let id = format!("CUST{i}");
    Row::new(id.clone())
        .with_attribute("customerId", id)
        .with_attribute("name", format!("Customer {i}"))
        .with_attribute("email", format!("customer{i}@example.com"))
        .with_attribute("address", format!("123 Main St, City {}", i % 1000))
        .with_attribute("phone", format!("{:010}", 9_000_000_000u64 + i))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.rows == 0 {
        bail!("--rows must be at least 1");
    }

    let config = TableConfig::builder()
        .data_dir(&args.dir)
        .sync_on_flush(args.sync)
        .build();
    let mut table: Table = Table::with_config(&args.table, config)
        .with_context(|| format!("opening table {} in {:?}", args.table, args.dir))?;

    info!(rows = args.rows, "inserting customer profiles");
    for i in 0..args.rows {
        if !table.insert(&customer(i))? {
            bail!("customer {i} does not fit in a page");
        }
    }
    table.save().context("saving table")?;

    let file_size = std::fs::metadata(table.path())
        .with_context(|| format!("reading size of {:?}", table.path()))?
        .len();
    info!(
        pages = table.total_pages(),
        "table file size: {:.2} MB",
        file_size as f64 / (1024.0 * 1024.0)
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut counter = AccessCounter::new();
    let mut elapsed = Duration::ZERO;
    for _ in 0..args.queries {
        let key = format!("CUST{}", rng.gen_range(0..args.rows));

        let start = Instant::now();
        let row = table.get_counted(key.as_bytes(), &mut counter)?;
        elapsed += start.elapsed();

        if row.is_none() {
            bail!("customer not found: {key}");
        }
    }

    if args.queries > 0 {
        let queries = args.queries as f64;
        info!(
            "average point query time: {:.2} us",
            elapsed.as_secs_f64() * 1_000_000.0 / queries
        );
        info!(
            "average pages accessed per query: {:.2}",
            counter.pages() as f64 / queries
        );
    }
    Ok(())
}
