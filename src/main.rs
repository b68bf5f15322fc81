//! Factor-table CLI
//!
//! Loads a table directory, values the full (product, sex, age) grid at the
//! given interest rate and pension age, and writes the factors as CSV and
//! optionally JSON.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;

use pension_factors::tables::loader::{load_table_set, DEFAULT_TABLES_PATH};
use pension_factors::{BatchConfig, BatchDriver, Product};

#[derive(Parser)]
#[command(name = "pension_factors", version, about = "Generate pension valuation factor tables")]
struct Args {
    /// Directory containing the table CSV files
    #[arg(long, default_value = DEFAULT_TABLES_PATH)]
    tables: PathBuf,

    /// Calculation year; only consulted for generation tables
    #[arg(long, default_value_t = 2024)]
    calc_year: i32,

    /// Flat interest rate in percent
    #[arg(long, default_value_t = 3.0)]
    interest: f64,

    /// Pension age for the deferred products
    #[arg(long, default_value_t = 67)]
    pension_age: u32,

    /// Include every product, not just the standard table layout
    #[arg(long)]
    all_products: bool,

    /// Output CSV path
    #[arg(long, default_value = "factors.csv")]
    output: PathBuf,

    /// Also write the full factor table (with errors) as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Run single-threaded
    #[arg(long)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Loading tables from {}...", args.tables.display());
    let tables = load_table_set(&args.tables, args.calc_year)
        .map_err(|e| anyhow!("loading tables from {}: {e}", args.tables.display()))?;

    let mut config = BatchConfig::new(args.interest, args.pension_age);
    if args.all_products {
        config.products = Product::ALL.to_vec();
    }

    println!(
        "Valuing {} products x ages {}..{} at {}% interest, pension age {}",
        config.products.len(),
        config.age_range.0,
        config.age_range.1,
        config.interest,
        config.pension_age
    );

    let start = Instant::now();
    let driver = BatchDriver::new(&tables);
    let factors = if args.sequential {
        driver.run(&config)
    } else {
        driver.run_parallel(&config)
    };
    println!(
        "Valued {} combinations in {:?}",
        factors.rows.len(),
        start.elapsed()
    );

    let failures = factors.failures().count();
    if failures > 0 {
        println!("WARNING: {failures} combinations failed:");
        for row in factors.failures().take(10) {
            println!("  {}/{}/{}: {}", row.product, row.sex, row.age, row.error.as_deref().unwrap_or(""));
        }
        if failures > 10 {
            println!("  ... ({} more)", failures - 10);
        }
    }

    // Write factor CSV
    let mut file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writeln!(file, "insurance_id,sex_insured,age_insured,tar,error")?;
    for row in &factors.rows {
        writeln!(
            file,
            "{},{},{},{},{}",
            row.product,
            row.sex,
            row.age,
            row.factor.map(|f| format!("{f:.10}")).unwrap_or_default(),
            row.error.as_deref().unwrap_or(""),
        )?;
    }
    println!("Factors written to {}", args.output.display());

    if let Some(json_path) = &args.json {
        let file = File::create(json_path)
            .with_context(|| format!("creating {}", json_path.display()))?;
        serde_json::to_writer_pretty(file, &factors)?;
        println!("JSON written to {}", json_path.display());
    }

    // Print a few rows for a quick sanity check
    println!("\nSample factors:");
    for row in factors.rows.iter().filter(|r| r.factor.is_some()).take(8) {
        println!(
            "  {:>8} {} {:>3}: {:>12.6}",
            row.product.code(),
            row.sex,
            row.age,
            row.factor.unwrap_or(0.0)
        );
    }

    Ok(())
}
