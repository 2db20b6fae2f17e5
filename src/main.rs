use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use food_explorer::views::{ingredient_overlaps, sankey_coding};
use food_explorer::{FoodApi, LoadOptions};

/// Load a food table and print the views the dashboard is built from.
#[derive(Debug, Parser)]
#[command(name = "food-explorer", version, about)]
struct Cli {
    /// Food table (.csv, .tsv, .json or .parquet)
    path: PathBuf,

    /// JSON file with load options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flow source column
    #[arg(long, default_value = "course")]
    source: String,

    /// Flow target column
    #[arg(long, default_value = "diet")]
    target: String,

    /// Minimum count for a flow to be shown
    #[arg(long, default_value_t = 0)]
    min_count: usize,

    /// Three foods to compare ingredients for
    #[arg(long, value_delimiter = ',', default_value = "balu shahi,boondi,gajar ka halwa")]
    foods: Vec<String>,

    /// Print flows and overlaps as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => LoadOptions::from_json_file(path)?,
        None => LoadOptions::default(),
    };
    let mut api = FoodApi::with_options(options);
    api.load(&cli.path)?;

    let dataset = api.dataset()?;
    let report = dataset.clean_report();
    println!(
        "{} foods loaded ({} rows read, {} dropped, {} duplicates removed, {} flagged)",
        dataset.len(),
        report.rows_in,
        report.rows_dropped,
        report.rows_deduplicated,
        report.flagged_rows.len()
    );
    println!("filterable columns: {}", api.list_filterable_columns()?.join(", "));

    let flows = api
        .compute_flows(&cli.source, &cli.target, cli.min_count)
        .with_context(|| format!("computing flows {} -> {}", cli.source, cli.target))?;
    let ingredients = api.get_ingredients(&cli.foods)?;

    if cli.json {
        let links = sankey_coding(&flows);
        println!("{}", serde_json::to_string_pretty(&links)?);
        match ingredient_overlaps(&ingredients) {
            Ok(overlaps) => println!("{}", serde_json::to_string_pretty(&overlaps)?),
            Err(e) => log::warn!("skipping ingredient overlaps: {e}"),
        }
        return Ok(());
    }

    println!("\nflows {} -> {} (min count {}):", cli.source, cli.target, cli.min_count);
    for flow in &flows {
        println!(
            "  {:<24} -> {:<24} {:>5}",
            flow.source.to_string(),
            flow.target.to_string(),
            flow.count
        );
    }

    println!("\ningredients:");
    for name in &cli.foods {
        match ingredients.get(name) {
            Some(set) => {
                let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
                items.sort_unstable();
                println!("  {name}: {}", items.join(", "));
            }
            None => println!("  {name}: <not found>"),
        }
    }

    match ingredient_overlaps(&ingredients) {
        Ok(overlaps) => println!("\nshared by all three: {}", overlaps.abc.join(", ")),
        Err(e) => println!("\n{e}"),
    }
    Ok(())
}
