use anyhow::{Context, Result};
use clap::Parser;
use csv::Writer;
use log::info;

use site_select::records::{self, ColumnNames};
use site_select::{CandidateFilter, SelectionParameters, SelectionSummary, Strategy};

#[derive(Parser, Debug)]
#[command(name = "site-select")]
#[command(about = "Pick new store locations from revenue-ranked candidates, keeping a minimum distance from existing stores and from each other.", long_about = None)]
struct Cli {
    /// Path to the candidates .csv file
    #[arg(short, long)]
    candidates: String,

    /// Path to the existing stores .csv file. If omitted, there are no existing stores.
    #[arg(short, long)]
    existing: Option<String>,

    /// Output CSV of the selected candidate rows. If omitted, prints a summary to stdout.
    #[arg(short, long)]
    out: Option<String>,

    /// Maximum number of new stores
    #[arg(short = 'n', long, default_value_t = 5)]
    max_count: usize,

    /// Minimum distance between new stores, in miles
    #[arg(long, default_value_t = 3.0)]
    min_distance_between: f64,

    /// Minimum distance from existing stores, in miles
    #[arg(long, default_value_t = 2.0)]
    min_distance_existing: f64,

    #[arg(short, long, value_enum, default_value_t = Strategy::Linear)]
    strategy: Strategy,

    #[arg(long, default_value_t = String::from("latitude"))]
    latitude_column: String,

    #[arg(long, default_value_t = String::from("longitude"))]
    longitude_column: String,

    #[arg(long, default_value_t = String::from("predicted_annual_sales"))]
    revenue_column: String,

    /// Drop candidates predicted to earn less than this
    #[arg(long)]
    min_revenue: Option<f64>,

    /// Drop candidates whose trade area population is below this
    #[arg(long)]
    min_population: Option<f64>,

    #[arg(long, default_value_t = String::from("total_population"))]
    population_column: String,

    /// Print why each scanned candidate was rejected
    #[arg(long, default_value_t = false)]
    explain: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let params = SelectionParameters::new(
        cli.max_count,
        cli.min_distance_existing,
        cli.min_distance_between,
    )?;
    let columns = ColumnNames {
        latitude: cli.latitude_column.clone(),
        longitude: cli.longitude_column.clone(),
        revenue: cli.revenue_column.clone(),
    };

    let table = records::load_candidates(&cli.candidates, &columns)?;
    info!("Loaded {} candidates from {}", table.candidates.len(), &cli.candidates);

    let existing = match &cli.existing {
        Some(path) => {
            let existing = records::load_existing(path, &columns)?;
            info!("Loaded {} existing stores from {}", existing.len(), path);
            existing
        }
        None => Vec::new(),
    };

    let mut filter = CandidateFilter::default();
    if let Some(min) = cli.min_revenue {
        filter = filter.min_revenue(min);
    }
    if let Some(min) = cli.min_population {
        filter = filter.min_attribute(&cli.population_column, min);
    }
    let candidates = filter.apply(table.candidates);

    let selection = cli
        .strategy
        .select_explained(&candidates, &existing, &params)?;

    if cli.explain {
        for rejection in &selection.rejections {
            let row = &candidates[rejection.input_index].payload;
            println!("rejected {}: {:?}", row.joined(), rejection.reason);
        }
    }

    if let Some(out_path) = cli.out {
        let mut wtr =
            Writer::from_path(&out_path).with_context(|| format!("creating CSV {}", &out_path))?;
        records::write_selection(&mut wtr, &table.headers, &selection.selected)?;
        println!(
            "Wrote {} selected locations to {}",
            selection.selected.len(),
            out_path
        );
    } else {
        for candidate in &selection.selected {
            println!(
                "{:.6},{:.6},{:.0}",
                candidate.location.latitude,
                candidate.location.longitude,
                candidate.predicted_revenue
            );
        }
    }
    println!("{}", SelectionSummary::of(&selection.selected));

    Ok(())
}
