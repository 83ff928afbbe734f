//! Annual C and N budget of the CN simulation at one site.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use casa_analysis::data::layout::{self, SITE};
use casa_analysis::{AnnualSummary, SamplingFrequency, TimeSeriesLoader, VariableProfile};

const CONFIGURATION: &str = "CN";

fn main() -> Result<()> {
    env_logger::init();

    let stem = layout::casa_simulation(SITE, CONFIGURATION);
    let dataset = layout::load(&stem)?;

    let start = NaiveDate::from_ymd_opt(2002, 1, 1).context("invalid start date")?;
    let frame = TimeSeriesLoader::new(VariableProfile::casa_annual())
        .with_explicit_start(start, SamplingFrequency::Daily)
        .load(&dataset)
        .with_context(|| format!("building daily frame from {}", stem.display()))?;

    let summary = AnnualSummary::from_frame(&frame)?;
    println!("{SITE} {CONFIGURATION}\n");
    println!("{summary}");
    Ok(())
}
