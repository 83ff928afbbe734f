//! Daily model time series of every run next to flux-tower observations,
//! with a weekly running mean of observed latent heat.

use anyhow::{Context, Result};

use casa_analysis::aggregate::rolling_mean;
use casa_analysis::data::layout::{self, CONFIGURATIONS, SITE};
use casa_analysis::{
    write_table, Column, ExportConfig, Period, TimeSeriesLoader, VariableProfile,
};

const QLE_WINDOW_DAYS: usize = 7;

fn main() -> Result<()> {
    env_logger::init();

    let cable = TimeSeriesLoader::new(VariableProfile::cable_timeseries());
    let mut runs = vec![("biophysics", layout::biophysics(SITE))];
    runs.extend(
        CONFIGURATIONS
            .iter()
            .map(|&c| (c, layout::cable_simulation(SITE, c))),
    );

    for (run, stem) in &runs {
        let dataset = layout::load(stem)?;
        let daily = cable
            .load(&dataset)
            .and_then(|frame| frame.resample(Period::Day, &cable.profile().reducers()))
            .with_context(|| format!("daily {run} series from {}", stem.display()))?;
        write_table(
            &daily.to_table(),
            &format!("{SITE}_timeseries_{run}"),
            &ExportConfig::default(),
        )?;
    }

    let flux = TimeSeriesLoader::new(VariableProfile::flux_timeseries());
    let stem = layout::flux_tower();
    let dataset = layout::load(&stem)?;
    let mut daily = flux
        .load(&dataset)
        .and_then(|frame| frame.resample(Period::Day, &flux.profile().reducers()))
        .with_context(|| format!("daily observed series from {}", stem.display()))?;

    let qle: Vec<f64> = daily.column("Qle")?.series()?.to_vec();
    daily.push_column(Column::from_values(
        "Qle_rolling",
        rolling_mean(&qle, QLE_WINDOW_DAYS),
    ))?;
    write_table(
        &daily.to_table(),
        &format!("{SITE}_timeseries_observed"),
        &ExportConfig::default(),
    )?;
    Ok(())
}
