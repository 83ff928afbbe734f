//! Monthly climatology of CABLE biophysics for the biophysics-only, C, CN
//! and CNP runs at one site.

use anyhow::{Context, Result};

use casa_analysis::data::layout::{self, CONFIGURATIONS, SITE};
use casa_analysis::{write_table, ExportConfig, TimeSeriesLoader, VariableProfile};

fn main() -> Result<()> {
    env_logger::init();

    let loader = TimeSeriesLoader::new(VariableProfile::cable_seasonal());
    let reducers = loader.profile().reducers();
    let export = ExportConfig::default();

    let mut runs = vec![("biophysics", layout::biophysics(SITE))];
    runs.extend(
        CONFIGURATIONS
            .iter()
            .map(|&c| (c, layout::cable_simulation(SITE, c))),
    );

    for (run, stem) in &runs {
        let dataset = layout::load(stem)?;
        let frame = loader
            .load(&dataset)
            .with_context(|| format!("building {run} frame from {}", stem.display()))?;
        let climatology = frame
            .monthly_climatology(&reducers)
            .with_context(|| format!("{run} climatology"))?;
        write_table(&climatology, &format!("{SITE}_seasonal_{run}"), &export)?;
    }
    Ok(())
}
