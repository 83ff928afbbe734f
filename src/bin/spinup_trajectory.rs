//! Spin-up trajectory of the CASA pools for each model configuration.

use anyhow::{Context, Result};
use log::info;

use casa_analysis::data::layout::{self, CONFIGURATIONS, FIRST_SPIN, LAST_SPIN, SITE};
use casa_analysis::{write_table, ExportConfig, SpinupPoint, SpinupTrajectory};

fn main() -> Result<()> {
    env_logger::init();

    let export = ExportConfig::default();
    for configuration in CONFIGURATIONS {
        let mut trajectory = SpinupTrajectory::new(configuration);
        for cycle in FIRST_SPIN..=LAST_SPIN {
            info!("{configuration} spin {cycle}/{LAST_SPIN}");
            let casa = layout::load(&layout::casa_spin(SITE, configuration, cycle))?;
            let cable = layout::load(&layout::cable_spin(SITE, configuration, cycle))?;
            let point = SpinupPoint::extract(&casa, &cable)
                .with_context(|| format!("{configuration} spin-up cycle {cycle}"))?;
            trajectory.push(cycle, point);
        }
        write_table(
            &trajectory.to_table()?,
            &format!("{SITE}_{configuration}_spinup"),
            &export,
        )?;
    }
    Ok(())
}
