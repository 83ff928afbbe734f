//! Writes synthetic site output under the file names the analysis binaries
//! read, so every pipeline runs without real model output:
//!
//! * biophysics, C, CN and CNP CABLE runs – one year of hourly GPP, NEE,
//!   Qle, LAI, TVeg and ESoil (the C run as Parquet, the rest as JSON)
//! * flux-tower GPP and Qle with scattered gaps
//! * the CN CASA simulation – two years of daily pools and N fluxes
//! * CASA and CABLE spin-up files for every configuration and cycle

use std::f64::consts::PI;
use std::path::Path;

use anyhow::Result;
use ndarray::{Array1, Array3, Axis};

use casa_analysis::data::layout::{self, CONFIGURATIONS, FIRST_SPIN, LAST_SPIN, SITE};
use casa_analysis::data::loader::save_file;
use casa_analysis::data::select::{squeeze, DEFAULT_SPATIAL_DIMS};
use casa_analysis::{RawDataset, Variable};

const HOURS: usize = 365 * 24;
const DAYS: usize = 2 * 365;
const SPIN_DAYS: usize = 30;
/// J kg-1
const LATENT_HEAT: f64 = 2.45e6;

/// Seeded noise: a SplitMix64 stream, normal deviates by Box-Muller.
struct Noise {
    state: u64,
}

impl Noise {
    fn seeded(seed: u64) -> Self {
        Noise { state: seed }
    }

    fn next_bits(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// In [0, 1).
    fn uniform(&mut self) -> f64 {
        (self.next_bits() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        let radius = (-2.0 * (1.0 - self.uniform()).ln()).sqrt();
        mean + sd * radius * (2.0 * PI * self.uniform()).cos()
    }
}

/// Southern-hemisphere season: 1 in mid-January, 0 in mid-July.
fn season(day: f64) -> f64 {
    0.5 * (1.0 + (2.0 * PI * (day - 15.0) / 365.0).cos())
}

/// Daylight shape, zero outside 06:00–18:00.
fn daylight(hour: f64) -> f64 {
    (PI * (hour - 6.0) / 12.0).sin().max(0.0)
}

fn gridded(name: &str, units: &str, values: Vec<f64>) -> Variable {
    let data = Array3::from_shape_fn((values.len(), 1, 1), |(t, _, _)| values[t]);
    Variable::new(name, &["time", "y", "x"], data.into_dyn()).with_units(units)
}

fn per_land(name: &str, values: Array1<f64>) -> Variable {
    Variable::new(name, &["time", "land"], values.insert_axis(Axis(1)).into_dyn())
}

fn hourly(noise: &mut Noise, productivity: f64) -> RawDataset {
    let mut gpp = Vec::with_capacity(HOURS);
    let mut nee = Vec::with_capacity(HOURS);
    let mut qle = Vec::with_capacity(HOURS);
    let mut lai = Vec::with_capacity(HOURS);
    let mut tveg = Vec::with_capacity(HOURS);
    let mut esoil = Vec::with_capacity(HOURS);

    for h in 0..HOURS {
        let light = daylight((h % 24) as f64);
        let s = season((h / 24) as f64);

        let g = (productivity * (6.0 + 8.0 * s) * light + noise.normal(0.0, 0.5)).max(0.0);
        let le = ((80.0 + 220.0 * s) * light + noise.normal(10.0, 8.0)).max(0.0);
        gpp.push(g);
        nee.push(2.5 + 1.5 * s - g + noise.normal(0.0, 0.3));
        qle.push(le);
        lai.push(productivity * (3.0 + 0.8 * s));
        tveg.push(0.7 * le / LATENT_HEAT);
        esoil.push(0.1 * le / LATENT_HEAT);
    }

    RawDataset::new()
        .with_time(
            (0..HOURS).map(|h| h as f64 * 3600.0).collect(),
            "seconds since 2002-01-01 00:00:00",
        )
        .with_variable(gridded("GPP", "umol/m^2/s", gpp))
        .with_variable(gridded("NEE", "umol/m^2/s", nee))
        .with_variable(gridded("Qle", "W/m^2", qle))
        .with_variable(gridded("LAI", "-", lai))
        .with_variable(gridded("TVeg", "kg/m^2/s", tveg))
        .with_variable(gridded("ESoil", "kg/m^2/s", esoil))
}

/// Tower record: GPP and Qle only, about 5% of hours missing.
fn flux_tower(noise: &mut Noise) -> RawDataset {
    let model = hourly(noise, 1.0);
    let mut tower = RawDataset {
        time: model.time.clone(),
        ..RawDataset::default()
    };
    for name in ["GPP", "Qle"] {
        if let Some(var) = model.variable(name) {
            let mut var = var.clone();
            var.data.mapv_inplace(|v| if noise.uniform() < 0.05 { f64::NAN } else { v });
            tower.insert(var);
        }
    }
    tower
}

fn pools(name: &str, days: usize, value: impl Fn(usize, usize) -> f64) -> Variable {
    let data = Array3::from_shape_fn((days, 3, 1), |(d, p, _)| value(d, p));
    Variable::new(name, &["time", "pool", "land"], data.into_dyn())
}

fn casa_simulation(noise: &mut Noise) -> RawDataset {
    let seasonal = |base: [f64; 3]| {
        move |d: usize, p: usize| base[p] * (1.0 + 0.1 * season(d as f64))
    };
    let mut daily = |name: &str, mean: f64| {
        let values: Array1<f64> = (0..DAYS)
            .map(|d| mean * (0.5 + season(d as f64)) + noise.normal(0.0, 0.01 * mean.abs()))
            .collect();
        per_land(name, values)
    };

    let mut dataset = RawDataset::new().with_time(
        (0..DAYS).map(|d| d as f64).collect(),
        "days since 2002-01-01 00:00:00",
    );
    for variable in [
        daily("Nsnet", 0.03),
        daily("Nmindep", 0.002),
        daily("Nminfix", 0.001),
        daily("Nminleach", 0.0005),
        daily("Nupland", 0.03),
        daily("Nminloss", 0.002),
        daily("Nsimm", -0.4),
        pools("cplant", DAYS, seasonal([300.0, 6000.0, 400.0])),
        pools("nplant", DAYS, seasonal([6.0, 20.0, 8.0])),
        pools("csoil", DAYS, seasonal([150.0, 3000.0, 7000.0])),
        pools("nsoil", DAYS, seasonal([20.0, 250.0, 700.0])),
    ] {
        dataset.insert(variable);
    }
    dataset
}

/// CASA output of one spin-up cycle: pools relax towards equilibrium.
fn casa_spin(cycle: u32) -> RawDataset {
    let approach = 1.0 - (-(cycle as f64) / 5.0).exp();
    let named = |name: &str, v: f64| per_land(name, Array1::from_elem(SPIN_DAYS, v));

    let mut dataset = RawDataset::new();
    for variable in [
        pools("cplant", SPIN_DAYS, |_, p| approach * [300.0, 6000.0, 400.0][p]),
        pools("csoil", SPIN_DAYS, |_, p| approach * [150.0, 3000.0, 7000.0][p]),
        named("Nmindep", 0.002),
        named("Pdep", 0.0001),
        named("Cgpp", 4.5),
        named("Cnpp", 2.0 + 0.2 * approach),
        named("Cnep", 0.5 * (1.0 - approach)),
    ] {
        dataset.insert(variable);
    }
    dataset
}

fn cable_spin() -> RawDataset {
    RawDataset::new().with_variable(gridded("CO2air", "ppmv", vec![284.7; SPIN_DAYS]))
}

/// Parquet holds `(time)` and `(time, pool)` columns only.
fn flatten(dataset: &RawDataset) -> Result<RawDataset> {
    let mut flat = RawDataset {
        time: dataset.time.clone(),
        ..RawDataset::default()
    };
    for variable in dataset.variables.values() {
        flat.insert(squeeze(variable, &DEFAULT_SPATIAL_DIMS)?);
    }
    Ok(flat)
}

fn write(dataset: &RawDataset, stem: &Path, ext: &str) -> Result<()> {
    if let Some(dir) = stem.parent() {
        std::fs::create_dir_all(dir)?;
    }
    save_file(dataset, &layout::with_extension(stem, ext))
}

fn main() -> Result<()> {
    env_logger::init();
    let mut noise = Noise::seeded(42);

    write(&hourly(&mut noise, 1.0), &layout::biophysics(SITE), "json")?;
    for (i, configuration) in CONFIGURATIONS.into_iter().enumerate() {
        // nutrient limitation lowers productivity
        let run = hourly(&mut noise, 1.0 - 0.1 * i as f64);
        let stem = layout::cable_simulation(SITE, configuration);
        if configuration == "C" {
            write(&flatten(&run)?, &stem, "parquet")?;
        } else {
            write(&run, &stem, "json")?;
        }
    }
    write(&flux_tower(&mut noise), &layout::flux_tower(), "json")?;
    write(
        &casa_simulation(&mut noise),
        &layout::casa_simulation(SITE, "CN"),
        "json",
    )?;

    for configuration in CONFIGURATIONS {
        for cycle in FIRST_SPIN..=LAST_SPIN {
            write(&casa_spin(cycle), &layout::casa_spin(SITE, configuration, cycle), "json")?;
            write(&cable_spin(), &layout::cable_spin(SITE, configuration, cycle), "json")?;
        }
    }

    println!(
        "Wrote {} CABLE runs, flux-tower data, the CN CASA simulation and {} spin-up cycles for {SITE}",
        CONFIGURATIONS.len() + 1,
        CONFIGURATIONS.len() * (LAST_SPIN - FIRST_SPIN + 1) as usize
    );
    Ok(())
}
