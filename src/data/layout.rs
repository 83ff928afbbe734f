//! On-disk layout of one site's model output.
//!
//! Locations are stems without an extension, e.g.
//! `outputs/AU-Tum_CN_out_casa_simulation`. [`resolve`] turns a stem into
//! the first existing file this build can read, so netCDF output and the
//! JSON / Parquet written by `generate_sample` are interchangeable.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use log::debug;

use super::loader::load_file;
use super::model::RawDataset;

pub const SITE: &str = "AU-Tum";
pub const OUTPUT_DIR: &str = "outputs";
pub const FLUX_DIR: &str = "flux";

/// Model configurations, in increasing biogeochemical detail.
pub const CONFIGURATIONS: [&str; 3] = ["C", "CN", "CNP"];

/// Spin-up cycles written per configuration, inclusive.
pub const FIRST_SPIN: u32 = 1;
pub const LAST_SPIN: u32 = 20;

/// Extensions tried by [`resolve`], in order.
#[cfg(feature = "netcdf")]
pub const READABLE_EXTENSIONS: [&str; 3] = ["nc", "json", "parquet"];
#[cfg(not(feature = "netcdf"))]
pub const READABLE_EXTENSIONS: [&str; 2] = ["json", "parquet"];

fn output(name: String) -> PathBuf {
    Path::new(OUTPUT_DIR).join(name)
}

/// CABLE run without biogeochemistry.
pub fn biophysics(site: &str) -> PathBuf {
    output(format!("{site}_biophysics"))
}

pub fn cable_simulation(site: &str, configuration: &str) -> PathBuf {
    output(format!("{site}_{configuration}_out_cable_simulation"))
}

pub fn casa_simulation(site: &str, configuration: &str) -> PathBuf {
    output(format!("{site}_{configuration}_out_casa_simulation"))
}

pub fn cable_spin(site: &str, configuration: &str, cycle: u32) -> PathBuf {
    output(format!("{site}_{configuration}_out_cable_spin_{cycle}"))
}

pub fn casa_spin(site: &str, configuration: &str, cycle: u32) -> PathBuf {
    output(format!("{site}_{configuration}_out_casa_spin_{cycle}"))
}

/// OzFlux tower observations for the Tumbarumba site.
pub fn flux_tower() -> PathBuf {
    Path::new(FLUX_DIR).join("TumbarumbaOzFlux2.0_flux")
}

/// `stem` with `.ext` appended. Dots already in the stem are kept.
pub fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// The first existing `stem.<ext>` over [`READABLE_EXTENSIONS`].
pub fn resolve(stem: &Path) -> Result<PathBuf> {
    for ext in READABLE_EXTENSIONS {
        let path = with_extension(stem, ext);
        if path.is_file() {
            debug!("resolved {} to {}", stem.display(), path.display());
            return Ok(path);
        }
    }
    bail!(
        "No readable file for {} (tried .{})",
        stem.display(),
        READABLE_EXTENSIONS.join(", .")
    )
}

/// [`resolve`] then [`load_file`].
pub fn load(stem: &Path) -> Result<RawDataset> {
    load_file(&resolve(stem)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::save_file;

    fn dataset() -> RawDataset {
        RawDataset::new().with_time(vec![0.0, 86400.0], "days since 2002-01-01")
    }

    #[test]
    fn test_stems() {
        assert_eq!(
            casa_spin("AU-Tum", "CNP", 7),
            Path::new("outputs/AU-Tum_CNP_out_casa_spin_7")
        );
        assert_eq!(
            with_extension(&flux_tower(), "json"),
            Path::new("flux/TumbarumbaOzFlux2.0_flux.json")
        );
    }

    #[test]
    fn test_resolve_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&dir.path().join("site")).unwrap_err();
        assert!(err.to_string().contains("tried .json"));
    }

    #[test]
    fn test_resolve_prefers_json_over_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("AU-Tum_C_out_cable_simulation");

        save_file(&dataset(), &with_extension(&stem, "parquet")).unwrap();
        assert_eq!(resolve(&stem).unwrap(), with_extension(&stem, "parquet"));

        save_file(&dataset(), &with_extension(&stem, "json")).unwrap();
        assert_eq!(resolve(&stem).unwrap(), with_extension(&stem, "json"));
        assert_eq!(load(&stem).unwrap().time_len(), Some(2));
    }
}
