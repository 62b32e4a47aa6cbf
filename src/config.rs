use std::path::PathBuf;

/// Raw forecast file produced by the model inside each run directory
pub const FORECAST_FILE: &str = "autoregressive_predictions.nc";
/// Time-corrected file written by the fix-time stage
pub const TRACKING_FILE: &str = "autoregressive_predictions_tracking.nc";
/// Sea-level-pressure file written by the slp stage
pub const SLP_FILE: &str = "autoregressive_predictions_tracking_slp.nc";

/// Default location of the static surface-height reference file, shared by
/// every run on the cluster filesystem
pub const DEFAULT_OROGRAPHY_PATH: &str =
    "/scratch/gpfs/GVECCHI/el2358/ACE2/tc_tracking/input/zs_2020.nc";

/// Physical and model-family constants
#[derive(Clone, Debug)]
pub struct Constants {
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
    /// Gas constant for dry air (J/(kg·K))
    pub r_dry: f64,
    /// Forecast output interval (hours)
    pub forecast_step_hours: i64,
    /// Chunk length along the time dimension; one year of 6-hourly steps,
    /// the longest run the model family produces
    pub time_chunk: usize,
    /// Calendar convention of the reconstructed time axis
    pub calendar: &'static str,
    /// On-disk encoding written for the time coordinate
    pub time_units: &'static str,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            r_dry: 287.0,
            forecast_step_hours: 6,
            time_chunk: 1460,
            calendar: "proleptic_gregorian",
            time_units: "hours since 1970-01-01 00:00:00",
        }
    }
}

/// Per-invocation configuration assembled from the command line
#[derive(Clone, Debug)]
pub struct Config {
    /// Physical constants
    pub constants: Constants,
    /// Forecast run directory holding the artifact files
    pub run_dir: PathBuf,
    /// Surface-height reference file for the slp stage
    pub orography_path: PathBuf,
    /// Preserve the raw forecast file after a successful fix-time stage
    pub keep_input: bool,
}

impl Config {
    /// Configuration for one run directory with default reference paths
    pub fn for_run(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            constants: Constants::default(),
            run_dir: run_dir.into(),
            orography_path: PathBuf::from(DEFAULT_OROGRAPHY_PATH),
            keep_input: false,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !self.run_dir.exists() {
            return Err(format!(
                "Run directory does not exist: {}",
                self.run_dir.display()
            ));
        }
        if !self.run_dir.is_dir() {
            return Err(format!(
                "Run path is not a directory: {}",
                self.run_dir.display()
            ));
        }
        if self.constants.forecast_step_hours <= 0 {
            return Err("Forecast step must be a positive number of hours".to_string());
        }
        if self.constants.time_chunk == 0 {
            return Err("Time chunk length must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_constants_defaults() {
        let constants = Constants::default();
        assert_eq!(constants.r_dry, 287.0);
        assert_eq!(constants.gravity, 9.8);
        assert_eq!(constants.forecast_step_hours, 6);
        assert_eq!(constants.time_chunk, 1460);
        assert_eq!(constants.calendar, "proleptic_gregorian");
        assert_eq!(constants.time_units, "hours since 1970-01-01 00:00:00");
    }

    #[test]
    fn test_validate_directory_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_run(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_nonexistent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_run(dir.path().join("absent"));
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_validate_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain_file");
        fs::write(&file, "x").unwrap();

        let config = Config::for_run(file);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not a directory"));
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_run(dir.path());
        config.constants.forecast_step_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(FORECAST_FILE, "autoregressive_predictions.nc");
        assert_eq!(TRACKING_FILE, "autoregressive_predictions_tracking.nc");
        assert_eq!(SLP_FILE, "autoregressive_predictions_tracking_slp.nc");
    }
}
