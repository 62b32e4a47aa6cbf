use crate::config::{Config, Constants, TRACKING_FILE};
use crate::data_io::{
    open_dataset, read_init_time, write_dataset, AttrValue, Attributes, DataError, GridDataset,
    TIME_DIM,
};
use crate::time_utils::{CfTimeUnits, ForecastTimeAxis};

use super::{RunArtifact, StageError};

/// Rebuild the forecast's time axis from its initialization timestamp.
///
/// The stored time coordinate of autoregressive output is unusable for
/// tracking, so it is discarded outright: a fresh axis is generated from
/// `init_time` at the configured forecast step and written over whatever
/// the coordinate held before. The singleton `sample` dimension is dropped
/// along the way. On success the input file is deleted and the output takes
/// its place as the run's current artifact; the delete only happens once
/// the output is confirmed on disk.
pub fn reconstruct_time_axis(
    config: &Config,
    artifact: RunArtifact,
) -> Result<RunArtifact, StageError> {
    let input = artifact.path().to_path_buf();
    let output = config.run_dir.join(TRACKING_FILE);

    println!("Reconstructing time axis");
    println!("  input:  {}", input.display());
    println!("  output: {}", output.display());

    if !input.exists() {
        return Err(StageError::MissingInput(input));
    }

    let mut ds = open_dataset(&input).map_err(|source| StageError::Open {
        path: input.clone(),
        source,
    })?;
    println!(
        "✓ Opened dataset: {} dimensions, {} data variables",
        ds.dims.len(),
        ds.vars.len()
    );

    // The initialization time must be read before any reshaping; without it
    // no meaningful axis can be built.
    let init = read_init_time(&ds).map_err(|e| match e {
        DataError::MissingVariable(name) => StageError::MissingVariable(name),
        other => StageError::Computation(other),
    })?;
    println!(
        "✓ Extracted initialization time: {}",
        init.format("%Y-%m-%d %H:%M:%S")
    );

    if ds.squeeze("sample") {
        println!("✓ Dropped singleton 'sample' dimension");
    } else {
        println!("No 'sample' dimension found");
    }

    let time_len = ds
        .dim_len(TIME_DIM)
        .ok_or_else(|| StageError::Computation(DataError::MissingDimension(TIME_DIM.to_string())))?;
    let axis = ForecastTimeAxis::new(init, config.constants.forecast_step_hours, time_len);
    let units = CfTimeUnits::parse(config.constants.time_units)
        .map_err(|e| StageError::Computation(DataError::TimeDecode(e)))?;
    ds.overwrite_coord(TIME_DIM, axis.values_in(&units))?;
    println!(
        "✓ Rebuilt time axis: {} steps of {} h starting {}",
        time_len,
        config.constants.forecast_step_hours,
        init.format("%Y-%m-%d %H:%M:%S")
    );

    match set_time_encoding(&mut ds, &config.constants) {
        Ok(()) => println!(
            "✓ Set time encoding: '{}' ({})",
            config.constants.time_units, config.constants.calendar
        ),
        Err(e) => eprintln!("⚠ Could not set time encoding: {}", e),
    }

    let write_result = write_dataset(&ds, &output, config.constants.time_chunk);
    drop(ds);
    println!("✓ Closed dataset");
    if write_result.is_ok() {
        println!("✓ Wrote time-fixed file: {}", output.display());
    }

    // The original is replaced whenever the output made it to disk, even if
    // writing reported an error afterwards; presence on disk is the test.
    let artifact = artifact.advance(output.clone(), config.keep_input);
    write_result.map_err(|source| StageError::Write {
        path: output,
        source,
    })?;
    Ok(artifact)
}

/// Stamp CF encoding attributes onto the time coordinate. Failing to do so
/// leaves the file usable, so callers treat an error here as a warning.
pub fn set_time_encoding(ds: &mut GridDataset, constants: &Constants) -> Result<(), DataError> {
    let mut attrs = Attributes::new();
    attrs.insert(
        "units".to_string(),
        AttrValue::Text(constants.time_units.to_string()),
    );
    attrs.insert(
        "calendar".to_string(),
        AttrValue::Text(constants.calendar.to_string()),
    );
    ds.set_coord_attrs(TIME_DIM, attrs)
}
