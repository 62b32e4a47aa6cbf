use crate::config::{Config, SLP_FILE};
use crate::data_io::{
    open_dataset, read_static_field, write_dataset, AttrValue, Attributes, DataError, DataExpr,
    GridDataset, GridVariable,
};
use crate::math::sea_level_pressure_expr;

use super::{RunArtifact, StageError};

/// Name of the orography variable in the reference file
const OROGRAPHY_VAR: &str = "HGTsfc";

/// Reduce surface pressure to sea level with the hypsometric equation.
///
/// Surface height comes from a static reference file that must load before
/// the run data is touched; its grid has to match the run grid exactly, it
/// is substituted onto the run coordinates rather than interpolated. The
/// result is a single `slp` variable written next to the input, which stays
/// in place.
pub fn derive_sea_level_pressure(
    config: &Config,
    artifact: &RunArtifact,
) -> Result<RunArtifact, StageError> {
    println!("Deriving sea level pressure");
    println!("  orography: {}", config.orography_path.display());

    let (height, height_dims) = read_static_field(&config.orography_path, OROGRAPHY_VAR)
        .map_err(|source| StageError::ReferenceLoad {
            path: config.orography_path.clone(),
            source,
        })?;
    println!(
        "✓ Loaded surface height ({}): {:?}",
        height_dims.join(", "),
        height.shape()
    );

    let input = artifact.path().to_path_buf();
    let output = config.run_dir.join(SLP_FILE);
    println!("  input:  {}", input.display());
    println!("  output: {}", output.display());

    if !input.exists() {
        return Err(StageError::MissingInput(input));
    }

    let ds = open_dataset(&input).map_err(|source| StageError::Open {
        path: input.clone(),
        source,
    })?;
    println!(
        "✓ Opened dataset: {} dimensions, {} data variables",
        ds.dims.len(),
        ds.vars.len()
    );

    let sp = ds
        .variable("PRESsfc")
        .ok_or_else(|| StageError::MissingVariable("PRESsfc".to_string()))?;
    println!("✓ Found surface pressure: PRESsfc");
    let ts = ds
        .variable("surface_temperature")
        .ok_or_else(|| StageError::MissingVariable("surface_temperature".to_string()))?;
    println!("✓ Found surface temperature: surface_temperature");

    let ny = ds
        .dim_len("lat")
        .ok_or_else(|| StageError::Computation(DataError::MissingDimension("lat".to_string())))?;
    let nx = ds
        .dim_len("lon")
        .ok_or_else(|| StageError::Computation(DataError::MissingDimension("lon".to_string())))?;
    let expected = vec![ny, nx];
    if height.shape() != expected.as_slice() {
        return Err(StageError::Computation(DataError::ShapeMismatch {
            expected,
            actual: height.shape().to_vec(),
        }));
    }
    println!("✓ Surface height matches run grid: {} x {}", ny, nx);

    let ts_dims = ts.dims.clone();
    let sp_expr = sp.data.clone();
    let ts_expr = ts.data.clone();

    let height_expr = DataExpr::literal(height).broadcast_over_time();
    println!("✓ Prepared lazy broadcast of surface height over time");

    let slp_expr = sea_level_pressure_expr(sp_expr, ts_expr, height_expr, &config.constants);
    println!("✓ Built sea level pressure expression (deferred evaluation)");

    let mut out_dims = Vec::new();
    for name in &ts_dims {
        let len = ds
            .dim_len(name)
            .ok_or_else(|| StageError::Computation(DataError::MissingDimension(name.clone())))?;
        out_dims.push((name.clone(), len));
    }
    let mut out = GridDataset::new(out_dims);
    for name in &ts_dims {
        if let Some(coord) = ds.coord(name) {
            out.coords.push(coord.clone());
        }
    }

    let mut attrs = Attributes::new();
    attrs.insert(
        "long_name".to_string(),
        AttrValue::Text("Sea Level Pressure".to_string()),
    );
    attrs.insert("units".to_string(), AttrValue::Text("Pa".to_string()));
    attrs.insert(
        "description".to_string(),
        AttrValue::Text(
            "Reduced to sea level using hypsometric equation with lowest-level T and surface height"
                .to_string(),
        ),
    );
    out.vars.push(GridVariable {
        name: "slp".to_string(),
        dims: ts_dims,
        data: slp_expr,
        attrs,
    });

    write_dataset(&out, &output, config.constants.time_chunk).map_err(|source| {
        StageError::Write {
            path: output.clone(),
            source,
        }
    })?;
    println!("✓ Wrote sea level pressure file: {}", output.display());

    Ok(artifact.derive(output))
}
