use std::path::Path;

use ndarray::ArrayD;

use super::dataset::{AttrValue, GridDataset, TIME_DIM};
use super::expr::TimeWindow;
use super::DataError;

/// Time-like bookkeeping variables keep full double precision; physical
/// fields are stored as f32.
fn stored_as_double(name: &str) -> bool {
    matches!(name, "init_time" | "valid_time")
}

/// Write a dataset to `path`, replacing any existing file.
///
/// Structure goes first: dimensions in dataset order with `time` unlimited,
/// then global attributes, then variable definitions with their attributes.
/// Data variables carrying a time axis are materialized window by window so
/// no more than `time_chunk` steps of any expression are in memory at once;
/// everything else is materialized in one shot.
pub fn write_dataset(ds: &GridDataset, path: &Path, time_chunk: usize) -> Result<(), DataError> {
    let mut file = netcdf::create(path)?;

    for (name, len) in &ds.dims {
        if name == TIME_DIM {
            file.add_unlimited_dimension(name)?;
        } else {
            file.add_dimension(name, *len)?;
        }
    }

    for (name, value) in &ds.attrs {
        file.add_attribute(name, to_netcdf_attr(value))?;
    }

    for coord in &ds.coords {
        let mut var = file.add_variable::<f64>(&coord.name, &[coord.name.as_str()])?;
        for (name, value) in &coord.attrs {
            var.put_attribute(name, to_netcdf_attr(value))?;
        }
    }

    for v in &ds.vars {
        let dim_refs: Vec<&str> = v.dims.iter().map(|d| d.as_str()).collect();
        if stored_as_double(&v.name) {
            let mut var = file.add_variable::<f64>(&v.name, &dim_refs)?;
            for (name, value) in &v.attrs {
                var.put_attribute(name, to_netcdf_attr(value))?;
            }
        } else {
            let mut var = file.add_variable::<f32>(&v.name, &dim_refs)?;
            for (name, value) in &v.attrs {
                var.put_attribute(name, to_netcdf_attr(value))?;
            }
        }
    }

    for coord in &ds.coords {
        let mut var = file
            .variable_mut(&coord.name)
            .ok_or_else(|| DataError::MissingVariable(coord.name.clone()))?;
        let starts = [0usize];
        let counts = [coord.values.len()];
        var.put_values(&coord.values, (&starts[..], &counts[..]))?;
    }

    let chunk_size = time_chunk.max(1);
    for v in &ds.vars {
        match v.dims.iter().position(|d| d == TIME_DIM) {
            Some(axis) => {
                let time_len = ds
                    .dim_len(TIME_DIM)
                    .ok_or_else(|| DataError::MissingDimension(TIME_DIM.to_string()))?;
                let mut start = 0;
                while start < time_len {
                    let count = chunk_size.min(time_len - start);
                    let block = v.data.eval(TimeWindow::new(start, count))?;
                    write_block(&mut file, &v.name, &block, Some(axis), start)?;
                    start += count;
                }
            }
            None => {
                let block = v.data.eval(TimeWindow::new(0, 0))?;
                write_block(&mut file, &v.name, &block, None, 0)?;
            }
        }
    }

    Ok(())
}

fn write_block(
    file: &mut netcdf::FileMut,
    name: &str,
    data: &ArrayD<f64>,
    time_axis: Option<usize>,
    start: usize,
) -> Result<(), DataError> {
    let mut var = file
        .variable_mut(name)
        .ok_or_else(|| DataError::MissingVariable(name.to_string()))?;

    if data.ndim() == 0 {
        let value = data
            .iter()
            .copied()
            .next()
            .ok_or_else(|| DataError::Conversion(format!("no value to write for '{}'", name)))?;
        if stored_as_double(name) {
            var.put_values(&[value], ..)?;
        } else {
            var.put_values(&[value as f32], ..)?;
        }
        return Ok(());
    }

    let mut starts = vec![0usize; data.ndim()];
    if let Some(axis) = time_axis {
        starts[axis] = start;
    }
    let counts = data.shape().to_vec();
    if stored_as_double(name) {
        let values: Vec<f64> = data.iter().copied().collect();
        var.put_values(&values, (starts.as_slice(), counts.as_slice()))?;
    } else {
        let values: Vec<f32> = data.iter().map(|v| *v as f32).collect();
        var.put_values(&values, (starts.as_slice(), counts.as_slice()))?;
    }
    Ok(())
}

fn to_netcdf_attr(value: &AttrValue) -> netcdf::AttributeValue {
    match value {
        AttrValue::Text(s) => netcdf::AttributeValue::Str(s.clone()),
        AttrValue::Float(f) => netcdf::AttributeValue::Float(*f),
        AttrValue::Double(d) => netcdf::AttributeValue::Double(*d),
        AttrValue::Int(i) => netcdf::AttributeValue::Int(*i),
        AttrValue::Int64(l) => netcdf::AttributeValue::Longlong(*l),
        AttrValue::Floats(v) => netcdf::AttributeValue::Floats(v.clone()),
        AttrValue::Doubles(v) => netcdf::AttributeValue::Doubles(v.clone()),
        AttrValue::Ints(v) => netcdf::AttributeValue::Ints(v.clone()),
    }
}
