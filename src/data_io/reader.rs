use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use ndarray::{ArrayD, IxDyn};

use super::dataset::{AttrValue, Attributes, CoordVector, GridDataset, GridVariable};
use super::expr::{DataExpr, TimeWindow};
use super::DataError;
use crate::time_utils::CfTimeUnits;

/// Open a gridded file into the lazy dataset model.
///
/// Dimensions, global attributes and coordinate vectors are read eagerly;
/// data variables stay on disk behind a shared handle and are only read when
/// their expressions are evaluated. Time values are passed through raw, with
/// their `units` attribute kept alongside; nothing is decoded on open.
pub fn open_dataset(path: &Path) -> Result<GridDataset, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound(path.display().to_string()));
    }
    let file = netcdf::open(path)?;

    let mut dims = Vec::new();
    for dim in file.dimensions() {
        dims.push((dim.name(), dim.len()));
    }
    let dim_names: Vec<String> = dims.iter().map(|(name, _)| name.clone()).collect();

    let mut attrs = Attributes::new();
    for attr in file.attributes() {
        if let Some(value) = map_attr(attr.value()?) {
            attrs.insert(attr.name().to_string(), value);
        }
    }

    let mut coords = Vec::new();
    let mut pending = Vec::new();
    for var in file.variables() {
        let name = var.name();
        let var_dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let var_attrs = read_attrs(&var)?;
        if var_dims.len() == 1 && var_dims[0] == name && dim_names.contains(&name) {
            let values: Vec<f64> = var.get_values(..)?;
            coords.push(CoordVector {
                name,
                values,
                attrs: var_attrs,
            });
        } else {
            pending.push((name, var_dims, var_attrs));
        }
    }

    let handle = Arc::new(Mutex::new(file));
    let vars = pending
        .into_iter()
        .map(|(name, var_dims, var_attrs)| {
            let data = DataExpr::source(handle.clone(), &name);
            GridVariable {
                name,
                dims: var_dims,
                data,
                attrs: var_attrs,
            }
        })
        .collect();

    Ok(GridDataset {
        dims,
        coords,
        vars,
        attrs,
    })
}

/// Read one whole static variable from a reference file, returning its
/// values and dimension names. Used for fields that never carry a time axis.
pub fn read_static_field(
    path: &Path,
    var_name: &str,
) -> Result<(ArrayD<f64>, Vec<String>), DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound(path.display().to_string()));
    }
    let file = netcdf::open(path)?;
    let var = file
        .variable(var_name)
        .ok_or_else(|| DataError::MissingVariable(var_name.to_string()))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let raw: Vec<f64> = var.get_values(..)?;
    let array = ArrayD::from_shape_vec(IxDyn(&shape), raw)
        .map_err(|e| DataError::Conversion(e.to_string()))?;
    Ok((array, dims))
}

/// Decode the run's initialization timestamp from its `init_time` variable.
///
/// The raw stored number is interpreted through the variable's own `units`
/// attribute; a missing variable or undecodable units is a hard error.
pub fn read_init_time(ds: &GridDataset) -> Result<NaiveDateTime, DataError> {
    let var = ds
        .variable("init_time")
        .ok_or_else(|| DataError::MissingVariable("init_time".to_string()))?;

    let units = match var.attrs.get("units") {
        Some(AttrValue::Text(text)) => text.clone(),
        _ => {
            return Err(DataError::TimeDecode(
                "init_time has no textual 'units' attribute".to_string(),
            ))
        }
    };
    let cf_units = CfTimeUnits::parse(&units).map_err(DataError::TimeDecode)?;

    let values = var.data.eval(TimeWindow::new(0, 1))?;
    let raw = values
        .first()
        .copied()
        .ok_or_else(|| DataError::TimeDecode("init_time variable holds no value".to_string()))?;
    Ok(cf_units.decode(raw))
}

fn read_attrs(var: &netcdf::Variable) -> Result<Attributes, DataError> {
    let mut attrs = Attributes::new();
    for attr in var.attributes() {
        if let Some(value) = map_attr(attr.value()?) {
            attrs.insert(attr.name().to_string(), value);
        }
    }
    Ok(attrs)
}

fn map_attr(value: netcdf::AttributeValue) -> Option<AttrValue> {
    match value {
        netcdf::AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        netcdf::AttributeValue::Float(f) => Some(AttrValue::Float(f)),
        netcdf::AttributeValue::Double(d) => Some(AttrValue::Double(d)),
        netcdf::AttributeValue::Int(i) => Some(AttrValue::Int(i)),
        netcdf::AttributeValue::Short(s) => Some(AttrValue::Int(i32::from(s))),
        netcdf::AttributeValue::Longlong(l) => Some(AttrValue::Int64(l)),
        netcdf::AttributeValue::Floats(v) => Some(AttrValue::Floats(v)),
        netcdf::AttributeValue::Doubles(v) => Some(AttrValue::Doubles(v)),
        netcdf::AttributeValue::Ints(v) => Some(AttrValue::Ints(v)),
        _ => None,
    }
}
