use std::collections::HashMap;

use super::expr::DataExpr;
use super::DataError;

/// Name of the forecast time dimension, shared by every artifact file
pub const TIME_DIM: &str = "time";

/// Attribute values used by the pipeline's files
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Float(f32),
    Double(f64),
    Int(i32),
    Int64(i64),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Ints(Vec<i32>),
}

pub type Attributes = HashMap<String, AttrValue>;

/// One coordinate vector with its attributes
#[derive(Debug, Clone)]
pub struct CoordVector {
    pub name: String,
    pub values: Vec<f64>,
    pub attrs: Attributes,
}

/// One data variable: dimension names plus a deferred expression for its
/// values
#[derive(Clone)]
pub struct GridVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: DataExpr,
    pub attrs: Attributes,
}

/// In-memory view of a gridded file: ordered dimensions, eagerly loaded
/// coordinate vectors, lazily read data variables. A coordinate is a
/// variable whose name equals a dimension name.
#[derive(Clone)]
pub struct GridDataset {
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<CoordVector>,
    pub vars: Vec<GridVariable>,
    pub attrs: Attributes,
}

impl GridDataset {
    /// Empty dataset with the given dimensions, for assembling outputs
    pub fn new(dims: Vec<(String, usize)>) -> Self {
        Self {
            dims,
            coords: Vec::new(),
            vars: Vec::new(),
            attrs: Attributes::new(),
        }
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, len)| *len)
    }

    pub fn coord(&self, name: &str) -> Option<&CoordVector> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&GridVariable> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Names of all variables, coordinates first, in file order
    pub fn variable_names(&self) -> Vec<String> {
        self.coords
            .iter()
            .map(|c| c.name.clone())
            .chain(self.vars.iter().map(|v| v.name.clone()))
            .collect()
    }

    /// Replace a coordinate's values wholesale, discarding its previous
    /// attributes. This is an intentional overwrite: no merging with or
    /// validation against whatever coordinate existed before.
    pub fn overwrite_coord(&mut self, name: &str, values: Vec<f64>) -> Result<(), DataError> {
        let len = self
            .dim_len(name)
            .ok_or_else(|| DataError::MissingDimension(name.to_string()))?;
        if values.len() != len {
            return Err(DataError::ShapeMismatch {
                expected: vec![len],
                actual: vec![values.len()],
            });
        }
        match self.coords.iter_mut().find(|c| c.name == name) {
            Some(coord) => {
                coord.values = values;
                coord.attrs = Attributes::new();
            }
            None => self.coords.push(CoordVector {
                name: name.to_string(),
                values,
                attrs: Attributes::new(),
            }),
        }
        Ok(())
    }

    /// Merge attributes onto an existing coordinate
    pub fn set_coord_attrs(&mut self, name: &str, attrs: Attributes) -> Result<(), DataError> {
        let coord = self
            .coords
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::MissingVariable(name.to_string()))?;
        coord.attrs.extend(attrs);
        Ok(())
    }

    /// Drop a size-1 dimension from the dataset and from every variable
    /// indexed by it. Returns whether the dimension was present; a missing
    /// dimension is not an error.
    pub fn squeeze(&mut self, name: &str) -> bool {
        let Some(len) = self.dim_len(name) else {
            return false;
        };
        if len != 1 {
            return false;
        }
        self.dims.retain(|(dim, _)| dim != name);
        self.coords.retain(|c| c.name != name);
        for var in &mut self.vars {
            if var.dims.iter().any(|d| d == name) {
                var.dims.retain(|d| d != name);
                var.data.squeeze_dim(name);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> GridDataset {
        let mut ds = GridDataset::new(vec![
            ("sample".to_string(), 1),
            (TIME_DIM.to_string(), 4),
            ("lat".to_string(), 2),
            ("lon".to_string(), 3),
        ]);
        ds.coords.push(CoordVector {
            name: TIME_DIM.to_string(),
            values: vec![0.0, 1.0, 2.0, 3.0],
            attrs: Attributes::new(),
        });
        ds.vars.push(GridVariable {
            name: "field".to_string(),
            dims: vec![
                "sample".to_string(),
                TIME_DIM.to_string(),
                "lat".to_string(),
                "lon".to_string(),
            ],
            data: DataExpr::scalar(0.0),
            attrs: Attributes::new(),
        });
        ds
    }

    #[test]
    fn test_dim_len_lookup() {
        let ds = sample_dataset();
        assert_eq!(ds.dim_len(TIME_DIM), Some(4));
        assert_eq!(ds.dim_len("lev"), None);
    }

    #[test]
    fn test_overwrite_coord_replaces_values_and_attrs() {
        let mut ds = sample_dataset();
        ds.coords[0]
            .attrs
            .insert("units".to_string(), AttrValue::Text("old".to_string()));

        ds.overwrite_coord(TIME_DIM, vec![10.0, 16.0, 22.0, 28.0])
            .unwrap();
        let coord = ds.coord(TIME_DIM).unwrap();
        assert_eq!(coord.values, vec![10.0, 16.0, 22.0, 28.0]);
        assert!(coord.attrs.is_empty());
    }

    #[test]
    fn test_overwrite_coord_rejects_wrong_length() {
        let mut ds = sample_dataset();
        let result = ds.overwrite_coord(TIME_DIM, vec![0.0, 1.0]);
        assert!(matches!(result, Err(DataError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_squeeze_drops_singleton_dimension() {
        let mut ds = sample_dataset();
        assert!(ds.squeeze("sample"));
        assert_eq!(ds.dim_len("sample"), None);
        assert_eq!(
            ds.variable("field").unwrap().dims,
            vec![TIME_DIM.to_string(), "lat".to_string(), "lon".to_string()]
        );
    }

    #[test]
    fn test_squeeze_is_a_no_op_without_the_dimension() {
        let mut ds = sample_dataset();
        ds.squeeze("sample");
        assert!(!ds.squeeze("sample"));
        assert_eq!(ds.variable("field").unwrap().dims.len(), 3);
    }

    #[test]
    fn test_squeeze_refuses_multi_length_dimension() {
        let mut ds = sample_dataset();
        assert!(!ds.squeeze("lat"));
        assert_eq!(ds.dim_len("lat"), Some(2));
    }
}
