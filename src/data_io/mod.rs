pub mod dataset;
pub mod expr;
pub mod reader;
pub mod writer;

pub use dataset::*;
pub use expr::*;
pub use reader::*;
pub use writer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Dimension not found: {0}")]
    MissingDimension(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Data conversion error: {0}")]
    Conversion(String),

    #[error("Time decoding error: {0}")]
    TimeDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
