pub mod config;
pub mod data_io;
pub mod math;
pub mod pipeline;
pub mod time_utils;

pub use time_utils::*;
