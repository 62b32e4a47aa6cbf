use crate::config::Constants;
use crate::data_io::expr::DataExpr;

/// Scale height of an air column at the given temperature
pub fn scale_height(temperature: f64, constants: &Constants) -> f64 {
    constants.r_dry * temperature / constants.gravity
}

/// Reduce surface pressure to sea level with the hypsometric equation
pub fn sea_level_pressure(
    surface_pressure: f64,
    surface_height: f64,
    temperature: f64,
    constants: &Constants,
) -> f64 {
    // SLP = SP * exp(h / (Rd * T / g))
    surface_pressure * (surface_height / scale_height(temperature, constants)).exp()
}

/// Hypsometric reduction over whole fields as a deferred expression.
/// `surface_height` must already be broadcast to the shape of the inputs.
pub fn sea_level_pressure_expr(
    surface_pressure: DataExpr,
    temperature: DataExpr,
    surface_height: DataExpr,
    constants: &Constants,
) -> DataExpr {
    let href = temperature
        .mul(DataExpr::scalar(constants.r_dry))
        .div(DataExpr::scalar(constants.gravity));
    surface_pressure.mul(surface_height.div(href).exp())
}
