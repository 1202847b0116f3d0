// Domain layer: star-schema models and ports (interfaces).

pub mod model;
pub mod ports;
