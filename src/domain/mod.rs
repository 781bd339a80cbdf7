// Domain layer: value types and ports shared by the process, http and config code.

pub mod model;
pub mod ports;
