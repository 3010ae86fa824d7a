// Domain layer: row/record models and ports (interfaces) for the collaborators.

pub mod model;
pub mod ports;
