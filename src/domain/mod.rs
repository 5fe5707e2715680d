// Domain layer: order models and ports. Adapters and handlers live outside.

pub mod model;
pub mod ports;
