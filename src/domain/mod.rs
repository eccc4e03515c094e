// Domain layer: core models, session state and ports (interfaces). No I/O here.

pub mod message;
pub mod model;
pub mod ports;
pub mod session;
