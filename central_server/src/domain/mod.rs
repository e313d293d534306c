// Domain layer: entities, errors, and the ports the coordinator depends on.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod topics;
