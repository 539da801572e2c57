//! Region → station fan-out and the fan-in back to one document.

pub mod collect;
pub mod region;
pub mod stations;
