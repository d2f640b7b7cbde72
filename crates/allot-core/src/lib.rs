#![deny(missing_docs)]
#![doc = "Weighted experiment entity and deterministic draw primitives for allot."]

pub mod errors;
mod experiment;
pub mod rng;

pub use errors::{AllotError, ErrorInfo};
pub use experiment::Experiment;
pub use rng::RngHandle;
