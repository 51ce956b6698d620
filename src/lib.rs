#![allow(dead_code)]
#![warn(clippy::cargo)]
#![allow(clippy::comparison_chain)]
#![doc = include_str!("../README.md")]

mod math;

pub mod config;
pub mod edge;
pub mod gate;
pub mod optimize;
pub mod permutation;
pub mod scheme;
pub mod spectra;
pub mod synthesis;
pub mod table;
pub mod tfc;

#[cfg(test)]
mod tests;

#[doc(hidden)]
pub mod prelude {
    pub use crate::{
        config::Config,
        gate::Gate,
        optimize::PostProcessor,
        permutation::{Cycle, Permutation, Transposition},
        scheme::Scheme,
        synthesis::{synthesize, CompositeGenerator, GtGenerator, RmGenerator},
        table::TruthTable,
        tfc::TfcFormatter,
    };
}
