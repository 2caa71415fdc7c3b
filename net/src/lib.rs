//! Stochastic network-timing model (§4.3): one-way delay, transmission
//! time and block-find samplers, each backed by its own deterministic LCG
//! stream so sweeps that vary one scalar don't perturb unrelated draws.

#[macro_use]
extern crate serde_derive;

mod config;
mod lcg;
mod noise;

pub use config::NetConfig;
pub use lcg::Lcg64;
pub use noise::NoiseEngine;
