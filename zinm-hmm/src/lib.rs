#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![allow(clippy::many_single_char_names)]
#![warn(missing_docs)]

//! A Hidden Markov Model inference engine for discrete multivariate count data: zero-inflated
//! and mixture negative-multinomial emissions, forward–backward smoothing, Viterbi decoding, and
//! a Baum–Welch trainer.

pub mod backward;
pub mod config;
pub mod driver;
pub mod emission;
pub mod error;
pub mod forward;
pub mod observations;
pub mod params;
pub mod solve;
pub mod trainer;
pub mod viterbi;

pub use config::TrainerConfig;
pub use emission::{EmissionModel, OutputMode};
pub use error::{Diagnostics, Error, Result, Warning};
pub use observations::Observations;
pub use params::HmmParams;
pub use trainer::FitOutput;
