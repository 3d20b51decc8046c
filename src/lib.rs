pub mod data;
pub mod error;
pub mod io;
pub mod permutation;
pub mod pipeline;
pub mod prng;
pub mod progress;
pub mod session;
pub mod solver;
pub mod utils;
pub mod viewer;

pub use error::DescrambleError;
