pub use log::{info, warn};

pub use crate::error::ConfigError;

pub type CountMat = nalgebra::DMatrix<u32>;

/// The one random stream of a run
pub type SimRng = rand::rngs::StdRng;

/// Seed the random stream of a run
pub fn seeded_rng(rseed: u64) -> SimRng {
    use rand::SeedableRng;
    SimRng::seed_from_u64(rseed)
}
