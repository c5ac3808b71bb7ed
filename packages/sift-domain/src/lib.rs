pub mod ctr;
pub mod document;
pub mod metrics;
pub mod personalization;
pub mod preferences;
pub mod ranking;
pub mod weights;

mod error;

pub use ctr::CtrCount;
pub use document::{CandidateHit, Document, UserProfile};
pub use error::{Error, Result};
pub use metrics::RankingComparison;
pub use preferences::{Preferences, TopicScores};
pub use ranking::{ScoredResult, rank};
pub use weights::{Preset, RankingWeights};

/// Rounds to three decimal places, the precision every displayed score uses.
pub fn round3(value: f64) -> f64 {
	(value * 1_000.0).round() / 1_000.0
}

pub fn round4(value: f64) -> f64 {
	(value * 10_000.0).round() / 10_000.0
}
