use serde::{Deserialize, Serialize};

use crate::RankingWeights;

/// Scale applied to the smoothed CTR before the log so the CTR term is comparable in magnitude
/// to `log(1 + bm25)`.
pub const CTR_LOG_SCALE: f64 = 10.0;

/// Click and impression totals for one document. `clicks <= impressions` is not assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtrCount {
	pub clicks: u64,
	pub impressions: u64,
}
impl CtrCount {
	pub fn new(clicks: u64, impressions: u64) -> Self {
		Self { clicks, impressions }
	}

	/// Raw ratio for display. `None` until the document has been shown at least once.
	pub fn display_ctr(&self) -> Option<f64> {
		(self.impressions > 0).then(|| self.clicks as f64 / self.impressions as f64)
	}
}

/// `(clicks + α) / (impressions + α + β)` with the configured pseudo-counts.
pub fn bayesian_smoothed_ctr(clicks: u64, impressions: u64, weights: &RankingWeights) -> f64 {
	let alpha = weights.ctr_alpha_prior;
	let beta = weights.ctr_beta_prior;

	(clicks as f64 + alpha) / (impressions as f64 + alpha + beta)
}

pub fn ctr_factor(smoothed_ctr: f64) -> f64 {
	if smoothed_ctr > 0.0 { (1.0 + smoothed_ctr * CTR_LOG_SCALE).ln() } else { 0.0 }
}
