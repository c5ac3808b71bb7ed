use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tunable coefficients of the ranking formula.
///
/// Values are plain data; bounds are checked by [`RankingWeights::validate`] when a new value is
/// installed, never while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
	pub w_user: f64,
	pub alpha_type: f64,
	pub alpha_topic: f64,
	pub beta_ctr: f64,
	pub ctr_alpha_prior: f64,
	pub ctr_beta_prior: f64,
}
impl RankingWeights {
	pub const W_USER_RANGE: (f64, f64) = (0.0, 5.0);
	pub const ALPHA_RANGE: (f64, f64) = (0.0, 1.0);
	pub const BETA_CTR_RANGE: (f64, f64) = (0.0, 3.0);
	pub const CTR_ALPHA_PRIOR_RANGE: (f64, f64) = (0.0, 10.0);
	pub const CTR_BETA_PRIOR_RANGE: (f64, f64) = (1.0, 100.0);

	pub fn validate(&self) -> Result<()> {
		for (field, value, (min, max)) in [
			("w_user", self.w_user, Self::W_USER_RANGE),
			("alpha_type", self.alpha_type, Self::ALPHA_RANGE),
			("alpha_topic", self.alpha_topic, Self::ALPHA_RANGE),
			("beta_ctr", self.beta_ctr, Self::BETA_CTR_RANGE),
			("ctr_alpha_prior", self.ctr_alpha_prior, Self::CTR_ALPHA_PRIOR_RANGE),
			("ctr_beta_prior", self.ctr_beta_prior, Self::CTR_BETA_PRIOR_RANGE),
		] {
			if !value.is_finite() || value < min || value > max {
				return Err(Error::Validation {
					message: format!(
						"Weight '{field}' value {value} is out of range [{min}, {max}]."
					),
				});
			}
		}

		Ok(())
	}
}
impl Default for RankingWeights {
	fn default() -> Self {
		Self {
			w_user: 1.5,
			alpha_type: 0.4,
			alpha_topic: 0.6,
			beta_ctr: 0.5,
			ctr_alpha_prior: 1.0,
			ctr_beta_prior: 10.0,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
	Default,
	HighPersonalization,
	HighCtr,
	Bm25Only,
}
impl Preset {
	pub const ALL: [Preset; 4] =
		[Self::Default, Self::HighPersonalization, Self::HighCtr, Self::Bm25Only];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Default => "default",
			Self::HighPersonalization => "high_personalization",
			Self::HighCtr => "high_ctr",
			Self::Bm25Only => "bm25_only",
		}
	}

	pub fn weights(self) -> RankingWeights {
		let base = RankingWeights::default();

		match self {
			Self::Default => base,
			Self::HighPersonalization => RankingWeights { w_user: 3.0, beta_ctr: 0.3, ..base },
			Self::HighCtr => RankingWeights { w_user: 0.5, beta_ctr: 2.0, ..base },
			Self::Bm25Only => RankingWeights { w_user: 0.0, beta_ctr: 0.0, ..base },
		}
	}
}
impl FromStr for Preset {
	type Err = Error;

	fn from_str(name: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|preset| preset.as_str() == name)
			.ok_or_else(|| Error::UnknownPreset { name: name.to_string() })
	}
}
impl fmt::Display for Preset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
