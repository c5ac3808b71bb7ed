//! Live ranking weights and preference tables.
//!
//! Readers always receive whole snapshots. Writers validate first and swap the full value under
//! the write lock, so a rejected write leaves the previous value in place.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use sift_domain::{
	Preferences, Preset, RankingWeights, TopicScores,
	preferences::{self, RoleTypeMatrix, SpecializationTopics},
};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsResponse {
	pub weights: RankingWeights,
	/// `None` once weights were set by hand.
	pub active_preset: Option<Preset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetEntry {
	pub name: Preset,
	pub weights: RankingWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetList {
	pub presets: Vec<PresetEntry>,
	pub active_preset: Option<Preset>,
}

pub struct SettingsStore {
	weights: RwLock<WeightsResponse>,
	preferences: RwLock<Arc<Preferences>>,
}
impl SettingsStore {
	pub fn with_preset(preset: Preset) -> Self {
		Self {
			weights: RwLock::new(WeightsResponse {
				weights: preset.weights(),
				active_preset: Some(preset),
			}),
			preferences: RwLock::new(Arc::new(Preferences::default())),
		}
	}

	pub fn weights(&self) -> RankingWeights {
		self.read_weights().weights
	}

	pub fn weights_snapshot(&self) -> WeightsResponse {
		*self.read_weights()
	}

	pub fn set_weights(&self, weights: RankingWeights) -> Result<WeightsResponse> {
		weights.validate()?;

		let snapshot = WeightsResponse { weights, active_preset: None };

		*self.write_weights() = snapshot;

		tracing::info!(
			w_user = weights.w_user,
			alpha_type = weights.alpha_type,
			alpha_topic = weights.alpha_topic,
			beta_ctr = weights.beta_ctr,
			ctr_alpha_prior = weights.ctr_alpha_prior,
			ctr_beta_prior = weights.ctr_beta_prior,
			"Ranking weights updated."
		);

		Ok(snapshot)
	}

	pub fn apply_preset(&self, name: &str) -> Result<WeightsResponse> {
		let preset = name.trim().to_ascii_lowercase().parse::<Preset>()?;

		Ok(self.install_preset(preset))
	}

	pub fn reset(&self) -> WeightsResponse {
		self.install_preset(Preset::Default)
	}

	pub fn list_presets(&self) -> PresetList {
		PresetList {
			presets: Preset::ALL
				.into_iter()
				.map(|name| PresetEntry { name, weights: name.weights() })
				.collect(),
			active_preset: self.read_weights().active_preset,
		}
	}

	/// The current tables. Holding the `Arc` pins one consistent version for a whole ranking pass.
	pub fn preferences(&self) -> Arc<Preferences> {
		self.preferences.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn set_preferences(&self, prefs: Preferences) -> Result<Arc<Preferences>> {
		prefs.validate()?;

		let prefs = Arc::new(prefs);

		*self.write_preferences() = prefs.clone();

		tracing::info!("Preference tables replaced.");

		Ok(prefs)
	}

	pub fn set_role_type_matrix(&self, matrix: RoleTypeMatrix) -> Result<Arc<Preferences>> {
		preferences::validate_role_type_matrix(&matrix)?;

		Ok(self.update_preferences("role_type_matrix", |prefs| prefs.role_type_matrix = matrix))
	}

	pub fn set_topic_scores(&self, scores: TopicScores) -> Result<Arc<Preferences>> {
		scores.validate()?;

		Ok(self.update_preferences("topic_scores", |prefs| prefs.topic_scores = scores))
	}

	pub fn set_specialization_topics(
		&self,
		topics: SpecializationTopics,
	) -> Result<Arc<Preferences>> {
		preferences::validate_specialization_topics(&topics)?;

		Ok(self.update_preferences("specialization_topics", |prefs| {
			prefs.specialization_topics = topics
		}))
	}

	pub fn reset_preferences(&self) -> Arc<Preferences> {
		let prefs = Arc::new(Preferences::default());

		*self.write_preferences() = prefs.clone();

		tracing::info!("Preference tables reset to defaults.");

		prefs
	}

	fn install_preset(&self, preset: Preset) -> WeightsResponse {
		let snapshot = WeightsResponse { weights: preset.weights(), active_preset: Some(preset) };

		*self.write_weights() = snapshot;

		tracing::info!(preset = preset.as_str(), "Ranking preset applied.");

		snapshot
	}

	/// Copy-on-write update of one table. The lock is held across the copy so concurrent table
	/// updates are not lost.
	fn update_preferences(
		&self,
		table: &str,
		apply: impl FnOnce(&mut Preferences),
	) -> Arc<Preferences> {
		let mut guard = self.write_preferences();
		let mut next = Preferences::clone(&guard);

		apply(&mut next);

		let next = Arc::new(next);

		*guard = next.clone();

		tracing::info!(table, "Preference table updated.");

		next
	}

	fn read_weights(&self) -> RwLockReadGuard<'_, WeightsResponse> {
		self.weights.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write_weights(&self) -> RwLockWriteGuard<'_, WeightsResponse> {
		self.weights.write().unwrap_or_else(|err| err.into_inner())
	}

	fn write_preferences(&self) -> RwLockWriteGuard<'_, Arc<Preferences>> {
		self.preferences.write().unwrap_or_else(|err| err.into_inner())
	}
}
impl Default for SettingsStore {
	fn default() -> Self {
		Self::with_preset(Preset::Default)
	}
}
