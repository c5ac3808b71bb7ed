use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
	CandidateHit, CtrCount, Document, Preferences, RankingWeights, UserProfile, ctr,
	personalization, round3, round4,
};

/// A candidate annotated with every term of its score.
///
/// `final_score` equals the rounded sum of `log_bm25`, `user_contrib`, and `ctr_contrib` as
/// displayed, so clients can re-derive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
	#[serde(flatten)]
	pub document: Document,
	pub highlights: BTreeMap<String, Vec<String>>,
	pub base_score: f64,
	pub log_bm25: f64,
	pub f_type: f64,
	pub f_topic: f64,
	pub f_user: f64,
	pub user_contrib: f64,
	pub smoothed_ctr: f64,
	pub ctr_factor: f64,
	pub ctr_contrib: f64,
	pub ctr_boost: f64,
	pub final_score: f64,
	pub position: u32,
	pub clicks: u64,
	pub impressions: u64,
	pub display_ctr: Option<f64>,
	pub weights: RankingWeights,
}

/// Scores every hit and returns them best first with 1-based positions.
///
/// The sort is stable, so equal scores keep the index order.
pub fn rank(
	hits: Vec<CandidateHit>,
	ctr_by_doc: &HashMap<String, CtrCount>,
	profile: Option<&UserProfile>,
	personalize: bool,
	weights: &RankingWeights,
	prefs: &Preferences,
) -> Vec<ScoredResult> {
	let profile = profile.filter(|_| personalize);
	let mut results = hits
		.into_iter()
		.map(|hit| score_hit(hit, ctr_by_doc, profile, weights, prefs))
		.collect::<Vec<_>>();

	results.sort_by(|a, b| cmp_f64_desc(a.final_score, b.final_score));

	for (idx, result) in results.iter_mut().enumerate() {
		result.position = idx as u32 + 1;
	}

	results
}

pub fn cmp_f64_desc(a: f64, b: f64) -> std::cmp::Ordering {
	b.total_cmp(&a)
}

fn score_hit(
	hit: CandidateHit,
	ctr_by_doc: &HashMap<String, CtrCount>,
	profile: Option<&UserProfile>,
	weights: &RankingWeights,
	prefs: &Preferences,
) -> ScoredResult {
	let CandidateHit { score, document, highlights } = hit;
	let lexical = if score.is_finite() { score.max(0.0) } else { 0.0 };
	let log_bm25 = (1.0 + lexical).ln();
	let (f_type, f_topic) = match profile {
		Some(profile) => (
			personalization::f_type_for_doc(&document, profile, prefs),
			personalization::f_topic_for_doc(&document, profile, prefs),
		),
		None => (0.0, 0.0),
	};
	let f_user = weights.alpha_type * f_type + weights.alpha_topic * f_topic;
	let counts = ctr_by_doc.get(&document.document_id).copied();
	let smoothed_ctr = counts
		.map(|c| ctr::bayesian_smoothed_ctr(c.clicks, c.impressions, weights))
		.unwrap_or(0.0);
	let ctr_factor = ctr::ctr_factor(smoothed_ctr);
	let log_bm25_r = round3(log_bm25);
	let user_contrib = round3(weights.w_user * f_user);
	let ctr_contrib = round3(weights.beta_ctr * ctr_factor);
	let counts = counts.unwrap_or_default();

	ScoredResult {
		document,
		highlights,
		base_score: round3(lexical),
		log_bm25: log_bm25_r,
		f_type: round3(f_type),
		f_topic: round3(f_topic),
		f_user: round3(f_user),
		user_contrib,
		smoothed_ctr: round4(smoothed_ctr),
		ctr_factor: round3(ctr_factor),
		ctr_contrib,
		ctr_boost: round3(1.0 + ctr_factor),
		final_score: round3(log_bm25_r + user_contrib + ctr_contrib),
		position: 0,
		clicks: counts.clicks,
		impressions: counts.impressions,
		display_ctr: None,
		weights: *weights,
	}
}
