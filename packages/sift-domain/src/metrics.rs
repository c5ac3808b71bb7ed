//! Offline ranking-quality metrics over graded relevance lists.
//!
//! Relevance lists are in ranked order, best position first. A grade at or above the threshold
//! counts as relevant for the binary metrics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Document, UserProfile, round4};

pub const RELEVANCE_THRESHOLD: f64 = 0.5;
/// Cutoff used by [`compare_rankings`].
pub const COMPARISON_DEPTH: usize = 10;

const CLICK_GRADE: f64 = 0.5;
const SPECIALIZATION_GRADE: f64 = 0.3;
const INTEREST_GRADE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingComparison {
	pub ndcg_a: f64,
	pub ndcg_b: f64,
	pub precision_a: f64,
	pub precision_b: f64,
	pub mrr_a: f64,
	pub mrr_b: f64,
	/// Documents present in both lists.
	pub overlap: usize,
}

/// Exponential-gain DCG: `sum((2^rel - 1) / log2(rank + 1))` over the first `k` grades.
pub fn dcg_at_k(relevances: &[f64], k: usize) -> f64 {
	relevances
		.iter()
		.take(k)
		.enumerate()
		.map(|(idx, rel)| (2_f64.powf(*rel) - 1.0) / (idx as f64 + 2.0).log2())
		.sum()
}

/// DCG normalized by the DCG of the same grades sorted best first. Zero when no grade is positive.
pub fn ndcg_at_k(relevances: &[f64], k: usize) -> f64 {
	let mut ideal = relevances.to_vec();

	ideal.sort_by(|a, b| b.total_cmp(a));

	let idcg = dcg_at_k(&ideal, k);

	if idcg == 0.0 {
		return 0.0;
	}

	dcg_at_k(relevances, k) / idcg
}

/// Relevant share of the top `k`. The denominator is `k` even when fewer results exist.
pub fn precision_at_k(relevances: &[f64], k: usize, threshold: f64) -> f64 {
	if k == 0 || relevances.is_empty() {
		return 0.0;
	}

	count_relevant(relevances, k, threshold) as f64 / k as f64
}

pub fn recall_at_k(relevances: &[f64], k: usize, total_relevant: usize, threshold: f64) -> f64 {
	if total_relevant == 0 {
		return 0.0;
	}

	count_relevant(relevances, k, threshold) as f64 / total_relevant as f64
}

/// `1 / rank` of the first relevant grade, or zero.
pub fn reciprocal_rank(relevances: &[f64], threshold: f64) -> f64 {
	relevances
		.iter()
		.position(|rel| *rel >= threshold)
		.map(|idx| 1.0 / (idx as f64 + 1.0))
		.unwrap_or(0.0)
}

/// Judged relevance of a shown document in `[0, 1]`.
///
/// A click grades 0.5, a specialization found in the knowledge area or subjects adds 0.3, and the
/// first interest found in the title or subjects adds 0.2.
pub fn judged_relevance(document: &Document, profile: Option<&UserProfile>, clicked: bool) -> f64 {
	let mut grade = if clicked { CLICK_GRADE } else { 0.0 };

	if let Some(profile) = profile {
		let subject_text = std::iter::once(document.knowledge_area.as_str())
			.chain(document.subjects.iter().map(String::as_str))
			.collect::<Vec<_>>()
			.join(" ")
			.to_lowercase();
		let title = document.title.to_lowercase();
		let specialization = profile
			.specialization
			.as_deref()
			.map(|value| value.trim().to_lowercase())
			.unwrap_or_default();

		if !specialization.is_empty() && subject_text.contains(&specialization) {
			grade += SPECIALIZATION_GRADE;
		}

		let interest_hit = profile
			.interests
			.iter()
			.map(|interest| interest.trim().to_lowercase())
			.filter(|interest| !interest.is_empty())
			.any(|interest| title.contains(&interest) || subject_text.contains(&interest));

		if interest_hit {
			grade += INTEREST_GRADE;
		}
	}

	grade.min(1.0)
}

/// Scores two rankings of the same query against one user's judgments at depth 10.
pub fn compare_rankings(
	results_a: &[Document],
	results_b: &[Document],
	profile: Option<&UserProfile>,
	clicks_a: &HashSet<String>,
	clicks_b: &HashSet<String>,
) -> RankingComparison {
	let grade = |results: &[Document], clicks: &HashSet<String>| {
		results
			.iter()
			.map(|doc| judged_relevance(doc, profile, clicks.contains(&doc.document_id)))
			.collect::<Vec<_>>()
	};
	let rel_a = grade(results_a, clicks_a);
	let rel_b = grade(results_b, clicks_b);
	let ids_a = results_a.iter().map(|doc| doc.document_id.as_str()).collect::<HashSet<_>>();
	let overlap = results_b
		.iter()
		.map(|doc| doc.document_id.as_str())
		.collect::<HashSet<_>>()
		.intersection(&ids_a)
		.count();

	RankingComparison {
		ndcg_a: round4(ndcg_at_k(&rel_a, COMPARISON_DEPTH)),
		ndcg_b: round4(ndcg_at_k(&rel_b, COMPARISON_DEPTH)),
		precision_a: round4(precision_at_k(&rel_a, COMPARISON_DEPTH, RELEVANCE_THRESHOLD)),
		precision_b: round4(precision_at_k(&rel_b, COMPARISON_DEPTH, RELEVANCE_THRESHOLD)),
		mrr_a: round4(reciprocal_rank(&rel_a, RELEVANCE_THRESHOLD)),
		mrr_b: round4(reciprocal_rank(&rel_b, RELEVANCE_THRESHOLD)),
		overlap,
	}
}

fn count_relevant(relevances: &[f64], k: usize, threshold: f64) -> usize {
	relevances.iter().take(k).filter(|rel| **rel >= threshold).count()
}
