use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sift_domain::{CtrCount, ScoredResult, UserProfile, rank};
use sift_index::{SearchField, SearchFilters};

use crate::{Error, Result, SiftService, bounded, interactions::required_text};

const MAX_QUERY_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub user_id: Option<i64>,
	#[serde(default = "default_page")]
	pub page: u32,
	/// Falls back to `search.default_per_page`.
	#[serde(default)]
	pub per_page: Option<u32>,
	#[serde(default = "default_personalization")]
	pub enable_personalization: bool,
	#[serde(default)]
	pub filters: SearchFilters,
	#[serde(default)]
	pub search_field: SearchField,
}
impl SearchRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			user_id: None,
			page: default_page(),
			per_page: None,
			enable_personalization: default_personalization(),
			filters: SearchFilters::default(),
			search_field: SearchField::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub query: String,
	pub total: u64,
	pub page: u32,
	pub per_page: u32,
	pub total_pages: u64,
	pub results: Vec<ScoredResult>,
	/// True only when a profile was found and applied.
	pub personalized: bool,
	pub user_profile: Option<UserProfile>,
}

struct Window {
	page: u32,
	per_page: u32,
	fetch_size: u32,
}

impl SiftService {
	/// Retrieves candidates, reranks them, and returns one page.
	///
	/// Index failures fail the request. Profile and CTR failures only zero their contribution.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = required_text("query", &req.query)?;

		if query.chars().count() > MAX_QUERY_CHARS {
			return Err(Error::InvalidRequest {
				message: format!("query must be at most {MAX_QUERY_CHARS} characters."),
			});
		}

		let window = self.window(req.page, req.per_page)?;
		let profile = match req.user_id.filter(|_| req.enable_personalization) {
			Some(user_id) => self.load_profile(user_id).await,
			None => None,
		};
		let hits = bounded(
			self.index_timeout(),
			"Index search",
			self.backends.index.search(query, &req.filters, req.search_field, window.fetch_size),
		)
		.await
		.map_err(|err| match err {
			Error::UpstreamUnavailable { .. } => err,
			other => Error::UpstreamUnavailable { message: other.to_string() },
		})?;
		let ctr_by_doc = self.query_ctr(query).await;
		let personalize = profile.is_some();
		// One snapshot of each for the whole pass.
		let weights = self.settings.weights();
		let prefs = self.settings.preferences();
		let ranked = rank(hits.hits, &ctr_by_doc, profile.as_ref(), personalize, &weights, &prefs);
		let start = (window.page as usize - 1) * window.per_page as usize;
		let mut results =
			ranked.into_iter().skip(start).take(window.per_page as usize).collect::<Vec<_>>();

		self.attach_display_ctr(&mut results).await;

		tracing::debug!(
			query,
			total = hits.total,
			returned = results.len(),
			personalized = personalize,
			"Search served."
		);

		Ok(SearchResponse {
			query: query.to_string(),
			total: hits.total,
			page: window.page,
			per_page: window.per_page,
			total_pages: hits.total.div_ceil(u64::from(window.per_page)),
			results,
			personalized: personalize,
			user_profile: profile,
		})
	}

	fn window(&self, page: u32, per_page: Option<u32>) -> Result<Window> {
		let limits = &self.cfg.search;
		let per_page = per_page.unwrap_or(limits.default_per_page);

		if page == 0 {
			return Err(Error::InvalidRequest { message: "page must be at least 1.".to_string() });
		}
		if per_page == 0 || per_page > limits.max_per_page {
			return Err(Error::InvalidRequest {
				message: format!("per_page must be between 1 and {}.", limits.max_per_page),
			});
		}

		let fetch_size = u64::from(page) * u64::from(per_page);

		if fetch_size > u64::from(limits.max_fetch_size) {
			return Err(Error::InvalidRequest {
				message: format!(
					"page * per_page must be at most {}; got {fetch_size}.",
					limits.max_fetch_size
				),
			});
		}

		Ok(Window { page, per_page, fetch_size: fetch_size as u32 })
	}

	/// A missing user or a failed lookup disables personalization for this request.
	async fn load_profile(&self, user_id: i64) -> Option<UserProfile> {
		let lookup = bounded(
			self.store_timeout(),
			"Profile lookup",
			self.backends.profiles.fetch_user(user_id),
		)
		.await;

		match lookup {
			Ok(Some(user)) => Some(user.profile()),
			Ok(None) => {
				tracing::warn!(user_id, "Unknown user; serving unpersonalized results.");

				None
			},
			Err(err) => {
				tracing::warn!(
					user_id,
					error = %err,
					"Profile lookup failed; serving unpersonalized results."
				);

				None
			},
		}
	}

	async fn query_ctr(&self, query: &str) -> HashMap<String, CtrCount> {
		let lookup = bounded(
			self.store_timeout(),
			"CTR lookup",
			self.backends.interactions.ctr_for_query(query),
		)
		.await;

		lookup.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "CTR lookup failed; ranking without CTR.");

			HashMap::new()
		})
	}

	/// Overwrites the ranking-time counts with all-query totals for display.
	async fn attach_display_ctr(&self, results: &mut [ScoredResult]) {
		if results.is_empty() {
			return;
		}

		let document_ids =
			results.iter().map(|result| result.document.document_id.clone()).collect::<Vec<_>>();
		let lookup = bounded(
			self.store_timeout(),
			"Aggregated CTR lookup",
			self.backends.interactions.aggregated_ctr(&document_ids),
		)
		.await;
		let aggregated = match lookup {
			Ok(aggregated) => aggregated,
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Aggregated CTR lookup failed; display counts omitted."
				);

				return;
			},
		};

		for result in results {
			if let Some(count) = aggregated.get(&result.document.document_id) {
				result.clicks = count.clicks;
				result.impressions = count.impressions;
				result.display_ctr = count.display_ctr();
			}
		}
	}
}

fn default_page() -> u32 {
	1
}

fn default_personalization() -> bool {
	true
}
