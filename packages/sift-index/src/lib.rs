//! Client for an OpenSearch-compatible full-text index holding the document catalog.

pub mod query;
pub mod response;

mod error;

pub use error::{Error, Result};
pub use query::{DocumentTypeFilter, SearchField, SearchFilters};
pub use response::{FacetBucket, FilterOptions, PdfCounts, SearchHits};

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

pub struct IndexClient {
	client: Client,
	search_url: String,
	credentials: Option<(String, String)>,
}
impl IndexClient {
	pub fn new(cfg: &sift_config::Index) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let search_url = format!("{}/{}/_search", cfg.url.trim_end_matches('/'), cfg.index);
		let credentials = match (&cfg.username, &cfg.password) {
			(Some(username), Some(password)) => Some((username.clone(), password.clone())),
			_ => None,
		};

		Ok(Self { client, search_url, credentials })
	}

	/// Fetches up to `size` hits in index order, best lexical match first.
	pub async fn search(
		&self,
		query: &str,
		filters: &SearchFilters,
		field: SearchField,
		size: u32,
	) -> Result<SearchHits> {
		let body = query::build_search_body(query, filters, field, size);
		let json = self.post(&body).await?;

		response::parse_search_response(&json)
	}

	pub async fn filter_options(&self) -> Result<FilterOptions> {
		let json = self.post(&query::build_aggregations_body()).await?;

		response::parse_aggregations_response(&json)
	}

	async fn post(&self, body: &Value) -> Result<Value> {
		let mut request = self.client.post(&self.search_url).json(body);

		if let Some((username, password)) = &self.credentials {
			request = request.basic_auth(username, Some(password));
		}

		let json = request.send().await?.error_for_status()?.json().await?;

		Ok(json)
	}
}
