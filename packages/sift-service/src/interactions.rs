use serde::{Deserialize, Serialize};

use sift_index::FilterOptions;
use sift_storage::models::{NewClick, NewImpressions};

use crate::{Error, Result, SiftService, bounded};

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
	pub query: String,
	pub document_id: String,
	pub user_id: Option<i64>,
	/// 1-based position the document was shown at.
	pub position: u32,
	pub session_id: Option<String>,
	/// Seconds spent on the document, when the client measured it.
	pub dwell_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickResponse {
	pub status: String,
	pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImpressionsRequest {
	pub query: String,
	pub user_id: Option<i64>,
	/// Documents in display order.
	pub document_ids: Vec<String>,
	pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpressionsResponse {
	pub status: String,
	pub session_id: String,
	pub recorded: u64,
	/// `None` when the totals lookup failed after the batch was stored.
	pub total_impressions: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalStatsResponse {
	pub total_impressions: u64,
	pub total_clicks: u64,
}

impl SiftService {
	/// Records a click. A failed write is reported as a registration error and is not retried.
	pub async fn register_click(&self, req: ClickRequest) -> Result<ClickResponse> {
		let query = required_text("query", &req.query)?;
		let document_id = required_text("document_id", &req.document_id)?;

		if req.position == 0 {
			return Err(Error::InvalidRequest {
				message: "position must be at least 1.".to_string(),
			});
		}

		let position = to_i32("position", req.position)?;
		let dwell_time = req.dwell_time.map(|secs| to_i32("dwell_time", secs)).transpose()?;
		let click = NewClick {
			query_text: query,
			document_id,
			user_id: req.user_id,
			position,
			session_id: req.session_id.as_deref(),
			dwell_time,
		};
		let session_id = bounded(
			self.store_timeout(),
			"Click registration",
			self.backends.interactions.register_click(click),
		)
		.await
		.map_err(registration_error)?;

		tracing::debug!(document_id, position, "Click recorded.");

		Ok(ClickResponse { status: "ok".to_string(), session_id })
	}

	/// Records one impression per shown document. Repeating a batch within a session is a no-op.
	pub async fn register_impressions(
		&self,
		req: ImpressionsRequest,
	) -> Result<ImpressionsResponse> {
		let query = required_text("query", &req.query)?;
		let max_batch = self.cfg.search.max_fetch_size as usize;

		if req.document_ids.len() > max_batch {
			return Err(Error::InvalidRequest {
				message: format!("document_ids must contain at most {max_batch} entries."),
			});
		}
		if req.document_ids.iter().any(|id| id.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: "document_ids must not contain blank entries.".to_string(),
			});
		}

		let impressions = NewImpressions {
			query_text: query,
			user_id: req.user_id,
			document_ids: &req.document_ids,
			session_id: req.session_id.as_deref(),
		};
		let batch = bounded(
			self.store_timeout(),
			"Impression registration",
			self.backends.interactions.register_impressions(impressions),
		)
		.await
		.map_err(registration_error)?;
		// The batch is committed; totals are best effort from here.
		let total_impressions = match self.total_stats().await {
			Ok(totals) => Some(totals.total_impressions),
			Err(err) => {
				tracing::warn!(
					error = %err,
					session_id = %batch.session_id,
					"Impression totals lookup failed; returning the recorded batch without totals."
				);

				None
			},
		};

		Ok(ImpressionsResponse {
			status: "ok".to_string(),
			session_id: batch.session_id,
			recorded: batch.inserted,
			total_impressions,
		})
	}

	pub async fn total_stats(&self) -> Result<TotalStatsResponse> {
		let totals =
			bounded(self.store_timeout(), "Total stats", self.backends.interactions.total_stats())
				.await?;

		Ok(TotalStatsResponse {
			total_impressions: totals.total_impressions,
			total_clicks: totals.total_clicks,
		})
	}

	pub async fn filter_options(&self) -> Result<FilterOptions> {
		bounded(self.index_timeout(), "Filter options", self.backends.index.filter_options()).await
	}
}

pub(crate) fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: format!("{field} must be non-empty.") });
	}

	Ok(trimmed)
}

fn to_i32(field: &str, value: u32) -> Result<i32> {
	i32::try_from(value)
		.map_err(|_| Error::InvalidRequest { message: format!("{field} is out of range.") })
}

fn registration_error(err: Error) -> Error {
	match err {
		Error::InvalidRequest { .. } => err,
		other => Error::Registration { message: other.to_string() },
	}
}
