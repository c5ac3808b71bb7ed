use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
	pub user_id: i64,
	pub username: String,
	pub email: String,
	pub role: String,
	pub specialization: Option<String>,
	pub faculty: Option<String>,
	pub course: Option<i32>,
	pub interests: Vec<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct NewClick<'a> {
	pub query_text: &'a str,
	pub document_id: &'a str,
	pub user_id: Option<i64>,
	/// 1-based display position.
	pub position: i32,
	pub session_id: Option<&'a str>,
	pub dwell_time: Option<i32>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewImpressions<'a> {
	pub query_text: &'a str,
	pub user_id: Option<i64>,
	/// Documents in display order. Positions are assigned from 1.
	pub document_ids: &'a [String],
	pub session_id: Option<&'a str>,
}

/// Outcome of an impression batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpressionBatch {
	pub session_id: String,
	/// Rows actually written; duplicates of an earlier impression are not counted.
	pub inserted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalStats {
	pub total_impressions: u64,
	pub total_clicks: u64,
}
