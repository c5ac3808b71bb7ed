//! Click and impression log plus the aggregates read back from `ctr_stats`.

use std::collections::HashMap;

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use sift_domain::CtrCount;

use crate::{
	Error, Result,
	db::Db,
	models::{ImpressionBatch, NewClick, NewImpressions, TotalStats},
};

/// Click and impression totals per document for one exact query text, across all sessions.
pub async fn ctr_for_query(db: &Db, query_text: &str) -> Result<HashMap<String, CtrCount>> {
	let rows: Vec<(String, i64, i64)> = sqlx::query_as(
		"\
SELECT document_id, COALESCE(SUM(clicks), 0)::bigint, COALESCE(SUM(impressions), 0)::bigint
FROM ctr_stats
WHERE query_text = $1
GROUP BY document_id",
	)
	.bind(query_text)
	.fetch_all(&db.pool)
	.await?;

	Ok(collect_counts(rows))
}

/// Totals per document across every query.
pub async fn aggregated_ctr(
	db: &Db,
	document_ids: &[String],
) -> Result<HashMap<String, CtrCount>> {
	if document_ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<(String, i64, i64)> = sqlx::query_as(
		"\
SELECT document_id, COALESCE(SUM(clicks), 0)::bigint, COALESCE(SUM(impressions), 0)::bigint
FROM ctr_stats
WHERE document_id = ANY($1)
GROUP BY document_id",
	)
	.bind(document_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(collect_counts(rows))
}

/// Records one click and returns the session it was filed under.
///
/// The `(query_text, session_id)` search record is found or created with an upsert, so
/// concurrent clicks in one session share a single record.
pub async fn register_click(db: &Db, click: NewClick<'_>) -> Result<String> {
	if click.position < 1 {
		return Err(Error::InvalidArgument(format!(
			"position must be at least 1, got {}.",
			click.position
		)));
	}

	let session_id = session_or_new(click.session_id);
	let mut tx = db.pool.begin().await?;
	let query_id = upsert_search_query(&mut tx, click.query_text, &session_id, click.user_id).await?;

	sqlx::query(
		"\
INSERT INTO clicks (query_id, user_id, document_id, query_text, position, dwell_time, session_id)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(query_id)
	.bind(click.user_id)
	.bind(click.document_id)
	.bind(click.query_text)
	.bind(click.position)
	.bind(click.dwell_time)
	.bind(session_id.as_str())
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(session_id)
}

/// Records one impression per shown document. Re-showing a document for the same query in the
/// same session is a no-op.
pub async fn register_impressions(
	db: &Db,
	impressions: NewImpressions<'_>,
) -> Result<ImpressionBatch> {
	let session_id = session_or_new(impressions.session_id);

	if impressions.document_ids.is_empty() {
		return Ok(ImpressionBatch { session_id, inserted: 0 });
	}

	let mut tx = db.pool.begin().await?;
	let result = sqlx::query(
		"\
INSERT INTO impressions (query_text, document_id, user_id, position, session_id)
SELECT $1, shown.document_id, $2, shown.position::integer, $3
FROM UNNEST($4::text[]) WITH ORDINALITY AS shown(document_id, position)
ON CONFLICT (query_text, document_id, session_id) DO NOTHING",
	)
	.bind(impressions.query_text)
	.bind(impressions.user_id)
	.bind(session_id.as_str())
	.bind(impressions.document_ids)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(ImpressionBatch { session_id, inserted: result.rows_affected() })
}

pub async fn total_stats(db: &Db) -> Result<TotalStats> {
	let (total_impressions, total_clicks): (i64, i64) = sqlx::query_as(
		"SELECT (SELECT COUNT(*) FROM impressions), (SELECT COUNT(*) FROM clicks)",
	)
	.fetch_one(&db.pool)
	.await?;

	Ok(TotalStats {
		total_impressions: non_negative(total_impressions),
		total_clicks: non_negative(total_clicks),
	})
}

async fn upsert_search_query(
	tx: &mut Transaction<'_, Postgres>,
	query_text: &str,
	session_id: &str,
	user_id: Option<i64>,
) -> Result<i64> {
	let query_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO search_queries (user_id, query_text, session_id)
VALUES ($1, $2, $3)
ON CONFLICT (query_text, session_id)
DO UPDATE SET user_id = COALESCE(search_queries.user_id, EXCLUDED.user_id)
RETURNING query_id",
	)
	.bind(user_id)
	.bind(query_text)
	.bind(session_id)
	.fetch_one(&mut **tx)
	.await?;

	Ok(query_id)
}

fn session_or_new(session_id: Option<&str>) -> String {
	match session_id.map(str::trim) {
		Some(session_id) if !session_id.is_empty() => session_id.to_string(),
		_ => Uuid::new_v4().to_string(),
	}
}

fn collect_counts(rows: Vec<(String, i64, i64)>) -> HashMap<String, CtrCount> {
	rows.into_iter()
		.map(|(document_id, clicks, impressions)| {
			(document_id, CtrCount::new(non_negative(clicks), non_negative(impressions)))
		})
		.collect()
}

fn non_negative(value: i64) -> u64 {
	u64::try_from(value).unwrap_or(0)
}
