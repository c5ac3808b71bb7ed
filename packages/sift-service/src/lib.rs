pub mod interactions;
pub mod search;
pub mod settings;
pub mod time_serde;
pub mod users;

mod error;

pub use error::{Error, Result};
pub use interactions::{
	ClickRequest, ClickResponse, ImpressionsRequest, ImpressionsResponse, TotalStatsResponse,
};
pub use search::{SearchRequest, SearchResponse};
pub use settings::{PresetEntry, PresetList, SettingsStore, WeightsResponse};
pub use users::{ListUsersRequest, UserRecord, UserStatsResponse};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use sift_config::Config;
use sift_domain::CtrCount;
use sift_index::{FilterOptions, IndexClient, SearchField, SearchFilters, SearchHits};
use sift_storage::{
	ctr,
	db::Db,
	models::{ImpressionBatch, NewClick, NewImpressions, TotalStats},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The full-text index that supplies candidates.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a str,
		filters: &'a SearchFilters,
		field: SearchField,
		size: u32,
	) -> BoxFuture<'a, Result<SearchHits>>;

	fn filter_options<'a>(&'a self) -> BoxFuture<'a, Result<FilterOptions>>;
}

pub trait ProfileStore
where
	Self: Send + Sync,
{
	fn fetch_user<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<Option<UserRecord>>>;

	fn list_users<'a>(
		&'a self,
		role: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<UserRecord>>>;

	fn user_click_count<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<u64>>;
}

/// The click and impression log and its aggregates.
pub trait InteractionStore
where
	Self: Send + Sync,
{
	fn ctr_for_query<'a>(
		&'a self,
		query: &'a str,
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>>;

	fn aggregated_ctr<'a>(
		&'a self,
		document_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>>;

	fn register_click<'a>(&'a self, click: NewClick<'a>) -> BoxFuture<'a, Result<String>>;

	fn register_impressions<'a>(
		&'a self,
		impressions: NewImpressions<'a>,
	) -> BoxFuture<'a, Result<ImpressionBatch>>;

	fn total_stats<'a>(&'a self) -> BoxFuture<'a, Result<TotalStats>>;
}

#[derive(Clone)]
pub struct Backends {
	pub index: Arc<dyn SearchIndex>,
	pub profiles: Arc<dyn ProfileStore>,
	pub interactions: Arc<dyn InteractionStore>,
}
impl Backends {
	pub fn new(
		index: Arc<dyn SearchIndex>,
		profiles: Arc<dyn ProfileStore>,
		interactions: Arc<dyn InteractionStore>,
	) -> Self {
		Self { index, profiles, interactions }
	}

	pub fn postgres_and_index(db: Db, index: IndexClient) -> Self {
		let store = Arc::new(PgStore { db });

		Self { index: Arc::new(index), profiles: store.clone(), interactions: store }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub settings: SettingsStore,
	pub backends: Backends,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db, index: IndexClient) -> Result<Self> {
		Self::with_backends(cfg, Backends::postgres_and_index(db, index))
	}

	/// Installs the configured startup preset.
	pub fn with_backends(cfg: Config, backends: Backends) -> Result<Self> {
		let settings = SettingsStore::with_preset(cfg.ranking.preset.parse()?);

		Ok(Self { cfg, settings, backends })
	}

	fn index_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.index.timeout_ms)
	}

	fn store_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.storage.postgres.statement_timeout_ms)
	}
}

struct PgStore {
	db: Db,
}
impl ProfileStore for PgStore {
	fn fetch_user<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<Option<UserRecord>>> {
		Box::pin(async move {
			let row = sift_storage::users::fetch_user(&self.db, user_id).await?;

			Ok(row.map(UserRecord::from))
		})
	}

	fn list_users<'a>(
		&'a self,
		role: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<UserRecord>>> {
		Box::pin(async move {
			let rows = sift_storage::users::list_users(&self.db, role, limit).await?;

			Ok(rows.into_iter().map(UserRecord::from).collect())
		})
	}

	fn user_click_count<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(sift_storage::users::user_click_count(&self.db, user_id).await?) })
	}
}

impl InteractionStore for PgStore {
	fn ctr_for_query<'a>(
		&'a self,
		query: &'a str,
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>> {
		Box::pin(async move { Ok(ctr::ctr_for_query(&self.db, query).await?) })
	}

	fn aggregated_ctr<'a>(
		&'a self,
		document_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>> {
		Box::pin(async move { Ok(ctr::aggregated_ctr(&self.db, document_ids).await?) })
	}

	fn register_click<'a>(&'a self, click: NewClick<'a>) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(ctr::register_click(&self.db, click).await?) })
	}

	fn register_impressions<'a>(
		&'a self,
		impressions: NewImpressions<'a>,
	) -> BoxFuture<'a, Result<ImpressionBatch>> {
		Box::pin(async move { Ok(ctr::register_impressions(&self.db, impressions).await?) })
	}

	fn total_stats<'a>(&'a self) -> BoxFuture<'a, Result<TotalStats>> {
		Box::pin(async move { Ok(ctr::total_stats(&self.db).await?) })
	}
}

impl SearchIndex for IndexClient {
	fn search<'a>(
		&'a self,
		query: &'a str,
		filters: &'a SearchFilters,
		field: SearchField,
		size: u32,
	) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move { Ok(IndexClient::search(self, query, filters, field, size).await?) })
	}

	fn filter_options<'a>(&'a self) -> BoxFuture<'a, Result<FilterOptions>> {
		Box::pin(async move { Ok(IndexClient::filter_options(self).await?) })
	}
}

/// Bounds `fut` by `limit`. Elapsing drops the future and cancels its I/O.
pub(crate) async fn bounded<T>(
	limit: Duration,
	what: &str,
	fut: impl Future<Output = Result<T>>,
) -> Result<T> {
	tokio::time::timeout(limit, fut).await.map_err(|_| Error::UpstreamUnavailable {
		message: format!("{what} timed out after {} ms.", limit.as_millis()),
	})?
}
