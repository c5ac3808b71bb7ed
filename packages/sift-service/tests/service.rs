use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use time::OffsetDateTime;

use sift_config::{Config, Index, Postgres, Ranking, Search, Security, Service, Storage};
use sift_domain::{CandidateHit, CtrCount, Document, Preset, RankingWeights};
use sift_index::{FilterOptions, SearchField, SearchFilters, SearchHits};
use sift_service::{
	Backends, BoxFuture, ClickRequest, Error, ImpressionsRequest, InteractionStore,
	ProfileStore, Result, SearchIndex, SearchRequest, SettingsStore, SiftService, UserRecord,
};
use sift_storage::models::{ImpressionBatch, NewClick, NewImpressions, TotalStats};

#[derive(Default)]
struct FakeIndex {
	hits: Vec<CandidateHit>,
	fail: bool,
	delay: Option<Duration>,
	calls: AtomicUsize,
	last_size: Mutex<Option<u32>>,
}
impl SearchIndex for FakeIndex {
	fn search<'a>(
		&'a self,
		_query: &'a str,
		_filters: &'a SearchFilters,
		_field: SearchField,
		size: u32,
	) -> BoxFuture<'a, Result<SearchHits>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_size.lock().unwrap_or_else(|err| err.into_inner()) = Some(size);

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}
			if self.fail {
				return Err(Error::UpstreamUnavailable { message: "index down".to_string() });
			}

			Ok(SearchHits {
				total: self.hits.len() as u64,
				hits: self.hits.iter().take(size as usize).cloned().collect(),
			})
		})
	}

	fn filter_options<'a>(&'a self) -> BoxFuture<'a, Result<FilterOptions>> {
		Box::pin(async move { Ok(FilterOptions::default()) })
	}
}

#[derive(Default)]
struct FakeProfiles {
	users: HashMap<i64, UserRecord>,
	fail: bool,
}
impl ProfileStore for FakeProfiles {
	fn fetch_user<'a>(&'a self, user_id: i64) -> BoxFuture<'a, Result<Option<UserRecord>>> {
		Box::pin(async move {
			if self.fail {
				return Err(Error::Storage { message: "profiles down".to_string() });
			}

			Ok(self.users.get(&user_id).cloned())
		})
	}

	fn list_users<'a>(
		&'a self,
		role: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<UserRecord>>> {
		Box::pin(async move {
			let mut users = self
				.users
				.values()
				.filter(|user| role.is_none_or(|role| user.role == role))
				.cloned()
				.collect::<Vec<_>>();

			users.sort_by_key(|user| user.user_id);
			users.truncate(limit as usize);

			Ok(users)
		})
	}

	fn user_click_count<'a>(&'a self, _user_id: i64) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(3) })
	}
}

#[derive(Default)]
struct FakeInteractions {
	query_ctr: HashMap<String, CtrCount>,
	aggregated: HashMap<String, CtrCount>,
	fail_reads: bool,
	fail_writes: bool,
	fail_totals: bool,
	impressions: Mutex<HashSet<(String, String, String)>>,
	clicks: AtomicUsize,
}
impl InteractionStore for FakeInteractions {
	fn ctr_for_query<'a>(
		&'a self,
		_query: &'a str,
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>> {
		Box::pin(async move {
			if self.fail_reads {
				return Err(Error::Storage { message: "ctr view down".to_string() });
			}

			Ok(self.query_ctr.clone())
		})
	}

	fn aggregated_ctr<'a>(
		&'a self,
		document_ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, CtrCount>>> {
		Box::pin(async move {
			if self.fail_reads {
				return Err(Error::Storage { message: "ctr view down".to_string() });
			}

			Ok(document_ids
				.iter()
				.filter_map(|id| self.aggregated.get(id).map(|count| (id.clone(), *count)))
				.collect())
		})
	}

	fn register_click<'a>(&'a self, click: NewClick<'a>) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			if self.fail_writes {
				return Err(Error::Storage { message: "insert failed".to_string() });
			}

			self.clicks.fetch_add(1, Ordering::SeqCst);

			Ok(click.session_id.unwrap_or("generated-session").to_string())
		})
	}

	fn register_impressions<'a>(
		&'a self,
		impressions: NewImpressions<'a>,
	) -> BoxFuture<'a, Result<ImpressionBatch>> {
		Box::pin(async move {
			if self.fail_writes {
				return Err(Error::Storage { message: "insert failed".to_string() });
			}

			let session_id = impressions.session_id.unwrap_or("generated-session").to_string();
			let mut seen = self.impressions.lock().unwrap_or_else(|err| err.into_inner());
			let inserted = impressions
				.document_ids
				.iter()
				.filter(|doc| {
					seen.insert((
						impressions.query_text.to_string(),
						doc.to_string(),
						session_id.clone(),
					))
				})
				.count() as u64;

			Ok(ImpressionBatch { session_id, inserted })
		})
	}

	fn total_stats<'a>(&'a self) -> BoxFuture<'a, Result<TotalStats>> {
		Box::pin(async move {
			if self.fail_totals {
				return Err(Error::Storage { message: "count query failed".to_string() });
			}

			let total_impressions =
				self.impressions.lock().unwrap_or_else(|err| err.into_inner()).len() as u64;

			Ok(TotalStats {
				total_impressions,
				total_clicks: self.clicks.load(Ordering::SeqCst) as u64,
			})
		})
	}
}

fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres {
				dsn: "postgres://unused@127.0.0.1/unused".to_string(),
				pool_max_conns: 1,
				statement_timeout_ms: 1_000,
			},
		},
		index: Index {
			url: "http://127.0.0.1:9200".to_string(),
			index: "library_documents".to_string(),
			timeout_ms: 200,
			username: None,
			password: None,
		},
		search: Search { default_per_page: 10, max_per_page: 50, max_fetch_size: 200 },
		ranking: Ranking { preset: "default".to_string() },
		security: Security { bind_localhost_only: true },
	}
}

fn hit(document_id: &str, score: f64, subjects: &[&str]) -> CandidateHit {
	CandidateHit {
		score,
		document: Document {
			document_id: document_id.to_string(),
			title: format!("Документ {document_id}"),
			subjects: subjects.iter().map(|subject| subject.to_string()).collect(),
			..Document::default()
		},
		highlights: Default::default(),
	}
}

fn student(user_id: i64, specialization: &str) -> UserRecord {
	UserRecord {
		user_id,
		username: format!("student_{user_id}"),
		email: format!("student_{user_id}@example.org"),
		role: "student".to_string(),
		specialization: Some(specialization.to_string()),
		faculty: None,
		course: Some(1),
		interests: Vec::new(),
		created_at: OffsetDateTime::UNIX_EPOCH,
		updated_at: OffsetDateTime::UNIX_EPOCH,
	}
}

struct Harness {
	service: SiftService,
	index: Arc<FakeIndex>,
	interactions: Arc<FakeInteractions>,
}

fn harness(index: FakeIndex, profiles: FakeProfiles, interactions: FakeInteractions) -> Harness {
	let index = Arc::new(index);
	let interactions = Arc::new(interactions);
	let backends = Backends::new(index.clone(), Arc::new(profiles), interactions.clone());
	let service =
		SiftService::with_backends(test_config(), backends).expect("Failed to build service.");

	Harness { service, index, interactions }
}

fn profiles_with(user: UserRecord) -> FakeProfiles {
	FakeProfiles { users: HashMap::from([(user.user_id, user)]), fail: false }
}

#[tokio::test]
async fn specialization_match_outranks_equal_lexical_score() {
	let index = FakeIndex {
		hits: vec![hit("other", 10.0, &["История Сибири"]), hit("match", 10.0, &["Математика"])],
		..FakeIndex::default()
	};
	let h = harness(index, profiles_with(student(1, "Математика")), FakeInteractions::default());
	let response = h
		.service
		.search(SearchRequest { user_id: Some(1), ..SearchRequest::new("учебник") })
		.await
		.expect("Search failed.");

	assert!(response.personalized);
	assert_eq!(response.user_profile.as_ref().map(|p| p.user_id), Some(1));
	assert_eq!(response.results[0].document.document_id, "match");
	assert_eq!(response.results[0].position, 1);
	assert!(response.results[0].final_score > response.results[1].final_score);
}

#[tokio::test]
async fn unknown_user_degrades_to_unpersonalized() {
	let index = FakeIndex { hits: vec![hit("a", 3.0, &["Математика"])], ..FakeIndex::default() };
	let h = harness(index, FakeProfiles::default(), FakeInteractions::default());
	let response = h
		.service
		.search(SearchRequest { user_id: Some(404), ..SearchRequest::new("алгебра") })
		.await
		.expect("Unknown user must not fail the search.");

	assert!(!response.personalized);
	assert!(response.user_profile.is_none());
	assert_eq!(response.results[0].f_user, 0.0);
}

#[tokio::test]
async fn failing_profile_store_degrades_to_unpersonalized() {
	let index = FakeIndex { hits: vec![hit("a", 3.0, &["Математика"])], ..FakeIndex::default() };
	let profiles = FakeProfiles { fail: true, ..profiles_with(student(1, "Математика")) };
	let h = harness(index, profiles, FakeInteractions::default());
	let response = h
		.service
		.search(SearchRequest { user_id: Some(1), ..SearchRequest::new("алгебра") })
		.await
		.expect("Profile failure must not fail the search.");

	assert!(!response.personalized);
	assert_eq!(response.results[0].f_topic, 0.0);
}

#[tokio::test]
async fn disabled_personalization_skips_profile() {
	let index = FakeIndex { hits: vec![hit("a", 3.0, &["Математика"])], ..FakeIndex::default() };
	let h = harness(index, profiles_with(student(1, "Математика")), FakeInteractions::default());
	let response = h
		.service
		.search(SearchRequest {
			user_id: Some(1),
			enable_personalization: false,
			..SearchRequest::new("алгебра")
		})
		.await
		.expect("Search failed.");

	assert!(!response.personalized);
	assert!(response.user_profile.is_none());
	assert_eq!(response.results[0].user_contrib, 0.0);
}

#[tokio::test]
async fn failing_ctr_reads_rank_without_ctr() {
	let index = FakeIndex { hits: vec![hit("a", 3.0, &[])], ..FakeIndex::default() };
	let interactions = FakeInteractions {
		query_ctr: HashMap::from([("a".to_string(), CtrCount::new(5, 10))]),
		fail_reads: true,
		..FakeInteractions::default()
	};
	let h = harness(index, FakeProfiles::default(), interactions);
	let response =
		h.service.search(SearchRequest::new("алгебра")).await.expect("Search failed.");
	let result = &response.results[0];

	assert_eq!(result.smoothed_ctr, 0.0);
	assert_eq!(result.ctr_contrib, 0.0);
	assert_eq!(result.display_ctr, None);
}

#[tokio::test]
async fn index_failure_is_upstream_unavailable() {
	let h = harness(
		FakeIndex { fail: true, ..FakeIndex::default() },
		FakeProfiles::default(),
		FakeInteractions::default(),
	);
	let err = h.service.search(SearchRequest::new("q")).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::UpstreamUnavailable { .. }), "{err:?}");
}

#[tokio::test]
async fn slow_index_times_out() {
	let index = FakeIndex { delay: Some(Duration::from_secs(5)), ..FakeIndex::default() };
	let h = harness(index, FakeProfiles::default(), FakeInteractions::default());
	let err = h.service.search(SearchRequest::new("q")).await.expect_err("Expected timeout.");

	assert!(matches!(err, Error::UpstreamUnavailable { ref message } if message.contains("timed out")));
}

#[tokio::test]
async fn pages_slice_the_ranked_list() {
	let hits = (0..25).map(|i| hit(&format!("d{i:02}"), 30.0 - i as f64, &[])).collect();
	let h = harness(
		FakeIndex { hits, ..FakeIndex::default() },
		FakeProfiles::default(),
		FakeInteractions::default(),
	);
	let response = h
		.service
		.search(SearchRequest { page: 3, ..SearchRequest::new("q") })
		.await
		.expect("Search failed.");

	assert_eq!(*h.index.last_size.lock().unwrap_or_else(|err| err.into_inner()), Some(30));
	assert_eq!(response.total, 25);
	assert_eq!(response.total_pages, 3);
	assert_eq!(response.per_page, 10);
	assert_eq!(response.results.len(), 5);
	assert_eq!(response.results[0].position, 21);
	assert_eq!(response.results[0].document.document_id, "d20");
}

#[tokio::test]
async fn oversized_window_is_rejected_before_the_index() {
	let h = harness(FakeIndex::default(), FakeProfiles::default(), FakeInteractions::default());

	for req in [
		SearchRequest { page: 5, per_page: Some(50), ..SearchRequest::new("q") },
		SearchRequest { page: 0, ..SearchRequest::new("q") },
		SearchRequest { per_page: Some(51), ..SearchRequest::new("q") },
		SearchRequest::new("   "),
	] {
		let err = h.service.search(req).await.expect_err("Expected rejection.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
	}

	assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn page_gets_all_query_display_counts() {
	let index = FakeIndex { hits: vec![hit("a", 3.0, &[]), hit("b", 2.0, &[])], ..FakeIndex::default() };
	let interactions = FakeInteractions {
		query_ctr: HashMap::from([("a".to_string(), CtrCount::new(1, 2))]),
		aggregated: HashMap::from([("a".to_string(), CtrCount::new(4, 16))]),
		..FakeInteractions::default()
	};
	let h = harness(index, FakeProfiles::default(), interactions);
	let response = h.service.search(SearchRequest::new("q")).await.expect("Search failed.");
	let a = response.results.iter().find(|r| r.document.document_id == "a").expect("a");
	let b = response.results.iter().find(|r| r.document.document_id == "b").expect("b");

	assert_eq!((a.clicks, a.impressions, a.display_ctr), (4, 16, Some(0.25)));
	assert!(a.smoothed_ctr > 0.0);
	assert_eq!((b.clicks, b.impressions, b.display_ctr), (0, 0, None));
}

#[tokio::test]
async fn repeated_impressions_are_idempotent() {
	let h = harness(FakeIndex::default(), FakeProfiles::default(), FakeInteractions::default());
	let request = || ImpressionsRequest {
		query: "алгебра".to_string(),
		user_id: None,
		document_ids: vec!["a".to_string(), "b".to_string()],
		session_id: Some("s-1".to_string()),
	};
	let first = h.service.register_impressions(request()).await.expect("First batch failed.");
	let second = h.service.register_impressions(request()).await.expect("Second batch failed.");

	assert_eq!(first.recorded, 2);
	assert_eq!(second.recorded, 0);
	assert_eq!(second.total_impressions, Some(2));
	assert_eq!(second.session_id, "s-1");
}

#[tokio::test]
async fn stored_impressions_survive_a_failed_totals_lookup() {
	let interactions = FakeInteractions { fail_totals: true, ..FakeInteractions::default() };
	let h = harness(FakeIndex::default(), FakeProfiles::default(), interactions);
	let request = ImpressionsRequest {
		query: "алгебра".to_string(),
		user_id: None,
		document_ids: vec!["a".to_string(), "b".to_string()],
		session_id: None,
	};
	let response = h
		.service
		.register_impressions(request.clone())
		.await
		.expect("Stored batch must be acknowledged.");

	assert_eq!(response.recorded, 2);
	assert_eq!(response.session_id, "generated-session");
	assert_eq!(response.total_impressions, None);

	let retry = ImpressionsRequest { session_id: Some(response.session_id), ..request };
	let response = h.service.register_impressions(retry).await.expect("Retry failed.");

	assert_eq!(response.recorded, 0);
	assert_eq!(h.interactions.impressions.lock().unwrap_or_else(|err| err.into_inner()).len(), 2);
}

#[tokio::test]
async fn failed_click_write_is_a_registration_error() {
	let interactions = FakeInteractions { fail_writes: true, ..FakeInteractions::default() };
	let h = harness(FakeIndex::default(), FakeProfiles::default(), interactions);
	let click = ClickRequest {
		query: "алгебра".to_string(),
		document_id: "a".to_string(),
		user_id: Some(1),
		position: 1,
		session_id: None,
		dwell_time: Some(30),
	};
	let err = h.service.register_click(click.clone()).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Registration { .. }), "{err:?}");

	let err = h
		.service
		.register_click(ClickRequest { position: 0, ..click })
		.await
		.expect_err("Expected validation failure.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
	assert_eq!(h.interactions.clicks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clicks_report_their_session() {
	let h = harness(FakeIndex::default(), FakeProfiles::default(), FakeInteractions::default());
	let response = h
		.service
		.register_click(ClickRequest {
			query: "q".to_string(),
			document_id: "a".to_string(),
			user_id: None,
			position: 2,
			session_id: Some("s-9".to_string()),
			dwell_time: None,
		})
		.await
		.expect("Click failed.");

	assert_eq!(response.session_id, "s-9");
	assert_eq!(h.service.total_stats().await.expect("Stats failed.").total_clicks, 1);
}

#[tokio::test]
async fn user_lookups() {
	let h = harness(
		FakeIndex::default(),
		profiles_with(student(7, "Физика")),
		FakeInteractions::default(),
	);
	let stats = h.service.user_stats(7).await.expect("Stats failed.");

	assert_eq!(stats.total_clicks, 3);
	assert_eq!(stats.specialization.as_deref(), Some("Физика"));

	let err = h.service.get_user(8).await.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound { .. }), "{err:?}");
}

#[test]
fn out_of_range_weights_keep_prior_value() {
	let store = SettingsStore::default();
	let before = store.weights();
	let err = store
		.set_weights(RankingWeights { w_user: 10.0, ..before })
		.expect_err("Expected rejection.");

	assert!(matches!(err, Error::Validation { .. }), "{err:?}");
	assert_eq!(store.weights(), before);
}

#[test]
fn concurrent_readers_never_see_torn_weights() {
	let store = Arc::new(SettingsStore::default());
	let allowed = Preset::ALL.map(Preset::weights);
	let writers = (0..2)
		.map(|i| {
			let store = store.clone();

			thread::spawn(move || {
				for round in 0..500 {
					let preset = Preset::ALL[(round + i) % Preset::ALL.len()];

					store.apply_preset(preset.as_str()).expect("Preset must apply.");
				}
			})
		})
		.collect::<Vec<_>>();
	let readers = (0..4)
		.map(|_| {
			let store = store.clone();

			thread::spawn(move || {
				for _ in 0..2_000 {
					let weights = store.weights();

					assert!(allowed.contains(&weights), "Torn weights observed: {weights:?}");
				}
			})
		})
		.collect::<Vec<_>>();

	for handle in writers.into_iter().chain(readers) {
		handle.join().expect("Thread panicked.");
	}

	store.reset();

	assert_eq!(store.weights(), RankingWeights::default());
}
