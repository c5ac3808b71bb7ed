use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub index: Index,
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	#[serde(default = "default_statement_timeout_ms")]
	pub statement_timeout_ms: u64,
}

/// The external full-text index. Only the `_search` endpoint of an OpenSearch-compatible
/// cluster is used.
#[derive(Debug, Deserialize)]
pub struct Index {
	pub url: String,
	pub index: String,
	pub timeout_ms: u64,
	pub username: Option<String>,
	pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub default_per_page: u32,
	pub max_per_page: u32,
	/// Upper bound on `page * per_page`, the number of candidates requested from the index.
	pub max_fetch_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	/// Weight preset installed at startup.
	pub preset: String,
}
impl Default for Ranking {
	fn default() -> Self {
		Self { preset: "default".to_string() }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_statement_timeout_ms() -> u64 {
	5_000
}
