pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("SIFT_PG_DSN is not a valid Postgres DSN: {0}")]
	InvalidDsn(sqlx::Error),
	#[error("Failed to {action} scratch database {name}: {source}")]
	Scratch {
		action: &'static str,
		name: String,
		#[source]
		source: sqlx::Error,
	},
}
