//! Scratch Postgres databases for the ignored storage tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

pub const DSN_ENV: &str = "SIFT_PG_DSN";

const MAINTENANCE_DB: &str = "postgres";

/// One empty database per test. Dropped by [`ScratchDb::cleanup`], or on drop as a fallback.
pub struct ScratchDb {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	dropped: bool,
}
impl ScratchDb {
	/// `None` when `SIFT_PG_DSN` is unset, so callers can skip.
	pub async fn from_env() -> Result<Option<Self>> {
		match env_dsn() {
			Some(dsn) => Self::create(&dsn).await.map(Some),
			None => Ok(None),
		}
	}

	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(Error::InvalidDsn)?;
		let maintenance = base.clone().database(MAINTENANCE_DB);
		let name = format!("sift_scratch_{}", Uuid::new_v4().simple());
		let scratch_err = |action, source| Error::Scratch { action, name: name.clone(), source };
		let mut conn = PgConnection::connect_with(&maintenance)
			.await
			.map_err(|err| scratch_err("connect for", err))?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| scratch_err("create", err))?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, dropped: false })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Storage settings pointing at this database.
	pub fn postgres_config(&self, pool_max_conns: u32) -> sift_config::Postgres {
		sift_config::Postgres {
			dsn: self.dsn.clone(),
			pool_max_conns,
			statement_timeout_ms: 5_000,
		}
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.maintenance).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for ScratchDb {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let maintenance = self.maintenance.clone();
		// A runtime may already be driving this thread.
		let handle = thread::spawn(move || {
			let outcome = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| err.to_string())
				.and_then(|runtime| {
					runtime
						.block_on(drop_database(&name, &maintenance))
						.map_err(|err| err.to_string())
				});

			if let Err(err) = outcome {
				eprintln!("Leaked scratch database {name}: {err}.");
			}
		});

		let _ = handle.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let scratch_err =
		|action, source| Error::Scratch { action, name: name.to_string(), source };
	let mut conn = PgConnection::connect_with(maintenance)
		.await
		.map_err(|err| scratch_err("connect for", err))?;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| scratch_err("drop", err))?;

	Ok(())
}
