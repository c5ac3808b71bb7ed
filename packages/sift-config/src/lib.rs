mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Index, Postgres, Ranking, Search, Security, Service, Storage};

use std::{fs, path::Path};

use sift_domain::Preset;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("index.url", &cfg.index.url),
		("index.index", &cfg.index.index),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.statement_timeout_ms must be greater than zero."
				.to_string(),
		});
	}
	if cfg.index.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "index.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.index.username.is_some() != cfg.index.password.is_some() {
		return Err(Error::Validation {
			message: "index.username and index.password must be set together.".to_string(),
		});
	}
	if cfg.search.max_per_page == 0 {
		return Err(Error::Validation {
			message: "search.max_per_page must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_per_page == 0 {
		return Err(Error::Validation {
			message: "search.default_per_page must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_per_page > cfg.search.max_per_page {
		return Err(Error::Validation {
			message: "search.default_per_page must be at most search.max_per_page.".to_string(),
		});
	}
	if cfg.search.max_fetch_size < cfg.search.max_per_page {
		return Err(Error::Validation {
			message: "search.max_fetch_size must be at least search.max_per_page.".to_string(),
		});
	}
	if cfg.ranking.preset.parse::<Preset>().is_err() {
		let names = Preset::ALL.map(Preset::as_str).join(", ");

		return Err(Error::Validation {
			message: format!("ranking.preset must be one of {names}."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.index.username.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		cfg.index.username = None;
	}
	if cfg.index.password.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		cfg.index.password = None;
	}

	cfg.index.url = cfg.index.url.trim_end_matches('/').to_string();
	cfg.ranking.preset = cfg.ranking.preset.trim().to_ascii_lowercase();
}
