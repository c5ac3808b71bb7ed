pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("{message}")]
	Validation { message: String },
	#[error("Unknown preset '{name}'.")]
	UnknownPreset { name: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Upstream unavailable: {message}")]
	UpstreamUnavailable { message: String },
	#[error("Failed to record interaction: {message}")]
	Registration { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sift_domain::Error> for Error {
	fn from(err: sift_domain::Error) -> Self {
		match err {
			sift_domain::Error::Validation { message } => Self::Validation { message },
			sift_domain::Error::UnknownPreset { name } => Self::UnknownPreset { name },
		}
	}
}

impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

impl From<sift_index::Error> for Error {
	fn from(err: sift_index::Error) -> Self {
		Self::UpstreamUnavailable { message: err.to_string() }
	}
}
