pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Validation { message: String },
	#[error("Unknown preset: {name}. Available: default, high_personalization, high_ctr, bm25_only.")]
	UnknownPreset { name: String },
}
