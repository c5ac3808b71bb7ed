use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::preferences;

/// Projection of an indexed document. Fields the index returns beyond these are dropped when the
/// hit is parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub document_id: String,
	pub title: String,
	#[serde(default)]
	pub authors: Vec<String>,
	pub document_type: Option<String>,
	#[serde(default)]
	pub collection: String,
	#[serde(default)]
	pub knowledge_area: String,
	#[serde(default)]
	pub subjects: Vec<String>,
	#[serde(default)]
	pub organization: String,
	#[serde(default)]
	pub publication_info: String,
	#[serde(default)]
	pub language: String,
	#[serde(default)]
	pub source: String,
	pub year: Option<i32>,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub cover: String,
	#[serde(default)]
	pub has_pdf: bool,
}
impl Document {
	/// The classified type when the index carries one, otherwise the type inferred from the
	/// collection name.
	pub fn resolved_type(&self) -> &str {
		match self.document_type.as_deref().map(str::trim) {
			Some(doc_type) if !doc_type.is_empty() => doc_type,
			_ => preferences::infer_document_type(&self.collection),
		}
	}

	/// Subject-bearing text fields, in the order topic matching reads them.
	pub fn subject_texts(&self) -> [String; 4] {
		[
			self.subjects.join(", "),
			self.knowledge_area.clone(),
			self.collection.clone(),
			self.title.clone(),
		]
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateHit {
	/// Lexical relevance reported by the index.
	pub score: f64,
	pub document: Document,
	#[serde(default)]
	pub highlights: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	pub user_id: i64,
	pub username: String,
	pub role: String,
	pub specialization: Option<String>,
	pub faculty: Option<String>,
	pub course: Option<i32>,
	#[serde(default)]
	pub interests: Vec<String>,
}
