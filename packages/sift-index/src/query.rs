use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const SEARCH_FIELDS: [&str; 7] = [
	"title^3",
	"authors^2",
	"subjects^2",
	"collection^1.5",
	"knowledge_area^1.5",
	"organization",
	"publication_info",
];
const HIGHLIGHT_FIELDS: [&str; 4] = ["title", "authors", "subjects", "collection"];

/// Which field group the free-text query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
	#[default]
	All,
	Title,
	Authors,
	Subjects,
	Collection,
}
impl SearchField {
	fn boosted_fields(self) -> &'static [&'static str] {
		match self {
			Self::All => &SEARCH_FIELDS,
			Self::Title => &["title^3"],
			Self::Authors => &["authors^2"],
			Self::Subjects => &["subjects^2"],
			Self::Collection => &["collection^1.5"],
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentTypeFilter {
	One(String),
	Many(Vec<String>),
}

/// Structured filters applied as non-scoring clauses. Blank values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
	#[serde(default)]
	pub collection: Option<String>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub document_type: Option<DocumentTypeFilter>,
	#[serde(default)]
	pub knowledge_area: Option<String>,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub has_pdf: Option<bool>,
}

pub fn build_search_body(
	query: &str,
	filters: &SearchFilters,
	field: SearchField,
	size: u32,
) -> Value {
	let highlight_fields =
		HIGHLIGHT_FIELDS.iter().map(|field| (field.to_string(), json!({}))).collect::<Map<_, _>>();

	json!({
		"size": size,
		"track_total_hits": true,
		"query": {
			"bool": {
				"must": [{
					"multi_match": {
						"query": query,
						"fields": field.boosted_fields(),
						"fuzziness": "AUTO",
						"type": "best_fields",
						"operator": "or",
						"minimum_should_match": "50%",
					}
				}],
				"filter": filter_clauses(filters),
			}
		},
		"highlight": {
			"fields": highlight_fields,
			"pre_tags": ["<mark>"],
			"post_tags": ["</mark>"],
		},
	})
}

pub fn build_aggregations_body() -> Value {
	json!({
		"size": 0,
		"track_total_hits": true,
		"aggs": {
			"collections": { "terms": { "field": "collection.keyword", "size": 50 } },
			"knowledge_areas": { "terms": { "field": "knowledge_area.keyword", "size": 50 } },
			"document_types": { "terms": { "field": "document_type", "size": 30 } },
			"languages": { "terms": { "field": "language", "size": 20 } },
			"sources": { "terms": { "field": "source", "size": 10 } },
			"has_pdf": { "filter": { "exists": { "field": "pdf_url" } } },
		},
	})
}

fn filter_clauses(filters: &SearchFilters) -> Vec<Value> {
	let mut clauses = Vec::new();

	if let Some(collection) = non_blank(&filters.collection) {
		clauses.push(json!({ "term": { "collection.keyword": collection } }));
	}
	if let Some(language) = non_blank(&filters.language) {
		clauses.push(json!({ "term": { "language": language } }));
	}

	match &filters.document_type {
		Some(DocumentTypeFilter::One(doc_type)) if !doc_type.trim().is_empty() => {
			clauses.push(json!({ "term": { "document_type": doc_type } }));
		},
		Some(DocumentTypeFilter::Many(doc_types)) if !doc_types.is_empty() => {
			clauses.push(json!({ "terms": { "document_type": doc_types } }));
		},
		_ => {},
	}

	if let Some(area) = non_blank(&filters.knowledge_area) {
		clauses.push(json!({ "term": { "knowledge_area.keyword": area } }));
	}
	if let Some(source) = non_blank(&filters.source) {
		clauses.push(json!({ "term": { "source": source } }));
	}

	match filters.has_pdf {
		Some(true) => clauses.push(json!({ "exists": { "field": "pdf_url" } })),
		Some(false) =>
			clauses.push(json!({ "bool": { "must_not": { "exists": { "field": "pdf_url" } } } })),
		None => {},
	}

	clauses
}

fn non_blank(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.trim().is_empty())
}
