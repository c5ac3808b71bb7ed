use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sift_domain::{CandidateHit, Document};

use crate::{Error, Result};

const UNTITLED: &str = "Без названия";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits {
	/// Total matches in the index, not just the hits returned.
	pub total: u64,
	pub hits: Vec<CandidateHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
	pub name: String,
	pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfCounts {
	pub with_pdf: u64,
	pub without_pdf: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
	pub collections: Vec<FacetBucket>,
	pub knowledge_areas: Vec<FacetBucket>,
	pub document_types: Vec<FacetBucket>,
	pub languages: Vec<FacetBucket>,
	pub sources: Vec<FacetBucket>,
	pub has_pdf: PdfCounts,
}

pub fn parse_search_response(json: &Value) -> Result<SearchHits> {
	let hits = json
		.pointer("/hits/hits")
		.and_then(Value::as_array)
		.ok_or_else(|| invalid("Search response is missing hits.hits array."))?;
	let total = parse_total(json).unwrap_or(hits.len() as u64);
	let hits = hits.iter().map(parse_hit).collect::<Result<Vec<_>>>()?;

	Ok(SearchHits { total, hits })
}

pub fn parse_aggregations_response(json: &Value) -> Result<FilterOptions> {
	let aggs = json
		.get("aggregations")
		.ok_or_else(|| invalid("Aggregation response is missing aggregations."))?;
	let total = parse_total(json).unwrap_or(0);
	let with_pdf = aggs.pointer("/has_pdf/doc_count").and_then(Value::as_u64).unwrap_or(0);

	Ok(FilterOptions {
		collections: buckets(aggs, "collections"),
		knowledge_areas: buckets(aggs, "knowledge_areas"),
		document_types: buckets(aggs, "document_types"),
		languages: buckets(aggs, "languages"),
		sources: buckets(aggs, "sources"),
		has_pdf: PdfCounts { with_pdf, without_pdf: total.saturating_sub(with_pdf) },
	})
}

/// Normalizes catalog links: escapes backslashes, rewrites legacy record links to detail pages,
/// and points e-library `/view` pages at `/info`.
pub fn fix_catalog_url(url: &str) -> String {
	if url.is_empty() {
		return String::new();
	}

	let mut url = url.replace("\\\\", "%5C").replace('\\', "%5C");

	if url.contains("ruslan-neo.nsu.ru/pwb/action/rec?id=") {
		url = url.replace("/pwb/action/rec?id=", "/pwb/detail?db=BOOKS&id=");
	}
	if url.contains("e-lib.nsu.ru") {
		if let Some(stripped) = url.strip_suffix("/view") {
			url = format!("{stripped}/info");
		}
	}

	url
}

fn parse_hit(hit: &Value) -> Result<CandidateHit> {
	let source = hit.get("_source").ok_or_else(|| invalid("Search hit is missing _source."))?;
	let document_id = text(source, &["document_id"])
		.or_else(|| text(hit, &["_id"]))
		.ok_or_else(|| invalid("Search hit is missing document_id."))?;
	let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0);
	let document = Document {
		document_id,
		title: title(source),
		authors: list(source, "authors"),
		document_type: text(source, &["document_type"]),
		collection: text(source, &["collection", "коллекция"]).unwrap_or_default(),
		knowledge_area: text(source, &["knowledge_area"]).unwrap_or_default(),
		subjects: list(source, "subjects"),
		organization: text(source, &["organization", "организация"]).unwrap_or_default(),
		publication_info: text(source, &["publication_info", "выходные_сведения"])
			.unwrap_or_default(),
		language: text(source, &["language", "язык"]).unwrap_or_default(),
		source: text(source, &["source"]).unwrap_or_default(),
		year: year(source),
		url: fix_catalog_url(&text(source, &["read_url", "card_url", "url"]).unwrap_or_default()),
		cover: text(source, &["cover_url", "cover"]).unwrap_or_default(),
		has_pdf: text(source, &["pdf_url"]).is_some(),
	};

	Ok(CandidateHit { score, document, highlights: highlights(hit) })
}

fn parse_total(json: &Value) -> Option<u64> {
	let total = json.pointer("/hits/total")?;

	total.get("value").and_then(Value::as_u64).or_else(|| total.as_u64())
}

/// First non-empty scalar among `keys`.
fn text(object: &Value, keys: &[&str]) -> Option<String> {
	keys.iter().filter_map(|key| object.get(*key)).find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) => Some(n.to_string()),
		Value::Array(items) => items.iter().find_map(scalar_text),
		_ => None,
	}
}

fn list(object: &Value, key: &str) -> Vec<String> {
	match object.get(key) {
		Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
		Some(value) => scalar_text(value).into_iter().collect(),
		None => Vec::new(),
	}
}

fn title(source: &Value) -> String {
	text(source, &["title"]).unwrap_or_else(|| UNTITLED.to_string())
}

fn year(source: &Value) -> Option<i32> {
	match source.get("year")? {
		Value::Number(n) => n.as_i64().and_then(|year| i32::try_from(year).ok()),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn highlights(hit: &Value) -> BTreeMap<String, Vec<String>> {
	let Some(object) = hit.get("highlight").and_then(Value::as_object) else {
		return BTreeMap::new();
	};

	object
		.iter()
		.map(|(field, fragments)| {
			let fragments = fragments
				.as_array()
				.map(|items| items.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
				.unwrap_or_default();

			(field.clone(), fragments)
		})
		.collect()
}

fn buckets(aggs: &Value, name: &str) -> Vec<FacetBucket> {
	aggs.get(name)
		.and_then(|agg| agg.get("buckets"))
		.and_then(Value::as_array)
		.map(|buckets| {
			buckets
				.iter()
				.filter_map(|bucket| {
					Some(FacetBucket {
						name: scalar_text(bucket.get("key")?)?,
						count: bucket.get("doc_count")?.as_u64()?,
					})
				})
				.collect()
		})
		.unwrap_or_default()
}

fn invalid(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_hits_with_fallback_fields() {
		let json = json!({
			"hits": {
				"total": { "value": 123, "relation": "eq" },
				"hits": [{
					"_id": "ignored",
					"_score": 7.25,
					"_source": {
						"document_id": "nsu-1",
						"title": ["Линейная алгебра", "Linear algebra"],
						"authors": "Иванов И. И.",
						"коллекция": "Учебные издания",
						"subjects": ["Математика", "Алгебра"],
						"язык": "rus",
						"year": "2019",
						"card_url": "http://ruslan-neo.nsu.ru/pwb/action/rec?id=42",
						"pdf_url": "http://e-lib.nsu.ru/a.pdf",
						"unexpected": { "nested": true }
					},
					"highlight": { "title": ["<mark>Линейная</mark> алгебра"] }
				}]
			}
		});
		let parsed = parse_search_response(&json).expect("Failed to parse response.");
		let hit = &parsed.hits[0];

		assert_eq!(parsed.total, 123);
		assert_eq!(hit.score, 7.25);
		assert_eq!(hit.document.document_id, "nsu-1");
		assert_eq!(hit.document.title, "Линейная алгебра");
		assert_eq!(hit.document.authors, ["Иванов И. И."]);
		assert_eq!(hit.document.collection, "Учебные издания");
		assert_eq!(hit.document.language, "rus");
		assert_eq!(hit.document.year, Some(2019));
		assert_eq!(hit.document.url, "http://ruslan-neo.nsu.ru/pwb/detail?db=BOOKS&id=42");
		assert!(hit.document.has_pdf);
		assert_eq!(hit.document.document_type, None);
		assert_eq!(hit.highlights["title"], ["<mark>Линейная</mark> алгебра"]);
	}

	#[test]
	fn missing_title_gets_placeholder() {
		let json = json!({
			"hits": { "total": 1, "hits": [{ "_score": null, "_source": { "document_id": 9 } }] }
		});
		let parsed = parse_search_response(&json).expect("Failed to parse response.");

		assert_eq!(parsed.total, 1);
		assert_eq!(parsed.hits[0].score, 0.0);
		assert_eq!(parsed.hits[0].document.document_id, "9");
		assert_eq!(parsed.hits[0].document.title, UNTITLED);
		assert!(!parsed.hits[0].document.has_pdf);
	}

	#[test]
	fn rejects_response_without_hits() {
		let err = parse_search_response(&json!({ "error": "boom" })).expect_err("Expected error.");

		assert!(err.to_string().contains("hits.hits"), "{err}");
	}

	#[test]
	fn catalog_urls_are_normalized() {
		assert_eq!(fix_catalog_url(""), "");
		assert_eq!(fix_catalog_url(r"http://x/a\\b\c"), "http://x/a%5Cb%5Cc");
		assert_eq!(
			fix_catalog_url("http://e-lib.nsu.ru/dsweb/Get/7/view"),
			"http://e-lib.nsu.ru/dsweb/Get/7/info"
		);
		assert_eq!(fix_catalog_url("http://other.org/view"), "http://other.org/view");
	}

	#[test]
	fn parses_facet_buckets() {
		let json = json!({
			"hits": { "total": { "value": 10 } },
			"aggregations": {
				"collections": { "buckets": [{ "key": "Статьи", "doc_count": 6 }] },
				"document_types": { "buckets": [] },
				"languages": { "buckets": [{ "key": "rus", "doc_count": 9 }, { "key": "eng" }] },
				"has_pdf": { "doc_count": 4 }
			}
		});
		let options = parse_aggregations_response(&json).expect("Failed to parse aggregations.");

		assert_eq!(options.collections, [FacetBucket { name: "Статьи".to_string(), count: 6 }]);
		assert!(options.knowledge_areas.is_empty());
		assert_eq!(options.languages.len(), 1);
		assert_eq!(options.has_pdf, PdfCounts { with_pdf: 4, without_pdf: 6 });
	}
}
