use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type RoleTypeMatrix = BTreeMap<String, BTreeMap<String, f64>>;
pub type SpecializationTopics = BTreeMap<String, Vec<String>>;

pub const OTHER_DOCUMENT_TYPE: &str = "other";

/// Collection keyword roots mapped to document types. Order matters: the first root found in the
/// lowercased collection name decides the type.
pub const COLLECTION_TYPE_RULES: [(&str, &str); 11] = [
	("учебник", "textbook"),
	("учебн", "textbook"),
	("пособи", "textbook"),
	("практик", "tutorial"),
	("методич", "tutorial"),
	("монограф", "monograph"),
	("научн", "monograph"),
	("диссертац", "dissertation"),
	("авторефер", "dissertation"),
	("статьи", "article"),
	("журнал", "article"),
];

const DEFAULT_ROLE_TYPES: [(&str, [(&str, f64); 5]); 4] = [
	(
		"student",
		[
			("textbook", 0.50),
			("tutorial", 0.25),
			("monograph", 0.10),
			("dissertation", 0.05),
			("article", 0.10),
		],
	),
	(
		"master",
		[
			("textbook", 0.30),
			("tutorial", 0.20),
			("monograph", 0.20),
			("dissertation", 0.15),
			("article", 0.15),
		],
	),
	(
		"phd",
		[
			("textbook", 0.10),
			("tutorial", 0.05),
			("monograph", 0.25),
			("dissertation", 0.35),
			("article", 0.25),
		],
	),
	(
		"professor",
		[
			("textbook", 0.10),
			("tutorial", 0.05),
			("monograph", 0.30),
			("dissertation", 0.25),
			("article", 0.30),
		],
	),
];

const DEFAULT_SPECIALIZATION_TOPICS: [(&str, &[&str]); 12] = [
	(
		"Математика",
		&[
			"математик",
			"алгебр",
			"анализ",
			"геометр",
			"топологи",
			"дифференциальн",
			"интеграл",
			"теория чисел",
		],
	),
	(
		"Физика",
		&[
			"физик",
			"механик",
			"оптик",
			"квант",
			"термодинам",
			"электродинам",
			"ядерн",
			"теоретическ",
		],
	),
	(
		"Информатика",
		&[
			"информатик",
			"программир",
			"алгоритм",
			"данных",
			"машинн",
			"нейрон",
			"искусственн интеллект",
			"компьютер",
		],
	),
	("Химия", &["хими", "органич", "неорганич", "аналитич", "биохим"]),
	("Биология", &["биолог", "генетик", "экологи", "эволюц", "молекуляр"]),
	("Экономика", &["экономик", "финанс", "менеджмент", "маркетинг", "бухгалтер"]),
	("История", &["истори", "археолог", "древн", "средневеков", "источник"]),
	("Филология", &["филолог", "лингвист", "литератур", "языкозн", "фонетик"]),
	("Право", &["право", "юридич", "законодат", "граждан", "судебн"]),
	("Философия", &["философ", "этик", "логик", "метафизик", "эпистемолог"]),
	("Геология", &["геолог", "минерал", "петрограф", "тектоник", "палеонтолог"]),
	("Востоковедение и африканистика", &["восток", "азия", "африк", "арабск", "китайск", "японск"]),
];

/// Scores of the three topic match tiers, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicScores {
	#[serde(rename = "direct_match")]
	pub direct: f64,
	#[serde(rename = "keyword_match")]
	pub keyword: f64,
	#[serde(rename = "interest_match")]
	pub interest: f64,
}
impl TopicScores {
	pub fn validate(&self) -> Result<()> {
		for (tier, value) in [
			("direct_match", self.direct),
			("keyword_match", self.keyword),
			("interest_match", self.interest),
		] {
			check_unit_interval(&format!("topic_scores.{tier}"), value)?;
		}

		Ok(())
	}
}
impl Default for TopicScores {
	fn default() -> Self {
		Self { direct: 1.0, keyword: 0.8, interest: 0.6 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
	pub role_type_matrix: RoleTypeMatrix,
	pub topic_scores: TopicScores,
	pub specialization_topics: SpecializationTopics,
}
impl Preferences {
	pub fn validate(&self) -> Result<()> {
		validate_role_type_matrix(&self.role_type_matrix)?;
		self.topic_scores.validate()?;
		validate_specialization_topics(&self.specialization_topics)
	}

	pub fn type_affinity(&self, role: &str, doc_type: &str) -> f64 {
		self.role_type_matrix
			.get(role)
			.and_then(|row| row.get(doc_type))
			.copied()
			.unwrap_or(0.0)
	}

	pub fn keywords_for(&self, specialization: &str) -> &[String] {
		self.specialization_topics.get(specialization).map(Vec::as_slice).unwrap_or(&[])
	}
}
impl Default for Preferences {
	fn default() -> Self {
		Self {
			role_type_matrix: default_role_type_matrix(),
			topic_scores: TopicScores::default(),
			specialization_topics: default_specialization_topics(),
		}
	}
}

pub fn default_role_type_matrix() -> RoleTypeMatrix {
	DEFAULT_ROLE_TYPES
		.iter()
		.map(|(role, row)| {
			let row: BTreeMap<String, f64> =
				row.iter().map(|(doc_type, weight)| (doc_type.to_string(), *weight)).collect();

			(role.to_string(), row)
		})
		.collect()
}

pub fn default_specialization_topics() -> SpecializationTopics {
	DEFAULT_SPECIALIZATION_TOPICS
		.iter()
		.map(|(name, keywords)| {
			(name.to_string(), keywords.iter().map(|keyword| keyword.to_string()).collect())
		})
		.collect()
}

pub fn validate_role_type_matrix(matrix: &RoleTypeMatrix) -> Result<()> {
	for (role, row) in matrix {
		if role.trim().is_empty() {
			return Err(Error::Validation {
				message: "role_type_matrix role names must be non-empty.".to_string(),
			});
		}

		for (doc_type, weight) in row {
			if doc_type.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("role_type_matrix.{role} document types must be non-empty."),
				});
			}

			check_unit_interval(&format!("role_type_matrix.{role}.{doc_type}"), *weight)?;
		}
	}

	Ok(())
}

pub fn validate_specialization_topics(topics: &SpecializationTopics) -> Result<()> {
	for (specialization, keywords) in topics {
		if specialization.trim().is_empty() {
			return Err(Error::Validation {
				message: "specialization_topics names must be non-empty.".to_string(),
			});
		}
		if keywords.iter().any(|keyword| keyword.trim().is_empty()) {
			return Err(Error::Validation {
				message: format!(
					"specialization_topics.{specialization} keywords must be non-empty."
				),
			});
		}
	}

	Ok(())
}

/// Infers a document type from its collection or series name.
pub fn infer_document_type(collection: &str) -> &'static str {
	let collection = collection.to_lowercase();

	COLLECTION_TYPE_RULES
		.iter()
		.find(|(root, _)| collection.contains(root))
		.map(|(_, doc_type)| *doc_type)
		.unwrap_or(OTHER_DOCUMENT_TYPE)
}

fn check_unit_interval(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() || !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} value {value} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}
