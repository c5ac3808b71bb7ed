use crate::{Document, Preferences, UserProfile};

/// Affinity of `role` for `doc_type`; zero for unknown roles or types.
pub fn f_type(doc_type: &str, role: &str, prefs: &Preferences) -> f64 {
	prefs.type_affinity(role, doc_type)
}

/// Best single topic tier matched by the document text. Tiers are not summed.
pub fn f_topic<S>(
	doc_subjects: &[S],
	specialization: &str,
	interests: &[String],
	prefs: &Preferences,
) -> f64
where
	S: AsRef<str>,
{
	let doc_text = doc_subjects
		.iter()
		.map(|subject| subject.as_ref())
		.collect::<Vec<_>>()
		.join(" ")
		.to_lowercase();
	let mentions = |needle: &str| {
		let needle = needle.trim();

		!needle.is_empty() && doc_text.contains(&needle.to_lowercase())
	};

	if mentions(specialization) {
		return prefs.topic_scores.direct;
	}
	if prefs.keywords_for(specialization).iter().any(|keyword| mentions(keyword.as_str())) {
		return prefs.topic_scores.keyword;
	}
	if interests.iter().any(|interest| mentions(interest.as_str())) {
		return prefs.topic_scores.interest;
	}

	0.0
}

pub fn f_type_for_doc(doc: &Document, profile: &UserProfile, prefs: &Preferences) -> f64 {
	if profile.role.trim().is_empty() {
		return 0.0;
	}

	f_type(doc.resolved_type(), &profile.role, prefs)
}

pub fn f_topic_for_doc(doc: &Document, profile: &UserProfile, prefs: &Preferences) -> f64 {
	f_topic(
		&doc.subject_texts(),
		profile.specialization.as_deref().unwrap_or_default(),
		&profile.interests,
		prefs,
	)
}
