//! Clinical term extraction and query expansion.
//!
//! A fixed reference vocabulary maps canonical cardiology concepts to their
//! common synonyms and abbreviations. Extraction finds vocabulary entries
//! in free text as case-insensitive whole-word matches; expansion appends
//! the matched concepts' synonyms to a query to improve recall for short
//! telegraphic questions.

use regex::Regex;
use serde::Serialize;

/// One recognized term: the surface form found in the text and the
/// canonical concept it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMatch {
    pub term: String,
    pub concept: String,
}

struct Concept {
    canonical: &'static str,
    synonyms: &'static [&'static str],
}

/// Reference vocabulary. Order matters: extraction results follow this
/// insertion order, not alphabetical order.
const VOCABULARY: &[Concept] = &[
    Concept {
        canonical: "hypertension",
        synonyms: &[
            "high blood pressure",
            "elevated blood pressure",
            "arterial hypertension",
            "blood pressure",
        ],
    },
    Concept {
        canonical: "myocardial infarction",
        synonyms: &["heart attack", "MI", "acute MI"],
    },
    Concept {
        canonical: "atrial fibrillation",
        synonyms: &["AF", "AFib", "irregular heartbeat"],
    },
    Concept {
        canonical: "heart failure",
        synonyms: &["HF", "cardiac failure", "congestive heart failure", "CHF"],
    },
    Concept {
        canonical: "coronary artery disease",
        synonyms: &["CAD", "coronary heart disease", "CHD"],
    },
    Concept {
        canonical: "diabetes",
        synonyms: &["diabetes mellitus", "DM", "diabetic"],
    },
    Concept {
        canonical: "stroke",
        synonyms: &["cerebrovascular accident", "CVA"],
    },
    Concept {
        canonical: "anticoagulation",
        synonyms: &["blood thinning", "anticoagulant therapy"],
    },
    Concept {
        canonical: "stent",
        synonyms: &["percutaneous coronary intervention", "PCI"],
    },
    Concept {
        canonical: "bypass",
        synonyms: &["CABG", "coronary artery bypass graft"],
    },
];

struct Pattern {
    regex: Regex,
    concept_index: usize,
}

/// Whole-word, case-insensitive matcher over the reference vocabulary.
pub struct ClinicalTermExtractor {
    patterns: Vec<Pattern>,
}

impl Default for ClinicalTermExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClinicalTermExtractor {
    pub fn new() -> Self {
        let mut patterns = Vec::new();
        for (concept_index, concept) in VOCABULARY.iter().enumerate() {
            for term in std::iter::once(&concept.canonical).chain(concept.synonyms) {
                // \b keeps "HF" from matching inside "HFrEF".
                let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).unwrap();
                patterns.push(Pattern {
                    regex,
                    concept_index,
                });
            }
        }
        Self { patterns }
    }

    /// Recognized terms in `text`, one per concept, in vocabulary order.
    ///
    /// When two vocabulary entries match overlapping spans the longer match
    /// wins, so "congestive heart failure" suppresses the bare "heart
    /// failure" hit on the same span. Never fails; empty input yields an
    /// empty result.
    pub fn extract(&self, text: &str) -> Vec<TermMatch> {
        // All spans first, then overlap resolution, longest-first.
        let mut spans: Vec<(usize, usize, usize)> = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                spans.push((m.start(), m.end(), pattern.concept_index));
            }
        }
        spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

        let mut kept: Vec<(usize, usize, usize)> = Vec::new();
        for span in spans {
            let overlaps = kept
                .iter()
                .any(|k| span.0 < k.1 && k.0 < span.1 && k.2 != span.2);
            if !overlaps {
                kept.push(span);
            }
        }

        // One surface form per concept: the longest kept span, earliest on
        // ties. Result order follows the vocabulary.
        let mut result = Vec::new();
        for (concept_index, concept) in VOCABULARY.iter().enumerate() {
            let best = kept
                .iter()
                .filter(|k| k.2 == concept_index)
                .min_by_key(|k| (std::cmp::Reverse(k.1 - k.0), k.0));
            if let Some(&(start, end, _)) = best {
                result.push(TermMatch {
                    term: text[start..end].to_lowercase(),
                    concept: concept.canonical.to_string(),
                });
            }
        }
        result
    }

    /// Expand a query by appending the canonical term and synonyms of every
    /// concept recognized in it. Returns the query unchanged when nothing
    /// matches.
    pub fn expand_query(&self, query: &str) -> String {
        let matches = self.extract(query);
        if matches.is_empty() {
            return query.to_string();
        }

        let query_lower = query.to_lowercase();
        let mut additions: Vec<&str> = Vec::new();
        for found in &matches {
            let Some(concept) = VOCABULARY.iter().find(|c| c.canonical == found.concept) else {
                continue;
            };
            for term in std::iter::once(&concept.canonical).chain(concept.synonyms) {
                let term_lower = term.to_lowercase();
                if !query_lower.contains(&term_lower)
                    && !additions.iter().any(|a| a.eq_ignore_ascii_case(term))
                {
                    additions.push(*term);
                }
            }
        }

        if additions.is_empty() {
            return query.to_string();
        }
        let expanded = format!("{query} {}", additions.join(" "));
        log::debug!("query expanded from '{query}' to '{expanded}'");
        expanded
    }
}
