//! Passage chunking for guideline pages.
//!
//! Splits each page's text into overlapping word windows, carrying the most
//! recent heading-like line forward as the section label. Chunk ids are
//! derived from document name, page number, and chunk counter, so identical
//! input bytes always reproduce identical chunk sequences.

use regex::Regex;

use crate::config::ChunkingConfig;
use crate::corpus::models::Chunk;
use crate::loader::PageText;

/// Chunk every page of a document. Pages are consumed in order; the
/// section label carries across page boundaries until replaced.
pub fn chunk_document(
    document_name: &str,
    pages: &[PageText],
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let detector = HeadingDetector::new();
    let window = config.window_words.max(1);
    let stride = config.stride_words.clamp(1, window);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut sequence_index: u32 = 0;
    // Index into `sections`; entry 0 is the empty "no heading yet" label.
    let mut sections: Vec<String> = vec![String::new()];
    let mut current_section: usize = 0;

    for page in pages {
        // Flatten the page into a word stream, tagging each word with the
        // section in effect where it appears.
        let mut words: Vec<&str> = Vec::new();
        let mut word_sections: Vec<usize> = Vec::new();
        for line in page.text.lines() {
            if detector.is_heading(line) {
                sections.push(line.trim().to_string());
                current_section = sections.len() - 1;
            }
            for word in line.split_whitespace() {
                words.push(word);
                word_sections.push(current_section);
            }
        }
        if words.is_empty() {
            continue;
        }

        // Window boundaries for this page, tail scrap merged into the
        // previous window when it falls below the minimum.
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + window).min(words.len());
            ranges.push((start, end));
            if end >= words.len() {
                break;
            }
            start += stride;
        }
        if ranges.len() > 1 {
            let (last_start, last_end) = *ranges.last().unwrap();
            if last_end - last_start < config.min_chunk_words {
                ranges.pop();
                ranges.last_mut().unwrap().1 = last_end;
            }
        }

        for (chunk_number, &(start, end)) in ranges.iter().enumerate() {
            let text = words[start..end].join(" ");
            let word_count = (end - start) as u32;
            let char_count = text.chars().count() as u32;
            chunks.push(Chunk {
                chunk_id: format!(
                    "{document_name}_page{}_chunk{chunk_number}",
                    page.page_number
                ),
                document_name: document_name.to_string(),
                page_number: page.page_number,
                section_title: sections[word_sections[start]].clone(),
                text,
                sequence_index,
                word_count,
                char_count,
            });
            sequence_index += 1;
        }
    }

    log::debug!("{document_name}: produced {} chunks", chunks.len());
    chunks
}

/// Heuristic heading detection: all-caps lines, numbered section heads, and
/// short title-case lines. Best-effort metadata, not a structural claim.
struct HeadingDetector {
    numbered: Regex,
}

impl HeadingDetector {
    fn new() -> Self {
        Self {
            numbered: Regex::new(r"^\d+(\.\d+)*\.?\s+[A-Z][^.]*$").unwrap(),
        }
    }

    fn is_heading(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let alphabetic = line.chars().filter(|c| c.is_alphabetic()).count();
        if alphabetic >= 4 && !line.chars().any(|c| c.is_lowercase()) {
            return true;
        }

        if self.numbered.is_match(line) {
            return true;
        }

        // Short title-case line: at most 7 words, most capitalized, no
        // sentence-ending punctuation.
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() || words.len() > 7 {
            return false;
        }
        if line.ends_with('.') || line.ends_with(',') || line.ends_with(';') {
            return false;
        }
        let capitalized = words
            .iter()
            .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .count();
        capitalized * 2 >= words.len() && words[0].chars().next().is_some_and(|c| c.is_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, text: &str) -> PageText {
        PageText {
            page_number: n,
            text: text.to_string(),
        }
    }

    fn small_config() -> ChunkingConfig {
        ChunkingConfig {
            window_words: 10,
            stride_words: 7,
            min_chunk_words: 4,
        }
    }

    fn word_run(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn chunking_is_deterministic() {
        let pages = vec![page(1, &word_run(25))];
        let a = chunk_document("doc", &pages, &small_config());
        let b = chunk_document("doc", &pages, &small_config());
        assert_eq!(a, b);
        assert_eq!(a[0].chunk_id, "doc_page1_chunk0");
        assert_eq!(a[1].chunk_id, "doc_page1_chunk1");
    }

    #[test]
    fn windows_overlap_by_window_minus_stride() {
        let pages = vec![page(1, &word_run(20))];
        let chunks = chunk_document("doc", &pages, &small_config());
        assert!(chunks.len() >= 2);
        // stride 7, window 10: second chunk starts at word 7
        assert!(chunks[0].text.ends_with("w7 w8 w9"));
        assert!(chunks[1].text.starts_with("w7 w8 w9"));
    }

    #[test]
    fn tail_scrap_merges_into_previous_chunk() {
        let config = ChunkingConfig {
            window_words: 10,
            stride_words: 7,
            min_chunk_words: 5,
        };
        // 18 words -> windows [0,10), [7,17), [14,18); the 4-word tail is
        // below the minimum and folds into the previous window.
        let pages = vec![page(1, &word_run(18))];
        let chunks = chunk_document("doc", &pages, &config);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].text.ends_with("w17"));
        assert_eq!(chunks[1].word_count, 11); // [7,18)
    }

    #[test]
    fn short_single_page_is_retained() {
        let chunks = chunk_document("doc", &[page(1, "just two")], &small_config());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count, 2);
    }

    #[test]
    fn empty_pages_produce_no_chunks() {
        let chunks = chunk_document("doc", &[page(1, ""), page(2, "")], &small_config());
        assert!(chunks.is_empty());
    }

    #[test]
    fn sequence_index_runs_across_pages() {
        let pages = vec![page(1, &word_run(12)), page(2, &word_run(12))];
        let chunks = chunk_document("doc", &pages, &small_config());
        let indices: Vec<u32> = chunks.iter().map(|c| c.sequence_index).collect();
        assert_eq!(indices, (0..chunks.len() as u32).collect::<Vec<_>>());
        // per-page chunk counter restarts, so ids stay unique via the page
        assert!(chunks.iter().any(|c| c.chunk_id == "doc_page2_chunk0"));
    }

    #[test]
    fn heading_carries_forward_across_pages() {
        let pages = vec![
            page(1, &format!("ARTERIAL HYPERTENSION\n{}", word_run(8))),
            page(2, &word_run(8)),
        ];
        let chunks = chunk_document("doc", &pages, &small_config());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "ARTERIAL HYPERTENSION");
        assert_eq!(chunks[1].section_title, "ARTERIAL HYPERTENSION");
    }

    #[test]
    fn section_empty_before_first_heading() {
        let pages = vec![page(
            1,
            &format!("{}\nTREATMENT TARGETS\n{}", word_run(12), word_run(12)),
        )];
        let chunks = chunk_document("doc", &pages, &small_config());
        assert_eq!(chunks[0].section_title, "");
        assert!(chunks
            .iter()
            .any(|c| c.section_title == "TREATMENT TARGETS"));
    }

    #[test]
    fn heading_shapes() {
        let detector = HeadingDetector::new();
        assert!(detector.is_heading("DIAGNOSIS AND MANAGEMENT"));
        assert!(detector.is_heading("3.2 Blood Pressure Targets"));
        assert!(detector.is_heading("Recommendations for Screening"));
        assert!(!detector.is_heading("the patient was admitted with chest pain and treated."));
        assert!(!detector.is_heading("See Table 3."));
        assert!(!detector.is_heading(""));
    }
}
