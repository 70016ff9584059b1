//! Plain text and markdown sources.
//!
//! Form feeds (`\x0c`) separate pages; a source without any form feed is a
//! single-page document.

use super::{LoadError, PageText, TextCleaner};

pub(super) fn extract_pages(
    bytes: &[u8],
    cleaner: &TextCleaner,
) -> Result<Vec<PageText>, LoadError> {
    let content = String::from_utf8_lossy(bytes);
    let pages = content
        .split('\x0c')
        .enumerate()
        .map(|(i, raw)| PageText {
            page_number: i as u32 + 1,
            text: cleaner.clean(raw),
        })
        .collect();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feed_splits_pages() {
        let cleaner = TextCleaner::new();
        let pages = extract_pages(b"first page text\x0csecond page text", &cleaner).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].text, "second page text");
    }

    #[test]
    fn single_page_without_form_feed() {
        let cleaner = TextCleaner::new();
        let pages = extract_pages(b"only page", &cleaner).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "only page");
    }
}
