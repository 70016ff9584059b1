//! PDF page extraction via lopdf.

use lopdf::Document;

use super::{LoadError, PageText, TextCleaner};

/// Extract per-page text from a PDF in ascending page order.
///
/// A document that cannot be parsed at all is a `LoadError::Pdf`; a page
/// whose text extraction fails is logged and yields an empty page.
pub(super) fn extract_pages(
    bytes: &[u8],
    cleaner: &TextCleaner,
) -> Result<Vec<PageText>, LoadError> {
    let doc = Document::load_mem(bytes).map_err(|e| LoadError::Pdf(e.to_string()))?;

    let page_map = doc.get_pages();
    let mut pages = Vec::with_capacity(page_map.len());
    for &page_number in page_map.keys() {
        let text = match doc.extract_text(&[page_number]) {
            Ok(raw) => cleaner.clean(&raw),
            Err(err) => {
                log::warn!("page {page_number}: text extraction failed: {err}");
                String::new()
            }
        };
        pages.push(PageText { page_number, text });
    }
    Ok(pages)
}
