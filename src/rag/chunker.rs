//! Deterministic overlapping text chunker.
//!
//! Splits loaded documents into fixed-size character windows with a
//! configured overlap between consecutive chunks. The same document and
//! parameters always produce the same chunk sequence.

use super::loader::Document;
use crate::core::errors::ApiError;

/// A bounded contiguous span of a document's text, the unit of embedding
/// and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Stable identifier, derived from the owning document and sequence index.
    pub id: String,
    /// Owning document identifier (back-reference only).
    pub document_id: String,
    /// Source label (original filename).
    pub source: String,
    /// 1-based page number for paginated sources.
    pub page: Option<u32>,
    /// Zero-based sequence index within the document.
    pub seq: usize,
    /// Character offset of the chunk start in the document text.
    pub start_offset: usize,
    pub text: String,
}

/// Split documents into overlapping chunks of at most `max_len` characters.
///
/// Greedy forward scan: each chunk after the first starts `overlap`
/// characters before the end of the previous one, so consecutive chunks of
/// the same document share exactly `overlap` characters except possibly the
/// last. Empty documents produce no chunks.
pub fn split_documents(
    documents: &[Document],
    max_len: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ApiError> {
    if max_len == 0 {
        return Err(ApiError::Configuration(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= max_len {
        return Err(ApiError::Configuration(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, max_len
        )));
    }

    let mut chunks = Vec::new();
    for document in documents {
        split_document(document, max_len, overlap, &mut chunks);
    }
    Ok(chunks)
}

fn split_document(document: &Document, max_len: usize, overlap: usize, out: &mut Vec<Chunk>) {
    let chars: Vec<char> = document.text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return;
    }

    // overlap < max_len, so progress per step is at least one character
    let step = max_len - overlap;
    let mut start = 0;
    let mut seq = 0;

    loop {
        let end = (start + max_len).min(total);
        out.push(Chunk {
            id: format!("{}:{}", document.id, seq),
            document_id: document.id.clone(),
            source: document.source.clone(),
            page: document.page,
            seq,
            start_offset: start,
            text: chars[start..end].iter().collect(),
        });

        if end == total {
            break;
        }
        start += step;
        seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            source: format!("{}.txt", id),
            page: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn fifty_chars_max_twenty_overlap_five() {
        let text: String = ('a'..='z').cycle().take(50).collect();
        let chunks = split_documents(&[doc("d1", &text)], 20, 5).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.start_offset).collect::<Vec<_>>(),
            vec![0, 15, 30]
        );
        assert_eq!(chunks[0].text.chars().count(), 20);
        assert_eq!(chunks[1].text.chars().count(), 20);
        // final chunk runs to the end of the document
        assert!(chunks[2].text.chars().count() <= 20);
        assert_eq!(
            chunks[2].start_offset + chunks[2].text.chars().count(),
            50
        );
    }

    #[test]
    fn consecutive_chunks_share_exactly_the_overlap() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let chunks = split_documents(&[doc("d1", &text)], 30, 7).unwrap();

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            let tail: String = prev[prev.len() - 7..].iter().collect();
            let head: String = next[..7].iter().collect();
            assert_eq!(tail, head);
            assert_eq!(
                pair[1].start_offset,
                pair[0].start_offset + pair[0].text.chars().count() - 7
            );
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(8);
        let first = split_documents(&[doc("d1", &text)], 40, 10).unwrap();
        let second = split_documents(&[doc("d1", &text)], 40, 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_document_produces_no_chunks() {
        let chunks = split_documents(&[doc("d1", "")], 20, 5).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_document_yields_single_chunk() {
        let chunks = split_documents(&[doc("d1", "hello")], 20, 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].seq, 0);
    }

    #[test]
    fn overlap_not_smaller_than_max_len_is_rejected() {
        let err = split_documents(&[doc("d1", "some text")], 10, 10).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));

        let err = split_documents(&[doc("d1", "some text")], 10, 15).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn page_and_source_carry_through() {
        let document = Document {
            id: "d1".to_string(),
            source: "report.pdf".to_string(),
            page: Some(3),
            text: "x".repeat(25),
        };
        let chunks = split_documents(&[document], 20, 5).unwrap();
        assert!(chunks.iter().all(|c| c.page == Some(3)));
        assert!(chunks.iter().all(|c| c.source == "report.pdf"));
    }
}
