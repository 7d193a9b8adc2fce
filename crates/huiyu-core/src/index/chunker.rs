//! Scripture chunking for parent/child indexing
//!
//! Sizes and offsets are counted in characters, not bytes, since the corpus is
//! mostly CJK text.

/// Document chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Character offset of the chunk within its source
    pub position: usize,
}

/// Sentence terminators that make a good split point
const SENTENCE_ENDS: &[char] = &['。', '！', '？', '；'];

/// Find the last occurrence of `needle` in `haystack`, returning its start index
fn rfind_seq(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Pick the end of a chunk inside `region`, preferring paragraph breaks over
/// sentence ends over line breaks. Returns a length within `region`.
fn natural_break(region: &[char]) -> Option<usize> {
    if let Some(pos) = rfind_seq(region, &['\n', '\n']) {
        return Some(pos + 2);
    }
    if let Some(pos) = region.iter().rposition(|c| SENTENCE_ENDS.contains(c)) {
        return Some(pos + 1);
    }
    if let Some(pos) = rfind_seq(region, &['.', ' ']) {
        return Some(pos + 2);
    }
    region.iter().rposition(|c| *c == '\n').map(|pos| pos + 1)
}

/// Character-based chunking with overlap
pub fn chunk_by_chars(content: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = content.chars().collect();
    let chunk_size = chunk_size.max(1);

    if chars.len() <= chunk_size {
        return vec![Chunk {
            text: content.to_string(),
            position: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let mut chunk_end = end;

        // Find natural break point in last 30%
        if end < chars.len() {
            let search_start = start + (chunk_size * 70 / 100);
            if search_start < end {
                if let Some(len) = natural_break(&chars[search_start..end]) {
                    chunk_end = search_start + len;
                }
            }
        }

        chunks.push(Chunk {
            text: chars[start..chunk_end].iter().collect(),
            position: start,
        });

        if chunk_end >= chars.len() {
            break;
        }

        let next = chunk_end.saturating_sub(overlap);
        start = if next > start { next } else { chunk_end };
    }

    chunks
}

/// A coarse chunk with the fine chunks cut from it
#[derive(Debug, Clone)]
pub struct ParentChunk {
    pub chunk: Chunk,
    pub children: Vec<Chunk>,
}

/// Split content into parents, then split each parent into children
pub fn chunk_parent_child(
    content: &str,
    parent_size: usize,
    parent_overlap: usize,
    child_size: usize,
    child_overlap: usize,
) -> Vec<ParentChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    chunk_by_chars(content, parent_size, parent_overlap)
        .into_iter()
        .map(|parent| {
            let children = chunk_by_chars(&parent.text, child_size, child_overlap)
                .into_iter()
                .filter(|c| !c.text.trim().is_empty())
                .collect();
            ParentChunk {
                chunk: parent,
                children,
            }
        })
        .filter(|p| !p.children.is_empty())
        .collect()
}
