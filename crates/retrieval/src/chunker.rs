use std::ops::Range;

/// Characters a chunk prefers to end with.
const SENTENCE_TERMINATORS: [char; 7] = ['。', '！', '？', '.', '!', '?', '\n'];

const DEFAULT_CHUNK_SIZE: usize = 500;

/// Splits `text` into chunks of at most `chunk_size` characters.
///
/// Consecutive chunks share `chunk_overlap` characters. Near the end of
/// each window the split point moves back to the closest sentence
/// terminator, so sentences are kept whole when possible. Chunks are
/// trimmed and blank ones are dropped.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chunk_ranges(&chars, chunk_size, chunk_overlap)
        .into_iter()
        .filter_map(|range| {
            let chunk: String = chars[range].iter().collect();
            let chunk = chunk.trim();
            (!chunk.is_empty()).then(|| chunk.to_owned())
        })
        .collect()
}

fn chunk_ranges(
    chars: &[char],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Range<usize>> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    let chunk_overlap = if chunk_overlap >= chunk_size {
        chunk_size / 10
    } else {
        chunk_overlap
    };

    let len = chars.len();
    if len <= chunk_size {
        return vec![0..len];
    }

    let step = (chunk_size - chunk_overlap).max(1);
    let mut ranges = vec![];
    let mut start = 0;
    while start < len {
        let mut end = (start + chunk_size).min(len);
        let mut cut_early = false;
        if end < len {
            // Only the last 20% of the window is searched.
            let search_start = start + chunk_size * 4 / 5;
            if let Some(idx) = (search_start + 1..end)
                .rev()
                .find(|&idx| SENTENCE_TERMINATORS.contains(&chars[idx]))
            {
                end = idx + 1;
                cut_early = true;
            }
        }
        ranges.push(start..end);
        // A window that reaches the end still slides once more, so the
        // tail is emitted again as its own chunk.
        let next = if cut_early {
            end.saturating_sub(chunk_overlap)
        } else {
            start + step
        };
        start = next.max(start + 1);
    }
    ranges
}
