//! Sliding-window text chunker for ingestion.

/// Split `text` into windows of at most `chunk_size` characters, each
/// window starting `chunk_size - overlap` characters after the previous
/// one. Window edges snap to whitespace so words are never cut, except
/// when a single word exceeds the window.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let step = chunk_size.saturating_sub(overlap).max(1);

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut cursor = 0;

    while cursor < total {
        let hard_end = (cursor + chunk_size).min(total);
        let start = snap_start(&chars, cursor, hard_end);
        let end = if hard_end < total {
            snap_end(&chars, start, hard_end)
        } else {
            hard_end
        };

        if start < end {
            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }
        }

        if hard_end >= total {
            break;
        }
        cursor += step;
    }

    chunks
}

/// Walk forward past a partial word so a window never opens mid-word.
/// Falls back to the hard cut when the word swallows the whole window.
fn snap_start(chars: &[char], cursor: usize, hard_end: usize) -> usize {
    if cursor == 0 || chars[cursor - 1].is_whitespace() || chars[cursor].is_whitespace() {
        return cursor;
    }
    let mut start = cursor;
    while start < chars.len() && !chars[start].is_whitespace() {
        start += 1;
    }
    if start >= hard_end {
        cursor
    } else {
        start
    }
}

/// Walk back from `hard_end` to the last whitespace after `start`. Falls
/// back to the hard cut when the window is one unbroken word.
fn snap_end(chars: &[char], start: usize, hard_end: usize) -> usize {
    let mut end = hard_end;
    while end > start && !chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if end == start {
        hard_end
    } else {
        end
    }
}
