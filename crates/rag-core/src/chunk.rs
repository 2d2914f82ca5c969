//! Splitting documents into overlapping passages for the index.

use std::collections::VecDeque;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Break `text` into pieces of at most `size` characters, preferring
/// paragraph, then line, then word boundaries. Separators stay attached to
/// the piece they end.
fn pieces(text: &str, size: usize, level: usize, out: &mut Vec<String>) {
    if char_len(text) <= size {
        out.push(text.to_string());
        return;
    }
    match SEPARATORS.get(level) {
        Some(sep) => {
            for part in text.split_inclusive(sep) {
                pieces(part, size, level + 1, out);
            }
        }
        None => {
            let chars: Vec<char> = text.chars().collect();
            out.extend(chars.chunks(size).map(|c| c.iter().collect::<String>()));
        }
    }
}

/// Split `text` into chunks of at most `size` characters where consecutive
/// chunks share up to `overlap` characters of trailing context.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let mut parts = Vec::new();
    pieces(text, size, 0, &mut parts);

    let mut chunks = Vec::new();
    let mut window: VecDeque<(String, usize)> = VecDeque::new();
    let mut len = 0;

    let emit = |window: &VecDeque<(String, usize)>, chunks: &mut Vec<String>| {
        let joined: String = window.iter().map(|(p, _)| p.as_str()).collect();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    };

    for part in parts {
        let plen = char_len(&part);
        if len + plen > size && !window.is_empty() {
            emit(&window, &mut chunks);
            while let Some((_, front)) = window.front()
                && (len > overlap || len + plen > size)
            {
                len -= front;
                window.pop_front();
            }
        }
        len += plen;
        window.push_back((part, plen));
    }
    if !window.is_empty() {
        emit(&window, &mut chunks);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk_text("  hello world \n", 800, 150), vec!["hello world"]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("", 800, 150).is_empty());
        assert!(chunk_text("\n\n  \n", 800, 150).is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..60).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 40, 12);
        for pair in chunks.windows(2) {
            let tail = pair[0].split(' ').next_back().unwrap();
            assert!(pair[1].contains(tail), "{:?} should carry {tail}", pair[1]);
        }
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let para = "a".repeat(30);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let chunks = chunk_text(&text, 70, 0);
        assert_eq!(chunks[0], format!("{para}\n\n{para}"));
        assert_eq!(chunks[1], para);
    }

    #[test]
    fn test_unbroken_run_hard_split() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
