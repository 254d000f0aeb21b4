//! Size limits of the messaging platform.
//!
//! All lengths are counted in characters (Unicode scalar values) and every
//! cut lands on a character boundary.

/// Longest user input forwarded to the backend
pub const MAX_INPUT_CHARS: usize = 4000;
/// Longest single delivery unit
pub const MAX_DELIVERY_CHARS: usize = 5000;
/// How far back from a forced cut to look for a sentence end
pub const SENTENCE_LOOKBACK: usize = 200;
/// Most delivery units sent for one response
pub const MAX_DELIVERY_PIECES: usize = 5;

/// Cut `text` to at most [`MAX_INPUT_CHARS`] characters.
pub fn truncate_input(text: &str) -> &str {
    truncate_chars(text, MAX_INPUT_CHARS)
}

/// Prefix of `text` holding at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Result of splitting a response for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySplit {
    pub pieces: Vec<String>,
    /// Characters left over once the piece cap was reached
    pub dropped_chars: usize,
}

impl DeliverySplit {
    pub fn is_truncated(&self) -> bool {
        self.dropped_chars > 0
    }
}

/// Split `content` into platform-sized pieces.
///
/// Content within the limit is one piece. Longer content is cut at the last
/// sentence end (`.`, `!` or `?` followed by a space) inside the lookback
/// window before the limit, or hard at the limit when there is none. At most
/// [`MAX_DELIVERY_PIECES`] pieces are produced; anything after the last piece
/// is dropped and counted in `dropped_chars`.
pub fn split_for_delivery(content: &str) -> DeliverySplit {
    split_with_limits(content, MAX_DELIVERY_CHARS, SENTENCE_LOOKBACK, MAX_DELIVERY_PIECES)
}

pub fn split_with_limits(
    content: &str,
    max_chars: usize,
    lookback: usize,
    max_pieces: usize,
) -> DeliverySplit {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut remaining = content;

    if remaining.chars().count() <= max_chars {
        return DeliverySplit {
            pieces: vec![content.to_string()],
            dropped_chars: 0,
        };
    }

    while !remaining.is_empty() && pieces.len() < max_pieces {
        if remaining.chars().count() <= max_chars {
            pieces.push(remaining.to_string());
            remaining = "";
            break;
        }

        let cut = find_sentence_boundary(remaining, max_chars, lookback);
        pieces.push(remaining[..cut].to_string());
        remaining = &remaining[cut..];
    }

    DeliverySplit {
        pieces,
        dropped_chars: remaining.chars().count(),
    }
}

/// Byte offset to cut `text` (longer than `max_chars`) at.
fn find_sentence_boundary(text: &str, max_chars: usize, lookback: usize) -> usize {
    // one extra char so the char after position max_chars - 1 is visible
    let chars: Vec<(usize, char)> = text.char_indices().take(max_chars + 1).collect();
    let hard_cut = chars.get(max_chars).map(|(byte, _)| *byte).unwrap_or(text.len());

    let search_start = max_chars.saturating_sub(lookback);
    for i in (search_start..max_chars).rev() {
        let (_, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let followed_by_space = matches!(chars.get(i + 1), Some((_, ' ')));
        if !followed_by_space {
            continue;
        }
        // keep the space with this piece when it still fits
        let end = (i + 2).min(max_chars);
        return chars.get(end).map(|(byte, _)| *byte).unwrap_or(text.len());
    }

    hard_cut
}
