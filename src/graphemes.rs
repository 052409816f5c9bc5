use ropey::Rope;
use unicode_segmentation::{GraphemeCursor, GraphemeIncomplete};

/// ------ Line geometry ------------------------------------------------------

#[inline]
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Char range `[start, end)` of a line, excluding its terminator (`\r\n` counts as one).
pub fn line_span(text: &Rope, row: usize) -> (usize, usize) {
    let row = row.min(text.len_lines().saturating_sub(1));
    let start = text.line_to_char(row);
    let line = text.line(row);
    let mut len = line.len_chars();
    if len > 0 && is_line_break(line.char(len - 1)) {
        let last = line.char(len - 1);
        len -= 1;
        if last == '\n' && len > 0 && line.char(len - 1) == '\r' {
            len -= 1;
        }
    }
    (start, start + len)
}

/// Text of a line without its terminator.
pub fn line_text(text: &Rope, row: usize) -> String {
    let (start, end) = line_span(text, row);
    text.slice(start..end).to_string()
}

/// Last row index that holds text. A trailing newline does not open a new editable row
/// unless the buffer is otherwise empty.
pub fn last_row(text: &Rope) -> usize {
    text.len_lines().saturating_sub(1)
}

/// ------ Grapheme stepping over rope chunks --------------------------------

/// Step to next/prev grapheme *byte* boundary using GraphemeCursor and Ropey chunks.
fn step_grapheme_bound(text: &Rope, from_byte: usize, forward: bool) -> usize {
    let total_bytes = text.len_bytes();
    let mut cursor = GraphemeCursor::new(from_byte, total_bytes, true);
    let (mut chunk, mut chunk_start, _, _) = text.chunk_at_byte(from_byte);

    loop {
        let res = if forward {
            cursor.next_boundary(chunk, chunk_start)
        } else {
            cursor.prev_boundary(chunk, chunk_start)
        };

        match res {
            Ok(Some(bi)) => return bi,
            Ok(None) => return if forward { total_bytes } else { 0 },
            Err(GraphemeIncomplete::PreContext(req_end)) => {
                let (ctx_chunk, ctx_start, _, _) = text.chunk_at_byte(req_end);
                cursor.provide_context(&ctx_chunk[..req_end - ctx_start], ctx_start);
            }
            Err(GraphemeIncomplete::NextChunk) => {
                let next_start = chunk_start + chunk.len();
                if next_start >= total_bytes {
                    return total_bytes;
                }
                let (c, cs, _, _) = text.chunk_at_byte(next_start);
                chunk = c;
                chunk_start = cs;
            }
            Err(GraphemeIncomplete::PrevChunk) => {
                if chunk_start == 0 {
                    return 0;
                }
                let (c, cs, _, _) = text.chunk_at_byte(chunk_start - 1);
                chunk = c;
                chunk_start = cs;
            }
            Err(GraphemeIncomplete::InvalidOffset) => {
                let (c, cs, _, _) = text.chunk_at_byte(cursor.cur_cursor());
                chunk = c;
                chunk_start = cs;
            }
        }
    }
}

/// Next grapheme boundary (absolute char index). At the end, returns `len_chars()`.
pub fn next_grapheme(text: &Rope, ci: usize) -> usize {
    if ci >= text.len_chars() {
        return text.len_chars();
    }
    let next = step_grapheme_bound(text, text.char_to_byte(ci), true);
    text.byte_to_char(next)
}

/// Previous grapheme boundary (absolute char index). At the start, returns 0.
pub fn prev_grapheme(text: &Rope, ci: usize) -> usize {
    if ci == 0 {
        return 0;
    }
    let prev = step_grapheme_bound(text, text.char_to_byte(ci.min(text.len_chars())), false);
    text.byte_to_char(prev)
}

/// ------ Row / grapheme column conversions ----------------------------------

/// Number of grapheme clusters on a line, terminator excluded.
pub fn line_gcount(text: &Rope, row: usize) -> usize {
    let (start, end) = line_span(text, row);
    let mut count = 0;
    let mut ci = start;
    while ci < end {
        ci = next_grapheme(text, ci).min(end);
        count += 1;
    }
    count
}

/// `(row, gcol)` to an absolute char index; `gcol` clamps to the end of the line.
pub fn line_gcol_to_char(text: &Rope, row: usize, gcol: usize) -> usize {
    let (start, end) = line_span(text, row);
    let mut ci = start;
    for _ in 0..gcol {
        if ci >= end {
            break;
        }
        ci = next_grapheme(text, ci).min(end);
    }
    ci
}

/// Absolute char index to `(row, gcol)`. Positions inside a cluster snap to its start.
pub fn char_to_line_gcol(text: &Rope, ci: usize) -> (usize, usize) {
    let ci = ci.min(text.len_chars());
    let row = text.char_to_line(ci);
    let (start, end) = line_span(text, row);
    let target = ci.clamp(start, end);

    let mut gcol = 0;
    let mut at = start;
    while at < target {
        let next = next_grapheme(text, at).min(end);
        if next > target || next <= at {
            break;
        }
        gcol += 1;
        at = next;
    }
    (row, gcol)
}

/// First non-blank char of a line, or its end when the line is blank.
pub fn first_non_blank(text: &Rope, row: usize) -> usize {
    let (start, end) = line_span(text, row);
    (start..end)
        .find(|&ci| !matches!(text.char(ci), ' ' | '\t'))
        .unwrap_or(end)
}

/// Leading whitespace of a line.
pub fn indentation(text: &Rope, row: usize) -> String {
    let (start, _) = line_span(text, row);
    let end = first_non_blank(text, row);
    text.slice(start..end).to_string()
}

/// ------ Word motions -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Blank,
    Word,
    Punct,
}

fn class_of(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Blank
    } else if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Start of the next word (`w`). Empty lines count as words.
pub fn next_word_start(text: &Rope, ci: usize) -> usize {
    let len = text.len_chars();
    if ci >= len {
        return len;
    }
    let mut at = ci;
    let start_class = class_of(text.char(at));
    if start_class != CharClass::Blank {
        while at < len && class_of(text.char(at)) == start_class {
            at += 1;
        }
    }
    while at < len && class_of(text.char(at)) == CharClass::Blank {
        if text.char(at) == '\n' && at + 1 < len && text.char(at + 1) == '\n' {
            return at + 1;
        }
        at += 1;
    }
    at
}

/// Start of the current or previous word (`b`).
pub fn prev_word_start(text: &Rope, ci: usize) -> usize {
    if ci == 0 {
        return 0;
    }
    let mut at = ci.min(text.len_chars()) - 1;
    while at > 0 && class_of(text.char(at)) == CharClass::Blank {
        at -= 1;
    }
    let class = class_of(text.char(at));
    while at > 0 && class_of(text.char(at - 1)) == class {
        at -= 1;
    }
    at
}

/// Last char of the current or next word (`e`).
pub fn word_end(text: &Rope, ci: usize) -> usize {
    let len = text.len_chars();
    if len == 0 {
        return 0;
    }
    let mut at = (ci + 1).min(len - 1);
    while at < len - 1 && class_of(text.char(at)) == CharClass::Blank {
        at += 1;
    }
    let class = class_of(text.char(at));
    while at + 1 < len && class_of(text.char(at + 1)) == class {
        at += 1;
    }
    at
}

/// End (exclusive) of the word under `ci`, without trailing blanks (`cw`).
pub fn current_word_end(text: &Rope, ci: usize) -> usize {
    let len = text.len_chars();
    if ci >= len {
        return len;
    }
    let class = class_of(text.char(ci));
    let mut at = ci;
    while at < len && class_of(text.char(at)) == class && text.char(at) != '\n' {
        at += 1;
    }
    at
}
