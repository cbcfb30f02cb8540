/// Upper bound on chunk length, in bytes of normalized text.
pub const MAX_CHUNK_CHARS: usize = 1000;
/// Overlap between consecutive windows of an oversized paragraph.
pub const CHUNK_OVERLAP: usize = 100;

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Pack paragraphs into chunks of at most `max_chars`. A paragraph that alone
/// exceeds the limit is cut into overlapping windows.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let normalized = normalize_text(text);
    let max_chars = max_chars.max(1);

    let mut out = Vec::new();
    let mut buf = String::new();
    for p in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if p.len() > max_chars {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
            }
            out.extend(split_windows(p, max_chars, overlap));
            continue;
        }
        let add_len = if buf.is_empty() { p.len() } else { 2 + p.len() };
        if !buf.is_empty() && buf.len() + add_len > max_chars {
            out.push(std::mem::take(&mut buf));
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(p);
    }
    if !buf.trim().is_empty() {
        out.push(buf);
    }
    out
}

fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let stride = size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let s = ceil_boundary(text, start);
        let e = floor_boundary(text, (s + size).min(text.len()));
        // A window smaller than one char can happen with tiny sizes; take the char.
        let e = if e <= s { ceil_boundary(text, s + 1) } else { e };
        let piece = text[s..e].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        if e >= text.len() {
            break;
        }
        start = s + stride;
    }
    out
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
