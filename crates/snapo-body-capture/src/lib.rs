//! Bounded, charset-aware, text/binary body classifier with base64
//! fallback, plus the tee-ing accumulator used to capture duplex/one-shot
//! request bodies and multipart/form-data rendering.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

const TEXT_MINOR_HINTS: [&str; 9] = [
    "json", "xml", "html", "javascript", "form", "graphql", "plain", "csv", "yaml",
];

/// A parsed `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub major: String,
    pub minor: String,
    pub charset: Option<String>,
    pub boundary: Option<String>,
}

pub fn parse_content_type(header: &str) -> ContentType {
    let mut segments = header.split(';');
    let full_type = segments.next().unwrap_or("").trim();
    let (major, minor) = match full_type.split_once('/') {
        Some((a, b)) => (a.trim().to_ascii_lowercase(), b.trim().to_ascii_lowercase()),
        None => (full_type.trim().to_ascii_lowercase(), String::new()),
    };

    let mut charset = None;
    let mut boundary = None;
    for seg in segments {
        if let Some((k, v)) = seg.split_once('=') {
            let key = k.trim().to_ascii_lowercase();
            let value = v.trim().trim_matches('"').to_owned();
            match key.as_str() {
                "charset" => charset = Some(value),
                "boundary" => boundary = Some(value),
                _ => {}
            }
        }
    }

    ContentType {
        major,
        minor,
        charset,
        boundary,
    }
}

/// Rule 1: text-like if major type is `text`, or the minor type contains
/// one of a fixed set of hints, case-insensitively.
pub fn is_text_like(ct: &ContentType) -> bool {
    ct.major == "text" || TEXT_MINOR_HINTS.iter().any(|hint| ct.minor.contains(hint))
}

/// How a captured body ended up represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    None,
    Base64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    /// The decoded text (encoding == None) or the base64 string
    /// (encoding == Base64) ready to place on the wire.
    pub rendered: String,
    pub encoding: Encoding,
    pub truncated_bytes: u64,
    pub preview: Option<String>,
}

/// Classifies and renders a captured body per the rules in §4.2.
///
/// `captured` is the (possibly truncated) bytes actually held in memory;
/// `total_observed_bytes` is how many bytes the source produced in total
/// (property 6: `captured.len() + truncated_bytes == total_observed_bytes`).
/// Returns `None` for an absent body.
pub fn capture_body(
    content_type: Option<&str>,
    content_encoding: Option<&str>,
    captured: &[u8],
    total_observed_bytes: u64,
    preview_bytes: usize,
) -> Option<Captured> {
    if total_observed_bytes == 0 && captured.is_empty() {
        return None;
    }

    let truncated_bytes = total_observed_bytes.saturating_sub(captured.len() as u64);
    let ct = content_type.map(parse_content_type);

    // Rule 2: any Content-Encoding other than identity forces base64.
    let non_identity = content_encoding
        .map(|enc| !enc.trim().eq_ignore_ascii_case("identity"))
        .unwrap_or(false);
    if non_identity {
        return Some(base64_result(captured, truncated_bytes, preview_bytes));
    }

    // Rule 7: multipart/* with a boundary renders per-part rather than
    // falling through to the generic text/binary dispatch below.
    if let Some(raw_ct) = content_type {
        if ct.as_ref().is_some_and(|c| c.major == "multipart") {
            if let Some(rendered) = render_multipart(raw_ct, captured) {
                return Some(Captured {
                    preview: Some(truncate_text(&rendered, preview_bytes)),
                    rendered,
                    encoding: Encoding::None,
                    truncated_bytes,
                });
            }
        }
    }

    match ct {
        Some(ref ct) if is_text_like(ct) => {
            // Rule 3.
            let charset = ct.charset.clone().unwrap_or_else(|| "utf-8".to_owned());
            let text = decode_with_charset(captured, &charset);
            Some(Captured {
                preview: Some(truncate_text(&text, preview_bytes)),
                rendered: text,
                encoding: Encoding::None,
                truncated_bytes,
            })
        }
        Some(_) => {
            // Rule 4.
            Some(base64_result(captured, truncated_bytes, preview_bytes))
        }
        None => {
            // Rule 5: content-type absent -> UTF-8 printable-ratio heuristic.
            if is_likely_plain_text(captured) {
                let text = String::from_utf8_lossy(captured).into_owned();
                Some(Captured {
                    preview: Some(truncate_text(&text, preview_bytes)),
                    rendered: text,
                    encoding: Encoding::None,
                    truncated_bytes,
                })
            } else {
                Some(base64_result(captured, truncated_bytes, preview_bytes))
            }
        }
    }
}

fn base64_result(captured: &[u8], truncated_bytes: u64, preview_bytes: usize) -> Captured {
    let rendered = BASE64.encode(captured);
    let preview_len = captured.len().min(preview_bytes);
    let preview = if captured.is_empty() {
        None
    } else {
        Some(BASE64.encode(&captured[..preview_len]))
    };
    Captured {
        rendered,
        encoding: Encoding::Base64,
        truncated_bytes,
        preview,
    }
}

fn decode_with_charset(bytes: &[u8], charset: &str) -> String {
    match encoding::label::encoding_from_whatwg_label(charset) {
        Some(enc) => enc
            .decode(bytes, encoding::DecoderTrap::Replace)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn truncate_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_owned();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}

/// Rule 5 heuristic: valid UTF-8 with >= 85% printable characters
/// (`\n\r\t` plus `0x20..=0x7E`).
pub fn is_likely_plain_text(bytes: &[u8]) -> bool {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return false,
    };
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let printable = text
        .chars()
        .filter(|&c| matches!(c, '\n' | '\r' | '\t') || ('\u{20}'..='\u{7E}').contains(&c))
        .count();
    (printable as f64 / total as f64) >= 0.85
}

/// Structural "does this look like base64" check used by the HAR exporter
/// when no upstream encoding marker is available: length divisible by 4,
/// base64 alphabet only, and it actually decodes.
///
/// Deliberately does NOT also require a non-text mime (see the decision in
/// `SPEC_FULL.md`'s Open Question 1): callers that have a mime available
/// should instead trust `is_text_like` upstream of reaching for this.
pub fn is_likely_base64(s: &str) -> bool {
    if s.is_empty() || s.len() % 4 != 0 {
        return false;
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    {
        return false;
    }
    BASE64.decode(s).is_ok()
}

/// Tees outgoing bytes into a bounded accumulator while tracking the true
/// total so `truncated_bytes` can be computed without re-reading the
/// source. Used for duplex/one-shot request-body capture (§4.2 rule 8).
#[derive(Debug, Default)]
pub struct BodyAccumulator {
    buf: Vec<u8>,
    max_bytes: usize,
    total_written: u64,
}

impl BodyAccumulator {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_bytes.min(64 * 1024)),
            max_bytes,
            total_written: 0,
        }
    }

    /// Tee a chunk of bytes as they stream through to the real destination.
    pub fn write(&mut self, chunk: &[u8]) {
        self.total_written += chunk.len() as u64;
        if self.buf.len() < self.max_bytes {
            let remaining = self.max_bytes - self.buf.len();
            let take = remaining.min(chunk.len());
            self.buf.extend_from_slice(&chunk[..take]);
        }
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn captured(&self) -> &[u8] {
        &self.buf
    }

    pub fn truncated_bytes(&self) -> u64 {
        self.total_written - self.buf.len() as u64
    }

    pub fn into_captured(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Multipart/form-data rendering (rule 7)
// ---------------------------------------------------------------------------

/// Renders a multipart body as header-line + content blocks, per §4.2 rule 7.
/// Returns `None` if `content_type` has no `boundary` parameter.
pub fn render_multipart(content_type: &str, body: &[u8]) -> Option<String> {
    let ct = parse_content_type(content_type);
    let boundary = ct.boundary?;
    let parts = split_multipart_parts(body, &boundary);
    if parts.is_empty() {
        return None;
    }

    let mut blocks = Vec::with_capacity(parts.len());
    for part in parts {
        let (headers, content) = split_part_headers(&part);
        let disposition = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-disposition"))
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        let (name, filename) = parse_content_disposition(disposition);
        let part_content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone());

        let mut header_line = format!("Part name=\"{}\"", name.unwrap_or_default());
        if let Some(fname) = &filename {
            header_line.push_str(&format!(" filename=\"{}\"", fname));
        }

        let is_binary = match &part_content_type {
            Some(ct_val) => !is_text_like(&parse_content_type(ct_val)),
            None => filename.is_some(),
        };

        let rendered_content = if is_binary {
            let mime = part_content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_owned());
            header_line.push_str(&format!(" ({mime})"));
            BASE64.encode(&content)
        } else {
            String::from_utf8_lossy(&content).into_owned()
        };

        blocks.push(format!("{header_line}\n{rendered_content}"));
    }

    Some(format!("{}\n", blocks.join("\n\n")))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_multipart_parts(body: &[u8], boundary: &str) -> Vec<Vec<u8>> {
    let delim = format!("--{boundary}").into_bytes();
    let mut positions = Vec::new();
    let mut offset = 0usize;
    while let Some(rel) = find_subslice(&body[offset..], &delim) {
        positions.push(offset + rel);
        offset = offset + rel + delim.len();
    }

    let mut parts = Vec::new();
    for w in positions.windows(2) {
        let start = w[0] + delim.len();
        let end = w[1];
        if end <= start {
            continue;
        }
        let mut seg = &body[start..end];
        if seg.starts_with(b"\r\n") {
            seg = &seg[2..];
        } else if seg.starts_with(b"\n") {
            seg = &seg[1..];
        }
        seg = strip_trailing_newline(seg);
        if !seg.is_empty() {
            parts.push(seg.to_vec());
        }
    }
    parts
}

fn strip_trailing_newline(mut seg: &[u8]) -> &[u8] {
    if seg.ends_with(b"\r\n") {
        seg = &seg[..seg.len() - 2];
    } else if seg.ends_with(b"\n") {
        seg = &seg[..seg.len() - 1];
    }
    seg
}

fn split_part_headers(part: &[u8]) -> (Vec<(String, String)>, Vec<u8>) {
    let sep = find_subslice(part, b"\r\n\r\n")
        .map(|p| (p, 4))
        .or_else(|| find_subslice(part, b"\n\n").map(|p| (p, 2)));

    let Some((pos, sep_len)) = sep else {
        return (Vec::new(), part.to_vec());
    };

    let header_block = String::from_utf8_lossy(&part[..pos]).into_owned();
    let content = part[pos + sep_len..].to_vec();

    let mut headers = Vec::new();
    for line in header_block.split(['\n']) {
        let line = line.trim_end_matches('\r');
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_owned(), v.trim().to_owned()));
        }
    }
    (headers, content)
}

fn parse_content_disposition(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    for tok in value.split(';') {
        let tok = tok.trim();
        if let Some(v) = tok.strip_prefix("name=") {
            name = Some(v.trim_matches('"').to_owned());
        } else if let Some(v) = tok.strip_prefix("filename=") {
            filename = Some(v.trim_matches('"').to_owned());
        }
    }
    (name, filename)
}
