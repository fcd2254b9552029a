//! Incremental byte-stream -> SSE-event stream, with tail flushing.
//!
//! CR and CRLF are normalized to LF on entry. Frames are delimited by a
//! blank line (`\n\n`); each raw frame is parsed per the WHATWG EventStream
//! grammar. The parser is owned by a single response/request and assigns
//! strictly increasing, 1-based sequence numbers as frames are produced.

/// One parsed SSE frame.
///
/// `data = None` means every line in the frame was a `:`-comment (no
/// `data:` line appeared at all); `data = Some(String::new())` means a
/// `data:` line with no value was present. The two are deliberately
/// distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub sequence: u64,
    pub raw: String,
    pub event: Option<String>,
    pub data: Option<String>,
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
    pub comment: Option<String>,
}

/// Parses one raw SSE frame (the text between two blank-line delimiters,
/// with no trailing newlines) into its fields.
fn parse_frame_fields(
    raw: &str,
) -> (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<u64>,
    Option<String>,
) {
    let mut event = None;
    let mut id = None;
    let mut retry_ms = None;
    let mut data_lines: Vec<String> = Vec::new();
    let mut saw_data = false;
    let mut comment_lines: Vec<String> = Vec::new();

    for line in raw.split('\n') {
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix(':') {
            comment_lines.push(comment.to_owned());
            continue;
        }
        let (field, value) = match line.find(':') {
            Some(idx) => (&line[..idx], strip_one_leading_space(&line[idx + 1..])),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_owned()),
            "data" => {
                saw_data = true;
                data_lines.push(value.to_owned());
            }
            "id" => id = Some(value.to_owned()),
            "retry" => {
                if let Ok(n) = value.parse::<u64>() {
                    retry_ms = Some(n);
                }
                // Invalid retry values are silently dropped per the grammar.
            }
            _ => {} // unrecognized fields are ignored
        }
    }

    let data = if saw_data {
        Some(data_lines.join("\n"))
    } else {
        None
    };
    let comment = if comment_lines.is_empty() {
        None
    } else {
        Some(comment_lines.join("\n"))
    };

    (event, data, id, retry_ms, comment)
}

fn strip_one_leading_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}

/// Incremental parser over a byte stream, fed chunk by chunk.
pub struct SseParser {
    buffer: String,
    saw_cr: bool,
    next_sequence: u64,
    total_bytes: u64,
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            saw_cr: false,
            next_sequence: 1,
            total_bytes: 0,
        }
    }

    /// Total events produced so far (reflects post-drain state once
    /// [`SseParser::finish`] has been called).
    pub fn total_events(&self) -> u64 {
        self.next_sequence - 1
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Feeds a chunk of response bytes, returning every complete frame it
    /// produced. Identical total input split across any chunk boundaries
    /// yields an identical event list (property 2 in the spec).
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.normalize_into_buffer(chunk);
        self.drain_complete_frames()
    }

    /// Flushes the residual tail (if non-empty) as a final frame. Must be
    /// called before the caller emits `ResponseStreamClosed` -- events must
    /// be drained, then the stream closed, never the reverse.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Some(self.emit(raw))
    }

    fn normalize_into_buffer(&mut self, chunk: &str) {
        for c in chunk.chars() {
            if self.saw_cr {
                self.saw_cr = false;
                if c == '\n' {
                    // This \n completes a \r\n pair already normalized to a
                    // single \n when the \r was seen; don't double it.
                    continue;
                }
            }
            if c == '\r' {
                self.buffer.push('\n');
                self.saw_cr = true;
            } else {
                self.buffer.push(c);
            }
        }
    }

    fn drain_complete_frames(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..pos).collect();
            // Remove the "\n\n" delimiter itself.
            self.buffer.drain(..2.min(self.buffer.len()));
            events.push(self.emit(raw));
        }
        events
    }

    fn emit(&mut self, raw: String) -> SseEvent {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.total_bytes += raw.len() as u64 + 1;
        let (event, data, id, retry_ms, comment) = parse_frame_fields(&raw);
        SseEvent {
            sequence,
            raw,
            event,
            data,
            id,
            retry_ms,
            comment,
        }
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
