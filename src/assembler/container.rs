//! Container-level MP3 concatenation.
//!
//! MP3 frames are self-delimiting, so joining segments only requires dropping
//! the per-segment ID3v2 tag that some encoders prepend. The first segment's
//! tag (if any) is kept as the tag of the whole file.

/// Length of an ID3v2 header or footer.
const ID3V2_HEADER_LEN: usize = 10;

/// Footer-present bit in the ID3v2 flags byte.
const ID3V2_FOOTER_FLAG: u8 = 0x10;

/// Running MP3 byte stream built from appended segments.
#[derive(Debug, Default)]
pub struct Mp3Accumulator {
    bytes: Vec<u8>,
    segments: usize,
}

impl Mp3Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one segment's audio onto the accumulator.
    pub fn append(&mut self, segment: &[u8]) {
        let audio = if self.segments == 0 {
            segment
        } else {
            strip_id3v2(segment)
        };
        self.bytes.extend_from_slice(audio);
        self.segments += 1;
    }

    /// Number of segments appended so far.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// Consumes the accumulator, returning the encoded file contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Returns `segment` without a leading ID3v2 tag.
///
/// A truncated or malformed tag header leaves the segment untouched.
fn strip_id3v2(segment: &[u8]) -> &[u8] {
    match id3v2_tag_len(segment) {
        Some(len) if len <= segment.len() => &segment[len..],
        _ => segment,
    }
}

/// Total length of a leading ID3v2 tag, header and footer included.
fn id3v2_tag_len(data: &[u8]) -> Option<usize> {
    if data.len() < ID3V2_HEADER_LEN || &data[..3] != b"ID3" {
        return None;
    }
    let flags = data[5];
    let size_bytes = &data[6..10];
    // Sizes are syncsafe: 7 significant bits per byte.
    if size_bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let body = size_bytes
        .iter()
        .fold(0_usize, |acc, b| (acc << 7) | usize::from(*b));
    let footer = if flags & ID3V2_FOOTER_FLAG == 0 {
        0
    } else {
        ID3V2_HEADER_LEN
    };
    Some(ID3V2_HEADER_LEN + body + footer)
}
