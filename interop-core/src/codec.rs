//! ## interop-core::codec
//! **Tagged data stream codec**
//!
//! The bulk download is a sequence of fixed-size segments grouped into
//! "gigabytes". Only the first byte of each segment carries information: the
//! index of the group it belongs to, modulo 255. Both sides work one segment at
//! a time, so a transfer of any length needs a single segment of memory.

use thiserror::Error;

/// Length of one segment in the nominal layout.
pub const ONE_MB: usize = 1_000_000;

/// Segments per group in the nominal layout (1000 x 1 MB = 1 GB).
pub const SEGMENTS_PER_GB: u64 = 1_000;

/// Byte used for every position of a segment other than the tag.
const FILLER: u8 = 0;

/// Tag carried by every segment of group `group_index`.
#[inline]
pub fn tag_for_group(group_index: u64) -> u8 {
    (group_index % 255) as u8
}

/// Shape of a tagged stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    pub segment_len: usize,
    pub segments_per_group: u64,
}

impl StreamLayout {
    /// 1,000,000-byte segments, 1000 per group.
    pub const NOMINAL: StreamLayout = StreamLayout {
        segment_len: ONE_MB,
        segments_per_group: SEGMENTS_PER_GB,
    };

    pub fn group_len(&self) -> u64 {
        self.segment_len as u64 * self.segments_per_group
    }

    pub fn group_of(&self, segment: u64) -> u64 {
        segment / self.segments_per_group
    }

    pub fn offset_of(&self, segment: u64) -> u64 {
        segment * self.segment_len as u64
    }

    pub fn expected_tag(&self, segment: u64) -> u8 {
        tag_for_group(self.group_of(segment))
    }
}

impl Default for StreamLayout {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Verification failures. Offsets are absolute byte positions in the stream.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(
        "tag mismatch in segment {segment} at offset {offset}: expected {expected}, observed {observed}"
    )]
    TagMismatch {
        segment: u64,
        offset: u64,
        expected: u8,
        observed: u8,
    },
    #[error(
        "stream truncated in segment {segment} at offset {offset}: received {received} of {segment_len} bytes"
    )]
    Truncated {
        segment: u64,
        offset: u64,
        received: usize,
        segment_len: usize,
    },
}

/// A segment handed out by [`TaggedStreamEncoder::next_segment`].
#[derive(Debug)]
pub struct Segment<'a> {
    pub index: u64,
    pub group: u64,
    /// This is the last segment of its group.
    pub completes_group: bool,
    pub bytes: &'a [u8],
}

/// Produces the tagged stream one segment at a time from a single reused buffer.
#[derive(Debug)]
pub struct TaggedStreamEncoder {
    layout: StreamLayout,
    total_segments: u64,
    next: u64,
    buf: Vec<u8>,
}

impl TaggedStreamEncoder {
    pub fn new(layout: StreamLayout, groups: u64) -> Self {
        Self {
            layout,
            total_segments: groups * layout.segments_per_group,
            next: 0,
            buf: vec![FILLER; layout.segment_len],
        }
    }

    pub fn next_segment(&mut self) -> Option<Segment<'_>> {
        if self.next >= self.total_segments || self.buf.is_empty() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let group = self.layout.group_of(index);
        self.buf[0] = tag_for_group(group);
        Some(Segment {
            index,
            group,
            completes_group: (index + 1) % self.layout.segments_per_group == 0,
            bytes: &self.buf,
        })
    }

    pub fn segments_emitted(&self) -> u64 {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total_segments
    }
}

/// Checks the tagged stream one segment at a time.
#[derive(Debug)]
pub struct TaggedStreamVerifier {
    layout: StreamLayout,
    total_segments: u64,
    next: u64,
}

impl TaggedStreamVerifier {
    pub fn new(layout: StreamLayout, groups: u64) -> Self {
        Self {
            layout,
            total_segments: groups * layout.segments_per_group,
            next: 0,
        }
    }

    pub fn layout(&self) -> StreamLayout {
        self.layout
    }

    /// Checks the next segment. A slice shorter than a segment means the
    /// stream ended inside it.
    pub fn check(&mut self, segment: &[u8]) -> Result<(), CodecError> {
        let index = self.next;
        let offset = self.layout.offset_of(index);

        if segment.len() < self.layout.segment_len {
            return Err(CodecError::Truncated {
                segment: index,
                offset,
                received: segment.len(),
                segment_len: self.layout.segment_len,
            });
        }

        let expected = self.layout.expected_tag(index);
        let observed = segment[0];
        if observed != expected {
            return Err(CodecError::TagMismatch {
                segment: index,
                offset,
                expected,
                observed,
            });
        }

        self.next += 1;
        Ok(())
    }

    pub fn segments_verified(&self) -> u64 {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total_segments
    }
}
