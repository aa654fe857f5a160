//! Voice packet wire format
//!
//! Every voice datagram starts with a packed 12-byte little-endian header
//! followed by one Opus-encoded mono 10 ms frame:
//!
//! ```text
//! offset  size  field
//!      0     4  packet_type (1 = voice)
//!      4     4  sender_avatar_id (low 32 bits of the avatar UID)
//!      8     4  sequence_number (monotonic per stream)
//!     12   var  encoded payload
//! ```

use bytes::{Buf, BufMut};

/// Packet type for voice frames.
pub const PACKET_TYPE_VOICE: u32 = 1;

/// Size of the voice packet header in bytes.
pub const VOICE_HEADER_LEN: usize = 12;

/// Parsed voice packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHeader {
    pub packet_type: u32,
    pub sender_avatar_id: u32,
    pub sequence_number: u32,
}

impl VoiceHeader {
    /// Parse a header from the front of a datagram. Returns `None` if the
    /// datagram is shorter than [`VOICE_HEADER_LEN`].
    pub fn parse(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < VOICE_HEADER_LEN {
            return None;
        }
        Some(Self {
            packet_type: buf.get_u32_le(),
            sender_avatar_id: buf.get_u32_le(),
            sequence_number: buf.get_u32_le(),
        })
    }
}

/// Read just the packet type from the front of a datagram. Needs at least
/// 4 bytes.
pub fn packet_type(mut buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    Some(buf.get_u32_le())
}

/// Build a complete voice packet into `out` (cleared first): header
/// followed by the encoded payload.
pub fn write_voice_packet(out: &mut Vec<u8>, sender_avatar_id: u32, sequence_number: u32, payload: &[u8]) {
    out.clear();
    out.reserve(VOICE_HEADER_LEN + payload.len());
    out.put_u32_le(PACKET_TYPE_VOICE);
    out.put_u32_le(sender_avatar_id);
    out.put_u32_le(sequence_number);
    out.extend_from_slice(payload);
}
