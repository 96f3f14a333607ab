// THEORY (Group/Lock Byte Codec):
// The `channel_codec` module is the most fundamental unit of the metadata engine.
// It defines the value model shared by every map in the system: a 4-bit group ID
// (0-15) and a 1-bit lock flag, each persisted as one grayscale byte per pixel.
// Anything that needs more than a single byte (buffers, summaries, layers)
// belongs in higher modules like `sampler` and `summarizer`.
//
// The write path and the read path are deliberately asymmetric:
// - Writing is strict. Group IDs are clamped into [0, 15] before they ever touch
//   a pixel, and lock flags become exactly 0 or 255. The engine only ever emits
//   canonical bytes.
// - Reading is tolerant. Stored maps may have passed through editors or scaling
//   tools that stretched the compact 0-15 bytes across the full 0-255 range
//   (group g painted as g * 17, since 255 / 15 = 17). A byte at or below 15 is
//   taken at face value; anything above is requantized by rounding value / 17
//   and clamping back into range. Lock bytes decode with a midpoint threshold,
//   so a washed-out 200 still reads as locked and a near-black 40 reads as
//   unlocked.
//
// Key architectural principles:
// 1.  **Single-byte scope**: Every function here maps one byte (or one flag) at
//     a time. No buffers, no dimensions, no I/O.
// 2.  **Clamping, never erroring**: Out-of-range input on the write path is a
//     host bug we absorb, not a failure we surface. Both ends of the toolchain
//     quantize identically, so clamped writes stay round-trippable.
// 3.  **Tolerant reads**: The dual interpretation keeps maps readable after
//     third-party edits without any format negotiation.

pub mod channel_codec {
    pub type Byte = u8;
    pub type GroupId = u8;

    /// Highest addressable group ID; group maps carry 4 bits of information.
    pub const GROUP_ID_MAX: GroupId = 15;
    /// Number of distinct group buckets (IDs 0 through 15).
    pub const GROUP_COUNT: usize = 16;
    /// Quantization step for full-range group bytes: 255 / 15.
    pub const GROUP_STEP: f64 = 17.0;
    /// Canonical byte for a locked pixel.
    pub const LOCKED_BYTE: Byte = 255;
    /// Canonical byte for an unlocked pixel.
    pub const UNLOCKED_BYTE: Byte = 0;
    /// Read-path midpoint: bytes at or above this decode as locked.
    pub const LOCK_THRESHOLD: Byte = 128;

    /// Clamps a host-supplied group value into [0, 15] and returns the
    /// canonical map byte. Negative input saturates to 0, oversized input
    /// to 15.
    pub fn encode_group(raw: i64) -> Byte {
        raw.clamp(0, GROUP_ID_MAX as i64) as Byte
    }

    /// Returns the canonical lock-map byte for a lock flag: 255 when locked,
    /// 0 when not.
    pub fn encode_lock(locked: bool) -> Byte {
        if locked { LOCKED_BYTE } else { UNLOCKED_BYTE }
    }

    /// Interprets a stored group-map byte as a group ID.
    ///
    /// Bytes in the compact range [0, 15] are identity-mapped. Anything above
    /// is treated as a full-range byte and requantized: round(value / 17),
    /// clamped into [0, 15].
    pub fn decode_group(value: Byte) -> GroupId {
        if value <= GROUP_ID_MAX {
            return value;
        }
        let quantized = (value as f64 / GROUP_STEP).round() as i64;
        quantized.clamp(0, GROUP_ID_MAX as i64) as GroupId
    }

    /// Interprets a stored lock-map byte: values at or above 128 are locked.
    pub fn decode_lock(value: Byte) -> bool {
        value >= LOCK_THRESHOLD
    }
}


// -----------------------------------------------------------------------------
// Glossary: Map Byte Forms
//
// - Compact byte: A group ID stored verbatim (0-15). What this engine writes.
//   Nearly black when viewed, which is why hosts overlay the map at reduced
//   opacity rather than displaying it raw.
//
// - Full-range byte: A group ID stretched across 0-255 for visibility
//   (g * 17). Produced by external paint tools; never written here, always
//   accepted on read.
//
// - Lock byte: 0 or 255 when written by this engine. Read with a >= 128
//   threshold so antialiased or levels-adjusted edits still classify cleanly.
