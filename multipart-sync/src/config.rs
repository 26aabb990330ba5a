/// Default cap on one part's creation payload (64 KiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Default cap on one encoded frame (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for the sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum creation payload per part, enforced on encode and decode.
    /// Never more than `u32::MAX`, the widest length the wire can carry.
    pub max_payload_len: usize,
    /// Maximum size of one encoded message.
    pub max_message_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SyncConfig {
    /// The payload cap actually enforced: `max_payload_len` clamped to
    /// what the `u32` length prefix can express.
    pub fn effective_max_payload_len(&self) -> usize {
        self.max_payload_len.min(u32::MAX as usize)
    }
}
