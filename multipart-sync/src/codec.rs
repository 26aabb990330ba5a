//! Byte codec for sync messages.
//!
//! Every frame is `[tag: u8][body]`, big-endian throughout:
//!
//! | message  | body                                  |
//! |----------|---------------------------------------|
//! | snapshot | `[count: u8][count × descriptor]`     |
//! | add      | `[descriptor]`                        |
//! | remove   | `[index: u8]`                         |
//! | redraw   | (empty)                               |
//!
//! A descriptor is `[type_id_len: u8][type_id: utf8][payload_len: u32][payload]`.
//! A frame must be consumed exactly; leftover bytes are a protocol error.

use crate::config::SyncConfig;
use crate::error::{ProtocolError, SyncError, SyncResult};
use crate::protocol::{
    MAX_SNAPSHOT_PARTS, SyncMessage, TAG_ADD, TAG_REDRAW, TAG_REMOVE, TAG_SNAPSHOT,
};
use multipart_core::PartDescriptor;
use multipart_types::PartTypeId;

/// Encodes a message into one frame.
pub fn encode(message: &SyncMessage, config: &SyncConfig) -> SyncResult<Vec<u8>> {
    let mut buf = vec![message.tag()];
    match message {
        SyncMessage::Snapshot(parts) => {
            if parts.len() > MAX_SNAPSHOT_PARTS {
                return Err(ProtocolError::TooManyParts(parts.len()).into());
            }
            buf.push(parts.len() as u8);
            for descriptor in parts {
                write_descriptor(&mut buf, descriptor, config)?;
            }
        }
        SyncMessage::Add(descriptor) => write_descriptor(&mut buf, descriptor, config)?,
        SyncMessage::Remove(index) => buf.push(*index),
        SyncMessage::Redraw => {}
    }

    if buf.len() > config.max_message_size {
        return Err(SyncError::MessageTooLarge {
            len: buf.len(),
            max: config.max_message_size,
        });
    }
    Ok(buf)
}

fn write_descriptor(
    buf: &mut Vec<u8>,
    descriptor: &PartDescriptor,
    config: &SyncConfig,
) -> SyncResult<()> {
    let payload_len = descriptor.payload.len();
    let max = config.effective_max_payload_len();
    let too_large = SyncError::PayloadTooLarge {
        len: payload_len,
        max,
    };
    if payload_len > max {
        return Err(too_large);
    }
    let wire_len = u32::try_from(payload_len).map_err(|_| too_large)?;

    // Type ids are validated to fit the length byte.
    let type_id = descriptor.part_type.as_str().as_bytes();
    buf.push(type_id.len() as u8);
    buf.extend_from_slice(type_id);
    buf.extend_from_slice(&wire_len.to_be_bytes());
    buf.extend_from_slice(&descriptor.payload);
    Ok(())
}

/// Decodes one frame.
pub fn decode(frame: &[u8], config: &SyncConfig) -> SyncResult<SyncMessage> {
    if frame.len() > config.max_message_size {
        return Err(SyncError::MessageTooLarge {
            len: frame.len(),
            max: config.max_message_size,
        });
    }

    let mut reader = Reader::new(frame);
    let message = match reader.u8()? {
        TAG_SNAPSHOT => {
            let count = reader.u8()? as usize;
            let mut parts = Vec::with_capacity(count);
            for _ in 0..count {
                parts.push(reader.descriptor(config)?);
            }
            SyncMessage::Snapshot(parts)
        }
        TAG_ADD => SyncMessage::Add(reader.descriptor(config)?),
        TAG_REMOVE => SyncMessage::Remove(reader.u8()?),
        TAG_REDRAW => SyncMessage::Redraw,
        tag => return Err(ProtocolError::UnknownTag(tag).into()),
    };

    match reader.remaining() {
        0 => Ok(message),
        extra => Err(ProtocolError::TrailingBytes(extra).into()),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    fn descriptor(&mut self, config: &SyncConfig) -> SyncResult<PartDescriptor> {
        let type_len = self.u8()? as usize;
        let raw = self.take(type_len)?;
        let part_type = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| PartTypeId::new(s).ok())
            .ok_or_else(|| ProtocolError::InvalidTypeId(String::from_utf8_lossy(raw).into_owned()))?;

        let payload_len = self.u32()? as usize;
        if payload_len > config.effective_max_payload_len() {
            return Err(SyncError::PayloadTooLarge {
                len: payload_len,
                max: config.effective_max_payload_len(),
            });
        }
        let payload = self.take(payload_len)?.to_vec();
        Ok(PartDescriptor::new(part_type, payload))
    }
}
