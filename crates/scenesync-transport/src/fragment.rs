//! Datagram fragmentation
//!
//! Every datagram carries a 12-byte fragment header:
//! - message id: u64
//! - index: u16
//! - count: u16
//!
//! followed by at most `MAX_FRAGMENT_BODY` bytes of the message. All
//! integers little-endian. A message is delivered once every fragment has
//! arrived; losing one loses the whole message.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use scenesync_core::{SceneError, SceneResult};

/// Largest payload that fits in one UDP datagram
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub const FRAGMENT_HEADER_SIZE: usize = 12;

/// Message bytes carried by one fragment
pub const MAX_FRAGMENT_BODY: usize = MAX_DATAGRAM_SIZE - FRAGMENT_HEADER_SIZE;

/// Largest message the transport will split or reassemble
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Partially received messages kept per reassembler
pub const DEFAULT_MAX_PARTIAL: usize = 8;

/// Split `payload` into datagrams tagged with `message_id`
pub fn split(message_id: u64, payload: &[u8]) -> SceneResult<Vec<Bytes>> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(SceneError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    // An empty message still travels as one fragment
    let count = payload.len().div_ceil(MAX_FRAGMENT_BODY).max(1);
    let count = u16::try_from(count).map_err(|_| SceneError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_FRAGMENT_BODY * u16::MAX as usize,
    })?;

    let mut chunks = payload.chunks(MAX_FRAGMENT_BODY);
    let mut datagrams = Vec::with_capacity(count as usize);
    for index in 0..count {
        let chunk = chunks.next().unwrap_or(&[]);
        let mut buf = BytesMut::with_capacity(FRAGMENT_HEADER_SIZE + chunk.len());
        buf.put_u64_le(message_id);
        buf.put_u16_le(index);
        buf.put_u16_le(count);
        buf.put_slice(chunk);
        datagrams.push(buf.freeze());
    }
    Ok(datagrams)
}

struct Partial {
    parts: Vec<Option<Bytes>>,
    received: usize,
    size: usize,
}

/// Collects fragments per sender until messages are complete
///
/// Only the newest `max_partial` incomplete messages are kept; older ones
/// are evicted.
pub struct Reassembler<K> {
    partial: HashMap<(K, u64), Partial>,
    order: VecDeque<(K, u64)>,
    max_partial: usize,
}

impl<K: Copy + Eq + Hash> Reassembler<K> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_PARTIAL)
    }

    pub fn with_capacity(max_partial: usize) -> Self {
        Reassembler {
            partial: HashMap::new(),
            order: VecDeque::new(),
            max_partial: max_partial.max(1),
        }
    }

    /// Incomplete messages currently buffered
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    /// Feed one datagram; returns the message once it is complete
    pub fn accept(&mut self, from: K, datagram: &[u8]) -> SceneResult<Option<Vec<u8>>> {
        if datagram.len() < FRAGMENT_HEADER_SIZE {
            return Err(SceneError::BufferTooShort {
                expected: FRAGMENT_HEADER_SIZE,
                actual: datagram.len(),
            });
        }

        let mut buf = datagram;
        let message_id = buf.get_u64_le();
        let index = buf.get_u16_le() as usize;
        let count = buf.get_u16_le() as usize;
        let body = buf;

        if count == 0 || index >= count {
            return Err(SceneError::InvalidPayload(format!(
                "fragment {} of {}",
                index, count
            )));
        }
        if body.len() > MAX_FRAGMENT_BODY {
            return Err(SceneError::PayloadTooLarge {
                size: body.len(),
                max: MAX_FRAGMENT_BODY,
            });
        }
        if count == 1 {
            return Ok(Some(body.to_vec()));
        }

        let key = (from, message_id);
        if !self.partial.contains_key(&key) {
            self.evict_for_new();
            self.partial.insert(
                key,
                Partial {
                    parts: vec![None; count],
                    received: 0,
                    size: 0,
                },
            );
            self.order.push_back(key);
        }

        let Some(entry) = self.partial.get_mut(&key) else {
            return Ok(None);
        };
        if entry.parts.len() != count {
            self.discard(&key);
            return Err(SceneError::InvalidPayload(format!(
                "fragment count changed mid-message for {:#x}",
                message_id
            )));
        }
        if entry.parts[index].is_some() {
            return Ok(None); // Duplicate fragment
        }

        entry.size += body.len();
        if entry.size > MAX_MESSAGE_SIZE {
            let size = entry.size;
            self.discard(&key);
            return Err(SceneError::PayloadTooLarge {
                size,
                max: MAX_MESSAGE_SIZE,
            });
        }
        entry.parts[index] = Some(Bytes::copy_from_slice(body));
        entry.received += 1;
        if entry.received < count {
            return Ok(None);
        }

        let Some(done) = self.partial.remove(&key) else {
            return Ok(None);
        };
        self.order.retain(|k| *k != key);

        let mut message = Vec::with_capacity(done.size);
        for part in done.parts.into_iter().flatten() {
            message.extend_from_slice(&part);
        }
        Ok(Some(message))
    }

    fn evict_for_new(&mut self) {
        while self.partial.len() >= self.max_partial {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.partial.remove(&oldest).is_some() {
                tracing::debug!(message = oldest.1, "incomplete message evicted");
            }
        }
    }

    fn discard(&mut self, key: &(K, u64)) {
        self.partial.remove(key);
        self.order.retain(|k| k != key);
    }
}

impl<K: Copy + Eq + Hash> Default for Reassembler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_small_message_is_one_fragment() {
        let datagrams = split(7, b"marker").unwrap();
        assert_eq!(datagrams.len(), 1);
        assert_eq!(datagrams[0].len(), FRAGMENT_HEADER_SIZE + 6);

        let mut r = Reassembler::new();
        assert_eq!(r.accept(1u8, &datagrams[0]).unwrap(), Some(b"marker".to_vec()));
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_empty_message() {
        let datagrams = split(1, &[]).unwrap();
        assert_eq!(datagrams.len(), 1);

        let mut r = Reassembler::new();
        assert_eq!(r.accept(1u8, &datagrams[0]).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_large_message_out_of_order_with_duplicates() {
        let payload = message(3 * MAX_FRAGMENT_BODY + 100);
        let datagrams = split(42, &payload).unwrap();
        assert_eq!(datagrams.len(), 4);
        assert!(datagrams.iter().all(|d| d.len() <= MAX_DATAGRAM_SIZE));

        let mut r = Reassembler::new();
        assert_eq!(r.accept(1u8, &datagrams[3]).unwrap(), None);
        assert_eq!(r.accept(1u8, &datagrams[1]).unwrap(), None);
        assert_eq!(r.accept(1u8, &datagrams[1]).unwrap(), None);
        assert_eq!(r.accept(1u8, &datagrams[0]).unwrap(), None);
        assert_eq!(r.pending(), 1);
        assert_eq!(r.accept(1u8, &datagrams[2]).unwrap(), Some(payload));
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_senders_do_not_mix() {
        let a = message(MAX_FRAGMENT_BODY + 1);
        let b: Vec<u8> = message(MAX_FRAGMENT_BODY + 1).iter().map(|v| !v).collect();
        let da = split(5, &a).unwrap();
        let db = split(5, &b).unwrap();

        let mut r = Reassembler::new();
        assert_eq!(r.accept(1u8, &da[0]).unwrap(), None);
        assert_eq!(r.accept(2u8, &db[1]).unwrap(), None);
        assert_eq!(r.accept(2u8, &db[0]).unwrap(), Some(b));
        assert_eq!(r.accept(1u8, &da[1]).unwrap(), Some(a));
    }

    #[test]
    fn test_oldest_incomplete_message_evicted() {
        let payload = message(MAX_FRAGMENT_BODY + 1);
        let mut r = Reassembler::with_capacity(2);

        let first = split(1, &payload).unwrap();
        r.accept(9u8, &first[0]).unwrap();
        r.accept(9u8, &split(2, &payload).unwrap()[0]).unwrap();
        r.accept(9u8, &split(3, &payload).unwrap()[0]).unwrap();
        assert_eq!(r.pending(), 2);

        // The rest of message 1 starts over instead of completing
        assert_eq!(r.accept(9u8, &first[1]).unwrap(), None);
    }

    #[test]
    fn test_malformed_fragments_rejected() {
        let mut r = Reassembler::new();
        assert!(matches!(
            r.accept(1u8, &[0u8; 5]),
            Err(SceneError::BufferTooShort { .. })
        ));

        let mut bad = BytesMut::new();
        bad.put_u64_le(1);
        bad.put_u16_le(3);
        bad.put_u16_le(3);
        assert!(matches!(
            r.accept(1u8, &bad),
            Err(SceneError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_oversize_message_not_split() {
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            split(1, &payload),
            Err(SceneError::PayloadTooLarge { .. })
        ));
    }
}
