// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! GELF chunking.
//!
//! # Introduction
//!
//! A GELF message that won't fit in one UDP datagram is split into at most 128 chunks, each
//! carrying a twelve-byte header:
//!
//! ```text
//! +------+------+---------------------------------------+-----+-------+
//! | 0x1e | 0x0f |            message id (8)             | seq | count |
//! +------+------+---------------------------------------+-----+-------+
//! ```
//!
//! followed by a slice of the payload. Graylog collects chunks by message id & reassembles them in
//! sequence-number order once all `count` have arrived (or gives up after five seconds).
//!
//! A message that _does_ fit is sent as-is, without a header; GELF 1.1 only defines the chunk
//! header for chunked messages, and Graylog recognizes a bare payload by its first bytes.
//!
//! # Message Ids
//!
//! All chunks of one message must share an id, and no two messages in flight from one sender may.
//! [`MessageIdStrategy`] offers two ways of getting one:
//!
//! - [`MessageIdStrategy::Timestamp`]: the low 40 bits of the millisecond clock followed by a
//!   24-bit per-process counter. The counter alone guarantees that any 2^24 consecutive messages
//!   from this process get distinct ids, however many land in the same clock tick.
//!
//! - [`MessageIdStrategy::ContentHash`]: the first eight bytes of the payload's SHA-256 digest.
//!   Identical payloads get identical ids, so a re-sent message reassembles into the same one.

use crate::error::{new_backtrace, Error, Result};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::prelude::*;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

/// The two bytes that open every chunk
pub const MAGIC: [u8; 2] = [0x1e, 0x0f];
/// magic (2) + message id (8) + sequence number (1) + sequence count (1)
pub const HEADER_SIZE: usize = 12;
/// GELF caps the number of chunks per message at 128
pub const MAX_CHUNKS: usize = 128;
/// How long Graylog waits for the rest of a chunked message before giving up on it
pub const REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default datagram size, header included
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8192;
/// The largest payload a UDP datagram can carry over IPv4 (65535 less the IP & UDP headers)
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// A chunk size must leave room for the header plus at least one byte of payload, and no datagram
/// may exceed [`MAX_DATAGRAM_SIZE`].
pub(crate) fn check_chunk_size(max_chunk_size: usize) -> Result<()> {
    if max_chunk_size <= HEADER_SIZE || max_chunk_size > MAX_DATAGRAM_SIZE {
        return Err(Error::BadConfig {
            reason: format!(
                "max chunk size must exceed the {}-byte chunk header & be at most {} (got {})",
                HEADER_SIZE, MAX_DATAGRAM_SIZE, max_chunk_size
            ),
            back: new_backtrace(),
        });
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          message ids                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// How to derive the id shared by all chunks of a message
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageIdStrategy {
    /// Current time plus a per-process counter
    #[default]
    Timestamp,
    /// A hash of the payload
    #[serde(alias = "md5", alias = "hash")]
    ContentHash,
}

/// Hands out message ids according to a [`MessageIdStrategy`]; safe to share between threads.
#[derive(Debug)]
pub struct MessageIdGenerator {
    strategy: MessageIdStrategy,
    counter: AtomicU32,
}

impl MessageIdGenerator {
    pub fn new(strategy: MessageIdStrategy) -> MessageIdGenerator {
        // Start each process somewhere different in the counter space, so that two processes on
        // the same host are unlikely to collide within the same millisecond.
        MessageIdGenerator {
            strategy,
            counter: AtomicU32::new(std::process::id().wrapping_mul(2_654_435_761)),
        }
    }
    pub fn strategy(&self) -> MessageIdStrategy {
        self.strategy
    }
    /// Produce an id for a message whose (possibly compressed) payload is `payload`.
    pub fn next_id(&self, payload: &[u8]) -> [u8; 8] {
        match self.strategy {
            MessageIdStrategy::Timestamp => {
                let millis = Utc::now().timestamp_millis() as u64 & 0xff_ffff_ffff;
                let count = self.counter.fetch_add(1, Ordering::Relaxed) as u64 & 0xff_ffff;
                ((millis << 24) | count).to_be_bytes()
            }
            MessageIdStrategy::ContentHash => {
                let digest = Sha256::digest(payload);
                let mut id = [0u8; 8];
                id.copy_from_slice(&digest[..8]);
                id
            }
        }
    }
}

impl std::default::Default for MessageIdGenerator {
    fn default() -> Self {
        MessageIdGenerator::new(MessageIdStrategy::default())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             chunks                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One slice of a chunked GELF message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub message_id: [u8; 8],
    /// zero-based
    pub sequence_number: u8,
    pub sequence_count: u8,
    pub payload: Bytes,
}

impl Chunk {
    /// Lay this chunk out as a datagram: header followed by payload.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&MAGIC);
        buf.put_slice(&self.message_id);
        buf.put_u8(self.sequence_number);
        buf.put_u8(self.sequence_count);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
    /// Parse a datagram as a chunk; `None` if it doesn't carry a well-formed chunk header.
    pub fn decode(datagram: &[u8]) -> Option<Chunk> {
        if datagram.len() < HEADER_SIZE || datagram[..2] != MAGIC {
            return None;
        }
        let (sequence_number, sequence_count) = (datagram[10], datagram[11]);
        if sequence_count == 0
            || sequence_count as usize > MAX_CHUNKS
            || sequence_number >= sequence_count
        {
            return None;
        }
        let mut message_id = [0u8; 8];
        message_id.copy_from_slice(&datagram[2..10]);
        Some(Chunk {
            message_id,
            sequence_number,
            sequence_count,
            payload: Bytes::copy_from_slice(&datagram[HEADER_SIZE..]),
        })
    }
}

/// What a payload turns into on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Datagrams {
    /// Small enough to go as-is
    Single(Bytes),
    /// Split into chunks, in sequence-number order
    Chunked(Vec<Chunk>),
}

impl Datagrams {
    /// The number of datagrams this message will take
    pub fn len(&self) -> usize {
        match self {
            Datagrams::Single(_) => 1,
            Datagrams::Chunked(chunks) => chunks.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The datagrams themselves, ready for the wire
    pub fn encode(&self) -> Vec<Bytes> {
        match self {
            Datagrams::Single(payload) => vec![payload.clone()],
            Datagrams::Chunked(chunks) => chunks.iter().map(Chunk::encode).collect(),
        }
    }
}

/// Splits payloads into datagrams no larger than `max_chunk_size` bytes.
#[derive(Debug)]
pub struct Chunker {
    max_chunk_size: usize,
    ids: MessageIdGenerator,
}

impl Chunker {
    /// `max_chunk_size` is the largest datagram to produce, header included; it must leave room
    /// for at least one byte of payload & fit in a UDP datagram.
    pub fn new(max_chunk_size: usize, strategy: MessageIdStrategy) -> Result<Chunker> {
        check_chunk_size(max_chunk_size)?;
        Ok(Chunker {
            max_chunk_size,
            ids: MessageIdGenerator::new(strategy),
        })
    }
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }
    pub fn ids(&self) -> &MessageIdGenerator {
        &self.ids
    }
    /// Split `payload`.
    ///
    /// Fails with [`Error::Oversize`] if that would take more than [`MAX_CHUNKS`] chunks; the
    /// message can't be sent, and truncating it would corrupt it.
    pub fn chunk(&self, payload: Bytes) -> Result<Datagrams> {
        if payload.len() + HEADER_SIZE <= self.max_chunk_size {
            return Ok(Datagrams::Single(payload));
        }
        let body = self.max_chunk_size - HEADER_SIZE;
        let count = (payload.len() + body - 1) / body;
        if count > MAX_CHUNKS {
            return Err(Error::Oversize {
                len: payload.len(),
                chunks: count,
                back: new_backtrace(),
            });
        }
        let message_id = self.ids.next_id(&payload);
        Ok(Datagrams::Chunked(
            (0..count)
                .map(|i| Chunk {
                    message_id,
                    sequence_number: i as u8,
                    sequence_count: count as u8,
                    payload: payload.slice(i * body..std::cmp::min((i + 1) * body, payload.len())),
                })
                .collect(),
        ))
    }
}

impl std::default::Default for Chunker {
    fn default() -> Self {
        Chunker {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            ids: MessageIdGenerator::default(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          reassembly                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The receiving side of the chunking protocol: collects chunks by message id & hands back each
/// message once all of its chunks have arrived, in whatever order they came.
///
/// Like Graylog, it gives up on a message whose chunks haven't all arrived within a timeout
/// ([`REASSEMBLY_TIMEOUT`] by default) of its first.
#[derive(Debug)]
pub struct Reassembler {
    timeout: Duration,
    pending: HashMap<[u8; 8], (Instant, Vec<Option<Bytes>>)>,
}

impl std::default::Default for Reassembler {
    fn default() -> Self {
        Reassembler::with_timeout(REASSEMBLY_TIMEOUT)
    }
}

impl Reassembler {
    pub fn new() -> Reassembler {
        Reassembler::default()
    }
    pub fn with_timeout(timeout: Duration) -> Reassembler {
        Reassembler {
            timeout,
            pending: HashMap::new(),
        }
    }
    /// Feed one datagram. Returns the complete payload if this datagram finished a message (or
    /// wasn't chunked in the first place).
    pub fn push(&mut self, datagram: &[u8]) -> Option<Vec<u8>> {
        let chunk = match Chunk::decode(datagram) {
            Some(chunk) => chunk,
            None => return Some(datagram.to_vec()),
        };
        let timeout = self.timeout;
        self.pending.retain(|_, (started, _)| started.elapsed() <= timeout);
        let (_, slots) = self
            .pending
            .entry(chunk.message_id)
            .or_insert_with(|| (Instant::now(), vec![None; chunk.sequence_count as usize]));
        // A chunk disagreeing with its siblings about the count is garbage
        if slots.len() != chunk.sequence_count as usize {
            return None;
        }
        slots[chunk.sequence_number as usize] = Some(chunk.payload);
        if slots.iter().all(Option::is_some) {
            self.pending.remove(&chunk.message_id).map(|(_, slots)| {
                slots
                    .into_iter()
                    .flatten()
                    .fold(Vec::new(), |mut acc, part| {
                        acc.extend_from_slice(&part);
                        acc
                    })
            })
        } else {
            None
        }
    }
    /// The number of messages still waiting on chunks
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
