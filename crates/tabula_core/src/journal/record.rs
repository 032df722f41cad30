//! Journal record types and framing.

use crate::error::{CoreError, CoreResult};
use crate::store::{Mutation, StoreState};
use crate::types::{SequenceNumber, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};

/// Magic bytes opening every journal record.
pub const JOURNAL_MAGIC: [u8; 4] = *b"TJNL";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Type byte of a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JournalRecordType {
    /// A committed transaction.
    Commit = 1,
    /// A full state image.
    Checkpoint = 2,
}

impl JournalRecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Commit),
            2 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A journal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalRecord {
    /// A committed transaction and its mutations, in apply order.
    Commit {
        /// Transaction ID.
        txid: TransactionId,
        /// Sequence number assigned at commit.
        sequence: SequenceNumber,
        /// Commit time.
        timestamp: Timestamp,
        /// Mutations to replay.
        mutations: Vec<Mutation>,
    },
    /// The whole store state as of `sequence`.
    Checkpoint {
        /// Last sequence folded into the image.
        sequence: SequenceNumber,
        /// Store image.
        state: StoreState,
    },
}

impl JournalRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> JournalRecordType {
        match self {
            Self::Commit { .. } => JournalRecordType::Commit,
            Self::Checkpoint { .. } => JournalRecordType::Checkpoint,
        }
    }

    /// Returns the record's sequence number.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        match self {
            Self::Commit { sequence, .. } | Self::Checkpoint { sequence, .. } => *sequence,
        }
    }

    /// Encodes the record with its envelope.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the payload cannot be encoded or exceeds
    /// 4 GiB.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::codec("journal record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes a payload and checks it against the envelope's type byte.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JournalCorruption`] if the payload does not decode
    /// or its variant disagrees with `record_type`.
    pub fn decode_payload(record_type: JournalRecordType, payload: &[u8]) -> CoreResult<Self> {
        let record: Self = ciborium::from_reader(payload)
            .map_err(|e| CoreError::journal_corruption(format!("undecodable payload: {e}")))?;
        if record.record_type() != record_type {
            return Err(CoreError::journal_corruption(format!(
                "payload is {:?} but envelope says {:?}",
                record.record_type(),
                record_type
            )));
        }
        Ok(record)
    }
}

/// Outcome of parsing one frame from a byte buffer.
#[derive(Debug)]
pub(crate) enum Frame {
    /// A complete record and the offset just past it.
    Record(JournalRecord, usize),
    /// The buffer ends inside this frame.
    Truncated,
}

/// Parses the frame starting at `offset`.
pub(crate) fn read_frame(data: &[u8], offset: usize) -> CoreResult<Frame> {
    let Some(header) = data.get(offset..offset + HEADER_SIZE) else {
        return Ok(Frame::Truncated);
    };

    if header[0..4] != JOURNAL_MAGIC {
        return Err(CoreError::journal_corruption(format!(
            "invalid magic at offset {offset}"
        )));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version > JOURNAL_VERSION {
        return Err(CoreError::journal_corruption(format!(
            "unsupported version {version} at offset {offset}"
        )));
    }

    let type_byte = header[6];
    let record_type = JournalRecordType::from_byte(type_byte).ok_or_else(|| {
        CoreError::journal_corruption(format!(
            "unknown record type {type_byte} at offset {offset}"
        ))
    })?;

    let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
    let payload_start = offset + HEADER_SIZE;
    let crc_start = payload_start + len;
    let end = crc_start + CRC_SIZE;
    if end > data.len() {
        return Ok(Frame::Truncated);
    }

    let expected = u32::from_le_bytes([
        data[crc_start],
        data[crc_start + 1],
        data[crc_start + 2],
        data[crc_start + 3],
    ]);
    let actual = compute_crc32(&data[offset..crc_start]);
    if expected != actual {
        return Err(CoreError::ChecksumMismatch { expected, actual });
    }

    let record = JournalRecord::decode_payload(record_type, &data[payload_start..crc_start])?;
    Ok(Frame::Record(record, end))
}

/// Computes the CRC32 (IEEE) of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    !data.iter().fold(0xFFFF_FFFF_u32, |crc, &byte| {
        (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize]
    })
}
