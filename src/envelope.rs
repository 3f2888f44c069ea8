//! # Payload Encoding
//!
//! Wire encodings for the two opaque blobs the worker carries:
//!
//! - model updates travel inside a [`ModelUpdateEnvelope`], written as a 4 byte
//!   big-endian header length, a JSON header naming the worker, then the raw
//!   update bytes up to the end of the buffer;
//! - global models arrive zlib compressed.
//!
//! Neither payload is interpreted beyond that.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{WorkerError, WorkerResult};

type Header = u32;
const HEADER_SIZE: usize = std::mem::size_of::<Header>();

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeHeader {
    worker_id: Option<String>,
}

/// A model update tagged with the worker that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUpdateEnvelope {
    pub worker_id: Option<String>,
    pub update: Vec<u8>,
}

impl ModelUpdateEnvelope {
    pub fn new(worker_id: Option<String>, update: Vec<u8>) -> Self {
        Self { worker_id, update }
    }

    /// Serialize into a single binary buffer
    pub fn encode(&self) -> WorkerResult<Vec<u8>> {
        let header = serde_json::to_vec(&EnvelopeHeader {
            worker_id: self.worker_id.clone(),
        })?;
        let header_len = Header::try_from(header.len())
            .map_err(|_| WorkerError::envelope_error("header exceeds u32 length"))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + header.len() + self.update.len());
        buf.extend_from_slice(&header_len.to_be_bytes());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.update);
        Ok(buf)
    }

    /// Parse a buffer produced by [`ModelUpdateEnvelope::encode`]
    pub fn decode(buf: &[u8]) -> WorkerResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(WorkerError::envelope_error(format!(
                "buffer of {} bytes is smaller than the {HEADER_SIZE} byte length prefix",
                buf.len()
            )));
        }

        let (len_buf, rest) = buf.split_at(HEADER_SIZE);
        let mut len_bytes = [0u8; HEADER_SIZE];
        len_bytes.copy_from_slice(len_buf);
        let header_len = Header::from_be_bytes(len_bytes) as usize;

        if rest.len() < header_len {
            return Err(WorkerError::envelope_error(format!(
                "declared header of {header_len} bytes but only {} remain",
                rest.len()
            )));
        }

        let (header, update) = rest.split_at(header_len);
        let header: EnvelopeHeader = serde_json::from_slice(header)?;

        Ok(Self {
            worker_id: header.worker_id,
            update: update.to_vec(),
        })
    }
}

/// Zlib-compress a payload the way the coordinator ships global models
pub fn compress(data: &[u8]) -> WorkerResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a zlib-compressed global model
pub fn decompress(data: &[u8]) -> WorkerResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(WorkerError::DecompressionError)?;
    Ok(out)
}
