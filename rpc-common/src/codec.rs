//! # Framed Codec
//!
//! Purpose: the single wire contract shared by client, server, and proxy —
//! a 4-byte big-endian length prefix followed by that many bytes of
//! schema-serialized payload.
//!
//! ## Design Principles
//! 1. **One Write, One Syscall**: the length prefix and payload are
//!    assembled into a single contiguous buffer before writing, so
//!    concurrent writers on a shared connection can never interleave a
//!    partial frame.
//! 2. **Bounded Allocation**: a frame length above [`MAX_FRAME_LEN`] is
//!    rejected before any buffer is allocated for it.
//! 3. **Symmetric Request Framing, Asymmetric Response Framing**: requests
//!    and proxy-inbound messages are length-prefixed; responses are not —
//!    this mirrors the original protocol's raw-`recv` response path (see
//!    `original_source/rpcserver/src/rpc/rpcchannel.cc`) and is preserved
//!    deliberately rather than "fixed", per the specification's open
//!    question on wire compatibility.

use std::io::{self, Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::RpcError;

/// Maximum accepted frame length, in bytes. Bounds allocation on read.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Maximum bytes read for an unframed response, matching the original
/// protocol's fixed `recv_buf[1024]`.
pub const MAX_RESPONSE_LEN: usize = 1024;

const LENGTH_PREFIX_LEN: usize = 4;

/// Serializes `value` with the assumed schema-serialization facility.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
    bincode::serialize(value).map_err(|e| RpcError::protocol(format!("serialize failed: {e}")))
}

/// Deserializes a payload previously produced by [`encode_payload`].
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    bincode::deserialize(bytes).map_err(|e| RpcError::invalid_response(format!("parse failed: {e}")))
}

/// Assembles a length-prefixed frame: `u32 be length | payload`.
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>, RpcError> {
    if payload.len() as u64 > MAX_FRAME_LEN as u64 {
        return Err(RpcError::protocol(format!(
            "frame too large: {} bytes",
            payload.len()
        )));
    }
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes a length-prefixed frame carrying `payload` in a single `write_all`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError> {
    let frame = build_frame(payload)?;
    writer
        .write_all(&frame)
        .map_err(|e| RpcError::network(format!("write failed: {e}")))
}

/// Reads one length-prefixed frame's payload.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, RpcError> {
    let mut len_buf = [0u8; LENGTH_PREFIX_LEN];
    read_exact_mapped(reader, &mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(RpcError::protocol(format!("frame too large: {len} bytes")));
    }
    let mut payload = vec![0u8; len as usize];
    read_exact_mapped(reader, &mut payload)?;
    Ok(payload)
}

/// Reads an unframed response, matching the original protocol's single
/// fixed-size `recv` (see [`MAX_RESPONSE_LEN`]).
pub fn read_response_raw<R: Read>(reader: &mut R) -> Result<Vec<u8>, RpcError> {
    let mut buf = vec![0u8; MAX_RESPONSE_LEN];
    let n = reader
        .read(&mut buf)
        .map_err(|e| RpcError::network(format!("read failed: {e}")))?;
    buf.truncate(n);
    Ok(buf)
}

fn read_exact_mapped<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), RpcError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && buf.len() == LENGTH_PREFIX_LEN => {
            Err(RpcError::protocol("fewer than 4 bytes available for length prefix"))
        }
        Err(e) => Err(RpcError::network(format!("read failed: {e}"))),
    }
}

#[cfg(feature = "async-codec")]
pub mod asyncio {
    //! Async counterparts used by the Tokio-based server and proxy. The wire
    //! contract is identical to the synchronous functions above; only the
    //! I/O trait bounds differ.
    use super::*;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError> {
        let frame = build_frame(payload)?;
        writer
            .write_all(&frame)
            .await
            .map_err(|e| RpcError::network(format!("write failed: {e}")))
    }

    /// Writes an unframed response, matching [`super::read_response_raw`].
    pub async fn write_response_raw<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError> {
        writer
            .write_all(payload)
            .await
            .map_err(|e| RpcError::network(format!("write failed: {e}")))
    }

    pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, RpcError> {
        let mut len_buf = [0u8; LENGTH_PREFIX_LEN];
        reader.read_exact(&mut len_buf).await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                RpcError::protocol("fewer than 4 bytes available for length prefix")
            } else {
                RpcError::network(format!("read failed: {e}"))
            }
        })?;
        let len = u32::from_be_bytes(len_buf);
        if len > MAX_FRAME_LEN {
            return Err(RpcError::protocol(format!("frame too large: {len} bytes")));
        }
        let mut payload = vec![0u8; len as usize];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| RpcError::network(format!("read failed: {e}")))?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_arbitrary_payloads() {
        for len in [0usize, 1, 4, 1023, 1024, 1025, 65536] {
            let payload = vec![0xABu8; len];
            let frame = build_frame(&payload).unwrap();
            let mut cursor = Cursor::new(frame);
            let read_back = read_frame(&mut cursor).unwrap();
            assert_eq!(read_back, payload);
        }
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut oversized = Vec::new();
        oversized.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let mut cursor = Cursor::new(oversized);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ProtocolError);
    }

    #[test]
    fn fails_on_short_length_prefix() {
        let mut cursor = Cursor::new(vec![0u8; 2]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ProtocolError);
    }

    #[test]
    fn write_read_is_single_contiguous_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        assert_eq!(&buf[0..4], &5u32.to_be_bytes());
        assert_eq!(&buf[4..], b"hello");
    }

    #[test]
    fn response_read_truncates_to_1024() {
        let payload = vec![1u8; 2048];
        let mut cursor = Cursor::new(payload);
        let read = read_response_raw(&mut cursor).unwrap();
        assert_eq!(read.len(), MAX_RESPONSE_LEN);
    }
}
