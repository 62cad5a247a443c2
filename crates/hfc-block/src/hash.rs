//! Canonical block-header hash.
//!
//! The header is encoded as the DER form of
//!
//! ```text
//! SEQUENCE {
//!     number        INTEGER,
//!     previous_hash OCTET STRING,
//!     data_hash     OCTET STRING
//! }
//! ```
//!
//! and hashed with SHA-256. Integers use the minimal two's-complement form,
//! so the encoding is byte-identical to what committing peers compute.

use hfc_types::common::BlockHeader;
use sha2::{Digest, Sha256};

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

/// Returns the DER encoding of `header`.
pub fn header_bytes(header: &BlockHeader) -> Vec<u8> {
    let mut body = Vec::with_capacity(header.previous_hash.len() + header.data_hash.len() + 16);
    write_tlv(&mut body, TAG_INTEGER, &integer_content(header.number));
    write_tlv(&mut body, TAG_OCTET_STRING, &header.previous_hash);
    write_tlv(&mut body, TAG_OCTET_STRING, &header.data_hash);

    let mut out = Vec::with_capacity(body.len() + 4);
    write_tlv(&mut out, TAG_SEQUENCE, &body);
    out
}

/// Returns the SHA-256 block hash of `header`.
pub fn header_hash(header: &BlockHeader) -> Vec<u8> {
    Sha256::digest(header_bytes(header)).to_vec()
}

fn integer_content(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut content = Vec::with_capacity(9);
    if bytes[first] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[first..]);
    content
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_length(out, content.len());
    out.extend_from_slice(content);
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    out.push(0x80 | (bytes.len() - first) as u8);
    out.extend_from_slice(&bytes[first..]);
}
