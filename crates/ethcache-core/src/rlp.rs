//! RLP batch codec for transaction-hash lists.
//!
//! Clients pack many hashes into one request parameter as a hex-encoded RLP
//! list of byte strings. Decoding is strict: the top-level item must be a
//! list, every element must be a byte string (no nesting), length prefixes
//! must be minimal, and no bytes may remain after the list.

use crate::error::CoreError;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a list of hash strings as a hex-encoded RLP list of byte strings.
///
/// Used by clients building batch parameters and by the round-trip tests;
/// the decoder below accepts exactly this encoding.
pub fn encode_hash_list<S: AsRef<str>>(hashes: &[S]) -> String {
    let encoded_items: Vec<Vec<u8>> = hashes
        .iter()
        .map(|hash| encode_bytes(hash.as_ref().as_bytes()))
        .collect();
    let payload_len: usize = encoded_items.iter().map(Vec::len).sum();

    let mut out = Vec::with_capacity(payload_len + 9);
    if payload_len < 56 {
        out.push(0xc0 + payload_len as u8);
    } else {
        let len_bytes = encode_length(payload_len);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    for encoded in encoded_items {
        out.extend(encoded);
    }
    hex::encode(out)
}

/// RLP-encode a byte slice as a string item.
fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        vec![data[0]]
    } else if data.len() < 56 {
        let mut out = vec![0x80 + data.len() as u8];
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = encode_length(data.len());
        let mut out = vec![0xb7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// Encode a length as minimal big-endian bytes.
fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a hex-encoded RLP list of byte strings into UTF-8 hash strings.
///
/// Pure and synchronous. Order is preserved exactly.
pub fn decode_hash_list(rlp_hex: &str) -> Result<Vec<String>, CoreError> {
    let stripped = rlp_hex.strip_prefix("0x").unwrap_or(rlp_hex);
    let bytes =
        hex::decode(stripped).map_err(|e| CoreError::Decode(format!("invalid batch hex: {e}")))?;

    let (items, consumed) = decode_list(&bytes)?;
    if consumed != bytes.len() {
        return Err(CoreError::Decode(format!(
            "{} trailing bytes after batch list",
            bytes.len() - consumed
        )));
    }

    items
        .into_iter()
        .map(|raw| {
            String::from_utf8(raw)
                .map_err(|e| CoreError::Decode(format!("batch item is not UTF-8: {e}")))
        })
        .collect()
}

/// Decode the top-level list, returning its items and the number of bytes
/// consumed from `bytes`.
fn decode_list(bytes: &[u8]) -> Result<(Vec<Vec<u8>>, usize), CoreError> {
    let first = *bytes
        .first()
        .ok_or_else(|| CoreError::Decode("empty batch payload".to_string()))?;

    let (payload_start, payload_len) = match first {
        0xc0..=0xf7 => (1, usize::from(first - 0xc0)),
        0xf8..=0xff => {
            let len_of_len = usize::from(first - 0xf7);
            let payload_len = read_long_length(bytes, 1, len_of_len)?;
            (1 + len_of_len, payload_len)
        }
        _ => return Err(CoreError::Decode("top-level item is not a list".to_string())),
    };

    let end = payload_start
        .checked_add(payload_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| CoreError::Decode("truncated list payload".to_string()))?;

    let mut items = Vec::new();
    let mut pos = payload_start;
    while pos < end {
        let (item, next) = decode_string_item(bytes, pos, end)?;
        items.push(item);
        pos = next;
    }
    Ok((items, end))
}

/// Decode one byte-string item starting at `pos`, bounded by the enclosing
/// list's `end`. Nested lists are rejected.
fn decode_string_item(
    bytes: &[u8],
    pos: usize,
    end: usize,
) -> Result<(Vec<u8>, usize), CoreError> {
    match bytes[pos] {
        byte @ 0x00..=0x7f => Ok((vec![byte], pos + 1)),
        prefix @ 0x80..=0xb7 => {
            let len = usize::from(prefix - 0x80);
            let start = pos + 1;
            let data = take_payload(bytes, start, len, end)?;
            if len == 1 && data[0] < 0x80 {
                return Err(CoreError::Decode(
                    "non-canonical single-byte encoding".to_string(),
                ));
            }
            Ok((data.to_vec(), start + len))
        }
        prefix @ 0xb8..=0xbf => {
            let len_of_len = usize::from(prefix - 0xb7);
            let len = read_long_length(bytes, pos + 1, len_of_len)?;
            let start = pos + 1 + len_of_len;
            let data = take_payload(bytes, start, len, end)?;
            Ok((data.to_vec(), start + len))
        }
        _ => Err(CoreError::Decode("nested list in batch".to_string())),
    }
}

/// Read a multi-byte length field, enforcing the canonical form: no leading
/// zero and a value that actually required the long encoding.
fn read_long_length(bytes: &[u8], pos: usize, len_of_len: usize) -> Result<usize, CoreError> {
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(CoreError::Decode("length field too wide".to_string()));
    }
    let field = bytes
        .get(pos..pos + len_of_len)
        .ok_or_else(|| CoreError::Decode("truncated length field".to_string()))?;
    if field[0] == 0 {
        return Err(CoreError::Decode("length field has leading zero".to_string()));
    }
    let len = field.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    if len < 56 {
        return Err(CoreError::Decode("non-minimal length encoding".to_string()));
    }
    Ok(len)
}

fn take_payload<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
    end: usize,
) -> Result<&'a [u8], CoreError> {
    start
        .checked_add(len)
        .filter(|&item_end| item_end <= end)
        .and_then(|item_end| bytes.get(start..item_end))
        .ok_or_else(|| CoreError::Decode("truncated string payload".to_string()))
}

// =============================================================================
// Tests
// =============================================================================
