use primitive_types::U256;

use crate::error::{CoreError, RpcError};

use super::super::types::{RpcReceipt, RpcTransaction};

pub(super) fn parse_transaction(
    raw: serde_json::Value,
) -> Result<Option<RpcTransaction>, CoreError> {
    if raw.is_null() {
        return Ok(None);
    }

    let hash = parse_str_required(raw.get("hash"), "hash")?;
    let block_hash = parse_str_optional(raw.get("blockHash"));
    let block_number = parse_quantity_optional(raw.get("blockNumber"), "blockNumber")?;
    let from = parse_str_required(raw.get("from"), "from")?;
    let to = parse_str_optional(raw.get("to"));
    let input = parse_str_required(raw.get("input"), "input")?;
    let value = parse_wei(raw.get("value"), "value")?;

    Ok(Some(RpcTransaction {
        hash,
        block_hash,
        block_number,
        from,
        to,
        input,
        value,
    }))
}

pub(super) fn parse_receipt(raw: serde_json::Value) -> Result<Option<RpcReceipt>, CoreError> {
    if raw.is_null() {
        return Ok(None);
    }

    let contract_address = parse_str_optional(raw.get("contractAddress"));
    let logs_count = raw
        .get("logs")
        .and_then(serde_json::Value::as_array)
        .map(|logs| logs.len() as i64)
        .unwrap_or(0);

    Ok(Some(RpcReceipt {
        contract_address,
        logs_count,
    }))
}

fn parse_str_required(
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<String, CoreError> {
    value
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| invalid(format!("missing {field}")))
}

fn parse_str_optional(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

/// Parse an optional `0x`-prefixed hex quantity into an integer.
/// JSON `null` (pending transactions) maps to `None`.
fn parse_quantity_optional(
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<Option<i64>, CoreError> {
    let Some(text) = value.and_then(serde_json::Value::as_str) else {
        return Ok(None);
    };
    let digits = strip_quantity_prefix(text, field)?;
    let parsed = u64::from_str_radix(digits, 16)
        .map_err(|e| invalid(format!("invalid {field} quantity `{text}`: {e}")))?;
    i64::try_from(parsed)
        .map(Some)
        .map_err(|_| invalid(format!("{field} out of range: {text}")))
}

/// Parse a wei hex quantity into a decimal string without precision loss.
/// Values routinely exceed 64-bit range, so the conversion goes through
/// a 256-bit integer.
fn parse_wei(value: Option<&serde_json::Value>, field: &str) -> Result<String, CoreError> {
    let text = value
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| invalid(format!("missing {field}")))?;
    let digits = strip_quantity_prefix(text, field)?;
    // Quantities use minimal hex, so odd digit counts are routine;
    // `from_str_radix` parses per digit and `Display` renders decimal.
    let parsed = U256::from_str_radix(digits, 16)
        .map_err(|e| invalid(format!("invalid {field} quantity `{text}`: {e}")))?;
    Ok(parsed.to_string())
}

fn strip_quantity_prefix<'a>(text: &'a str, field: &str) -> Result<&'a str, CoreError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Err(invalid(format!("empty {field} quantity")));
    }
    Ok(digits)
}

fn invalid(message: String) -> CoreError {
    CoreError::Rpc(RpcError::InvalidResponse(message))
}
