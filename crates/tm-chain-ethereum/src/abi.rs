//! Minimal ABI support for the manifesto contract.
//!
//! Only what `pledge()` and `has_pledged(address)` need: selectors, a single
//! address argument, a bool return word, and `Error(string)` revert data.

use anyhow::{Context, Result, anyhow, bail};
use sha3::{Digest, Keccak256};
use tm_api_types::WalletAddress;
use tm_chain_client::ContractFunction;

/// Selector of the solidity `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const WORD: usize = 32;

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `0x`-prefixed calldata for `function`.
pub fn encode_call(function: &ContractFunction) -> Result<String> {
    let mut data = selector(function.signature()).to_vec();
    if let ContractFunction::HasPledged(who) = function {
        data.extend_from_slice(&encode_address(who)?);
    }
    Ok(format!("0x{}", hex::encode(&data)))
}

fn encode_address(address: &WalletAddress) -> Result<[u8; WORD]> {
    if !address.is_well_formed() {
        bail!("malformed address: {address}");
    }
    let raw = from_hex(&address.0)?;
    let mut word = [0_u8; WORD];
    word[WORD - raw.len()..].copy_from_slice(&raw);
    Ok(word)
}

pub fn decode_bool(data: &str) -> Result<bool> {
    let raw = from_hex(data)?;
    if raw.len() != WORD {
        bail!("expected a single 32-byte word, got {} bytes", raw.len());
    }
    if raw[..WORD - 1].iter().any(|byte| *byte != 0) {
        bail!("bool word has non-zero high bytes");
    }
    match raw[WORD - 1] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(anyhow!("invalid bool value {other}")),
    }
}

/// Reason string carried by `Error(string)` revert data, if `data` is one.
pub fn decode_revert_reason(data: &str) -> Option<String> {
    let raw = from_hex(data).ok()?;
    let body = raw.strip_prefix(&ERROR_STRING_SELECTOR[..])?;

    let offset = read_usize(body, 0)?;
    let length = read_usize(body, offset)?;
    let start = offset.checked_add(WORD)?;
    let end = start.checked_add(length)?;
    let bytes = body.get(start..end)?;

    String::from_utf8(bytes.to_vec()).ok()
}

fn read_usize(body: &[u8], at: usize) -> Option<usize> {
    let word = body.get(at..at.checked_add(WORD)?)?;
    // Anything that does not fit in eight bytes cannot index the payload.
    if word[..WORD - 8].iter().any(|byte| *byte != 0) {
        return None;
    }
    let mut tail = [0_u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail)).ok()
}

/// Bytes of a `0x`-prefixed (or bare) hex string.
pub fn from_hex(input: &str) -> Result<Vec<u8>> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(digits).with_context(|| format!("invalid hex string {input:?}"))
}

#[cfg(test)]
pub(crate) fn encode_error_string(reason: &str) -> String {
    let mut data = ERROR_STRING_SELECTOR.to_vec();
    let mut offset = [0_u8; WORD];
    offset[WORD - 1] = 0x20;
    data.extend_from_slice(&offset);
    let mut length = [0_u8; WORD];
    length[WORD - 8..].copy_from_slice(&(reason.len() as u64).to_be_bytes());
    data.extend_from_slice(&length);
    data.extend_from_slice(reason.as_bytes());
    let padding = (WORD - reason.len() % WORD) % WORD;
    data.extend(std::iter::repeat_n(0_u8, padding));
    format!("0x{}", hex::encode(&data))
}
