//! Device-facing payload shapes.
//!
//! These are the request/response views exchanged with the transport. Binary fields are
//! carried as lowercase hexadecimal strings and numeric amounts as base-10 decimal strings,
//! so no precision is lost across the device boundary.

use crate::session::PassphraseState;
use std::convert::TryFrom;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignScheme {
    Schnorr,
    Ecdsa,
}

/// Signature hash policy. The only supported policy commits to every input and output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SigHashType {
    All,
}

impl SigHashType {
    pub fn value(self) -> u8 { u8::from(self) }
}

impl From<SigHashType> for u8 {
    fn from(sig_hash_type: SigHashType) -> u8 {
        match sig_hash_type {
            SigHashType::All => 0x01,
        }
    }
}

impl TryFrom<u8> for SigHashType {
    type Error = String;

    fn try_from(value: u8) -> Result<SigHashType, Self::Error> {
        match value {
            0x01 => Ok(SigHashType::All),
            other => Err(format!("Unknown sig hash type: {:#x}", other)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub path: String,
    pub show_on_device: bool,
    /// Chain id/prefix, e.g. `kaspa` or `kaspatest`.
    pub prefix: String,
    pub scheme: SignScheme,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAddressParams {
    pub bundle: Vec<AddressRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_state: Option<PassphraseState>,
}

/// A single entry of a device address response. Fields are optional because devices have
/// been observed to omit them; consumers decide whether that is an error.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPrevOutput {
    /// Amount in the chain's smallest unit, base-10 decimal string.
    pub value: String,
    /// Locking script, lowercase hex.
    pub script: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInput {
    /// BIP-32 path of the key owning the spent output.
    pub path: String,
    /// Previous transaction id, lowercase hex.
    pub prev_tx_id: String,
    pub output_index: u32,
    /// Sequence number, base-10 decimal string.
    pub sequence_number: String,
    pub output: RequestPrevOutput,
    pub sig_op_count: u8,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutput {
    pub value: String,
    pub script: String,
    pub script_version: u16,
}

/// The device-facing view of an unsigned transaction.
/// Built fresh for every signing call and never mutated after construction.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    pub version: u16,
    pub inputs: Vec<RequestInput>,
    pub outputs: Vec<RequestOutput>,
    pub lock_time: String,
    pub sig_hash_type: SigHashType,
    pub sig_op_count: u8,
    pub scheme: SignScheme,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_state: Option<PassphraseState>,
}

/// A per-input signature returned by the device. `input_index` is the join key back into
/// the unsigned transaction's input sequence.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSignature {
    pub input_index: u32,
    /// Raw signature bytes, lowercase hex.
    pub signature: String,
    /// Optional hint of the public key the device signed with, lowercase hex.
    #[serde(default)]
    pub public_key: Option<String>,
}
