//! Script inspection and construction for the pay-to-pubkey (Schnorr) script class.

use derive_more::Display;
use secp256k1::XOnlyPublicKey;

pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;

/// Direct pushes of 1..=75 bytes use the length itself as the opcode.
const OP_DATA_32: u8 = 0x20;
const MAX_DIRECT_PUSH: u8 = 0x4b;

pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ScriptError {
    #[display(fmt = "Script is not a pay-to-pubkey script")]
    NotPayToPubkey,
    #[display(fmt = "Invalid x-only public key")]
    InvalidPublicKey,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Script {
    data: Vec<u8>,
}

impl From<Vec<u8>> for Script {
    fn from(data: Vec<u8>) -> Self { Script { data } }
}

impl From<&[u8]> for Script {
    fn from(data: &[u8]) -> Self { Script { data: data.to_vec() } }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] { &self.data }
}

impl Script {
    /// `OP_DATA_32 <x-only pubkey> OP_CHECKSIG`
    pub fn pay_to_pubkey(x_only: &[u8; 32]) -> Script {
        let mut data = Vec::with_capacity(34);
        data.push(OP_DATA_32);
        data.extend_from_slice(x_only);
        data.push(OP_CHECKSIG);
        Script { data }
    }

    /// A signature script spending a pay-to-pubkey output with the Schnorr scheme:
    /// a single push of `signature || hash_type`.
    pub fn schnorr_signature_script(signature: &[u8], hash_type: u8) -> Script {
        let mut data = Vec::with_capacity(signature.len() + 2);
        data.push((signature.len() + 1) as u8);
        data.extend_from_slice(signature);
        data.push(hash_type);
        Script { data }
    }

    pub fn is_pay_to_pubkey(&self) -> bool {
        self.data.len() == 34 && self.data[0] == OP_DATA_32 && self.data[33] == OP_CHECKSIG
    }

    pub fn extract_x_only_pubkey(&self) -> Result<[u8; 32], ScriptError> {
        if !self.is_pay_to_pubkey() {
            return Err(ScriptError::NotPayToPubkey);
        }
        let mut x_only = [0u8; 32];
        x_only.copy_from_slice(&self.data[1..33]);
        Ok(x_only)
    }

    /// Count of the signature operations the script declares. Walks the opcodes and skips
    /// pushed data, so signature-sized pushes are not miscounted as operations.
    pub fn signature_operations(&self) -> usize {
        let mut count = 0;
        let mut i = 0;
        while i < self.data.len() {
            let op = self.data[i];
            i += 1;
            match op {
                1..=MAX_DIRECT_PUSH => i += op as usize,
                OP_PUSHDATA1 => {
                    if i >= self.data.len() {
                        break;
                    }
                    i += 1 + self.data[i] as usize;
                },
                OP_PUSHDATA2 => {
                    if i + 1 >= self.data.len() {
                        break;
                    }
                    let len = u16::from_le_bytes([self.data[i], self.data[i + 1]]) as usize;
                    i += 2 + len;
                },
                OP_PUSHDATA4 => {
                    if i + 3 >= self.data.len() {
                        break;
                    }
                    let len =
                        u32::from_le_bytes([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
                            as usize;
                    i += 4 + len;
                },
                OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
                _ => (),
            }
        }
        count
    }

    pub fn to_vec(&self) -> Vec<u8> { self.data.clone() }

    pub fn into_vec(self) -> Vec<u8> { self.data }
}

/// Recover a full 33-byte public key from the x-only key of a pay-to-pubkey script.
///
/// The even-parity (0x02) prefix is a convention of this chain's script class,
/// not a general rule.
pub fn public_key_from_x(x_only: &[u8; 32]) -> Result<[u8; 33], ScriptError> {
    XOnlyPublicKey::from_slice(x_only).map_err(|_| ScriptError::InvalidPublicKey)?;
    let mut public_key = [0u8; 33];
    public_key[0] = 0x02;
    public_key[1..].copy_from_slice(x_only);
    Ok(public_key)
}
