//! The transaction data model and its wire encoding.
//!
//! Inputs and outputs are positional: their order is preserved end-to-end because device
//! signatures are indexed by position.

use crate::hash::{SubnetworkId, H256};
use crate::ser::{serialize, Deserializable, Error, Reader, Serializable, Stream};
use std::io;

/// Maximum supported list size (inputs, outputs) and script/payload length.
pub const MAX_LIST_SIZE: usize = 8192;
pub const MAX_SCRIPT_SIZE: usize = 10_000;
pub const MAX_PAYLOAD_SIZE: usize = 262_144;

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct OutPoint {
    pub transaction_id: H256,
    pub index: u32,
}

impl Serializable for OutPoint {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.transaction_id).append(&self.index);
    }
}

impl Deserializable for OutPoint {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        Ok(OutPoint {
            transaction_id: reader.read()?,
            index: reader.read()?,
        })
    }
}

/// The previous output spent by an input: its amount and locking script.
/// Host-side metadata resolved by the caller; not part of the wire encoding.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: Vec<u8>,
    pub script_version: u16,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionInput {
    pub previous_outpoint: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
    pub utxo_entry: Option<UtxoEntry>,
}

impl Serializable for TransactionInput {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.previous_outpoint);
        stream.append_var_bytes(&self.signature_script);
        stream.append(&self.sequence).append(&self.sig_op_count);
    }
}

impl Deserializable for TransactionInput {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        Ok(TransactionInput {
            previous_outpoint: reader.read()?,
            signature_script: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
            sequence: reader.read()?,
            sig_op_count: reader.read()?,
            utxo_entry: None,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_version: u16,
    pub script_public_key: Vec<u8>,
}

impl Serializable for TransactionOutput {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.value).append(&self.script_version);
        stream.append_var_bytes(&self.script_public_key);
    }
}

impl Deserializable for TransactionOutput {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        Ok(TransactionOutput {
            value: reader.read()?,
            script_version: reader.read()?,
            script_public_key: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn is_fully_signed(&self) -> bool { self.inputs.iter().all(|input| !input.signature_script.is_empty()) }

    pub fn to_hex(&self) -> String { hex::encode(serialize(self)) }
}

impl Serializable for Transaction {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.version);
        stream.append_list(&self.inputs);
        stream.append_list(&self.outputs);
        stream.append(&self.lock_time).append(&self.subnetwork_id).append(&self.gas);
        stream.append_var_bytes(&self.payload);
    }
}

impl Deserializable for Transaction {
    fn deserialize<R: io::Read>(reader: &mut Reader<R>) -> Result<Self, Error> {
        Ok(Transaction {
            version: reader.read()?,
            inputs: reader.read_list(MAX_LIST_SIZE)?,
            outputs: reader.read_list(MAX_LIST_SIZE)?,
            lock_time: reader.read()?,
            subnetwork_id: reader.read()?,
            gas: reader.read()?,
            payload: reader.read_var_bytes(MAX_PAYLOAD_SIZE)?,
        })
    }
}
