//! The JSON shape of an unsigned Kaspa transaction as handed over by the wallet's send flow,
//! and its conversion into the chain transaction model.

use kaspa_chain::{Script, SubnetworkId, Transaction, TransactionInput, TransactionOutput, UtxoEntry, H256};
use std::str::FromStr;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KaspaEncodedTx {
    #[serde(default)]
    pub version: u16,
    pub inputs: Vec<EncodedInput>,
    pub outputs: Vec<EncodedOutput>,
    #[serde(default)]
    pub lock_time: u64,
    #[serde(default)]
    pub subnetwork_id: Option<String>,
    #[serde(default)]
    pub gas: u64,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedInput {
    pub prev_tx_id: String,
    pub output_index: u32,
    #[serde(default)]
    pub sequence_number: u64,
    /// The spent output: its amount and locking script.
    pub output: EncodedPrevOutput,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPrevOutput {
    pub satoshis: u64,
    /// Locking script, hex.
    pub script: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedOutput {
    pub satoshis: u64,
    pub script: String,
    #[serde(default)]
    pub script_version: u16,
}

impl KaspaEncodedTx {
    pub fn into_transaction(self) -> Result<Transaction, String> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for (index, input) in self.inputs.into_iter().enumerate() {
            inputs.push(input.into_input(index)?);
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (index, output) in self.outputs.into_iter().enumerate() {
            let script_public_key = hex::decode(&output.script)
                .map_err(|e| format!("Output {}: invalid script hex: {}", index, e))?;
            outputs.push(TransactionOutput {
                value: output.satoshis,
                script_version: output.script_version,
                script_public_key,
            });
        }

        let subnetwork_id = match self.subnetwork_id {
            Some(ref id) => SubnetworkId::from_str(id).map_err(|e| format!("Invalid subnetwork id: {}", e))?,
            None => SubnetworkId::native(),
        };
        let payload = match self.payload {
            Some(ref payload) => hex::decode(payload).map_err(|e| format!("Invalid payload hex: {}", e))?,
            None => Vec::new(),
        };

        Ok(Transaction {
            version: self.version,
            inputs,
            outputs,
            lock_time: self.lock_time,
            subnetwork_id,
            gas: self.gas,
            payload,
        })
    }
}

impl EncodedInput {
    fn into_input(self, index: usize) -> Result<TransactionInput, String> {
        let transaction_id =
            H256::from_str(&self.prev_tx_id).map_err(|e| format!("Input {}: invalid prevTxId: {}", index, e))?;
        let script_public_key =
            hex::decode(&self.output.script).map_err(|e| format!("Input {}: invalid script hex: {}", index, e))?;

        // the declared count of the locking script, with an explicit fallback of 1
        let sig_op_count = match Script::from(script_public_key.clone()).signature_operations() {
            0 => 1,
            count => count as u8,
        };

        Ok(TransactionInput {
            previous_outpoint: kaspa_chain::OutPoint {
                transaction_id,
                index: self.output_index,
            },
            signature_script: Vec::new(),
            sequence: self.sequence_number,
            sig_op_count,
            utxo_entry: Some(UtxoEntry {
                amount: self.output.satoshis,
                script_public_key,
                script_version: 0,
            }),
        })
    }
}
