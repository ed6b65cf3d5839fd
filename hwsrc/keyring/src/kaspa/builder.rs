//! The two pure operations around the device round-trip: restructuring an unsigned
//! transaction into the device signing request, and reassembling the device's per-input
//! signatures into a broadcastable raw transaction.

use crate::error::{KeyringError, KeyringResult};
use hw_common::payloads::{InputSignature, RequestInput, RequestOutput, RequestPrevOutput, SigHashType, SignScheme,
                          SigningRequest};
use hw_device::error::DeviceError;
use hw_err_handle::prelude::*;
use kaspa_chain::{public_key_from_x, Script, Transaction, SCHNORR_SIGNATURE_SIZE};

/// Output script version is fixed at 0 for the supported script class.
const OUTPUT_SCRIPT_VERSION: u16 = 0;

fn malformed<T>(message: String) -> KeyringResult<T> {
    TracedError::err(KeyringError::Hardware(DeviceError::MalformedDeviceResponse(message)))
}

/// Restructure an unsigned transaction into the shape the device expects.
///
/// Binary fields are carried as lowercase hex, numeric amounts as decimal strings.
/// The signature policy is fixed: sign-all hash type and the Schnorr scheme.
pub fn build_signing_request(transaction: &Transaction, path: &str, prefix: &str) -> KeyringResult<SigningRequest> {
    let mut inputs = Vec::with_capacity(transaction.inputs.len());
    for (index, input) in transaction.inputs.iter().enumerate() {
        let utxo = input
            .utxo_entry
            .as_ref()
            .or_traced(|| KeyringError::InvalidEncodedTx(format!("Input {} is missing the spent output data", index)))?;

        // the declared count of the locking script, with an explicit fallback of 1
        let sig_op_count = match Script::from(utxo.script_public_key.clone()).signature_operations() {
            0 => 1,
            count => count as u8,
        };

        inputs.push(RequestInput {
            path: path.to_owned(),
            prev_tx_id: input.previous_outpoint.transaction_id.to_hex(),
            output_index: input.previous_outpoint.index,
            sequence_number: input.sequence.to_string(),
            output: RequestPrevOutput {
                value: utxo.amount.to_string(),
                script: hex::encode(&utxo.script_public_key),
            },
            sig_op_count,
        });
    }

    let outputs = transaction
        .outputs
        .iter()
        .map(|output| RequestOutput {
            value: output.value.to_string(),
            script: hex::encode(&output.script_public_key),
            script_version: OUTPUT_SCRIPT_VERSION,
        })
        .collect();

    Ok(SigningRequest {
        version: transaction.version,
        inputs,
        outputs,
        lock_time: transaction.lock_time.to_string(),
        sig_hash_type: SigHashType::All,
        sig_op_count: 1,
        scheme: SignScheme::Schnorr,
        prefix: prefix.to_owned(),
        passphrase_state: None,
    })
}

/// Attach the device's per-input signatures and serialize the result.
///
/// `input_index` joins each signature to the input sequence; an out-of-range or duplicate
/// index is a device contract violation. Every input must end up signed, or the transaction
/// is rejected rather than emitted partially signed.
pub fn assemble_signed_transaction(mut transaction: Transaction, signatures: &[InputSignature]) -> KeyringResult<String> {
    let inputs_count = transaction.inputs.len();
    for signature in signatures {
        let index = signature.input_index as usize;
        let input = match transaction.inputs.get_mut(index) {
            Some(input) => input,
            None => {
                return malformed(format!(
                    "Received a signature of unknown transaction input: {}. Number of inputs: {}",
                    index, inputs_count
                ))
            },
        };
        if !input.signature_script.is_empty() {
            return malformed(format!("Received a duplicate signature for input {}", index));
        }

        let utxo = input
            .utxo_entry
            .as_ref()
            .or_traced(|| KeyringError::InvalidEncodedTx(format!("Input {} is missing the spent output data", index)))?;
        let locking_script = Script::from(utxo.script_public_key.clone());
        let x_only = locking_script
            .extract_x_only_pubkey()
            .map_to_traced(|e| KeyringError::InvalidEncodedTx(format!("Input {}: {}", index, e)))?;
        // even-parity recovery; a convention of this chain's pay-to-pubkey class
        let public_key = public_key_from_x(&x_only)
            .map_to_traced(|e| KeyringError::InvalidEncodedTx(format!("Input {}: {}", index, e)))?;

        if let Some(ref hint) = signature.public_key {
            if hint.to_lowercase() != hex::encode(public_key) {
                return malformed(format!(
                    "Input {}: the device signed with an unexpected public key '{}'",
                    index, hint
                ));
            }
        }

        let signature_bytes = match hex::decode(&signature.signature) {
            Ok(bytes) => bytes,
            Err(e) => return malformed(format!("Input {}: signature is not valid hex: {}", index, e)),
        };
        if signature_bytes.len() != SCHNORR_SIGNATURE_SIZE {
            return malformed(format!(
                "Input {}: expected a {} bytes Schnorr signature, found {} bytes",
                index,
                SCHNORR_SIGNATURE_SIZE,
                signature_bytes.len()
            ));
        }

        input.signature_script =
            Script::schnorr_signature_script(&signature_bytes, SigHashType::All.value()).into_vec();
    }

    let signed = transaction
        .inputs
        .iter()
        .filter(|input| !input.signature_script.is_empty())
        .count();
    if signed != inputs_count {
        return TracedError::err(KeyringError::Hardware(DeviceError::IncompleteSignature {
            signed,
            total: inputs_count,
        }));
    }

    Ok(transaction.to_hex())
}
