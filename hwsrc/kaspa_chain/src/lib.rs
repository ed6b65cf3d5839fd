//! The pure transaction layer of the reference UTXO/Schnorr chain (Kaspa).
//!
//! Everything in this crate is stateless: the transaction data model, the binary wire codec
//! and script inspection. Device communication and signing orchestration live elsewhere.

pub mod hash;
pub mod script;
pub mod ser;
pub mod transaction;

pub use hash::{SubnetworkId, H256};
pub use script::{public_key_from_x, Script, ScriptError, SCHNORR_SIGNATURE_SIZE};
pub use ser::{deserialize, serialize, CompactInteger, Deserializable, Error as SerError, Reader, Serializable, Stream};
pub use transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput, UtxoEntry};
