use crate::account::AccountRecord;
use crate::error::KeyringResult;
use async_trait::async_trait;
use serde_json::Value as Json;

#[derive(Clone, Debug)]
pub struct PrepareAccountsParams {
    pub indexes: Vec<u32>,
    pub names: Option<Vec<String>>,
    /// Derivation path template with an index placeholder, e.g. `m/44'/111111'/{index}'`.
    pub template: String,
}

#[derive(Clone, Debug)]
pub struct HwAddressParams {
    pub path: String,
    pub show_on_device: bool,
}

/// A chain-and-version-tagged unsigned transaction as produced by the wallet's send flow.
/// The payload shape is chain-specific; each signer decodes its own.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTx {
    pub encoded_tx: Json,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTx {
    /// Intentionally left empty by this layer; computing the txid is a downstream concern.
    pub txid: String,
    pub raw_tx: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressEntry {
    pub path: String,
    pub address: String,
}

/// The per-chain hardware signing capability consumed by wallet business logic.
#[async_trait]
pub trait HardwareSigner: Send + Sync {
    fn coin_type(&self) -> &'static str;

    /// Derive one account per requested index. Addresses are requested from the device in a
    /// single batched call, never one call per index.
    async fn prepare_accounts(&self, params: PrepareAccountsParams) -> KeyringResult<Vec<AccountRecord>>;

    async fn get_address(&self, params: HwAddressParams) -> KeyringResult<String>;

    /// Batched variant; the result is total - one entry per request, in request order.
    async fn batch_get_address(&self, params: Vec<HwAddressParams>) -> KeyringResult<Vec<AddressEntry>>;

    async fn sign_transaction(&self, unsigned: UnsignedTx) -> KeyringResult<SignedTx>;
}
