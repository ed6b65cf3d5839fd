use crate::account::AccountRecord;
use crate::error::KeyringResult;
use async_trait::async_trait;
use hw_common::session::PassphraseState;

/// Read access to the wallet state a signer needs (an external collaborator):
/// the active account, the network chain id and the wallet's passphrase state.
///
/// Every fetch required to build a device request completes before the device RPC is
/// issued; partial construction is never sent to the device.
#[async_trait]
pub trait WalletContext: Send + Sync {
    fn wallet_id(&self) -> String;

    async fn passphrase_state(&self) -> KeyringResult<Option<PassphraseState>>;

    /// The chain id/prefix of the active network, e.g. `kaspa` or `kaspatest`.
    async fn chain_id(&self) -> KeyringResult<String>;

    async fn active_account(&self) -> KeyringResult<AccountRecord>;
}
