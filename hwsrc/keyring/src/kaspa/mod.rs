//! The Kaspa hardware keyring: the reference chain implementation of [`HardwareSigner`].

mod builder;
mod encoded;

pub use builder::{assemble_signed_transaction, build_signing_request};
pub use encoded::{EncodedInput, EncodedOutput, EncodedPrevOutput, KaspaEncodedTx};

use crate::account::{AccountRecord, AccountType};
use crate::context::WalletContext;
use crate::error::{from_processing, KeyringError, KeyringResult};
use crate::signer::{AddressEntry, HardwareSigner, HwAddressParams, PrepareAccountsParams, SignedTx, UnsignedTx};
use async_trait::async_trait;
use hw_common::payloads::{AddressInfo, AddressRequest, GetAddressParams, SignScheme};
use hw_common::primitives::PathTemplate;
use hw_device::client::HwClient;
use hw_device::error::DeviceError;
use hw_device::processor::InteractionProcessor;
use hw_err_handle::prelude::*;
use log::info;
use serde_json as json;
use std::collections::HashMap;
use std::sync::Arc;

pub const KASPA_COIN_TYPE: &str = "111111";
/// Default account naming prefix: `KAS #1`, `KAS #2`, ...
pub const KASPA_ACCOUNT_PREFIX: &str = "KAS";

pub struct KaspaKeyring<P> {
    client: HwClient,
    ctx: Arc<dyn WalletContext>,
    processor: Arc<P>,
}

impl<P> KaspaKeyring<P>
where
    P: InteractionProcessor + Sync,
{
    pub fn new(client: HwClient, ctx: Arc<dyn WalletContext>, processor: Arc<P>) -> KaspaKeyring<P> {
        KaspaKeyring { client, ctx, processor }
    }

    /// One batched device call for the given paths. Batching is mandatory: N paths must
    /// never turn into N device round-trips.
    async fn request_addresses(&self, paths: &[String], show_on_device: bool) -> KeyringResult<Vec<AddressInfo>> {
        let chain_id = self.ctx.chain_id().await?;
        let passphrase_state = self.ctx.passphrase_state().await?;

        let bundle = paths
            .iter()
            .map(|path| AddressRequest {
                path: path.clone(),
                show_on_device,
                prefix: chain_id.clone(),
                scheme: SignScheme::Schnorr,
            })
            .collect();
        let params = GetAddressParams {
            bundle,
            passphrase_state,
        };

        let mut session = self.client.session().await.map_traced(KeyringError::from)?;
        session
            .get_address(params, self.processor.as_ref())
            .await
            .map_err(from_processing)
    }
}

#[async_trait]
impl<P> HardwareSigner for KaspaKeyring<P>
where
    P: InteractionProcessor + Sync + Send + 'static,
{
    fn coin_type(&self) -> &'static str { KASPA_COIN_TYPE }

    async fn prepare_accounts(&self, params: PrepareAccountsParams) -> KeyringResult<Vec<AccountRecord>> {
        let PrepareAccountsParams {
            indexes,
            names,
            template,
        } = params;
        let template =
            PathTemplate::new(&template).map_to_traced(|e| KeyringError::InvalidPathTemplate(e.to_string()))?;

        let mut paths = Vec::with_capacity(indexes.len());
        for index in &indexes {
            let path = template
                .path_for_index(*index)
                .map_to_traced(|e| KeyringError::InvalidPathTemplate(e.to_string()))?;
            paths.push(path.to_string());
        }

        let infos = self.request_addresses(&paths, false).await?;
        let entries = correlate_addresses(&paths, &infos);

        let wallet_id = self.ctx.wallet_id();
        let mut accounts = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            if entry.address.is_empty() {
                return TracedError::err(KeyringError::Hardware(DeviceError::MalformedDeviceResponse(format!(
                    "Address missing for path '{}'",
                    entry.path
                ))));
            }
            let name = names
                .as_ref()
                .and_then(|names| names.get(position))
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("{} #{}", KASPA_ACCOUNT_PREFIX, indexes[position] + 1));
            accounts.push(AccountRecord {
                id: format!("{}--{}", wallet_id, entry.path),
                name,
                account_type: AccountType::Simple,
                path: entry.path,
                coin_type: KASPA_COIN_TYPE.to_owned(),
                pub_key: String::new(),
                address: entry.address,
            });
        }
        Ok(accounts)
    }

    async fn get_address(&self, params: HwAddressParams) -> KeyringResult<String> {
        let paths = vec![params.path];
        let infos = self.request_addresses(&paths, params.show_on_device).await?;

        // a successful response without an address is still a failure
        infos
            .get(0)
            .and_then(|info| info.address.clone())
            .filter(|address| !address.is_empty())
            .or_traced(|| {
                KeyringError::Hardware(DeviceError::MalformedDeviceResponse(
                    "Device response is missing the address".to_owned(),
                ))
            })
    }

    async fn batch_get_address(&self, params: Vec<HwAddressParams>) -> KeyringResult<Vec<AddressEntry>> {
        let show_on_device = params.iter().any(|param| param.show_on_device);
        let paths: Vec<String> = params.into_iter().map(|param| param.path).collect();
        let infos = self.request_addresses(&paths, show_on_device).await?;
        // missing fields default to empty strings to keep the batch result total
        Ok(correlate_addresses(&paths, &infos))
    }

    async fn sign_transaction(&self, unsigned: UnsignedTx) -> KeyringResult<SignedTx> {
        info!("Signing a transaction with the hardware wallet");

        // every external fetch completes before the signing RPC is issued
        let account = self.ctx.active_account().await?;
        let chain_id = self.ctx.chain_id().await?;
        let passphrase_state = self.ctx.passphrase_state().await?;

        let encoded: KaspaEncodedTx = json::from_value(unsigned.encoded_tx)
            .map_to_traced(|e| KeyringError::InvalidEncodedTx(e.to_string()))?;
        let transaction = encoded
            .into_transaction()
            .map_to_traced(KeyringError::InvalidEncodedTx)?;

        let mut request = build_signing_request(&transaction, &account.path, &chain_id)?;
        request.passphrase_state = passphrase_state;

        let mut session = self.client.session().await.map_traced(KeyringError::from)?;
        let signatures = session
            .sign_transaction(request, self.processor.as_ref())
            .await
            .map_err(from_processing)?;

        let raw_tx = assemble_signed_transaction(transaction, &signatures)?;
        Ok(SignedTx {
            txid: String::new(),
            raw_tx,
        })
    }
}

/// Align a device address response with the requested paths.
///
/// The device payload order is not guaranteed by the transport contract, so entries are
/// re-keyed by path first; an entry whose path is absent falls back to positional
/// correspondence, and missing fields default to empty strings.
fn correlate_addresses(requested: &[String], infos: &[AddressInfo]) -> Vec<AddressEntry> {
    let by_path: HashMap<&str, &AddressInfo> = infos
        .iter()
        .filter_map(|info| info.path.as_deref().map(|path| (path, info)))
        .collect();

    requested
        .iter()
        .enumerate()
        .map(|(position, path)| {
            let info = by_path.get(path.as_str()).copied().or_else(|| infos.get(position));
            AddressEntry {
                path: path.clone(),
                address: info.and_then(|info| info.address.clone()).unwrap_or_default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::UnsignedTx;
    use async_trait::async_trait;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use hw_common::block_on;
    use hw_common::payloads::{InputSignature, SigningRequest};
    use hw_common::session::{ConnectId, DeviceCapabilities, DeviceFeatures, DeviceId, DeviceSession, PassphraseState};
    use hw_common::transport::{codes, DeviceFailure, HardwareSdk, SdkResponse, TransportResult};
    use hw_common::ui::{PermissionKind, UiRequest, UiResponse};
    use hw_device::flow::{DeviceInfoError, DeviceInfoProvider};
    use hw_device::processor::{PassphrasePrompt, PassphraseReply, PermissionDecision, PinPrompt, PinReply,
                               ProcessingResult};
    use kaspa_chain::{deserialize, Script, Transaction, SCHNORR_SIGNATURE_SIZE};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const GENERATOR_X: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn p2pk_script_hex() -> String {
        let mut x_only = [0u8; 32];
        x_only.copy_from_slice(&hex::decode(GENERATOR_X).unwrap());
        hex::encode(Script::pay_to_pubkey(&x_only).into_vec())
    }

    #[derive(Default)]
    struct MockSdk {
        address_responses: Mutex<VecDeque<SdkResponse<Vec<AddressInfo>>>>,
        sign_responses: Mutex<VecDeque<SdkResponse<Vec<InputSignature>>>>,
        address_calls: Mutex<Vec<GetAddressParams>>,
        sign_calls: Mutex<Vec<SigningRequest>>,
        events_tx: Mutex<Option<UnboundedSender<UiRequest>>>,
    }

    #[async_trait]
    impl HardwareSdk for MockSdk {
        async fn connect(&self, _connect_id: &ConnectId) -> TransportResult<bool> { Ok(true) }

        async fn get_features(&self, _connect_id: &ConnectId) -> TransportResult<DeviceFeatures> {
            Ok(DeviceFeatures::default())
        }

        async fn cancel(&self, _connect_id: &ConnectId) -> TransportResult<()> { Ok(()) }

        async fn send_ui_response(&self, _response: UiResponse) -> TransportResult<()> { Ok(()) }

        fn subscribe_ui_events(&self) -> UnboundedReceiver<UiRequest> {
            let (tx, rx) = unbounded();
            *self.events_tx.lock().unwrap() = Some(tx);
            rx
        }

        async fn get_address(
            &self,
            _connect_id: &ConnectId,
            _device_id: &DeviceId,
            params: GetAddressParams,
        ) -> TransportResult<SdkResponse<Vec<AddressInfo>>> {
            self.address_calls.lock().unwrap().push(params);
            Ok(self
                .address_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(SdkResponse::Ready(Vec::new())))
        }

        async fn sign_transaction(
            &self,
            _connect_id: &ConnectId,
            _device_id: &DeviceId,
            request: SigningRequest,
        ) -> TransportResult<SdkResponse<Vec<InputSignature>>> {
            self.sign_calls.lock().unwrap().push(request);
            Ok(self
                .sign_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(SdkResponse::Ready(Vec::new())))
        }
    }

    struct NoopDeviceInfo;

    #[async_trait]
    impl DeviceInfoProvider for NoopDeviceInfo {
        async fn device_capabilities(
            &self,
            _device_id: &DeviceId,
        ) -> TracedResult<Option<DeviceCapabilities>, DeviceInfoError> {
            Ok(None)
        }
    }

    struct MockContext;

    #[async_trait]
    impl WalletContext for MockContext {
        fn wallet_id(&self) -> String { "hw-wallet-1".to_owned() }

        async fn passphrase_state(&self) -> KeyringResult<Option<PassphraseState>> {
            Ok(Some(PassphraseState::new("state-token")))
        }

        async fn chain_id(&self) -> KeyringResult<String> { Ok("kaspa".to_owned()) }

        async fn active_account(&self) -> KeyringResult<AccountRecord> {
            Ok(AccountRecord {
                id: "hw-wallet-1--m/44'/111111'/0'".to_owned(),
                name: "KAS #1".to_owned(),
                account_type: AccountType::Simple,
                path: "m/44'/111111'/0'".to_owned(),
                coin_type: KASPA_COIN_TYPE.to_owned(),
                pub_key: String::new(),
                address: "kaspa:qqactive".to_owned(),
            })
        }
    }

    struct NoopProcessor;

    #[async_trait]
    impl InteractionProcessor for NoopProcessor {
        type Error = String;

        async fn on_pin_request(&self, _prompt: PinPrompt) -> ProcessingResult<PinReply, String> {
            Ok(PinReply::EnterOnDevice)
        }

        async fn on_passphrase_request(&self, _prompt: PassphrasePrompt) -> ProcessingResult<PassphraseReply, String> {
            Ok(PassphraseReply::EnterOnDevice)
        }

        async fn on_button_request(&self) -> ProcessingResult<(), String> { Ok(()) }

        async fn on_permission_request(&self, _kind: PermissionKind) -> ProcessingResult<PermissionDecision, String> {
            Ok(PermissionDecision::Granted)
        }

        async fn on_firmware_upgrade(&self, _content: &str) -> ProcessingResult<(), String> { Ok(()) }

        async fn on_bridge_required(&self) -> ProcessingResult<(), String> { Ok(()) }

        async fn on_ready(&self) -> ProcessingResult<(), String> { Ok(()) }
    }

    fn keyring_with(sdk: Arc<MockSdk>) -> KaspaKeyring<NoopProcessor> {
        let session = DeviceSession::new(ConnectId::from("conn-1"), DeviceId::from("device-1"));
        let client = HwClient::new(sdk, session, Arc::new(NoopDeviceInfo));
        KaspaKeyring::new(client, Arc::new(MockContext), Arc::new(NoopProcessor))
    }

    fn address_info(path: &str, address: &str) -> AddressInfo {
        AddressInfo {
            path: Some(path.to_owned()),
            address: Some(address.to_owned()),
        }
    }

    fn device_signature(input_index: u32) -> InputSignature {
        InputSignature {
            input_index,
            signature: "cd".repeat(SCHNORR_SIGNATURE_SIZE),
            public_key: None,
        }
    }

    fn encoded_tx(inputs_count: usize) -> UnsignedTx {
        let inputs: Vec<_> = (0..inputs_count)
            .map(|index| {
                json!({
                    "prevTxId": "ab".repeat(32),
                    "outputIndex": index,
                    "sequenceNumber": 0,
                    "output": { "satoshis": 500_000_000u64, "script": p2pk_script_hex() },
                })
            })
            .collect();
        UnsignedTx {
            encoded_tx: json!({
                "version": 0,
                "inputs": inputs,
                "outputs": [{ "satoshis": 499_990_000u64, "script": p2pk_script_hex() }],
                "lockTime": 0,
            }),
        }
    }

    #[test]
    fn test_prepare_accounts_batches_and_defaults_names() {
        let sdk = Arc::new(MockSdk::default());
        // the device answers out of request order
        sdk.address_responses.lock().unwrap().push_back(SdkResponse::Ready(vec![
            address_info("m/44'/111111'/2'", "kaspa:qqthird"),
            address_info("m/44'/111111'/0'", "kaspa:qqfirst"),
            address_info("m/44'/111111'/1'", "kaspa:qqsecond"),
        ]));
        let keyring = keyring_with(sdk.clone());

        let accounts = block_on(keyring.prepare_accounts(PrepareAccountsParams {
            indexes: vec![0, 1, 2],
            names: None,
            template: "m/44'/111111'/{index}'".to_owned(),
        }))
        .unwrap();

        // a single batched call carrying all three paths
        let calls = sdk.address_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].bundle.len(), 3);
        assert!(calls[0].passphrase_state.is_some());

        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].name, "KAS #1");
        assert_eq!(accounts[0].address, "kaspa:qqfirst");
        assert_eq!(accounts[0].id, "hw-wallet-1--m/44'/111111'/0'");
        assert_eq!(accounts[1].address, "kaspa:qqsecond");
        assert_eq!(accounts[2].name, "KAS #3");
        assert_eq!(accounts[2].address, "kaspa:qqthird");
    }

    #[test]
    fn test_prepare_accounts_honors_supplied_names() {
        let sdk = Arc::new(MockSdk::default());
        sdk.address_responses.lock().unwrap().push_back(SdkResponse::Ready(vec![
            address_info("m/44'/111111'/0'", "kaspa:qqfirst"),
            address_info("m/44'/111111'/1'", "kaspa:qqsecond"),
        ]));
        let keyring = keyring_with(sdk);

        let accounts = block_on(keyring.prepare_accounts(PrepareAccountsParams {
            indexes: vec![0, 1],
            names: Some(vec!["Savings".to_owned(), String::new()]),
            template: "m/44'/111111'/{index}'".to_owned(),
        }))
        .unwrap();

        assert_eq!(accounts[0].name, "Savings");
        // an empty supplied name falls back to the default
        assert_eq!(accounts[1].name, "KAS #2");
    }

    #[test]
    fn test_prepare_accounts_fails_on_missing_address() {
        let sdk = Arc::new(MockSdk::default());
        sdk.address_responses.lock().unwrap().push_back(SdkResponse::Ready(vec![AddressInfo {
            path: Some("m/44'/111111'/0'".to_owned()),
            address: None,
        }]));
        let keyring = keyring_with(sdk);

        let error = block_on(keyring.prepare_accounts(PrepareAccountsParams {
            indexes: vec![0],
            names: None,
            template: "m/44'/111111'/{index}'".to_owned(),
        }))
        .expect_err("Expected 'MalformedDeviceResponse'");

        match error.get_inner().hardware_error() {
            Some(DeviceError::MalformedDeviceResponse(_)) => (),
            other => panic!("Expected 'MalformedDeviceResponse', found {:?}", other),
        }
    }

    #[test]
    fn test_prepare_accounts_rejects_bad_template() {
        let keyring = keyring_with(Arc::new(MockSdk::default()));
        let error = block_on(keyring.prepare_accounts(PrepareAccountsParams {
            indexes: vec![0],
            names: None,
            template: "m/44'/111111'/0'".to_owned(),
        }))
        .expect_err("Expected 'InvalidPathTemplate'");
        match error.get_inner() {
            KeyringError::InvalidPathTemplate(_) => (),
            other => panic!("Expected 'InvalidPathTemplate', found {}", other),
        }
    }

    #[test]
    fn test_batch_get_address_preserves_request_order() {
        let sdk = Arc::new(MockSdk::default());
        // permuted response with one address missing
        sdk.address_responses.lock().unwrap().push_back(SdkResponse::Ready(vec![
            AddressInfo {
                path: Some("m/44'/111111'/1'".to_owned()),
                address: None,
            },
            address_info("m/44'/111111'/0'", "kaspa:qqfirst"),
        ]));
        let keyring = keyring_with(sdk);

        let entries = block_on(keyring.batch_get_address(vec![
            HwAddressParams {
                path: "m/44'/111111'/0'".to_owned(),
                show_on_device: false,
            },
            HwAddressParams {
                path: "m/44'/111111'/1'".to_owned(),
                show_on_device: false,
            },
        ]))
        .unwrap();

        assert_eq!(entries, vec![
            AddressEntry {
                path: "m/44'/111111'/0'".to_owned(),
                address: "kaspa:qqfirst".to_owned(),
            },
            AddressEntry {
                path: "m/44'/111111'/1'".to_owned(),
                address: String::new(),
            },
        ]);
    }

    #[test]
    fn test_get_address_missing_address_is_an_error() {
        let sdk = Arc::new(MockSdk::default());
        sdk.address_responses
            .lock()
            .unwrap()
            .push_back(SdkResponse::Ready(vec![AddressInfo::default()]));
        let keyring = keyring_with(sdk);

        let error = block_on(keyring.get_address(HwAddressParams {
            path: "m/44'/111111'/0'".to_owned(),
            show_on_device: true,
        }))
        .expect_err("Expected 'MalformedDeviceResponse'");

        match error.get_inner().hardware_error() {
            Some(DeviceError::MalformedDeviceResponse(_)) => (),
            other => panic!("Expected 'MalformedDeviceResponse', found {:?}", other),
        }
    }

    #[test]
    fn test_sign_transaction_end_to_end() {
        let sdk = Arc::new(MockSdk::default());
        sdk.sign_responses
            .lock()
            .unwrap()
            .push_back(SdkResponse::Ready(vec![device_signature(0)]));
        let keyring = keyring_with(sdk.clone());

        let signed = block_on(keyring.sign_transaction(encoded_tx(1))).unwrap();

        // the txid is a downstream concern, left empty by this layer
        assert!(signed.txid.is_empty());
        assert!(!signed.raw_tx.is_empty());
        let decoded: Transaction = deserialize(&hex::decode(&signed.raw_tx).unwrap()).unwrap();
        assert!(decoded.is_fully_signed());

        // the signing request carries decimal amounts and hex scripts
        let calls = sdk.sign_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let request = &calls[0];
        assert_eq!(request.prefix, "kaspa");
        assert_eq!(request.inputs[0].path, "m/44'/111111'/0'");
        assert_eq!(request.inputs[0].output.value, "500000000");
        assert_eq!(request.inputs[0].output.script, p2pk_script_hex());
        assert_eq!(request.outputs[0].value, "499990000");
        assert!(request.passphrase_state.is_some());
    }

    #[test]
    fn test_sign_transaction_with_partial_signatures_fails() {
        let sdk = Arc::new(MockSdk::default());
        sdk.sign_responses
            .lock()
            .unwrap()
            .push_back(SdkResponse::Ready(vec![device_signature(0)]));
        let keyring = keyring_with(sdk);

        let error = block_on(keyring.sign_transaction(encoded_tx(2))).expect_err("Expected 'IncompleteSignature'");
        assert_eq!(
            error.get_inner().hardware_error(),
            Some(&DeviceError::IncompleteSignature { signed: 1, total: 2 })
        );
    }

    #[test]
    fn test_sign_transaction_user_cancelled() {
        let sdk = Arc::new(MockSdk::default());
        sdk.sign_responses
            .lock()
            .unwrap()
            .push_back(SdkResponse::Failure(DeviceFailure::new(
                codes::ACTION_CANCELLED,
                "cancelled on device",
            )));
        let keyring = keyring_with(sdk);

        let error = block_on(keyring.sign_transaction(encoded_tx(1))).expect_err("Expected 'UserCancelled'");
        assert_eq!(error.get_inner().hardware_error(), Some(&DeviceError::UserCancelled));
    }

    #[test]
    fn test_sign_transaction_rejects_malformed_payload() {
        let keyring = keyring_with(Arc::new(MockSdk::default()));
        let error = block_on(keyring.sign_transaction(UnsignedTx {
            encoded_tx: json!({ "inputs": "not-a-list" }),
        }))
        .expect_err("Expected 'InvalidEncodedTx'");
        match error.get_inner() {
            KeyringError::InvalidEncodedTx(_) => (),
            other => panic!("Expected 'InvalidEncodedTx', found {}", other),
        }
    }
}
