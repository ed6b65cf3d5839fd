//! Single-flight client over one device session.
//!
//! [`HwClient`] wraps the transport behind an async mutex: acquiring a [`HwSession`] locks
//! the device, so at most one request is outstanding per `connect_id` and callers are
//! serialized structurally rather than by convention.

use crate::error::{DeviceError, DeviceResult};
use crate::flow::{DeviceInfoProvider, FlowState, InteractionFlow};
use crate::processor::{InteractionProcessor, ProcessingError, ProcessingResult};
use futures::channel::mpsc::UnboundedReceiver;
use futures::lock::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use futures::{pin_mut, select, Future, FutureExt, StreamExt};
use hw_common::payloads::{AddressInfo, GetAddressParams, InputSignature, SigningRequest};
use hw_common::session::{DeviceFeatures, DeviceSession};
use hw_common::transport::{HardwareSdk, SdkResponse, TransportResult};
use hw_common::ui::UiRequest;
use hw_err_handle::prelude::*;
use log::{info, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct HwClient {
    inner: Arc<AsyncMutex<HwClientImpl>>,
}

struct HwClientImpl {
    sdk: Arc<dyn HardwareSdk>,
    session: DeviceSession,
    ui_events: UnboundedReceiver<UiRequest>,
    flow: InteractionFlow,
}

impl HwClient {
    pub fn new(sdk: Arc<dyn HardwareSdk>, session: DeviceSession, device_info: Arc<dyn DeviceInfoProvider>) -> HwClient {
        let ui_events = sdk.subscribe_ui_events();
        let flow = InteractionFlow::new(session.connect_id.clone(), sdk.clone(), device_info);
        let inner = Arc::new(AsyncMutex::new(HwClientImpl {
            sdk,
            session,
            ui_events,
            flow,
        }));
        HwClient { inner }
    }

    /// Acquire the device session. The returned guard holds the single-flight lock; a second
    /// caller awaits here until the first one finishes.
    pub async fn session(&self) -> DeviceResult<HwSession<'_>> {
        let mut session = HwSession {
            inner: self.inner.lock().await,
        };
        session.initialize().await?;
        Ok(session)
    }
}

pub struct HwSession<'a> {
    inner: AsyncMutexGuard<'a, HwClientImpl>,
}

impl<'a> HwSession<'a> {
    /// Connect and refresh the device feature flags.
    ///
    /// # Usage
    ///
    /// Performed on every session acquisition; it also recovers the device from a previously
    /// aborted operation.
    async fn initialize(&mut self) -> DeviceResult<()> {
        let connect_id = self.inner.session.connect_id.clone();
        let connected = self.inner.sdk.connect(&connect_id).await.map_traced(DeviceError::from)?;
        if !connected {
            return TracedError::err(DeviceError::Generic {
                code: None,
                message: format!("Failed to connect to the '{}' device", connect_id),
            });
        }
        let features = self
            .inner
            .sdk
            .get_features(&connect_id)
            .await
            .map_traced(DeviceError::from)?;
        self.inner.flow.update_features(features);
        Ok(())
    }

    pub fn features(&self) -> Option<&DeviceFeatures> { self.inner.flow.features() }

    pub fn flow_state(&self) -> &FlowState { self.inner.flow.state() }

    /// Cancel whatever operation is pending on the device. Never fails.
    pub async fn cancel(&mut self) { self.inner.flow.cancel().await }

    pub async fn get_address<P>(
        &mut self,
        params: GetAddressParams,
        processor: &P,
    ) -> ProcessingResult<Vec<AddressInfo>, P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        let first = self.get_address_attempt(params.clone(), processor).await;
        if !is_not_bonded(&first) {
            return first;
        }
        self.bond_once().await;
        self.get_address_attempt(params, processor).await
    }

    pub async fn sign_transaction<P>(
        &mut self,
        request: SigningRequest,
        processor: &P,
    ) -> ProcessingResult<Vec<InputSignature>, P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        info!(
            "Start transaction signing: INPUTS_COUNT={} OUTPUTS_COUNT={}",
            request.inputs.len(),
            request.outputs.len()
        );
        let first = self.sign_transaction_attempt(request.clone(), processor).await;
        if !is_not_bonded(&first) {
            return first;
        }
        self.bond_once().await;
        self.sign_transaction_attempt(request, processor).await
    }

    async fn get_address_attempt<P>(
        &mut self,
        params: GetAddressParams,
        processor: &P,
    ) -> ProcessingResult<Vec<AddressInfo>, P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        let HwClientImpl {
            ref sdk,
            ref session,
            ref mut ui_events,
            ref mut flow,
        } = *self.inner;
        let call = sdk.get_address(&session.connect_id, &session.device_id, params);
        drive(call, ui_events, flow, processor).await
    }

    async fn sign_transaction_attempt<P>(
        &mut self,
        request: SigningRequest,
        processor: &P,
    ) -> ProcessingResult<Vec<InputSignature>, P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        let HwClientImpl {
            ref sdk,
            ref session,
            ref mut ui_events,
            ref mut flow,
        } = *self.inner;
        let call = sdk.sign_transaction(&session.connect_id, &session.device_id, request);
        drive(call, ui_events, flow, processor).await
    }

    /// Exactly one bonding attempt between the two attempts of a call; a failure here is
    /// only logged since the retried call reports the terminal error anyway.
    async fn bond_once(&mut self) {
        warn!("Device is not bonded; retrying once after a bonding attempt");
        let connect_id = self.inner.session.connect_id.clone();
        if let Err(e) = self.inner.sdk.connect(&connect_id).await {
            warn!("Bonding attempt for '{}' failed: {}", connect_id, e);
        }
    }
}

fn is_not_bonded<T, E>(result: &ProcessingResult<T, E>) -> bool {
    match result {
        Err(e) => matches!(e.get_inner().device_error(), Some(DeviceError::DeviceNotBonded)),
        Ok(_) => false,
    }
}

/// Drive one device call to settlement while dispatching interaction requests raised in the
/// meantime. Single-threaded: the call and the event stream are interleaved in one task.
async fn drive<T, P>(
    call: impl Future<Output = TransportResult<SdkResponse<T>>>,
    ui_events: &mut UnboundedReceiver<UiRequest>,
    flow: &mut InteractionFlow,
    processor: &P,
) -> ProcessingResult<T, P::Error>
where
    P: InteractionProcessor + Sync,
{
    flow.begin();
    let call = call.fuse();
    pin_mut!(call);

    let settled = loop {
        select! {
            settled = call => break settled,
            event = ui_events.next() => match event {
                Some(event) => {
                    if let Err(e) = flow.handle_event(event, processor).await {
                        // A failed (or cancelling) processor aborts the flow; release the
                        // device best-effort before reporting.
                        flow.cancel().await;
                        return Err(e);
                    }
                },
                // The event stream may close (transport dropped); keep awaiting the call.
                None => break (&mut call).await,
            },
        }
    };

    let normalized = normalize_response(settled);
    match &normalized {
        Ok(_) => flow.complete(),
        Err(e) => flow.fail(e.get_inner().clone()),
    }
    processor.on_ready().await?;
    normalized.map_traced(ProcessingError::Device)
}

fn normalize_response<T>(settled: TransportResult<SdkResponse<T>>) -> DeviceResult<T> {
    match settled {
        Ok(SdkResponse::Ready(payload)) => Ok(payload),
        Ok(SdkResponse::Failure(failure)) => TracedError::err(DeviceError::from(failure)),
        Err(transport) => Err(transport.map(DeviceError::from)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::for_tests::{MockDeviceInfo, MockSdk, TestProcessor};
    use hw_common::block_on;
    use hw_common::payloads::{AddressRequest, SignScheme};
    use hw_common::session::{ConnectId, DeviceId};
    use hw_common::transport::{codes, DeviceFailure};
    use hw_common::ui::{UiRequest, UiRequestKind, UiRequestPayload, UiResponse};

    fn test_session() -> DeviceSession {
        DeviceSession::new(ConnectId::from("conn-1"), DeviceId::from("device-1"))
    }

    fn test_client(sdk: Arc<MockSdk>) -> HwClient {
        HwClient::new(sdk, test_session(), Arc::new(MockDeviceInfo::empty()))
    }

    fn address_params() -> GetAddressParams {
        GetAddressParams {
            bundle: vec![AddressRequest {
                path: "m/44'/111111'/0'".to_owned(),
                show_on_device: false,
                prefix: "kaspa".to_owned(),
                scheme: SignScheme::Schnorr,
            }],
            passphrase_state: None,
        }
    }

    fn signing_request() -> SigningRequest {
        SigningRequest {
            version: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: "0".to_owned(),
            sig_hash_type: hw_common::payloads::SigHashType::All,
            sig_op_count: 1,
            scheme: SignScheme::Schnorr,
            prefix: "kaspa".to_owned(),
            passphrase_state: None,
        }
    }

    fn signature(input_index: u32) -> InputSignature {
        InputSignature {
            input_index,
            signature: "ab".repeat(64),
            public_key: None,
        }
    }

    #[test]
    fn test_get_address_settles() {
        let sdk = Arc::new(MockSdk::default());
        sdk.push_address_response(SdkResponse::Ready(vec![AddressInfo {
            path: Some("m/44'/111111'/0'".to_owned()),
            address: Some("kaspa:qqtest".to_owned()),
        }]));
        let client = test_client(sdk.clone());
        let processor = TestProcessor::default();

        let addresses = block_on(async {
            let mut session = client.session().await.unwrap();
            session.get_address(address_params(), &processor).await
        })
        .unwrap();

        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].address.as_deref(), Some("kaspa:qqtest"));
        // `session()` connects once, and the flow finishes with an `on_ready` notification.
        assert_eq!(sdk.log.lock().unwrap().connect, 1);
        assert_eq!(processor.calls(), vec!["ready".to_owned()]);
    }

    #[test]
    fn test_device_failure_is_normalized() {
        let sdk = Arc::new(MockSdk::default());
        sdk.push_address_response(SdkResponse::Failure(DeviceFailure::new(
            codes::ACTION_CANCELLED,
            "cancelled on device",
        )));
        let client = test_client(sdk);
        let processor = TestProcessor::default();

        let error = block_on(async {
            let mut session = client.session().await.unwrap();
            session.get_address(address_params(), &processor).await
        })
        .expect_err("Expected a normalized device error");

        assert_eq!(error.get_inner().device_error(), Some(&DeviceError::UserCancelled));
    }

    #[test]
    fn test_not_bonded_triggers_exactly_one_retry() {
        let sdk = Arc::new(MockSdk::default());
        sdk.push_sign_response(SdkResponse::Failure(DeviceFailure::new(
            codes::BLE_DEVICE_NOT_BONDED,
            "not bonded",
        )));
        sdk.push_sign_response(SdkResponse::Ready(vec![signature(0)]));
        let client = test_client(sdk.clone());
        let processor = TestProcessor::default();

        let signatures = block_on(async {
            let mut session = client.session().await.unwrap();
            session.sign_transaction(signing_request(), &processor).await
        })
        .unwrap();

        assert_eq!(signatures.len(), 1);
        let log = sdk.log.lock().unwrap();
        // one connect from `session()`, one from the bonding attempt
        assert_eq!(log.connect, 2);
        assert_eq!(log.signing_requests.len(), 2);
    }

    #[test]
    fn test_not_bonded_twice_is_terminal() {
        let sdk = Arc::new(MockSdk::default());
        for _ in 0..2 {
            sdk.push_sign_response(SdkResponse::Failure(DeviceFailure::new(
                codes::BLE_DEVICE_NOT_BONDED,
                "not bonded",
            )));
        }
        let client = test_client(sdk.clone());
        let processor = TestProcessor::default();

        let error = block_on(async {
            let mut session = client.session().await.unwrap();
            session.sign_transaction(signing_request(), &processor).await
        })
        .expect_err("Expected 'DeviceNotBonded'");

        assert_eq!(error.get_inner().device_error(), Some(&DeviceError::DeviceNotBonded));
        // no unbounded retry loop
        assert_eq!(sdk.log.lock().unwrap().signing_requests.len(), 2);
    }

    #[test]
    fn test_interaction_is_dispatched_while_signing() {
        let sdk = Arc::new(MockSdk::default());
        let mut payload = UiRequestPayload::new(ConnectId::from("conn-1"));
        payload.supports_software_pin = true;
        sdk.emit_on_sign.lock().unwrap().push(UiRequest {
            kind: UiRequestKind::RequestPin,
            payload,
            content: None,
        });
        sdk.push_sign_response(SdkResponse::Ready(vec![signature(0)]));
        let client = test_client(sdk.clone());
        let processor = TestProcessor::default();

        let signatures = block_on(async {
            let mut session = client.session().await.unwrap();
            session.sign_transaction(signing_request(), &processor).await
        })
        .unwrap();

        assert_eq!(signatures.len(), 1);
        assert_eq!(processor.calls(), vec!["pin(on_device=false)".to_owned(), "ready".to_owned()]);
        let log = sdk.log.lock().unwrap();
        assert!(matches!(log.ui_responses[0], UiResponse::Pin(_)));
    }

    #[test]
    fn test_processor_failure_cancels_the_device_operation() {
        let sdk = Arc::new(MockSdk::default());
        let mut payload = UiRequestPayload::new(ConnectId::from("conn-1"));
        payload.supports_software_pin = true;
        sdk.emit_on_sign.lock().unwrap().push(UiRequest {
            kind: UiRequestKind::RequestPin,
            payload,
            content: None,
        });
        let client = test_client(sdk.clone());
        let mut processor = TestProcessor::default();
        processor.fail_with = Some("pin entry dismissed".to_owned());

        let error = block_on(async {
            let mut session = client.session().await.unwrap();
            session.sign_transaction(signing_request(), &processor).await
        })
        .expect_err("Expected a processor error");

        match error.get_inner() {
            ProcessingError::Processor(e) => assert_eq!(e, "pin entry dismissed"),
            other => panic!("Expected 'Processor', found {}", other),
        }
        // the in-flight device operation is released best-effort
        assert_eq!(sdk.log.lock().unwrap().cancel, 1);
    }
}
