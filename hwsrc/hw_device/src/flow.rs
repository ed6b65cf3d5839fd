//! The device interaction state machine.
//!
//! One [`InteractionFlow`] instance manages the lifecycle of one derivation/signing session:
//! it consumes interaction requests raised by the transport while a call is in flight,
//! dispatches them to the [`InteractionProcessor`], submits the answers back, and tracks the
//! session state including cancellation. All of its state (including the duplicate-request
//! guard) is instance-owned, so independent machines can be instantiated side by side.

use crate::error::DeviceError;
use crate::processor::{InteractionProcessor, PassphrasePrompt, PassphraseReply, PermissionDecision, PinPrompt,
                       PinReply, ProcessingError, ProcessingResult};
use async_trait::async_trait;
use derive_more::Display;
use hw_common::session::{ConnectId, DeviceCapabilities, DeviceFeatures, DeviceId};
use hw_common::transport::HardwareSdk;
use hw_common::ui::{PassphraseResponse, PermissionKind, PinResponse, UiRequest, UiRequestKind, UiRequestPayload,
                    UiResponse};
use hw_err_handle::prelude::*;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identical requests arriving within this window are ignored outright.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum FlowState {
    Idle,
    /// A call to the transport has been issued; no prompt is shown yet.
    Requesting,
    AwaitingPin,
    AwaitingPassphrase,
    AwaitingButtonConfirm,
    AwaitingPermission,
    AwaitingFirmwareDecision,
    Completed,
    Cancelled,
    #[display(fmt = "Failed({})", _0)]
    Failed(DeviceError),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Completed | FlowState::Cancelled | FlowState::Failed(_)
        )
    }
}

/// A timing-based idempotence guard keyed on structural equality of the request.
/// Prevents duplicate rapid-fire device callbacks from stacking prompts.
#[derive(Debug)]
pub struct DedupGuard {
    window: Duration,
    last_request: Option<UiRequest>,
    last_surfaced_at: Option<Instant>,
}

impl DedupGuard {
    pub fn new(window: Duration) -> DedupGuard {
        DedupGuard {
            window,
            last_request: None,
            last_surfaced_at: None,
        }
    }

    /// Returns whether the request should surface. A request identical to the last surfaced
    /// one within the window is suppressed and does not refresh the window.
    pub fn note(&mut self, request: &UiRequest, now: Instant) -> bool {
        if let (Some(last), Some(at)) = (&self.last_request, self.last_surfaced_at) {
            if last == request && now.duration_since(at) < self.window {
                return false;
            }
        }
        self.last_request = Some(request.clone());
        self.last_surfaced_at = Some(now);
        true
    }
}

#[derive(Clone, Debug, Display)]
#[display(fmt = "{}", _0)]
pub struct DeviceInfoError(pub String);

/// Read access to the wallet's device registry (an external collaborator).
/// Used to decide whether a device enters its PIN on the device itself.
#[async_trait]
pub trait DeviceInfoProvider: Send + Sync {
    async fn device_capabilities(&self, device_id: &DeviceId) -> TracedResult<Option<DeviceCapabilities>, DeviceInfoError>;
}

pub struct InteractionFlow {
    connect_id: ConnectId,
    sdk: Arc<dyn HardwareSdk>,
    device_info: Arc<dyn DeviceInfoProvider>,
    features: Option<DeviceFeatures>,
    state: FlowState,
    dedup: DedupGuard,
}

impl InteractionFlow {
    pub fn new(connect_id: ConnectId, sdk: Arc<dyn HardwareSdk>, device_info: Arc<dyn DeviceInfoProvider>) -> InteractionFlow {
        InteractionFlow {
            connect_id,
            sdk,
            device_info,
            features: None,
            state: FlowState::Idle,
            dedup: DedupGuard::new(DEDUP_WINDOW),
        }
    }

    pub fn with_dedup_window(mut self, window: Duration) -> InteractionFlow {
        self.dedup = DedupGuard::new(window);
        self
    }

    pub fn state(&self) -> &FlowState { &self.state }

    pub fn features(&self) -> Option<&DeviceFeatures> { self.features.as_ref() }

    pub fn update_features(&mut self, features: DeviceFeatures) { self.features = Some(features); }

    /// A new call to the transport has been issued.
    pub fn begin(&mut self) { self.state = FlowState::Requesting; }

    /// The in-flight call settled successfully.
    pub fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = FlowState::Completed;
        }
    }

    /// The in-flight call settled with an error. A previously recorded cancellation wins.
    pub fn fail(&mut self, error: DeviceError) {
        if !self.state.is_terminal() {
            self.state = FlowState::Failed(error);
        }
    }

    /// Cancel the in-flight operation: send an explicit cancel to the transport, then
    /// refresh the device feature flags best-effort so the device screen leaves the prompt.
    /// Both steps are best-effort; cancellation never fails.
    pub async fn cancel(&mut self) {
        if let Err(e) = self.sdk.cancel(&self.connect_id).await {
            warn!("Error cancelling the '{}' operation: {}", self.connect_id, e);
        }
        match self.sdk.get_features(&self.connect_id).await {
            Ok(features) => self.features = Some(features),
            Err(e) => warn!("Error refreshing '{}' features after cancel: {}", self.connect_id, e),
        }
        self.state = FlowState::Cancelled;
    }

    /// Handle one interaction request raised by the transport.
    ///
    /// Duplicate requests within [`DEDUP_WINDOW`] are ignored outright: the previously
    /// surfaced prompt is still pending and its answer will feed the in-flight call.
    pub async fn handle_event<P>(&mut self, event: UiRequest, processor: &P) -> ProcessingResult<(), P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        if self.state.is_terminal() {
            debug!("Ignoring '{}' request: the flow is already {}", event.kind, self.state);
            return Ok(());
        }
        if !self.dedup.note(&event, Instant::now()) {
            debug!("Ignoring duplicate '{}' request", event.kind);
            return Ok(());
        }

        match event.kind {
            UiRequestKind::RequestPin => self.on_pin(&event.payload, processor).await,
            UiRequestKind::RequestPassphrase => self.on_passphrase(&event.payload, false, processor).await,
            UiRequestKind::RequestPassphraseOnDevice => self.on_passphrase(&event.payload, true, processor).await,
            UiRequestKind::RequestButton => {
                self.state = FlowState::AwaitingButtonConfirm;
                // Informational only: the device resolves this through a physical button press,
                // so nothing is submitted back.
                processor.on_button_request().await
            },
            UiRequestKind::BluetoothPermission => self.on_permission(PermissionKind::Bluetooth, processor).await,
            UiRequestKind::LocationPermission => self.on_permission(PermissionKind::Location, processor).await,
            UiRequestKind::LocationServicePermission => {
                self.on_permission(PermissionKind::LocationService, processor).await
            },
            UiRequestKind::FirmwareUpgrade => {
                self.state = FlowState::AwaitingFirmwareDecision;
                let content = event.content.as_deref().unwrap_or("");
                // Resolves only through an explicit close, not through the response channel.
                processor.on_firmware_upgrade(content).await?;
                self.state = FlowState::Failed(DeviceError::FirmwareUpgradeRequired);
                Ok(())
            },
            UiRequestKind::BridgeRequired => {
                processor.on_bridge_required().await?;
                self.state = FlowState::Failed(DeviceError::BridgeUnavailable);
                Ok(())
            },
        }
    }

    async fn on_pin<P>(&mut self, payload: &UiRequestPayload, processor: &P) -> ProcessingResult<(), P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        self.state = FlowState::AwaitingPin;
        let on_device = self.on_device_pin(payload).await;
        let prompt = PinPrompt {
            device_type: payload.device_type.clone(),
            on_device,
        };
        let reply = processor.on_pin_request(prompt).await?;
        let response = match reply {
            PinReply::Digits(digits) => PinResponse::Digits(digits),
            PinReply::EnterOnDevice => PinResponse::EnterOnDevice,
        };
        self.send_response(UiResponse::Pin(response)).await?;
        self.state = FlowState::Requesting;
        Ok(())
    }

    async fn on_passphrase<P>(
        &mut self,
        payload: &UiRequestPayload,
        on_device: bool,
        processor: &P,
    ) -> ProcessingResult<(), P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        self.state = FlowState::AwaitingPassphrase;
        let prompt = PassphrasePrompt {
            device_type: payload.device_type.clone(),
            on_device,
        };
        if on_device {
            // The device collects the passphrase itself; the prompt is informational.
            processor.on_passphrase_request(prompt).await?;
            return Ok(());
        }
        let reply = processor.on_passphrase_request(prompt).await?;
        let response = match reply {
            PassphraseReply::HostInput(value) => PassphraseResponse::host_input(value),
            PassphraseReply::EnterOnDevice => PassphraseResponse::on_device(),
        };
        self.send_response(UiResponse::Passphrase(response)).await?;
        self.state = FlowState::Requesting;
        Ok(())
    }

    async fn on_permission<P>(&mut self, kind: PermissionKind, processor: &P) -> ProcessingResult<(), P::Error>
    where
        P: InteractionProcessor + Sync,
    {
        self.state = FlowState::AwaitingPermission;
        match processor.on_permission_request(kind).await? {
            PermissionDecision::Granted => {
                self.state = FlowState::Requesting;
            },
            // Navigating the user away from the device screen is the processor's concern.
            PermissionDecision::Denied => {
                self.state = FlowState::Failed(DeviceError::PermissionDenied(kind));
            },
        }
        Ok(())
    }

    /// Decide whether the PIN is entered on the device. The per-device capability flag comes
    /// from the wallet's device registry; a missing record or a lookup error falls back to
    /// the capabilities advertised with the request itself.
    async fn on_device_pin(&self, payload: &UiRequestPayload) -> bool {
        let fallback = !payload.supports_software_pin;
        let device_id = match &payload.device_id {
            Some(device_id) => device_id,
            None => return fallback,
        };
        match self.device_info.device_capabilities(device_id).await {
            Ok(Some(capabilities)) => capabilities.on_device_pin.unwrap_or(fallback),
            Ok(None) => fallback,
            Err(e) => {
                warn!("Error fetching '{}' capabilities: {}", device_id, e);
                fallback
            },
        }
    }

    async fn send_response<E>(&mut self, response: UiResponse) -> ProcessingResult<(), E> {
        self.sdk
            .send_ui_response(response)
            .await
            .map_traced(|e| ProcessingError::Device(DeviceError::from(e)))
    }
}
