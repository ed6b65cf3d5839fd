//! The transport contract.
//!
//! The vendor SDK speaking the device's wire protocol is an external collaborator.
//! This module defines only the capability interface the signing core calls into:
//! session management, a fire-and-forget UI response channel, an event stream of
//! interaction requests, and the per-chain RPC-like calls.

use crate::payloads::{AddressInfo, GetAddressParams, InputSignature, SigningRequest};
use crate::session::{ConnectId, DeviceFeatures, DeviceId};
use crate::ui::{UiRequest, UiResponse};
use async_trait::async_trait;
use derive_more::Display;
use futures::channel::mpsc::UnboundedReceiver;
use hw_err_handle::prelude::*;

pub type TransportResult<T> = TracedResult<T, TransportError>;

/// A failure of the transport itself - not a structured device response.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum TransportError {
    #[display(fmt = "Transport is not available: {}", _0)]
    Unavailable(String),
    #[display(fmt = "Device disconnected")]
    DeviceDisconnected,
    #[display(fmt = "Underlying transport error: {}", _0)]
    UnderlyingError(String),
    #[display(fmt = "Internal error: {}", _0)]
    Internal(String),
}

/// The raw vendor error shape carried by an unsuccessful device response.
/// It is never inspected outside the error normalization point.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct DeviceFailure {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl DeviceFailure {
    pub fn new(code: i64, message: &str) -> DeviceFailure {
        DeviceFailure {
            code: Some(code),
            message: message.to_owned(),
        }
    }
}

/// Vendor error codes recognized by the normalization layer.
/// Anything else maps to a generic error with the code and message preserved.
pub mod codes {
    pub const ACTION_CANCELLED: i64 = 8001;
    pub const BLE_DEVICE_NOT_BONDED: i64 = 8002;
    pub const BRIDGE_NOT_INSTALLED: i64 = 8003;
    pub const FIRMWARE_UPGRADE_REQUIRED: i64 = 8004;
    pub const BLE_PERMISSION_DENIED: i64 = 8005;
    pub const LOCATION_PERMISSION_DENIED: i64 = 8006;
    pub const LOCATION_SERVICE_DISABLED: i64 = 8007;
}

/// The typed `{success, payload}` envelope of a device call.
#[derive(Clone, Debug)]
pub enum SdkResponse<T> {
    Ready(T),
    Failure(DeviceFailure),
}

/// The capability interface of a hardware wallet SDK.
///
/// Per-chain calls resolve once the device flow completes; user interaction requests raised
/// while a call is in flight are delivered through the UI event stream and answered through
/// [`HardwareSdk::send_ui_response`]. Timeouts are owned by the transport, not by callers.
#[async_trait]
pub trait HardwareSdk: Send + Sync {
    async fn connect(&self, connect_id: &ConnectId) -> TransportResult<bool>;

    async fn get_features(&self, connect_id: &ConnectId) -> TransportResult<DeviceFeatures>;

    /// Abort the in-flight operation on the given connection.
    async fn cancel(&self, connect_id: &ConnectId) -> TransportResult<()>;

    /// Answer a pending interaction request. Fire-and-forget: the outcome is observed
    /// through the settlement of the in-flight call.
    async fn send_ui_response(&self, response: UiResponse) -> TransportResult<()>;

    /// Subscribe to interaction requests raised while calls are in flight.
    fn subscribe_ui_events(&self) -> UnboundedReceiver<UiRequest>;

    async fn get_address(
        &self,
        connect_id: &ConnectId,
        device_id: &DeviceId,
        params: GetAddressParams,
    ) -> TransportResult<SdkResponse<Vec<AddressInfo>>>;

    async fn sign_transaction(
        &self,
        connect_id: &ConnectId,
        device_id: &DeviceId,
        request: SigningRequest,
    ) -> TransportResult<SdkResponse<Vec<InputSignature>>>;
}
