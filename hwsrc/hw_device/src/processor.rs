//! The capability interface between the interaction flow and whatever surfaces prompts to
//! the user. The signing core never renders UI itself; it only dispatches through this trait.

use crate::error::DeviceError;
use async_trait::async_trait;
use derive_more::Display;
use hw_common::session::DeviceModel;
use hw_common::ui::PermissionKind;
use hw_err_handle::prelude::*;
use std::fmt;

#[derive(Debug, Display)]
pub enum ProcessingError<E> {
    #[display(fmt = "{}", _0)]
    Device(DeviceError),
    #[display(fmt = "{}", _0)]
    Processor(E),
}

impl<E> From<DeviceError> for ProcessingError<E> {
    fn from(e: DeviceError) -> Self { ProcessingError::Device(e) }
}

impl<E> ProcessingError<E> {
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            ProcessingError::Device(device) => Some(device),
            ProcessingError::Processor(_) => None,
        }
    }
}

pub type ProcessingResult<T, E> = TracedResult<T, ProcessingError<E>>;

#[derive(Clone, Debug)]
pub struct PinPrompt {
    pub device_type: Option<DeviceModel>,
    /// Whether digits are entered on the device itself. When true the prompt is purely
    /// informational and no input is collected on the host.
    pub on_device: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PinReply {
    Digits(String),
    EnterOnDevice,
}

#[derive(Clone, Debug)]
pub struct PassphrasePrompt {
    pub device_type: Option<DeviceModel>,
    /// Whether the passphrase is entered on the device itself.
    pub on_device: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PassphraseReply {
    HostInput(String),
    EnterOnDevice,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

/// Handles interaction requests raised while a device call is in flight.
///
/// Implementors surface the matching prompt and resolve once the user acted. Returning an
/// error from any handler aborts the flow: the in-flight device operation is cancelled
/// best-effort and the error is propagated to the caller of the signing operation.
#[async_trait]
pub trait InteractionProcessor: Send + Sync {
    type Error: Send + fmt::Display;

    async fn on_pin_request(&self, prompt: PinPrompt) -> ProcessingResult<PinReply, Self::Error>;

    async fn on_passphrase_request(&self, prompt: PassphrasePrompt) -> ProcessingResult<PassphraseReply, Self::Error>;

    /// Purely informational; the device resolves it through a physical button press.
    async fn on_button_request(&self) -> ProcessingResult<(), Self::Error>;

    async fn on_permission_request(&self, kind: PermissionKind) -> ProcessingResult<PermissionDecision, Self::Error>;

    /// Blocks until the user explicitly closes the dialog; there is no response channel.
    async fn on_firmware_upgrade(&self, content: &str) -> ProcessingResult<(), Self::Error>;

    async fn on_bridge_required(&self) -> ProcessingResult<(), Self::Error>;

    /// The flow settled (successfully or not); any lingering prompt should be dismissed.
    async fn on_ready(&self) -> ProcessingResult<(), Self::Error>;
}
