use derive_more::Display;
use hw_device::error::DeviceError;
use hw_device::processor::ProcessingError;
use hw_err_handle::prelude::*;
use std::fmt;

pub type KeyringResult<T> = TracedResult<T, KeyringError>;

#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(tag = "error_type", content = "error_data")]
pub enum KeyringError {
    #[display(fmt = "Hardware wallet error: {}", _0)]
    Hardware(DeviceError),
    #[display(fmt = "Invalid derivation path template: {}", _0)]
    InvalidPathTemplate(String),
    #[display(fmt = "Invalid encoded transaction: {}", _0)]
    InvalidEncodedTx(String),
    #[display(fmt = "'{}' chain is not registered", _0)]
    ChainNotRegistered(String),
    #[display(fmt = "UI processor error: {}", _0)]
    Processor(String),
    #[display(fmt = "Internal error: {}", _0)]
    Internal(String),
}

impl From<DeviceError> for KeyringError {
    fn from(e: DeviceError) -> Self { KeyringError::Hardware(e) }
}

impl KeyringError {
    pub fn hardware_error(&self) -> Option<&DeviceError> {
        match self {
            KeyringError::Hardware(device) => Some(device),
            _ => None,
        }
    }
}

/// Convert a traced interaction-flow error into a traced keyring error,
/// preserving the collected trace.
pub fn from_processing<E: fmt::Display>(e: TracedError<ProcessingError<E>>) -> TracedError<KeyringError> {
    e.map(|processing| match processing {
        ProcessingError::Device(device) => KeyringError::Hardware(device),
        ProcessingError::Processor(processor) => KeyringError::Processor(processor.to_string()),
    })
}
