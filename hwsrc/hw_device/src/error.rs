//! The application-level device error taxonomy and the single point where raw vendor
//! failures and transport errors are normalized into it.
//!
//! Call sites never inspect [`DeviceFailure`] shapes directly; they either propagate the
//! normalized error or branch on its kind.

use derive_more::Display;
use hw_common::transport::{codes, DeviceFailure, TransportError};
use hw_common::ui::PermissionKind;
use hw_err_handle::prelude::*;

pub type DeviceResult<T> = TracedResult<T, DeviceError>;

#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(tag = "error_type", content = "error_data")]
pub enum DeviceError {
    #[display(fmt = "Cancelled by the user")]
    UserCancelled,
    #[display(fmt = "Device is not bonded")]
    DeviceNotBonded,
    #[display(fmt = "Hardware bridge is not installed or not running")]
    BridgeUnavailable,
    #[display(fmt = "Device firmware is too old and must be upgraded")]
    FirmwareUpgradeRequired,
    #[display(fmt = "'{}' permission denied", _0)]
    PermissionDenied(PermissionKind),
    /// The device response violates the protocol contract. A programming/firmware error,
    /// surfaced as a hard failure and never retried.
    #[display(fmt = "Malformed device response: {}", _0)]
    MalformedDeviceResponse(String),
    /// The device signed fewer inputs than the transaction has. A hard failure:
    /// a partially signed transaction must never be emitted.
    #[display(fmt = "Device signed {} of {} inputs", signed, total)]
    IncompleteSignature { signed: usize, total: usize },
    #[display(fmt = "Device error {:?}: {}", code, message)]
    Generic { code: Option<i64>, message: String },
}

impl From<DeviceFailure> for DeviceError {
    fn from(failure: DeviceFailure) -> DeviceError {
        match failure.code {
            Some(codes::ACTION_CANCELLED) => DeviceError::UserCancelled,
            Some(codes::BLE_DEVICE_NOT_BONDED) => DeviceError::DeviceNotBonded,
            Some(codes::BRIDGE_NOT_INSTALLED) => DeviceError::BridgeUnavailable,
            Some(codes::FIRMWARE_UPGRADE_REQUIRED) => DeviceError::FirmwareUpgradeRequired,
            Some(codes::BLE_PERMISSION_DENIED) => DeviceError::PermissionDenied(PermissionKind::Bluetooth),
            Some(codes::LOCATION_PERMISSION_DENIED) => DeviceError::PermissionDenied(PermissionKind::Location),
            Some(codes::LOCATION_SERVICE_DISABLED) => DeviceError::PermissionDenied(PermissionKind::LocationService),
            code => DeviceError::Generic {
                code,
                message: failure.message,
            },
        }
    }
}

/// A raised transport failure is not a structured device response; the original message
/// is preserved.
impl From<TransportError> for DeviceError {
    fn from(e: TransportError) -> DeviceError {
        DeviceError::Generic {
            code: None,
            message: e.to_string(),
        }
    }
}
