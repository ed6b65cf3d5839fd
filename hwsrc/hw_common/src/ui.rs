use crate::session::{ConnectId, DeviceId, DeviceModel, PassphraseState};
use derive_more::Display;

/// The different kinds of user interaction the device (or the transport on its behalf)
/// can request while a call is in flight.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiRequestKind {
    RequestPin,
    RequestPassphrase,
    RequestPassphraseOnDevice,
    RequestButton,
    BluetoothPermission,
    LocationPermission,
    LocationServicePermission,
    FirmwareUpgrade,
    BridgeRequired,
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    #[display(fmt = "bluetooth")]
    Bluetooth,
    #[display(fmt = "location")]
    Location,
    #[display(fmt = "locationService")]
    LocationService,
}

/// Structural equality of the payload is the de-duplication key for rapid-fire
/// duplicate requests, hence `Eq + Hash`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiRequestPayload {
    pub device_connect_id: ConnectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceModel>,
    #[serde(default)]
    pub bootloader_mode: bool,
    #[serde(default)]
    pub supports_software_pin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_state: Option<PassphraseState>,
}

impl UiRequestPayload {
    pub fn new(device_connect_id: ConnectId) -> UiRequestPayload {
        UiRequestPayload {
            device_connect_id,
            device_id: None,
            device_type: None,
            bootloader_mode: false,
            supports_software_pin: false,
            passphrase_state: None,
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct UiRequest {
    pub kind: UiRequestKind,
    pub payload: UiRequestPayload,
    /// Free-form text accompanying blocking dialogs (e.g. firmware release notes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PinResponse {
    Digits(String),
    EnterOnDevice,
}

/// The passphrase answer submitted back to the transport.
///
/// `save` is always `false`: the "remember passphrase" flag is deliberately not honored
/// by this layer, which is why the field has no public constructor path to `true`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseResponse {
    pub value: String,
    #[serde(rename = "passphraseOnDevice")]
    pub on_device: bool,
    save: bool,
}

impl PassphraseResponse {
    pub fn host_input<S: Into<String>>(value: S) -> PassphraseResponse {
        PassphraseResponse {
            value: value.into(),
            on_device: false,
            save: false,
        }
    }

    pub fn on_device() -> PassphraseResponse {
        PassphraseResponse {
            value: String::new(),
            on_device: true,
            save: false,
        }
    }

    pub fn save(&self) -> bool { self.save }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UiResponse {
    Pin(PinResponse),
    Passphrase(PassphraseResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_response_never_saves() {
        assert!(!PassphraseResponse::host_input("hunter2").save());
        assert!(!PassphraseResponse::on_device().save());
    }

    #[test]
    fn test_ui_response_wire_shape() {
        let response = UiResponse::Passphrase(PassphraseResponse::host_input("hunter2"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "passphrase",
                "payload": { "value": "hunter2", "passphraseOnDevice": false, "save": false }
            })
        );
    }
}
