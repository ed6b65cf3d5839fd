use derive_more::Display;

/// Identifier of an established logical connection to a physical device.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[display(fmt = "{}", _0)]
pub struct ConnectId(String);

impl ConnectId {
    pub fn new<S: Into<String>>(id: S) -> ConnectId { ConnectId(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ConnectId {
    fn from(id: &str) -> Self { ConnectId(id.to_owned()) }
}

/// Identifier of the physical device itself, stable across reconnects.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[display(fmt = "{}", _0)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new<S: Into<String>>(id: S) -> DeviceId { DeviceId(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self { DeviceId(id.to_owned()) }
}

/// An opaque token proving that a passphrase has already been applied to the device
/// for the current session.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct PassphraseState(String);

impl PassphraseState {
    pub fn new<S: Into<String>>(state: S) -> PassphraseState { PassphraseState(state.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

/// An established logical connection to a physical signing device.
/// The session outlives any single call and is reused until explicitly torn down
/// or the device disconnects; only the transport layer mutates it.
#[derive(Clone, Debug)]
pub struct DeviceSession {
    pub connect_id: ConnectId,
    pub device_id: DeviceId,
    pub passphrase_state: Option<PassphraseState>,
}

impl DeviceSession {
    pub fn new(connect_id: ConnectId, device_id: DeviceId) -> DeviceSession {
        DeviceSession {
            connect_id,
            device_id,
            passphrase_state: None,
        }
    }
}

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    #[display(fmt = "classic")]
    Classic,
    #[display(fmt = "mini")]
    Mini,
    #[display(fmt = "touch")]
    Touch,
    #[display(fmt = "pro")]
    Pro,
    #[display(fmt = "unknown({})", _0)]
    Unknown(String),
}

impl DeviceModel {
    pub fn from_label(label: &str) -> DeviceModel {
        match label.to_lowercase().as_str() {
            "classic" => DeviceModel::Classic,
            "mini" => DeviceModel::Mini,
            "touch" => DeviceModel::Touch,
            "pro" => DeviceModel::Pro,
            other => DeviceModel::Unknown(other.to_owned()),
        }
    }
}

/// Device metadata as reported by the transport in response to a features request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFeatures {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub model: Option<DeviceModel>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub on_device_pin: Option<bool>,
    #[serde(default)]
    pub passphrase_protection: Option<bool>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub bootloader_mode: Option<bool>,
}

/// Per-device capability flags as stored by the wallet's device registry.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    #[serde(default)]
    pub on_device_pin: Option<bool>,
}
