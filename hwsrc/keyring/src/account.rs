#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Simple,
}

/// An account record handed to the wallet's storage collaborator. Opaque to this crate
/// beyond construction.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub path: String,
    pub coin_type: String,
    #[serde(rename = "pub")]
    pub pub_key: String,
    pub address: String,
}
