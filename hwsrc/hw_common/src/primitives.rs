use derive_more::Display;
use std::str::FromStr;

pub const HARDENED_PATH: u32 = 2147483648;

pub use bip32::{ChildNumber, DerivationPath, Error as Bip32Error};

/// The placeholder replaced with an account index when a path is derived from a template,
/// e.g. `m/44'/111111'/{index}'`.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Convert a BIP-32 path into the `u32` sequence expected by device payloads.
pub fn serialize_derivation_path(path: &DerivationPath) -> Vec<u32> { path.iter().map(|index| index.0).collect() }

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum PathTemplateError {
    #[display(fmt = "Derivation path template must contain the '{}' placeholder", "INDEX_PLACEHOLDER")]
    MissingIndexPlaceholder,
    #[display(fmt = "Malformed derivation path template: {}", _0)]
    Malformed(String),
}

/// A derivation path template with a single account-index placeholder.
///
/// Templates are validated on construction, so resolving a path for a concrete index
/// cannot fail afterwards other than through the same parsing path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathTemplate {
    template: String,
}

impl PathTemplate {
    pub fn new(template: &str) -> Result<PathTemplate, PathTemplateError> {
        if !template.contains(INDEX_PLACEHOLDER) {
            return Err(PathTemplateError::MissingIndexPlaceholder);
        }
        let probe = template.replace(INDEX_PLACEHOLDER, "0");
        DerivationPath::from_str(&probe).map_err(|e| PathTemplateError::Malformed(e.to_string()))?;
        Ok(PathTemplate {
            template: template.to_owned(),
        })
    }

    /// The template with the placeholder segment and everything after it sliced off.
    pub fn prefix(&self) -> &str {
        self.template
            .split(INDEX_PLACEHOLDER)
            .next()
            .unwrap_or("")
            .trim_end_matches('/')
    }

    pub fn path_for_index(&self, index: u32) -> Result<DerivationPath, PathTemplateError> {
        let path = self.template.replace(INDEX_PLACEHOLDER, &index.to_string());
        DerivationPath::from_str(&path).map_err(|e| PathTemplateError::Malformed(e.to_string()))
    }
}
