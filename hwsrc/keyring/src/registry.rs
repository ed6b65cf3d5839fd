use crate::error::{KeyringError, KeyringResult};
use crate::signer::HardwareSigner;
use hw_err_handle::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps a chain id to its hardware signer implementation.
/// Populated explicitly at startup; there is no runtime discovery.
#[derive(Clone, Default)]
pub struct SignerRegistry {
    signers: HashMap<String, Arc<dyn HardwareSigner>>,
}

impl SignerRegistry {
    pub fn new() -> SignerRegistry { SignerRegistry::default() }

    pub fn register<S: Into<String>>(&mut self, chain: S, signer: Arc<dyn HardwareSigner>) {
        self.signers.insert(chain.into(), signer);
    }

    pub fn get(&self, chain: &str) -> KeyringResult<Arc<dyn HardwareSigner>> {
        self.signers
            .get(chain)
            .cloned()
            .or_traced(|| KeyringError::ChainNotRegistered(chain.to_owned()))
    }

    pub fn registered_chains(&self) -> Vec<&str> { self.signers.keys().map(String::as_str).collect() }
}
