//! The keyring facade: the stable contract between wallet business logic and hardware
//! signing. Per-chain implementations expose account preparation, address derivation and
//! transaction signing over one device session; they are selected through an explicit
//! chain-id registry.

#[macro_use] extern crate serde_derive;

pub mod account;
pub mod context;
pub mod error;
pub mod kaspa;
pub mod registry;
pub mod signer;

pub use account::{AccountRecord, AccountType};
pub use context::WalletContext;
pub use error::{KeyringError, KeyringResult};
pub use kaspa::KaspaKeyring;
pub use registry::SignerRegistry;
pub use signer::{AddressEntry, HardwareSigner, HwAddressParams, PrepareAccountsParams, SignedTx, UnsignedTx};
