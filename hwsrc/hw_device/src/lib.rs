#[macro_use] extern crate serde_derive;

pub mod client;
pub mod error;
pub mod flow;
pub mod processor;

pub use client::{HwClient, HwSession};
pub use error::{DeviceError, DeviceResult};
pub use flow::{DedupGuard, DeviceInfoError, DeviceInfoProvider, FlowState, InteractionFlow, DEDUP_WINDOW};
pub use processor::{InteractionProcessor, PassphrasePrompt, PassphraseReply, PermissionDecision, PinPrompt, PinReply,
                    ProcessingError, ProcessingResult};
