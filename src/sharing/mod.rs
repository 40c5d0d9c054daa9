//! Issuing shareable profile links and delivering them to customers.

mod message;
mod workflow;

pub use message::{build_payload, share_url, SharePayload};
pub use workflow::{ShareForm, ShareReceipt, ShareWorkflow};
