//! Signed HTTPS client for the networktools control-plane API.
//!
//! Every call is authenticated the same way: a random nonce, a signature
//! over `"{path}\n{nonce}\n{querystring-or-json-body}"` using the node's
//! Ed25519 private key, and a client id derived from the SHA-256 digest of
//! the public key's SPKI-DER encoding — so the controller can look the
//! caller up without the public key riding along on every request. See
//! [`identity::SigningIdentity`] for the signing half and
//! [`client::ControllerClient`] for the endpoint surface.

mod client;
mod error;
mod fake;
pub mod identity;
mod wire;

pub use client::{ControllerClient, HttpControllerClient};
pub use error::ControllerError;
pub use fake::{FakeControllerClient, RecordedCalls};
pub use identity::SigningIdentity;
pub use wire::{JoinRequest, JoinResponse, LinkTelemetry};
