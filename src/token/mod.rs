//! Spotify credential storage

pub mod credential;
pub mod store;

pub use credential::{Credential, CredentialStatus};
pub use store::{KeyringStorage, TokenStore};

