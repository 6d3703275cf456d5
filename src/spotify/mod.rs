//! Spotify Web API and accounts service

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod pkce;

pub use auth::{AuthFlow, AuthState};
pub use client::SpotifyClient;
pub use error::{ApiError, AuthError, CommandError, MissingCredential, ValidationError};
