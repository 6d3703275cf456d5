//! Bearer credential and its validity rule

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Access token paired with the instant it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Validity of the stored credential at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Expired,
    Missing,
}

impl Credential {
    /// Build a credential from a token response received at `now`
    ///
    /// `None` when the lifetime is negative or the expiry is not representable.
    pub fn from_expires_in(access_token: String, expires_in_secs: i64, now: DateTime<Utc>) -> Option<Self> {
        if expires_in_secs < 0 {
            return None;
        }
        let expires_at = now.checked_add_signed(Duration::try_seconds(expires_in_secs)?)?;
        Some(Self {
            access_token,
            expires_at,
        })
    }

    /// True iff the token is non-empty and `now` is strictly before expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expires_at
    }

    /// Classify the credential for reporting
    pub fn status_at(&self, now: DateTime<Utc>) -> CredentialStatus {
        if self.access_token.is_empty() {
            CredentialStatus::Missing
        } else if now < self.expires_at {
            CredentialStatus::Valid
        } else {
            CredentialStatus::Expired
        }
    }
}

/// Keyring shape: token and expiry as two named scalars
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredCredential {
    #[serde(rename = "spotifyAccessToken")]
    pub access_token: String,
    /// Epoch milliseconds
    #[serde(rename = "spotifyTokenExpiresAt")]
    pub expires_at: i64,
}

impl From<&Credential> for StoredCredential {
    fn from(cred: &Credential) -> Self {
        Self {
            access_token: cred.access_token.clone(),
            expires_at: cred.expires_at.timestamp_millis(),
        }
    }
}

impl StoredCredential {
    pub fn into_credential(self) -> Option<Credential> {
        let expires_at = Utc.timestamp_millis_opt(self.expires_at).single()?;
        Some(Credential {
            access_token: self.access_token,
            expires_at,
        })
    }
}
