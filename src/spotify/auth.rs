//! Authorization-code flow with PKCE and manual code paste
//!
//! The flow never opens a browser or listens for a callback itself: it
//! produces the authorize URL for the caller to open, then accepts the code
//! the user copies from the redirect page.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::models::TokenResponse;
use super::pkce::PkcePair;
use crate::token::{Credential, TokenStore};

/// Accounts service host
pub const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Scopes requested on every authorization
pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state user-read-currently-playing user-read-playback-position";

/// Where the flow currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingClientId,
    AwaitingUserCode,
    Exchanging,
    Authenticated,
    /// Carries the failure detail shown to the user
    Failed(String),
}

/// Drives one user through authorize → paste code → token exchange
pub struct AuthFlow {
    client_id: String,
    redirect_uri: String,
    accounts_base: String,
    tokens: Arc<TokenStore>,
    http_client: Client,
    state: AuthState,
    pkce: Option<PkcePair>,
}

impl AuthFlow {
    pub fn new(client_id: &str, redirect_uri: &str, tokens: Arc<TokenStore>) -> Result<Self, AuthError> {
        Self::with_accounts_base(ACCOUNTS_BASE, client_id, redirect_uri, tokens)
    }

    pub fn with_accounts_base(
        accounts_base: &str,
        client_id: &str,
        redirect_uri: &str,
        tokens: Arc<TokenStore>,
    ) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .user_agent(concat!("spotify-widget/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(Self {
            client_id: client_id.trim().to_string(),
            redirect_uri: redirect_uri.to_string(),
            accounts_base: accounts_base.trim_end_matches('/').to_string(),
            tokens,
            http_client,
            state: AuthState::Idle,
            pkce: None,
        })
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Supply the client id after the flow halted without one
    pub fn set_client_id(&mut self, client_id: &str) {
        self.client_id = client_id.trim().to_string();
        if self.state == AuthState::AwaitingClientId && !self.client_id.is_empty() {
            self.state = AuthState::Idle;
        }
    }

    /// Start an attempt and return the URL the user must open
    ///
    /// Any previous verifier is discarded. Without a client id the flow stops
    /// in `AwaitingClientId` and no URL is produced.
    pub fn begin(&mut self) -> Result<String, AuthError> {
        self.pkce = None;

        if self.client_id.is_empty() {
            self.state = AuthState::AwaitingClientId;
            return Err(AuthError::MissingClientId);
        }

        let pkce = PkcePair::generate();
        let url = self.authorize_url(&pkce.challenge);
        self.pkce = Some(pkce);
        self.state = AuthState::AwaitingUserCode;

        debug!("Authorization URL: {}", url);
        Ok(url)
    }

    /// Authorize URL for a given challenge
    pub fn authorize_url(&self, challenge: &str) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", SCOPES),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
            ("show_dialog", "true"),
        ];
        let query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/authorize?{}", self.accounts_base, query)
    }

    /// Exchange the pasted code for a credential and store it
    pub async fn exchange(&mut self, pasted_code: &str) -> Result<Credential, AuthError> {
        self.exchange_at(pasted_code, Utc::now()).await
    }

    /// As `exchange`, computing the expiry relative to `now`
    pub async fn exchange_at(&mut self, pasted_code: &str, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        if self.state != AuthState::AwaitingUserCode {
            return Err(AuthError::InvalidState);
        }

        let code = pasted_code.trim();
        if code.is_empty() {
            return Err(AuthError::EmptyCode);
        }

        // The verifier is single use whatever the outcome
        let pkce = self.pkce.take().ok_or(AuthError::InvalidState)?;
        self.state = AuthState::Exchanging;

        match self.request_token(code, &pkce.verifier, now).await {
            Ok(credential) => {
                if let Err(e) = self.tokens.set(credential.clone()) {
                    let err = AuthError::Storage(format!("{:#}", e));
                    self.state = AuthState::Failed(err.to_string());
                    return Err(err);
                }
                info!("Authenticated with Spotify, token valid until {}", credential.expires_at);
                self.state = AuthState::Authenticated;
                Ok(credential)
            }
            Err(err) => {
                warn!("Token exchange failed: {}", err);
                self.state = AuthState::Failed(match &err {
                    AuthError::Exchange { body } => body.clone(),
                    other => other.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn request_token(&self, code: &str, verifier: &str, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        let url = format!("{}/api/token", self.accounts_base);
        let form = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ];

        let response = self
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(AuthError::Exchange { body });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))?;
        if let Some(scope) = &token.scope {
            debug!("Granted scopes: {}", scope);
        }

        Credential::from_expires_in(token.access_token, token.expires_in, now).ok_or_else(|| {
            AuthError::MalformedTokenResponse(format!("expires_in out of range: {}", token.expires_in))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::SpotifyClient;
    use mockito::Matcher;

    const REDIRECT: &str = "https://example.test/callback/";

    fn flow_for(server: &mockito::ServerGuard, client_id: &str, tokens: Arc<TokenStore>) -> AuthFlow {
        AuthFlow::with_accounts_base(&server.url(), client_id, REDIRECT, tokens).unwrap()
    }

    #[test]
    fn test_missing_client_id_halts() {
        let mut flow = AuthFlow::new("  ", REDIRECT, Arc::new(TokenStore::in_memory(None))).unwrap();
        assert!(matches!(flow.begin(), Err(AuthError::MissingClientId)));
        assert_eq!(flow.state(), &AuthState::AwaitingClientId);

        flow.set_client_id("abc");
        assert_eq!(flow.state(), &AuthState::Idle);
        assert!(flow.begin().is_ok());
        assert_eq!(flow.state(), &AuthState::AwaitingUserCode);
    }

    #[test]
    fn test_authorize_url_parameters() {
        let flow = AuthFlow::new("client123", REDIRECT, Arc::new(TokenStore::in_memory(None))).unwrap();
        let url = url::Url::parse(&flow.authorize_url("CHALLENGE")).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client123");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], REDIRECT);
        assert_eq!(params["scope"], SCOPES);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], "CHALLENGE");
        assert_eq!(params["show_dialog"], "true");
    }

    #[tokio::test]
    async fn test_exchange_without_begin_is_rejected() {
        let server = mockito::Server::new_async().await;
        let mut flow = flow_for(&server, "client123", Arc::new(TokenStore::in_memory(None)));
        assert!(matches!(flow.exchange("code").await, Err(AuthError::InvalidState)));
    }

    #[tokio::test]
    async fn test_exchange_stores_credential_and_authorizes_calls() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/api/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client123".into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "AQD-code".into()),
                Matcher::UrlEncoded("redirect_uri".into(), REDIRECT.into()),
                Matcher::Regex("code_verifier=[A-Za-z0-9]{128}".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"AQX","token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;
        let player_mock = server
            .mock("GET", "/v1/me/player/currently-playing")
            .match_header("authorization", "Bearer AQX")
            .with_status(204)
            .create_async()
            .await;

        let tokens = Arc::new(TokenStore::in_memory(None));
        let mut flow = flow_for(&server, "client123", tokens.clone());
        flow.begin().unwrap();

        let now = Utc::now();
        let cred = flow.exchange_at("  AQD-code\n", now).await.unwrap();

        assert_eq!(flow.state(), &AuthState::Authenticated);
        assert_eq!(
            cred.expires_at.timestamp_millis(),
            now.timestamp_millis() + 3_600_000
        );
        assert_eq!(tokens.get(), Some(cred));
        token_mock.assert_async().await;

        let client = SpotifyClient::with_base_url(&server.url(), tokens).unwrap();
        assert!(client.fetch_current_track().await.unwrap().is_none());
        player_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_failure_surfaces_raw_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#)
            .create_async()
            .await;

        let tokens = Arc::new(TokenStore::in_memory(None));
        let mut flow = flow_for(&server, "client123", tokens.clone());
        flow.begin().unwrap();

        let err = flow.exchange("bad").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Token exchange failed: {"error":"invalid_grant","error_description":"Invalid authorization code"}"#
        );
        assert!(matches!(flow.state(), AuthState::Failed(body) if body.contains("invalid_grant")));
        assert!(tokens.get().is_none());

        // Verifier was consumed, a retry needs a new attempt
        assert!(matches!(flow.exchange("bad").await, Err(AuthError::InvalidState)));
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_rejected() {
        for expires_in in ["9223372036854775807", "-60"] {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/api/token")
                .with_status(200)
                .with_body(format!(r#"{{"access_token":"AQX","expires_in":{}}}"#, expires_in))
                .create_async()
                .await;

            let tokens = Arc::new(TokenStore::in_memory(None));
            let mut flow = flow_for(&server, "client123", tokens.clone());
            flow.begin().unwrap();

            let err = flow.exchange("code").await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedTokenResponse(_)));
            assert!(matches!(flow.state(), AuthState::Failed(_)));
            assert!(tokens.get().is_none());
        }
    }

    #[tokio::test]
    async fn test_empty_code_keeps_waiting() {
        let server = mockito::Server::new_async().await;
        let mut flow = flow_for(&server, "client123", Arc::new(TokenStore::in_memory(None)));
        flow.begin().unwrap();
        assert!(matches!(flow.exchange("   ").await, Err(AuthError::EmptyCode)));
        assert_eq!(flow.state(), &AuthState::AwaitingUserCode);
    }
}
