//! Credential set held by the client and the LWA refresh-token exchange.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;

use super::SpApiError;
use crate::model::AmazonCredentials;

/// The credential set a client session acts with.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub seller_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("seller_id", &self.seller_id)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_access_token", &self.access_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl From<&AmazonCredentials> for Credentials {
    fn from(stored: &AmazonCredentials) -> Self {
        Self {
            seller_id: stored.seller_id.clone(),
            refresh_token: Some(stored.refresh_token.clone()).filter(|t| !t.is_empty()),
            access_token: stored.access_token.clone(),
            expires_at: stored.token_expires_at,
        }
    }
}

/// LWA application identity used for the refresh grant.
#[derive(Clone)]
pub struct LwaApp {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for LwaApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LwaApp")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

impl TokenResponse {
    /// Absolute expiry, or an error when `expires_in` is negative or too
    /// large to represent.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SpApiError> {
        if self.expires_in < 0 {
            return Err(SpApiError::InvalidTokenResponse(format!(
                "negative expires_in {}",
                self.expires_in
            )));
        }
        Duration::try_seconds(self.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                SpApiError::InvalidTokenResponse(format!(
                    "expires_in {} out of range",
                    self.expires_in
                ))
            })
    }
}

impl LwaApp {
    pub(crate) fn build_refresh_request(
        &self,
        http: &Client,
        refresh_token: &str,
    ) -> Result<reqwest::Request, SpApiError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        Ok(http
            .post(self.token_url.clone())
            .form(&params)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_tokens() {
        let creds = Credentials {
            seller_id: "A1".into(),
            refresh_token: Some("Atzr|secret".into()),
            access_token: Some("Atza|secret".into()),
            expires_at: None,
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("has_refresh_token: true"));
    }

    #[test]
    fn refresh_request_is_form_encoded() {
        let app = LwaApp {
            token_url: Url::parse("https://api.amazon.com/auth/o2/token").unwrap(),
            client_id: "cid".into(),
            client_secret: "csecret".into(),
        };
        let request = app
            .build_refresh_request(&Client::new(), "Atzr|abc")
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request
                .headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/x-www-form-urlencoded"
        );
        let body = std::str::from_utf8(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(body.contains("grant_type=refresh_token"));
        assert!(body.contains("refresh_token=Atzr%7Cabc"));
    }

    #[test]
    fn token_expiry_rejects_out_of_range_lifetimes() {
        let now = Utc::now();
        let ok = TokenResponse {
            access_token: "Atza|x".into(),
            expires_in: 3600,
        };
        assert_eq!(ok.expires_at(now).unwrap(), now + Duration::seconds(3600));

        for expires_in in [9_000_000_000_000, i64::MAX, -1] {
            let bad = TokenResponse {
                access_token: "Atza|x".into(),
                expires_in,
            };
            assert!(matches!(
                bad.expires_at(now),
                Err(SpApiError::InvalidTokenResponse(_))
            ));
        }
    }

    #[test]
    fn expiry_in_the_past_counts_as_expired() {
        let mut creds = Credentials::default();
        assert!(!creds.is_expired());
        creds.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(creds.is_expired());
    }

    #[test]
    fn empty_stored_refresh_token_counts_as_missing() {
        let now = Utc::now();
        let stored = AmazonCredentials {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            seller_id: "A1".into(),
            marketplace_id: "ATVPDKIKX0DER".into(),
            refresh_token: String::new(),
            access_token: None,
            token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Credentials::from(&stored).refresh_token.is_none());
    }
}
