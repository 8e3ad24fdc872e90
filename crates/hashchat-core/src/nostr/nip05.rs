//! NIP-05 identifier verification against `/.well-known/nostr.json`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::constants::NIP05_SKIP_DOMAINS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nip05Address {
    pub local: String,
    pub domain: String,
}

impl Nip05Address {
    /// Split `name@domain`. Both halves must be non-empty.
    pub fn parse(nip05: &str) -> Option<Self> {
        let (local, domain) = nip05.trim().split_once('@')?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return None;
        }
        Some(Self {
            local: local.to_string(),
            domain: domain.to_string(),
        })
    }

    pub fn lookup_url(&self) -> String {
        format!(
            "https://{}/.well-known/nostr.json?name={}",
            self.domain, self.local
        )
    }
}

/// Domains on the skip list are never looked up.
pub fn is_skipped(nip05: &str) -> bool {
    NIP05_SKIP_DOMAINS.iter().any(|d| nip05.contains(d))
}

#[derive(Debug, Default, Deserialize)]
pub struct Nip05Document {
    #[serde(default)]
    pub names: HashMap<String, String>,
}

impl Nip05Document {
    pub fn maps(&self, local: &str, pubkey: &str) -> bool {
        self.names.get(local).is_some_and(|pk| pk == pubkey)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nip05Outcome {
    Verified,
    Mismatch,
    Skipped,
}

/// HTTP side of verification. One GET per call, no retries.
#[derive(Debug, Clone, Default)]
pub struct Nip05Verifier {
    client: reqwest::Client,
}

impl Nip05Verifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn verify(&self, nip05: &str, pubkey: &str) -> Result<Nip05Outcome> {
        if is_skipped(nip05) {
            return Ok(Nip05Outcome::Skipped);
        }
        let address = Nip05Address::parse(nip05)
            .with_context(|| format!("Malformed NIP-05 identifier '{}'", nip05))?;

        let response = self
            .client
            .get(address.lookup_url())
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", address.domain))?;

        if !response.status().is_success() {
            // non-2xx is a plain "not verified", same as a missing name
            tracing::debug!(
                "NIP-05 lookup for {} returned {}",
                nip05,
                response.status()
            );
            return Ok(Nip05Outcome::Mismatch);
        }

        let document: Nip05Document = response
            .json()
            .await
            .context("Failed to parse nostr.json")?;

        Ok(if document.maps(&address.local, pubkey) {
            Nip05Outcome::Verified
        } else {
            Nip05Outcome::Mismatch
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address = Nip05Address::parse("bob@example.com").unwrap();
        assert_eq!(address.local, "bob");
        assert_eq!(address.domain, "example.com");
        assert_eq!(
            address.lookup_url(),
            "https://example.com/.well-known/nostr.json?name=bob"
        );

        assert!(Nip05Address::parse("example.com").is_none());
        assert!(Nip05Address::parse("@example.com").is_none());
        assert!(Nip05Address::parse("bob@").is_none());
        assert!(Nip05Address::parse("a@b@c").is_none());
    }

    #[test]
    fn test_document_mapping() {
        let document: Nip05Document =
            serde_json::from_str(r#"{"names":{"bob":"abc123"},"relays":{}}"#).unwrap();
        assert!(document.maps("bob", "abc123"));
        assert!(!document.maps("bob", "def456"));
        assert!(!document.maps("alice", "abc123"));

        let empty: Nip05Document = serde_json::from_str("{}").unwrap();
        assert!(!empty.maps("bob", "abc123"));
    }

    #[tokio::test]
    async fn test_skip_domain_never_looks_up() {
        assert!(is_skipped("dog@bitcoinbarks.com"));
        let outcome = Nip05Verifier::new()
            .verify("dog@bitcoinbarks.com", "abc123")
            .await
            .unwrap();
        assert_eq!(outcome, Nip05Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_an_error() {
        let result = Nip05Verifier::new().verify("not-an-address", "abc123").await;
        assert!(result.is_err());
    }
}
