use nostr_sdk::prelude::*;

use crate::error::CoreError;

/// Ask the signing capability for the operator's public key (hex).
///
/// `None` means no signer is installed on this system.
pub async fn login<S>(signer: Option<&S>) -> Result<String, CoreError>
where
    S: NostrSigner + ?Sized,
{
    let signer = signer.ok_or(CoreError::NoSigner)?;
    let public_key = signer
        .get_public_key()
        .await
        .map_err(|e| CoreError::Signer(e.to_string()))?;
    Ok(public_key.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_with_keys() {
        let keys = Keys::generate();
        let pubkey = login(Some(&keys)).await.unwrap();
        assert_eq!(pubkey, keys.public_key().to_hex());
    }

    #[tokio::test]
    async fn test_login_through_trait_object() {
        let keys = Keys::generate();
        let expected = keys.public_key().to_hex();
        let signer: Arc<dyn NostrSigner> = Arc::new(keys);
        assert_eq!(login(Some(signer.as_ref())).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_login_without_signer() {
        let result = login::<Keys>(None).await;
        assert!(matches!(result, Err(CoreError::NoSigner)));
    }
}
