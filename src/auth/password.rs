//! Password hashing. bcrypt is CPU-bound, so both operations run on the
//! blocking thread pool instead of stalling the request executor.

use bcrypt::BcryptError;

use crate::config;

pub async fn hash(plaintext: &str) -> Result<String, BcryptError> {
    let cost = config::config().security.bcrypt_cost;
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
        .await
        .unwrap_or_else(|e| Err(BcryptError::InvalidHash(format!("hash task failed: {}", e))))
}

pub async fn verify(plaintext: &str, digest: &str) -> Result<bool, BcryptError> {
    let plaintext = plaintext.to_string();
    let digest = digest.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
        .await
        .unwrap_or_else(|e| Err(BcryptError::InvalidHash(format!("verify task failed: {}", e))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let digest = hash("hunter2").await.unwrap();
        assert!(verify("hunter2", &digest).await.unwrap());
        assert!(!verify("hunter3", &digest).await.unwrap());
    }
}
