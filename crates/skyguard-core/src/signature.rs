//! Command signature verification seam.
//!
//! The pipeline never inspects signatures itself. It hands the canonical
//! command bytes and the opaque signature to a [`SignatureVerifier`] and treats
//! anything other than `Ok(true)` as an authenticity failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Command;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Failed to encode command for verification: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Signature verification service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed signature: {0}")]
    Malformed(String),
}

/// External capability that proves a command's origin.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `canonical` (see [`Command::canonical_bytes`]).
    async fn verify(&self, canonical: &[u8], signature: &str) -> Result<bool, VerifierError>;
}

/// Encode the command and run it through `verifier`. Encoding failures and
/// verifier errors both count as a failed verification.
pub async fn verify_command(verifier: &dyn SignatureVerifier, command: &Command) -> bool {
    let canonical = match command.canonical_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                "Could not encode command {} for signature check: {}",
                command.command_id,
                err
            );
            return false;
        }
    };

    match verifier.verify(&canonical, &command.signature).await {
        Ok(valid) => valid,
        Err(err) => {
            tracing::warn!(
                "Signature verification failed for command {}: {}",
                command.command_id,
                err
            );
            false
        }
    }
}

/// Accepts every signature. Stands in until a credential service is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllSignatures;

#[async_trait]
impl SignatureVerifier for AcceptAllSignatures {
    async fn verify(&self, _canonical: &[u8], _signature: &str) -> Result<bool, VerifierError> {
        Ok(true)
    }
}

/// Returns the same verdict for every command.
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier(pub bool);

#[async_trait]
impl SignatureVerifier for StaticVerifier {
    async fn verify(&self, _canonical: &[u8], _signature: &str) -> Result<bool, VerifierError> {
        Ok(self.0)
    }
}
