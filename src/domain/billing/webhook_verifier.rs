//! Gateway callback signature verification.
//!
//! The current provider integration does not sign its callbacks, which is a
//! known weakness of the ingestion path rather than a requirement. The
//! ingestor therefore takes an injectable [`CallbackVerifier`]: the default
//! wiring uses [`NoopVerifier`], and [`HmacCallbackVerifier`] can be switched
//! in by configuring a callback secret, without touching the pipeline.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::BillingError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies the authenticity of a raw callback body.
pub trait CallbackVerifier: Send + Sync {
    /// Checks the payload against the signature header value, if any.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidCallbackSignature` when verification
    /// fails.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), BillingError>;
}

/// Accepts every callback unchecked.
pub struct NoopVerifier;

impl CallbackVerifier for NoopVerifier {
    fn verify(&self, _payload: &[u8], _signature: Option<&str>) -> Result<(), BillingError> {
        Ok(())
    }
}

/// HMAC-SHA256 verifier over the raw request body.
///
/// Expects the signature header to carry the hex-encoded MAC. Comparison is
/// constant-time.
pub struct HmacCallbackVerifier {
    secret: SecretString,
}

impl HmacCallbackVerifier {
    /// Creates a verifier with the given shared secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl CallbackVerifier for HmacCallbackVerifier {
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), BillingError> {
        let signature = signature.ok_or_else(BillingError::invalid_callback_signature)?;

        let provided = hex::decode(signature.trim())
            .map_err(|_| BillingError::invalid_callback_signature())?;

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| BillingError::invalid_callback_signature())?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(provided.as_slice()).into() {
            Ok(())
        } else {
            Err(BillingError::invalid_callback_signature())
        }
    }
}
