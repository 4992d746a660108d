//! Signing capabilities the request protocol depends on.
//!
//! The request code never touches curve arithmetic. It asks a
//! [`RequestSigner`] for the public half of its key and for a signature over
//! the encoded request info, and asks a [`RequestVerifier`] whether a
//! signature holds. [`crate::key::Sm2Key`] and [`crate::key::Sm2Verifier`]
//! are the SM2 implementations; tests substitute deterministic fakes.

use crate::error::{CsrError, Result};
use crate::request::info::PublicKeyInfo;

/// Signer ID used when the caller does not name one.
///
/// The ID is folded into every SM2 signature but is not stored in the
/// request, so a request signed under another ID will not verify against
/// this one.
pub const DEFAULT_SIGNER_ID: &str = "1234567812345678";

/// SM2 hashes the ID length as a 16-bit bit count.
pub const MAX_SIGNER_ID_LEN: usize = (u16::MAX as usize) / 8;

/// A key able to sign request info on behalf of its holder.
pub trait RequestSigner {
    /// Returns the public half of the signing key.
    fn public_key_info(&self) -> Result<PublicKeyInfo>;

    /// Whether the private half is available.
    fn has_private_key(&self) -> bool;

    /// Signs `message` under `signer_id`, returning the encoded signature.
    fn sign(&self, signer_id: &str, message: &[u8]) -> Result<Vec<u8>>;
}

/// Checks signatures produced by a [`RequestSigner`].
pub trait RequestVerifier {
    /// Returns `Ok(false)` for a signature that does not match; errors are
    /// reserved for inputs that cannot be interpreted at all.
    fn verify(
        &self,
        public_key: &PublicKeyInfo,
        signer_id: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool>;
}

/// Rejects signer IDs SM2 cannot fold into a signature.
pub fn validate_signer_id(signer_id: &str) -> Result<()> {
    if signer_id.is_empty() {
        return Err(CsrError::InvalidArgument(
            "Signer ID must not be empty".to_string(),
        ));
    }
    if signer_id.len() > MAX_SIGNER_ID_LEN {
        return Err(CsrError::InvalidArgument(format!(
            "Signer ID is {} bytes, the limit is {MAX_SIGNER_ID_LEN}",
            signer_id.len()
        )));
    }
    Ok(())
}
