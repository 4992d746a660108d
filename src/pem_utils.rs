use pem::{EncodeConfig, LineEnding};

use crate::error::{CsrError, Result};

/// PEM label for PKCS#10 requests.
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";

/// Base64 characters per PEM body line.
pub const PEM_LINE_WIDTH: usize = 64;

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str, line_ending: LineEnding) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        EncodeConfig::new()
            .set_line_ending(line_ending)
            .set_line_wrap(PEM_LINE_WIDTH),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes, requiring `label`.
///
/// # Arguments
/// * `pem_str` - Text holding exactly one PEM block. Surrounding whitespace
///   is allowed, any other text before or after the block is not.
/// * `label` - The label the block must carry.
///
/// # Returns
/// The decoded block contents, or `InvalidPemFormat`.
pub fn pem_to_der(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let text = pem_str.trim();
    if !text.starts_with("-----BEGIN ") || !text.ends_with("-----") {
        return Err(CsrError::InvalidPemFormat(
            "text outside the PEM block".to_string(),
        ));
    }
    let mut blocks = pem::parse_many(text)?;
    if blocks.len() != 1 {
        return Err(CsrError::InvalidPemFormat(format!(
            "expected one PEM block, found {}",
            blocks.len()
        )));
    }
    let pem = blocks.remove(0);
    if pem.tag() != label {
        return Err(CsrError::InvalidPemFormat(format!(
            "expected '{label}' block, found '{}'",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}
