//! # sm2-csr - PKCS#10 Certificate Signing Requests for SM2 Keys
//!
//! sm2-csr builds, signs, encodes and verifies certificate signing requests
//! bound to SM2 key pairs, using the RustCrypto `sm2` implementation for the
//! signature scheme. Requests are produced in canonical DER, so a request
//! decoded from disk verifies over exactly the bytes that were signed.
//!
//! ## Supported Formats
//!
//! - **DER**: Distinguished Encoding Rules (binary format)
//! - **PEM**: `CERTIFICATE REQUEST` blocks (base64 text format)
//!
//! ## Key Features
//!
//! - **Pure Rust**: Built on rustcrypto libraries
//! - **Deterministic Encoding**: Fixed field order and minimal-length DER
//! - **Signer IDs**: SM2 distinguishing identifiers with a well-known default
//! - **Pluggable Signing**: Any [`signer::RequestSigner`] can sign, e.g. an HSM-backed key
//!
//! ## Quick Start
//!
//! ### Generating a Request
//!
//! ```rust,no_run
//! use sm2_csr::{
//!     key::Sm2Key,
//!     request::{CertificateRequest, params::SubjectFields},
//! };
//!
//! # fn main() -> Result<(), sm2_csr::error::CsrError> {
//! let key = Sm2Key::generate();
//!
//! let subject = SubjectFields::builder()
//!     .country("CN")
//!     .state("Beijing")
//!     .locality("Beijing")
//!     .organization("MyOrg")
//!     .organizational_unit("IT")
//!     .common_name("www.example.com")
//!     .build();
//!
//! let mut csr = CertificateRequest::new();
//! csr.set_subject(subject)?;
//! let der = csr.generate(&key)?;
//!
//! println!("Request:\n{}", csr.to_pem()?);
//! # let _ = der;
//! # Ok(())
//! # }
//! ```
//!
//! ### Importing and Verifying
//!
//! ```rust,no_run
//! use sm2_csr::request::CertificateRequest;
//!
//! # fn main() -> Result<(), sm2_csr::error::CsrError> {
//! let mut csr = CertificateRequest::new();
//! csr.read_pem("request.pem")?;
//!
//! for entry in csr.subject()? {
//!     println!("{entry}");
//! }
//! assert!(csr.verify()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Signer IDs
//!
//! SM2 folds a signer ID into every signature, and the request does not
//! record which one was used. A request signed under a custom ID verifies
//! only under that same ID; checking it with the default returns `false`.
//!
//! ```rust
//! use sm2_csr::{key::Sm2Key, request::CertificateRequest};
//!
//! # fn main() -> Result<(), sm2_csr::error::CsrError> {
//! let key = Sm2Key::generate();
//! let mut csr = CertificateRequest::new();
//! csr.set_common_name("custom.id.test.com")?;
//! csr.generate_with_id(&key, "custom@signer.id")?;
//!
//! assert!(csr.verify_with_id("custom@signer.id")?);
//! assert!(!csr.verify()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use sm2_csr::{error::CsrError, request::CertificateRequest};
//!
//! match CertificateRequest::from_pem("invalid pem data") {
//!     Ok(_) => println!("Request imported"),
//!     Err(CsrError::InvalidPemFormat(msg)) => println!("Not a PEM request: {}", msg),
//!     Err(CsrError::MalformedEncoding(msg)) => println!("Bad DER: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`request`]: The request object, its subject model and wire structures
//! - [`key`]: SM2 keys and the SM2 signer/verifier
//! - [`signer`]: Signing capabilities the request protocol relies on
//! - [`codec`]: Generic DER values
//! - [`pem_utils`]: PEM framing
//! - [`error`]: Error types

pub mod codec;
pub mod error;
pub mod key;
pub mod pem_utils;
pub mod request;
pub mod signer;
