pub mod info;
pub mod params;

use std::fs;
use std::path::Path;

use info::{CertificationRequest, CertificationRequestInfo, PublicKeyInfo, SignatureAlgorithm};
use params::{RequestConfig, SubjectFields, SubjectName};

use crate::error::{CsrError, Result};
use crate::key::Sm2Verifier;
use crate::pem_utils::{CERTIFICATE_REQUEST_LABEL, der_to_pem, pem_to_der};
use crate::signer::{RequestSigner, RequestVerifier, validate_signer_id};

/// Lifecycle stage of a [`CertificateRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing set yet.
    Empty,
    /// Subject fields set, not yet signed.
    SubjectSet,
    /// Signed by [`CertificateRequest::generate`].
    Generated,
    /// Imported from DER or PEM.
    Loaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Generated,
    Loaded,
}

/// The encoded request owned by a [`CertificateRequest`] and its decoded form.
#[derive(Clone, Debug)]
struct HeldRequest {
    der: Vec<u8>,
    request: CertificationRequest,
    origin: Origin,
}

/// A PKCS#10 certificate signing request bound to an SM2 key.
///
/// Subject fields are set first, then [`generate`](Self::generate) signs
/// them and the request becomes read-only. A request can also be imported
/// with [`load_der`](Self::load_der) or [`load_pem`](Self::load_pem), which
/// replace whatever the object held before.
///
/// ```rust,no_run
/// use sm2_csr::key::Sm2Key;
/// use sm2_csr::request::CertificateRequest;
///
/// # fn main() -> Result<(), sm2_csr::error::CsrError> {
/// let key = Sm2Key::generate();
/// let mut csr = CertificateRequest::new();
/// csr.set_common_name("www.example.com")?;
/// csr.generate(&key)?;
/// assert!(csr.verify()?);
/// csr.write_pem("request.pem")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct CertificateRequest {
    config: RequestConfig,
    subject: SubjectFields,
    held: Option<HeldRequest>,
}

impl CertificateRequest {
    /// Creates an empty request with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty request.
    ///
    /// # Arguments
    /// * `config` - Signer ID and PEM line ending used by this request.
    pub fn with_config(config: RequestConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Parses a DER request into a new object.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut request = Self::new();
        request.load_der(der)?;
        Ok(request)
    }

    /// Parses a PEM request into a new object.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let mut request = Self::new();
        request.load_pem(pem)?;
        Ok(request)
    }

    /// The configuration this request was created with.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Returns where the request is in its lifecycle.
    pub fn state(&self) -> RequestState {
        match &self.held {
            Some(held) if held.origin == Origin::Generated => RequestState::Generated,
            Some(_) => RequestState::Loaded,
            None if self.subject != SubjectFields::default() => RequestState::SubjectSet,
            None => RequestState::Empty,
        }
    }

    /// Replaces all subject fields. The common name is required.
    pub fn set_subject(&mut self, fields: SubjectFields) -> Result<()> {
        self.ensure_unsigned("set the subject of")?;
        SubjectName::build(&fields)?;
        self.subject = fields;
        Ok(())
    }

    /// Sets only the common name, leaving other subject fields as they are.
    pub fn set_common_name(&mut self, common_name: &str) -> Result<()> {
        self.ensure_unsigned("set the subject of")?;
        if common_name.is_empty() {
            return Err(CsrError::MissingRequiredField(
                "Common name (CN) is required".to_string(),
            ));
        }
        self.subject.common_name = Some(common_name.to_string());
        Ok(())
    }

    /// Signs the request with the configured signer ID and returns its DER
    /// encoding.
    pub fn generate<S: RequestSigner + ?Sized>(&mut self, signer: &S) -> Result<Vec<u8>> {
        let signer_id = self.config.signer_id.clone();
        self.generate_with_id(signer, &signer_id)
    }

    /// Signs the request under `signer_id`.
    ///
    /// The ID is not recorded in the request; verifying needs the same ID.
    pub fn generate_with_id<S: RequestSigner + ?Sized>(
        &mut self,
        signer: &S,
        signer_id: &str,
    ) -> Result<Vec<u8>> {
        self.ensure_unsigned("regenerate")?;
        let subject = SubjectName::build(&self.subject)?;
        if !signer.has_private_key() {
            return Err(CsrError::InvalidArgument(
                "SM2 key is required".to_string(),
            ));
        }
        validate_signer_id(signer_id)?;

        let info = CertificationRequestInfo::new(subject, signer.public_key_info()?);
        let message = info.to_der()?;
        let signature = signer.sign(signer_id, &message)?;
        let request =
            CertificationRequest::assemble(info, SignatureAlgorithm::Sm2WithSm3.into(), signature);
        let der = request.to_der()?;

        tracing::debug!(
            info_len = message.len(),
            request_len = der.len(),
            signer_id_len = signer_id.len(),
            "generated certificate request"
        );
        self.held = Some(HeldRequest {
            der: der.clone(),
            request,
            origin: Origin::Generated,
        });
        Ok(der)
    }

    /// The DER encoding, if a request has been generated or loaded.
    pub fn request_der(&self) -> Option<&[u8]> {
        self.held.as_ref().map(|held| held.der.as_slice())
    }

    /// Replaces the held request with the one encoded in `der`.
    ///
    /// Nothing changes if `der` does not decode.
    pub fn load_der(&mut self, der: &[u8]) -> Result<()> {
        let request = CertificationRequest::decode(der)?.request;
        tracing::debug!(request_len = der.len(), "loaded certificate request");
        self.subject = SubjectFields::default();
        self.held = Some(HeldRequest {
            der: der.to_vec(),
            request,
            origin: Origin::Loaded,
        });
        Ok(())
    }

    /// Replaces the held request with the one in a `CERTIFICATE REQUEST` PEM block.
    pub fn load_pem(&mut self, pem: &str) -> Result<()> {
        let der = pem_to_der(pem, CERTIFICATE_REQUEST_LABEL)?;
        self.load_der(&der)
    }

    /// Returns the held request as DER.
    ///
    /// # Returns
    /// The exact bytes generated or loaded, or `NotLoaded` if there are none.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.held_for_export()?.der.clone())
    }

    /// Returns the held request as a `CERTIFICATE REQUEST` PEM block.
    ///
    /// # Returns
    /// The PEM text wrapped at 64 columns with the configured line ending,
    /// or `NotLoaded` if there is no request.
    pub fn to_pem(&self) -> Result<String> {
        let held = self.held_for_export()?;
        Ok(der_to_pem(
            &held.der,
            CERTIFICATE_REQUEST_LABEL,
            self.config.line_ending,
        ))
    }

    /// Writes the held request to a file as DER.
    ///
    /// # Arguments
    /// * `path` - Destination file, created or truncated.
    pub fn write_der(&self, path: impl AsRef<Path>) -> Result<()> {
        let der = self.to_der()?;
        write_file(path.as_ref(), der)
    }

    /// Writes the held request to a file as PEM.
    ///
    /// # Arguments
    /// * `path` - Destination file, created or truncated.
    pub fn write_pem(&self, path: impl AsRef<Path>) -> Result<()> {
        let pem = self.to_pem()?;
        write_file(path.as_ref(), pem)
    }

    /// Loads a DER request from a file, replacing the held one.
    ///
    /// # Arguments
    /// * `path` - File holding a DER `CertificationRequest`.
    pub fn read_der(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = checked_path(path.as_ref())?;
        let der = fs::read(path).map_err(|source| io_error(path, source))?;
        self.load_der(&der)
    }

    /// Loads a PEM request from a file, replacing the held one.
    ///
    /// # Arguments
    /// * `path` - File holding one `CERTIFICATE REQUEST` PEM block.
    pub fn read_pem(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = checked_path(path.as_ref())?;
        let pem = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        self.load_pem(&pem)
    }

    /// Subject as `"Type:Value"` strings, e.g. `["C:CN", "CN:www.example.com"]`.
    pub fn subject(&self) -> Result<Vec<String>> {
        Ok(self.subject_name()?.to_display_list())
    }

    /// A copy of the subject carried by the request.
    pub fn subject_name(&self) -> Result<SubjectName> {
        Ok(self.held()?.request.info.subject.clone())
    }

    /// A copy of the public key carried by the request.
    pub fn subject_public_key(&self) -> Result<PublicKeyInfo> {
        Ok(self.held()?.request.info.public_key.clone())
    }

    /// Verifies the signature with the configured signer ID.
    pub fn verify(&self) -> Result<bool> {
        self.verify_with_id(&self.config.signer_id)
    }

    /// Verifies the signature under `signer_id`. A wrong ID gives `Ok(false)`.
    pub fn verify_with_id(&self, signer_id: &str) -> Result<bool> {
        self.verify_with(&Sm2Verifier, signer_id)
    }

    /// Verifies the signature with a caller-supplied verifier.
    ///
    /// The message is the info element exactly as it appears in the held
    /// encoding.
    pub fn verify_with(&self, verifier: &dyn RequestVerifier, signer_id: &str) -> Result<bool> {
        let held = self.held()?;
        validate_signer_id(signer_id)?;
        let decoded = CertificationRequest::decode(&held.der)?;
        let verified = verifier.verify(
            &decoded.request.info.public_key,
            signer_id,
            decoded.info_der,
            &decoded.request.signature,
        )?;
        tracing::debug!(verified, signer_id_len = signer_id.len(), "verified certificate request");
        Ok(verified)
    }

    fn held(&self) -> Result<&HeldRequest> {
        self.held
            .as_ref()
            .ok_or_else(|| CsrError::NotLoaded("No certificate request loaded".to_string()))
    }

    fn held_for_export(&self) -> Result<&HeldRequest> {
        self.held
            .as_ref()
            .ok_or_else(|| CsrError::NotLoaded("No certificate request to export".to_string()))
    }

    fn ensure_unsigned(&self, action: &str) -> Result<()> {
        match self.held {
            Some(_) => Err(CsrError::InvalidState(format!(
                "Cannot {action} a signed or loaded certificate request"
            ))),
            None => Ok(()),
        }
    }
}

/// Builds and signs a request in one call, returning its DER encoding.
///
/// `signer_id` defaults to [`crate::signer::DEFAULT_SIGNER_ID`].
pub fn generate_request<S: RequestSigner + ?Sized>(
    fields: SubjectFields,
    signer: &S,
    signer_id: Option<&str>,
) -> Result<Vec<u8>> {
    let mut request = CertificateRequest::new();
    request.set_subject(fields)?;
    match signer_id {
        Some(signer_id) => request.generate_with_id(signer, signer_id),
        None => request.generate(signer),
    }
}

fn checked_path(path: &Path) -> Result<&Path> {
    if path.as_os_str().is_empty() {
        return Err(CsrError::InvalidArgument(
            "File path is required".to_string(),
        ));
    }
    Ok(path)
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = checked_path(path)?;
    fs::write(path, contents).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> CsrError {
    CsrError::Io {
        path: path.to_path_buf(),
        source,
    }
}
