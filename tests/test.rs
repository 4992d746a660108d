mod util;

use sm2_csr::error::CsrError;
use sm2_csr::key::Sm2Key;
use sm2_csr::request::params::{RequestConfig, SubjectFields};
use sm2_csr::request::{CertificateRequest, RequestState, generate_request};
use sm2_csr::signer::DEFAULT_SIGNER_ID;

pub type Result<T> = std::result::Result<T, CsrError>;

/// Generates a request for a full subject and checks that it verifies under
/// the default signer ID only.
#[test]
fn generate_and_verify_full_subject() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_subject(util::scenario_subject())?;
    assert_eq!(csr.state(), RequestState::SubjectSet);

    let der = csr.generate(&key)?;
    assert!(!der.is_empty());
    assert_eq!(csr.state(), RequestState::Generated);
    assert_eq!(csr.request_der(), Some(der.as_slice()));

    let reloaded = CertificateRequest::from_der(&der)?;
    assert_eq!(reloaded.subject()?, util::scenario_display_list());
    assert!(reloaded.verify()?);
    assert!(!reloaded.verify_with_id("other-id")?);

    assert_eq!(csr.subject()?, util::scenario_display_list());
    assert!(csr.verify()?);
    Ok(())
}

#[test]
fn minimal_request_has_only_common_name() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_common_name("minimal.test.com")?;
    csr.generate(&key)?;

    assert!(csr.verify()?);
    assert_eq!(csr.subject()?, vec!["CN:minimal.test.com".to_string()]);

    let subject = csr.subject_name()?;
    assert_eq!(
        subject.to_fields(),
        SubjectFields::builder().common_name("minimal.test.com").build()
    );
    assert_eq!(subject.to_fields().country, None);
    Ok(())
}

#[test]
fn generate_without_common_name_fails() {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    assert!(matches!(
        csr.generate(&key),
        Err(CsrError::MissingRequiredField(_))
    ));
    assert_eq!(csr.state(), RequestState::Empty);
    assert!(csr.request_der().is_none());
}

#[test]
fn subject_setters_require_common_name() {
    let mut csr = CertificateRequest::new();

    let no_cn = SubjectFields::builder().country("CN").organization("MyOrg").build();
    assert!(matches!(
        csr.set_subject(no_cn),
        Err(CsrError::MissingRequiredField(_))
    ));

    let empty_cn = SubjectFields::builder().common_name("").build();
    assert!(matches!(
        csr.set_subject(empty_cn),
        Err(CsrError::MissingRequiredField(_))
    ));

    assert!(matches!(
        csr.set_common_name(""),
        Err(CsrError::MissingRequiredField(_))
    ));
    assert_eq!(csr.state(), RequestState::Empty);
}

#[test]
fn present_but_empty_optional_field_is_rejected() {
    let mut csr = CertificateRequest::new();
    let fields = SubjectFields::builder()
        .organization("")
        .common_name("www.example.com")
        .build();
    assert!(matches!(
        csr.set_subject(fields),
        Err(CsrError::InvalidArgument(_))
    ));
}

#[test]
fn public_only_key_cannot_sign() -> Result<()> {
    let key = Sm2Key::generate();
    let public_only = Sm2Key::from_public_key_info(&key.public_key_info()?)?;
    assert!(!public_only.has_private_key());

    let mut csr = CertificateRequest::new();
    csr.set_common_name("www.example.com")?;
    assert!(matches!(
        csr.generate(&public_only),
        Err(CsrError::InvalidArgument(_))
    ));
    assert_eq!(csr.state(), RequestState::SubjectSet);

    // the object is still usable with a proper key
    csr.generate(&key)?;
    assert!(csr.verify()?);
    Ok(())
}

#[test]
fn signed_request_is_read_only() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_common_name("www.example.com")?;
    let der = csr.generate(&key)?;

    assert!(matches!(csr.generate(&key), Err(CsrError::InvalidState(_))));
    assert!(matches!(
        csr.set_common_name("other.example.com"),
        Err(CsrError::InvalidState(_))
    ));
    assert!(matches!(
        csr.set_subject(util::scenario_subject()),
        Err(CsrError::InvalidState(_))
    ));
    assert_eq!(csr.request_der(), Some(der.as_slice()));

    let mut loaded = CertificateRequest::from_der(&der)?;
    assert_eq!(loaded.state(), RequestState::Loaded);
    assert!(matches!(loaded.generate(&key), Err(CsrError::InvalidState(_))));
    Ok(())
}

#[test]
fn reads_before_generate_fail_not_loaded() -> Result<()> {
    let mut csr = CertificateRequest::new();
    csr.set_common_name("www.example.com")?;

    assert!(csr.request_der().is_none());
    assert!(matches!(csr.subject(), Err(CsrError::NotLoaded(_))));
    assert!(matches!(csr.subject_public_key(), Err(CsrError::NotLoaded(_))));
    assert!(matches!(csr.verify(), Err(CsrError::NotLoaded(_))));
    assert!(matches!(csr.to_der(), Err(CsrError::NotLoaded(_))));
    assert!(matches!(csr.to_pem(), Err(CsrError::NotLoaded(_))));
    assert!(matches!(
        csr.write_pem(util::temp_path("never-written.pem")),
        Err(CsrError::NotLoaded(_))
    ));
    Ok(())
}

#[test]
fn der_round_trip_preserves_subject_and_key() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_subject(util::scenario_subject())?;
    let der = csr.generate(&key)?;

    let loaded = CertificateRequest::from_der(&csr.to_der()?)?;
    assert_eq!(loaded.request_der(), Some(der.as_slice()));
    assert_eq!(loaded.subject_name()?, csr.subject_name()?);
    assert_eq!(loaded.subject_public_key()?, key.public_key_info()?);
    assert_eq!(loaded.subject_name()?.to_fields(), util::scenario_subject());
    assert!(loaded.verify()?);
    Ok(())
}

#[test]
fn extracted_public_key_is_an_independent_copy() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_common_name("www.example.com")?;
    csr.generate(&key)?;

    let extracted = csr.subject_public_key()?;
    let public_only = Sm2Key::from_public_key_info(&extracted)?;
    assert_eq!(public_only.public_key_info()?, key.public_key_info()?);
    assert_eq!(extracted.point().len(), 65);
    assert_eq!(extracted.point()[0], 0x04);
    assert_eq!(extracted, key.public_key_info()?);
    Ok(())
}

#[test]
fn pem_file_export_import() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_subject(
        SubjectFields::builder()
            .country("CN")
            .state("Shanghai")
            .locality("Shanghai")
            .organization("Another Org")
            .organizational_unit("Dev")
            .common_name("api.example.com")
            .build(),
    )?;
    csr.generate(&key)?;

    let path = util::temp_path("request.pem");
    csr.write_pem(&path)?;
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));
    assert!(text.trim_end().ends_with("-----END CERTIFICATE REQUEST-----"));

    let mut imported = CertificateRequest::new();
    imported.read_pem(&path)?;
    std::fs::remove_file(&path).unwrap();

    assert_eq!(imported.state(), RequestState::Loaded);
    assert!(imported.verify()?);
    assert_eq!(imported.subject()?, csr.subject()?);
    assert_eq!(imported.request_der(), csr.request_der());
    Ok(())
}

#[test]
fn der_file_export_import() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_common_name("der.example.com")?;
    csr.generate(&key)?;

    let path = util::temp_path("request.der");
    csr.write_der(&path)?;
    assert_eq!(std::fs::read(&path).unwrap(), csr.to_der()?);

    let mut imported = CertificateRequest::new();
    imported.read_der(&path)?;
    std::fs::remove_file(&path).unwrap();

    assert!(imported.verify()?);
    assert_eq!(imported.subject()?, vec!["CN:der.example.com".to_string()]);
    Ok(())
}

#[test]
fn file_errors() -> Result<()> {
    let mut csr = CertificateRequest::new();
    assert!(matches!(csr.read_pem(""), Err(CsrError::InvalidArgument(_))));
    assert!(matches!(
        csr.read_der(util::temp_path("does-not-exist.der")),
        Err(CsrError::Io { .. })
    ));

    let key = Sm2Key::generate();
    csr.set_common_name("www.example.com")?;
    csr.generate(&key)?;
    assert!(matches!(csr.write_pem(""), Err(CsrError::InvalidArgument(_))));
    assert!(matches!(
        csr.write_der(util::temp_path("missing-dir").join("request.der")),
        Err(CsrError::Io { .. })
    ));
    Ok(())
}

#[test]
fn custom_signer_id() -> Result<()> {
    let key = Sm2Key::generate();
    let custom = "custom@signer.id";

    let mut csr = CertificateRequest::new();
    csr.set_subject(
        SubjectFields::builder()
            .country("CN")
            .state("Hangzhou")
            .locality("Hangzhou")
            .organization("Custom ID Org")
            .organizational_unit("Security")
            .common_name("custom.id.test.com")
            .build(),
    )?;
    csr.generate_with_id(&key, custom)?;

    assert!(csr.verify_with_id(custom)?);
    assert!(!csr.verify()?);
    assert!(!csr.verify_with_id(DEFAULT_SIGNER_ID)?);
    Ok(())
}

#[test]
fn configured_signer_id_is_the_default_for_both_directions() -> Result<()> {
    let key = Sm2Key::generate();
    let config = RequestConfig::builder().signer_id("config@signer.id").build();
    let mut csr = CertificateRequest::with_config(config);
    assert_eq!(csr.config().signer_id, "config@signer.id");
    assert_eq!(
        CertificateRequest::new().config().signer_id,
        DEFAULT_SIGNER_ID
    );
    csr.set_common_name("www.example.com")?;
    let der = csr.generate(&key)?;

    assert!(csr.verify()?);
    assert!(csr.verify_with_id("config@signer.id")?);
    assert!(!CertificateRequest::from_der(&der)?.verify()?);
    Ok(())
}

#[test]
fn signer_id_must_be_usable() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_common_name("www.example.com")?;

    assert!(matches!(
        csr.generate_with_id(&key, ""),
        Err(CsrError::InvalidArgument(_))
    ));
    let oversized = "x".repeat(8192);
    assert!(matches!(
        csr.generate_with_id(&key, &oversized),
        Err(CsrError::InvalidArgument(_))
    ));
    assert_eq!(csr.state(), RequestState::SubjectSet);

    csr.generate(&key)?;
    assert!(matches!(
        csr.verify_with_id(""),
        Err(CsrError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn static_generate_request() -> Result<()> {
    let key = Sm2Key::generate();
    let fields = SubjectFields::builder()
        .country("CN")
        .state("Shenzhen")
        .locality("Shenzhen")
        .organization("Static Test Org")
        .organizational_unit("QA")
        .common_name("static.test.com")
        .build();

    let der = generate_request(fields.clone(), &key, None)?;
    let csr = CertificateRequest::from_der(&der)?;
    assert!(csr.verify()?);
    assert_eq!(csr.subject_name()?.to_fields(), fields);

    let der = generate_request(fields, &key, Some("static@signer.id"))?;
    let csr = CertificateRequest::from_der(&der)?;
    assert!(csr.verify_with_id("static@signer.id")?);
    assert!(!csr.verify()?);

    let no_cn = SubjectFields::builder().country("CN").build();
    assert!(matches!(
        generate_request(no_cn, &key, None),
        Err(CsrError::MissingRequiredField(_))
    ));
    Ok(())
}

#[test]
fn failed_import_keeps_previous_request() -> Result<()> {
    let key = Sm2Key::generate();
    let der = generate_request(util::scenario_subject(), &key, None)?;
    let mut csr = CertificateRequest::from_der(&der)?;

    assert!(matches!(
        csr.load_der(&der[..der.len() - 1]),
        Err(CsrError::MalformedEncoding(_))
    ));
    assert!(matches!(
        csr.load_pem("not a pem"),
        Err(CsrError::InvalidPemFormat(_))
    ));
    assert_eq!(csr.request_der(), Some(der.as_slice()));
    assert!(csr.verify()?);
    Ok(())
}

#[test]
fn import_replaces_generated_request() -> Result<()> {
    let first_key = Sm2Key::generate();
    let second_key = Sm2Key::generate();

    let mut csr = CertificateRequest::new();
    csr.set_common_name("first.example.com")?;
    csr.generate(&first_key)?;

    let other = generate_request(util::scenario_subject(), &second_key, None)?;
    csr.load_der(&other)?;

    assert_eq!(csr.state(), RequestState::Loaded);
    assert_eq!(csr.subject()?, util::scenario_display_list());
    assert_eq!(csr.subject_public_key()?, second_key.public_key_info()?);
    assert!(csr.verify()?);
    Ok(())
}

#[test]
fn pem_with_wrong_label_is_rejected() -> Result<()> {
    let key = Sm2Key::generate();
    let der = generate_request(util::scenario_subject(), &key, None)?;
    let text = sm2_csr::pem_utils::der_to_pem(&der, "CERTIFICATE", pem::LineEnding::LF);
    assert!(matches!(
        CertificateRequest::from_pem(&text),
        Err(CsrError::InvalidPemFormat(_))
    ));
    Ok(())
}

#[test]
fn pem_with_extra_text_or_blocks_is_rejected() -> Result<()> {
    let key = Sm2Key::generate();
    let mut csr = CertificateRequest::new();
    csr.set_subject(util::scenario_subject())?;
    csr.generate(&key)?;
    let block = csr.to_pem()?;
    let other = generate_request(util::scenario_subject(), &key, None)?;
    let second = sm2_csr::pem_utils::der_to_pem(
        &other,
        sm2_csr::pem_utils::CERTIFICATE_REQUEST_LABEL,
        pem::LineEnding::LF,
    );

    for text in [
        format!("garbage\n{block}{second}"),
        format!("garbage\n{block}"),
        format!("{block}{second}"),
    ] {
        assert!(matches!(
            CertificateRequest::from_pem(&text),
            Err(CsrError::InvalidPemFormat(_))
        ));
    }
    assert!(CertificateRequest::from_pem(&format!("\n{block}\n"))?.verify()?);
    Ok(())
}

#[test]
fn crlf_pem_output_reimports() -> Result<()> {
    let key = Sm2Key::generate();
    let config = RequestConfig::builder()
        .line_ending(pem::LineEnding::CRLF)
        .build();
    let mut csr = CertificateRequest::with_config(config);
    assert!(matches!(csr.config().line_ending, pem::LineEnding::CRLF));
    csr.set_subject(util::scenario_subject())?;
    csr.generate(&key)?;

    let text = csr.to_pem()?;
    assert!(text.contains("\r\n"));
    let imported = CertificateRequest::from_pem(&text)?;
    assert!(imported.verify()?);
    Ok(())
}

#[test]
fn key_import_round_trip() -> Result<()> {
    let key = Sm2Key::generate();
    let secret = key.secret_bytes().unwrap();
    let imported = Sm2Key::from_secret_bytes(&secret)?;
    assert_eq!(imported.public_key_info()?, key.public_key_info()?);

    let der = generate_request(util::scenario_subject(), &imported, None)?;
    let csr = CertificateRequest::from_der(&der)?;
    assert_eq!(csr.subject_public_key()?, key.public_key_info()?);
    assert!(csr.verify()?);

    assert!(matches!(
        Sm2Key::from_secret_bytes(&[0u8; 32]),
        Err(CsrError::InvalidArgument(_))
    ));
    Ok(())
}
