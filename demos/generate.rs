use sm2_csr::error::CsrError;
use sm2_csr::key::Sm2Key;
use sm2_csr::request::CertificateRequest;
use sm2_csr::request::params::SubjectFields;

fn main() -> Result<(), CsrError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A fresh key pair; any RequestSigner, e.g. an HSM-backed key, works the same way
    let key = Sm2Key::generate();

    let subject = SubjectFields::builder()
        .country("CN")
        .state("Beijing")
        .locality("Beijing")
        .organization("MyOrg")
        .organizational_unit("IT")
        .common_name("www.example.com")
        .build();

    let mut csr = CertificateRequest::new();
    csr.set_subject(subject)?;
    csr.generate(&key)?;

    println!("Certificate Request PEM:\n{}", csr.to_pem()?);

    // Round trip through PEM as a CA would receive it
    let received = CertificateRequest::from_pem(&csr.to_pem()?)?;
    for entry in received.subject()? {
        println!("  {entry}");
    }
    println!("Signature valid: {}", received.verify()?);

    Ok(())
}
