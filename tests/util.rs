#![allow(dead_code)]

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use sm2_csr::error::Result;
use sm2_csr::request::info::PublicKeyInfo;
use sm2_csr::request::params::SubjectFields;
use sm2_csr::signer::{RequestSigner, RequestVerifier};

pub fn scenario_subject() -> SubjectFields {
    SubjectFields::builder()
        .country("CN")
        .state("Beijing")
        .locality("Beijing")
        .organization("MyOrg")
        .organizational_unit("IT")
        .common_name("www.example.com")
        .build()
}

pub fn scenario_display_list() -> Vec<String> {
    [
        "C:CN",
        "ST:Beijing",
        "L:Beijing",
        "O:MyOrg",
        "OU:IT",
        "CN:www.example.com",
    ]
    .map(String::from)
    .to_vec()
}

/// A file path under the system temp dir unique to this test process.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sm2-csr-{}-{name}", std::process::id()))
}

/// Signs with SHA-256 over the ID, the point and the message, so signatures
/// are reproducible and depend on all three.
pub struct FakeSigner {
    point: Vec<u8>,
}

impl FakeSigner {
    pub fn new(seed: u8) -> Self {
        let mut point = vec![0x04];
        point.extend((0..64u8).map(|i| seed.wrapping_add(i)));
        Self { point }
    }
}

impl RequestSigner for FakeSigner {
    fn public_key_info(&self) -> Result<PublicKeyInfo> {
        PublicKeyInfo::from_uncompressed_point(&self.point)
    }

    fn has_private_key(&self) -> bool {
        true
    }

    fn sign(&self, signer_id: &str, message: &[u8]) -> Result<Vec<u8>> {
        Ok(fake_signature(&self.point, signer_id, message))
    }
}

pub struct FakeVerifier;

impl RequestVerifier for FakeVerifier {
    fn verify(
        &self,
        public_key: &PublicKeyInfo,
        signer_id: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        Ok(fake_signature(public_key.point(), signer_id, message) == signature)
    }
}

pub fn fake_signature(point: &[u8], signer_id: &str, message: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update((signer_id.len() as u32).to_be_bytes());
    hasher.update(signer_id.as_bytes());
    hasher.update(point);
    hasher.update(message);
    hasher.finalize().to_vec()
}
