//! Canonical Hasher: reproducible 32-byte digests over evaluation artifacts.
//!
//! Any two parties hashing identical inputs must get bit-identical outputs, so
//! every serialization here is fixed: sorted keys, compact separators, lowercase
//! hex, and scores rounded to 4 decimal places before they are serialized.
//! Job identity is the exception: it keeps the spaced, ASCII-escaped layout the
//! deployed job factory was first populated with.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use ethers::types::Address;
use ethers::utils::keccak256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::decision::Decision;
use crate::models::job::JobDescriptor;
use crate::models::submission::EvaluationResult;

/// Decimal places kept when a similarity score is committed.
pub const SCORE_DECIMALS: i32 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),

    #[error("invalid hex: {0}")]
    Hex(String),
}

/// A fixed 32-byte digest. Rendered as `0x` + 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// All-zero sentinel used when no contact payload is supplied.
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({self})")
    }
}

impl FromStr for Hash32 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 64 {
            return Err(HashParseError::Length(digits.len()));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out).map_err(|e| HashParseError::Hex(e.to_string()))?;
        Ok(Hash32(out))
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Renders an account as `0x` + 40 lowercase hex characters.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

fn sha256(bytes: &[u8]) -> Hash32 {
    Hash32(Sha256::digest(bytes).into())
}

pub fn digest_resume(text: &str) -> Hash32 {
    sha256(text.as_bytes())
}

pub fn digest_model(model_identifier: &str) -> Hash32 {
    sha256(model_identifier.as_bytes())
}

/// Rounds half away from zero to [`SCORE_DECIMALS`] places.
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}

// Field order is the serialization order and must stay lexicographic.
#[derive(Serialize)]
struct ScorePayload<'a> {
    decision: &'a str,
    job_id: &'a str,
    model_hash: String,
    resume_hash: String,
    similarity_score: f64,
}

/// The exact bytes hashed into a `score_hash`.
pub fn canonical_score_payload(
    job_id: &str,
    score: f64,
    decision: Decision,
    model_hash: &Hash32,
    resume_hash: &Hash32,
) -> String {
    debug_assert!(score.is_finite(), "score must be finite, got {score}");
    let payload = ScorePayload {
        decision: decision.as_str(),
        job_id,
        model_hash: model_hash.to_hex(),
        resume_hash: resume_hash.to_hex(),
        similarity_score: round_score(score),
    };
    // Serializing a struct of strings and a finite f64 cannot fail.
    serde_json::to_string(&payload).unwrap_or_default()
}

pub fn digest_score(
    job_id: &str,
    score: f64,
    decision: Decision,
    model_hash: &Hash32,
    resume_hash: &Hash32,
) -> Hash32 {
    sha256(canonical_score_payload(job_id, score, decision, model_hash, resume_hash).as_bytes())
}

/// `keccak256(wallet || job_id || resume_hash)` over the textual forms.
pub fn derive_submission_id(wallet: &Address, job_id: &str, resume_hash: &Hash32) -> Hash32 {
    let material = format!("{}{}{}", address_hex(wallet), job_id, resume_hash);
    Hash32(keccak256(material.as_bytes()))
}

#[derive(Serialize)]
struct JobConfigPayload<'a> {
    description: &'a str,
    requirements: Option<&'a str>,
    title: &'a str,
}

/// Content hash over the fields that identify a job posting.
pub fn job_config_hash(descriptor: &JobDescriptor) -> Hash32 {
    let payload = JobConfigPayload {
        description: &descriptor.description,
        requirements: descriptor.requirements.as_deref(),
        title: &descriptor.title,
    };
    sha256(&spaced_ascii_json(&payload).unwrap_or_default())
}

/// JSON with `", "` / `": "` separators and every character outside
/// printable ASCII escaped as lowercase `\uXXXX` UTF-16 units.
fn spaced_ascii_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

struct SpacedAsciiFormatter;

impl serde_json::ser::Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if (' '..='~').contains(&c) {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

pub fn derive_job_id(config_hash: &Hash32) -> String {
    format!("JOB-{}", &config_hash.to_hex()[..16])
}

/// SHA-256 of the encrypted contact payload, or the zero sentinel.
pub fn digest_contact(payload: Option<&str>) -> Hash32 {
    match payload {
        Some(p) if !p.is_empty() => sha256(p.as_bytes()),
        _ => Hash32::ZERO,
    }
}

/// Structurally valid address derived from the job id: first 20 bytes of SHA-256.
pub fn simulated_contract_address(job_id: &str) -> Address {
    let digest = sha256(job_id.as_bytes());
    Address::from_slice(&digest.0[..20])
}

pub fn simulated_transaction_reference(submission_id: &Hash32, wallet: &Address) -> String {
    let material = format!("{}{}", submission_id, address_hex(wallet));
    sha256(material.as_bytes()).to_string()
}

/// The three commitments derived from one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationDigests {
    pub resume_hash: Hash32,
    pub model_hash: Hash32,
    pub score_hash: Hash32,
}

impl EvaluationDigests {
    pub fn compute(job_id: &str, evaluation: &EvaluationResult) -> Self {
        let model_hash = digest_model(&evaluation.model_identifier);
        let score_hash = digest_score(
            job_id,
            evaluation.similarity_score,
            evaluation.decision,
            &model_hash,
            &evaluation.resume_hash,
        );
        Self {
            resume_hash: evaluation.resume_hash,
            model_hash,
            score_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes() -> (Hash32, Hash32) {
        (digest_model("all-MiniLM-L6-v2"), digest_resume("anonymized resume"))
    }

    #[test]
    fn test_empty_string_hashes_to_sha256_of_nothing() {
        assert_eq!(
            digest_resume("").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest_model(""), digest_resume(""));
    }

    #[test]
    fn test_score_hash_is_deterministic() {
        let (m, r) = hashes();
        let a = digest_score("JOB-1", 0.8567, Decision::AutoPass, &m, &r);
        let b = digest_score("JOB-1", 0.8567, Decision::AutoPass, &m, &r);
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_payload_layout() {
        let m = Hash32([0x11; 32]);
        let r = Hash32([0xab; 32]);
        let payload = canonical_score_payload("JOB-1", 0.85671, Decision::AutoPass, &m, &r);
        let expected = format!(
            "{{\"decision\":\"auto_pass\",\"job_id\":\"JOB-1\",\"model_hash\":\"{}\",\"resume_hash\":\"{}\",\"similarity_score\":0.8567}}",
            "11".repeat(32),
            "ab".repeat(32)
        );
        assert_eq!(payload, expected);
    }

    #[test]
    fn test_whole_scores_keep_a_fraction_digit() {
        let (m, r) = hashes();
        let payload = canonical_score_payload("JOB-1", 1.0, Decision::AutoPass, &m, &r);
        assert!(payload.ends_with("\"similarity_score\":1.0}"), "{payload}");
    }

    #[test]
    fn test_scores_rounding_alike_share_a_hash() {
        let (m, r) = hashes();
        let a = digest_score("JOB-1", 0.123456789, Decision::Review, &m, &r);
        let b = digest_score("JOB-1", 0.123456999, Decision::Review, &m, &r);
        let c = digest_score("JOB-1", 0.123556789, Decision::Review, &m, &r);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_round_score_half_away_from_zero() {
        assert_eq!(round_score(0.123456789), 0.1235);
        assert_eq!(round_score(0.123556789), 0.1236);
        assert_eq!(round_score(0.5), 0.5);
    }

    #[test]
    fn test_job_id_change_only_moves_score_hash() {
        let eval = EvaluationResult {
            similarity_score: 0.62,
            decision: Decision::Review,
            resume_hash: digest_resume("resume"),
            model_identifier: "all-MiniLM-L6-v2".to_string(),
        };
        let a = EvaluationDigests::compute("JOB-1", &eval);
        let b = EvaluationDigests::compute("JOB-2", &eval);
        assert_ne!(a.score_hash, b.score_hash);
        assert_eq!(a.resume_hash, b.resume_hash);
        assert_eq!(a.model_hash, b.model_hash);
    }

    #[test]
    fn test_resume_change_moves_resume_and_score_hash() {
        let mut eval = EvaluationResult {
            similarity_score: 0.62,
            decision: Decision::Review,
            resume_hash: digest_resume("resume one"),
            model_identifier: "all-MiniLM-L6-v2".to_string(),
        };
        let a = EvaluationDigests::compute("JOB-1", &eval);
        eval.resume_hash = digest_resume("resume two");
        let b = EvaluationDigests::compute("JOB-1", &eval);
        assert_ne!(a.resume_hash, b.resume_hash);
        assert_ne!(a.score_hash, b.score_hash);
        assert_eq!(a.model_hash, b.model_hash);
    }

    #[test]
    fn test_decision_and_model_feed_score_hash() {
        let (m, r) = hashes();
        let base = digest_score("JOB-1", 0.5, Decision::Review, &m, &r);
        assert_ne!(base, digest_score("JOB-1", 0.5, Decision::AutoFail, &m, &r));
        let other_model = digest_model("tfidf-fallback");
        assert_ne!(base, digest_score("JOB-1", 0.5, Decision::Review, &other_model, &r));
    }

    #[test]
    fn test_hash32_text_forms() {
        let h = digest_resume("x");
        let text = h.to_string();
        assert_eq!(text.len(), 66);
        assert!(text.starts_with("0x"));
        assert_eq!(text, text.to_lowercase());
        assert_eq!(text.parse::<Hash32>().unwrap(), h);
        assert_eq!(text[2..].to_uppercase().parse::<Hash32>().unwrap(), h);
    }

    #[test]
    fn test_hash32_rejects_bad_input() {
        assert_eq!("0x1234".parse::<Hash32>(), Err(HashParseError::Length(4)));
        assert!(format!("0x{}", "zz".repeat(32)).parse::<Hash32>().is_err());
    }

    #[test]
    fn test_submission_id_ignores_wallet_case() {
        let lower: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        let mixed: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let r = digest_resume("resume");
        assert_eq!(
            derive_submission_id(&lower, "JOB-1", &r),
            derive_submission_id(&mixed, "JOB-1", &r)
        );
        assert_ne!(
            derive_submission_id(&lower, "JOB-1", &r),
            derive_submission_id(&lower, "JOB-2", &r)
        );
    }

    #[test]
    fn test_job_id_shape() {
        let descriptor = JobDescriptor {
            title: "Backend Engineer".to_string(),
            description: "Rust services".to_string(),
            requirements: None,
            location: Some("Remote".to_string()),
            salary: None,
        };
        let id = derive_job_id(&job_config_hash(&descriptor));
        assert!(id.starts_with("JOB-"));
        assert_eq!(id.len(), 20);

        // location is metadata, not identity
        let relocated = JobDescriptor {
            location: None,
            ..descriptor.clone()
        };
        assert_eq!(job_config_hash(&descriptor), job_config_hash(&relocated));
    }

    #[test]
    fn test_job_config_hash_matches_deployed_layout() {
        let descriptor = JobDescriptor {
            title: "Backend Engineer".to_string(),
            description: "Rust services".to_string(),
            requirements: None,
            location: None,
            salary: None,
        };
        let payload = spaced_ascii_json(&JobConfigPayload {
            description: &descriptor.description,
            requirements: None,
            title: &descriptor.title,
        })
        .unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"description": "Rust services", "requirements": null, "title": "Backend Engineer"}"#
        );
        assert_eq!(
            job_config_hash(&descriptor).to_hex(),
            "d70fe79ad8b22eea139bf5bd21ff3745bb3f2ac3bddec999a9724730b875a4d1"
        );
        assert_eq!(derive_job_id(&job_config_hash(&descriptor)), "JOB-d70fe79ad8b22eea");
    }

    #[test]
    fn test_job_config_escapes_non_ascii_and_controls() {
        let descriptor = JobDescriptor {
            title: "Caf\u{e9} Lead \u{1f980}".to_string(),
            description: "Line\nbreak \"q\"".to_string(),
            requirements: Some("Rust".to_string()),
            location: None,
            salary: None,
        };
        let payload = spaced_ascii_json(&JobConfigPayload {
            description: &descriptor.description,
            requirements: descriptor.requirements.as_deref(),
            title: &descriptor.title,
        })
        .unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"description": "Line\nbreak \"q\"", "requirements": "Rust", "title": "Caf\u00e9 Lead \ud83e\udd80"}"#
        );
        assert_eq!(
            job_config_hash(&descriptor).to_hex(),
            "8cbdba4c7baa6aef03dbe22b0f69fb790550d0b2de1003704c669cd1abc3e80a"
        );
    }

    #[test]
    fn test_contact_sentinel() {
        assert!(digest_contact(None).is_zero());
        assert!(digest_contact(Some("")).is_zero());
        assert!(!digest_contact(Some("ciphertext")).is_zero());
    }

    #[test]
    fn test_simulated_identifiers_are_stable() {
        let addr = simulated_contract_address("JOB-0123456789abcdef");
        assert_eq!(addr, simulated_contract_address("JOB-0123456789abcdef"));
        let wallet = Address::repeat_byte(0x42);
        let sid = Hash32([7; 32]);
        let tx = simulated_transaction_reference(&sid, &wallet);
        assert_eq!(tx.len(), 66);
        assert_eq!(tx, simulated_transaction_reference(&sid, &wallet));
    }
}
