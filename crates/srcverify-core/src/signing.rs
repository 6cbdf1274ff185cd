//! Detached signatures
//!
//! The controller only needs two capabilities: sign with this verifier's key
//! and check somebody else's signature. Ed25519 is the scheme on the wire.
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

pub trait Signer: Send + Sync {
    fn public_key_bytes(&self) -> [u8; 32];

    fn sign(&self, message: &[u8]) -> [u8; 64];
}

pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool;
}

pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn seed(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn public_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        key.verify(message, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = Ed25519Signer::from_seed([9; 32]);
        let message = [0x42u8; 32];
        let sig = signer.sign(&message);
        let verifier = Ed25519Verifier;
        assert!(verifier.verify(&message, &sig, &signer.public_key_bytes()));
        assert!(!verifier.verify(&[0u8; 32], &sig, &signer.public_key_bytes()));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let a = Ed25519Signer::from_seed([1; 32]);
        let b = Ed25519Signer::from_seed([2; 32]);
        let sig = a.sign(b"payload");
        assert!(!Ed25519Verifier.verify(b"payload", &sig, &b.public_key_bytes()));
    }

    #[test]
    fn test_garbage_key_rejected() {
        let signer = Ed25519Signer::from_seed([1; 32]);
        let sig = signer.sign(b"payload");
        // may not even decode as a curve point
        let bad = [0xffu8; 32];
        assert!(!Ed25519Verifier.verify(b"payload", &sig, &bad));
    }

    #[test]
    fn test_seed_roundtrip() {
        let signer = Ed25519Signer::generate();
        let again = Ed25519Signer::from_seed(signer.seed());
        assert_eq!(signer.public_key_bytes(), again.public_key_bytes());
    }
}
