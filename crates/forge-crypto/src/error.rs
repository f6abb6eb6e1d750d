use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid signature bytes")]
    InvalidSignatureBytes,

    #[error("signature verification failed")]
    VerificationFailed,
}
