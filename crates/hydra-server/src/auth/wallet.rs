//! Wallet address and signature primitives.
//!
//! Wallet addresses are base58-encoded ed25519 public keys; signatures are
//! base58-encoded and verified over the exact message bytes.

use ed25519_dalek::{Signature, VerifyingKey};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Malformed wallet address")]
    MalformedAddress,

    #[error("Malformed signature")]
    MalformedSignature,

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Parse a base58 wallet address into its verifying key.
pub fn parse_wallet_address(address: &str) -> Result<VerifyingKey, WalletError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| WalletError::MalformedAddress)?;

    let key_bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| WalletError::MalformedAddress)?;

    VerifyingKey::from_bytes(&key_bytes).map_err(|_| WalletError::MalformedAddress)
}

/// Verify a base58 signature over the exact message bytes.
pub fn verify_signature(
    address: &str,
    message: &[u8],
    signature_b58: &str,
) -> Result<(), WalletError> {
    let key = parse_wallet_address(address)?;

    let sig_bytes = bs58::decode(signature_b58)
        .into_vec()
        .map_err(|_| WalletError::MalformedSignature)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| WalletError::MalformedSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify_strict(message, &signature)
        .map_err(|_| WalletError::VerificationFailed)
}
