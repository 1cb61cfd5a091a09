//! Sign-in challenge construction.
//!
//! The backend re-builds this exact text to verify the signature, so the
//! template is byte-for-byte fixed (including the trailing space on the
//! first line).

/// Normalizes a wallet address for signing and submission.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Builds the challenge message for a nonce and wallet address.
///
/// The address is lowercased before it is embedded.
pub fn challenge_message(nonce: &str, address: &str) -> String {
    format!(
        "Sign this message to authenticate your wallet address \nNonce: {nonce}\nAddress: {}",
        normalize_address(address)
    )
}

/// Shortens an address for display (`0x1234...abcd`).
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
