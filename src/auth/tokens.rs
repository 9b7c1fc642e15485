use rand::{distributions::Uniform, rngs::OsRng, Rng, RngCore};

/// Length of the emailed verification code.
pub const VERIFICATION_CODE_LEN: usize = 6;

/// Bytes of entropy behind a reset token; hex encoding doubles the length.
const RESET_TOKEN_BYTES: usize = 20;

/// Fixed-length numeric code for email verification.
pub fn verification_code() -> String {
    rand::thread_rng()
        .sample_iter(&Uniform::new(0u8, 10))
        .take(VERIFICATION_CODE_LEN)
        .map(|d| char::from(b'0' + d))
        .collect()
}

/// High-entropy bearer token for the password reset flow.
pub fn reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
