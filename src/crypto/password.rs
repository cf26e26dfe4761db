use crate::error::{AppError, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// The memory cost for Argon2 in KiB (19 MiB).
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Upper bound on plaintext length accepted by `hash_password`.
const MAX_PASSWORD_BYTES: usize = 1024;

/// A well-formed Argon2id digest that matches no password.
///
/// Verified against when a login names an unknown email, so the miss
/// path performs the same amount of work as a real verification.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

fn argon2() -> Result<Argon2<'static>> {
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_KIB)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    ))
}

/// Hashes a password using Argon2id.
///
/// CPU-bound and deliberately slow; callers on the request path must run
/// this under `spawn_blocking`.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-format digest.
pub fn hash_password(password: &str) -> Result<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let password_hash = argon2()?
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a stored digest.
///
/// Returns `false` for a malformed digest rather than erroring; the
/// underlying comparison is constant-time.
///
/// # Arguments
///
/// * `password` - The password to verify.
/// * `digest` - The PHC-format digest to verify against.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(digest) else {
        tracing::warn!("Stored password digest is malformed");
        return false;
    };

    let mut password_bytes = password.as_bytes().to_vec();
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    result
}
