//! Helper functions could be used in front/, webhook/, ...

use anyhow::anyhow;
use argon2::Argon2;
use std::str::FromStr;
use uuid::Uuid;

/// Derives a 32-byte key from a password/salt uuid pair
pub fn build_cookie_key(pwd: &str, salt: &str) -> anyhow::Result<[u8; 32]> {
    let mut cookie_key = [0u8; 32];
    Argon2::default()
        .hash_password_into(
            Uuid::from_str(pwd)?.as_bytes(),
            Uuid::from_str(salt)?.as_bytes(),
            &mut cookie_key,
        )
        .map_err(|err| anyhow!("cookie_key couldn't be created: {}", err))?;

    Ok(cookie_key)
}

/// Fresh session-cookie key, regenerated on every application start
pub fn build_random_cookie_key() -> anyhow::Result<[u8; 32]> {
    build_cookie_key(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_key_is_deterministic() {
        let pwd = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().to_string();

        assert_eq!(
            build_cookie_key(&pwd, &salt).unwrap(),
            build_cookie_key(&pwd, &salt).unwrap()
        );
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(
            build_random_cookie_key().unwrap(),
            build_random_cookie_key().unwrap()
        );
    }
}
