//! Opaque token generation.

use rand::RngCore;

use crate::models::TOKEN_SIZE;

/// Produces the raw token strings handed out by the registry.
///
/// Injected at registry construction so tests can substitute a deterministic
/// source; nothing in the workspace reaches for a process-wide generator.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator: [`TOKEN_SIZE`] bytes from the OS RNG, hex-encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_of_expected_size() {
        let generator = RandomTokenGenerator;
        let token = generator.generate();
        assert_eq!(token.len(), TOKEN_SIZE * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let generator = RandomTokenGenerator;
        assert_ne!(generator.generate(), generator.generate());
    }
}
