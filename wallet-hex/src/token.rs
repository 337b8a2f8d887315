//! Payment confirmation token generation.

use rand::Rng;

pub const TOKEN_MIN: u32 = 100_000;
pub const TOKEN_MAX: u32 = 999_999;

/// Draws a 6-digit code uniformly from `100000..=999999`.
pub fn generate_token() -> String {
    rand::rng().random_range(TOKEN_MIN..=TOKEN_MAX).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_six_digits() {
        for _ in 0..1_000 {
            let token = generate_token();
            assert_eq!(token.len(), 6);
            assert!(token.bytes().all(|b| b.is_ascii_digit()));
            assert_ne!(token.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn test_tokens_vary() {
        let tokens: std::collections::HashSet<_> = (0..50).map(|_| generate_token()).collect();
        assert!(tokens.len() > 1);
    }
}
