use rand::distributions::Alphanumeric;
use rand::Rng;

/// Uppercase alphanumeric code handed out as a user's referral code.
pub fn generate_referral_code(count: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(count)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

/// Initial password mailed to a fresh signup.
pub fn generate_initial_password(count: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(count)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_code_shape() {
        let code = generate_referral_code(7);
        assert_eq!(code.len(), 7);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
