//! Secret masking module.
//!
//! Secrets sometimes need to show up in diagnostics (a wrong password
//! is a common reason for a failed login). Only the first and the
//! last characters are revealed.

pub const MASK_CHAR: char = '*';

/// Masks every character of the given secret except the first and
/// the last one. Secrets shorter than 3 characters are returned as
/// is.
pub fn mask<S: AsRef<str>>(secret: S) -> String {
    let secret = secret.as_ref();
    let len = secret.chars().count();

    if len < 3 {
        return secret.to_owned();
    }

    secret
        .chars()
        .enumerate()
        .map(|(i, c)| if i == 0 || i == len - 1 { c } else { MASK_CHAR })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::mask;

    #[test]
    fn test_mask() {
        assert_eq!("p******d", mask("password"));
        assert_eq!("a*c", mask("abc"));
        assert_eq!("é**ß", mask("éaaß"));
    }

    #[test]
    fn test_mask_short_secrets() {
        assert_eq!("", mask(""));
        assert_eq!("a", mask("a"));
        assert_eq!("ab", mask("ab"));
    }
}
