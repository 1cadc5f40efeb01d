//! HMAC based (RFC 4226) and time based (RFC 6238) one-time passwords as used
//! for multi-factor authentication against the directory server
//!
//! the HMAC-SHA-1 computation uses openssl

use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use thiserror::Error;

/// the number of digits used if none are specified
pub const DEFAULT_DIGITS: u32 = 6;

/// the TOTP interval recommended by RFC 6238
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// error which can occur while generating a one-time password
#[derive(Debug, Error)]
pub enum OtpError {
    /// only 6, 7 or 8 digit passwords are supported
    #[error("one-time passwords must have 6 to 8 digits, not {0}")]
    InvalidDigits(u32),
    /// the secret key was empty
    #[error("the one-time password key must not be empty")]
    EmptyKey,
    /// the TOTP interval was zero
    #[error("the TOTP interval must be greater than zero")]
    InvalidInterval,
    /// openssl failed to compute the HMAC
    #[error("could not compute HMAC: {0}")]
    Hmac(#[from] openssl::error::ErrorStack),
}

/// HMAC-SHA-1 of the big-endian counter
fn hmac_sha1(key: &[u8], counter: u64) -> Result<Vec<u8>, OtpError> {
    let pkey = PKey::hmac(key)?;
    let mut signer = Signer::new(MessageDigest::sha1(), &pkey)?;
    signer.update(&counter.to_be_bytes())?;
    Ok(signer.sign_to_vec()?)
}

/// a 6 digit HOTP password for the given counter
pub fn hotp(key: &[u8], counter: u64) -> Result<String, OtpError> {
    hotp_with_digits(key, counter, DEFAULT_DIGITS)
}

/// a HOTP password with 6 to 8 digits, zero-padded on the left
pub fn hotp_with_digits(key: &[u8], counter: u64, digits: u32) -> Result<String, OtpError> {
    if !(6..=8).contains(&digits) {
        return Err(OtpError::InvalidDigits(digits));
    }
    if key.is_empty() {
        return Err(OtpError::EmptyKey);
    }
    let mac = hmac_sha1(key, counter)?;
    // dynamic truncation, the low nibble of the last byte selects the offset
    let offset = usize::from(mac[mac.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        mac[offset] & 0x7f,
        mac[offset + 1],
        mac[offset + 2],
        mac[offset + 3],
    ]);
    let code = binary % 10u32.pow(digits);
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// a TOTP password for the time step containing `unix_seconds`
pub fn totp(
    key: &[u8],
    unix_seconds: u64,
    interval_seconds: u64,
    digits: u32,
) -> Result<String, OtpError> {
    if interval_seconds == 0 {
        return Err(OtpError::InvalidInterval);
    }
    hotp_with_digits(key, unix_seconds / interval_seconds, digits)
}

/// a 6 digit TOTP password for the current time with a 30 second interval
pub fn totp_now(key: &[u8]) -> Result<String, OtpError> {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    totp(key, now, DEFAULT_INTERVAL_SECONDS, DEFAULT_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const RFC_KEY: &[u8] = b"12345678901234567890";

    #[rstest]
    #[case(0, "755224")]
    #[case(1, "287082")]
    #[case(2, "359152")]
    #[case(3, "969429")]
    #[case(4, "338314")]
    #[case(5, "254676")]
    #[case(6, "287922")]
    #[case(7, "162583")]
    #[case(8, "399871")]
    #[case(9, "520489")]
    fn rfc4226_appendix_d(#[case] counter: u64, #[case] expected: &str) {
        assert_eq!(hotp(RFC_KEY, counter).unwrap(), expected);
    }

    #[rstest]
    #[case(59, "94287082")]
    #[case(1111111109, "07081804")]
    #[case(1111111111, "14050471")]
    #[case(1234567890, "89005924")]
    #[case(2000000000, "69279037")]
    #[case(20000000000, "65353130")]
    fn rfc6238_sha1_vectors(#[case] time: u64, #[case] expected: &str) {
        assert_eq!(totp(RFC_KEY, time, 30, 8).unwrap(), expected);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            hotp_with_digits(RFC_KEY, 0, 5),
            Err(OtpError::InvalidDigits(5))
        ));
        assert!(matches!(
            hotp_with_digits(RFC_KEY, 0, 9),
            Err(OtpError::InvalidDigits(9))
        ));
        assert!(matches!(hotp(b"", 0), Err(OtpError::EmptyKey)));
        assert!(matches!(
            totp(RFC_KEY, 59, 0, 6),
            Err(OtpError::InvalidInterval)
        ));
    }

    #[test]
    fn current_password_has_default_length() {
        assert_eq!(totp_now(RFC_KEY).unwrap().len(), 6);
    }
}
