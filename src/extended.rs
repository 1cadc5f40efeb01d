//! typed values of extended operations and extended results
//!
//! the values convert into and from [ldap3::exop::Exop], the request and
//! response representation ldap3 uses for [ldap3::Ldap::extended]. The BER
//! helpers are shared with [crate::controls].

pub mod multi_update;
pub mod password_policy_state;

use ldap3::asn1::{StructureTag, TagClass, Types};
use ldap3::exop::Exop;
use thiserror::Error;

use crate::controls::{primitive, ControlError};

/// an error decoding or encoding an extended operation or result value
#[derive(Debug, Error)]
pub enum ExtendedError {
    /// the response or request has a different OID than the type it is decoded as
    #[error("expected an extended operation with OID {expected} but got {actual}")]
    WrongOid {
        /// the OID of the type the value was decoded as
        expected: &'static str,
        /// the OID of the response or request
        actual: String,
    },
    /// the operation requires a value but has none
    #[error("the {0} requires a value")]
    MissingValue(&'static str),
    /// the value could not be decoded
    #[error("malformed value for the {operation}: {reason}")]
    MalformedValue {
        /// the name of the operation
        operation: &'static str,
        /// what was wrong with the value
        reason: String,
    },
    /// the value could not be BER encoded
    #[error("could not encode extended operation value: {0}")]
    Encode(#[from] std::io::Error),
}

impl ExtendedError {
    /// shorthand for [ExtendedError::MalformedValue]
    pub(crate) fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        ExtendedError::MalformedValue {
            operation,
            reason: reason.into(),
        }
    }
}

impl From<ControlError> for ExtendedError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::MalformedValue { control, reason } => {
                ExtendedError::malformed(control, reason)
            }
            ControlError::MissingValue(name) => ExtendedError::MissingValue(name),
            ControlError::Encode(e) => ExtendedError::Encode(e),
            other => ExtendedError::malformed("extended operation", other.to_string()),
        }
    }
}

/// a typed extended operation or extended result value
pub trait ExtendedValue: Sized {
    /// the OID naming the request or response
    const OID: &'static str;
    /// the human readable name used in errors
    const NAME: &'static str;

    /// the BER encoded value
    fn encode_value(&self) -> Result<Vec<u8>, ExtendedError>;

    /// decode from the BER encoded value
    fn decode_value(value: &[u8]) -> Result<Self, ExtendedError>;

    /// convert into the form ldap3 sends and returns
    fn to_exop(&self) -> Result<Exop, ExtendedError> {
        Ok(Exop {
            name: Some(Self::OID.to_string()),
            val: Some(self.encode_value()?),
        })
    }

    /// decode the form ldap3 sends and returns, a response without a name
    /// is accepted since servers may omit it
    fn decode(exop: &Exop) -> Result<Self, ExtendedError> {
        if let Some(name) = &exop.name {
            if name != Self::OID {
                return Err(ExtendedError::WrongOid {
                    expected: Self::OID,
                    actual: name.clone(),
                });
            }
        }
        let value = exop
            .val
            .as_deref()
            .ok_or(ExtendedError::MissingValue(Self::NAME))?;
        Self::decode_value(value)
    }
}

/// the value of a universal ENUMERATED element
pub(crate) fn primitive_enumerated(
    operation: &'static str,
    tag: StructureTag,
) -> Result<i64, ExtendedError> {
    if !matches!(tag.class, TagClass::Universal) || tag.id != Types::Enumerated as u64 {
        return Err(ExtendedError::malformed(
            operation,
            format!("expected an enumerated element but got tag {}", tag.id),
        ));
    }
    let bytes = primitive(operation, tag)?;
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(ExtendedError::malformed(
            operation,
            format!("enumerated value of {} bytes", bytes.len()),
        ));
    }
    let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for b in bytes {
        value = (value << 8) | i64::from(b);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn enumerated(bytes: &[u8]) -> StructureTag {
        StructureTag {
            class: TagClass::Universal,
            id: Types::Enumerated as u64,
            payload: ldap3::asn1::PL::P(bytes.to_vec()),
        }
    }

    #[rstest]
    #[case(&[0x00], 0)]
    #[case(&[0x02], 2)]
    #[case(&[0x00, 0x80], 128)]
    #[case(&[0xff], -1)]
    #[case(&[0x01, 0x00], 256)]
    fn enumerated_values(#[case] bytes: &[u8], #[case] expected: i64) {
        assert_eq!(primitive_enumerated("test", enumerated(bytes)).unwrap(), expected);
    }

    #[test]
    fn enumerated_needs_a_value() {
        assert!(matches!(
            primitive_enumerated("test", enumerated(&[])),
            Err(ExtendedError::MalformedValue { .. })
        ));
        let mut octets = enumerated(&[0x01]);
        octets.id = Types::OctetString as u64;
        assert!(matches!(
            primitive_enumerated("test", octets),
            Err(ExtendedError::MalformedValue { .. })
        ));
    }
}
