//! the password policy state extended operation, reads and changes the
//! password policy state of a user
//!
//! the request and the result share one value format: the DN of the user
//! and a list of operations, each with an operation type and its values. In
//! the result the values are the state after the request was processed.

use ldap3::asn1::{Enumerated, OctetString, Sequence, Tag, TagClass};

use crate::controls::{constructed, encode_ber, parse_ber, primitive_string};
use crate::error::UsageError;
use crate::extended::{primitive_enumerated, ExtendedError, ExtendedValue};

/// the OID of the password policy state extended request and result
pub const PASSWORD_POLICY_STATE_OID: &str = "1.3.6.1.4.1.30221.1.6.1";

/// name used in errors
const NAME: &str = "Password Policy State Extended Operation";

/// get the DN of the password policy governing the user
pub const OP_GET_PASSWORD_POLICY_DN: i64 = 0;
/// get whether the account is disabled
pub const OP_GET_ACCOUNT_DISABLED_STATE: i64 = 1;
/// set whether the account is disabled
pub const OP_SET_ACCOUNT_DISABLED_STATE: i64 = 2;
/// clear the account disabled state
pub const OP_CLEAR_ACCOUNT_DISABLED_STATE: i64 = 3;
/// get the account expiration time
pub const OP_GET_ACCOUNT_EXPIRATION_TIME: i64 = 4;
/// set the account expiration time
pub const OP_SET_ACCOUNT_EXPIRATION_TIME: i64 = 5;
/// clear the account expiration time
pub const OP_CLEAR_ACCOUNT_EXPIRATION_TIME: i64 = 6;
/// get the number of seconds until the account expires
pub const OP_GET_SECONDS_UNTIL_ACCOUNT_EXPIRATION: i64 = 7;
/// get the time the password was last changed
pub const OP_GET_PASSWORD_CHANGED_TIME: i64 = 8;

/// one operation on the password policy state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicyStateOperation {
    /// the operation type
    op_type: i64,
    /// the values, empty for most get operations in a request
    values: Vec<String>,
}

impl PasswordPolicyStateOperation {
    /// an operation of the given type, see the `OP_*` constants
    pub fn new<I, S>(op_type: i64, values: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if op_type < 0 {
            return Err(UsageError::invalid("op_type", "must not be negative"));
        }
        Ok(Self {
            op_type,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// the operation type
    pub fn op_type(&self) -> i64 {
        self.op_type
    }

    /// the values
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// the single value, if there is exactly one
    pub fn single_value(&self) -> Option<&str> {
        match self.values.as_slice() {
            [value] => Some(value.as_str()),
            _ => None,
        }
    }

    /// BER element for the operation
    fn to_tag(&self) -> Tag {
        let mut inner = vec![Tag::Enumerated(Enumerated {
            inner: self.op_type,
            ..Default::default()
        })];
        if !self.values.is_empty() {
            inner.push(Tag::Sequence(Sequence {
                inner: self
                    .values
                    .iter()
                    .map(|v| {
                        Tag::OctetString(OctetString {
                            inner: v.as_bytes().to_vec(),
                            ..Default::default()
                        })
                    })
                    .collect(),
                ..Default::default()
            }));
        }
        Tag::Sequence(Sequence {
            inner,
            ..Default::default()
        })
    }
}

/// the user DN and the operations of a password policy state request or
/// result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicyState {
    /// the DN of the user
    user_dn: String,
    /// the operations, a request without operations returns the full state
    operations: Vec<PasswordPolicyStateOperation>,
}

impl PasswordPolicyState {
    /// a request or result for the given user
    pub fn new<I>(user_dn: &str, operations: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = PasswordPolicyStateOperation>,
    {
        UsageError::check_non_empty("user_dn", user_dn)?;
        Ok(Self {
            user_dn: user_dn.to_string(),
            operations: operations.into_iter().collect(),
        })
    }

    /// the DN of the user
    pub fn user_dn(&self) -> &str {
        &self.user_dn
    }

    /// the operations
    pub fn operations(&self) -> &[PasswordPolicyStateOperation] {
        &self.operations
    }

    /// the first operation of the given type
    pub fn operation(&self, op_type: i64) -> Option<&PasswordPolicyStateOperation> {
        self.operations.iter().find(|op| op.op_type == op_type)
    }
}

/// decode one operation element
fn decode_operation(tag: ldap3::asn1::StructureTag) -> Result<PasswordPolicyStateOperation, ExtendedError> {
    let mut elements = constructed(NAME, tag)?.into_iter();
    let op_type = match elements.next() {
        Some(element) => primitive_enumerated(NAME, element)?,
        None => return Err(ExtendedError::malformed(NAME, "operation without a type")),
    };
    if op_type < 0 {
        return Err(ExtendedError::malformed(
            NAME,
            format!("negative operation type {}", op_type),
        ));
    }
    let values = match elements.next() {
        Some(element) => constructed(NAME, element)?
            .into_iter()
            .map(|v| primitive_string(NAME, v))
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![],
    };
    if elements.next().is_some() {
        return Err(ExtendedError::malformed(NAME, "unexpected element in operation"));
    }
    Ok(PasswordPolicyStateOperation { op_type, values })
}

impl ExtendedValue for PasswordPolicyState {
    const OID: &'static str = PASSWORD_POLICY_STATE_OID;
    const NAME: &'static str = NAME;

    fn encode_value(&self) -> Result<Vec<u8>, ExtendedError> {
        let mut inner = vec![Tag::OctetString(OctetString {
            inner: self.user_dn.as_bytes().to_vec(),
            ..Default::default()
        })];
        if !self.operations.is_empty() {
            inner.push(Tag::Sequence(Sequence {
                inner: self.operations.iter().map(|op| op.to_tag()).collect(),
                ..Default::default()
            }));
        }
        Ok(encode_ber(Tag::Sequence(Sequence {
            inner,
            ..Default::default()
        }))?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, ExtendedError> {
        let mut elements = constructed(NAME, parse_ber(NAME, value)?)?.into_iter();
        let user_dn = match elements.next() {
            Some(element) if matches!(element.class, TagClass::Universal) => {
                primitive_string(NAME, element)?
            }
            _ => return Err(ExtendedError::malformed(NAME, "missing user DN")),
        };
        let operations = match elements.next() {
            Some(element) => constructed(NAME, element)?
                .into_iter()
                .map(decode_operation)
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };
        if elements.next().is_some() {
            return Err(ExtendedError::malformed(NAME, "unexpected trailing element"));
        }
        if user_dn.trim().is_empty() {
            return Err(ExtendedError::malformed(NAME, "empty user DN"));
        }
        Ok(Self {
            user_dn,
            operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldap3::exop::Exop;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn request_without_operations() {
        let state = PasswordPolicyState::new("uid=a", []).unwrap();
        assert_eq!(
            state.encode_value().unwrap(),
            vec![0x30, 0x07, 0x04, 0x05, b'u', b'i', b'd', b'=', b'a']
        );
        let exop = state.to_exop().unwrap();
        assert_eq!(exop.name.as_deref(), Some(PASSWORD_POLICY_STATE_OID));
        assert_eq!(PasswordPolicyState::decode(&exop).unwrap(), state);
    }

    #[test]
    fn result_with_values_round_trips() {
        let state = PasswordPolicyState::new(
            "uid=jdoe,ou=People,dc=example,dc=com",
            [
                PasswordPolicyStateOperation::new(
                    OP_GET_PASSWORD_POLICY_DN,
                    ["cn=Default Password Policy,cn=Password Policies,cn=config"],
                )
                .unwrap(),
                PasswordPolicyStateOperation::new(OP_GET_ACCOUNT_DISABLED_STATE, ["false"])
                    .unwrap(),
                PasswordPolicyStateOperation::new(OP_GET_PASSWORD_CHANGED_TIME, Vec::<String>::new())
                    .unwrap(),
            ],
        )
        .unwrap();
        let decoded = PasswordPolicyState::decode(&state.to_exop().unwrap()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(
            decoded
                .operation(OP_GET_ACCOUNT_DISABLED_STATE)
                .and_then(|op| op.single_value()),
            Some("false")
        );
        assert_eq!(
            decoded
                .operation(OP_GET_PASSWORD_CHANGED_TIME)
                .map(|op| op.values().len()),
            Some(0)
        );
    }

    #[test]
    fn invalid_arguments_are_usage_errors() {
        assert!(PasswordPolicyState::new("", []).is_err());
        assert!(PasswordPolicyStateOperation::new(-1, ["x"]).is_err());
    }

    #[test]
    fn missing_value_or_wrong_oid_is_rejected() {
        let missing = Exop {
            name: Some(PASSWORD_POLICY_STATE_OID.to_string()),
            val: None,
        };
        assert!(matches!(
            PasswordPolicyState::decode(&missing),
            Err(ExtendedError::MissingValue(_))
        ));
        let wrong = Exop {
            name: Some("1.3.6.1.4.1.4203.1.11.3".to_string()),
            val: Some(vec![0x30, 0x00]),
        };
        assert!(matches!(
            PasswordPolicyState::decode(&wrong),
            Err(ExtendedError::WrongOid { .. })
        ));
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::empty_sequence(vec![0x30, 0x00])]
    #[case::not_a_sequence(vec![0x04, 0x01, b'x'])]
    #[case::trailing_bytes(vec![0x30, 0x03, 0x04, 0x01, b'x', 0x00])]
    #[case::operation_type_not_enumerated(vec![
        0x30, 0x0a, 0x04, 0x01, b'x', 0x30, 0x05, 0x30, 0x03, 0x04, 0x01, 0x00
    ])]
    #[case::operation_without_type(vec![0x30, 0x07, 0x04, 0x01, b'x', 0x30, 0x02, 0x30, 0x00])]
    fn malformed_values_are_rejected(#[case] value: Vec<u8>) {
        assert!(matches!(
            PasswordPolicyState::decode_value(&value),
            Err(ExtendedError::MalformedValue { .. })
        ));
    }
}
