//! the get effective rights request control, asks the server to include the
//! rights a user has on each returned entry

use ldap3::asn1::{OctetString, Sequence, Tag, TagClass, Types};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controls::json::{check_unknown_fields, parse_value_json};
use crate::controls::{constructed, encode_ber, parse_ber, primitive_string, Control, ControlError};

/// the OID of the get effective rights request control
pub const GET_EFFECTIVE_RIGHTS_OID: &str = "1.3.6.1.4.1.42.2.27.9.5.2";

/// name used in errors and the JSON form
const NAME: &str = "Get Effective Rights Request Control";

/// requests the effective rights of an authorization identity on the returned
/// entries and attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEffectiveRightsRequest {
    /// the criticality of the control
    critical: bool,
    /// the identity whose rights are evaluated, the bound user if [None]
    authorization_id: Option<String>,
    /// attribute types to evaluate in addition to those present in the entry
    attributes: Vec<String>,
}

/// the `value-json` form
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct JsonValue {
    /// the authorization identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authorization_id: Option<String>,
    /// the attribute types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<String>,
    /// anything else
    #[serde(flatten)]
    unknown_fields: Map<String, Value>,
}

impl GetEffectiveRightsRequest {
    /// request the rights of an authorization identity like `dn:uid=a,dc=example`
    /// or of the bound user if [None]
    pub fn new<I, S>(critical: bool, authorization_id: Option<&str>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            critical,
            authorization_id: authorization_id
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// the identity whose rights are evaluated
    pub fn authorization_id(&self) -> Option<&str> {
        self.authorization_id.as_deref()
    }

    /// the additional attribute types
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

impl Control for GetEffectiveRightsRequest {
    const OID: &'static str = GET_EFFECTIVE_RIGHTS_OID;
    const NAME: &'static str = NAME;

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn encode_value(&self) -> Result<Option<Vec<u8>>, ControlError> {
        if self.authorization_id.is_none() && self.attributes.is_empty() {
            return Ok(None);
        }
        let authorization_id = self.authorization_id.clone().unwrap_or_default();
        let value = Tag::Sequence(Sequence {
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: authorization_id.into_bytes(),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner: self
                        .attributes
                        .iter()
                        .map(|a| {
                            Tag::OctetString(OctetString {
                                inner: a.as_bytes().to_vec(),
                                ..Default::default()
                            })
                        })
                        .collect(),
                    ..Default::default()
                }),
            ],
            ..Default::default()
        });
        Ok(Some(encode_ber(value)?))
    }

    fn decode_value(critical: bool, value: Option<&[u8]>) -> Result<Self, ControlError> {
        let Some(value) = value else {
            return Ok(Self {
                critical,
                ..Default::default()
            });
        };
        let mut elements = constructed(NAME, parse_ber(NAME, value)?)?.into_iter();
        let authorization_id = match elements.next() {
            Some(tag)
                if matches!(tag.class, TagClass::Universal)
                    && tag.id == Types::OctetString as u64 =>
            {
                primitive_string(NAME, tag)?
            }
            _ => {
                return Err(ControlError::malformed(
                    NAME,
                    "expected the authorization ID as the first element",
                ))
            }
        };
        let attributes = match elements.next() {
            Some(tag) => constructed(NAME, tag)?
                .into_iter()
                .map(|a| primitive_string(NAME, a))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        if elements.next().is_some() {
            return Err(ControlError::malformed(
                NAME,
                "unexpected elements after the attribute list",
            ));
        }
        Ok(Self::new(critical, Some(authorization_id.as_str()), attributes))
    }

    fn value_json(&self) -> Option<Value> {
        if self.authorization_id.is_none() && self.attributes.is_empty() {
            return None;
        }
        serde_json::to_value(JsonValue {
            authorization_id: self.authorization_id.clone(),
            attributes: self.attributes.clone(),
            unknown_fields: Map::new(),
        })
        .ok()
    }

    fn decode_value_json(critical: bool, value: &Value, strict: bool) -> Result<Self, ControlError> {
        let parsed: JsonValue = parse_value_json(value)?;
        check_unknown_fields(NAME, &parsed.unknown_fields, strict)?;
        Ok(Self::new(
            critical,
            parsed.authorization_id.as_deref(),
            parsed.attributes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn without_identity_and_attributes_there_is_no_value() {
        let control = GetEffectiveRightsRequest::new(false, None, Vec::<String>::new());
        let raw = control.to_raw().unwrap();
        assert_eq!(raw.val, None);
        assert_eq!(GetEffectiveRightsRequest::decode(&raw).unwrap(), control);
    }

    #[test]
    fn value_is_a_sequence_of_identity_and_attributes() {
        let control = GetEffectiveRightsRequest::new(true, Some("dn:uid=a"), ["cn"]);
        let raw = control.to_raw().unwrap();
        assert_eq!(
            raw.val,
            Some(vec![
                0x30, 0x10, 0x04, 0x08, b'd', b'n', b':', b'u', b'i', b'd', b'=', b'a', 0x30,
                0x04, 0x04, 0x02, b'c', b'n',
            ])
        );
        assert!(raw.crit);
        assert_eq!(GetEffectiveRightsRequest::decode(&raw).unwrap(), control);
    }

    #[rstest]
    #[case::attributes_only(None, vec!["userPassword", "mail"])]
    #[case::identity_only(Some("dn:uid=admin,dc=example,dc=com"), vec![])]
    fn partial_values_round_trip(#[case] authorization_id: Option<&str>, #[case] attributes: Vec<&str>) {
        let control = GetEffectiveRightsRequest::new(false, authorization_id, attributes);
        let raw = control.to_raw().unwrap();
        assert!(raw.val.is_some());
        assert_eq!(GetEffectiveRightsRequest::decode(&raw).unwrap(), control);
    }

    #[rstest]
    #[case::not_a_sequence(vec![0x04, 0x00])]
    #[case::truncated(vec![0x30, 0x03, 0x04, 0x05])]
    #[case::identity_not_a_string(vec![0x30, 0x02, 0x30, 0x00])]
    fn malformed_values_are_rejected(#[case] value: Vec<u8>) {
        assert!(matches!(
            GetEffectiveRightsRequest::decode_value(false, Some(value.as_slice())),
            Err(ControlError::MalformedValue { .. })
        ));
    }

    #[test]
    fn json_round_trip() {
        let control = GetEffectiveRightsRequest::new(false, Some("dn:uid=a"), ["cn", "sn"]);
        let value = control.value_json().unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "authorization-id": "dn:uid=a", "attributes": ["cn", "sn"] })
        );
        assert_eq!(
            GetEffectiveRightsRequest::decode_value_json(false, &value, true).unwrap(),
            control
        );
        let extended = serde_json::json!({ "attributes": ["cn"], "rights": "all" });
        assert!(GetEffectiveRightsRequest::decode_value_json(false, &extended, true).is_err());
        assert!(GetEffectiveRightsRequest::decode_value_json(false, &extended, false).is_ok());
    }
}
