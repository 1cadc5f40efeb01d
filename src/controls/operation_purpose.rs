//! the operation purpose request control, describes which application sent a
//! request and why so that it shows up in the server access log

use ldap3::asn1::{OctetString, Sequence, Tag, TagClass};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controls::json::{check_unknown_fields, parse_value_json};
use crate::controls::{constructed, encode_ber, parse_ber, primitive_string, Control, ControlError};
use crate::error::UsageError;

/// the OID of the operation purpose request control
pub const OPERATION_PURPOSE_OID: &str = "1.3.6.1.4.1.30221.2.5.19";

/// name used in errors and the JSON form
const NAME: &str = "Operation Purpose Request Control";

/// context tag of the application name
const TAG_APPLICATION_NAME: u64 = 0;
/// context tag of the application version
const TAG_APPLICATION_VERSION: u64 = 1;
/// context tag of the code location
const TAG_CODE_LOCATION: u64 = 2;
/// context tag of the request purpose
const TAG_REQUEST_PURPOSE: u64 = 3;

/// describes the purpose of a request, at least one field is always set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPurposeRequest {
    /// the criticality of the control
    critical: bool,
    /// the name of the application
    application_name: Option<String>,
    /// the version of the application
    application_version: Option<String>,
    /// where in the application the request was sent from
    code_location: Option<String>,
    /// why the request was sent
    request_purpose: Option<String>,
}

/// the `value-json` form
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct JsonValue {
    /// the name of the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_name: Option<String>,
    /// the version of the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_version: Option<String>,
    /// where the request was sent from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_location: Option<String>,
    /// why the request was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_purpose: Option<String>,
    /// anything else
    #[serde(flatten)]
    unknown_fields: Map<String, Value>,
}

impl OperationPurposeRequest {
    /// a non-critical control, empty strings count as absent
    pub fn new(
        application_name: Option<&str>,
        application_version: Option<&str>,
        code_location: Option<&str>,
        request_purpose: Option<&str>,
    ) -> Result<Self, UsageError> {
        Self::with_criticality(
            false,
            application_name,
            application_version,
            code_location,
            request_purpose,
        )
    }

    /// a control with the given criticality, empty strings count as absent
    pub fn with_criticality(
        critical: bool,
        application_name: Option<&str>,
        application_version: Option<&str>,
        code_location: Option<&str>,
        request_purpose: Option<&str>,
    ) -> Result<Self, UsageError> {
        let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        let control = Self {
            critical,
            application_name: non_empty(application_name),
            application_version: non_empty(application_version),
            code_location: non_empty(code_location),
            request_purpose: non_empty(request_purpose),
        };
        if control.fields().iter().all(|(_, v)| v.is_none()) {
            return Err(UsageError::MissingArgument(
                "application_name, application_version, code_location or request_purpose"
                    .to_string(),
            ));
        }
        Ok(control)
    }

    /// the name of the application
    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    /// the version of the application
    pub fn application_version(&self) -> Option<&str> {
        self.application_version.as_deref()
    }

    /// where the request was sent from
    pub fn code_location(&self) -> Option<&str> {
        self.code_location.as_deref()
    }

    /// why the request was sent
    pub fn request_purpose(&self) -> Option<&str> {
        self.request_purpose.as_deref()
    }

    /// the fields with their context tags in encoding order
    fn fields(&self) -> [(u64, Option<&str>); 4] {
        [
            (TAG_APPLICATION_NAME, self.application_name()),
            (TAG_APPLICATION_VERSION, self.application_version()),
            (TAG_CODE_LOCATION, self.code_location()),
            (TAG_REQUEST_PURPOSE, self.request_purpose()),
        ]
    }
}

impl Control for OperationPurposeRequest {
    const OID: &'static str = OPERATION_PURPOSE_OID;
    const NAME: &'static str = NAME;

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn encode_value(&self) -> Result<Option<Vec<u8>>, ControlError> {
        let inner = self
            .fields()
            .into_iter()
            .filter_map(|(id, value)| {
                value.map(|v| {
                    Tag::OctetString(OctetString {
                        class: TagClass::Context,
                        id,
                        inner: v.as_bytes().to_vec(),
                    })
                })
            })
            .collect();
        let value = Tag::Sequence(Sequence {
            inner,
            ..Default::default()
        });
        Ok(Some(encode_ber(value)?))
    }

    fn decode_value(critical: bool, value: Option<&[u8]>) -> Result<Self, ControlError> {
        let value = value.ok_or(ControlError::MissingValue(NAME))?;
        let mut fields: [Option<String>; 4] = Default::default();
        for element in constructed(NAME, parse_ber(NAME, value)?)? {
            if !matches!(element.class, TagClass::Context) || element.id > TAG_REQUEST_PURPOSE {
                return Err(ControlError::malformed(
                    NAME,
                    format!("unexpected element with tag {}", element.id),
                ));
            }
            let index = element.id as usize;
            if fields[index].is_some() {
                return Err(ControlError::malformed(
                    NAME,
                    format!("element with tag {} appears twice", element.id),
                ));
            }
            fields[index] = Some(primitive_string(NAME, element)?);
        }
        let [application_name, application_version, code_location, request_purpose] = fields;
        Self::with_criticality(
            critical,
            application_name.as_deref(),
            application_version.as_deref(),
            code_location.as_deref(),
            request_purpose.as_deref(),
        )
        .map_err(|_| ControlError::malformed(NAME, "the value sequence must not be empty"))
    }

    fn value_json(&self) -> Option<Value> {
        serde_json::to_value(JsonValue {
            application_name: self.application_name.clone(),
            application_version: self.application_version.clone(),
            code_location: self.code_location.clone(),
            request_purpose: self.request_purpose.clone(),
            unknown_fields: Map::new(),
        })
        .ok()
    }

    fn decode_value_json(critical: bool, value: &Value, strict: bool) -> Result<Self, ControlError> {
        let parsed: JsonValue = parse_value_json(value)?;
        check_unknown_fields(NAME, &parsed.unknown_fields, strict)?;
        Self::with_criticality(
            critical,
            parsed.application_name.as_deref(),
            parsed.application_version.as_deref(),
            parsed.code_location.as_deref(),
            parsed.request_purpose.as_deref(),
        )
        .map_err(|e| ControlError::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn fields_use_context_tags() {
        let control =
            OperationPurposeRequest::new(Some("app"), None, None, Some("why")).unwrap();
        let raw = control.to_raw().unwrap();
        assert_eq!(
            raw.val,
            Some(vec![
                0x30, 0x0a, 0x80, 0x03, b'a', b'p', b'p', 0x83, 0x03, b'w', b'h', b'y'
            ])
        );
        assert!(!raw.crit);
        assert_eq!(OperationPurposeRequest::decode(&raw).unwrap(), control);
    }

    #[test]
    fn all_fields_round_trip() {
        let control = OperationPurposeRequest::with_criticality(
            true,
            Some("ldap-tasks"),
            Some("0.1.0"),
            Some("client::schedule_task"),
            Some("nightly backup"),
        )
        .unwrap();
        let raw = control.to_raw().unwrap();
        assert_eq!(OperationPurposeRequest::decode(&raw).unwrap(), control);
        let json = control.value_json().unwrap();
        assert_eq!(
            OperationPurposeRequest::decode_value_json(true, &json, true).unwrap(),
            control
        );
    }

    #[test]
    fn at_least_one_field_is_required() {
        assert!(matches!(
            OperationPurposeRequest::new(None, Some(""), None, None),
            Err(UsageError::MissingArgument(_))
        ));
    }

    #[rstest]
    #[case::empty_sequence(vec![0x30, 0x00])]
    #[case::unknown_tag(vec![0x30, 0x03, 0x84, 0x01, b'x'])]
    #[case::universal_tag(vec![0x30, 0x03, 0x04, 0x01, b'x'])]
    #[case::duplicate_tag(vec![0x30, 0x06, 0x80, 0x01, b'x', 0x80, 0x01, b'y'])]
    #[case::not_a_sequence(vec![0x80, 0x01, b'x'])]
    fn malformed_values_are_rejected(#[case] value: Vec<u8>) {
        assert!(matches!(
            OperationPurposeRequest::decode_value(false, Some(value.as_slice())),
            Err(ControlError::MalformedValue { .. })
        ));
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(matches!(
            OperationPurposeRequest::decode_value(false, None),
            Err(ControlError::MissingValue(_))
        ));
    }
}
