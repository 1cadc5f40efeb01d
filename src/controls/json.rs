//! the JSON representation of controls
//!
//! a control is represented as an object with the fields `oid`,
//! `control-name`, `criticality` and at most one of `value-base64` (the BER
//! encoded value) and `value-json` (a control specific object). Strict decoding
//! rejects fields it does not know about, non-strict decoding ignores them.

use base64::Engine;
use ldap3::controls::RawControl;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::controls::effective_rights::{GetEffectiveRightsRequest, GET_EFFECTIVE_RIGHTS_OID};
use crate::controls::name_with_entry_uuid::{NameWithEntryUuidRequest, NAME_WITH_ENTRY_UUID_OID};
use crate::controls::operation_purpose::{OperationPurposeRequest, OPERATION_PURPOSE_OID};
use crate::controls::transaction_specification::{
    TransactionSpecificationRequest, TRANSACTION_SPECIFICATION_OID,
};
use crate::controls::{Control, ControlError, KnownControl};

/// the JSON object describing one control
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JsonControl {
    /// the OID of the control
    pub oid: String,
    /// the human readable name of the control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_name: Option<String>,
    /// the criticality of the control
    pub criticality: bool,
    /// the BER encoded value in base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_base64: Option<String>,
    /// the value as a control specific JSON object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_json: Option<Value>,
    /// fields not described above, always empty when encoding
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

/// reject unknown fields in strict mode
pub(crate) fn check_unknown_fields(
    context: &str,
    unknown_fields: &Map<String, Value>,
    strict: bool,
) -> Result<(), ControlError> {
    if strict && !unknown_fields.is_empty() {
        return Err(ControlError::InvalidJson(format!(
            "unrecognized fields in {}: {}",
            context,
            itertools::join(unknown_fields.keys(), ", ")
        )));
    }
    if !unknown_fields.is_empty() {
        tracing::trace!(
            "Ignoring unrecognized fields in {}: {:?}",
            context,
            unknown_fields.keys().collect::<Vec<_>>()
        );
    }
    Ok(())
}

/// parse a control specific `value-json` object into its serde type
pub(crate) fn parse_value_json<T>(value: &Value) -> Result<T, ControlError>
where
    T: for<'de> Deserialize<'de>,
{
    if !value.is_object() {
        return Err(ControlError::InvalidJson(
            "value-json must be an object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value.clone())?)
}

impl JsonControl {
    /// the JSON form of a typed control, `value-json` is used where the
    /// control supports it
    pub fn from_control<C: Control>(control: &C) -> Result<Self, ControlError> {
        let (value_base64, value_json) = match control.value_json() {
            Some(json) => (None, Some(json)),
            None => (
                control
                    .encode_value()?
                    .map(|v| base64::engine::general_purpose::STANDARD.encode(v)),
                None,
            ),
        };
        Ok(Self {
            oid: C::OID.to_string(),
            control_name: Some(C::NAME.to_string()),
            criticality: control.is_critical(),
            value_base64,
            value_json,
            unknown_fields: Map::new(),
        })
    }

    /// the JSON form of an untyped control, the value is always base64 encoded
    pub fn from_raw(control: &RawControl) -> Self {
        Self {
            oid: control.ctype.clone(),
            control_name: None,
            criticality: control.crit,
            value_base64: control
                .val
                .as_ref()
                .map(|v| base64::engine::general_purpose::STANDARD.encode(v)),
            value_json: None,
            unknown_fields: Map::new(),
        }
    }

    /// check the envelope and decode the base64 value if present
    fn raw_value(&self, strict: bool) -> Result<Option<Vec<u8>>, ControlError> {
        check_unknown_fields("control", &self.unknown_fields, strict)?;
        if self.value_base64.is_some() && self.value_json.is_some() {
            return Err(ControlError::InvalidJson(
                "only one of value-base64 and value-json may be present".to_string(),
            ));
        }
        Ok(self
            .value_base64
            .as_ref()
            .map(|v| base64::engine::general_purpose::STANDARD.decode(v))
            .transpose()?)
    }

    /// decode as the given control type
    pub fn to_control<C: Control>(&self, strict: bool) -> Result<C, ControlError> {
        if self.oid != C::OID {
            return Err(ControlError::WrongOid {
                expected: C::OID,
                actual: self.oid.clone(),
            });
        }
        let raw_value = self.raw_value(strict)?;
        match &self.value_json {
            Some(json) => C::decode_value_json(self.criticality, json, strict),
            None => C::decode_value(self.criticality, raw_value.as_deref()),
        }
    }

    /// decode into an untyped control, only possible with a base64 value or
    /// no value at all
    pub fn to_raw(&self, strict: bool) -> Result<RawControl, ControlError> {
        let val = self.raw_value(strict)?;
        if self.value_json.is_some() {
            return Err(ControlError::InvalidJson(format!(
                "value-json is not supported for control {}",
                self.oid
            )));
        }
        Ok(RawControl {
            ctype: self.oid.clone(),
            crit: self.criticality,
            val,
        })
    }

    /// render as a JSON value
    pub fn to_value(&self) -> Result<Value, ControlError> {
        Ok(serde_json::to_value(self)?)
    }

    /// parse from a JSON value
    pub fn from_value(value: &Value) -> Result<Self, ControlError> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl KnownControl {
    /// the JSON form of the control
    pub fn to_json(&self) -> Result<JsonControl, ControlError> {
        match self {
            KnownControl::GetEffectiveRights(c) => JsonControl::from_control(c),
            KnownControl::OperationPurpose(c) => JsonControl::from_control(c),
            KnownControl::TransactionSpecification(c) => JsonControl::from_control(c),
            KnownControl::NameWithEntryUuid(c) => JsonControl::from_control(c),
            KnownControl::Unknown(raw) => Ok(JsonControl::from_raw(raw)),
        }
    }

    /// decode the JSON form by dispatching on the OID
    #[instrument]
    pub fn from_json(json: &JsonControl, strict: bool) -> Result<Self, ControlError> {
        let result = match json.oid.as_str() {
            GET_EFFECTIVE_RIGHTS_OID => {
                KnownControl::GetEffectiveRights(json.to_control::<GetEffectiveRightsRequest>(strict)?)
            }
            OPERATION_PURPOSE_OID => {
                KnownControl::OperationPurpose(json.to_control::<OperationPurposeRequest>(strict)?)
            }
            TRANSACTION_SPECIFICATION_OID => KnownControl::TransactionSpecification(
                json.to_control::<TransactionSpecificationRequest>(strict)?,
            ),
            NAME_WITH_ENTRY_UUID_OID => {
                KnownControl::NameWithEntryUuid(json.to_control::<NameWithEntryUuidRequest>(strict)?)
            }
            _ => KnownControl::Unknown(json.to_raw(strict)?),
        };
        Ok(result)
    }
}
