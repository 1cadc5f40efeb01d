//! typed LDAP request controls
//!
//! every control converts into an [ldap3::controls::RawControl] for use with
//! [ldap3::Ldap::with_controls] and decodes from one, the values are BER
//! encoded with the primitives ldap3 re-exports as [ldap3::asn1]. Controls also
//! have a JSON representation, see [json].

pub mod effective_rights;
pub mod json;
pub mod name_with_entry_uuid;
pub mod operation_purpose;
pub mod transaction_specification;

use bytes::BytesMut;
use ldap3::asn1::{parse_tag, write, ASNTag, StructureTag, Tag, PL};
use ldap3::controls::RawControl;
use thiserror::Error;
use tracing::instrument;

use crate::controls::effective_rights::{GetEffectiveRightsRequest, GET_EFFECTIVE_RIGHTS_OID};
use crate::controls::name_with_entry_uuid::{NameWithEntryUuidRequest, NAME_WITH_ENTRY_UUID_OID};
use crate::controls::operation_purpose::{OperationPurposeRequest, OPERATION_PURPOSE_OID};
use crate::controls::transaction_specification::{
    TransactionSpecificationRequest, TRANSACTION_SPECIFICATION_OID,
};

/// an error decoding or encoding a control
#[derive(Debug, Error)]
pub enum ControlError {
    /// the control has a different OID than the type it is decoded as
    #[error("expected a control with OID {expected} but got {actual}")]
    WrongOid {
        /// the OID of the type the control was decoded as
        expected: &'static str,
        /// the OID of the control
        actual: String,
    },
    /// the control requires a value but has none
    #[error("the {0} control requires a value")]
    MissingValue(&'static str),
    /// the control must not have a value but has one
    #[error("the {0} control must not have a value")]
    UnexpectedValue(&'static str),
    /// the control value could not be decoded
    #[error("malformed value for the {control} control: {reason}")]
    MalformedValue {
        /// the name of the control
        control: &'static str,
        /// what was wrong with the value
        reason: String,
    },
    /// the value could not be BER encoded
    #[error("could not encode control value: {0}")]
    Encode(#[from] std::io::Error),
    /// the JSON representation could not be (de)serialized
    #[error("invalid JSON control representation: {0}")]
    Json(#[from] serde_json::Error),
    /// the JSON representation was well-formed but can not describe the control
    #[error("invalid JSON control representation: {0}")]
    InvalidJson(String),
    /// the base64 encoded value in the JSON representation could not be decoded
    #[error("could not decode base64 control value: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ControlError {
    /// shorthand for [ControlError::MalformedValue]
    pub(crate) fn malformed(control: &'static str, reason: impl Into<String>) -> Self {
        ControlError::MalformedValue {
            control,
            reason: reason.into(),
        }
    }
}

/// a typed control
pub trait Control: Sized {
    /// the OID identifying the control
    const OID: &'static str;
    /// the human readable name of the control
    const NAME: &'static str;

    /// whether the server must reject the request if it does not support the
    /// control
    fn is_critical(&self) -> bool;

    /// the BER encoded value of the control, if it has one
    fn encode_value(&self) -> Result<Option<Vec<u8>>, ControlError>;

    /// decode the typed control from criticality and raw value
    fn decode_value(critical: bool, value: Option<&[u8]>) -> Result<Self, ControlError>;

    /// the value in the `value-json` form, [None] if the control has no value
    /// or only supports the base64 form
    fn value_json(&self) -> Option<serde_json::Value>;

    /// decode the typed control from criticality and a `value-json` object
    fn decode_value_json(
        critical: bool,
        value: &serde_json::Value,
        strict: bool,
    ) -> Result<Self, ControlError>;

    /// convert into a control which can be sent with ldap3
    fn to_raw(&self) -> Result<RawControl, ControlError> {
        Ok(RawControl {
            ctype: Self::OID.to_string(),
            crit: self.is_critical(),
            val: self.encode_value()?,
        })
    }

    /// decode a control received from or prepared for ldap3
    fn decode(control: &RawControl) -> Result<Self, ControlError> {
        if control.ctype != Self::OID {
            return Err(ControlError::WrongOid {
                expected: Self::OID,
                actual: control.ctype.clone(),
            });
        }
        Self::decode_value(control.crit, control.val.as_deref())
    }
}

/// BER encode a tag
pub(crate) fn encode_ber(tag: Tag) -> Result<Vec<u8>, ControlError> {
    let mut buf = BytesMut::new();
    write::encode_into(&mut buf, tag.into_structure())?;
    Ok(buf.to_vec())
}

/// parse a complete BER element, trailing bytes are an error
pub(crate) fn parse_ber(control: &'static str, value: &[u8]) -> Result<StructureTag, ControlError> {
    match parse_tag(value) {
        Ok((rest, tag)) if rest.is_empty() => Ok(tag),
        Ok((rest, _)) => Err(ControlError::malformed(
            control,
            format!("{} unexpected bytes after the value", rest.len()),
        )),
        Err(e) => Err(ControlError::malformed(
            control,
            format!("could not parse BER element: {:?}", e),
        )),
    }
}

/// the elements of a constructed BER element
pub(crate) fn constructed(
    control: &'static str,
    tag: StructureTag,
) -> Result<Vec<StructureTag>, ControlError> {
    match tag.payload {
        PL::C(inner) => Ok(inner),
        PL::P(_) => Err(ControlError::malformed(
            control,
            "expected a constructed element",
        )),
    }
}

/// the bytes of a primitive BER element
pub(crate) fn primitive(control: &'static str, tag: StructureTag) -> Result<Vec<u8>, ControlError> {
    match tag.payload {
        PL::P(bytes) => Ok(bytes),
        PL::C(_) => Err(ControlError::malformed(control, "expected a primitive element")),
    }
}

/// the bytes of a primitive BER element as UTF-8 text
pub(crate) fn primitive_string(
    control: &'static str,
    tag: StructureTag,
) -> Result<String, ControlError> {
    String::from_utf8(primitive(control, tag)?)
        .map_err(|e| ControlError::malformed(control, e.to_string()))
}

/// one of the controls this crate knows how to decode
#[derive(Debug, Clone)]
pub enum KnownControl {
    /// see [GetEffectiveRightsRequest]
    GetEffectiveRights(GetEffectiveRightsRequest),
    /// see [OperationPurposeRequest]
    OperationPurpose(OperationPurposeRequest),
    /// see [TransactionSpecificationRequest]
    TransactionSpecification(TransactionSpecificationRequest),
    /// see [NameWithEntryUuidRequest]
    NameWithEntryUuid(NameWithEntryUuidRequest),
    /// any other control, kept as is
    Unknown(RawControl),
}

impl KnownControl {
    /// decode a control by dispatching on its OID, controls with an unknown
    /// OID are kept unchanged
    #[instrument]
    pub fn decode(control: &RawControl) -> Result<Self, ControlError> {
        let result = match control.ctype.as_str() {
            GET_EFFECTIVE_RIGHTS_OID => {
                KnownControl::GetEffectiveRights(GetEffectiveRightsRequest::decode(control)?)
            }
            OPERATION_PURPOSE_OID => {
                KnownControl::OperationPurpose(OperationPurposeRequest::decode(control)?)
            }
            TRANSACTION_SPECIFICATION_OID => KnownControl::TransactionSpecification(
                TransactionSpecificationRequest::decode(control)?,
            ),
            NAME_WITH_ENTRY_UUID_OID => {
                KnownControl::NameWithEntryUuid(NameWithEntryUuidRequest::decode(control)?)
            }
            _ => {
                tracing::debug!("Keeping control with unknown OID {} as is", control.ctype);
                KnownControl::Unknown(control.clone())
            }
        };
        Ok(result)
    }

    /// the OID of the control
    pub fn oid(&self) -> &str {
        match self {
            KnownControl::GetEffectiveRights(_) => GetEffectiveRightsRequest::OID,
            KnownControl::OperationPurpose(_) => OperationPurposeRequest::OID,
            KnownControl::TransactionSpecification(_) => TransactionSpecificationRequest::OID,
            KnownControl::NameWithEntryUuid(_) => NameWithEntryUuidRequest::OID,
            KnownControl::Unknown(raw) => &raw.ctype,
        }
    }

    /// convert into a control which can be sent with ldap3
    pub fn to_raw(&self) -> Result<RawControl, ControlError> {
        match self {
            KnownControl::GetEffectiveRights(c) => c.to_raw(),
            KnownControl::OperationPurpose(c) => c.to_raw(),
            KnownControl::TransactionSpecification(c) => c.to_raw(),
            KnownControl::NameWithEntryUuid(c) => c.to_raw(),
            KnownControl::Unknown(raw) => Ok(raw.clone()),
        }
    }
}

impl From<GetEffectiveRightsRequest> for KnownControl {
    fn from(c: GetEffectiveRightsRequest) -> Self {
        KnownControl::GetEffectiveRights(c)
    }
}

impl From<OperationPurposeRequest> for KnownControl {
    fn from(c: OperationPurposeRequest) -> Self {
        KnownControl::OperationPurpose(c)
    }
}

impl From<TransactionSpecificationRequest> for KnownControl {
    fn from(c: TransactionSpecificationRequest) -> Self {
        KnownControl::TransactionSpecification(c)
    }
}

impl From<NameWithEntryUuidRequest> for KnownControl {
    fn from(c: NameWithEntryUuidRequest) -> Self {
        KnownControl::NameWithEntryUuid(c)
    }
}
