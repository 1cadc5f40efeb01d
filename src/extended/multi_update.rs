//! the multi-update extended result, reports which of the operations in a
//! multi-update request were applied and the result of each one

use ldap3::asn1::{Enumerated, OctetString, Sequence, StructureTag, Tag, TagClass};
use std::fmt::Display;

use crate::controls::{constructed, encode_ber, parse_ber, primitive_string};
use crate::extended::{primitive_enumerated, ExtendedError, ExtendedValue};

/// the OID of the multi-update extended result
pub const MULTI_UPDATE_RESULT_OID: &str = "1.3.6.1.4.1.30221.2.6.18";

/// name used in errors
const NAME: &str = "Multi-Update Extended Result";

/// context tag of the referrals in an LDAP result
const TAG_REFERRAL: u64 = 3;

/// which of the requested changes the server applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangesApplied {
    /// none of the changes were applied
    None,
    /// all of the changes were applied
    All,
    /// only some of the changes were applied
    Partial,
}

impl ChangesApplied {
    /// the value used on the wire
    fn value(&self) -> i64 {
        match self {
            ChangesApplied::None => 0,
            ChangesApplied::All => 1,
            ChangesApplied::Partial => 2,
        }
    }

    /// the variant for a wire value
    fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(ChangesApplied::None),
            1 => Some(ChangesApplied::All),
            2 => Some(ChangesApplied::Partial),
            _ => None,
        }
    }
}

impl Display for ChangesApplied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangesApplied::None => write!(f, "none"),
            ChangesApplied::All => write!(f, "all"),
            ChangesApplied::Partial => write!(f, "partial"),
        }
    }
}

/// the kind of operation a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiUpdateOperationType {
    /// a modify operation
    Modify,
    /// an add operation
    Add,
    /// a delete operation
    Delete,
    /// a modify DN operation
    ModifyDn,
    /// an extended operation
    Extended,
}

impl MultiUpdateOperationType {
    /// the application tag of the response protocol op
    fn application_tag(&self) -> u64 {
        match self {
            MultiUpdateOperationType::Modify => 7,
            MultiUpdateOperationType::Add => 9,
            MultiUpdateOperationType::Delete => 11,
            MultiUpdateOperationType::ModifyDn => 13,
            MultiUpdateOperationType::Extended => 24,
        }
    }

    /// the operation type for an application tag
    fn from_application_tag(tag: u64) -> Option<Self> {
        match tag {
            7 => Some(MultiUpdateOperationType::Modify),
            9 => Some(MultiUpdateOperationType::Add),
            11 => Some(MultiUpdateOperationType::Delete),
            13 => Some(MultiUpdateOperationType::ModifyDn),
            24 => Some(MultiUpdateOperationType::Extended),
            _ => None,
        }
    }
}

/// the result of one operation of a multi-update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiUpdateOperationResult {
    /// the kind of operation
    op_type: MultiUpdateOperationType,
    /// the LDAP result code
    result_code: u32,
    /// the matched DN, empty if none
    matched_dn: String,
    /// the diagnostic message, empty if none
    diagnostic_message: String,
    /// referral URLs
    referrals: Vec<String>,
}

impl MultiUpdateOperationResult {
    /// the result of one operation
    pub fn new<I, S>(
        op_type: MultiUpdateOperationType,
        result_code: u32,
        matched_dn: &str,
        diagnostic_message: &str,
        referrals: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            op_type,
            result_code,
            matched_dn: matched_dn.to_string(),
            diagnostic_message: diagnostic_message.to_string(),
            referrals: referrals.into_iter().map(Into::into).collect(),
        }
    }

    /// the kind of operation
    pub fn op_type(&self) -> MultiUpdateOperationType {
        self.op_type
    }

    /// the LDAP result code
    pub fn result_code(&self) -> u32 {
        self.result_code
    }

    /// the matched DN, empty if none
    pub fn matched_dn(&self) -> &str {
        &self.matched_dn
    }

    /// the diagnostic message, empty if none
    pub fn diagnostic_message(&self) -> &str {
        &self.diagnostic_message
    }

    /// referral URLs
    pub fn referrals(&self) -> &[String] {
        &self.referrals
    }

    /// BER element for the response
    fn to_tag(&self) -> Tag {
        fn octets(s: &str) -> Tag {
            Tag::OctetString(OctetString {
                inner: s.as_bytes().to_vec(),
                ..Default::default()
            })
        }
        let mut result = vec![
            Tag::Enumerated(Enumerated {
                inner: i64::from(self.result_code),
                ..Default::default()
            }),
            octets(&self.matched_dn),
            octets(&self.diagnostic_message),
        ];
        if !self.referrals.is_empty() {
            result.push(Tag::Sequence(Sequence {
                class: TagClass::Context,
                id: TAG_REFERRAL,
                inner: self.referrals.iter().map(|r| octets(r)).collect(),
            }));
        }
        Tag::Sequence(Sequence {
            inner: vec![Tag::Sequence(Sequence {
                class: TagClass::Application,
                id: self.op_type.application_tag(),
                inner: result,
            })],
            ..Default::default()
        })
    }
}

/// decode one response element, controls attached to the response are
/// skipped
fn decode_response(tag: StructureTag) -> Result<MultiUpdateOperationResult, ExtendedError> {
    let op = constructed(NAME, tag)?
        .into_iter()
        .next()
        .ok_or_else(|| ExtendedError::malformed(NAME, "empty response element"))?;
    let op_type = match op.class {
        TagClass::Application => MultiUpdateOperationType::from_application_tag(op.id),
        _ => None,
    }
    .ok_or_else(|| {
        ExtendedError::malformed(NAME, format!("unexpected response protocol op {}", op.id))
    })?;
    let mut elements = constructed(NAME, op)?.into_iter();
    let (Some(code), Some(matched_dn), Some(diagnostic_message)) =
        (elements.next(), elements.next(), elements.next())
    else {
        return Err(ExtendedError::malformed(NAME, "incomplete LDAP result"));
    };
    let result_code = u32::try_from(primitive_enumerated(NAME, code)?)
        .map_err(|e| ExtendedError::malformed(NAME, format!("invalid result code: {}", e)))?;
    let matched_dn = primitive_string(NAME, matched_dn)?;
    let diagnostic_message = primitive_string(NAME, diagnostic_message)?;
    let mut referrals = vec![];
    for element in elements {
        if matches!(element.class, TagClass::Context) && element.id == TAG_REFERRAL {
            referrals = constructed(NAME, element)?
                .into_iter()
                .map(|r| primitive_string(NAME, r))
                .collect::<Result<Vec<_>, _>>()?;
        }
    }
    Ok(MultiUpdateOperationResult {
        op_type,
        result_code,
        matched_dn,
        diagnostic_message,
        referrals,
    })
}

/// the value of a multi-update extended result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiUpdateResult {
    /// which of the changes were applied
    changes_applied: ChangesApplied,
    /// one result per processed operation, in request order
    results: Vec<MultiUpdateOperationResult>,
}

impl MultiUpdateResult {
    /// a result value
    pub fn new(changes_applied: ChangesApplied, results: Vec<MultiUpdateOperationResult>) -> Self {
        Self {
            changes_applied,
            results,
        }
    }

    /// which of the changes were applied
    pub fn changes_applied(&self) -> ChangesApplied {
        self.changes_applied
    }

    /// one result per processed operation, in request order
    pub fn results(&self) -> &[MultiUpdateOperationResult] {
        &self.results
    }
}

impl ExtendedValue for MultiUpdateResult {
    const OID: &'static str = MULTI_UPDATE_RESULT_OID;
    const NAME: &'static str = NAME;

    fn encode_value(&self) -> Result<Vec<u8>, ExtendedError> {
        Ok(encode_ber(Tag::Sequence(Sequence {
            inner: vec![
                Tag::Enumerated(Enumerated {
                    inner: self.changes_applied.value(),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner: self.results.iter().map(|r| r.to_tag()).collect(),
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }))?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, ExtendedError> {
        let mut elements = constructed(NAME, parse_ber(NAME, value)?)?.into_iter();
        let (Some(changes), Some(responses), None) =
            (elements.next(), elements.next(), elements.next())
        else {
            return Err(ExtendedError::malformed(
                NAME,
                "expected the changes applied and the responses",
            ));
        };
        let changes = primitive_enumerated(NAME, changes)?;
        let changes_applied = ChangesApplied::from_value(changes).ok_or_else(|| {
            ExtendedError::malformed(NAME, format!("unknown changes applied value {}", changes))
        })?;
        let results = constructed(NAME, responses)?
            .into_iter()
            .map(decode_response)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            changes_applied,
            results,
        })
    }
}
