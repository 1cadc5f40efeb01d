//! the name with entryUUID request control, asks the server to name a new
//! entry after its generated entryUUID instead of the RDN given in the add
//! request

use serde_json::Value;

use crate::controls::{Control, ControlError};

/// the OID of the name with entryUUID request control
pub const NAME_WITH_ENTRY_UUID_OID: &str = "1.3.6.1.4.1.30221.2.5.44";

/// name used in errors and the JSON form
const NAME: &str = "Name with entryUUID Request Control";

/// replaces the RDN of an added entry with its entryUUID, the control has no
/// value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameWithEntryUuidRequest {
    /// the criticality of the control
    critical: bool,
}

impl NameWithEntryUuidRequest {
    /// a control with the given criticality
    pub fn new(critical: bool) -> Self {
        Self { critical }
    }
}

impl Control for NameWithEntryUuidRequest {
    const OID: &'static str = NAME_WITH_ENTRY_UUID_OID;
    const NAME: &'static str = NAME;

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn encode_value(&self) -> Result<Option<Vec<u8>>, ControlError> {
        Ok(None)
    }

    fn decode_value(critical: bool, value: Option<&[u8]>) -> Result<Self, ControlError> {
        match value {
            Some(_) => Err(ControlError::UnexpectedValue(NAME)),
            None => Ok(Self::new(critical)),
        }
    }

    fn value_json(&self) -> Option<Value> {
        None
    }

    fn decode_value_json(
        _critical: bool,
        _value: &Value,
        _strict: bool,
    ) -> Result<Self, ControlError> {
        Err(ControlError::UnexpectedValue(NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::json::JsonControl;
    use pretty_assertions::assert_eq;

    #[test]
    fn has_no_value() {
        let raw = NameWithEntryUuidRequest::new(true).to_raw().unwrap();
        assert_eq!(raw.ctype, NAME_WITH_ENTRY_UUID_OID);
        assert_eq!(raw.val, None);
        assert_eq!(
            NameWithEntryUuidRequest::decode(&raw).unwrap(),
            NameWithEntryUuidRequest::new(true)
        );
    }

    #[test]
    fn value_is_rejected() {
        assert!(matches!(
            NameWithEntryUuidRequest::decode_value(false, Some(&[0x04, 0x00][..])),
            Err(ControlError::UnexpectedValue(_))
        ));
        let json = JsonControl {
            oid: NAME_WITH_ENTRY_UUID_OID.to_string(),
            criticality: false,
            value_json: Some(serde_json::json!({})),
            ..Default::default()
        };
        assert!(json.to_control::<NameWithEntryUuidRequest>(true).is_err());
    }

    #[test]
    fn json_form_has_no_value_fields() {
        let json = JsonControl::from_control(&NameWithEntryUuidRequest::new(false)).unwrap();
        assert_eq!(
            json.to_value().unwrap(),
            serde_json::json!({
                "oid": "1.3.6.1.4.1.30221.2.5.44",
                "control-name": "Name with entryUUID Request Control",
                "criticality": false,
            })
        );
    }
}
