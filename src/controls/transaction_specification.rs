//! the transaction specification request control (RFC 5805), marks a request
//! as part of a transaction started with the start transaction extended
//! operation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controls::json::{check_unknown_fields, parse_value_json};
use crate::controls::{Control, ControlError};
use crate::error::UsageError;

/// the OID of the transaction specification request control
pub const TRANSACTION_SPECIFICATION_OID: &str = "1.3.6.1.1.21.2";

/// name used in errors and the JSON form
const NAME: &str = "Transaction Specification Request Control";

/// associates a request with a transaction, the control is always critical
///
/// the value is the transaction ID returned by the server as is, without any
/// BER wrapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSpecificationRequest {
    /// the transaction ID
    transaction_id: Vec<u8>,
}

/// the `value-json` form
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct JsonValue {
    /// the transaction ID as base64
    transaction_id_base64: String,
    /// anything else
    #[serde(flatten)]
    unknown_fields: Map<String, Value>,
}

impl TransactionSpecificationRequest {
    /// a control for the transaction with the given ID
    pub fn new(transaction_id: impl Into<Vec<u8>>) -> Result<Self, UsageError> {
        let transaction_id = transaction_id.into();
        if transaction_id.is_empty() {
            return Err(UsageError::MissingArgument("transaction_id".to_string()));
        }
        Ok(Self { transaction_id })
    }

    /// the transaction ID
    pub fn transaction_id(&self) -> &[u8] {
        &self.transaction_id
    }
}

impl Control for TransactionSpecificationRequest {
    const OID: &'static str = TRANSACTION_SPECIFICATION_OID;
    const NAME: &'static str = NAME;

    fn is_critical(&self) -> bool {
        true
    }

    fn encode_value(&self) -> Result<Option<Vec<u8>>, ControlError> {
        Ok(Some(self.transaction_id.clone()))
    }

    fn decode_value(_critical: bool, value: Option<&[u8]>) -> Result<Self, ControlError> {
        let value = value.ok_or(ControlError::MissingValue(NAME))?;
        Self::new(value).map_err(|_| ControlError::malformed(NAME, "empty transaction ID"))
    }

    fn value_json(&self) -> Option<Value> {
        use base64::Engine;
        serde_json::to_value(JsonValue {
            transaction_id_base64: base64::engine::general_purpose::STANDARD
                .encode(&self.transaction_id),
            unknown_fields: Map::new(),
        })
        .ok()
    }

    fn decode_value_json(_critical: bool, value: &Value, strict: bool) -> Result<Self, ControlError> {
        use base64::Engine;
        let parsed: JsonValue = parse_value_json(value)?;
        check_unknown_fields(NAME, &parsed.unknown_fields, strict)?;
        let transaction_id =
            base64::engine::general_purpose::STANDARD.decode(parsed.transaction_id_base64)?;
        Self::new(transaction_id).map_err(|e| ControlError::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::json::JsonControl;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_is_the_raw_transaction_id() {
        let control = TransactionSpecificationRequest::new(b"txn-0001".to_vec()).unwrap();
        let raw = control.to_raw().unwrap();
        assert!(raw.crit);
        assert_eq!(raw.val.as_deref(), Some(&b"txn-0001"[..]));
        assert_eq!(TransactionSpecificationRequest::decode(&raw).unwrap(), control);
    }

    #[test]
    fn criticality_is_forced() {
        let mut raw = TransactionSpecificationRequest::new(vec![1, 2, 3])
            .unwrap()
            .to_raw()
            .unwrap();
        raw.crit = false;
        let decoded = TransactionSpecificationRequest::decode(&raw).unwrap();
        assert!(decoded.is_critical());
    }

    #[test]
    fn missing_or_empty_id_is_rejected() {
        assert!(TransactionSpecificationRequest::new(Vec::new()).is_err());
        assert!(matches!(
            TransactionSpecificationRequest::decode_value(true, None),
            Err(ControlError::MissingValue(_))
        ));
        assert!(matches!(
            TransactionSpecificationRequest::decode_value(true, Some(&[][..])),
            Err(ControlError::MalformedValue { .. })
        ));
    }

    #[test]
    fn json_round_trip() {
        let control = TransactionSpecificationRequest::new(vec![0xde, 0xad]).unwrap();
        let json = JsonControl::from_control(&control).unwrap();
        assert_eq!(
            json.value_json,
            Some(serde_json::json!({ "transaction-id-base64": "3q0=" }))
        );
        assert_eq!(
            json.to_control::<TransactionSpecificationRequest>(true)
                .unwrap(),
            control
        );
    }
}
