use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque mutation body sent to the remote store on replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationPayload(Value);

impl MutationPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn from_object(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    fn validate(value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Err("Mutation payload cannot be null".to_string());
        }
        Ok(())
    }
}

impl From<MutationPayload> for Value {
    fn from(payload: MutationPayload) -> Self {
        payload.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_payload_is_rejected() {
        assert!(MutationPayload::new(Value::Null).is_err());
        assert!(MutationPayload::from_json_str("null").is_err());
    }

    #[test]
    fn keeps_json_verbatim() {
        let payload = MutationPayload::from_json_str(r#"{"deployment_id":"d1","n":1}"#).unwrap();
        assert_eq!(payload.as_json(), &json!({"deployment_id": "d1", "n": 1}));
    }
}
