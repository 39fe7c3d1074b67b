use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FrameError, Result};
use crate::kind::MessageKind;

/// One newline-delimited JSON message.
///
/// `msg_type` is kept as a string so unknown inbound tags still decode.
/// Top-level keys other than `type` and `data` live in `fields`; the
/// `player_action`, `execute` and `broadcast` shapes rely on them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Create an envelope with no data and no extra fields.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            msg_type: kind.as_str().to_string(),
            fields: Map::new(),
            data: None,
        }
    }

    /// Create an envelope carrying a serialized `data` payload.
    pub fn with_data<T: Serialize>(kind: MessageKind, data: &T) -> Result<Self> {
        let data = serde_json::to_value(data).map_err(FrameError::Encode)?;
        Ok(Self {
            data: Some(data),
            ..Self::new(kind)
        })
    }

    /// Add a top-level field.
    ///
    /// `type` and `data` are reserved; set them through [`Envelope::new`]
    /// and [`Envelope::data_value`] instead.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        debug_assert!(
            !is_reserved(&key),
            "envelope field {key:?} collides with a reserved key"
        );
        self.fields.insert(key, value.into());
        self
    }

    /// Replace the `data` payload with a raw JSON value.
    pub fn data_value(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The known kind of this envelope, if the tag is recognized.
    pub fn kind(&self) -> Option<MessageKind> {
        self.msg_type.parse().ok()
    }

    /// Deserialize the `data` payload. A missing payload decodes as `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(FrameError::InvalidJson)
    }

    /// Borrow a top-level string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Build an envelope from a parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(FrameError::NotAnObject);
        };

        let msg_type = match fields.remove("type") {
            Some(Value::String(tag)) => tag,
            _ => return Err(FrameError::MissingType),
        };

        let data = match fields.remove("data") {
            None | Some(Value::Null) => None,
            Some(other) => Some(other),
        };

        Ok(Self {
            msg_type,
            fields,
            data,
        })
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(key, "type" | "data")
}
