use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys the extractor can emit, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Phone,
    Email,
    Date,
    Currency,
    Amount,
    Total,
}

impl FieldKey {
    pub const ALL: [FieldKey; 6] = [
        FieldKey::Phone,
        FieldKey::Email,
        FieldKey::Date,
        FieldKey::Currency,
        FieldKey::Amount,
        FieldKey::Total,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Phone => "phone",
            FieldKey::Email => "email",
            FieldKey::Date => "date",
            FieldKey::Currency => "currency",
            FieldKey::Amount => "amount",
            FieldKey::Total => "total",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate value with a confidence score (0.0–1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub key: FieldKey,
    #[serde(rename = "val")]
    pub value: Option<String>,
    pub confidence: f32,
    pub source_page: Option<u32>,
}

impl Field {
    pub fn new(key: FieldKey, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            key,
            value: Some(value.into()),
            confidence: confidence.clamp(0.0, 1.0),
            source_page: None,
        }
    }
}

/// Fields found in one document plus the OCR text they came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub fields: Vec<Field>,
}

impl Extraction {
    pub fn get(&self, key: FieldKey) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn value(&self, key: FieldKey) -> Option<&str> {
        self.get(key).and_then(|f| f.value.as_deref())
    }

    pub fn keys(&self) -> Vec<FieldKey> {
        self.fields.iter().map(|f| f.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_clamps_confidence() {
        let f = Field::new(FieldKey::Total, "1", 1.5);
        assert_eq!(f.confidence, 1.0);
        let f = Field::new(FieldKey::Total, "1", -0.1);
        assert_eq!(f.confidence, 0.0);
    }

    #[test]
    fn field_key_displays_wire_name() {
        assert_eq!(FieldKey::Total.to_string(), "total");
        assert_eq!(FieldKey::Phone.as_str(), "phone");
    }

    #[test]
    fn field_serializes_with_wire_names() {
        let f = Field::new(FieldKey::Currency, "USD", 0.75);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "currency", "val": "USD", "confidence": 0.75, "source_page": null})
        );
    }
}
