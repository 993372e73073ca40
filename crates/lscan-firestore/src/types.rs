//! Firestore REST API types and value encoding for the video record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lscan_models::{AnalysisOutcome, ClassLabel, Detection, Keyframe, Summary, Verdict, VideoStatus};

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }
}

/// Conversion into the Firestore value encoding.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for i32 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue((*self as i64).to_string())
    }
}

impl ToFirestoreValue for u32 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue((*self as i64).to_string())
    }
}

impl ToFirestoreValue for f64 {
    fn to_firestore_value(&self) -> Value {
        Value::DoubleValue(*self)
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Vec<T> {
    fn to_firestore_value(&self) -> Value {
        Value::ArrayValue(ArrayValue {
            values: Some(self.iter().map(|v| v.to_firestore_value()).collect()),
        })
    }
}

// ============================================================================
// Model encodings
// ============================================================================

impl ToFirestoreValue for VideoStatus {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.as_str().to_string())
    }
}

impl ToFirestoreValue for Verdict {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.as_str().to_string())
    }
}

impl ToFirestoreValue for ClassLabel {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.as_str().to_string())
    }
}

impl ToFirestoreValue for Detection {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("x1".to_string(), self.x1.to_firestore_value());
        fields.insert("y1".to_string(), self.y1.to_firestore_value());
        fields.insert("x2".to_string(), self.x2.to_firestore_value());
        fields.insert("y2".to_string(), self.y2.to_firestore_value());
        fields.insert("label".to_string(), self.label.to_firestore_value());
        fields.insert("confidence".to_string(), self.confidence.to_firestore_value());
        Value::MapValue(MapValue { fields: Some(fields) })
    }
}

impl ToFirestoreValue for Keyframe {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("time".to_string(), self.time.to_firestore_value());
        fields.insert("status".to_string(), self.status.to_firestore_value());
        fields.insert(
            "frame_image_url".to_string(),
            self.frame_image_url.to_firestore_value(),
        );
        fields.insert("detections".to_string(), self.detections.to_firestore_value());
        Value::MapValue(MapValue { fields: Some(fields) })
    }
}

impl ToFirestoreValue for Summary {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("total_count".to_string(), self.total_count.to_firestore_value());
        fields.insert("normal_count".to_string(), self.normal_count.to_firestore_value());
        fields.insert(
            "abnormal_count".to_string(),
            self.abnormal_count.to_firestore_value(),
        );
        Value::MapValue(MapValue { fields: Some(fields) })
    }
}

impl ToFirestoreValue for AnalysisOutcome {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("final".to_string(), self.final_label.to_firestore_value());
        fields.insert("summary".to_string(), self.summary.to_firestore_value());
        fields.insert("keyframes".to_string(), self.keyframes.to_firestore_value());
        Value::MapValue(MapValue { fields: Some(fields) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_encode_as_strings() {
        let v = 7u32.to_firestore_value();
        assert!(matches!(v, Value::IntegerValue(s) if s == "7"));
    }

    #[test]
    fn test_summary_encodes_as_map() {
        let summary = Summary::from_counts(5, 2);
        let Value::MapValue(map) = summary.to_firestore_value() else {
            panic!("expected map");
        };
        let fields = map.fields.unwrap();
        assert!(matches!(&fields["total_count"], Value::IntegerValue(s) if s == "5"));
        assert!(matches!(&fields["normal_count"], Value::IntegerValue(s) if s == "3"));
    }

    #[test]
    fn test_keyframe_encodes_nested_detections() {
        let kf = Keyframe::new(
            12.5,
            "/static/keyframes/v_kf1_t12.jpg",
            vec![Detection {
                x1: 1,
                y1: 2,
                x2: 3,
                y2: 4,
                label: ClassLabel::Abnormal,
                confidence: 0.75,
            }],
        );

        let Value::MapValue(map) = kf.to_firestore_value() else {
            panic!("expected map");
        };
        let fields = map.fields.unwrap();
        assert!(matches!(&fields["status"], Value::StringValue(s) if s == "abnormal"));

        let Value::ArrayValue(dets) = &fields["detections"] else {
            panic!("expected array");
        };
        assert_eq!(dets.values.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_value_wire_format() {
        let json = serde_json::to_value(Value::StringValue("done".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "stringValue": "done" }));

        let json = serde_json::to_value(3u32.to_firestore_value()).unwrap();
        assert_eq!(json, serde_json::json!({ "integerValue": "3" }));
    }
}
