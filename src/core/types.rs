use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::errors::{AppError, AppResult};

/// Canonical record for one document, keyed by schema entity name.
pub type CanonicalTree = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrToken {
    pub word: String,
    #[serde(alias = "data_sheet_section")]
    pub section: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl OcrToken {
    pub fn rect(&self) -> Rect {
        Rect {
            x_min: self.x_min,
            x_max: self.x_max,
            y_min: self.y_min,
            y_max: self.y_max,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let coords = [self.x_min, self.x_max, self.y_min, self.y_max];
        if coords.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(AppError::InvalidInput(format!(
                "ocr token '{}' has a negative or non-finite coordinate",
                self.word
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Pixel box that is either fully populated or entirely null.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox(Option<Rect>);

#[derive(Serialize, Deserialize)]
struct RawBox {
    x_min: Option<f64>,
    x_max: Option<f64>,
    y_min: Option<f64>,
    y_max: Option<f64>,
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox(None);

    pub fn new(rect: Rect) -> Self {
        Self(Some(rect))
    }

    pub fn rect(&self) -> Option<&Rect> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Rect> for BoundingBox {
    fn from(value: Rect) -> Self {
        Self::new(value)
    }
}

impl Serialize for BoundingBox {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = match self.0 {
            Some(rect) => RawBox {
                x_min: Some(rect.x_min),
                x_max: Some(rect.x_max),
                y_min: Some(rect.y_min),
                y_max: Some(rect.y_max),
            },
            None => RawBox {
                x_min: None,
                x_max: None,
                y_min: None,
                y_max: None,
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawBox::deserialize(deserializer)?;
        match (raw.x_min, raw.x_max, raw.y_min, raw.y_max) {
            (Some(x_min), Some(x_max), Some(y_min), Some(y_max)) => Ok(Self::new(Rect {
                x_min,
                x_max,
                y_min,
                y_max,
            })),
            (None, None, None, None) => Ok(Self::EMPTY),
            _ => Err(D::Error::custom("partial bounding box")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyEntry {
    pub section: String,
    pub property_name: String,
    #[serde(default)]
    pub property_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name_bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_value_bbox: Option<BoundingBox>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertyEntry {
    pub fn new(section: &str, property_name: &str, property_value: Value) -> Self {
        Self {
            section: section.to_string(),
            property_name: property_name.to_string(),
            property_value,
            property_name_bbox: None,
            property_value_bbox: None,
            extra: Map::new(),
        }
    }

    /// Text form of the value used for OCR matching.
    pub fn value_text(&self) -> String {
        match &self.property_value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub table_name: String,
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub source_uuid: String,
    pub destination_uuid: String,
    pub relationship_type: String,
}

impl Relationship {
    pub fn new(source: &str, destination: &str, relationship_type: impl Into<String>) -> Self {
        Self {
            source_uuid: source.to_string(),
            destination_uuid: destination.to_string(),
            relationship_type: relationship_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Exact,
    Alias,
    Classifier,
    ClassifierWithContext,
    Synthesized,
    Fallback,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Classifier => "classifier",
            Self::ClassifierWithContext => "classifier_with_context",
            Self::Synthesized => "synthesized",
            Self::Fallback => "fallback",
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, Self::Synthesized | Self::Fallback)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    pub raw: String,
    pub entity: String,
    pub property: String,
    pub matched: bool,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub table_name: String,
    pub entity: String,
    pub entity_source: ResolutionSource,
    pub rows_written: usize,
    pub resolutions: Vec<ResolutionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocumentInput {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub ocr_tokens: Vec<OcrToken>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    pub document_id: Option<String>,
    pub properties: Vec<PropertyEntry>,
    pub canonical: CanonicalTree,
    pub relationships: Vec<Relationship>,
    pub tables: Vec<TableReport>,
    pub processed_at: DateTime<Utc>,
}
