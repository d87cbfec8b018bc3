//! Records exchanged with the Konfuzio server.
//!
//! The server owns all of these; the SDK only reads them for the duration of
//! a call. Fields the SDK does not interpret are kept in `extra` so callers
//! still get the full record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Role of a document in the project's dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DatasetStatus {
    None,
    Preparation,
    Training,
    Test,
    LowOcrQuality,
}

impl DatasetStatus {
    pub fn code(self) -> u8 {
        match self {
            DatasetStatus::None => 0,
            DatasetStatus::Preparation => 1,
            DatasetStatus::Training => 2,
            DatasetStatus::Test => 3,
            DatasetStatus::LowOcrQuality => 4,
        }
    }

    /// Training and test documents make up the dataset.
    pub fn is_dataset(self) -> bool {
        matches!(self, DatasetStatus::Training | DatasetStatus::Test)
    }
}

impl TryFrom<u8> for DatasetStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DatasetStatus::None),
            1 => Ok(DatasetStatus::Preparation),
            2 => Ok(DatasetStatus::Training),
            3 => Ok(DatasetStatus::Test),
            4 => Ok(DatasetStatus::LowOcrQuality),
            other => Err(format!("unknown dataset status {other}")),
        }
    }
}

impl From<DatasetStatus> for u8 {
    fn from(status: DatasetStatus) -> Self {
        status.code()
    }
}

/// Entry of the project's document listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: u64,
    /// `None` for a missing, null or unknown status code; such documents
    /// are never part of the dataset.
    #[serde(default, deserialize_with = "lenient_dataset_status")]
    pub dataset_status: Option<DatasetStatus>,
    #[serde(default)]
    pub data_file_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_dataset_status<'de, D>(deserializer: D) -> Result<Option<DatasetStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let code = Option::<i64>::deserialize(deserializer)?;
    Ok(code
        .and_then(|code| u8::try_from(code).ok())
        .and_then(|code| DatasetStatus::try_from(code).ok()))
}

/// A page of a document as listed in its details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub number: Option<u32>,
    /// Host-relative or absolute URL of the rendered page.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full record of one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetails {
    #[serde(default)]
    pub id: Option<u64>,
    /// `None` until OCR has finished.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub sections: Vec<Value>,
    #[serde(default)]
    pub hocr: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Label of an annotation, either by id or embedded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelRef {
    Id(u64),
    Label(Label),
}

impl LabelRef {
    pub fn id(&self) -> u64 {
        match self {
            LabelRef::Id(id) => *id,
            LabelRef::Label(label) => label.id,
        }
    }
}

/// Labeled span of document text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Missing for annotations proposed locally and not yet stored.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub start_offset: Option<u64>,
    #[serde(default)]
    pub end_offset: Option<u64>,
    #[serde(default)]
    pub label: Option<LabelRef>,
    #[serde(default)]
    pub revised: bool,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub section: Option<u64>,
    #[serde(default)]
    pub section_label_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for creating an annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub start_offset: u64,
    pub end_offset: u64,
    pub label: u64,
    pub accuracy: f64,
    #[serde(default)]
    pub revised: bool,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_label_id: Option<u64>,
}

impl NewAnnotation {
    pub fn new(start_offset: u64, end_offset: u64, label: u64, accuracy: f64) -> Self {
        Self {
            start_offset,
            end_offset,
            label,
            accuracy,
            revised: false,
            is_correct: false,
            section: None,
            section_label_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Template (called section label by the server) grouping labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Project record with its label and template definitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub section_labels: Vec<Template>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body returned by create endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedResource {
    pub id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
}
