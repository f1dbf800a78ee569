//! Request and response types for the Galaxy REST API.
//!
//! Response types are deliberately lenient: Galaxy versions differ in which
//! fields they return, so everything beyond the id is optional and unknown
//! fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// States after which a dataset will not change without user action.
pub const TERMINAL_STATES: &[&str] = &["ok", "error", "discarded"];

/// The authenticated user, from `GET /api/whoami`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// Best human-readable identifier for log lines.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("anonymous")
    }
}

/// A history, from `POST /api/histories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `GET /api/histories/{id}/contents`, also used for the
/// `outputs` of a tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub file_ext: Option<String>,
    /// Newer Galaxy releases report the datatype here instead of `file_ext`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hid: Option<u64>,
}

impl HistoryItem {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("")
    }

    /// Datatype extension, whichever key the server used.
    pub fn ext(&self) -> &str {
        self.file_ext
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.extension.as_deref())
            .unwrap_or("")
    }

    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATES.contains(&self.state())
    }

    /// One-line summary: `id name ext state`.
    pub fn summary(&self) -> String {
        format!("{} {} {} {}", self.id, self.name(), self.ext(), self.state())
    }
}

/// One entry of `GET /api/tools?in_panel=false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A tool description from `GET /api/tools/{id}?io_details=true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_params")]
    pub inputs: Vec<ToolParam>,
}

/// A node in a tool's input tree. Repeats and sections nest further
/// parameters under `inputs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParam {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_params")]
    pub inputs: Vec<ToolParam>,
}

impl ToolParam {
    /// `name`, falling back to `id`, falling back to "".
    pub fn key(&self) -> &str {
        first_non_empty(self.name.as_deref(), self.id.as_deref())
    }

    /// `label`, falling back to `help`, falling back to "".
    pub fn description(&self) -> &str {
        first_non_empty(self.label.as_deref(), self.help.as_deref())
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    /// Test helper and builder for hand-made tool trees.
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<ToolParam>) -> Self {
        self.inputs = inputs;
        self
    }
}

fn first_non_empty<'a>(a: Option<&'a str>, b: Option<&'a str>) -> &'a str {
    a.filter(|s| !s.is_empty())
        .or(b.filter(|s| !s.is_empty()))
        .unwrap_or("")
}

/// `inputs` is only walked when it is a list; anything else (conditional
/// payloads, nulls) counts as no children.
fn lenient_params<'de, D>(deserializer: D) -> Result<Vec<ToolParam>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Where a dataset reference points: a single dataset or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Hda,
    Hdca,
}

/// `{"src": "hda", "id": "…"}` as Galaxy expects in tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRef {
    pub src: DataSource,
    pub id: String,
}

impl DataRef {
    pub fn hda(id: impl Into<String>) -> Self {
        Self {
            src: DataSource::Hda,
            id: id.into(),
        }
    }

    pub fn hdca(id: impl Into<String>) -> Self {
        Self {
            src: DataSource::Hdca,
            id: id.into(),
        }
    }
}

/// A single tool parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
    Data(DataRef),
    Text(String),
    Flag(bool),
}

impl From<DataRef> for ToolInput {
    fn from(r: DataRef) -> Self {
        ToolInput::Data(r)
    }
}

/// Flat `a|b|c` parameter path → value, as posted to `/api/tools`.
pub type ToolInputs = BTreeMap<String, ToolInput>;

/// One element of a dataset collection being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionElement {
    pub name: String,
    pub src: DataSource,
    pub id: String,
}

/// Description of a new dataset collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
    pub collection_type: String,
    pub elements: Vec<CollectionElement>,
}

impl CollectionDescription {
    /// A `list` collection of history datasets, keyed by element name.
    pub fn list<I>(name: impl Into<String>, elements: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            name: name.into(),
            collection_type: "list".to_string(),
            elements: elements
                .into_iter()
                .map(|(name, id)| CollectionElement {
                    name,
                    src: DataSource::Hda,
                    id,
                })
                .collect(),
        }
    }
}

/// A created collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A job spawned by a tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tool_id: Option<String>,
}

/// Response of `POST /api/tools` (tool runs and uploads alike).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRun {
    #[serde(default)]
    pub outputs: Vec<HistoryItem>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_ref_serialises_like_galaxy_expects() {
        let v = serde_json::to_value(ToolInput::from(DataRef::hda("abc"))).unwrap();
        assert_eq!(v, json!({"src": "hda", "id": "abc"}));
        let v = serde_json::to_value(ToolInput::from(DataRef::hdca("c1"))).unwrap();
        assert_eq!(v, json!({"src": "hdca", "id": "c1"}));
        assert_eq!(serde_json::to_value(ToolInput::Flag(true)).unwrap(), json!(true));
        assert_eq!(
            serde_json::to_value(ToolInput::Text("separate".into())).unwrap(),
            json!("separate")
        );
    }

    #[test]
    fn history_item_reads_either_extension_key() {
        let old: HistoryItem = serde_json::from_value(
            json!({"id": "1", "name": "out", "file_ext": "fasta", "state": "ok"}),
        )
        .unwrap();
        let new: HistoryItem = serde_json::from_value(
            json!({"id": "2", "name": null, "extension": "fa", "deleted": false, "hid": 4}),
        )
        .unwrap();
        assert_eq!(old.ext(), "fasta");
        assert!(old.is_terminal());
        assert_eq!(new.ext(), "fa");
        assert_eq!(new.name(), "");
        assert!(!new.is_terminal());
    }

    #[test]
    fn tool_info_ignores_non_list_inputs() {
        let info: ToolInfo = serde_json::from_value(json!({
            "id": "trinity",
            "inputs": [
                {"name": "pool", "type": "conditional", "inputs": {"weird": true}},
                {"name": "reads", "type": "data", "label": null, "help": "FASTQ reads"},
                {"name": "libs", "type": "repeat", "inputs": [
                    {"id": "left_input", "type": "data"}
                ]}
            ],
            "unknown_field": 1
        }))
        .unwrap();
        assert_eq!(info.inputs.len(), 3);
        assert!(info.inputs[0].inputs.is_empty());
        assert_eq!(info.inputs[1].description(), "FASTQ reads");
        assert_eq!(info.inputs[2].inputs[0].key(), "left_input");
    }

    #[test]
    fn user_display_name_falls_back() {
        let u = User {
            id: Some("u1".into()),
            email: Some("a@b.org".into()),
            username: None,
        };
        assert_eq!(u.display_name(), "a@b.org");
        assert_eq!(User::default().display_name(), "anonymous");
    }
}
