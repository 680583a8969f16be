use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSnippet {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AltoContext {
    pub before: Vec<WordSnippet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<WordSnippet>,
    pub after: Vec<WordSnippet>,
}

/// One character-level discrepancy between casebody and ALTO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub element_id: String,
    pub description: String,
    pub alto: AltoContext,
    pub casemets: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub case_id: String,
    pub status: Status,
    pub results: String,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    Layout,
    NonCasebody,
    Casebody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseAction {
    ChangeCasebodyTag,
    ChangeTag,
    ChangeContent,
    AddAttribute,
    UpdateAttribute,
    DeleteAttribute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEdit {
    pub action: CaseAction,
    #[serde(rename = "type")]
    pub scope: EditScope,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltoAction {
    AddAltoAttrib,
    ChangeAltoAttrib,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltoEdit {
    pub action: AltoAction,
    /// `ID` of the ALTO element being edited (a `String` word or a `StructureTag`).
    pub element_id: String,
    pub attribute: String,
    pub old: Option<String>,
    pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub case_xml_changed: Vec<CaseEdit>,
    /// ALTO file id -> edits, in the order they were found.
    pub alto_xml_changed: BTreeMap<String, Vec<AltoEdit>>,
}

impl MigrationRecord {
    pub fn is_empty(&self) -> bool {
        self.case_xml_changed.is_empty() && self.alto_xml_changed.is_empty()
    }
}

/// Edit propagation either yields a migration or an `{"error": ...}` dict for edits it
/// cannot translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropagateOutcome {
    Migration(MigrationRecord),
    Unsupported { error: String },
}

impl PropagateOutcome {
    pub fn unsupported(message: &str) -> Self {
        PropagateOutcome::Unsupported {
            error: message.to_string(),
        }
    }
}
