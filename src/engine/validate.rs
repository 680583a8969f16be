use serde_json::json;

use crate::aligner::{align_element, alignable_elements, AlignState};
use crate::alto::AltoSet;
use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::index::{case_id, find_casebody, CasebodyRoot, ElementIndex};
use crate::logging::{log_event, LogLevel};
use crate::types::{Status, ValidationReport};
use crate::xml::XmlDocument;

pub fn validate_case(case_xml: &str, alto: &AltoSet, config: &ReconcileConfig) -> Result<ValidationReport, ReconcileError> {
    let doc = XmlDocument::parse(case_xml)?;
    validate_document(&doc, alto, config)
}

/// Aligns every casebody element against ALTO without changing anything.
pub fn validate_document(
    doc: &XmlDocument,
    alto: &AltoSet,
    config: &ReconcileConfig,
) -> Result<ValidationReport, ReconcileError> {
    let case_id = case_id(doc);
    let casebody = match find_casebody(doc) {
        CasebodyRoot::Present(node) => node,
        CasebodyRoot::Duplicative(_) => {
            return Ok(ValidationReport {
                case_id,
                status: Status::Ok,
                results: "duplicative".to_string(),
                problems: Vec::new(),
            });
        }
        CasebodyRoot::Missing => {
            return Err(ReconcileError::Xml(format!("case {case_id} has no casebody")));
        }
    };

    let index = ElementIndex::new(doc, alto);
    let mut state = AlignState::default();
    let mut problems = Vec::new();

    for node in alignable_elements(doc, casebody) {
        let (next, aligned) = align_element(doc, &index, node, state, config)?;
        state = next;
        problems.extend(aligned.problems(config.context_chars));

        if aligned.alignment.aborted {
            let results = format!(
                "{} consecutive bad words; aborted at element {}",
                config.consecutive_bad_word_threshold, aligned.element_id
            );
            log_event(
                LogLevel::Error,
                "validation aborted",
                Some(json!({ "case_id": case_id, "element_id": aligned.element_id, "problems": problems.len() })),
            );
            return Ok(ValidationReport {
                case_id,
                status: Status::Error,
                results,
                problems,
            });
        }
    }

    let (status, results) = if problems.is_empty() {
        (Status::Ok, "clean".to_string())
    } else {
        (Status::Warning, format!("{} problems found", problems.len()))
    };
    log_event(
        if problems.is_empty() { LogLevel::Info } else { LogLevel::Warn },
        "validation finished",
        Some(json!({ "case_id": case_id, "results": results })),
    );

    Ok(ValidationReport {
        case_id,
        status,
        results,
        problems,
    })
}
