mod common;

use alto_reconcile::alto::AltoSet;
use alto_reconcile::config::ReconcileConfig;
use alto_reconcile::engine::validate_case;
use alto_reconcile::error::ReconcileError;
use alto_reconcile::types::Status;
use common::*;

fn one_page(element_id: &str, words: &[&str]) -> AltoSet {
    alto_set(&[(17, alto_page(17, &[block(element_id, plain(words))]))])
}

fn with_threshold(threshold: usize) -> ReconcileConfig {
    ReconcileConfig {
        consecutive_bad_word_threshold: threshold,
        ..ReconcileConfig::default()
    }
}

#[test]
fn matching_text_is_clean() {
    let report = validate_case(
        &headnotes("Foo bar"),
        &one_page("b17-6", &["Foo", "bar"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    assert_eq!(report.case_id, CASE_ID);
    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.results, "clean");
    assert!(report.problems.is_empty());
}

#[test]
fn single_bad_word_is_a_warning_with_context() {
    let report = validate_case(
        &headnotes("Foo bar"),
        &one_page("b17-6", &["Foo", "baX"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    assert_eq!(report.status, Status::Warning);
    assert_eq!(report.results, "1 problems found");

    let problem = &report.problems[0];
    assert_eq!(problem.element_id, "b17-6");
    assert_eq!(problem.description, "Unspecified Mismatch");
    let current = problem.alto.current.as_ref().unwrap();
    assert_eq!(current.content, "baX");
    assert_eq!(current.id, word_id(17, "b17-6", 2));
    assert_eq!(problem.alto.before[0].content, "Foo");
    assert!(problem.casemets.contains("bar"));
}

#[test]
fn reaching_the_bad_word_threshold_aborts() {
    let case = headnotes("Foo bar");
    let alto = one_page("b17-6", &["FoX", "baX"]);

    let report = validate_case(&case, &alto, &with_threshold(2)).unwrap();
    assert_eq!(report.status, Status::Error);
    assert_eq!(report.results, "2 consecutive bad words; aborted at element b17-6");

    let report = validate_case(&case, &alto, &with_threshold(3)).unwrap();
    assert_eq!(report.status, Status::Warning);
    assert_eq!(report.problems.len(), 2);
}

#[test]
fn bad_word_run_continues_into_the_next_element() {
    let case = case_xml(&[
        CaseElement::new("p", "b17-6", 17, "Foo bar"),
        CaseElement::new("p", "b17-7", 17, "Baz qux"),
    ]);
    let alto = alto_set(&[(
        17,
        alto_page(
            17,
            &[block("b17-6", plain(&["Foo", "baX"])), block("b17-7", plain(&["BaX", "qux"]))],
        ),
    )]);

    let report = validate_case(&case, &alto, &ReconcileConfig::default()).unwrap();
    assert_eq!(report.status, Status::Error);
    assert!(report.results.ends_with("aborted at element b17-7"));
}

#[test]
fn clean_word_resets_the_bad_word_run() {
    let case = case_xml(&[
        CaseElement::new("p", "b17-6", 17, "Foo bar"),
        CaseElement::new("p", "b17-7", 17, "Baz qux"),
    ]);
    let alto = alto_set(&[(
        17,
        alto_page(
            17,
            &[block("b17-6", plain(&["Foo", "baX"])), block("b17-7", plain(&["Baz", "quX"]))],
        ),
    )]);

    let report = validate_case(&case, &alto, &ReconcileConfig::default()).unwrap();
    assert_eq!(report.status, Status::Warning);
    assert_eq!(report.problems.len(), 2);
}

#[test]
fn soft_hyphen_matches_hyphen_or_nothing() {
    let case = headnotes("exam\u{AD}ple");

    let hyphenated = one_page("b17-6", &["exam-", "ple"]);
    let report = validate_case(&case, &hyphenated, &ReconcileConfig::default()).unwrap();
    assert_eq!(report.status, Status::Ok);

    let joined = one_page("b17-6", &["example"]);
    let report = validate_case(&case, &joined, &ReconcileConfig::default()).unwrap();
    assert_eq!(report.status, Status::Ok);
}

#[test]
fn inline_tags_do_not_break_alignment() {
    let case = headnotes("See<casebody:footnotemark>1</casebody:footnotemark> here");
    let report = validate_case(
        &case,
        &one_page("b17-6", &["See1", "here"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    assert_eq!(report.status, Status::Ok);
}

#[test]
fn noise_at_the_end_of_an_alto_word_is_named() {
    let report = validate_case(
        &headnotes("cat The"),
        &one_page("b17-6", &["cat.", "The"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    assert_eq!(report.problems.len(), 1);
    assert_eq!(
        report.problems[0].description,
        "extra char in alto - subsequent alto element"
    );
}

#[test]
fn leftover_casebody_text_is_reported() {
    let report = validate_case(
        &headnotes("Foo bar baz"),
        &one_page("b17-6", &["Foo", "bar"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    assert_eq!(report.status, Status::Warning);
    assert_eq!(
        report.problems[0].description,
        "Leftover chars in casebody element not found in ALTO"
    );
    assert!(report.problems[0].alto.current.is_none());
}

#[test]
fn duplicative_case_is_skipped() {
    let report = validate_case(&duplicative_case_xml(), &AltoSet::new(), &ReconcileConfig::default()).unwrap();
    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.results, "duplicative");
}

#[test]
fn missing_alto_page_is_a_linkage_error() {
    let err = validate_case(&headnotes("Foo bar"), &AltoSet::new(), &ReconcileConfig::default()).unwrap_err();
    assert!(matches!(err, ReconcileError::Linkage { .. }));
}

#[test]
fn pgmap_page_without_mets_area_is_a_linkage_error() {
    let case = case_xml(&[CaseElement::split("p", "b17-6", "99", &[17], "Foo bar")]);
    let err = validate_case(&case, &one_page("b17-6", &["Foo", "bar"]), &ReconcileConfig::default()).unwrap_err();
    assert!(matches!(err, ReconcileError::Linkage { ref element_id, .. } if element_id == "b17-6"));
}

#[test]
fn report_serializes_with_snake_case_status() {
    let report = validate_case(
        &headnotes("Foo bar"),
        &one_page("b17-6", &["Foo", "baX"]),
        &ReconcileConfig::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "warning");
    assert_eq!(json["problems"][0]["element_id"], "b17-6");
}
