mod common;

use alto_reconcile::alto::AltoSet;
use alto_reconcile::error::ReconcileError;
use alto_reconcile::index::{case_id, find_casebody, CasebodyRoot, ElementIndex, MetsLinks};
use alto_reconcile::xml::XmlDocument;
use common::*;

#[test]
fn resolves_pgmap_to_linked_alto_page() {
    let doc = XmlDocument::parse(&headnotes("Foo bar")).unwrap();
    let alto = alto_set(&[(17, alto_page(17, &[block("b17-6", plain(&["Foo", "bar"]))]))]);
    let index = ElementIndex::new(&doc, &alto);

    let pages = index.resolve("b17-6", "17").unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_token, "17");
    assert_eq!(pages[0].alto.file_id, alto_file_id(17));
    assert_eq!(pages[0].word_count(), 2);
    assert_eq!(pages[0].label(), "17");
}

#[test]
fn resolves_element_split_across_pages_in_pgmap_order() {
    let case = case_xml(&[CaseElement::split("p", "b17-7", "17(2) 18(1)", &[17, 18], "Foo bar baz")]);
    let doc = XmlDocument::parse(&case).unwrap();
    let alto = alto_set(&[
        (17, alto_page(17, &[block("b17-7", plain(&["Foo", "bar"]))])),
        (18, alto_page(18, &[block("b17-7", plain(&["baz"]))])),
    ]);
    let index = ElementIndex::new(&doc, &alto);

    let pages = index.resolve("b17-7", "17(2) 18(1)").unwrap();
    let tokens: Vec<&str> = pages.iter().map(|p| p.page_token.as_str()).collect();
    assert_eq!(tokens, vec!["17", "18"]);
    assert_eq!(pages[0].expected_words, Some(2));
    assert_eq!(pages[1].word_count(), 1);
}

#[test]
fn unloaded_alto_file_is_a_linkage_error() {
    let doc = XmlDocument::parse(&headnotes("Foo bar")).unwrap();
    let alto = AltoSet::new();
    let index = ElementIndex::new(&doc, &alto);

    let err = index.resolve("b17-6", "17").unwrap_err();
    assert!(matches!(err, ReconcileError::Linkage { ref element_id, .. } if element_id == "b17-6"));
}

#[test]
fn page_without_mets_area_is_a_linkage_error() {
    let doc = XmlDocument::parse(&headnotes("Foo bar")).unwrap();
    let alto = alto_set(&[(17, alto_page(17, &[block("b17-6", plain(&["Foo", "bar"]))]))]);
    let index = ElementIndex::new(&doc, &alto);

    assert!(matches!(
        index.resolve("b17-6", "99"),
        Err(ReconcileError::Linkage { .. })
    ));
    assert!(matches!(index.resolve("b17-6", " "), Err(ReconcileError::Linkage { .. })));
}

#[test]
fn only_casebody_areas_open_mets_links() {
    let case = case_xml(&[CaseElement::split("p", "b17-7", "17(2) 18(1)", &[17, 18], "Foo bar baz")]);
    let doc = XmlDocument::parse(&case).unwrap();
    let links = MetsLinks::from_document(&doc);

    let blocks: Vec<&str> = links.get("b17-7").iter().map(|l| l.block_id.as_str()).collect();
    assert_eq!(blocks, vec![block_id(17, "b17-7"), block_id(18, "b17-7")]);
    assert!(links.get(&block_id(17, "b17-7")).is_empty());
    assert!(links.get(&block_id(18, "b17-7")).is_empty());

    // Without a casebody file group, areas listed inside a seq are never anchors.
    let unlabeled = XmlDocument::parse(&case.replace(r#"USE="casebody""#, r#"USE="text""#)).unwrap();
    let links = MetsLinks::from_document(&unlabeled);
    assert_eq!(links.get("b17-7").len(), 2);
    assert!(links.get(&block_id(17, "b17-7")).is_empty());
}

#[test]
fn lists_linked_pages_without_pgmap() {
    let doc = XmlDocument::parse(&headnotes("Foo bar")).unwrap();
    let alto = alto_set(&[(17, alto_page(17, &[block("b17-6", plain(&["Foo", "bar"]))]))]);
    let index = ElementIndex::new(&doc, &alto);

    let pages = index.linked_pages("b17-6").unwrap();
    assert_eq!(pages.len(), 1);
    assert!(index.linked_pages("b99-1").unwrap().is_empty());
}

#[test]
fn finds_casebody_and_case_id() {
    let doc = XmlDocument::parse(&headnotes("Foo bar")).unwrap();
    assert!(matches!(find_casebody(&doc), CasebodyRoot::Present(_)));
    assert_eq!(case_id(&doc), CASE_ID);

    let duplicative = XmlDocument::parse(&duplicative_case_xml()).unwrap();
    assert!(matches!(find_casebody(&duplicative), CasebodyRoot::Duplicative(_)));
}
