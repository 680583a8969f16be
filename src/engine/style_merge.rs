use ego_tree::NodeId;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

use crate::aligner::strategy::fold;
use crate::aligner::{align_element, alignable_elements, AlignState, AlignedElement, CharOrigin};
use crate::alto::{AltoSet, StyleFlags};
use crate::config::ReconcileConfig;
use crate::diff::{opcodes, OpTag};
use crate::error::ReconcileError;
use crate::index::{case_id, find_casebody, CasebodyRoot, ElementIndex};
use crate::logging::{log_event, LogLevel};
use crate::xml::{Element, Namespace, XmlDocument, XmlNode};

static STYLE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<(?:[\w-]+:)?page-number(?:\s[^>]*)?>[^<]*</(?:[\w-]+:)?page-number>|</?(?:[\w-]+:)?(?:strong|em)(?:\s[^>]*)?/?>",
    )
    .unwrap()
});

/// Removes style and page-marker tags. Page markers go with their generated text.
pub fn strip_style_tags(xml: &str) -> String {
    STYLE_TAG_RE.replace_all(xml, "").into_owned()
}

/// Tags for a style, outermost first. Italics always nest innermost.
pub fn style_tags(flags: StyleFlags) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if flags.bold {
        tags.push("strong");
    }
    if flags.italic {
        tags.push("em");
    }
    tags
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(StyleFlags, String),
    PageMarker(String),
}

/// Replacement content for one text node.
#[derive(Debug, Clone)]
struct NodePlan {
    text_node: NodeId,
    prefix: String,
    ns: Namespace,
    pieces: Vec<Piece>,
}

/// Copies ALTO bold/italic runs and page breaks into the casebody as inline tags and
/// returns the new case XML.
pub fn merge_styles(case_xml: &str, alto: &AltoSet, config: &ReconcileConfig) -> Result<String, ReconcileError> {
    let stripped = strip_style_tags(case_xml);
    let mut doc = XmlDocument::parse(&stripped)?;
    let casebody = match find_casebody(&doc) {
        CasebodyRoot::Present(node) => node,
        CasebodyRoot::Duplicative(_) => return Err(ReconcileError::DuplicativeCase(case_id(&doc))),
        CasebodyRoot::Missing => {
            return Err(ReconcileError::Xml(format!("case {} has no casebody", case_id(&doc))));
        }
    };
    let before = doc.to_xml();

    // Thresholds are a validation policy; merging walks every element.
    let walk_config = ReconcileConfig {
        consecutive_bad_word_threshold: usize::MAX,
        ..config.clone()
    };

    let mut plans = Vec::new();
    let mut patched = 0;
    {
        let index = ElementIndex::new(&doc, alto);
        for node in alignable_elements(&doc, casebody) {
            let (_, aligned) = align_element(&doc, &index, node, AlignState::default(), &walk_config)?;
            let assignment = if aligned.alignment.is_clean() {
                aligned.alignment.char_words.clone()
            } else if config.strict {
                let description = aligned
                    .alignment
                    .mismatches
                    .first()
                    .map(|m| {
                        format!(
                            "{} near \"{}\"",
                            m.kind.description(),
                            aligned.text.snippet(m.pos, config.context_chars)
                        )
                    })
                    .unwrap_or_default();
                return Err(ReconcileError::Mismatch {
                    element_id: aligned.element_id.clone(),
                    description,
                });
            } else {
                // No confidence cutoff here: badly garbled OCR can still be mis-styled.
                tracing::warn!(
                    element_id = %aligned.element_id,
                    mismatches = aligned.alignment.mismatches.len(),
                    "patching style alignment with sequence diff"
                );
                patched += 1;
                diff_assignment(&aligned)
            };
            plans.extend(plan_element(&doc, &aligned, &assignment));
        }
    }

    for plan in &plans {
        apply_plan(&mut doc, plan);
    }

    let merged = doc.to_xml();
    check_integrity(&before, &merged)?;

    log_event(
        LogLevel::Info,
        "style merge finished",
        Some(json!({ "case_id": case_id(&doc), "rewritten_text_nodes": plans.len(), "patched_elements": patched })),
    );
    Ok(merged)
}

/// The merged document must strip back to exactly the document it started from.
fn check_integrity(before: &str, merged: &str) -> Result<(), ReconcileError> {
    let restripped = strip_style_tags(merged);
    if restripped == before {
        return Ok(());
    }
    Err(ReconcileError::IntegrityCheck {
        diff: line_diff(before, &restripped),
    })
}

/// Word assignment for every casebody char derived from an edit script between the
/// ALTO text and the casebody text.
fn diff_assignment(aligned: &AlignedElement) -> Vec<Option<usize>> {
    let (alto_chars, owners) = aligned.alto_chars();
    let alto_folded: Vec<char> = alto_chars.iter().map(|c| fold(*c)).collect();

    let positions: Vec<usize> = (0..aligned.text.len())
        .filter(|&i| {
            matches!(aligned.text.origins[i], CharOrigin::Text { .. }) && !aligned.text.chars[i].is_whitespace()
        })
        .collect();
    let case_folded: Vec<char> = positions
        .iter()
        .map(|&i| fold(aligned.text.chars[i]))
        .collect();

    let mut assignment = vec![None; aligned.text.len()];
    let mut last = None;
    for op in opcodes(&alto_folded, &case_folded) {
        match op.tag {
            OpTag::Equal | OpTag::Replace => {
                let a_len = op.a_end - op.a_start;
                let b_len = op.b_end - op.b_start;
                for t in 0..b_len {
                    let owner = owners[op.a_start + t * a_len / b_len];
                    assignment[positions[op.b_start + t]] = Some(owner);
                    last = Some(owner);
                }
            }
            OpTag::Insert => {
                for t in op.b_start..op.b_end {
                    assignment[positions[t]] = last;
                }
            }
            OpTag::Delete => {}
        }
    }

    // Insertions at the very start take the first word that follows them.
    if let Some(first) = positions.iter().find_map(|&i| assignment[i]) {
        for &i in &positions {
            if assignment[i].is_some() {
                break;
            }
            assignment[i] = Some(first);
        }
    }
    assignment
}

fn plan_element(doc: &XmlDocument, aligned: &AlignedElement, assignment: &[Option<usize>]) -> Vec<NodePlan> {
    let text = &aligned.text;
    let flags_of = |word: usize| {
        let w = &aligned.words[word];
        aligned.pages[w.page].alto.word_flags(w.block, w.word)
    };

    let mut flags: Vec<StyleFlags> = assignment
        .iter()
        .map(|a| a.map(flags_of).unwrap_or_default())
        .collect();

    // Whitespace between two identically styled chars joins their run.
    let significant: Vec<usize> = (0..text.len())
        .filter(|&i| matches!(text.origins[i], CharOrigin::Text { .. }) && !text.chars[i].is_whitespace())
        .collect();
    for pair in significant.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if flags[left] == flags[right] && !flags[left].is_plain() {
            for i in left + 1..right {
                if text.chars[i].is_whitespace() {
                    flags[i] = flags[left];
                }
            }
        }
    }

    let mut markers: Vec<Option<String>> = vec![None; text.len()];
    let mut last_page = None;
    for (i, word) in assignment.iter().enumerate() {
        let Some(word) = word else { continue };
        let page = aligned.words[*word].page;
        if last_page.is_some_and(|p| p != page) {
            markers[i] = Some(aligned.pages[page].label().to_string());
        }
        last_page = Some(page);
    }

    let (prefix, ns) = match doc.element(aligned.node) {
        Some(el) => (
            el.name.rfind(':').map(|idx| el.name[..=idx].to_string()).unwrap_or_default(),
            el.ns,
        ),
        None => (String::new(), Namespace::Casebody),
    };

    let mut plans: Vec<NodePlan> = Vec::new();
    for i in 0..text.len() {
        let CharOrigin::Text { node, .. } = text.origins[i] else {
            continue;
        };
        if plans.last().map(|p| p.text_node) != Some(node) {
            plans.push(NodePlan {
                text_node: node,
                prefix: prefix.clone(),
                ns,
                pieces: Vec::new(),
            });
        }
        let Some(plan) = plans.last_mut() else { continue };
        if let Some(label) = markers[i].take() {
            plan.pieces.push(Piece::PageMarker(label));
        }
        match plan.pieces.last_mut() {
            Some(Piece::Text(run_flags, run)) if *run_flags == flags[i] => run.push(text.chars[i]),
            _ => plan.pieces.push(Piece::Text(flags[i], text.chars[i].to_string())),
        }
    }

    plans
        .into_iter()
        .filter(|plan| {
            plan.pieces
                .iter()
                .any(|p| !matches!(p, Piece::Text(f, _) if f.is_plain()))
        })
        .collect()
}

fn page_marker(prefix: &str, ns: Namespace, label: &str) -> Element {
    Element::new(&format!("{prefix}page-number"), ns)
        .with_attr("id", &format!("p{label}"))
        .with_attr("href", &format!("#p{label}"))
        .with_attr("label", label)
        .with_attr("citation-index", "1")
}

fn insert_before(doc: &mut XmlDocument, anchor: NodeId, value: XmlNode) -> Option<NodeId> {
    let mut node = doc.tree.get_mut(anchor)?;
    Some(node.insert_before(value).id())
}

fn append(doc: &mut XmlDocument, parent: NodeId, value: XmlNode) -> Option<NodeId> {
    let mut node = doc.tree.get_mut(parent)?;
    Some(node.append(value).id())
}

fn apply_plan(doc: &mut XmlDocument, plan: &NodePlan) {
    let anchor = plan.text_node;
    for piece in &plan.pieces {
        match piece {
            Piece::PageMarker(label) => {
                let marker = XmlNode::Element(page_marker(&plan.prefix, plan.ns, label));
                if let Some(marker) = insert_before(doc, anchor, marker) {
                    append(doc, marker, XmlNode::Text(format!("*{label}")));
                }
            }
            Piece::Text(flags, run) => {
                let mut tags = style_tags(*flags).into_iter();
                let Some(outer) = tags.next() else {
                    insert_before(doc, anchor, XmlNode::Text(run.clone()));
                    continue;
                };
                let outer = Element::new(&format!("{}{}", plan.prefix, outer), plan.ns);
                let Some(mut innermost) = insert_before(doc, anchor, XmlNode::Element(outer)) else {
                    continue;
                };
                for tag in tags {
                    let inner = Element::new(&format!("{}{}", plan.prefix, tag), plan.ns);
                    match append(doc, innermost, XmlNode::Element(inner)) {
                        Some(id) => innermost = id,
                        None => break,
                    }
                }
                append(doc, innermost, XmlNode::Text(run.clone()));
            }
        }
    }
    doc.remove(anchor);
}

/// Line-oriented diff of two serialized documents, changed lines only.
fn line_diff(before: &str, after: &str) -> String {
    let a: Vec<&str> = before.lines().collect();
    let b: Vec<&str> = after.lines().collect();
    let mut out = Vec::new();
    for op in opcodes(&a, &b) {
        if op.tag == OpTag::Equal {
            continue;
        }
        out.extend(a[op.a_start..op.a_end].iter().map(|l| format!("- {l}")));
        out.extend(b[op.b_start..op.b_end].iter().map(|l| format!("+ {l}")));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_style_and_marker_tags() {
        let xml = r##"<p id="b1"><strong><em>Foo</em></strong> bar<page-number id="p5" href="#p5" label="5" citation-index="1">*5</page-number> baz</p>"##;
        assert_eq!(strip_style_tags(xml), r#"<p id="b1">Foo bar baz</p>"#);
    }

    #[test]
    fn leaves_similar_tag_names_alone() {
        assert_eq!(strip_style_tags("<emph>x</emph>"), "<emph>x</emph>");
        assert_eq!(strip_style_tags("<em-dash>x</em-dash>"), "<em-dash>x</em-dash>");
        assert_eq!(strip_style_tags("a<strong-x/>b"), "a<strong-x/>b");
        assert_eq!(
            strip_style_tags("<page-numbers>1</page-numbers>"),
            "<page-numbers>1</page-numbers>"
        );
        assert_eq!(strip_style_tags(r#"a<em class="x">b</em><strong/>c"#), "abc");
    }

    #[test]
    fn integrity_check_reports_changed_lines() {
        let before = "<p>\nFoo bar\n</p>";
        assert_eq!(check_integrity(before, "<p>\n<em>Foo</em> bar\n</p>"), Ok(()));

        let err = check_integrity(before, "<p>\nFoo baz\n</p>").unwrap_err();
        match err {
            ReconcileError::IntegrityCheck { diff } => {
                assert!(diff.lines().any(|l| l == "- Foo bar"));
                assert!(diff.lines().any(|l| l == "+ Foo baz"));
                assert!(!diff.contains("</p>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nests_italics_inside_bold() {
        let both = StyleFlags {
            bold: true,
            italic: true,
        };
        assert_eq!(style_tags(both), vec!["strong", "em"]);
        assert!(style_tags(StyleFlags::default()).is_empty());
    }
}
