use ego_tree::{NodeId, NodeRef};
use serde_json::json;
use std::collections::HashMap;

use crate::aligner::strategy::SOFT_HYPHEN;
use crate::aligner::{align_text, collect_words, AlignState, CharOrigin, FlatText, WordRef};
use crate::alto::AltoSet;
use crate::error::ReconcileError;
use crate::index::{case_id, find_casebody, CasebodyRoot, ElementIndex, LinkedPage};
use crate::logging::{log_event, LogLevel};
use crate::types::{
    AltoAction, AltoEdit, CaseAction, CaseEdit, EditScope, MigrationRecord, PropagateOutcome,
};
use crate::xml::{Element, Namespace, XmlDocument, XmlNode};

pub const ELEMENTS_CHANGED: &str = "not tested with adding or removing elements yet";
pub const WORD_COUNT_CHANGED: &str = "adding or removing words from case text is not yet implemented";
pub const WORDS_NOT_ALIGNED: &str = "case text and alto words are not aligned";

/// Chars a word may be broken after at a line end, tried in turn.
const LINE_BREAKS: [&[char]; 2] = [&[SOFT_HYPHEN], &[SOFT_HYPHEN, '-']];

/// Confidence written on words a person has corrected.
const CORRECTED_WORD_CONFIDENCE: &str = "1.00";

/// Diffs an edited case against the original and describes every change as casebody
/// and ALTO edit actions.
pub fn update_case_alto_unified(
    original_xml: &str,
    updated_xml: &str,
    alto: &AltoSet,
) -> Result<PropagateOutcome, ReconcileError> {
    let original = XmlDocument::parse(original_xml)?;
    let updated = XmlDocument::parse(updated_xml)?;
    propagate_document(&original, &updated, alto)
}

pub fn propagate_document(
    original: &XmlDocument,
    updated: &XmlDocument,
    alto: &AltoSet,
) -> Result<PropagateOutcome, ReconcileError> {
    if let CasebodyRoot::Duplicative(_) = find_casebody(original) {
        return Err(ReconcileError::DuplicativeCase(case_id(original)));
    }

    let original_ids: Vec<NodeId> = original.elements().map(|n| n.id()).collect();
    let mut updated_by_path: HashMap<String, Vec<NodeId>> = HashMap::new();
    for node in updated.elements() {
        updated_by_path
            .entry(updated.structural_path(node.id()))
            .or_default()
            .push(node.id());
    }
    if original_ids.len() != updated_by_path.values().map(Vec::len).sum::<usize>() {
        return Ok(PropagateOutcome::unsupported(ELEMENTS_CHANGED));
    }

    let index = ElementIndex::new(original, alto);
    let mut migration = Migration {
        index: &index,
        record: MigrationRecord::default(),
        edited_text: Vec::new(),
    };
    let mut counterparts: HashMap<NodeId, NodeId> = HashMap::new();

    for id in original_ids {
        let matches = updated_by_path
            .get(&original.structural_path(id))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let [counterpart] = matches else {
            return Ok(PropagateOutcome::unsupported(ELEMENTS_CHANGED));
        };
        counterparts.insert(id, *counterpart);
        if let Some(outcome) = migration.compare(original, id, updated, *counterpart)? {
            return Ok(outcome);
        }
    }

    for anchor in std::mem::take(&mut migration.edited_text) {
        let Some(&counterpart) = counterparts.get(&anchor) else {
            continue;
        };
        if let Some(outcome) = migration.rewrite_words(original, anchor, updated, counterpart)? {
            return Ok(outcome);
        }
    }

    let record = migration.record;
    log_event(
        LogLevel::Info,
        "edit propagation finished",
        Some(json!({
            "case_id": case_id(original),
            "case_edits": record.case_xml_changed.len(),
            "alto_files": record.alto_xml_changed.len(),
        })),
    );
    Ok(PropagateOutcome::Migration(record))
}

fn scope_of(doc: &XmlDocument, id: NodeId, el: &Element) -> EditScope {
    if doc.is_within(id, Namespace::Casebody, "casebody") {
        EditScope::Casebody
    } else if el.ns == Namespace::Mets {
        EditScope::Layout
    } else {
        EditScope::NonCasebody
    }
}

/// The element whose ALTO words cover the text of `id`: the nearest element with an
/// `id` and a `pgmap`, else the nearest with an `id`.
fn text_anchor(doc: &XmlDocument, id: NodeId) -> Option<NodeId> {
    let node = doc.get(id)?;
    let lineage: Vec<NodeRef<'_, XmlNode>> = std::iter::once(node).chain(node.ancestors()).collect();
    lineage
        .iter()
        .find(|n| has_attr(n, "id") && has_attr(n, "pgmap"))
        .or_else(|| lineage.iter().find(|n| has_attr(n, "id")))
        .map(|n| n.id())
}

fn has_attr(node: &NodeRef<'_, XmlNode>, attr: &str) -> bool {
    node.value().as_element().is_some_and(|e| e.attr(attr).is_some())
}

/// Visible words of an element, each char with the ALTO word it was aligned to.
/// Placeholders join the text on either side.
fn case_words(text: &FlatText, char_words: &[Option<usize>]) -> Vec<Vec<(char, Option<usize>)>> {
    let mut words = Vec::new();
    let mut current = Vec::new();
    for (pos, (c, origin)) in text.chars.iter().zip(&text.origins).enumerate() {
        if *origin == CharOrigin::Placeholder {
            continue;
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push((*c, char_words.get(pos).copied().flatten()));
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// An ALTO word and the char of its case word where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WordSpan {
    word: usize,
    start: usize,
}

/// The ALTO words each case word covers. `None` unless every ALTO word is covered by
/// exactly one case word, in order.
fn word_spans(case_words: &[Vec<(char, Option<usize>)>], alto_words: usize) -> Option<Vec<Vec<WordSpan>>> {
    let mut next = 0;
    let mut all = Vec::with_capacity(case_words.len());
    for case_word in case_words {
        let mut spans: Vec<WordSpan> = Vec::new();
        for (offset, (_, word)) in case_word.iter().enumerate() {
            let Some(word) = *word else {
                continue;
            };
            if spans.last().map(|s| s.word) == Some(word) {
                continue;
            }
            if word != next {
                return None;
            }
            spans.push(WordSpan { word, start: offset });
            next += 1;
        }
        spans.first_mut()?.start = 0;
        all.push(spans);
    }
    (next == alto_words).then_some(all)
}

fn split_at<'t>(word: &'t [char], starts: &[usize]) -> Vec<&'t [char]> {
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| &word[start..starts.get(i + 1).copied().unwrap_or(word.len())])
        .collect()
}

/// Splits after line-break hyphens, soft ones first, into exactly `n` parts.
fn split_after_hyphens(word: &[char], n: usize) -> Option<Vec<&[char]>> {
    if n == 1 {
        return Some(vec![word]);
    }
    LINE_BREAKS.into_iter().find_map(|breaks| {
        let mut starts = vec![0];
        starts.extend((1..word.len()).filter(|&i| breaks.contains(&word[i - 1])));
        (starts.len() == n).then(|| split_at(word, &starts))
    })
}

/// ALTO content for a corrected piece of a case word. Soft hyphens are dropped unless
/// the ALTO word ends in a line-break hyphen.
fn corrected_content(part: &[char], alto_content: &str) -> String {
    let mut content: String = part.iter().filter(|c| **c != SOFT_HYPHEN).collect();
    if part.last() == Some(&SOFT_HYPHEN) && alto_content.ends_with('-') {
        content.push('-');
    }
    content
}

struct Migration<'i, 'a> {
    index: &'i ElementIndex<'a>,
    record: MigrationRecord,
    /// Elements whose ALTO words need rewriting, in document order.
    edited_text: Vec<NodeId>,
}

impl Migration<'_, '_> {
    /// Records the differences of one element pair. `Some` ends the walk with an
    /// unsupported-edit outcome.
    fn compare(
        &mut self,
        original: &XmlDocument,
        id: NodeId,
        updated: &XmlDocument,
        counterpart: NodeId,
    ) -> Result<Option<PropagateOutcome>, ReconcileError> {
        let (Some(old), Some(new)) = (original.element(id), updated.element(counterpart)) else {
            return Ok(None);
        };
        let scope = scope_of(original, id, old);
        let path = original.path(id);
        let element_id = old.attr("id").map(str::to_string);

        if old.name != new.name {
            self.rename(scope, &path, element_id.as_deref(), old, new)?;
        }

        let old_text = original.own_text(id);
        let new_text = updated.own_text(counterpart);
        if old_text != new_text {
            self.case_edit(CaseEdit {
                action: CaseAction::ChangeContent,
                scope,
                path: path.clone(),
                id: element_id.clone(),
                attribute: None,
                old: Some(old_text.clone()),
                new: Some(new_text.clone()),
            });
            if scope == EditScope::Casebody {
                if old_text.split_whitespace().count() != new_text.split_whitespace().count() {
                    return Ok(Some(PropagateOutcome::unsupported(WORD_COUNT_CHANGED)));
                }
                // Inline children without an id are rewritten through their host element.
                let words_changed = old_text.split_whitespace().ne(new_text.split_whitespace());
                if let Some(anchor) = text_anchor(original, id).filter(|_| words_changed) {
                    if !self.edited_text.contains(&anchor) {
                        self.edited_text.push(anchor);
                    }
                }
            }
        }

        self.attributes(scope, &path, element_id.as_deref(), old, new);
        Ok(None)
    }

    fn rename(
        &mut self,
        scope: EditScope,
        path: &str,
        element_id: Option<&str>,
        old: &Element,
        new: &Element,
    ) -> Result<(), ReconcileError> {
        let action = if scope == EditScope::Casebody {
            CaseAction::ChangeCasebodyTag
        } else {
            CaseAction::ChangeTag
        };
        self.case_edit(CaseEdit {
            action,
            scope,
            path: path.to_string(),
            id: element_id.map(str::to_string),
            attribute: None,
            old: Some(old.local.clone()),
            new: Some(new.local.clone()),
        });

        let (EditScope::Casebody, Some(element_id)) = (scope, element_id) else {
            return Ok(());
        };
        for page in self.index.linked_pages(element_id)? {
            let Some(tag) = page.alto.structure_tag(element_id) else {
                continue;
            };
            let edit = AltoEdit {
                action: if tag.label.is_some() {
                    AltoAction::ChangeAltoAttrib
                } else {
                    AltoAction::AddAltoAttrib
                },
                element_id: tag.id.clone(),
                attribute: "LABEL".to_string(),
                old: tag.label.clone(),
                new: new.local.clone(),
            };
            self.alto_edit(&page.alto.file_id, edit);
        }
        Ok(())
    }

    /// Points the ALTO words of `anchor` at the corrected text. Case words are paired
    /// with ALTO words through the alignment of the original text, so a word broken
    /// across lines keeps both of its ALTO words.
    fn rewrite_words(
        &mut self,
        original: &XmlDocument,
        anchor: NodeId,
        updated: &XmlDocument,
        counterpart: NodeId,
    ) -> Result<Option<PropagateOutcome>, ReconcileError> {
        let Some(old) = original.element(anchor) else {
            return Ok(None);
        };
        let Some(element_id) = old.attr("id") else {
            return Ok(None);
        };
        let pages: Vec<LinkedPage> = match old.attr("pgmap") {
            Some(pgmap) => self.index.resolve(element_id, pgmap)?,
            None => self.index.linked_pages(element_id)?,
        };
        let alto_words = collect_words(&pages);
        let alto_chars: Vec<Vec<char>> = alto_words
            .iter()
            .map(|w| w.word.content.chars().collect())
            .collect();

        let before = FlatText::of_element(original, anchor);
        let (_, alignment) = align_text(&before.chars, &alto_chars, AlignState::default(), usize::MAX);
        let old_words = case_words(&before, &alignment.char_words);
        let new_words: Vec<Vec<char>> = case_words(&FlatText::of_element(updated, counterpart), &[])
            .into_iter()
            .map(|w| w.into_iter().map(|(c, _)| c).collect())
            .collect();
        if old_words.len() != new_words.len() {
            return Ok(Some(PropagateOutcome::unsupported(WORD_COUNT_CHANGED)));
        }
        let Some(spans) = word_spans(&old_words, alto_words.len()) else {
            tracing::warn!(
                element_id,
                alto_words = alto_words.len(),
                case_words = old_words.len(),
                "edited element does not line up with its ALTO words"
            );
            return Ok(Some(PropagateOutcome::unsupported(WORDS_NOT_ALIGNED)));
        };

        for ((old_word, new_word), spans) in old_words.iter().zip(&new_words).zip(&spans) {
            let old_word: Vec<char> = old_word.iter().map(|(c, _)| *c).collect();
            if old_word == *new_word {
                continue;
            }
            let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
            let new_parts = if new_word.len() == old_word.len() {
                split_at(new_word, &starts)
            } else {
                match split_after_hyphens(new_word, spans.len()) {
                    Some(parts) => parts,
                    None => return Ok(Some(PropagateOutcome::unsupported(WORDS_NOT_ALIGNED))),
                }
            };
            let old_parts = split_at(&old_word, &starts);

            for ((span, old_part), new_part) in spans.iter().zip(old_parts).zip(new_parts) {
                if old_part == new_part {
                    continue;
                }
                let word = &alto_words[span.word];
                let content = corrected_content(new_part, &word.word.content);
                if content == word.word.content {
                    continue;
                }
                let file_id = pages[word.page].alto.file_id.clone();
                for edit in word_edits(word, &content) {
                    self.alto_edit(&file_id, edit);
                }
            }
        }
        Ok(None)
    }

    fn attributes(&mut self, scope: EditScope, path: &str, element_id: Option<&str>, old: &Element, new: &Element) {
        let edit = |action, attribute: &str, before: Option<&str>, after: Option<&str>| CaseEdit {
            action,
            scope,
            path: path.to_string(),
            id: element_id.map(str::to_string),
            attribute: Some(attribute.to_string()),
            old: before.map(str::to_string),
            new: after.map(str::to_string),
        };

        let mut edits = Vec::new();
        for (key, value) in old.plain_attrs() {
            match new.attr(key) {
                None => edits.push(edit(CaseAction::DeleteAttribute, key, Some(value), None)),
                Some(changed) if changed != value => {
                    edits.push(edit(CaseAction::UpdateAttribute, key, Some(value), Some(changed)))
                }
                Some(_) => {}
            }
        }
        for (key, value) in new.plain_attrs() {
            if old.attr(key).is_none() {
                edits.push(edit(CaseAction::AddAttribute, key, None, Some(value)));
            }
        }
        for edit in edits {
            self.case_edit(edit);
        }
    }

    fn case_edit(&mut self, edit: CaseEdit) {
        tracing::debug!(path = %edit.path, action = ?edit.action, "case edit");
        self.record.case_xml_changed.push(edit);
    }

    fn alto_edit(&mut self, file_id: &str, edit: AltoEdit) {
        tracing::debug!(file_id, element = %edit.element_id, attribute = %edit.attribute, "alto edit");
        self.record
            .alto_xml_changed
            .entry(file_id.to_string())
            .or_default()
            .push(edit);
    }
}

/// `CONTENT`, `WC` and `CC` edits marking a word as corrected by hand.
fn word_edits(word: &WordRef, content: &str) -> Vec<AltoEdit> {
    let set = |attribute: &str, old: Option<&String>, new: String| AltoEdit {
        action: if old.is_some() {
            AltoAction::ChangeAltoAttrib
        } else {
            AltoAction::AddAltoAttrib
        },
        element_id: word.word.id.clone(),
        attribute: attribute.to_string(),
        old: old.cloned(),
        new,
    };
    vec![
        set("CONTENT", Some(&word.word.content), content.to_string()),
        set("WC", word.word.wc.as_ref(), CORRECTED_WORD_CONFIDENCE.to_string()),
        set("CC", word.word.cc.as_ref(), "0".repeat(content.chars().count())),
    ]
}
