//! Character-level alignment of one casebody element against the ALTO words it is
//! rendered from.
//!
//! The walk is a pure function of the element text, the word list, and an
//! [`AlignState`] carried across elements; it reports which ALTO word every
//! casebody char lines up with and every place where the two sides disagree.

pub mod flatten;
pub mod strategy;

use ego_tree::NodeId;

use crate::alto::{AltoWord, TextBlock};
use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::index::{ElementIndex, LinkedPage};
use crate::types::{AltoContext, Problem, WordSnippet};
use crate::xml::XmlDocument;

pub use flatten::{CharOrigin, FlatText};
pub use strategy::MismatchKind;

use strategy::{chars_match, choose, skip_ignorable, SOFT_HYPHEN};

/// Tags that hold other elements rather than text of their own.
const CONTAINER_TAGS: &[&str] = &["casebody", "opinion"];

#[derive(Debug, Clone, Copy)]
pub struct WordRef<'a> {
    /// Index into the element's linked pages.
    pub page: usize,
    pub block: &'a TextBlock,
    pub word: &'a AltoWord,
}

pub fn collect_words<'a>(pages: &[LinkedPage<'a>]) -> Vec<WordRef<'a>> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(page, linked)| {
            linked.blocks.iter().copied().flat_map(move |block: &'a TextBlock| {
                block
                    .words
                    .iter()
                    .map(move |word| WordRef { page, block, word })
            })
        })
        .collect()
}

/// State carried from one element to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignState {
    pub consecutive_bad_words: usize,
}

/// Position inside one element: casebody char `pos`, char `at` of the current word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub pos: usize,
    pub at: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Match { pos: usize },
    /// A soft hyphen with no ALTO counterpart (the line break was not hyphenated in OCR).
    SoftHyphen { pos: usize },
    Mismatch {
        kind: MismatchKind,
        pos: usize,
        /// Casebody positions consumed by the recovery, attributed to the current word.
        consumed: Vec<usize>,
    },
}

/// Advances one ALTO char of `word`. Requires `cursor.at < word.len()`.
pub fn step(text: &[char], word: &[char], next_word: Option<&[char]>, cursor: Cursor) -> (Cursor, Step) {
    let pos = skip_ignorable(text, cursor.pos);
    if pos >= text.len() {
        let done = Cursor {
            pos,
            at: word.len(),
        };
        return (
            done,
            Step::Mismatch {
                kind: MismatchKind::Unspecified,
                pos,
                consumed: Vec::new(),
            },
        );
    }

    let head = text[pos];
    let alto_char = word[cursor.at];
    if chars_match(head, alto_char) {
        return (
            Cursor {
                pos: pos + 1,
                at: cursor.at + 1,
            },
            Step::Match { pos },
        );
    }
    if head == SOFT_HYPHEN {
        return (
            Cursor {
                pos: pos + 1,
                at: cursor.at,
            },
            Step::SoftHyphen { pos },
        );
    }

    let kind = choose(text, pos, word, cursor.at, next_word);
    let (next, consumed) = match kind {
        MismatchKind::ExtraCharInAltoNext => (
            Cursor {
                pos,
                at: word.len(),
            },
            Vec::new(),
        ),
        MismatchKind::ExtraCharInAltoCurrent => (
            Cursor {
                pos,
                at: cursor.at + 1,
            },
            Vec::new(),
        ),
        MismatchKind::ExtraCharInCaseMets => {
            let second = skip_ignorable(text, pos + 1);
            (
                Cursor {
                    pos: second + 1,
                    at: cursor.at + 1,
                },
                vec![pos, second],
            )
        }
        MismatchKind::Unspecified | MismatchKind::LeftoverCasebody => (
            Cursor {
                pos: pos + 1,
                at: cursor.at + 1,
            },
            vec![pos],
        ),
    };
    (next, Step::Mismatch { kind, pos, consumed })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub word: Option<usize>,
    pub pos: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementAlignment {
    /// For every casebody char, the word it was matched against.
    pub char_words: Vec<Option<usize>>,
    pub mismatches: Vec<Mismatch>,
    /// The consecutive-bad-word threshold was reached inside this element.
    pub aborted: bool,
}

impl ElementAlignment {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && !self.aborted
    }
}

/// Walks `text` against `words` in lockstep.
pub fn align_text(text: &[char], words: &[Vec<char>], state: AlignState, threshold: usize) -> (AlignState, ElementAlignment) {
    let mut state = state;
    let mut result = ElementAlignment {
        char_words: vec![None; text.len()],
        ..Default::default()
    };
    let mut pos = 0;

    for (index, word) in words.iter().enumerate() {
        let next_word = words.get(index + 1).map(Vec::as_slice);
        let mut cursor = Cursor { pos, at: 0 };
        let mut bad = false;

        while cursor.at < word.len() {
            let (next, outcome) = step(text, word, next_word, cursor);
            match outcome {
                Step::Match { pos } | Step::SoftHyphen { pos } => result.char_words[pos] = Some(index),
                Step::Mismatch { kind, pos, consumed } => {
                    for p in consumed {
                        if p < text.len() {
                            result.char_words[p] = Some(index);
                        }
                    }
                    result.mismatches.push(Mismatch {
                        kind,
                        word: Some(index),
                        pos,
                    });
                    bad = true;
                }
            }
            cursor = next;
        }
        pos = cursor.pos;

        if bad {
            state.consecutive_bad_words += 1;
            if state.consecutive_bad_words >= threshold {
                result.aborted = true;
                return (state, result);
            }
        } else {
            state.consecutive_bad_words = 0;
        }
    }

    let rest = skip_ignorable(text, pos);
    if rest < text.len() {
        result.mismatches.push(Mismatch {
            kind: MismatchKind::LeftoverCasebody,
            word: None,
            pos: rest,
        });
    }
    (state, result)
}

/// An element together with its ALTO words and the outcome of aligning them.
#[derive(Debug, Clone)]
pub struct AlignedElement<'a> {
    pub node: NodeId,
    pub element_id: String,
    pub text: FlatText,
    pub pages: Vec<LinkedPage<'a>>,
    pub words: Vec<WordRef<'a>>,
    pub alignment: ElementAlignment,
}

impl AlignedElement<'_> {
    /// Concatenated ALTO text with the word index of every char.
    pub fn alto_chars(&self) -> (Vec<char>, Vec<usize>) {
        let mut chars = Vec::new();
        let mut owners = Vec::new();
        for (index, word) in self.words.iter().enumerate() {
            for c in word.word.content.chars() {
                chars.push(c);
                owners.push(index);
            }
        }
        (chars, owners)
    }

    pub fn problems(&self, context_chars: usize) -> Vec<Problem> {
        self.alignment
            .mismatches
            .iter()
            .map(|m| self.problem(m, context_chars))
            .collect()
    }

    fn problem(&self, mismatch: &Mismatch, context_chars: usize) -> Problem {
        Problem {
            element_id: self.element_id.clone(),
            description: mismatch.kind.description().to_string(),
            alto: self.alto_context(mismatch.word, context_chars),
            casemets: self.text.snippet(mismatch.pos, context_chars),
        }
    }

    fn alto_context(&self, word: Option<usize>, context_chars: usize) -> AltoContext {
        let snippet = |w: &WordRef| WordSnippet {
            id: w.word.id.clone(),
            content: w.word.content.clone(),
        };
        let center = word.unwrap_or(self.words.len());

        let mut before = Vec::new();
        let mut budget = 0;
        for w in self.words[..center.min(self.words.len())].iter().rev() {
            if budget >= context_chars {
                break;
            }
            budget += w.word.content.chars().count();
            before.push(snippet(w));
        }
        before.reverse();

        let mut after = Vec::new();
        let mut budget = 0;
        for w in self.words.iter().skip(center + 1) {
            if budget >= context_chars {
                break;
            }
            budget += w.word.content.chars().count();
            after.push(snippet(w));
        }

        AltoContext {
            before,
            current: word.and_then(|i| self.words.get(i)).map(snippet),
            after,
        }
    }
}

/// Elements of the casebody subtree that carry their own text, in document order.
pub fn alignable_elements(doc: &XmlDocument, casebody: NodeId) -> Vec<NodeId> {
    let Some(root) = doc.get(casebody) else {
        return Vec::new();
    };
    root.descendants()
        .filter(|n| {
            n.value().as_element().is_some_and(|el| {
                !CONTAINER_TAGS.contains(&el.local.as_str())
                    && el.attr("id").is_some()
                    && el.attr("pgmap").is_some()
            })
        })
        .map(|n| n.id())
        .filter(|id| !FlatText::of_element(doc, *id).is_blank())
        .collect()
}

/// Resolves and aligns one element.
pub fn align_element<'a>(
    doc: &XmlDocument,
    index: &ElementIndex<'a>,
    node: NodeId,
    state: AlignState,
    config: &ReconcileConfig,
) -> Result<(AlignState, AlignedElement<'a>), ReconcileError> {
    let el = doc
        .element(node)
        .ok_or_else(|| ReconcileError::Xml("aligned node is not an element".to_string()))?;
    let element_id = el.attr("id").unwrap_or_default().to_string();
    let pgmap = el.attr("pgmap").unwrap_or_default();

    let pages = index.resolve(&element_id, pgmap)?;
    let words = collect_words(&pages);
    let text = FlatText::of_element(doc, node);
    let word_chars: Vec<Vec<char>> = words.iter().map(|w| w.word.content.chars().collect()).collect();

    let (state, alignment) = align_text(
        &text.chars,
        &word_chars,
        state,
        config.consecutive_bad_word_threshold,
    );
    tracing::debug!(
        element_id = %element_id,
        words = words.len(),
        mismatches = alignment.mismatches.len(),
        "aligned element"
    );

    Ok((
        state,
        AlignedElement {
            node,
            element_id,
            text,
            pages,
            words,
            alignment,
        },
    ))
}
