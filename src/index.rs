use ego_tree::NodeId;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::alto::{AltoDocument, AltoSet, TextBlock};
use crate::error::ReconcileError;
use crate::xml::{Namespace, XmlDocument};

static PGMAP_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^()\s]+)(?:\((\d+)\))?$").unwrap());

/// One `pgmap` entry: a page token and, when the element spans pages, how many of its
/// words sit on that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpan {
    pub token: String,
    pub expected_words: Option<usize>,
}

/// Parses `"17"` or `"17(5) 18(3)"`. Malformed entries are kept as bare tokens.
pub fn parse_pgmap(value: &str) -> Vec<PageSpan> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    if !value.contains(char::is_whitespace) && !value.contains('(') {
        return vec![PageSpan {
            token: value.to_string(),
            expected_words: None,
        }];
    }
    value
        .split_whitespace()
        .map(|entry| match PGMAP_ENTRY_RE.captures(entry) {
            Some(caps) => PageSpan {
                token: caps[1].to_string(),
                expected_words: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            },
            None => PageSpan {
                token: entry.to_string(),
                expected_words: None,
            },
        })
        .collect()
}

/// Page token from an ALTO block id as used in METS `BEGIN`: `BL_17.6` -> `17`.
pub fn page_token_from_begin(begin: &str) -> String {
    let head = begin.split('.').next().unwrap_or(begin);
    head.strip_prefix("BL_").unwrap_or(head).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub page_token: String,
    pub file_id: String,
    pub block_id: String,
}

/// Where the casebody sits in a case document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasebodyRoot {
    Present(NodeId),
    Duplicative(NodeId),
    Missing,
}

pub fn find_casebody(doc: &XmlDocument) -> CasebodyRoot {
    if let Some(node) = doc.find_first(Namespace::Casebody, "casebody") {
        return CasebodyRoot::Present(node.id());
    }
    if let Some(node) = doc.find_first(Namespace::Duplicative, "casebody") {
        return CasebodyRoot::Duplicative(node.id());
    }
    CasebodyRoot::Missing
}

pub fn case_id(doc: &XmlDocument) -> String {
    if let Some(id) = doc
        .find_first(Namespace::Case, "case")
        .and_then(|n| n.value().as_element().and_then(|el| el.attr("caseid")))
    {
        return id.to_string();
    }
    doc.find_first(Namespace::Mets, "mets")
        .and_then(|n| n.value().as_element().and_then(|el| el.attr("OBJID")))
        .unwrap_or_default()
        .to_string()
}

/// Element id -> ALTO blocks, read from the METS `area`/`fptr` cross references.
#[derive(Debug, Clone, Default)]
pub struct MetsLinks {
    links: HashMap<String, Vec<FileLink>>,
}

/// `ID`s of the `mets:file` entries in the `casebody` file group.
fn casebody_file_ids(doc: &XmlDocument) -> Vec<String> {
    doc.elements()
        .filter(|n| {
            n.value()
                .as_element()
                .is_some_and(|e| e.is(Namespace::Mets, "fileGrp") && e.attr("USE") == Some("casebody"))
        })
        .flat_map(|group| group.children())
        .filter_map(|n| n.value().as_element())
        .filter(|e| e.is(Namespace::Mets, "file"))
        .filter_map(|e| e.attr("ID").map(str::to_string))
        .collect()
}

impl MetsLinks {
    pub fn from_document(doc: &XmlDocument) -> Self {
        let mut links: HashMap<String, Vec<FileLink>> = HashMap::new();
        let casebody_files = casebody_file_ids(doc);

        for area in doc.elements() {
            let Some(el) = area.value().as_element() else {
                continue;
            };
            if !el.is(Namespace::Mets, "area") {
                continue;
            }
            let Some(element_id) = el.attr("BEGIN") else {
                continue;
            };
            // Only the area pointing into the casebody file opens a logical div; its
            // sibling fptrs name the ALTO blocks.
            let is_anchor = if casebody_files.is_empty() {
                !area.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| e.is(Namespace::Mets, "seq"))
                })
            } else {
                el.attr("FILEID")
                    .is_some_and(|file_id| casebody_files.iter().any(|f| f == file_id))
            };
            if !is_anchor {
                continue;
            }
            let Some(div) = area
                .ancestors()
                .find(|a| a.value().as_element().is_some_and(|e| e.is(Namespace::Mets, "div")))
            else {
                continue;
            };
            let own_fptr = area.ancestors().find(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| e.is(Namespace::Mets, "fptr"))
            });
            let siblings: Vec<FileLink> = div
                .children()
                .filter(|c| Some(c.id()) != own_fptr.map(|f| f.id()))
                .filter(|c| c.value().as_element().is_some_and(|e| e.is(Namespace::Mets, "fptr")))
                .flat_map(|fptr| fptr.descendants())
                .filter_map(|n| n.value().as_element())
                .filter(|e| e.is(Namespace::Mets, "area"))
                .filter_map(|e| {
                    let file_id = e.attr("FILEID")?;
                    let begin = e.attr("BEGIN")?;
                    Some(FileLink {
                        page_token: page_token_from_begin(begin),
                        file_id: file_id.to_string(),
                        block_id: begin.to_string(),
                    })
                })
                .collect();
            if siblings.is_empty() || links.contains_key(element_id) {
                continue;
            }
            links.insert(element_id.to_string(), siblings);
        }

        Self { links }
    }

    pub fn get(&self, element_id: &str) -> &[FileLink] {
        self.links.get(element_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Page token -> ALTO file id for one element, first link wins.
    pub fn page_files(&self, element_id: &str) -> Vec<(String, String)> {
        let mut pages: Vec<(String, String)> = Vec::new();
        for link in self.get(element_id) {
            if !pages.iter().any(|(token, _)| *token == link.page_token) {
                pages.push((link.page_token.clone(), link.file_id.clone()));
            }
        }
        pages
    }
}

/// The ALTO text an element renders on one page.
#[derive(Debug, Clone)]
pub struct LinkedPage<'a> {
    pub page_token: String,
    pub expected_words: Option<usize>,
    pub alto: &'a AltoDocument,
    pub blocks: Vec<&'a TextBlock>,
}

impl LinkedPage<'_> {
    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(|b| b.words.len()).sum()
    }

    /// Label printed on the page, or the page token when ALTO has none.
    pub fn label(&self) -> &str {
        self.alto.printed_label.as_deref().unwrap_or(&self.page_token)
    }
}

pub struct ElementIndex<'a> {
    links: MetsLinks,
    alto: &'a AltoSet,
}

impl<'a> ElementIndex<'a> {
    pub fn new(doc: &XmlDocument, alto: &'a AltoSet) -> Self {
        Self {
            links: MetsLinks::from_document(doc),
            alto,
        }
    }

    fn load(&self, element_id: &str, file_id: &str) -> Result<&'a AltoDocument, ReconcileError> {
        self.alto.get(file_id).ok_or_else(|| ReconcileError::Linkage {
            element_id: element_id.to_string(),
            reason: format!("ALTO file {file_id} is not loaded"),
        })
    }

    /// Resolves an element's `pgmap` to its ALTO pages in page order.
    pub fn resolve(&self, element_id: &str, pgmap: &str) -> Result<Vec<LinkedPage<'a>>, ReconcileError> {
        let spans = parse_pgmap(pgmap);
        if spans.is_empty() {
            return Err(ReconcileError::Linkage {
                element_id: element_id.to_string(),
                reason: "empty pgmap".to_string(),
            });
        }
        let page_files = self.links.page_files(element_id);

        let mut pages = Vec::with_capacity(spans.len());
        for span in spans {
            let file_id = page_files
                .iter()
                .find(|(token, _)| *token == span.token)
                .map(|(_, file_id)| file_id.as_str())
                .ok_or_else(|| ReconcileError::Linkage {
                    element_id: element_id.to_string(),
                    reason: format!("page {} has no METS area", span.token),
                })?;
            let alto = self.load(element_id, file_id)?;
            let page = LinkedPage {
                page_token: span.token,
                expected_words: span.expected_words,
                alto,
                blocks: alto.blocks_for(element_id).collect(),
            };
            if let Some(expected) = page.expected_words {
                if expected != page.word_count() {
                    tracing::warn!(
                        element_id,
                        page = %page.page_token,
                        expected,
                        found = page.word_count(),
                        "pgmap word count differs from ALTO"
                    );
                }
            }
            pages.push(page);
        }
        Ok(pages)
    }

    /// Every ALTO page linked to the element in METS, whether or not it has a `pgmap`.
    pub fn linked_pages(&self, element_id: &str) -> Result<Vec<LinkedPage<'a>>, ReconcileError> {
        self.links
            .page_files(element_id)
            .into_iter()
            .map(|(token, file_id)| {
                let alto = self.load(element_id, &file_id)?;
                Ok(LinkedPage {
                    page_token: token,
                    expected_words: None,
                    alto,
                    blocks: alto.blocks_for(element_id).collect(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_split_pgmaps() {
        assert_eq!(
            parse_pgmap("17"),
            vec![PageSpan {
                token: "17".to_string(),
                expected_words: None
            }]
        );
        let spans = parse_pgmap("17(5) 18(3)");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].token, "18");
        assert_eq!(spans[1].expected_words, Some(3));
    }

    #[test]
    fn strips_block_prefix_from_begin() {
        assert_eq!(page_token_from_begin("BL_17.6"), "17");
        assert_eq!(page_token_from_begin("42"), "42");
    }
}
