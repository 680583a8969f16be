use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};

use crate::error::ReconcileError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
}

impl StyleFlags {
    /// Parses a `FONTSTYLE` value such as `"bold italics"`.
    pub fn from_fontstyle(value: &str) -> Self {
        let mut flags = StyleFlags::default();
        for token in value.split_whitespace() {
            match token.to_ascii_lowercase().as_str() {
                "bold" => flags.bold = true,
                "italics" | "italic" => flags.italic = true,
                _ => {}
            }
        }
        flags
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic
    }

    pub fn union(self, other: StyleFlags) -> StyleFlags {
        StyleFlags {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub id: String,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub flags: StyleFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureTag {
    pub id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AltoWord {
    pub id: String,
    pub content: String,
    pub hpos: Option<f64>,
    pub vpos: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub style_refs: Vec<String>,
    pub wc: Option<String>,
    pub cc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub id: String,
    pub tag_refs: Vec<String>,
    pub style_refs: Vec<String>,
    pub words: Vec<AltoWord>,
}

impl TextBlock {
    pub fn is_tagged(&self, element_id: &str) -> bool {
        self.tag_refs.iter().any(|t| t == element_id)
    }
}

/// One ALTO page as the OCR engine recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct AltoDocument {
    pub file_id: String,
    pub page_id: Option<String>,
    /// `PRINTED_IMG_NR` of the page, the label printed on paper.
    pub printed_label: Option<String>,
    pub styles: HashMap<String, TextStyle>,
    pub structure_tags: Vec<StructureTag>,
    pub blocks: Vec<TextBlock>,
}

fn attr_map(e: &BytesStart) -> Result<HashMap<String, String>, ReconcileError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ReconcileError::Xml(format!("bad ALTO attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ReconcileError::Xml(format!("bad ALTO attribute {key}: {err}")))?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

fn split_refs(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn number(attrs: &HashMap<String, String>, key: &str) -> Option<f64> {
    attrs.get(key).and_then(|v| v.trim().parse().ok())
}

impl AltoDocument {
    pub fn parse(file_id: &str, xml: &str) -> Result<Self, ReconcileError> {
        let mut reader = Reader::from_str(xml);
        let mut doc = AltoDocument {
            file_id: file_id.to_string(),
            page_id: None,
            printed_label: None,
            styles: HashMap::new(),
            structure_tags: Vec::new(),
            blocks: Vec::new(),
        };
        let mut current_block: Option<TextBlock> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| ReconcileError::Xml(format!("ALTO {file_id}: {e}")))?;
            let (e, is_empty) = match &event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(e) => {
                    if e.local_name().as_ref() == b"TextBlock" {
                        if let Some(block) = current_block.take() {
                            doc.blocks.push(block);
                        }
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            match e.local_name().as_ref() {
                b"Page" => {
                    let attrs = attr_map(e)?;
                    doc.page_id = attrs.get("ID").cloned();
                    doc.printed_label = attrs.get("PRINTED_IMG_NR").cloned();
                }
                b"TextStyle" => {
                    let attrs = attr_map(e)?;
                    if let Some(id) = attrs.get("ID") {
                        let flags = attrs
                            .get("FONTSTYLE")
                            .map(|v| StyleFlags::from_fontstyle(v))
                            .unwrap_or_default();
                        doc.styles.insert(
                            id.clone(),
                            TextStyle {
                                id: id.clone(),
                                font_family: attrs.get("FONTFAMILY").cloned(),
                                font_size: attrs.get("FONTSIZE").cloned(),
                                flags,
                            },
                        );
                    }
                }
                b"StructureTag" => {
                    let attrs = attr_map(e)?;
                    if let Some(id) = attrs.get("ID") {
                        doc.structure_tags.push(StructureTag {
                            id: id.clone(),
                            label: attrs.get("LABEL").cloned(),
                        });
                    }
                }
                b"TextBlock" => {
                    let attrs = attr_map(e)?;
                    let block = TextBlock {
                        id: attrs.get("ID").cloned().unwrap_or_default(),
                        tag_refs: split_refs(attrs.get("TAGREFS")),
                        style_refs: split_refs(attrs.get("STYLEREFS")),
                        words: Vec::new(),
                    };
                    if is_empty {
                        doc.blocks.push(block);
                    } else {
                        current_block = Some(block);
                    }
                }
                b"String" => {
                    let attrs = attr_map(e)?;
                    if let Some(block) = current_block.as_mut() {
                        block.words.push(AltoWord {
                            id: attrs.get("ID").cloned().unwrap_or_default(),
                            content: attrs.get("CONTENT").cloned().unwrap_or_default(),
                            hpos: number(&attrs, "HPOS"),
                            vpos: number(&attrs, "VPOS"),
                            width: number(&attrs, "WIDTH"),
                            height: number(&attrs, "HEIGHT"),
                            style_refs: split_refs(attrs.get("STYLEREFS")),
                            wc: attrs.get("WC").cloned(),
                            cc: attrs.get("CC").cloned(),
                        });
                    }
                }
                // A line-end hyphen belongs to the word it follows.
                b"HYP" => {
                    let attrs = attr_map(e)?;
                    if let (Some(block), Some(content)) = (current_block.as_mut(), attrs.get("CONTENT")) {
                        if let Some(word) = block.words.last_mut() {
                            word.content.push_str(content);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(doc)
    }

    pub fn style(&self, id: &str) -> Option<&TextStyle> {
        self.styles.get(id)
    }

    /// Style flags for a word: its own `STYLEREFS`, or the enclosing block's when it has none.
    pub fn word_flags(&self, block: &TextBlock, word: &AltoWord) -> StyleFlags {
        let refs = if word.style_refs.is_empty() {
            &block.style_refs
        } else {
            &word.style_refs
        };
        refs.iter()
            .filter_map(|r| self.style(r))
            .fold(StyleFlags::default(), |acc, s| acc.union(s.flags))
    }

    pub fn blocks_for(&self, element_id: &str) -> impl Iterator<Item = &TextBlock> + '_ {
        let key = element_id.to_string();
        self.blocks.iter().filter(move |b| b.is_tagged(&key))
    }

    pub fn structure_tag(&self, element_id: &str) -> Option<&StructureTag> {
        self.structure_tags.iter().find(|t| t.id == element_id)
    }
}

/// All ALTO pages of a volume, keyed by METS file id.
#[derive(Debug, Clone, Default)]
pub struct AltoSet {
    pages: BTreeMap<String, AltoDocument>,
}

impl AltoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_all<'a, I>(sources: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = AltoSet::new();
        for (file_id, xml) in sources {
            set.insert(AltoDocument::parse(file_id, xml)?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, doc: AltoDocument) {
        self.pages.insert(doc.file_id.clone(), doc);
    }

    pub fn get(&self, file_id: &str) -> Option<&AltoDocument> {
        self.pages.get(file_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
