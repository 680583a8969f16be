use ego_tree::{NodeId, NodeRef};

use crate::xml::{XmlDocument, XmlNode};

/// First char of every inline-tag placeholder. Private use, so it never occurs in case text.
pub const SENTINEL: char = '\u{E000}';
/// Sentinel, kind char, and `<` or `>` for open and close.
pub const PLACEHOLDER_LEN: usize = 3;

pub const INLINE_TAGS: &[(&str, char)] = &[
    ("footnotemark", 'f'),
    ("bracketnum", 'b'),
    ("strong", 's'),
    ("em", 'e'),
    ("extracted-citation", 'c'),
    ("citation", 'c'),
];

/// Tags whose content is generated by style merge and never appears in ALTO.
pub const GENERATED_TAGS: &[&str] = &["page-number"];

pub fn placeholder_kind(local: &str) -> char {
    INLINE_TAGS
        .iter()
        .find(|(tag, _)| *tag == local)
        .map(|(_, kind)| *kind)
        .unwrap_or('x')
}

pub fn placeholder(local: &str, open: bool) -> [char; PLACEHOLDER_LEN] {
    [SENTINEL, placeholder_kind(local), if open { '<' } else { '>' }]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharOrigin {
    /// Char `offset` (in chars) of text node `node`.
    Text { node: NodeId, offset: usize },
    Placeholder,
}

/// An element's text as one char sequence, inline tags replaced by placeholders, with
/// the origin of every char so results can be written back into the tree.
#[derive(Debug, Clone, Default)]
pub struct FlatText {
    pub chars: Vec<char>,
    pub origins: Vec<CharOrigin>,
}

impl FlatText {
    pub fn of_element(doc: &XmlDocument, id: NodeId) -> Self {
        let mut flat = FlatText::default();
        if let Some(node) = doc.get(id) {
            flat.push_children(node);
        }
        flat
    }

    fn push_children(&mut self, node: NodeRef<'_, XmlNode>) {
        for child in node.children() {
            match child.value() {
                XmlNode::Text(text) => {
                    for (offset, c) in text.chars().enumerate() {
                        self.chars.push(c);
                        self.origins.push(CharOrigin::Text {
                            node: child.id(),
                            offset,
                        });
                    }
                }
                XmlNode::Element(el) => {
                    // Nested elements with their own pgmap are aligned on their own.
                    if GENERATED_TAGS.contains(&el.local.as_str()) || el.attr("pgmap").is_some() {
                        continue;
                    }
                    self.push_placeholder(&el.local, true);
                    self.push_children(child);
                    self.push_placeholder(&el.local, false);
                }
                _ => {}
            }
        }
    }

    fn push_placeholder(&mut self, local: &str, open: bool) {
        for c in placeholder(local, open) {
            self.chars.push(c);
            self.origins.push(CharOrigin::Placeholder);
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// True when nothing but whitespace and placeholders is left.
    pub fn is_blank(&self) -> bool {
        self.chars
            .iter()
            .zip(&self.origins)
            .all(|(c, origin)| *origin == CharOrigin::Placeholder || c.is_whitespace())
    }

    /// Text without placeholders.
    pub fn visible(&self) -> String {
        self.visible_range(0, self.len())
    }

    fn visible_range(&self, start: usize, end: usize) -> String {
        self.chars[start..end]
            .iter()
            .zip(&self.origins[start..end])
            .filter(|(_, origin)| **origin != CharOrigin::Placeholder)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Visible text within `width` chars either side of `center`.
    pub fn snippet(&self, center: usize, width: usize) -> String {
        let center = center.min(self.len());
        let start = center.saturating_sub(width);
        let end = (center + width).min(self.len());
        self.visible_range(start, end)
    }
}
