use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef, Tree};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::namespace::Namespace;
use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written in the source, e.g. `casebody:p`.
    pub name: String,
    pub local: String,
    pub ns: Namespace,
    /// Attributes in source order, values unescaped. Namespace declarations are kept
    /// here too so the document serializes back with the same prefixes.
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl Element {
    pub fn new(name: &str, ns: Namespace) -> Self {
        let local = match name.rfind(':') {
            Some(idx) => name[idx + 1..].to_string(),
            None => name.to_string(),
        };
        Self {
            name: name.to_string(),
            local,
            ns,
            attrs: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    /// Attributes that are not namespace declarations.
    pub fn plain_attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .filter(|(k, _)| k != "xmlns" && !k.starts_with("xmlns:"))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is(&self, ns: Namespace, local: &str) -> bool {
        self.ns == ns && self.local == local
    }

}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Document,
    Element(Element),
    Text(String),
    /// Declarations and comments, written back verbatim.
    Raw(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlNode::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub tree: Tree<XmlNode>,
}

fn xml_err(context: &str, err: impl std::fmt::Display) -> ReconcileError {
    ReconcileError::Xml(format!("{context}: {err}"))
}

fn read_element(start: &BytesStart, resolved: &ResolveResult) -> Result<Element, ReconcileError> {
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| xml_err("element name is not UTF-8", e))?;
    let ns = match resolved {
        ResolveResult::Bound(ns) => Namespace::from_uri(ns.as_ref()),
        _ => Namespace::Other,
    };
    let mut element = Element::new(&name, ns);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_err(&format!("bad attribute on <{name}>"), e))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|e| xml_err("attribute name is not UTF-8", e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| xml_err(&format!("bad attribute value {key} on <{name}>"), e))?;
        element.attrs.push((key, value.into_owned()));
    }
    Ok(element)
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self, ReconcileError> {
        let mut reader = NsReader::from_str(xml);
        let mut tree = Tree::new(XmlNode::Document);
        let mut stack: Vec<NodeId> = vec![tree.root().id()];

        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| xml_err("parse error", e))?;
            let parent = *stack.last().unwrap_or(&tree.root().id());
            match event {
                Event::Start(e) => {
                    let element = read_element(&e, &resolved)?;
                    let id = append(&mut tree, parent, XmlNode::Element(element))?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let mut element = read_element(&e, &resolved)?;
                    element.self_closing = true;
                    append(&mut tree, parent, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(ReconcileError::Xml("unbalanced closing tag".to_string()));
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|e| xml_err("bad text", e))?;
                    append_text(&mut tree, parent, &text)?;
                }
                Event::CData(e) => {
                    let text = String::from_utf8(e.into_inner().to_vec())
                        .map_err(|e| xml_err("CDATA is not UTF-8", e))?;
                    append_text(&mut tree, parent, &text)?;
                }
                Event::Comment(e) => {
                    let body = String::from_utf8_lossy(&e).into_owned();
                    append(&mut tree, parent, XmlNode::Raw(format!("<!--{body}-->")))?;
                }
                Event::Decl(e) => {
                    let version = e.version().map_err(|e| xml_err("bad declaration", e))?;
                    let mut decl = format!("<?xml version=\"{}\"", String::from_utf8_lossy(&version));
                    if let Some(Ok(encoding)) = e.encoding() {
                        decl.push_str(&format!(" encoding=\"{}\"", String::from_utf8_lossy(&encoding)));
                    }
                    decl.push_str("?>");
                    append(&mut tree, parent, XmlNode::Raw(decl))?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(ReconcileError::Xml("document ended with unclosed elements".to_string()));
        }
        Ok(Self { tree })
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, XmlNode>> {
        self.tree.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.tree.get(id).and_then(|n| n.value().as_element())
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeRef<'_, XmlNode>> {
        self.tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), XmlNode::Element(_)))
    }

    pub fn find_first(&self, ns: Namespace, local: &str) -> Option<NodeRef<'_, XmlNode>> {
        self.elements()
            .find(|n| n.value().as_element().is_some_and(|el| el.is(ns, local)))
    }

    /// Serializes the whole document.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for child in self.tree.root().children() {
            write_node(child, &mut out);
        }
        out
    }

    /// Concatenated text of the element's direct text children.
    pub fn own_text(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        node.children().filter_map(|n| n.value().as_text()).collect()
    }

    /// Path from the root in the style of `/mets:mets/mets:fileSec/casebody:p[2]`. The
    /// position suffix is only written when same-named siblings exist.
    pub fn path(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(el) = n.value().as_element() {
                let same_named: Vec<NodeId> = match n.parent() {
                    Some(parent) => parent
                        .children()
                        .filter(|c| c.value().as_element().is_some_and(|e| e.name == el.name))
                        .map(|c| c.id())
                        .collect(),
                    None => vec![n.id()],
                };
                if same_named.len() > 1 {
                    let position = same_named.iter().position(|s| *s == n.id()).unwrap_or(0) + 1;
                    segments.push(format!("{}[{}]", el.name, position));
                } else {
                    segments.push(el.name.clone());
                }
            }
            current = n.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Positions among element siblings from the root, e.g. `/1/3/2`. Unlike
    /// [`XmlDocument::path`] it survives renames, so it pairs elements of two versions
    /// of the same document.
    pub fn structural_path(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        let mut positions = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            if n.value().as_element().is_some() {
                let position = n
                    .prev_siblings()
                    .filter(|s| s.value().as_element().is_some())
                    .count()
                    + 1;
                positions.push(position.to_string());
            }
            current = n.parent();
        }
        positions.reverse();
        format!("/{}", positions.join("/"))
    }

    /// Whether the node is the given element or sits below it.
    pub fn is_within(&self, id: NodeId, ns: Namespace, local: &str) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        std::iter::once(node)
            .chain(node.ancestors())
            .any(|n| n.value().as_element().is_some_and(|el| el.is(ns, local)))
    }

    pub fn remove(&mut self, id: NodeId) {
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn append(tree: &mut Tree<XmlNode>, parent: NodeId, value: XmlNode) -> Result<NodeId, ReconcileError> {
    let mut parent = tree
        .get_mut(parent)
        .ok_or_else(|| ReconcileError::Xml("dangling parent while parsing".to_string()))?;
    Ok(parent.append(value).id())
}

fn append_text(tree: &mut Tree<XmlNode>, parent: NodeId, text: &str) -> Result<(), ReconcileError> {
    if text.is_empty() {
        return Ok(());
    }
    let mut parent_node = tree
        .get_mut(parent)
        .ok_or_else(|| ReconcileError::Xml("dangling parent while parsing".to_string()))?;
    if let Some(mut last) = parent_node.last_child() {
        if let XmlNode::Text(existing) = last.value() {
            existing.push_str(text);
            return Ok(());
        }
    }
    parent_node.append(XmlNode::Text(text.to_string()));
    Ok(())
}

fn write_node(node: NodeRef<'_, XmlNode>, out: &mut String) {
    for edge in node.traverse() {
        match edge {
            Edge::Open(n) => match n.value() {
                XmlNode::Element(el) => {
                    out.push('<');
                    out.push_str(&el.name);
                    for (key, value) in &el.attrs {
                        out.push(' ');
                        out.push_str(key);
                        out.push_str("=\"");
                        out.push_str(&escape(value.as_str()));
                        out.push('"');
                    }
                    if el.self_closing && !n.has_children() {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                    }
                }
                XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
                XmlNode::Raw(raw) => out.push_str(raw),
                XmlNode::Document => {}
            },
            Edge::Close(n) => {
                if let XmlNode::Element(el) = n.value() {
                    if !(el.self_closing && !n.has_children()) {
                        out.push_str("</");
                        out.push_str(&el.name);
                        out.push('>');
                    }
                }
            }
        }
    }
}
