#![allow(dead_code)]
use alto_reconcile::alto::AltoSet;
use alto_reconcile::xml::namespace::{CASEBODY_NS, CASE_NS, DUPLICATIVE_NS, METS_NS};

pub const CASE_ID: &str = "32044057891608_0001";

pub fn alto_file_id(page: u32) -> String {
    format!("alto_{page:05}")
}

pub fn block_id(page: u32, element_id: &str) -> String {
    format!("BL_{page}.{element_id}")
}

pub fn word_id(page: u32, element_id: &str, n: usize) -> String {
    format!("ST_{page}.{element_id}.{n}")
}

/// A casebody element and the pages its text is printed on.
#[derive(Debug, Clone)]
pub struct CaseElement {
    pub tag: String,
    pub id: String,
    pub pgmap: String,
    pub inner: String,
    pub pages: Vec<u32>,
}

impl CaseElement {
    pub fn new(tag: &str, id: &str, page: u32, inner: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: id.to_string(),
            pgmap: page.to_string(),
            inner: inner.to_string(),
            pages: vec![page],
        }
    }

    pub fn split(tag: &str, id: &str, pgmap: &str, pages: &[u32], inner: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: id.to_string(),
            pgmap: pgmap.to_string(),
            inner: inner.to_string(),
            pages: pages.to_vec(),
        }
    }
}

fn mets_wrapper(casebody: &str, structure: &str) -> String {
    format!(
        r#"<mets:mets xmlns:mets="{METS_NS}" OBJID="{CASE_ID}"><mets:dmdSec ID="case"><mets:mdWrap MDTYPE="OTHER"><mets:xmlData><case:case xmlns:case="{CASE_NS}" caseid="{CASE_ID}"><case:name>Smith v. Jones</case:name></case:case></mets:xmlData></mets:mdWrap></mets:dmdSec><mets:fileSec><mets:fileGrp USE="casebody"><mets:file ID="casebody_0001"><mets:FContent><mets:xmlData>{casebody}</mets:xmlData></mets:FContent></mets:file></mets:fileGrp></mets:fileSec><mets:structMap TYPE="logical"><mets:div TYPE="case">{structure}</mets:div></mets:structMap></mets:mets>"#
    )
}

fn structure_div(element: &CaseElement) -> String {
    let alto_areas: String = element
        .pages
        .iter()
        .map(|page| {
            format!(
                r#"<mets:area BEGIN="{}" FILEID="{}" BETYPE="IDREF"/>"#,
                block_id(*page, &element.id),
                alto_file_id(*page)
            )
        })
        .collect();
    format!(
        r#"<mets:div TYPE="element"><mets:fptr><mets:area BEGIN="{}" FILEID="casebody_0001" BETYPE="IDREF"/></mets:fptr><mets:fptr><mets:seq>{alto_areas}</mets:seq></mets:fptr></mets:div>"#,
        element.id
    )
}

/// A METS case file whose casebody holds `elements`, linked to ALTO blocks built by
/// [`alto_page`].
pub fn case_xml(elements: &[CaseElement]) -> String {
    let body: String = elements
        .iter()
        .map(|e| {
            format!(
                r#"<casebody:{tag} id="{id}" pgmap="{pgmap}">{inner}</casebody:{tag}>"#,
                tag = e.tag,
                id = e.id,
                pgmap = e.pgmap,
                inner = e.inner
            )
        })
        .collect();
    let casebody = format!(
        r#"<casebody:casebody xmlns:casebody="{CASEBODY_NS}" firstpage="17" lastpage="18">{body}</casebody:casebody>"#
    );
    let structure: String = elements.iter().map(structure_div).collect();
    mets_wrapper(&casebody, &structure)
}

pub fn duplicative_case_xml() -> String {
    let casebody = format!(
        r#"<duplicative:casebody xmlns:duplicative="{DUPLICATIVE_NS}" firstpage="17" lastpage="17"/>"#
    );
    mets_wrapper(&casebody, "")
}

/// One word of an ALTO block: its content and the style it is printed in.
#[derive(Debug, Clone, Copy)]
pub enum Word<'a> {
    Plain(&'a str),
    Bold(&'a str),
    Italic(&'a str),
    BoldItalic(&'a str),
}

impl<'a> Word<'a> {
    fn parts(&self) -> (&'a str, &'static str) {
        match *self {
            Word::Plain(w) => (w, "TXT_0"),
            Word::Bold(w) => (w, "TXT_1"),
            Word::Italic(w) => (w, "TXT_2"),
            Word::BoldItalic(w) => (w, "TXT_3"),
        }
    }
}

pub fn plain<'a>(words: &[&'a str]) -> Vec<Word<'a>> {
    words.iter().map(|w| Word::Plain(*w)).collect()
}

/// ALTO text of one element on one page.
#[derive(Debug, Clone)]
pub struct AltoBlock<'a> {
    pub element_id: &'a str,
    /// `LABEL` of the element's `StructureTag`; `None` leaves the tag out.
    pub label: Option<&'a str>,
    pub words: Vec<Word<'a>>,
}

pub fn block<'a>(element_id: &'a str, words: Vec<Word<'a>>) -> AltoBlock<'a> {
    AltoBlock {
        element_id,
        label: None,
        words,
    }
}

pub fn alto_page(page: u32, blocks: &[AltoBlock]) -> String {
    let tags: String = blocks
        .iter()
        .filter_map(|b| {
            b.label
                .map(|label| format!(r#"<StructureTag ID="{}" TYPE="Content" LABEL="{label}"/>"#, b.element_id))
        })
        .collect();
    let text_blocks: String = blocks
        .iter()
        .map(|b| {
            let strings: String = b
                .words
                .iter()
                .enumerate()
                .map(|(n, word)| {
                    let (content, style) = word.parts();
                    format!(
                        r#"<String ID="{}" CONTENT="{content}" HPOS="{}" VPOS="100" WIDTH="40" HEIGHT="12" STYLEREFS="{style}" WC="0.85" CC="{}"/><SP/>"#,
                        word_id(page, b.element_id, n + 1),
                        100 + 50 * n,
                        "5".repeat(content.chars().count())
                    )
                })
                .collect();
            format!(
                r#"<TextBlock ID="{}" TAGREFS="{}"><TextLine>{strings}</TextLine></TextBlock>"#,
                block_id(page, b.element_id),
                b.element_id
            )
        })
        .collect();
    format!(
        r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#"><Styles><TextStyle ID="TXT_0" FONTFAMILY="Times" FONTSIZE="10"/><TextStyle ID="TXT_1" FONTFAMILY="Times" FONTSIZE="10" FONTSTYLE="bold"/><TextStyle ID="TXT_2" FONTFAMILY="Times" FONTSIZE="10" FONTSTYLE="italics"/><TextStyle ID="TXT_3" FONTFAMILY="Times" FONTSIZE="10" FONTSTYLE="bold italics"/></Styles><Tags>{tags}</Tags><Layout><Page ID="PG_{page}" PRINTED_IMG_NR="{page}"><PrintSpace>{text_blocks}</PrintSpace></Page></Layout></alto>"#
    )
}

/// Parses `(page, xml)` pairs into a set keyed by the ALTO file ids the case links to.
pub fn alto_set(pages: &[(u32, String)]) -> AltoSet {
    let ids: Vec<String> = pages.iter().map(|(page, _)| alto_file_id(*page)).collect();
    AltoSet::parse_all(ids.iter().zip(pages).map(|(id, (_, xml))| (id.as_str(), xml.as_str())))
        .expect("fixture ALTO should parse")
}

/// The usual one-element case: `<headnotes id="b17-6">` on page 17.
pub fn headnotes(text: &str) -> String {
    case_xml(&[CaseElement::new("headnotes", "b17-6", 17, text)])
}
