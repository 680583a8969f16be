pub const CASE_NS: &str = "http://nrs.harvard.edu/urn-3:HLS.Libr.US_Case_Law.Schema.Case:v1";
pub const CASEBODY_NS: &str = "http://nrs.harvard.edu/urn-3:HLS.Libr.US_Case_Law.Schema.Case_Body:v1";
pub const DUPLICATIVE_NS: &str =
    "http://nrs.harvard.edu/urn-3:HLS.Libr.US_Case_Law.Schema.Case_Body_Duplicative:v1";
pub const METS_NS: &str = "http://www.loc.gov/METS/";
pub const ALTO_NS_PREFIX: &str = "http://www.loc.gov/standards/alto/";

/// The vocabularies the engine distinguishes between. Resolved once per element
/// when a document is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Case,
    Casebody,
    Duplicative,
    Mets,
    Alto,
    Other,
}

impl Namespace {
    pub fn from_uri(uri: &[u8]) -> Self {
        match uri {
            u if u == CASE_NS.as_bytes() => Namespace::Case,
            u if u == CASEBODY_NS.as_bytes() => Namespace::Casebody,
            u if u == DUPLICATIVE_NS.as_bytes() => Namespace::Duplicative,
            u if u == METS_NS.as_bytes() => Namespace::Mets,
            u if u.starts_with(ALTO_NS_PREFIX.as_bytes()) => Namespace::Alto,
            _ => Namespace::Other,
        }
    }
}
