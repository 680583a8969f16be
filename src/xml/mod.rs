pub mod namespace;
pub mod tree;

pub use namespace::Namespace;
pub use tree::{Element, XmlDocument, XmlNode};
