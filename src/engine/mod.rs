pub mod propagate;
pub mod style_merge;
pub mod validate;

pub use propagate::update_case_alto_unified;
pub use style_merge::{merge_styles, strip_style_tags};
pub use validate::{validate_case, validate_document};
