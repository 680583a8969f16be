use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconcileError {
    /// A casebody element could not be resolved to a loaded ALTO page.
    #[error("Linkage error for element {element_id}: {reason}")]
    Linkage { element_id: String, reason: String },

    /// The case is duplicative and has no casebody to reconcile.
    #[error("Duplicative case {0}: no casebody data to merge")]
    DuplicativeCase(String),

    /// Strict style merge could not align an element exactly.
    #[error("Mismatch in element {element_id}: {description}")]
    Mismatch {
        element_id: String,
        description: String,
    },

    /// Style merge changed the underlying text of the document.
    #[error("Style merge altered casebody text:\n{diff}")]
    IntegrityCheck { diff: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Config error: {0}")]
    Config(String),
}
