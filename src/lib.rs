pub mod aligner;
pub mod alto;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod types;
pub mod xml;

pub use alto::AltoSet;
pub use config::ReconcileConfig;
pub use error::ReconcileError;
