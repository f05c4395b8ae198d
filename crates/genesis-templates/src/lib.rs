//! Genesis code template corpus
//!
//! Few-shot snippets grouped by category, embedded at compile time and ranked
//! against a natural-language request. The corpus is read-only after load.
//!
//! ```ignore
//! let registry = TemplateRegistry::builtin()?;
//! let keywords = extract_keywords("drop a ball onto the floor");
//! for hit in registry.search(&keywords, 3) {
//!     println!("{}.{} ({})", hit.template.category, hit.template.name, hit.score);
//! }
//! ```

pub mod definition;
pub mod error;
pub mod keywords;
pub mod registry;

pub use definition::Template;
pub use error::TemplateError;
pub use keywords::{expand_keywords, extract_keywords, is_robot_request};
pub use registry::{ScoredTemplate, TemplateRegistry};
