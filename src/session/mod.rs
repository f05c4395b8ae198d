//! Session lifecycle tracking
//!
//! ```text
//!  Uninitialized -> Initialized -> SceneCreated -> EntitiesAdded -> Built -> Stepping
//!                   (one-shot)                     (pre-build)     (one-shot) (post-build)
//! ```
//!
//! [`SessionState`] records which stages the engine has actually completed,
//! fed by a [`StageDetector`]. [`ConversationHistory`] keeps the turn log that
//! goes back into the next prompt.

pub mod constraints;
pub mod detector;
pub mod history;
pub mod stage;
pub mod state;

pub use constraints::{ConstraintCatalog, ConstraintKind};
pub use detector::{OutputStageDetector, SourceStageDetector, StageDetector};
pub use history::{ConversationHistory, ConversationTurn, TurnOutcome, FRESH_SESSION_CONTEXT};
pub use stage::Stage;
pub use state::SessionState;
