//! doctalk-session
//!
//! Conversation and upload orchestration: the state the presenter renders,
//! and the operations it forwards user intents into.
//!
//! Every component owns its state explicitly. Transitions are synchronous;
//! the only suspension points are backend round-trips, and every completion
//! re-checks a generation stamp before it is applied.

pub mod directory;
pub mod error;
pub mod registry;
pub mod session;
pub mod transition;
pub mod upload;

pub use directory::{DirectoryEntry, SessionDirectory};
pub use error::{ErrorKind, Failure, SessionError};
pub use registry::DocumentRegistry;
pub use session::ConversationSession;
pub use transition::{Completion, PendingOp, SessionSnapshot, SessionStatus};
pub use upload::{UploadCoordinator, UploadOutcome, UploadSnapshot};
