pub mod config;
pub mod domain;
pub mod errors;
pub mod password;
pub mod timezone;

pub use domain::candidate::TaskCandidate;
pub use domain::task::{Priority, Task, TaskDraft, TaskId, TaskStatus};
pub use domain::user::{ContactAlias, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use timezone::ReferenceZone;
