//! Application use cases / business logic

pub mod generate;
pub mod publish;
pub mod scheduler;

pub use generate::GenerateDrafts;
pub use publish::{PublishConfig, PublishOrchestrator, PublishPostError};
pub use scheduler::{Scheduler, TickOutcome};
