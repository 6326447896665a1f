//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod aggregator;
mod authorization;
mod sync;

pub use aggregator::AccountAggregator;
pub use authorization::{AuthorizationLink, AuthorizationService, RequisitionStatus};
pub use sync::SyncService;
