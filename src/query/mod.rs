//! Query handlers
//!
//! Read-model lookups with on-miss rebuild from events, point-in-time
//! reconstruction, and raw event history.

mod events_history;
mod get_by_email;
mod get_by_id;
mod get_by_version;

pub use events_history::{EventRecord, EventsHistory, EventsHistoryHandler, EventsHistoryQuery};
pub use get_by_email::{GetByEmailHandler, GetByEmailQuery};
pub use get_by_id::{GetByIdHandler, GetByIdQuery};
pub use get_by_version::{GetByVersionHandler, GetByVersionQuery};
