pub mod engine;
pub mod jmap;
pub mod query;
pub mod types;

pub use engine::{MailEngine, SyncResult};
pub use jmap::{JmapEngine, JmapSession};
pub use query::{EmailQuery, QueryStatus};
