pub mod announcer;
pub mod checkpoint;
pub mod dispatcher;
pub mod fetcher;
pub mod migrator;
pub mod objects;
pub mod parser;
pub mod postgres;
pub mod retry;
pub mod store;
pub mod sync;
pub mod types;

pub use announcer::Announcer;
pub use checkpoint::CheckpointStore;
pub use dispatcher::{render_message, Deliver, WebhookDispatcher};
pub use fetcher::{FetchFeed, Fetcher};
pub use migrator::Migrator;
pub use objects::{FsObjectStore, MemoryObjectStore, ObjectInfo, ObjectStore};
pub use postgres::PgStore;
pub use store::{KeyedStore, MemoryStore, Record, RecordKey};
pub use types::*;
