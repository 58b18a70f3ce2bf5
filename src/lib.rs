pub mod client;
pub mod config;
pub mod connection_string;
pub mod error;
pub mod events;
pub mod relation;
pub mod state;

pub use client::PostgreSqlClient;
pub use config::Config;
pub use connection_string::ConnectionString;
pub use error::{BlockedReason, Error, Result, Status, StatusKind};
pub use events::{ClientEvents, MasterChanged};
pub use relation::{InMemoryRegistry, RelationBroken, RelationChanged, RelationHandle, RelationRegistry, RemoteData};
pub use state::{RelationLinkState, StateManager};
