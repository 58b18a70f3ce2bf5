//! Client side of the `pgsql` relation.
//!
//! [`PostgreSqlClient`] remembers the last master connection string the
//! PostgreSQL peer published and raises [`MasterChanged`] whenever it moves.
//!
//! # Example
//!
//! ```rust
//! use pgsql_interface::{InMemoryRegistry, PostgreSqlClient, RelationLinkState, RemoteData};
//!
//! let mut registry = InMemoryRegistry::new();
//! registry.create_relation("db", "postgresql/0", RemoteData::new());
//!
//! let mut client = PostgreSqlClient::new("db", RelationLinkState::default());
//! client.observe(|event| println!("new master: {}", event.master));
//!
//! let mut data = RemoteData::new();
//! data.insert("master".to_string(), "dbname=app host=10.0.0.5 port=5432".to_string());
//! assert!(client.on_relation_updated(&data).is_some());
//!
//! let master = client.master(&registry).unwrap();
//! assert_eq!(master.database().unwrap(), "app");
//! ```

use crate::connection_string::ConnectionString;
use crate::events::{ClientEvents, MasterChanged};
use crate::relation::{RelationBroken, RelationChanged, RelationRegistry, RemoteData};
use crate::state::RelationLinkState;
use crate::{BlockedReason, Error, Result};
use tracing::{debug, info, warn};

/// Key the PostgreSQL charm publishes its master connection string under.
pub const MASTER_KEY: &str = "master";

pub struct PostgreSqlClient {
    name: String,
    state: RelationLinkState,
    events: ClientEvents,
}

impl PostgreSqlClient {
    /// Creates the client for endpoint `name`, resuming from `state`.
    pub fn new(name: impl Into<String>, state: RelationLinkState) -> Self {
        Self {
            name: name.into(),
            state,
            events: ClientEvents::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current durable state; the host persists this after each event.
    pub fn state(&self) -> &RelationLinkState {
        &self.state
    }

    pub fn events_mut(&mut self) -> &mut ClientEvents {
        &mut self.events
    }

    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&MasterChanged) + Send + 'static,
    {
        self.events.observe(observer);
    }

    /// Connection information for the current PostgreSQL master.
    ///
    /// # Errors
    ///
    /// - [`Error::Blocked`] when no relation, or more than one, is established.
    /// - [`Error::Waiting`] when the single relation has not published a master yet.
    pub fn master<R: RelationRegistry + ?Sized>(&self, registry: &R) -> Result<ConnectionString> {
        let relations = registry.relations(&self.name);

        match relations.len() {
            1 => match &self.state.master {
                Some(master) => Ok(ConnectionString::new(master.as_str())),
                None => {
                    debug!(relation = %self.name, "Master not published yet");
                    Err(Error::Waiting {
                        message: "master not ready yet".to_string(),
                        relation: self.name.clone(),
                    })
                }
            },
            0 => Err(self.blocked(BlockedReason::MissingRelation)),
            count => {
                warn!(relation = %self.name, count, "Related to more than one application");
                Err(self.blocked(BlockedReason::TooManyRelations))
            }
        }
    }

    fn blocked(&self, reason: BlockedReason) -> Error {
        Error::Blocked {
            reason,
            relation: self.name.clone(),
        }
    }

    /// Handles a data snapshot published by one remote peer.
    ///
    /// A snapshot without a `master` key carries no new information and
    /// leaves the state alone. Returns the notification when one was emitted.
    pub fn on_relation_updated(&mut self, data: &RemoteData) -> Option<MasterChanged> {
        let master = data.get(MASTER_KEY)?;

        if self.state.master.as_deref() == Some(master.as_str()) {
            debug!(relation = %self.name, "Master unchanged");
            return None;
        }

        info!(
            relation = %self.name,
            master = ?ConnectionString::new(master.as_str()),
            "Master changed"
        );
        self.state.master = Some(master.clone());

        let event = MasterChanged::new(master.as_str());
        self.events.emit(&event);
        Some(event)
    }

    /// Handles a relation-changed event by reading the remote unit's data from `registry`.
    pub fn on_relation_changed<R: RelationRegistry + ?Sized>(
        &mut self,
        registry: &R,
        event: &RelationChanged,
    ) -> Result<Option<MasterChanged>> {
        let data = registry.remote_data(&event.relation, &event.unit)?;
        Ok(self.on_relation_updated(&data))
    }

    /// Handles relation teardown. The stored master is kept.
    pub fn on_relation_broken(&mut self, event: &RelationBroken) {
        debug!(
            relation = %self.name,
            id = event.relation.id,
            app = %event.relation.app,
            "Relation broken"
        );
    }
}

impl std::fmt::Debug for PostgreSqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgreSqlClient")
            .field("name", &self.name)
            .field("has_master", &self.state.master.is_some())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::InMemoryRegistry;
    use std::sync::{Arc, Mutex};

    const M1: &str = "dbname=d host=h1 password=p1 port=5432 user=u";
    const M2: &str = "dbname=d host=h1 password=p2 port=5432 user=u";

    fn master_data(master: &str) -> RemoteData {
        let mut data = RemoteData::new();
        data.insert(MASTER_KEY.to_string(), master.to_string());
        data
    }

    fn recording_client(state: RelationLinkState) -> (PostgreSqlClient, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut client = PostgreSqlClient::new("db", state);
        let sink = Arc::clone(&seen);
        client.observe(move |event| sink.lock().unwrap().push(event.master.clone()));
        (client, seen)
    }

    fn registry_with(count: usize) -> InMemoryRegistry {
        let mut registry = InMemoryRegistry::new();
        for i in 0..count {
            registry.create_relation("db", &format!("postgresql{}/0", i), RemoteData::new());
        }
        registry
    }

    #[test]
    fn test_master_missing_relation() {
        let client = PostgreSqlClient::new("db", RelationLinkState::default());

        match client.master(&registry_with(0)) {
            Err(Error::Blocked { reason, relation }) => {
                assert_eq!(reason, BlockedReason::MissingRelation);
                assert_eq!(relation, "db");
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_master_too_many_relations() {
        let client = PostgreSqlClient::new("db", RelationLinkState::with_master(M1));

        let err = client.master(&registry_with(2)).unwrap_err();
        assert!(matches!(
            err,
            Error::Blocked {
                reason: BlockedReason::TooManyRelations,
                ..
            }
        ));
        assert_eq!(err.to_string(), "too many related applications: db");
    }

    #[test]
    fn test_master_not_ready() {
        let client = PostgreSqlClient::new("db", RelationLinkState::default());

        let err = client.master(&registry_with(1)).unwrap_err();
        assert!(err.is_waiting());
        assert_eq!(err.to_string(), "master not ready yet: db");
    }

    #[test]
    fn test_master_ready() {
        let client = PostgreSqlClient::new("db", RelationLinkState::with_master(M1));

        let master = client.master(&registry_with(1)).unwrap();
        assert_eq!(master.database().unwrap(), "d");
        assert_eq!(master.as_str(), M1);
    }

    #[test]
    fn test_only_counts_own_endpoint() {
        let mut registry = registry_with(1);
        registry.create_relation("other", "postgresql9/0", RemoteData::new());
        let client = PostgreSqlClient::new("db", RelationLinkState::with_master(M1));

        assert!(client.master(&registry).is_ok());
    }

    #[test]
    fn test_first_master_emits() {
        let (mut client, seen) = recording_client(RelationLinkState::default());

        let event = client.on_relation_updated(&master_data(M1)).unwrap();
        assert_eq!(event.master, M1);
        assert_eq!(client.state().master.as_deref(), Some(M1));
        assert_eq!(*seen.lock().unwrap(), vec![M1.to_string()]);
    }

    #[test]
    fn test_repeated_master_is_silent() {
        let (mut client, seen) = recording_client(RelationLinkState::default());

        assert!(client.on_relation_updated(&master_data(M1)).is_some());
        assert!(client.on_relation_updated(&master_data(M1)).is_none());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_changed_password_emits_once() {
        let (mut client, seen) = recording_client(RelationLinkState::with_master(M1));

        assert!(client.on_relation_updated(&master_data(M2)).is_some());
        assert_eq!(*seen.lock().unwrap(), vec![M2.to_string()]);

        let master = client.master(&registry_with(1)).unwrap();
        assert_eq!(master.password().unwrap(), "p2");
        assert_eq!(master.database().unwrap(), "d");
        assert_eq!(master.host().unwrap(), "h1");
    }

    #[test]
    fn test_absent_master_key_changes_nothing() {
        let (mut client, seen) = recording_client(RelationLinkState::with_master(M1));

        assert!(client.on_relation_updated(&RemoteData::new()).is_none());
        assert_eq!(client.state().master.as_deref(), Some(M1));

        let (mut fresh, fresh_seen) = recording_client(RelationLinkState::default());
        let mut other = RemoteData::new();
        other.insert("allowed-subnets".to_string(), "10.0.0.0/24".to_string());
        assert!(fresh.on_relation_updated(&other).is_none());
        assert!(fresh.state().master.is_none());

        assert!(seen.lock().unwrap().is_empty());
        assert!(fresh_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_observers_are_per_instance() {
        let (mut first, first_seen) = recording_client(RelationLinkState::default());
        let (_second, second_seen) = recording_client(RelationLinkState::default());

        first.on_relation_updated(&master_data(M1));

        assert_eq!(first_seen.lock().unwrap().len(), 1);
        assert!(second_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_relation_changed_reads_registry() {
        let mut registry = InMemoryRegistry::new();
        let id = registry.create_relation("db", "postgresql/0", RemoteData::new());
        let relation = registry.handle(id).unwrap().clone();
        let (mut client, seen) = recording_client(RelationLinkState::default());

        let event = RelationChanged {
            relation: relation.clone(),
            unit: "postgresql/0".to_string(),
        };
        assert!(client.on_relation_changed(&registry, &event).unwrap().is_none());

        registry.set_relation_data(id, "postgresql/0", master_data(M1)).unwrap();
        let emitted = client.on_relation_changed(&registry, &event).unwrap();
        assert_eq!(emitted, Some(MasterChanged::new(M1)));
        assert_eq!(seen.lock().unwrap().len(), 1);

        let stranger = RelationChanged {
            relation,
            unit: "stranger/0".to_string(),
        };
        assert!(matches!(
            client.on_relation_changed(&registry, &stranger),
            Err(Error::Host(_))
        ));
    }

    #[test]
    fn test_relation_broken_keeps_master() {
        let mut registry = registry_with(1);
        let (mut client, seen) = recording_client(RelationLinkState::with_master(M1));

        let relation = registry.remove_relation(0).unwrap();
        client.on_relation_broken(&RelationBroken { relation });

        assert_eq!(client.state().master.as_deref(), Some(M1));
        assert!(seen.lock().unwrap().is_empty());
        assert!(client.master(&registry).unwrap_err().is_blocked());
    }
}
