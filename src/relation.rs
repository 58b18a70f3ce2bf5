//! Host relation model.
//!
//! The client never walks the host's model directly. It asks a
//! [`RelationRegistry`] for the relations established on an endpoint and
//! for the data a remote peer has published on one of them.

use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Key/value data published by one remote unit or application.
pub type RemoteData = BTreeMap<String, String>;

/// An established relation on a named endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationHandle {
    pub id: u32,
    /// Endpoint name, e.g. `db`
    pub name: String,
    /// Remote application name, e.g. `postgresql`
    pub app: String,
}

/// A remote unit changed its published data on `relation`.
#[derive(Debug, Clone)]
pub struct RelationChanged {
    pub relation: RelationHandle,
    /// Remote unit name, e.g. `postgresql/0`
    pub unit: String,
}

/// `relation` was torn down.
#[derive(Debug, Clone)]
pub struct RelationBroken {
    pub relation: RelationHandle,
}

/// Query interface onto the host's relation state.
pub trait RelationRegistry {
    /// Relations currently established on the endpoint `name`.
    fn relations(&self, name: &str) -> Vec<RelationHandle>;

    /// Snapshot of the data `peer` has published on `relation`.
    fn remote_data(&self, relation: &RelationHandle, peer: &str) -> Result<RemoteData>;
}

#[derive(Debug)]
struct RelationEntry {
    handle: RelationHandle,
    units: Vec<String>,
    data: HashMap<String, RemoteData>,
}

/// A [`RelationRegistry`] backed by in-process maps.
///
/// Used when no orchestration host is present: by the command line harness
/// and by tests.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    next_id: u32,
    relations: BTreeMap<u32, RelationEntry>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes a relation on endpoint `name` with a single remote unit,
    /// seeded with that unit's published data. Returns the new relation id.
    pub fn create_relation(&mut self, name: &str, remote_unit: &str, remote_unit_data: RemoteData) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let app = remote_unit.split('/').next().unwrap_or(remote_unit).to_string();
        let handle = RelationHandle {
            id,
            name: name.to_string(),
            app,
        };

        let mut data = HashMap::new();
        data.insert(remote_unit.to_string(), remote_unit_data);
        data.insert(handle.app.clone(), RemoteData::new());

        debug!(id, name, remote_unit, "Created relation");
        self.relations.insert(
            id,
            RelationEntry {
                handle,
                units: vec![remote_unit.to_string()],
                data,
            },
        );
        id
    }

    /// Replaces the data published by `peer` (a unit or application name) on relation `id`.
    pub fn set_relation_data(&mut self, id: u32, peer: &str, data: RemoteData) -> Result<()> {
        let entry = self
            .relations
            .get_mut(&id)
            .ok_or_else(|| Error::Host(format!("unknown relation id {}", id)))?;
        entry.data.insert(peer.to_string(), data);
        Ok(())
    }

    pub fn remove_relation(&mut self, id: u32) -> Result<RelationHandle> {
        self.relations
            .remove(&id)
            .map(|entry| entry.handle)
            .ok_or_else(|| Error::Host(format!("unknown relation id {}", id)))
    }

    pub fn handle(&self, id: u32) -> Option<&RelationHandle> {
        self.relations.get(&id).map(|entry| &entry.handle)
    }

    /// Remote units that joined relation `id`.
    pub fn units(&self, id: u32) -> &[String] {
        self.relations
            .get(&id)
            .map(|entry| entry.units.as_slice())
            .unwrap_or(&[])
    }
}

impl RelationRegistry for InMemoryRegistry {
    fn relations(&self, name: &str) -> Vec<RelationHandle> {
        self.relations
            .values()
            .filter(|entry| entry.handle.name == name)
            .map(|entry| entry.handle.clone())
            .collect()
    }

    fn remote_data(&self, relation: &RelationHandle, peer: &str) -> Result<RemoteData> {
        let entry = self
            .relations
            .get(&relation.id)
            .ok_or_else(|| Error::Host(format!("unknown relation id {}", relation.id)))?;
        entry.data.get(peer).cloned().ok_or_else(|| {
            Error::Host(format!("{} is not a member of relation {}", peer, relation.id))
        })
    }
}
