use pgsql_interface::{InMemoryRegistry, RelationHandle, RemoteData};

pub const RELATION: &str = "db";
pub const REMOTE_UNIT: &str = "postgresql/0";

/// Taken from an actual relation with the postgresql charm
pub const REAL_MASTER: &str =
    "dbname=hello-juju_hello-juju host=10.210.24.14 password=PASS port=5432 user=juju_hello-juju";

pub fn remote_data(pairs: &[(&str, &str)]) -> RemoteData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Registry with one `db` relation to `postgresql/0` seeded with `data`.
pub fn single_relation(data: RemoteData) -> (InMemoryRegistry, RelationHandle) {
    let mut registry = InMemoryRegistry::new();
    let id = registry.create_relation(RELATION, REMOTE_UNIT, data);
    let handle = registry.handle(id).cloned().expect("relation just created");
    (registry, handle)
}

#[allow(dead_code)]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("pgsql_interface=debug")
        .with_test_writer()
        .try_init()
        .ok();
}
