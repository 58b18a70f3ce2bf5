//! Master change notifications.
//!
//! Every [`PostgreSqlClient`](crate::PostgreSqlClient) owns its own
//! [`ClientEvents`] channel; observers registered on one client never see
//! another client's notifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Emitted when the remote peer publishes a master different from the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterChanged {
    /// The new libpq connection string
    pub master: String,
}

impl MasterChanged {
    pub fn new(master: impl Into<String>) -> Self {
        Self {
            master: master.into(),
        }
    }
}

type Observer = Box<dyn FnMut(&MasterChanged) + Send>;

/// Notification channel delivering [`MasterChanged`] to registered observers.
///
/// Delivery is synchronous, in registration order, in emission order.
#[derive(Default)]
pub struct ClientEvents {
    master_changed: Vec<Observer>,
}

impl ClientEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&MasterChanged) + Send + 'static,
    {
        self.master_changed.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.master_changed.len()
    }

    pub(crate) fn emit(&mut self, event: &MasterChanged) {
        for observer in self.master_changed.iter_mut() {
            observer(event);
        }
    }
}

impl fmt::Debug for ClientEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEvents")
            .field("master_changed", &self.master_changed.len())
            .finish()
    }
}
