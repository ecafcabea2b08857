use std::{
    collections::{BTreeMap, btree_map::Entry},
    rc::Rc,
    sync::{Arc, mpsc::Sender},
};

use crate::{
    core::events::SessionEvent,
    log::LogSink,
    peer::{
        peer_connection::PeerConnectionFactory,
        peer_entry::{PeerEntry, PeerOptions},
        peer_error::PeerError,
        peer_event::PeerEventSender,
    },
    signaling::{IceServer, PeerId},
    sink_debug, sink_trace,
};

/// Owned map of peer id to [`PeerEntry`] for one room session.
///
/// An entry exists exactly while its connection exists: entries are only
/// created together with a connection, and [`remove`](Self::remove) closes
/// the connection before dropping the entry.
pub struct PeerRegistry {
    factory: Rc<dyn PeerConnectionFactory>,
    ice_servers: Vec<IceServer>,
    events: Sender<SessionEvent>,
    epoch: u64,
    next_conn_id: u64,
    peers: BTreeMap<PeerId, PeerEntry>,
    log: Arc<dyn LogSink>,
}

impl PeerRegistry {
    pub fn new(
        factory: Rc<dyn PeerConnectionFactory>,
        ice_servers: Vec<IceServer>,
        events: Sender<SessionEvent>,
        epoch: u64,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            factory,
            ice_servers,
            events,
            epoch,
            next_conn_id: 1,
            peers: BTreeMap::new(),
            log,
        }
    }

    pub fn get(&self, peer_id: &str) -> Option<&PeerEntry> {
        self.peers.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &str) -> Option<&mut PeerEntry> {
        self.peers.get_mut(peer_id)
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Returns the entry for `peer_id`, creating it and its connection if
    /// absent. The flag is `true` when a connection was created.
    ///
    /// Calling it again for a live entry never creates a second connection.
    ///
    /// # Errors
    /// The factory's error when a new connection cannot be built; no entry
    /// is left behind in that case.
    pub fn get_or_create(
        &mut self,
        peer_id: &str,
        opts: &PeerOptions,
    ) -> Result<(&mut PeerEntry, bool), PeerError> {
        match self.peers.entry(peer_id.to_owned()) {
            Entry::Occupied(e) => Ok((e.into_mut(), false)),
            Entry::Vacant(v) => {
                let conn_id = self.next_conn_id;
                self.next_conn_id += 1;
                let events =
                    PeerEventSender::new(self.events.clone(), self.epoch, peer_id, conn_id);
                let connection = self.factory.create(peer_id, &self.ice_servers, events)?;
                sink_debug!(
                    self.log,
                    "[peers] created connection #{conn_id} for {peer_id}"
                );
                Ok((v.insert(PeerEntry::new(peer_id, conn_id, connection, opts)), true))
            }
        }
    }

    /// Closes and drops the entry. No-op for unknown ids.
    pub fn remove(&mut self, peer_id: &str) -> bool {
        match self.peers.remove(peer_id) {
            Some(mut entry) => {
                entry.close();
                sink_debug!(
                    self.log,
                    "[peers] removed {peer_id} (connection #{})",
                    entry.conn_id
                );
                true
            }
            None => {
                sink_trace!(self.log, "[peers] remove for unknown {peer_id}");
                false
            }
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &PeerEntry> {
        self.peers.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut PeerEntry> {
        self.peers.values_mut()
    }

    pub fn ids(&self) -> Vec<PeerId> {
        self.peers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Closes every connection and empties the registry.
    pub fn clear(&mut self) {
        for id in self.ids() {
            self.remove(&id);
        }
    }
}

impl Drop for PeerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        peer::PeerConnectionState,
        test_support::{FakeFactory, registry_with},
    };

    #[test]
    fn get_or_create_is_idempotent() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        let (first, created) = reg.get_or_create("p1", &PeerOptions::default()).unwrap();
        assert!(created);
        let conn = first.conn_id();
        let (again, created) = reg.get_or_create("p1", &PeerOptions::default()).unwrap();
        assert!(!created);
        assert_eq!(again.conn_id(), conn);
        assert_eq!(factory.created_for("p1"), 1);
    }

    #[test]
    fn remove_closes_then_recreate_is_fresh() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        let old_conn = reg
            .get_or_create("p1", &PeerOptions::default())
            .unwrap()
            .0
            .conn_id();
        let old_pc = factory.pc("p1");
        assert!(reg.remove("p1"));
        assert!(old_pc.borrow().closed);
        assert_eq!(old_pc.borrow().state, PeerConnectionState::Closed);

        let (entry, created) = reg.get_or_create("p1", &PeerOptions::default()).unwrap();
        assert!(created);
        assert_ne!(entry.conn_id(), old_conn);
        assert!(!factory.pc("p1").borrow().closed);
    }

    #[test]
    fn remove_unknown_is_a_no_op() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        assert!(!reg.remove("ghost"));
        assert!(reg.is_empty());
    }

    #[test]
    fn factory_failure_leaves_no_entry() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        assert!(reg.get_or_create("broken-1", &PeerOptions::default()).is_err());
        assert!(!reg.contains("broken-1"));
    }

    #[test]
    fn roster_options_land_on_new_entries() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        let opts = PeerOptions {
            display_name: Some("Bea".into()),
            muted: true,
            is_host: true,
        };
        let (entry, _) = reg.get_or_create("p2", &opts).unwrap();
        assert_eq!(entry.display_name(), "Bea");
        assert!(entry.is_muted() && entry.is_host());
    }

    #[test]
    fn clear_closes_everything() {
        let factory = FakeFactory::new();
        let (mut reg, _rx) = registry_with(&factory);
        for id in ["a", "b"] {
            reg.get_or_create(id, &PeerOptions::default()).unwrap();
        }
        reg.clear();
        assert!(reg.is_empty());
        assert!(factory.pc("a").borrow().closed && factory.pc("b").borrow().closed);
    }
}
