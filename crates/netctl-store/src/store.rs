use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use netctl_types::{LocalUnderlayState, NodeSettings, WireGuardKeyPair};

use crate::document::{Document, SimpleKvEntry};
use crate::StoreError;

const NODECONFIG_NAMESPACE: &str = "namespace";
const NODECONFIG_ETH_NAME: &str = "eth_name";
const NODECONFIG_PRIVATE_KEY: &str = "private_key";
const NODECONFIG_NODE_ID: &str = "node_id";
const NODECONFIG_DOMAIN_PREFIX: &str = "domain_prefix";

/// A partial update to [`NodeSettings`]. Only fields set to `Some` are
/// written; this is how the init flow and later config refreshes each
/// contribute a subset of the fields without clobbering the rest.
#[derive(Debug, Clone, Default)]
pub struct PartialNodeSettings {
    pub namespace: Option<String>,
    pub eth_name: Option<String>,
    pub private_key: Option<String>,
    pub node_id: Option<u64>,
    pub domain_prefix: Option<String>,
}

/// The node's persistent store: one JSON document on disk holding node
/// settings, the WireGuard key pool, and generic key-value state (used
/// today only for underlay-worker records).
///
/// Every mutation snapshots the whole document to disk via a temp file
/// plus rename, so a crash mid-write never leaves a corrupt file in
/// place.
pub struct NodeStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl NodeStore {
    /// Opens the store at `path`, loading any existing document. A
    /// missing file starts from an empty document; a corrupt one is an
    /// error rather than silently discarded, since node settings and the
    /// key pool are not safe to regenerate silently.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but isn't valid JSON, or
    /// reading it fails for a reason other than "not found".
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store file yet, starting fresh");
                Document::default()
            }
            Err(error) => return Err(error.into()),
        };
        Ok(Self { path, doc: Mutex::new(doc) })
    }

    fn snapshot(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(doc)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        use std::io::Write;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Assembles [`NodeSettings`] from the `nodeconfig` table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingField`] if any required field hasn't
    /// been written yet, or if `node_id` isn't a valid integer.
    pub fn get_node_settings(&self) -> Result<NodeSettings, StoreError> {
        let doc = self.doc.lock();
        let field = |key: &'static str| {
            doc.nodeconfig.get(key).cloned().ok_or(StoreError::MissingField { field: key })
        };

        let node_id: u64 = field(NODECONFIG_NODE_ID)?
            .parse()
            .map_err(|_| StoreError::MissingField { field: NODECONFIG_NODE_ID })?;

        Ok(NodeSettings {
            namespace: field(NODECONFIG_NAMESPACE)?,
            eth_name: field(NODECONFIG_ETH_NAME)?,
            private_key: field(NODECONFIG_PRIVATE_KEY)?,
            node_id,
            domain_prefix: field(NODECONFIG_DOMAIN_PREFIX)?,
        })
    }

    /// Upserts whichever fields of `partial` are `Some`, leaving the rest
    /// of the `nodeconfig` table untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot write fails.
    pub fn set_node_settings(&self, partial: &PartialNodeSettings) -> Result<(), StoreError> {
        let mut doc = self.doc.lock();
        if let Some(v) = &partial.namespace {
            doc.nodeconfig.insert(NODECONFIG_NAMESPACE.to_string(), v.clone());
        }
        if let Some(v) = &partial.eth_name {
            doc.nodeconfig.insert(NODECONFIG_ETH_NAME.to_string(), v.clone());
        }
        if let Some(v) = &partial.private_key {
            doc.nodeconfig.insert(NODECONFIG_PRIVATE_KEY.to_string(), v.clone());
        }
        if let Some(v) = partial.node_id {
            doc.nodeconfig.insert(NODECONFIG_NODE_ID.to_string(), v.to_string());
        }
        if let Some(v) = &partial.domain_prefix {
            doc.nodeconfig.insert(NODECONFIG_DOMAIN_PREFIX.to_string(), v.clone());
        }
        self.snapshot(&doc)
    }

    /// Adds `pair` to the key pool unless its public key is already
    /// present, matching the table's `UNIQUE(public)` constraint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot write fails.
    pub fn create_wireguard_key(&self, pair: WireGuardKeyPair) -> Result<(), StoreError> {
        let mut doc = self.doc.lock();
        if doc.wgkey.iter().any(|k| k.public == pair.public) {
            return Ok(());
        }
        doc.wgkey.push(pair);
        self.snapshot(&doc)
    }

    /// Returns every key pair currently in the pool.
    #[must_use]
    pub fn get_all_wireguard_keys(&self) -> Vec<WireGuardKeyPair> {
        self.doc.lock().wgkey.clone()
    }

    fn underlay_key(ifname: &str) -> String {
        format!("underlay-worker-{ifname}")
    }

    /// Reads the persisted underlay record for `ifname`, if any.
    ///
    /// An entry whose `expires` has already passed is treated as absent
    /// and pruned from the document; the core itself never sets a TTL on
    /// these records, so in practice this path is unreachable today.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot is present but not valid
    /// [`LocalUnderlayState`] JSON, or if pruning an expired entry fails
    /// to write.
    pub fn get_local_underlay_state(&self, ifname: &str) -> Result<Option<LocalUnderlayState>, StoreError> {
        let key = Self::underlay_key(ifname);
        let mut doc = self.doc.lock();

        let Some(entry) = doc.simplekv.get(&key) else {
            return Ok(None);
        };

        if let Some(expires) = entry.expires {
            if expires <= Utc::now().timestamp() {
                doc.simplekv.remove(&key);
                self.snapshot(&doc)?;
                return Ok(None);
            }
        }

        let state: LocalUnderlayState = serde_json::from_str(&entry.value)?;
        Ok(Some(state))
    }

    /// Persists `state` for `ifname` with no expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if encoding or the snapshot write fails.
    pub fn set_local_underlay_state(&self, ifname: &str, state: &LocalUnderlayState) -> Result<(), StoreError> {
        let value = serde_json::to_string(state)?;
        let mut doc = self.doc.lock();
        doc.simplekv.insert(Self::underlay_key(ifname), SimpleKvEntry { value, expires: None });
        self.snapshot(&doc)
    }

    /// Removes the underlay record for `ifname`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot write fails.
    pub fn delete_local_underlay_state(&self, ifname: &str) -> Result<(), StoreError> {
        let mut doc = self.doc.lock();
        doc.simplekv.remove(&Self::underlay_key(ifname));
        self.snapshot(&doc)
    }

    /// Removes every `simplekv` entry whose `expires` has passed.
    /// Not on any hot path today (see [`Self::get_local_underlay_state`]),
    /// but kept as the generic maintenance sweep a TTL-bearing table needs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot write fails.
    pub fn prune_expired(&self) -> Result<usize, StoreError> {
        let mut doc = self.doc.lock();
        let now = Utc::now().timestamp();
        let before = doc.simplekv.len();
        doc.simplekv.retain(|_, entry| entry.expires.is_none_or(|expires| expires > now));
        let removed = before - doc.simplekv.len();
        if removed > 0 {
            self.snapshot(&doc)?;
            warn!(removed, "pruned expired simplekv entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let store = NodeStore::open(&path).expect("open");
        (dir, store)
    }

    fn full_settings() -> PartialNodeSettings {
        PartialNodeSettings {
            namespace: Some("netA".to_string()),
            eth_name: Some("eth0".to_string()),
            private_key: Some("priv".to_string()),
            node_id: Some(7),
            domain_prefix: Some("https://controller.example".to_string()),
        }
    }

    #[test]
    fn missing_store_file_starts_empty() {
        let (_dir, store) = store();
        assert!(matches!(store.get_node_settings(), Err(StoreError::MissingField { .. })));
    }

    #[test]
    fn partial_upserts_accumulate_into_complete_settings() {
        let (_dir, store) = store();
        store
            .set_node_settings(&PartialNodeSettings { namespace: Some("netA".to_string()), ..Default::default() })
            .expect("set");
        store
            .set_node_settings(&PartialNodeSettings {
                eth_name: Some("eth0".to_string()),
                private_key: Some("priv".to_string()),
                node_id: Some(7),
                domain_prefix: Some("https://controller.example".to_string()),
                ..Default::default()
            })
            .expect("set");

        let settings = store.get_node_settings().expect("complete");
        assert_eq!(settings.namespace, "netA");
        assert_eq!(settings.node_id, 7);
    }

    #[test]
    fn settings_survive_reopening_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        {
            let store = NodeStore::open(&path).expect("open");
            store.set_node_settings(&full_settings()).expect("set");
        }
        let reopened = NodeStore::open(&path).expect("reopen");
        assert_eq!(reopened.get_node_settings().expect("complete").namespace, "netA");
    }

    #[test]
    fn wireguard_key_pool_deduplicates_by_public_key() {
        let (_dir, store) = store();
        let pair = WireGuardKeyPair { private: "p1".to_string(), public: "pub1".to_string() };
        store.create_wireguard_key(pair.clone()).expect("create");
        store.create_wireguard_key(WireGuardKeyPair { private: "different".to_string(), ..pair }).expect("create");
        assert_eq!(store.get_all_wireguard_keys().len(), 1);
    }

    #[test]
    fn underlay_state_round_trips() {
        let (_dir, store) = store();
        let state = LocalUnderlayState::Server { unit_name: "networktools-netA-worker-x".to_string(), listen_port: 8443 };
        store.set_local_underlay_state("netA-p1", &state).expect("set");
        assert_eq!(store.get_local_underlay_state("netA-p1").expect("get"), Some(state));
    }

    #[test]
    fn deleted_underlay_state_is_absent() {
        let (_dir, store) = store();
        let state = LocalUnderlayState::Client {
            unit_name: "u".to_string(),
            listen_port: 1,
            server_ip: "1.2.3.4".to_string(),
            server_port: 2,
        };
        store.set_local_underlay_state("netA-p1", &state).expect("set");
        store.delete_local_underlay_state("netA-p1").expect("delete");
        assert_eq!(store.get_local_underlay_state("netA-p1").expect("get"), None);
    }

    #[test]
    fn expired_entry_is_pruned_on_read() {
        let (_dir, store) = store();
        {
            let mut doc = store.doc.lock();
            doc.simplekv.insert(
                NodeStore::underlay_key("netA-p1"),
                SimpleKvEntry { value: "{}".to_string(), expires: Some(0) },
            );
        }
        assert_eq!(store.get_local_underlay_state("netA-p1").expect("get"), None);
        assert!(store.doc.lock().simplekv.is_empty());
    }
}
