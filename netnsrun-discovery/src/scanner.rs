//! One-pass namespace enumeration

use netnsrun_core::{NamespaceEntry, NamespaceId, ProcessRecord, Result};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::config::DiscoveryConfig;
use crate::policy::RepresentativePolicy;
use crate::procfs::ProcFs;
use crate::source::ProcessSource;

/// Distinct network namespaces, one representative each
#[derive(Debug, Clone, Default)]
pub struct NamespaceCollection {
    entries: HashMap<NamespaceId, NamespaceEntry>,
}

impl NamespaceCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scanned process in, applying `policy` on collisions
    ///
    /// Returns `true` if the record became the representative.
    pub fn fold(&mut self, record: ProcessRecord, policy: &RepresentativePolicy) -> bool {
        match self.entries.entry(record.namespace.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record.into());
                true
            }
            Entry::Occupied(mut slot) => {
                if policy.prefers(&record, slot.get()) {
                    tracing::trace!(
                        namespace = %record.namespace,
                        old = %slot.get().representative,
                        new = %record.pid,
                        "Replacing representative"
                    );
                    slot.insert(record.into());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Number of distinct namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no namespace was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a namespace
    #[must_use]
    pub fn get(&self, namespace: &NamespaceId) -> Option<&NamespaceEntry> {
        self.entries.get(namespace)
    }

    /// Iterate entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.entries.values()
    }

    /// Entries ordered by representative pid
    #[must_use]
    pub fn by_representative(&self) -> Vec<&NamespaceEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.representative);
        entries
    }
}

/// Walks every process of a [`ProcessSource`] into a [`NamespaceCollection`]
pub struct NamespaceScanner {
    source: Arc<dyn ProcessSource>,
    policy: RepresentativePolicy,
}

impl NamespaceScanner {
    /// Create a scanner over any process source
    #[must_use]
    pub fn new(source: Arc<dyn ProcessSource>, config: &DiscoveryConfig) -> Self {
        Self {
            source,
            policy: RepresentativePolicy::new(config.anchor_command.clone()),
        }
    }

    /// Create a scanner over the configured proc mount
    #[must_use]
    pub fn procfs(config: &DiscoveryConfig) -> Self {
        Self::new(Arc::new(ProcFs::new(config.proc_root.clone())), config)
    }

    /// Policy applied to namespace collisions
    #[must_use]
    pub const fn policy(&self) -> &RepresentativePolicy {
        &self.policy
    }

    /// Enumerate every distinct network namespace
    ///
    /// Any process whose namespace cannot be resolved aborts the scan: a
    /// namespace missed here would never be visited. Unreadable command
    /// lines only leave the record without one.
    ///
    /// # Errors
    /// Returns [`netnsrun_core::Error::ProcessList`] or
    /// [`netnsrun_core::Error::NamespaceResolution`]
    pub async fn scan(&self) -> Result<NamespaceCollection> {
        let pids = self.source.pids().await?;
        tracing::debug!(processes = pids.len(), "Scanning processes");

        let mut collection = NamespaceCollection::new();
        for pid in pids {
            let namespace = self.source.net_namespace(pid).await.inspect_err(|e| {
                tracing::error!(pid = %pid, error = %e, "Namespace resolution failed");
            })?;

            let cmdline = match self.source.cmdline(pid).await {
                Ok(args) => Some(args),
                Err(e) => {
                    tracing::debug!(pid = %pid, error = %e, "No command line");
                    None
                }
            };

            collection.fold(
                ProcessRecord {
                    pid,
                    namespace,
                    cmdline,
                },
                &self.policy,
            );
        }

        tracing::info!(namespaces = collection.len(), "Namespace scan complete");
        Ok(collection)
    }
}
