//! Translation of watcher events into route event kinds

use k8s_openapi::api::core::v1::Namespace;
use kube::{Resource, ResourceExt};
use kube_runtime::watcher::Event;
use router_core::{EventKind, NamespaceSet};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn object_key<K: Resource>(obj: &K) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

/// Turns a watcher stream into Added/Modified/Deleted events.
///
/// The first sighting of an object is Added and later ones Modified. After
/// a relist, objects that were not listed again are reported Deleted.
pub struct WatchTranslator<K> {
    known: HashMap<String, K>,
    relisted: Option<HashSet<String>>,
}

impl<K> Default for WatchTranslator<K> {
    fn default() -> Self {
        Self {
            known: HashMap::new(),
            relisted: None,
        }
    }
}

impl<K> WatchTranslator<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn translate(&mut self, event: Event<K>) -> Vec<(EventKind, K)> {
        match event {
            Event::Apply(obj) => vec![self.apply(obj)],
            Event::Delete(obj) => {
                self.known.remove(&object_key(&obj));
                vec![(EventKind::Deleted, obj)]
            }
            Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(obj) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(object_key(&obj));
                }
                vec![self.apply(obj)]
            }
            Event::InitDone => {
                let Some(relisted) = self.relisted.take() else {
                    return Vec::new();
                };
                let gone: Vec<String> = self
                    .known
                    .keys()
                    .filter(|key| !relisted.contains(*key))
                    .cloned()
                    .collect();
                if !gone.is_empty() {
                    debug!("{} objects disappeared during relist", gone.len());
                }
                gone.into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(|obj| (EventKind::Deleted, obj))
                    .collect()
            }
        }
    }

    fn apply(&mut self, obj: K) -> (EventKind, K) {
        let kind = match self.known.insert(object_key(&obj), obj.clone()) {
            Some(_) => EventKind::Modified,
            None => EventKind::Added,
        };
        (kind, obj)
    }
}

/// Tracks the names of the namespaces matching the router's selector.
///
/// Nothing is reported until the first full listing completes; after that
/// every change to the set is reported once.
#[derive(Debug, Default)]
pub struct NamespaceWatch {
    names: NamespaceSet,
    relisted: Option<NamespaceSet>,
    synced: bool,
}

impl NamespaceWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a watcher event, returning the new set if it changed
    pub fn apply(&mut self, event: Event<Namespace>) -> Option<NamespaceSet> {
        match event {
            Event::Apply(ns) => {
                if !self.names.insert(ns.name_any()) {
                    return None;
                }
            }
            Event::Delete(ns) => {
                if !self.names.remove(&ns.name_any()) {
                    return None;
                }
            }
            Event::Init => {
                self.relisted = Some(NamespaceSet::new());
                return None;
            }
            Event::InitApply(ns) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(ns.name_any());
                }
                return None;
            }
            Event::InitDone => {
                let relisted = self.relisted.take()?;
                if self.synced && relisted == self.names {
                    return None;
                }
                self.names = relisted;
                self.synced = true;
            }
        }

        if !self.synced {
            return None;
        }
        Some(self.names.clone())
    }
}
