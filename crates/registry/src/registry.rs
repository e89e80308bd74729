use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{decode, encode, InMemoryBackend, KvBackend};

use crate::embedding::{validate_identity, Embedding};
use crate::RegistryError;

/// Bump whenever the on-disk [`StoredFace`] layout changes.
pub const REGISTRY_SCHEMA_VERSION: u16 = 1;

/// Storage table holding registered faces.
pub const REGISTRY_TABLE: &str = "face_registry";

/// Default cosine-distance threshold below which two faces are the same person.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.3;

/// Registry configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryConfig {
    /// Embedding length produced by the deployed embedder.
    pub dimension: usize,
    /// Faces closer than this distance to a stored face are rejected.
    pub duplicate_threshold: f64,
}

impl RegistryConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
        }
    }

    pub fn with_duplicate_threshold(mut self, threshold: f64) -> Self {
        self.duplicate_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.dimension == 0 {
            return Err(RegistryError::Configuration(
                "dimension must be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.duplicate_threshold) {
            return Err(RegistryError::Configuration(format!(
                "duplicate_threshold must be within [0, 2], got {}",
                self.duplicate_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredFace {
    schema_version: u16,
    identity: String,
    values: Vec<f32>,
    registered_at: DateTime<Utc>,
}

/// The nearest stored face to a probe.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub identity: String,
    pub distance: f64,
}

/// Immutable view of the registry at one point in time.
///
/// Entries are ordered by identity, which makes every scan deterministic.
#[derive(Clone, Debug)]
pub struct RegistrySnapshot {
    dimension: usize,
    entries: BTreeMap<String, Embedding>,
}

impl RegistrySnapshot {
    fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            entries: BTreeMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &str) -> Option<&Embedding> {
        self.entries.get(identity)
    }

    /// Entries in lexicographic identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Embedding)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Linear scan for the minimum-distance entry.
    ///
    /// Exact ties keep the lexicographically smallest identity: the scan runs
    /// in key order and only a strictly smaller distance replaces the best.
    pub fn nearest(&self, probe: &Embedding) -> Option<Neighbor> {
        let mut best: Option<(&str, f64)> = None;
        for (identity, stored) in self.iter() {
            let distance = probe.distance(stored);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((identity, distance)),
            }
        }
        best.map(|(identity, distance)| Neighbor {
            identity: identity.to_string(),
            distance,
        })
    }

    /// The `k` closest entries ordered by (distance, identity).
    pub fn ranked(&self, probe: &Embedding, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let mut all: Vec<Neighbor> = self
            .iter()
            .map(|(identity, stored)| Neighbor {
                identity: identity.to_string(),
                distance: probe.distance(stored),
            })
            .collect();
        all.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        all.truncate(k);
        all
    }
}

/// Durable identity → embedding store.
pub struct EmbeddingRegistry {
    backend: Box<dyn KvBackend>,
    cfg: RegistryConfig,
    /// Serializes check-then-insert and deletes.
    write_lock: Mutex<()>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl EmbeddingRegistry {
    /// Open a registry over `backend`, loading every stored face.
    ///
    /// A stored face whose length differs from `cfg.dimension` is a
    /// configuration error: the deployment changed embedders without
    /// migrating the registry.
    pub fn open(cfg: RegistryConfig, backend: Box<dyn KvBackend>) -> Result<Self, RegistryError> {
        cfg.validate()?;

        let mut stored = Vec::new();
        backend.scan(&mut |key, bytes| {
            let face: StoredFace = decode(bytes)?;
            stored.push((key.to_string(), face));
            Ok(())
        })?;

        let mut snapshot = RegistrySnapshot::empty(cfg.dimension);
        for (key, face) in stored {
            let embedding = stored_embedding(face, &key, cfg.dimension)?;
            snapshot.entries.insert(key, embedding);
        }

        tracing::info!(
            registered = snapshot.len(),
            dimension = cfg.dimension,
            duplicate_threshold = cfg.duplicate_threshold,
            "face registry loaded"
        );

        Ok(Self {
            backend,
            cfg,
            write_lock: Mutex::new(()),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Registry backed by process memory only.
    pub fn in_memory(cfg: RegistryConfig) -> Result<Self, RegistryError> {
        Self::open(cfg, Box::new(InMemoryBackend::new()))
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    pub fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    /// Current read-only snapshot for matching.
    pub fn all(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.all().contains(identity)
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Reject embeddings whose length differs from the configured dimension.
    pub fn check_dimension(&self, embedding: &Embedding) -> Result<(), RegistryError> {
        if embedding.dimension() != self.cfg.dimension {
            return Err(RegistryError::DimensionMismatch {
                expected: self.cfg.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }

    /// Insert `identity → embedding` if the name is free and the face is new.
    ///
    /// Checks run in order: name already present ([`RegistryError::NameTaken`]),
    /// then nearest stored face closer than the duplicate threshold
    /// ([`RegistryError::DuplicateIdentity`]). The entry is persisted before
    /// the new snapshot is published and before this returns `Ok`.
    pub fn try_insert(&self, identity: &str, embedding: Embedding) -> Result<(), RegistryError> {
        validate_identity(identity)?;
        self.check_dimension(&embedding)?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.all();

        if current.contains(identity) {
            return Err(RegistryError::NameTaken(identity.to_string()));
        }
        if let Some(nearest) = current.nearest(&embedding) {
            if nearest.distance < self.cfg.duplicate_threshold {
                tracing::warn!(
                    identity = %identity,
                    existing = %nearest.identity,
                    distance = nearest.distance,
                    "rejected duplicate face"
                );
                return Err(RegistryError::DuplicateIdentity {
                    existing: nearest.identity,
                    distance: nearest.distance,
                });
            }
        }

        let stored = StoredFace {
            schema_version: REGISTRY_SCHEMA_VERSION,
            identity: identity.to_string(),
            values: embedding.as_slice().to_vec(),
            registered_at: Utc::now(),
        };
        self.backend.put(identity, &encode(&stored)?)?;

        let mut next = (*current).clone();
        next.entries.insert(identity.to_string(), embedding);
        self.publish(next);

        tracing::info!(identity = %identity, "registered face");
        Ok(())
    }

    /// Remove an identity (admin operation).
    pub fn delete(&self, identity: &str) -> Result<(), RegistryError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.all();
        if !current.contains(identity) {
            return Err(RegistryError::NotFound(identity.to_string()));
        }

        self.backend.delete(identity)?;

        let mut next = (*current).clone();
        next.entries.remove(identity);
        self.publish(next);

        tracing::info!(identity = %identity, "deleted face");
        Ok(())
    }

    fn publish(&self, next: RegistrySnapshot) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(next);
    }
}

fn stored_embedding(
    face: StoredFace,
    key: &str,
    dimension: usize,
) -> Result<Embedding, RegistryError> {
    if face.identity != key {
        return Err(RegistryError::Configuration(format!(
            "stored face key '{key}' holds identity '{}'",
            face.identity
        )));
    }
    if face.values.len() != dimension {
        return Err(RegistryError::Configuration(format!(
            "stored face '{key}' has dimension {}, registry expects {dimension}",
            face.values.len()
        )));
    }
    Embedding::new(face.values).map_err(|err| {
        RegistryError::Configuration(format!("stored face '{key}' is invalid: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec()).unwrap()
    }

    fn registry() -> EmbeddingRegistry {
        EmbeddingRegistry::in_memory(RegistryConfig::new(2)).unwrap()
    }

    /// Unit vector at cosine distance `d` from (1, 0).
    fn at_distance(d: f64) -> Embedding {
        let cos = 1.0 - d;
        let sin = (1.0 - cos * cos).sqrt();
        emb(&[cos as f32, sin as f32])
    }

    #[test]
    fn empty_registry_accepts_first_face() {
        let reg = registry();
        assert!(reg.is_empty());
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.contains("alice"));
    }

    #[test]
    fn name_taken_is_checked_before_duplicate_face() {
        let reg = registry();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        let err = reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap_err();
        assert_eq!(err, RegistryError::NameTaken("alice".into()));
    }

    #[test]
    fn close_face_under_new_name_is_duplicate() {
        let reg = registry();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        let err = reg.try_insert("bob", at_distance(0.25)).unwrap_err();
        match err {
            RegistryError::DuplicateIdentity { existing, distance } => {
                assert_eq!(existing, "alice");
                assert!((distance - 0.25).abs() < 1e-4);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!reg.contains("bob"));
    }

    #[test]
    fn distant_face_is_accepted() {
        let reg = registry();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        reg.try_insert("bob", at_distance(0.5)).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn threshold_is_tunable() {
        let reg = EmbeddingRegistry::in_memory(
            RegistryConfig::new(2).with_duplicate_threshold(0.1),
        )
        .unwrap();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        reg.try_insert("bob", at_distance(0.25)).unwrap();
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let reg = registry();
        let err = reg.try_insert("alice", emb(&[1.0, 0.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn blank_identity_is_rejected() {
        let reg = registry();
        assert!(matches!(
            reg.try_insert(" ", emb(&[1.0, 0.0])),
            Err(RegistryError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn delete_removes_entry_and_frees_face() {
        let reg = registry();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        reg.delete("alice").unwrap();
        assert!(!reg.contains("alice"));
        assert_eq!(
            reg.delete("alice").unwrap_err(),
            RegistryError::NotFound("alice".into())
        );
        reg.try_insert("bob", emb(&[1.0, 0.0])).unwrap();
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let reg = registry();
        reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        let before = reg.all();
        reg.try_insert("bob", emb(&[0.0, 1.0])).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(reg.all().len(), 2);
    }

    #[test]
    fn nearest_breaks_ties_lexicographically() {
        let reg = registry();
        reg.try_insert("zed", emb(&[1.0, 0.0])).unwrap();
        reg.try_insert("amy", emb(&[0.0, 1.0])).unwrap();
        // Equidistant from both stored faces.
        let probe = emb(&[1.0, 1.0]);
        let nearest = reg.all().nearest(&probe).unwrap();
        assert_eq!(nearest.identity, "amy");

        let ranked = reg.all().ranked(&probe, 5);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].identity, "amy");
        assert_eq!(ranked[1].identity, "zed");
    }

    #[test]
    fn concurrent_similar_registrations_admit_one() {
        let reg = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    let jitter = i as f32 * 0.001;
                    reg.try_insert(&format!("voter-{i}"), emb(&[1.0, jitter]))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RegistryError::DuplicateIdentity { .. })));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn reopen_restores_entries_from_redb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.redb");
        {
            let backend = store::RedbBackend::open(&path, REGISTRY_TABLE).unwrap();
            let reg = EmbeddingRegistry::open(RegistryConfig::new(2), Box::new(backend)).unwrap();
            reg.try_insert("alice", emb(&[1.0, 0.0])).unwrap();
        }

        let backend = store::RedbBackend::open(&path, REGISTRY_TABLE).unwrap();
        let reg = EmbeddingRegistry::open(RegistryConfig::new(2), Box::new(backend)).unwrap();
        assert!(reg.contains("alice"));
        assert!(matches!(
            reg.try_insert("bob", emb(&[1.0, 0.01])),
            Err(RegistryError::DuplicateIdentity { .. })
        ));
    }

    #[test]
    fn reopen_with_other_dimension_is_configuration_error() {
        let backend = InMemoryBackend::new();
        let stored = StoredFace {
            schema_version: REGISTRY_SCHEMA_VERSION,
            identity: "alice".into(),
            values: vec![1.0, 0.0],
            registered_at: Utc::now(),
        };
        backend.put("alice", &encode(&stored).unwrap()).unwrap();

        let err = EmbeddingRegistry::open(RegistryConfig::new(3), Box::new(backend))
            .err()
            .expect("dimension change must fail");
        assert!(matches!(err, RegistryError::Configuration(msg) if msg.contains("dimension 2")));
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let cfg = RegistryConfig::new(2).with_duplicate_threshold(2.5);
        assert!(matches!(
            EmbeddingRegistry::in_memory(cfg),
            Err(RegistryError::Configuration(_))
        ));
    }
}
