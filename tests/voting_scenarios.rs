use std::sync::Arc;

use securevote::{
    AuthResult, CoordinatorError, EmbedError, Embedder, Embedding, EmbeddingRegistry, ErrorKind,
    InMemoryLedger, IntegrityCoordinator, MatchConfig, Matcher, RegistryConfig, RemoteStatus,
    VoteLedger,
};

fn emb(values: &[f32]) -> Embedding {
    Embedding::new(values.to_vec()).unwrap()
}

/// Unit vector at `degrees` in the plane; cosine distance between two of
/// these is `1 - cos(angle between them)`.
fn at_angle(degrees: f64) -> Embedding {
    let r = degrees.to_radians();
    emb(&[r.cos() as f32, r.sin() as f32, 0.0])
}

fn coordinator_with(remote: &InMemoryLedger) -> IntegrityCoordinator {
    let registry = EmbeddingRegistry::in_memory(RegistryConfig::new(3)).unwrap();
    let ledger = VoteLedger::in_memory(Arc::new(remote.clone())).unwrap();
    IntegrityCoordinator::new(registry, Matcher::new(MatchConfig::default()).unwrap(), ledger)
}

#[tokio::test]
async fn full_voting_scenario() {
    let remote = InMemoryLedger::new();
    let coordinator = coordinator_with(&remote);
    let e = emb(&[0.3, 0.5, 0.8]);

    assert_eq!(coordinator.authenticate(&e).await.unwrap(), AuthResult::NoMatch);

    coordinator.register("alice", e.clone()).unwrap();
    match coordinator.authenticate(&e).await.unwrap() {
        AuthResult::Authenticated {
            identity,
            distance,
            score,
            has_voted,
        } => {
            assert_eq!(identity, "alice");
            assert_eq!(distance, 0.0);
            assert_eq!(score, 1.0);
            assert!(!has_voted);
        }
        AuthResult::NoMatch => panic!("stored face must authenticate"),
    }

    let record = coordinator.vote("alice", "cand1").await.unwrap();
    assert_eq!(record.remote_status, RemoteStatus::Succeeded);

    let stats = coordinator.stats();
    assert_eq!((stats.registered, stats.voted, stats.remaining), (1, 1, 0));

    let err = coordinator.vote("alice", "cand2").await.unwrap_err();
    assert_eq!(err, CoordinatorError::AlreadyVoted("alice".into()));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    match coordinator.authenticate(&e).await.unwrap() {
        AuthResult::Authenticated { has_voted, .. } => assert!(has_voted),
        AuthResult::NoMatch => panic!("stored face must authenticate"),
    }
}

#[tokio::test]
async fn near_duplicate_face_is_rejected_under_new_name() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    // cos(41.41°) = 0.75, so the distance between these faces is 0.25.
    let first = at_angle(0.0);
    let second = at_angle(0.75f64.acos().to_degrees());
    assert!((first.distance(&second) - 0.25).abs() < 1e-6);

    coordinator.register("alice", first).unwrap();
    let err = coordinator.register("bob", second).unwrap_err();
    match &err {
        CoordinatorError::DuplicateIdentity { existing, distance } => {
            assert_eq!(existing, "alice");
            assert!((distance - 0.25).abs() < 1e-6);
        }
        other => panic!("expected duplicate identity, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(coordinator.stats().registered, 1);
}

#[tokio::test]
async fn name_taken_is_checked_before_the_face() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    coordinator.register("alice", at_angle(0.0)).unwrap();
    let err = coordinator.register("alice", at_angle(90.0)).unwrap_err();
    assert_eq!(err, CoordinatorError::NameTaken("alice".into()));
}

#[tokio::test]
async fn unreachable_ledger_does_not_fail_the_vote() {
    let remote = InMemoryLedger::new();
    remote.set_available(false);
    let coordinator = coordinator_with(&remote);
    coordinator.register("alice", at_angle(0.0)).unwrap();

    let record = coordinator.vote("alice", "cand1").await.unwrap();
    assert_eq!(record.remote_status, RemoteStatus::Failed);
    assert!(coordinator.ledger().has_voted("alice").await);
    assert_eq!(coordinator.stats().voted, 1);
}

#[tokio::test]
async fn unregistered_voter_cannot_vote() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    let err = coordinator.vote("mallory", "cand1").await.unwrap_err();
    assert_eq!(err, CoordinatorError::UnknownVoter("mallory".into()));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(coordinator.stats().voted, 0);
}

#[tokio::test]
async fn probe_outside_threshold_is_no_match() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    coordinator.register("alice", at_angle(0.0)).unwrap();
    // Distance 1 - cos(60°) = 0.5, above the 0.4 threshold.
    assert_eq!(
        coordinator.authenticate(&at_angle(60.0)).await.unwrap(),
        AuthResult::NoMatch
    );
    // Distance 1 - cos(30°) ≈ 0.134.
    assert!(matches!(
        coordinator.authenticate(&at_angle(30.0)).await.unwrap(),
        AuthResult::Authenticated { .. }
    ));
}

#[test]
fn candidates_rank_near_misses_without_threshold() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    coordinator.register("alice", at_angle(0.0)).unwrap();
    coordinator.register("bob", at_angle(90.0)).unwrap();
    coordinator.register("carol", at_angle(180.0)).unwrap();

    // 70° is outside the auth threshold for alice but still ranked first.
    let hits = coordinator.candidates(&at_angle(70.0)).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.identity.as_str()).collect();
    assert_eq!(names, ["bob", "alice", "carol"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(hits[1].distance > 0.4);

    let err = coordinator.candidates(&emb(&[1.0, 0.0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn wrong_dimension_is_an_input_error() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    let err = coordinator.register("alice", emb(&[1.0, 0.0])).unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    );
    let err = coordinator.authenticate(&emb(&[1.0, 0.0])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn removed_voter_keeps_vote_record() {
    let coordinator = coordinator_with(&InMemoryLedger::new());
    coordinator.register("alice", at_angle(0.0)).unwrap();
    coordinator.vote("alice", "cand1").await.unwrap();

    coordinator.remove_voter("alice").unwrap();
    assert_eq!(
        coordinator.remove_voter("alice").unwrap_err(),
        CoordinatorError::NotFound("alice".into())
    );
    assert!(coordinator.ledger().has_voted_locally("alice"));

    let stats = coordinator.stats();
    assert_eq!((stats.registered, stats.voted, stats.remaining), (0, 1, 0));
}

#[tokio::test]
async fn results_combine_local_and_remote() {
    let remote = InMemoryLedger::new();
    remote.preload_vote("other-node-voter", "cand2");
    let coordinator = coordinator_with(&remote);
    coordinator.register("alice", at_angle(0.0)).unwrap();
    coordinator.register("bob", at_angle(90.0)).unwrap();

    coordinator.vote("alice", "cand1").await.unwrap();
    remote.set_available(false);
    coordinator.vote("bob", "cand1").await.unwrap();
    remote.set_available(true);

    let report = coordinator.results().await;
    assert_eq!(report.counts.get("cand1"), Some(&2));
    assert_eq!(report.counts.get("cand2"), Some(&1));
    assert!(report.mismatched.contains(&"cand1".to_string()));
}

struct FixedEmbedder {
    dimension: usize,
}

impl Embedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, image: &[u8]) -> Result<Embedding, EmbedError> {
        match image {
            [] => Err(EmbedError::InvalidImage("empty upload".into())),
            [0, ..] => Err(EmbedError::NoFaceDetected),
            [angle, ..] => Ok(at_angle(f64::from(*angle))),
        }
    }
}

#[tokio::test]
async fn image_flows_run_through_the_embedder() {
    let coordinator = coordinator_with(&InMemoryLedger::new())
        .with_embedder(Arc::new(FixedEmbedder { dimension: 3 }))
        .unwrap();

    coordinator.register_image("alice", &[10]).unwrap();
    assert_eq!(
        coordinator.register_image("bob", &[0]).unwrap_err(),
        CoordinatorError::NoFaceDetected
    );
    assert_eq!(
        coordinator.register_image("carol", &[]).unwrap_err().kind(),
        ErrorKind::Input
    );
    // Name check runs before the embedder sees the image.
    assert_eq!(
        coordinator.register_image("alice", &[0]).unwrap_err(),
        CoordinatorError::NameTaken("alice".into())
    );

    match coordinator.authenticate_image(&[12]).await.unwrap() {
        AuthResult::Authenticated { identity, .. } => assert_eq!(identity, "alice"),
        AuthResult::NoMatch => panic!("expected alice"),
    }
}

#[tokio::test]
async fn embedder_dimension_must_match_registry() {
    let result = coordinator_with(&InMemoryLedger::new())
        .with_embedder(Arc::new(FixedEmbedder { dimension: 128 }));
    match result {
        Err(err) => assert_eq!(err.kind(), ErrorKind::Configuration),
        Ok(_) => panic!("dimension mismatch must be rejected"),
    }
}
