//! Concurrency Isolation Tests
//!
//! Two callers holding the same envelope token: the first commit wins and
//! advances the token by one, the second fails with `ConcurrencyConflict`
//! and leaves no trace (no version, no token change, no audit event).

mod common;

use std::sync::Mutex;
use std::thread;

use docvault::audit::AuditAction;
use docvault::document::{DocumentError, ErrorKind, MetadataChanges};

use common::{actions, actor, create, service, version};

fn retitle(title: &str) -> MetadataChanges {
    MetadataChanges {
        title: Some(title.to_string()),
        ..MetadataChanges::default()
    }
}

// =============================================================================
// Sequential Scenarios
// =============================================================================

/// create → v1 → two readers at token 1 → X wins → Y conflicts → Y reloads, wins.
#[test]
fn test_two_readers_one_winner() {
    let (svc, sink) = service();
    let mut doc = create(&svc, "Master Services Agreement");
    assert_eq!(doc.concurrency_token(), 0);

    let v1 = svc
        .create_version(&mut doc, &actor("author"), version("v1.pdf", b"draft one"))
        .unwrap();
    assert_eq!(v1.sequence_number(), 1);
    assert_eq!(doc.version_count(), 1);
    assert_eq!(doc.concurrency_token(), 1);

    let mut x = svc.load(doc.id(), false).unwrap();
    let mut y = svc.load(doc.id(), false).unwrap();
    assert_eq!(x.concurrency_token(), 1);
    assert_eq!(y.concurrency_token(), 1);

    svc.update_metadata(&mut x, &actor("x"), retitle("MSA (X)")).unwrap();
    assert_eq!(x.concurrency_token(), 2);

    let events_before = sink.len();
    let err = svc
        .update_metadata(&mut y, &actor("y"), retitle("MSA (Y)"))
        .unwrap_err();
    assert_eq!(
        err,
        DocumentError::ConcurrencyConflict {
            document_id: doc.id(),
            expected: 1,
            actual: 2
        }
    );
    assert!(err.is_recoverable());
    assert_eq!(y.concurrency_token(), 1);
    assert_eq!(sink.len(), events_before);
    assert_eq!(svc.load(doc.id(), false).unwrap().title(), "MSA (X)");

    let mut y = svc.load(doc.id(), false).unwrap();
    assert_eq!(y.concurrency_token(), 2);
    svc.update_metadata(&mut y, &actor("y"), retitle("MSA (Y)")).unwrap();
    assert_eq!(y.concurrency_token(), 3);
    assert_eq!(svc.load(doc.id(), false).unwrap().title(), "MSA (Y)");
}

/// A stale `create_version` changes nothing: no row, no counter, no event.
#[test]
fn test_stale_version_has_no_side_effects() {
    let (svc, sink) = service();
    let mut doc = create(&svc, "Offer Letter");
    let mut stale = doc.clone();

    svc.create_version(&mut doc, &actor("hr"), version("a.pdf", b"a"))
        .unwrap();

    let err = svc
        .create_version(&mut stale, &actor("hr2"), version("b.pdf", b"b"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);

    let stored = svc.load(doc.id(), false).unwrap();
    assert_eq!(stored.version_count(), 1);
    assert_eq!(stored.concurrency_token(), 1);
    assert_eq!(svc.version_history(doc.id()).unwrap().len(), 1);
    assert_eq!(
        actions(&sink),
        vec![AuditAction::DocumentCreated, AuditAction::VersionCreated]
    );
}

/// Every mutating operation goes through the same token check.
#[test]
fn test_every_mutation_checks_token() {
    let (svc, _sink) = service();
    let mut doc = create(&svc, "Handbook");
    let stale = doc.clone();
    svc.update_metadata(&mut doc, &actor("a"), retitle("Handbook v2"))
        .unwrap();

    let conflict = |r: Result<(), DocumentError>| {
        assert_eq!(r.unwrap_err().kind(), ErrorKind::ConcurrencyConflict)
    };

    conflict(svc.lock(&mut stale.clone(), &actor("b")).map(|_| ()));
    conflict(svc.soft_delete(&mut stale.clone(), &actor("b")));
    conflict(svc.move_to(
        &mut stale.clone(),
        &actor("b"),
        docvault::types::FolderRef::new(uuid::Uuid::new_v4(), "/legal"),
    ));

    assert_eq!(svc.load(doc.id(), false).unwrap().concurrency_token(), 1);
}

/// A stale copy asking for the values it already shows is not a no-op: the
/// store has moved on, so the request conflicts instead of being dropped.
#[test]
fn test_stale_noop_update_conflicts() {
    let (svc, sink) = service();
    let mut x = create(&svc, "A");
    let mut y = svc.load(x.id(), false).unwrap();

    svc.update_metadata(&mut x, &actor("x"), retitle("B")).unwrap();
    let events = sink.len();

    let err = svc
        .update_metadata(&mut y, &actor("y"), retitle("A"))
        .unwrap_err();
    assert_eq!(
        err,
        DocumentError::ConcurrencyConflict {
            document_id: x.id(),
            expected: 0,
            actual: 1
        }
    );

    let stored = svc.load(x.id(), false).unwrap();
    assert_eq!(stored.title(), "B");
    assert_eq!(stored.concurrency_token(), 1);
    assert_eq!(sink.len(), events);

    // Reloaded, the same request is a real change.
    let mut y = svc.load(x.id(), false).unwrap();
    let diff = svc.update_metadata(&mut y, &actor("y"), retitle("A")).unwrap();
    assert!(!diff.is_empty());
    assert_eq!(y.concurrency_token(), 2);
}

/// Moving a stale copy into the folder it shows conflicts when another
/// writer has moved the document elsewhere.
#[test]
fn test_stale_same_folder_move_conflicts() {
    let (svc, _sink) = service();
    let one = docvault::types::FolderRef::new(uuid::Uuid::new_v4(), "/one");
    let two = docvault::types::FolderRef::new(uuid::Uuid::new_v4(), "/two");

    let mut doc = create(&svc, "Handbook");
    svc.move_to(&mut doc, &actor("a"), one.clone()).unwrap();
    let mut stale = doc.clone();
    svc.move_to(&mut doc, &actor("a"), two.clone()).unwrap();

    let err = svc.move_to(&mut stale, &actor("b"), one).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
    assert_eq!(svc.load(doc.id(), false).unwrap().folder(), Some(&two));

    // A current copy moving into its own folder is still silent.
    svc.move_to(&mut doc, &actor("a"), two).unwrap();
    assert_eq!(doc.concurrency_token(), 2);
}

// =============================================================================
// Racing Writers
// =============================================================================

/// Writers racing from the same token: exactly one wins.
#[test]
fn test_racing_writers_single_winner() {
    let (svc, sink) = service();
    let doc = create(&svc, "Policy");
    let writers = 8;

    let outcomes = Mutex::new(Vec::new());
    thread::scope(|s| {
        for i in 0..writers {
            let mut copy = doc.clone();
            let svc = &svc;
            let outcomes = &outcomes;
            s.spawn(move || {
                let content = format!("writer {i}");
                let result = svc.create_version(
                    &mut copy,
                    &actor(&format!("w{i}")),
                    version("p.pdf", content.as_bytes()),
                );
                outcomes.lock().unwrap().push(result.map(|_| ()));
            });
        }
    });

    let outcomes = outcomes.into_inner().unwrap();
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for loss in outcomes.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(loss.kind(), ErrorKind::ConcurrencyConflict);
    }

    let stored = svc.load(doc.id(), false).unwrap();
    assert_eq!(stored.concurrency_token(), 1);
    assert_eq!(stored.version_count(), 1);
    assert_eq!(sink.len(), 2);
}

/// Writers that reload and retry on conflict all land, with contiguous
/// sequence numbers and one token step per version.
#[test]
fn test_retrying_writers_produce_contiguous_chain() {
    let (svc, sink) = service();
    let id = create(&svc, "Contract").id();
    let writers = 6;
    let per_writer = 5;

    thread::scope(|s| {
        for i in 0..writers {
            let svc = &svc;
            s.spawn(move || {
                let who = actor(&format!("w{i}"));
                for n in 0..per_writer {
                    loop {
                        let mut copy = svc.load(id, false).unwrap();
                        let content = format!("w{i}-{n}");
                        match svc.create_version(&mut copy, &who, version("c.pdf", content.as_bytes())) {
                            Ok(_) => break,
                            Err(DocumentError::ConcurrencyConflict { .. }) => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
            });
        }
    });

    let total = (writers * per_writer) as u64;
    let stored = svc.load(id, false).unwrap();
    assert_eq!(stored.version_count(), total);
    assert_eq!(stored.concurrency_token(), total);

    let chain = svc.version_history(id).unwrap();
    let sequences: Vec<u64> = chain.iter().map(|v| v.sequence_number()).collect();
    assert_eq!(sequences, (1..=total).collect::<Vec<_>>());
    assert_eq!(stored.current_version_ref(), chain.latest().map(|v| v.id()));

    let created = actions(&sink)
        .into_iter()
        .filter(|a| *a == AuditAction::VersionCreated)
        .count() as u64;
    assert_eq!(created, total);
}
