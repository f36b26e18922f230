//! Conformance suite every [`Backend`] implementation must pass.
//!
//! [`check_backend`] drives a freshly constructed backend through the full
//! record and blob lifecycle and panics on the first violation, so an engine
//! crate can run it from a plain `#[test]`:
//!
//! ```ignore
//! #[test]
//! fn conforms() {
//!     let backend = MyBackend::new_for_test();
//!     hangar_store::conformance::check_backend(&backend);
//! }
//! ```
//!
//! The backend must start empty.

use std::sync::Barrier;
use std::thread;

use hangar_types::{
    Deploy, DeployLookup, DeployState, Dev, DevLookup, DevState, Infra, InfraLookup, InfraState,
    RecordId,
};

use crate::error::StoreError;
use crate::traits::Backend;

/// Writers racing to create the same record.
const CONCURRENT_WRITERS: usize = 8;

/// Run every check against `backend`.
pub fn check_backend<B: Backend + ?Sized>(backend: &B) {
    check_blobs(backend);
    check_infra(backend);
    check_deploy(backend);
    check_dev(backend);
    check_put_identity(backend);
    check_invalid_input(backend);
    check_concurrent_create(backend);
}

fn assert_has_id(id: Option<&RecordId>, what: &str) {
    match id {
        Some(id) => assert!(!id.as_str().is_empty(), "{what}: assigned id is empty"),
        None => panic!("{what}: id not set"),
    }
}

/// Absent before put, round-trip after put, last write wins.
pub fn check_blobs<B: Backend + ?Sized>(backend: &B) {
    let missing = backend.get_blob("foo").expect("get_blob (missing)");
    assert!(missing.is_none(), "get_blob (missing): should be absent");

    backend
        .put_blob("foo", &mut "bar".as_bytes())
        .expect("put_blob");
    let data = backend
        .get_blob("foo")
        .expect("get_blob (exists)")
        .expect("get_blob (exists): should be present");
    assert_eq!(data.key(), "foo");
    let bytes = data.read_to_vec().expect("get_blob: read");
    assert_eq!(bytes, b"bar", "get_blob: bad data");

    backend
        .put_blob("foo", &mut "baz!".as_bytes())
        .expect("put_blob (overwrite)");
    let bytes = backend
        .get_blob("foo")
        .expect("get_blob (overwritten)")
        .expect("get_blob (overwritten): should be present")
        .read_to_vec()
        .expect("get_blob (overwritten): read");
    assert_eq!(bytes, b"baz!", "get_blob (overwritten): bad data");
}

/// Infra lifecycle, with and without foundation scoping.
pub fn check_infra<B: Backend + ?Sized>(backend: &B) {
    let bare = InfraLookup::new("foo");
    let actual = backend.get_infra(&bare).expect("get_infra (missing)");
    assert!(actual.is_none(), "get_infra (missing): should be absent");

    let infra = Infra::new(bare.clone()).with_output("foo", "bar");
    assert!(infra.id.is_none(), "put_infra: id should be empty before put");
    let infra = backend.put_infra(infra).expect("put_infra");
    assert_has_id(infra.id.as_ref(), "put_infra");

    let actual = backend.get_infra(&bare).expect("get_infra (exists)");
    assert_eq!(actual.as_ref(), Some(&infra), "get_infra (exists): bad record");

    // Same infra name scoped to a foundation is an independent record.
    let scoped = InfraLookup::new("foo").with_foundation("bar");
    let actual = backend.get_infra(&scoped).expect("get_infra foundation (missing)");
    assert!(
        actual.is_none(),
        "get_infra foundation (missing): should be absent"
    );

    let scoped_infra = Infra::new(scoped.clone())
        .with_state(InfraState::Ready)
        .with_output("foo", "baz");
    let scoped_infra = backend
        .put_infra(scoped_infra)
        .expect("put_infra foundation");
    assert_has_id(scoped_infra.id.as_ref(), "put_infra foundation");
    assert_ne!(
        scoped_infra.id, infra.id,
        "put_infra foundation: must not reuse the bare record's id"
    );

    let actual = backend.get_infra(&scoped).expect("get_infra foundation (exists)");
    assert_eq!(
        actual.as_ref(),
        Some(&scoped_infra),
        "get_infra foundation (exists): bad record"
    );

    let actual = backend.get_infra(&bare).expect("get_infra (bare after scoped)");
    assert_eq!(
        actual.as_ref(),
        Some(&infra),
        "get_infra: bare record changed by foundation put"
    );
}

/// Deploy lifecycle.
pub fn check_deploy<B: Backend + ?Sized>(backend: &B) {
    let lookup = DeployLookup::new("foo", "bar", "baz");
    let result = backend.get_deploy(&lookup).expect("get_deploy (missing)");
    assert!(result.is_none(), "get_deploy (missing): should be absent");

    let deploy = Deploy::new(lookup.clone());
    assert!(deploy.id.is_none(), "put_deploy: id should be empty before put");
    let deploy = backend.put_deploy(deploy).expect("put_deploy");
    assert_has_id(deploy.id.as_ref(), "put_deploy");

    let result = backend.get_deploy(&lookup).expect("get_deploy (exists)");
    assert_eq!(result.as_ref(), Some(&deploy), "get_deploy (exists): bad record");

    // Each component of the lookup participates in identity.
    let other_flavor = DeployLookup::new("foo", "bar", "qux");
    let result = backend
        .get_deploy(&other_flavor)
        .expect("get_deploy (other flavor)");
    assert!(result.is_none(), "get_deploy (other flavor): should be absent");
}

/// Dev lifecycle: create, read, delete, delete again, recreate.
pub fn check_dev<B: Backend + ?Sized>(backend: &B) {
    let lookup = DevLookup::new("foo");
    let result = backend.get_dev(&lookup).expect("get_dev (missing)");
    assert!(result.is_none(), "get_dev (missing): should be absent");

    let dev = Dev::new(lookup.clone());
    assert!(dev.id.is_none(), "put_dev: id should be empty before put");
    let dev = backend.put_dev(dev).expect("put_dev");
    assert_has_id(dev.id.as_ref(), "put_dev");

    let result = backend.get_dev(&lookup).expect("get_dev (exists)");
    assert_eq!(result.as_ref(), Some(&dev), "get_dev (exists): bad record");

    backend.delete_dev(&lookup).expect("delete_dev (exists)");
    let result = backend.get_dev(&lookup).expect("get_dev (deleted)");
    assert!(result.is_none(), "get_dev (deleted): should be absent");

    backend.delete_dev(&lookup).expect("delete_dev (missing)");
    let result = backend.get_dev(&lookup).expect("get_dev (deleted twice)");
    assert!(result.is_none(), "get_dev (deleted twice): should be absent");

    let recreated = backend
        .put_dev(Dev::new(lookup.clone()))
        .expect("put_dev (recreate)");
    assert_has_id(recreated.id.as_ref(), "put_dev (recreate)");
    assert_ne!(
        recreated.id, dev.id,
        "put_dev (recreate): deleted id must not be reused"
    );
}

/// Idempotent create, update keeps the id, conflicting ids are rejected,
/// stale ids after a delete are replaced.
pub fn check_put_identity<B: Backend + ?Sized>(backend: &B) {
    let lookup = DeployLookup::new("identity", "aws", "simple");

    let first = backend
        .put_deploy(Deploy::new(lookup.clone()))
        .expect("put_deploy (first)");
    let second = backend
        .put_deploy(Deploy::new(lookup.clone()))
        .expect("put_deploy (repeat)");
    assert_eq!(first.id, second.id, "put_deploy (repeat): minted a second id");

    let mut update = second.clone().with_state(DeployState::Deployed);
    update.deploy_id = Some("engine-42".into());
    let updated = backend.put_deploy(update).expect("put_deploy (update)");
    assert_eq!(updated.id, first.id, "put_deploy (update): id changed");
    let stored = backend
        .get_deploy(&lookup)
        .expect("get_deploy (updated)")
        .expect("get_deploy (updated): should be present");
    assert_eq!(stored, updated, "get_deploy (updated): bad record");
    assert!(stored.is_deployed());

    let mut rogue = Deploy::new(lookup.clone()).with_state(DeployState::Failed);
    rogue.id = Some(RecordId::new("not-the-stored-id"));
    match backend.put_deploy(rogue) {
        Err(StoreError::IdConflict { .. }) => {}
        other => panic!("put_deploy (conflicting id): expected IdConflict, got {other:?}"),
    }
    let stored = backend
        .get_deploy(&lookup)
        .expect("get_deploy (after conflict)");
    assert_eq!(
        stored.as_ref(),
        Some(&updated),
        "put_deploy (conflicting id): stored record changed"
    );

    let dev_lookup = DevLookup::new("identity");
    let dev = backend
        .put_dev(Dev::new(dev_lookup.clone()).with_state(DevState::Ready))
        .expect("put_dev (identity)");
    backend.delete_dev(&dev_lookup).expect("delete_dev (identity)");
    let revived = backend.put_dev(dev.clone()).expect("put_dev (stale id)");
    assert_has_id(revived.id.as_ref(), "put_dev (stale id)");
    assert_ne!(revived.id, dev.id, "put_dev (stale id): deleted id reused");
}

/// Empty lookup components and blob keys are rejected without side effects.
pub fn check_invalid_input<B: Backend + ?Sized>(backend: &B) {
    assert!(
        matches!(
            backend.get_infra(&InfraLookup::new("")),
            Err(StoreError::InvalidLookup(_))
        ),
        "get_infra: empty infra name accepted"
    );
    assert!(
        matches!(
            backend.put_infra(Infra::new(InfraLookup::new("x").with_foundation(""))),
            Err(StoreError::InvalidLookup(_))
        ),
        "put_infra: empty foundation accepted"
    );
    assert!(
        matches!(
            backend.put_deploy(Deploy::new(DeployLookup::new("app", "", "simple"))),
            Err(StoreError::InvalidLookup(_))
        ),
        "put_deploy: empty infra accepted"
    );
    assert!(
        matches!(
            backend.delete_dev(&DevLookup::new("")),
            Err(StoreError::InvalidLookup(_))
        ),
        "delete_dev: empty app id accepted"
    );
    assert!(
        matches!(backend.get_blob(""), Err(StoreError::InvalidBlobKey)),
        "get_blob: empty key accepted"
    );
    assert!(
        matches!(
            backend.put_blob_bytes("", b"data"),
            Err(StoreError::InvalidBlobKey)
        ),
        "put_blob: empty key accepted"
    );
}

/// Racing puts for one unseen lookup mint exactly one id.
pub fn check_concurrent_create<B: Backend + ?Sized>(backend: &B) {
    let lookup = DevLookup::new("concurrent");
    let barrier = Barrier::new(CONCURRENT_WRITERS);

    let ids: Vec<Option<RecordId>> = thread::scope(|s| {
        let handles: Vec<_> = (0..CONCURRENT_WRITERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    backend
                        .put_dev(Dev::new(lookup.clone()))
                        .expect("put_dev (concurrent)")
                        .id
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("writer thread panicked"))
            .collect()
    });

    let first = ids[0].clone();
    assert_has_id(first.as_ref(), "put_dev (concurrent)");
    for id in &ids {
        assert_eq!(id, &first, "put_dev (concurrent): more than one id minted");
    }
    let stored = backend
        .get_dev(&lookup)
        .expect("get_dev (concurrent)")
        .expect("get_dev (concurrent): should be present");
    assert_eq!(stored.id, first, "get_dev (concurrent): stored id differs");
}
