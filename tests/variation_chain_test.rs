//! Variation chain behaviour over the in-memory store, including states the
//! service never creates itself (cycles).

mod common;

use beltmon::domain::errors::DomainError;
use beltmon::domain::models::{SeverityFlags, VariationLink};
use beltmon::domain::ports::VariationRepository;
use common::{fake_service, seed_defects, FakeStore};
use futures::{StreamExt, TryStreamExt};

#[tokio::test]
async fn test_chain_is_lazy() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 4).await;
    for pair in d.windows(2) {
        service.link_defect_variation(pair[0].id, pair[1].id).await.unwrap();
    }

    let reads_before = store.defect_reads();
    let first: Vec<_> = service.variation_chain(d[3].id).take(1).collect().await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].as_ref().unwrap().id, d[2].id);
    // start defect plus one predecessor
    assert_eq!(store.defect_reads() - reads_before, 2);

    let all: Vec<_> = service.variation_chain(d[3].id).try_collect().await.unwrap();
    assert_eq!(
        all.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![d[2].id, d[1].id, d[0].id]
    );
}

#[tokio::test]
async fn test_cycle_ends_stream_with_error() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 2).await;
    let (a, b) = (d[0].id, d[1].id);

    store.force_link(VariationLink::new(a, b));
    store.force_link(VariationLink::new(b, a));

    let items: Vec<_> = service.variation_chain(a).collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().id, b);
    match &items[1] {
        Err(DomainError::CycleDetected(path)) => assert_eq!(path, &vec![a, b, a]),
        other => panic!("expected cycle error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deleting_from_two_cycle_drops_both_links() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 2).await;
    let (a, b) = (d[0].id, d[1].id);

    store.force_link(VariationLink::new(a, b));
    store.force_link(VariationLink::new(b, a));

    service.delete_defect(a).await.unwrap();

    assert!(store.find_by_current(b).await.unwrap().is_none());
    assert!(store.find_by_previous(b).await.unwrap().is_none());
    let chain: Vec<_> = service.variation_chain(b).try_collect().await.unwrap();
    assert!(chain.is_empty());
}

#[tokio::test]
async fn test_deleting_head_and_tail() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 3).await;
    let (a, b, c) = (d[0].id, d[1].id, d[2].id);
    service.link_defect_variation(a, b).await.unwrap();
    service.link_defect_variation(b, c).await.unwrap();

    // newest end
    service.delete_defect(c).await.unwrap();
    assert!(store.find_by_previous(b).await.unwrap().is_none());
    assert_eq!(service.previous_variation(b).await.unwrap().map(|d| d.id), Some(a));

    // oldest end
    service.delete_defect(a).await.unwrap();
    assert!(service.previous_variation(b).await.unwrap().is_none());

    assert!(store
        .logs()
        .iter()
        .any(|r| r.message == format!("Progress chain for defect with id={a} has changed")));
}

#[tokio::test]
async fn test_unlinked_delete_keeps_chain_log_quiet() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 1).await;

    service.delete_defect(d[0].id).await.unwrap();

    let logs = store.logs();
    assert!(logs
        .iter()
        .any(|r| r.message == format!("Defect with id={} has been removed", d[0].id)));
    assert!(!logs.iter().any(|r| r.message.starts_with("Progress chain")));
    assert!(!store.photo_exists(d[0].photo_id));
}

#[tokio::test]
async fn test_previous_of_missing_defect() {
    let store = FakeStore::new();
    let service = fake_service(&store);

    let err = service.previous_variation(77).await.unwrap_err();
    assert!(matches!(err, DomainError::DefectNotFound(77)));
}

#[tokio::test]
async fn test_unlink_of_pair_linked_elsewhere_is_not_found() {
    let store = FakeStore::new();
    let service = fake_service(&store);
    let d = seed_defects(&service, SeverityFlags::NORMAL, 4).await;
    let (a, b, x, y) = (d[0].id, d[1].id, d[2].id, d[3].id);

    // a <- x and y <- b, nothing between a and b
    service.link_defect_variation(a, x).await.unwrap();
    service.link_defect_variation(y, b).await.unwrap();

    let err = service.unlink_defect_variation(a, b).await.unwrap_err();
    assert!(matches!(err, DomainError::VariationLinkNotFound { previous, current } if previous == a && current == b));
    assert!(store.logs().iter().any(|r| r.message.ends_with("relation not found")));
}
