//! End-to-end behaviour of the monitoring core over a migrated `SQLite` store.

mod common;

use beltmon::adapters::sqlite::SqliteDefectRepository;
use beltmon::domain::errors::DomainError;
use beltmon::domain::models::{
    ConveyorParametersUpdate, Criticality, DefectFilter, DefectType, LogCategory, SeverityFlags,
};
use beltmon::domain::ports::DefectRepository;
use chrono::{Duration, Utc};
use common::{detection, seed_defects, sqlite_context};
use futures::TryStreamExt;

#[tokio::test]
async fn test_detection_is_classified_from_its_flags() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;

    let normal = seed_defects(service, SeverityFlags::NORMAL, 1).await;
    let extreme = seed_defects(service, SeverityFlags::EXTREME, 1).await;
    let critical = seed_defects(service, SeverityFlags::CRITICAL, 1).await;

    assert_eq!(service.classify_defect(&normal[0]), Criticality::Normal);
    assert_eq!(service.classify_defect(&extreme[0]), Criticality::Extreme);
    assert_eq!(service.classify_defect(&critical[0]), Criticality::Critical);

    let stored = service.get_defect(critical[0].id).await.unwrap();
    assert!(stored.severity.is_critical());
    assert!(!stored.severity.is_extreme());
}

#[tokio::test]
async fn test_first_recompute_writes_then_is_idempotent() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;

    let first = service.recompute_conveyor_status().await.unwrap();
    assert_eq!(first.criticality(), Criticality::Normal);

    let second = service.recompute_conveyor_status().await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(service.status_history(None).await.unwrap().len(), 1);

    let logs = ctx.logs.list_logs(Some(LogCategory::StateOfDevices), None).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Set current general status of conveyor: \"normal\"");
}

#[tokio::test]
async fn test_status_follows_worst_defect() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;

    seed_defects(service, SeverityFlags::NORMAL, 3).await;
    assert_eq!(
        service.recompute_conveyor_status().await.unwrap().criticality(),
        Criticality::Normal
    );

    let extreme = seed_defects(service, SeverityFlags::EXTREME, 1).await;
    assert_eq!(
        service.recompute_conveyor_status().await.unwrap().criticality(),
        Criticality::Extreme
    );

    let (updated, changed) = service
        .set_defect_criticality(extreme[0].id, false, true)
        .await
        .unwrap();
    assert!(changed);
    assert_eq!(updated.criticality(), Criticality::Critical);
    assert_eq!(
        service.current_conveyor_status().await.unwrap().criticality(),
        Criticality::Critical
    );

    service.delete_defect(extreme[0].id).await.unwrap();
    assert_eq!(
        service.current_conveyor_status().await.unwrap().criticality(),
        Criticality::Normal
    );

    let history: Vec<Criticality> = service
        .status_history(None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.criticality())
        .collect();
    assert_eq!(
        history,
        vec![
            Criticality::Normal,
            Criticality::Critical,
            Criticality::Extreme,
            Criticality::Normal
        ]
    );

    let limited = service.status_history(Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_set_criticality_without_change_writes_nothing() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let defects = seed_defects(service, SeverityFlags::EXTREME, 1).await;

    let logs_before = ctx.logs.list_logs(None, None).await.unwrap().len();
    let (defect, changed) = service
        .set_defect_criticality(defects[0].id, true, false)
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(defect.criticality(), Criticality::Extreme);
    assert_eq!(ctx.logs.list_logs(None, None).await.unwrap().len(), logs_before);
    assert!(service.status_history(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_criticality_critical_wins_and_logs_change() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let defects = seed_defects(service, SeverityFlags::NORMAL, 1).await;
    let id = defects[0].id;

    let (defect, changed) = service.set_defect_criticality(id, true, true).await.unwrap();
    assert!(changed);
    assert!(defect.severity.is_critical());
    assert!(!defect.severity.is_extreme());

    let logs = ctx.logs.list_logs(Some(LogCategory::ActionInfo), None).await.unwrap();
    assert_eq!(
        logs[0].message,
        format!("Criticality of defect with id={id} has changed from \"normal\" to \"critical\"")
    );

    let err = service.set_defect_criticality(9_999, true, false).await.unwrap_err();
    assert!(matches!(err, DomainError::DefectNotFound(9_999)));
}

#[tokio::test]
async fn test_link_rules() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let d = seed_defects(service, SeverityFlags::NORMAL, 3).await;
    let (a, b, c) = (d[0].id, d[1].id, d[2].id);

    let err = service.link_defect_variation(a, a).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidOperation(_)));

    let err = service.link_defect_variation(a, 9_999).await.unwrap_err();
    assert!(matches!(err, DomainError::DefectNotFound(9_999)));

    service.link_defect_variation(a, b).await.unwrap();

    // a already has a successor, b already has a predecessor
    let err = service.link_defect_variation(a, c).await.unwrap_err();
    assert!(matches!(err, DomainError::ConstraintViolation(_)));
    let err = service.link_defect_variation(c, b).await.unwrap_err();
    assert!(matches!(err, DomainError::ConstraintViolation(_)));

    let warnings = ctx.logs.list_logs(Some(LogCategory::Warning), None).await.unwrap();
    assert!(warnings
        .iter()
        .any(|r| r.message.ends_with("defect is already related")));
}

#[tokio::test]
async fn test_unlink_rules() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let d = seed_defects(service, SeverityFlags::NORMAL, 4).await;
    let (a, b, c, lonely) = (d[0].id, d[1].id, d[2].id, d[3].id);

    service.link_defect_variation(a, b).await.unwrap();
    service.link_defect_variation(b, c).await.unwrap();

    let err = service.unlink_defect_variation(a, a).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidOperation(_)));

    // linked, but the other way round
    let err = service.unlink_defect_variation(b, a).await.unwrap_err();
    assert!(matches!(err, DomainError::NotRelated { previous, current } if previous == b && current == a));

    // both take part in links, just not with each other
    let err = service.unlink_defect_variation(a, c).await.unwrap_err();
    assert!(matches!(err, DomainError::VariationLinkNotFound { .. }));

    let err = service.unlink_defect_variation(lonely, 9_999).await.unwrap_err();
    assert!(matches!(err, DomainError::VariationLinkNotFound { .. }));

    service.unlink_defect_variation(a, b).await.unwrap();
    assert!(service.previous_variation(b).await.unwrap().is_none());

    let err = service.unlink_defect_variation(a, b).await.unwrap_err();
    assert!(matches!(err, DomainError::VariationLinkNotFound { .. }));
}

#[tokio::test]
async fn test_repeated_unlink_mid_chain_is_not_found() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let d = seed_defects(service, SeverityFlags::NORMAL, 3).await;
    let (a, b, c) = (d[0].id, d[1].id, d[2].id);

    // C -> B -> A
    service.link_defect_variation(a, b).await.unwrap();
    service.link_defect_variation(b, c).await.unwrap();

    service.unlink_defect_variation(b, c).await.unwrap();
    let err = service.unlink_defect_variation(b, c).await.unwrap_err();
    assert!(matches!(err, DomainError::VariationLinkNotFound { previous, current } if previous == b && current == c));

    // the rest of the chain is untouched
    assert_eq!(service.previous_variation(b).await.unwrap().map(|d| d.id), Some(a));
}

#[tokio::test]
async fn test_chain_walk_and_delete_middle() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let d = seed_defects(service, SeverityFlags::NORMAL, 3).await;
    let (a, b, c) = (d[0].id, d[1].id, d[2].id);

    // C -> B -> A
    service.link_defect_variation(a, b).await.unwrap();
    service.link_defect_variation(b, c).await.unwrap();

    let chain: Vec<_> = service.variation_chain(c).try_collect().await.unwrap();
    assert_eq!(chain.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b, a]);
    assert_eq!(service.previous_variation(c).await.unwrap().map(|d| d.id), Some(b));
    assert!(service.previous_variation(a).await.unwrap().is_none());

    service.delete_defect(b).await.unwrap();

    let chain: Vec<_> = service.variation_chain(c).try_collect().await.unwrap();
    assert_eq!(chain.iter().map(|d| d.id).collect::<Vec<_>>(), vec![a]);

    let info = ctx.logs.list_logs(Some(LogCategory::Info), None).await.unwrap();
    assert!(info
        .iter()
        .any(|r| r.message == format!("Progress chain for defect with id={b} has changed")));

    let err = service.get_defect(b).await.unwrap_err();
    assert!(matches!(err, DomainError::DefectNotFound(id) if id == b));
}

#[tokio::test]
async fn test_chain_of_unknown_defect_fails() {
    let ctx = sqlite_context().await;
    let result: Result<Vec<_>, _> = ctx.defects.variation_chain(42).try_collect().await;
    assert!(matches!(result, Err(DomainError::DefectNotFound(42))));
}

#[tokio::test]
async fn test_delete_keeps_shared_photo_until_last_reference() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let repo = SqliteDefectRepository::new(ctx.pool.clone());

    let d = seed_defects(service, SeverityFlags::NORMAL, 2).await;
    let photo_id = d[0].photo_id;

    service.delete_defect(d[0].id).await.unwrap();
    assert!(repo.get_photo(photo_id).await.unwrap().is_some());

    service.delete_defect(d[1].id).await.unwrap();
    assert!(repo.get_photo(photo_id).await.unwrap().is_none());

    let err = service.delete_defect(d[1].id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_process_detection_announces_defect() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let d = seed_defects(service, SeverityFlags::CRITICAL, 1).await;
    let id = d[0].id;

    let report = service.process_detection(id).await.unwrap();
    assert_eq!(report.criticality, Criticality::Critical);
    assert_eq!(report.status.criticality(), Criticality::Critical);

    let logs = ctx.logs.list_logs(Some(LogCategory::CriticalDefect), None).await.unwrap();
    assert_eq!(
        logs[0].message,
        format!("New critical level defect with id={id} has appeared on the conveyor!")
    );

    let err = service.process_detection(9_999).await.unwrap_err();
    assert!(matches!(err, DomainError::DefectNotFound(9_999)));
    let errors = ctx.logs.list_logs(Some(LogCategory::Error), None).await.unwrap();
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn test_list_filters_and_counts() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;
    let photo = service.store_photo(b"jpeg".to_vec()).await.unwrap();

    let old = Utc::now() - Duration::days(3);
    let mut hole = detection(photo.id, SeverityFlags::EXTREME).detected_at(old);
    hole.defect_type = DefectType::Hole;
    service.record_detection(hole).await.unwrap();
    service
        .record_detection(detection(photo.id, SeverityFlags::CRITICAL))
        .await
        .unwrap();
    service
        .record_detection(detection(photo.id, SeverityFlags::NORMAL))
        .await
        .unwrap();

    let all = service.list_defects(&DefectFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let holes = service
        .list_defects(&DefectFilter { defect_type: Some(DefectType::Hole), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(holes.len(), 1);

    let critical = service
        .list_defects(&DefectFilter { criticality: Some(Criticality::Critical), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(critical.len(), 1);

    let recent = service
        .list_defects(&DefectFilter {
            detected_from: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);

    let counts = service.count_defects().await.unwrap();
    assert_eq!((counts.total, counts.extreme, counts.critical), (3, 1, 1));
}

#[tokio::test]
async fn test_record_detection_rejects_bad_input() {
    let ctx = sqlite_context().await;
    let service = &ctx.defects;

    let err = service
        .record_detection(detection(9_999, SeverityFlags::NORMAL))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PhotoNotFound(9_999)));

    let photo = service.store_photo(Vec::new()).await.unwrap();
    let err = service
        .record_detection(detection(photo.id, SeverityFlags::NORMAL).with_probability(101))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_conveyor_parameters_partial_update() {
    let ctx = sqlite_context().await;

    let defaults = ctx.parameters.conveyor_parameters().await.unwrap();
    assert_eq!(defaults.belt_width_mm, 3_360);

    let updated = ctx
        .parameters
        .update_conveyor_parameters(ConveyorParametersUpdate {
            belt_thickness_mm: Some(20),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.belt_thickness_mm, 20);
    assert_eq!(updated.belt_length_mm, defaults.belt_length_mm);
    assert_eq!(ctx.parameters.conveyor_parameters().await.unwrap(), updated);

    let err = ctx
        .parameters
        .update_conveyor_parameters(ConveyorParametersUpdate {
            belt_width_mm: Some(-1),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_action_log_admin() {
    let ctx = sqlite_context().await;
    seed_defects(&ctx.defects, SeverityFlags::NORMAL, 1).await;
    ctx.defects.recompute_conveyor_status().await.unwrap();
    ctx.defects.link_defect_variation(1_000, 1_001).await.unwrap_err();

    let all = ctx.logs.list_logs(None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    // newest first
    assert_eq!(all[0].category, LogCategory::Warning);

    let deleted = ctx.logs.delete_log(all[0].id, false).await.unwrap();
    assert_eq!(deleted.id, all[0].id);
    assert!(ctx.logs.get_log(all[0].id).await.unwrap_err().is_not_found());
    assert_eq!(ctx.logs.list_logs(None, None).await.unwrap().len(), 1);

    assert_eq!(ctx.logs.clear_logs(false).await.unwrap(), 1);
    assert!(ctx.logs.list_logs(None, Some(10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_log_deletions_are_logged() {
    let ctx = sqlite_context().await;
    ctx.defects.recompute_conveyor_status().await.unwrap();
    let status_entry = ctx.logs.list_logs(None, None).await.unwrap()[0].id;

    ctx.logs.delete_log(status_entry, true).await.unwrap();
    let logs = ctx.logs.list_logs(None, None).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].category, LogCategory::ActionInfo);
    assert_eq!(logs[0].message, format!("Log record with id={status_entry} has been removed"));

    let err = ctx.logs.delete_log(status_entry, false).await.unwrap_err();
    assert!(matches!(err, DomainError::LogRecordNotFound(id) if id == status_entry));
    let warnings = ctx.logs.list_logs(Some(LogCategory::Warning), None).await.unwrap();
    assert_eq!(
        warnings[0].message,
        format!("Failed to remove log record with id={status_entry}: record not found")
    );

    assert_eq!(ctx.logs.clear_logs(true).await.unwrap(), 2);
    let logs = ctx.logs.list_logs(None, None).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "All log records have been removed");

    // an empty log stays empty
    ctx.logs.clear_logs(false).await.unwrap();
    assert_eq!(ctx.logs.clear_logs(true).await.unwrap(), 0);
    assert!(ctx.logs.list_logs(None, None).await.unwrap().is_empty());
}
