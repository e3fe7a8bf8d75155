mod common;

use anyhow::Result;
use chrono::Utc;
use common::{lenient_policy, test_service, Fixture};
use exactio::application::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_remit_after_collection() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    service
        .record_collection(fixture.collector.id, task.id, 2_000_000, Utc::now())
        .await?;

    let result = service
        .record_remittance(fixture.collector.id, task.id, 2_000_000, Utc::now())
        .await?;

    // Stored negated
    assert_eq!(result.transaction.amount_cents, -2_000_000);
    assert!(result.transaction.is_remittance());

    // Task completion is untouched by remittance
    assert_eq!(service.remaining_amount(task.id).await?, 0);
    let collected = service.list_collected_tasks(fixture.collector.id).await?;
    assert_eq!(collected.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_remit_does_not_complete_task() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    service
        .record_remittance(fixture.collector.id, task.id, 500_000, Utc::now())
        .await?;

    // Still pending: only collection events settle a task
    let next = service.next_pending_task(fixture.collector.id).await?;
    assert_eq!(next.map(|t| t.id), Some(task.id));
    assert!(service
        .list_collected_tasks(fixture.collector.id)
        .await?
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn test_remit_from_active_account_reports_no_freeze_change() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    service
        .record_collection(fixture.collector.id, task.id, 2_000_000, Utc::now())
        .await?;

    // The account was never frozen, so the result reports no transition
    let result = service
        .record_remittance(fixture.collector.id, task.id, 2_000_000, Utc::now())
        .await?;
    assert!(!result.collector_was_frozen);
    assert!(!result.collector_frozen);

    Ok(())
}

#[tokio::test]
async fn test_remit_requires_positive_amount() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    let zero = service
        .record_remittance(fixture.collector.id, task.id, 0, Utc::now())
        .await;
    assert!(matches!(zero, Err(AppError::InvalidAmount(0))));

    // Callers submit the amount handed over, never a negated value
    let negative = service
        .record_remittance(fixture.collector.id, task.id, -2_000_000, Utc::now())
        .await;
    assert!(matches!(negative, Err(AppError::InvalidAmount(_))));

    Ok(())
}

#[tokio::test]
async fn test_remit_unknown_task_not_found() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    let result = service
        .record_remittance(fixture.collector.id, Uuid::new_v4(), 1_000, Utc::now())
        .await;
    assert!(matches!(result, Err(AppError::TaskNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_manager_cannot_remit() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    let result = service
        .record_remittance(fixture.manager.id, task.id, 1_000, Utc::now())
        .await;
    assert!(matches!(result, Err(AppError::ManagerCannotCollect)));

    Ok(())
}
