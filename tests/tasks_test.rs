mod common;

use anyhow::Result;
use chrono::Utc;
use common::{days_ago, lenient_policy, test_service, Fixture};
use exactio::application::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_next_pending_task_orders_by_due_date() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    // Created out of due-date order on purpose
    let late = fixture.task_due(&service, 1_000_000, days_ago(-5)).await?;
    let early = fixture.task_due(&service, 2_000_000, days_ago(3)).await?;
    let middle = fixture.task_due(&service, 3_000_000, days_ago(1)).await?;

    let next = service.next_pending_task(fixture.collector.id).await?;
    assert_eq!(next.as_ref().map(|t| t.id), Some(early.id));
    assert_eq!(next.map(|t| t.remaining_cents), Some(2_000_000));

    service
        .record_collection(fixture.collector.id, early.id, 2_000_000, Utc::now())
        .await?;

    let next = service.next_pending_task(fixture.collector.id).await?;
    assert_eq!(next.map(|t| t.id), Some(middle.id));

    service
        .record_collection(fixture.collector.id, middle.id, 3_000_000, Utc::now())
        .await?;
    service
        .record_collection(fixture.collector.id, late.id, 1_000_000, Utc::now())
        .await?;

    assert!(service.next_pending_task(fixture.collector.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_list_collected_tasks_excludes_pending() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    let settled = fixture.task(&service, 1_000_000).await?;
    let pending = fixture.task(&service, 2_000_000).await?;

    service
        .record_collection(fixture.collector.id, settled.id, 1_000_000, Utc::now())
        .await?;

    let collected = service.list_collected_tasks(fixture.collector.id).await?;
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].id, settled.id);
    assert_ne!(collected[0].id, pending.id);

    Ok(())
}

#[tokio::test]
async fn test_remaining_amount_with_no_transactions() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let task = fixture.task(&service, 2_000_000).await?;

    assert_eq!(service.remaining_amount(task.id).await?, 2_000_000);

    let missing = service.remaining_amount(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::TaskNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_username_rejected() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let manager = service.create_manager("boss".into()).await?;

    let dup_manager = service.create_manager("boss".into()).await;
    assert!(matches!(dup_manager, Err(AppError::AccountAlreadyExists(_))));

    service.create_collector("runner".into(), manager.id).await?;
    let dup_collector = service.create_collector("runner".into(), manager.id).await;
    assert!(matches!(
        dup_collector,
        Err(AppError::AccountAlreadyExists(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_collector_must_report_to_a_manager() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let manager = service.create_manager("boss".into()).await?;
    let collector = service.create_collector("runner".into(), manager.id).await?;

    // A collector cannot manage other collectors
    let nested = service
        .create_collector("helper".into(), collector.id)
        .await;
    assert!(matches!(nested, Err(AppError::NotAManager(_))));

    let orphan = service
        .create_collector("ghost".into(), Uuid::new_v4())
        .await;
    assert!(matches!(orphan, Err(AppError::AccountNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_task_collector_cannot_be_a_manager() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;
    let other_manager = service.create_manager("otherboss".into()).await?;

    let result = service
        .create_task(
            fixture.manager.id,
            other_manager.id,
            fixture.customer.id,
            1_000_000,
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(AppError::CollectorIsManager(_))));

    Ok(())
}

#[tokio::test]
async fn test_task_creator_must_be_a_manager() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    let result = service
        .create_task(
            fixture.collector.id,
            fixture.collector.id,
            fixture.customer.id,
            1_000_000,
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotAManager(_))));

    Ok(())
}

#[tokio::test]
async fn test_task_requires_known_customer_and_positive_amount() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    let no_customer = service
        .create_task(
            fixture.manager.id,
            fixture.collector.id,
            Uuid::new_v4(),
            1_000_000,
            Utc::now(),
        )
        .await;
    assert!(matches!(no_customer, Err(AppError::CustomerNotFound(_))));

    let zero_due = service
        .create_task(
            fixture.manager.id,
            fixture.collector.id,
            fixture.customer.id,
            0,
            Utc::now(),
        )
        .await;
    assert!(matches!(zero_due, Err(AppError::InvalidAmount(0))));

    Ok(())
}

#[tokio::test]
async fn test_account_lookup_by_username() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let fixture = Fixture::provision(&service).await?;

    let found = service.get_account("testcollector").await?;
    assert_eq!(found.id, fixture.collector.id);
    assert_eq!(found.manager, Some(fixture.manager.id));

    let missing = service.get_account("nobody").await;
    assert!(matches!(missing, Err(AppError::AccountNotFound(_))));

    let accounts = service.list_accounts().await?;
    assert_eq!(accounts.len(), 2);
    // Managers sort first
    assert!(accounts[0].is_manager);

    Ok(())
}

#[tokio::test]
async fn test_customer_lookup_by_name() -> Result<()> {
    let (service, _temp) = test_service(lenient_policy()).await?;
    let customer = service
        .create_customer(
            "ACME Ltd".into(),
            Some("1 High St".into()),
            None,
            Some("billing@acme.test".into()),
        )
        .await?;

    let found = service.get_customer("ACME Ltd").await?;
    assert_eq!(found.id, customer.id);
    assert_eq!(found.address.as_deref(), Some("1 High St"));
    assert_eq!(found.phone, None);

    let missing = service.get_customer("Nobody Inc").await;
    assert!(matches!(missing, Err(AppError::CustomerNotFound(_))));

    Ok(())
}
