mod common;

use anyhow::Result;
use common::{parse_date, test_service, StandardLedger};
use scrooge::application::{AppError, LedgerEvent};
use scrooge::domain::{Debt, DebtDraft, LedgerError, MonthKey};
use scrooge::storage::Slot;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

#[tokio::test]
async fn test_borrowers_are_deduplicated_by_name() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    let alice = service.add_borrower("Alice").await?;
    let bob = service.add_borrower("Bob").await?;
    let alice_again = service.add_borrower("  ALICE ").await?;

    assert_ne!(alice.id, bob.id);
    assert_eq!(alice_again.id, alice.id);
    assert_eq!(service.borrowers().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_debt_for_unknown_borrower_is_rejected() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    let result = service.add_debt(Debt::new("Lunch", Uuid::new_v4(), 10.0)).await;

    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::UnknownBorrower(_)))
    ));
    assert!(service.debts().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_negative_amount_is_rejected() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let alice = service.add_borrower("Alice").await?;

    let result = service.add_debt(Debt::new("Refund?", alice.id, -5.0)).await;

    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::InvalidAmount(_)))
    ));
    assert!(service.debts().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_total_owed_tracks_paid_flag() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ledger = StandardLedger::create(&mut service).await?;

    // 40 + 80 unpaid, 15 paid
    assert_eq!(service.total_owed(ledger.alice.id), 120.0);
    assert_eq!(service.total_owed(ledger.bob.id), 22.5);

    let concert = service
        .debts_for_borrower(ledger.alice.id)
        .into_iter()
        .find(|d| d.name == "Concert")
        .unwrap();

    assert_eq!(service.toggle_paid(concert.id).await?, Some(true));
    assert_eq!(service.total_owed(ledger.alice.id), 40.0);

    assert_eq!(service.set_paid(concert.id, false).await?, Some(true));
    assert_eq!(service.total_owed(ledger.alice.id), 120.0);

    // A paid debt doesn't change the total
    service
        .add_debt(Debt::new("Old loan", ledger.alice.id, 500.0).with_paid(true))
        .await?;
    assert_eq!(service.total_owed(ledger.alice.id), 120.0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_ids_are_noops() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    StandardLedger::create(&mut service).await?;
    let before = service.debts();

    let missing = Uuid::new_v4();
    assert_eq!(service.remove_debt(missing).await?, 0);
    assert_eq!(service.toggle_paid(missing).await?, None);
    assert_eq!(service.set_paid(missing, true).await?, None);
    assert!(!service.remove_borrower(missing).await?);
    assert!(!service.rename_borrower(missing, "Nobody").await?);

    assert_eq!(service.debts(), before);

    Ok(())
}

#[tokio::test]
async fn test_debts_for_month() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    StandardLedger::create(&mut service).await?;

    let january = service.debts_for_month(parse_date("2025-01-31"));
    let names: Vec<&str> = january.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Groceries", "Movie"]);

    let february = service.debts_for_month(MonthKey::new(2025, 2).unwrap());
    assert_eq!(february.len(), 1);
    assert_eq!(february[0].name, "Taxi");

    // Same month, different year
    assert!(service.debts_for_month(parse_date("2024-01-10")).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_month_sections_for_borrower() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ledger = StandardLedger::create(&mut service).await?;

    let sections = service.sorted_month_sections(ledger.alice.id);

    let months: Vec<String> = sections.iter().map(|s| s.month.label()).collect();
    assert_eq!(months, vec!["January 2025", "March 2025"]);

    assert_eq!(sections[0].debts.len(), 2);
    assert_eq!(sections[0].total(), 55.0);
    assert_eq!(sections[0].unpaid(), 40.0);
    assert_eq!(sections[1].total(), 80.0);

    let grouped = service.debts_grouped_by_month(ledger.alice.id);
    assert_eq!(grouped.len(), 2);
    let in_buckets: usize = grouped.values().map(Vec::len).sum();
    assert_eq!(in_buckets, service.debts_for_borrower(ledger.alice.id).len());

    let everything = service.all_month_sections();
    let months: Vec<MonthKey> = everything.iter().map(|s| s.month).collect();
    assert_eq!(
        months,
        vec![
            MonthKey::new(2025, 1).unwrap(),
            MonthKey::new(2025, 2).unwrap(),
            MonthKey::new(2025, 3).unwrap(),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_split_by_names_creates_missing_borrowers() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    service.add_borrower("Alice").await?;

    let names = vec!["alice".to_string(), "Bob".to_string(), "Carol".to_string()];
    let draft = DebtDraft::new("Cabin weekend", 100.0).with_tag("travel");
    let debts = service.split_debt_by_names(&draft, &names, true).await?;

    assert_eq!(debts.len(), 3);
    assert_eq!(service.borrowers().len(), 3);
    for debt in &debts {
        assert_eq!(debt.amount, 100.0 / 3.0);
        assert_eq!(debt.tag.as_deref(), Some("travel"));
    }

    let full = service
        .split_debt_by_names(&DebtDraft::new("Fuel", 100.0), &names, false)
        .await?;
    assert!(full.iter().all(|d| d.amount == 100.0));

    Ok(())
}

#[tokio::test]
async fn test_split_charges_duplicate_names_once() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    let names = vec!["Alice".to_string(), "alice ".to_string()];
    let debts = service
        .split_debt_by_names(&DebtDraft::new("Pizza", 30.0), &names, true)
        .await?;

    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].amount, 30.0);

    Ok(())
}

#[tokio::test]
async fn test_removing_borrower_keeps_debts() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ledger = StandardLedger::create(&mut service).await?;
    let before = service.debts();

    assert!(service.remove_borrower(ledger.alice.id).await?);

    assert_eq!(service.debts(), before);
    assert_eq!(service.orphaned_debts().len(), 3);
    assert_eq!(service.borrower_label(ledger.alice.id), "(removed borrower)");
    assert!(matches!(
        service.find_borrower("Alice"),
        Err(AppError::BorrowerNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_edit_debt() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ledger = StandardLedger::create(&mut service).await?;

    let mut taxi = service.debts_for_borrower(ledger.bob.id).remove(0);
    taxi.amount = 25.0;
    taxi.borrower_id = ledger.alice.id;
    taxi.description = Some("Airport run".into());

    assert!(service.update_debt(taxi.clone()).await?);
    assert_eq!(service.get_debt(taxi.id)?, taxi);
    assert!(service.debts_for_borrower(ledger.bob.id).is_empty());
    assert_eq!(service.total_owed(ledger.alice.id), 145.0);

    assert!(matches!(
        service.get_debt(Uuid::new_v4()),
        Err(AppError::DebtNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_rename_borrower_conflict() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let ledger = StandardLedger::create(&mut service).await?;

    assert!(service.rename_borrower(ledger.bob.id, "Robert").await?);
    assert_eq!(service.find_borrower("robert")?.id, ledger.bob.id);

    let result = service.rename_borrower(ledger.bob.id, "alice").await;
    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::BorrowerNameTaken(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_subscribers_see_each_mutation() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let mut events = service.subscribe();

    let alice = service.add_borrower("Alice").await?;
    assert_eq!(events.try_recv()?, LedgerEvent::BorrowerAdded(alice.id));

    // Re-adding an existing name changes nothing
    service.add_borrower("alice").await?;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    let debt = service.add_debt(Debt::new("Lunch", alice.id, 9.0)).await?;
    assert_eq!(events.try_recv()?, LedgerEvent::DebtAdded(debt.id));

    service.set_paid(debt.id, true).await?;
    assert_eq!(
        events.try_recv()?,
        LedgerEvent::DebtPaidChanged {
            id: debt.id,
            is_paid: true
        }
    );

    // Already paid: nothing to report
    service.set_paid(debt.id, true).await?;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    service.remove_debt(debt.id).await?;
    let event = events.try_recv()?;
    assert_eq!(event, LedgerEvent::DebtRemoved(debt.id));
    assert_eq!(event.slots(), vec![Slot::Debts]);

    service.remove_borrower(alice.id).await?;
    assert_eq!(events.try_recv()?, LedgerEvent::BorrowerRemoved(alice.id));

    Ok(())
}

#[tokio::test]
async fn test_bulk_operations_emit_a_single_event() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let alice = service.add_borrower("Alice").await?;
    let mut events = service.subscribe();

    // Well past the channel capacity
    let debts: Vec<Debt> = (0..100)
        .map(|i| Debt::new(format!("Coffee {i}"), alice.id, 3.5))
        .collect();
    let ids: Vec<_> = debts.iter().map(|d| d.id).collect();
    service.merge_records(vec![], debts).await?;

    assert_eq!(
        events.try_recv()?,
        LedgerEvent::RecordsMerged {
            borrowers: vec![],
            debts: ids
        }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(service.debts().len(), 100);

    let names: Vec<String> = (0..80).map(|i| format!("Guest {i}")).collect();
    let split = service
        .split_debt_by_names(&DebtDraft::new("Party", 800.0), &names, true)
        .await?;
    assert_eq!(split.len(), 80);

    let event = events.try_recv()?;
    match &event {
        LedgerEvent::DebtsSplit {
            new_borrowers,
            debts,
        } => {
            assert_eq!(new_borrowers.len(), 80);
            assert_eq!(debts.len(), 80);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(event.slots(), vec![Slot::Borrowers, Slot::Debts]);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    Ok(())
}

#[tokio::test]
async fn test_invalid_split_by_names_creates_no_borrowers() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let mut events = service.subscribe();

    let names = vec!["Alice".to_string(), "Bob".to_string()];
    let result = service
        .split_debt_by_names(&DebtDraft::new("Bad", -10.0), &names, true)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Ledger(LedgerError::InvalidAmount(_)))
    ));
    assert!(service.borrowers().is_empty());
    assert!(service.debts().is_empty());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    Ok(())
}
