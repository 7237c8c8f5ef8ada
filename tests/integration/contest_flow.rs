//! End-to-end contest flow against the SQLite store.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use bracket_contest::config::{AppConfig, ContestConfig};
use bracket_contest::contest::ContestService;
use bracket_contest::error::ContestError;
use bracket_contest::storage::{EntryStore, SqliteEntryStore};
use bracket_contest::types::{ContestEntry, EntryStatus, NewEntry};

async fn setup() -> (Arc<SqliteEntryStore>, ContestService) {
    let store = Arc::new(SqliteEntryStore::connect("sqlite::memory:", 1).await.unwrap());
    let service = ContestService::new(store.clone(), &ContestConfig::default());
    (store, service)
}

async fn submit(service: &ContestService, account: &str, lower: Decimal, upper: Decimal) -> ContestEntry {
    service
        .submit_entry(NewEntry::new(account, format!("Holder {account}"), lower, upper))
        .await
        .unwrap()
}

/// Rewrite an entry's win timestamp, as if it had been designated at `won_at`.
async fn backdate(store: &SqliteEntryStore, id: i64, won_at: DateTime<Utc>) {
    let mut entry = store.find_by_id(id).await.unwrap().unwrap();
    entry.promote(won_at);
    store.update(&entry).await.unwrap();
}

fn ids(entries: &[ContestEntry]) -> Vec<i64> {
    entries.iter().map(|e| e.id).collect()
}

#[tokio::test]
async fn weekly_round_trip() {
    let (store, service) = setup().await;

    let a = submit(&service, "1001", dec!(10), dec!(12)).await;
    let b = submit(&service, "1002", dec!(13), dec!(15)).await;

    // Tie: both brackets are 0.5 away.
    let tied = service.predict_winners(dec!(12.5)).await.unwrap();
    assert_eq!(ids(&tied), vec![a.id, b.id]);

    // Admin breaks the tie.
    let winner = service.set_winner(b.id).await.unwrap();
    assert_eq!(winner.status(), EntryStatus::Active);
    assert_eq!(service.current_winner().await.unwrap().unwrap().id, b.id);

    // The winner is no longer a candidate.
    let next = service.predict_winners(dec!(14)).await.unwrap();
    assert_eq!(ids(&next), vec![a.id]);

    // Switching winner demotes the previous one.
    service.set_winner(a.id).await.unwrap();
    let b_now = store.find_by_id(b.id).await.unwrap().unwrap();
    assert!(!b_now.is_winner);
    assert!(b_now.won_at.is_none());
    assert_eq!(store.list_winners().await.unwrap().len(), 1);
}

#[tokio::test]
async fn exact_match_wins_outright() {
    let (_, service) = setup().await;
    let a = submit(&service, "1", dec!(10), dec!(12)).await;
    submit(&service, "2", dec!(13), dec!(15)).await;

    let result = service.predict_winners(dec!(12)).await.unwrap();
    assert_eq!(ids(&result), vec![a.id]);
}

#[tokio::test]
async fn missing_target_keeps_current_winner() {
    let (store, service) = setup().await;
    let a = submit(&service, "1", dec!(10), dec!(12)).await;
    service.set_winner(a.id).await.unwrap();

    let result = service.set_winner(a.id + 100).await;
    assert!(matches!(result, Err(ContestError::NotFound(_))));

    let winners = store.list_winners().await.unwrap();
    assert_eq!(ids(&winners), vec![a.id]);
}

#[tokio::test]
async fn expiry_windows() {
    let (store, service) = setup().await;
    let now = Utc::now();
    let old = submit(&service, "1", dec!(1), dec!(2)).await;
    let recent = submit(&service, "2", dec!(3), dec!(4)).await;

    // Two winners only exist here because they are written directly.
    backdate(&store, old.id, now - Duration::days(8)).await;
    backdate(&store, recent.id, now - Duration::days(6)).await;

    assert_eq!(service.run_expiry_sweep(now).await.unwrap(), 1);
    assert_eq!(service.run_expiry_sweep(now).await.unwrap(), 0);

    let winners = store.list_winners().await.unwrap();
    assert_eq!(ids(&winners), vec![recent.id]);
    assert!(store.find_by_id(old.id).await.unwrap().unwrap().won_at.is_none());
}

#[tokio::test]
async fn seven_day_boundary_is_exclusive() {
    let (store, service) = setup().await;
    let now = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap();
    let e = submit(&service, "1", dec!(1), dec!(2)).await;
    backdate(&store, e.id, now - Duration::days(7)).await;

    assert_eq!(service.run_expiry_sweep(now).await.unwrap(), 0);
    assert_eq!(service.run_expiry_sweep(now + Duration::seconds(1)).await.unwrap(), 1);
}

#[tokio::test]
async fn expired_winner_can_reenter_selection() {
    let (store, service) = setup().await;
    let e = submit(&service, "1", dec!(1900), dec!(1910)).await;
    backdate(&store, e.id, Utc::now() - Duration::days(10)).await;

    // Read paths expire lazily before selecting.
    let result = service.predict_winners(dec!(1905)).await.unwrap();
    assert_eq!(ids(&result), vec![e.id]);
    assert!(service.current_winner().await.unwrap().is_none());
}

#[tokio::test]
async fn non_positive_price_touches_nothing() {
    let (store, service) = setup().await;
    let e = submit(&service, "1", dec!(1), dec!(2)).await;
    backdate(&store, e.id, Utc::now() - Duration::days(30)).await;

    assert!(service.predict_winners(Decimal::ZERO).await.unwrap().is_empty());
    assert!(service.predict_winners(dec!(-5)).await.unwrap().is_empty());
    assert_eq!(store.list_winners().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_account_until_it_wins() {
    let (_, service) = setup().await;
    let first = submit(&service, "777", dec!(1), dec!(2)).await;

    let dup = service
        .submit_entry(NewEntry::new("777", "Again", dec!(5), dec!(6)))
        .await;
    assert!(matches!(dup, Err(ContestError::DuplicateEntry(_))));

    service.set_winner(first.id).await.unwrap();
    let again = service
        .submit_entry(NewEntry::new("777", "Again", dec!(5), dec!(6)))
        .await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn remove_winner_reopens_entry() {
    let (_, service) = setup().await;
    let e = submit(&service, "1", dec!(1), dec!(2)).await;
    service.set_winner(e.id).await.unwrap();

    assert!(service.remove_winner(e.id).await.unwrap());
    assert!(!service.remove_winner(e.id).await.unwrap());
    assert!(!service.remove_winner(424242).await.unwrap());
    assert_eq!(ids(&service.open_entries().await.unwrap()), vec![e.id]);
}

#[tokio::test]
async fn custom_retention_from_config() {
    let cfg = AppConfig::parse("[contest]\nretention_days = 1\n").unwrap();
    let store = Arc::new(SqliteEntryStore::connect("sqlite::memory:", 1).await.unwrap());
    let service = ContestService::new(store.clone(), &cfg.contest);

    let e = submit(&service, "1", dec!(1), dec!(2)).await;
    backdate(&store, e.id, Utc::now() - Duration::days(2)).await;
    assert_eq!(service.run_expiry_sweep(Utc::now()).await.unwrap(), 1);
}
