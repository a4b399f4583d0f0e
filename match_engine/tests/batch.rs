use chrono::NaiveDate;
use match_engine::{
    db_types::{ConnectId, Gender, Preferences, Profile},
    events::EventProducers,
    queue_objects::{BatchOutcome, DailyRunSummary},
    test_utils::prepare_env::{seed_profiles, test_database},
    BatchApi,
    LedgerApi,
    MatchEngineError,
    QueueApi,
    QueueManagement,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

fn id(s: &str) -> ConnectId {
    ConnectId::from(s)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).expect("valid date")
}

fn community() -> Vec<Profile> {
    let prefs = Preferences { preferred_gender: Some(Gender::Male), min_age: 25, max_age: 40, max_distance_km: None };
    vec![
        Profile::new("alice", "Alice", 30, Gender::Female)
            .with_interests(&["hiking", "chess", "jazz"])
            .with_preferences(prefs),
        Profile::new("bob", "Bob", 31, Gender::Male).with_interests(&["hiking", "chess"]),
        Profile::new("carl", "Carl", 45, Gender::Male).with_interests(&["hiking", "chess", "jazz"]),
        Profile::new("dave", "Dave", 29, Gender::Male).with_interests(&["football"]),
        Profile::new("erin", "Erin", 30, Gender::Female).with_interests(&["hiking", "chess", "jazz"]),
        Profile::new("fred", "Fred", 33, Gender::Male).with_interests(&["jazz"]).inactive(),
        Profile::new("gary", "Gary", 35, Gender::Male).with_interests(&["chess"]),
    ]
}

async fn setup() -> (SqliteDatabase, BatchApi<SqliteDatabase>) {
    let db = test_database().await;
    seed_profiles(&db, &community()).await;
    let api = BatchApi::new(db.clone(), EventProducers::default());
    (db, api)
}

async fn queued_peers(db: &SqliteDatabase, user: &ConnectId) -> Vec<String> {
    db.fetch_unviewed_candidates(user).await.unwrap().into_iter().map(|c| c.peer_id.to_string()).collect()
}

#[test]
fn batch_respects_preferences_and_ranking() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let alice = id("alice");
        let outcome = api.generate_daily_batch(&alice, day(1)).await.expect("Error generating batch");
        assert_eq!(outcome, BatchOutcome::Generated(3));
        // carl is too old, erin is the wrong gender, fred is inactive
        assert_eq!(queued_peers(&db, &alice).await, vec!["bob", "gary", "dave"]);
        let queue = db.fetch_queue(&alice).await.unwrap().unwrap();
        let ranks = queue.daily_entries[0].candidates.iter().map(|c| c.stability_rank).collect::<Vec<_>>();
        assert_eq!(ranks, vec![1, 2, 3]);
    });
}

#[test]
fn at_most_one_batch_per_day() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let alice = id("alice");
        assert_eq!(api.generate_daily_batch(&alice, day(1)).await.unwrap(), BatchOutcome::Generated(3));
        assert_eq!(api.generate_daily_batch(&alice, day(1)).await.unwrap(), BatchOutcome::AlreadyPresent);
        let queue = db.fetch_queue(&alice).await.unwrap().unwrap();
        assert_eq!(queue.daily_entries.len(), 1);

        // every peer is still waiting unviewed, so the next day has nobody new to offer
        assert_eq!(api.generate_daily_batch(&alice, day(2)).await.unwrap(), BatchOutcome::Generated(0));
        let queue = db.fetch_queue(&alice).await.unwrap().unwrap();
        assert_eq!(queue.daily_entries.len(), 2);
        assert!(queue.entry_for(day(2)).unwrap().candidates.is_empty());
    });
}

#[test]
fn decided_and_blocked_peers_are_never_offered() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let alice = id("alice");
        let ledger = LedgerApi::new(db.clone(), EventProducers::default());
        ledger.record_pass(&alice, &id("bob")).await.unwrap();
        // gary blocked alice: blocks count in both directions
        db.block_user(&id("gary"), &alice).await.unwrap();
        api.generate_daily_batch(&alice, day(1)).await.unwrap();
        assert_eq!(queued_peers(&db, &alice).await, vec!["dave"]);
    });
}

#[test]
fn small_batches() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let api = api.with_batch_size(1);
        assert_eq!(api.batch_size(), 1);
        let alice = id("alice");
        assert_eq!(api.generate_daily_batch(&alice, day(1)).await.unwrap(), BatchOutcome::Generated(1));
        assert_eq!(queued_peers(&db, &alice).await, vec!["bob"]);
        assert_eq!(api.generate_daily_batch(&alice, day(2)).await.unwrap(), BatchOutcome::Generated(1));
        assert_eq!(queued_peers(&db, &alice).await, vec!["bob", "gary"]);
    });
}

#[test]
fn unknown_user_has_no_batch() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (_db, api) = setup().await;
        let err = api.generate_daily_batch(&id("zoe"), day(1)).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::NotFound(_)));
    });
}

#[test]
fn daily_run_covers_every_active_user() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        api.generate_daily_batch(&id("alice"), day(1)).await.unwrap();
        let summary = api.run_daily_batches(day(1)).await.expect("Error running daily batches");
        assert_eq!(summary, DailyRunSummary { generated: 5, already_present: 1, failed: 0 });
        assert!(db.fetch_queue(&id("fred")).await.unwrap().is_none());
        let again = api.run_daily_batches(day(1)).await.unwrap();
        assert_eq!(again, DailyRunSummary { generated: 0, already_present: 6, failed: 0 });
    });
}

#[test]
fn queued_batch_feeds_the_queue_api() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let alice = id("alice");
        api.generate_daily_batch(&alice, day(1)).await.unwrap();
        let queue = QueueApi::new(db.clone(), EventProducers::default());
        let next = queue.get_next(&alice, Some(2)).await.unwrap();
        assert_eq!(next.iter().map(|c| c.peer_id.as_str()).collect::<Vec<_>>(), vec!["bob", "gary"]);
    });
}
