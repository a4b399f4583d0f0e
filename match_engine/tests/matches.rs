use match_engine::{
    db_types::{ConnectId, ConversationStatus, MatchStatus, PairKey, PairKeyError},
    events::EventProducers,
    test_utils::prepare_env::test_database,
    LedgerApi,
    MatchApi,
    MatchEngineError,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

async fn setup() -> (SqliteDatabase, MatchApi<SqliteDatabase>) {
    let db = test_database().await;
    let api = MatchApi::new(db.clone(), EventProducers::default());
    (db, api)
}

fn id(s: &str) -> ConnectId {
    ConnectId::from(s)
}

#[test]
fn unmatch_blocks_rematch() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let (alice, bob) = (id("alice"), id("bob"));
        let m = api.create_match(&bob, &alice).await.expect("Error creating match");
        assert_eq!(m.user1_id, alice);

        let unmatched = api.unmatch(&m.id, &alice).await.expect("Error unmatching");
        assert_eq!(unmatched.status, MatchStatus::Unmatched);
        let conversation = api.get_conversation(&m.id).await.unwrap();
        assert_eq!(conversation.status, ConversationStatus::Unmatched);

        let err = api.create_match(&alice, &bob).await.expect_err("An unmatched pair must not re-match");
        assert_eq!(err, MatchEngineError::MatchClosed { match_id: m.id.clone(), status: MatchStatus::Unmatched });
        assert_eq!(api.get_match(&m.id).await.unwrap().status, MatchStatus::Unmatched);

        // a fresh mutual like on the closed pair is reported, but nothing is re-created
        let ledger = LedgerApi::new(db.clone(), EventProducers::default());
        ledger.record_like(&alice, &bob).await.unwrap();
        let outcome = ledger.record_like(&bob, &alice).await.unwrap();
        assert!(outcome.is_mutual_match);
        assert!(outcome.new_match.is_none());
        assert_eq!(api.get_match(&m.id).await.unwrap().status, MatchStatus::Unmatched);
    });
}

#[test]
fn only_participants_can_change_a_match() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (_db, api) = setup().await;
        let m = api.create_match(&id("alice"), &id("bob")).await.unwrap();
        let mallory = id("mallory");
        let err = api.unmatch(&m.id, &mallory).await.unwrap_err();
        assert_eq!(err, MatchEngineError::NotParticipant { match_id: m.id.clone(), user: mallory.clone() });
        let err = api.report(&m.id, &mallory, "spam").await.unwrap_err();
        assert!(matches!(err, MatchEngineError::NotParticipant { .. }));
        assert_eq!(api.get_match(&m.id).await.unwrap().status, MatchStatus::Active);

        let err = api.unmatch(&PairKey::from("nobody_noone"), &mallory).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::NotFound(_)));
    });
}

#[test]
fn block_records_who_blocked() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (_db, api) = setup().await;
        let (alice, bob) = (id("alice"), id("bob"));
        let m = api.create_match(&alice, &bob).await.unwrap();
        let blocked = api.block(&m.id, &bob).await.expect("Error blocking");
        assert_eq!(blocked.status, MatchStatus::BlockedByUser2);
        assert_eq!(api.get_conversation(&m.id).await.unwrap().status, ConversationStatus::Blocked);

        // repeating the same block is a no-op, anything else is refused
        let again = api.block(&m.id, &bob).await.expect("Repeated block should succeed");
        assert_eq!(again.status, MatchStatus::BlockedByUser2);
        let err = api.block(&m.id, &alice).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::MatchClosed { status: MatchStatus::BlockedByUser2, .. }));
        let err = api.unmatch(&m.id, &alice).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::MatchClosed { .. }));
    });
}

#[test]
fn reports_are_persisted() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let (alice, bob) = (id("alice"), id("bob"));
        let m = api.create_match(&alice, &bob).await.unwrap();
        let reported = api.report(&m.id, &alice, "rude messages").await.expect("Error reporting");
        assert_eq!(reported.status, MatchStatus::Reported);
        assert_eq!(db.count_reports(&m.id).await.unwrap(), 1);
        assert_eq!(api.get_conversation(&m.id).await.unwrap().status, ConversationStatus::Blocked);

        let active = api.matches_for_user(&alice, Some(MatchStatus::Active)).await.unwrap();
        assert!(active.is_empty());
        let reported = api.matches_for_user(&bob, Some(MatchStatus::Reported)).await.unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(api.matches_for_user(&bob, None).await.unwrap().len(), 1);
    });
}

#[test]
fn creating_a_match_with_yourself_fails() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (_db, api) = setup().await;
        let err = api.create_match(&id("alice"), &id("alice")).await.unwrap_err();
        assert_eq!(err, MatchEngineError::SelfAction(id("alice")));
    });
}

#[test]
fn ids_containing_the_separator_cannot_be_paired() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let err = api.create_match(&id("a_b"), &id("c")).await.unwrap_err();
        assert_eq!(err, MatchEngineError::InvalidPair(PairKeyError::ContainsSeparator(id("a_b"))));
        let err = api.create_match(&id("a"), &id("b_c")).await.unwrap_err();
        assert_eq!(err, MatchEngineError::InvalidPair(PairKeyError::ContainsSeparator(id("b_c"))));
        assert!(api.get_match(&PairKey::from("a_b_c")).await.is_err());

        let ledger = LedgerApi::new(db.clone(), EventProducers::default());
        let err = ledger.record_like(&id("a"), &id("b_c")).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::InvalidPair(_)));
        let err = ledger.record_pass(&id("a_b"), &id("c")).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::InvalidPair(_)));
        assert!(ledger.ledger(&id("a")).await.unwrap().is_none());
        assert!(ledger.ledger(&id("a_b")).await.unwrap().is_none());
    });
}

#[test]
fn a_match_stored_for_other_participants_is_inconsistent() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        // a row written outside the engine under alice and bob's key, but for alice and carol
        sqlx::query(
            "INSERT INTO matches (id, user1_id, user2_id, conversation_id) VALUES ('alice_bob', 'alice', 'carol', \
             'alice_bob')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let key = PairKey::from("alice_bob");
        let err = api.create_match(&id("bob"), &id("alice")).await.unwrap_err();
        assert_eq!(err, MatchEngineError::Inconsistent(key.clone()));
        let stored = api.get_match(&key).await.unwrap();
        assert_eq!(stored.user2_id, id("carol"));
        assert!(matches!(api.get_conversation(&key).await.unwrap_err(), MatchEngineError::Inconsistent(_)));

        let ledger = LedgerApi::new(db.clone(), EventProducers::default());
        ledger.record_like(&id("alice"), &id("bob")).await.unwrap();
        let err = ledger.record_like(&id("bob"), &id("alice")).await.unwrap_err();
        assert_eq!(err, MatchEngineError::Inconsistent(key));
    });
}

#[test]
fn audit_finds_orphans() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let (db, api) = setup().await;
        let m = api.create_match(&id("alice"), &id("bob")).await.unwrap();
        api.create_match(&id("carol"), &id("dave")).await.unwrap();
        assert!(api.audit_consistency().await.unwrap().is_empty());

        // simulate damage done outside the engine
        sqlx::query("DELETE FROM conversations WHERE id = $1").bind(&m.id).execute(db.pool()).await.unwrap();
        sqlx::query(
            "INSERT INTO conversations (id, match_id, participant1_id, participant2_id) VALUES ('eve_frank', \
             'eve_frank', 'eve', 'frank')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let orphans = api.audit_consistency().await.unwrap();
        assert_eq!(orphans, vec![PairKey::from("alice_bob"), PairKey::from("eve_frank")]);
        let err = api.get_conversation(&m.id).await.unwrap_err();
        assert_eq!(err, MatchEngineError::Inconsistent(m.id.clone()));
        assert!(matches!(
            api.get_conversation(&PairKey::from("x_y")).await.unwrap_err(),
            MatchEngineError::NotFound(_)
        ));

        // an orphaned conversation is adopted when its pair finally matches
        let adopted = api.create_match(&id("frank"), &id("eve")).await.unwrap();
        assert_eq!(adopted.id, PairKey::from("eve_frank"));
        assert_eq!(api.audit_consistency().await.unwrap(), vec![PairKey::from("alice_bob")]);
    });
}
