use chrono::NaiveDate;
use cucumber::{then, when};
use match_engine::{
    db_types::{ConnectId, MatchStatus, PairKey, PeerDecision},
    MatchEngineError,
};

use crate::cucumber::ConnectWorld;

fn pair(a: &str, b: &str) -> PairKey {
    PairKey::new(&a.into(), &b.into()).expect("Not a valid pair")
}

fn parse_date(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("Dates must look like 2024-07-01")
}

#[when(expr = "{word} likes {word}")]
async fn like(world: &mut ConnectWorld, user: String, target: String) {
    let result = world.system().ledger.record_like(&user.into(), &target.into()).await;
    match result {
        Ok(outcome) => {
            world.last_like = Some(outcome);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "{word} passes on {word}")]
async fn pass(world: &mut ConnectWorld, user: String, target: String) {
    world.last_error = world.system().ledger.record_pass(&user.into(), &target.into()).await.err();
}

#[when(expr = "{word} unmatches {word}")]
async fn unmatch(world: &mut ConnectWorld, user: String, other: String) {
    let key = pair(&user, &other);
    world.last_error = world.system().matches.unmatch(&key, &user.into()).await.err();
}

#[when(expr = "the daily batch for {word} runs on {word}")]
async fn daily_batch(world: &mut ConnectWorld, user: String, date: String) {
    let date = parse_date(&date);
    world.system().batches.generate_daily_batch(&user.into(), date).await.expect("Error generating batch");
}

/// Decisions look like "like bob, pass carol"
#[when(expr = "{word} submits {string}")]
async fn submit(world: &mut ConnectWorld, user: String, decisions: String) {
    let decisions = decisions
        .split(',')
        .map(|d| {
            let (decision, peer) = d.trim().split_once(' ').expect("Decisions look like 'like bob'");
            PeerDecision::new(peer.trim(), decision.parse().expect("Not a valid decision"))
        })
        .collect::<Vec<_>>();
    let result = world.system().queue.submit_decisions(&user.into(), &decisions).await.expect("Error submitting");
    world.last_batch_result = Some(result);
}

#[then("the like is mutual")]
async fn is_mutual(world: &mut ConnectWorld) {
    let outcome = world.last_like.as_ref().expect("No like recorded");
    assert!(outcome.is_mutual_match);
}

#[then("the like is not mutual")]
async fn is_not_mutual(world: &mut ConnectWorld) {
    let outcome = world.last_like.as_ref().expect("No like recorded");
    assert!(!outcome.is_mutual_match);
}

#[then("no new match was created")]
async fn no_new_match(world: &mut ConnectWorld) {
    let outcome = world.last_like.as_ref().expect("No like recorded");
    assert!(outcome.new_match.is_none());
}

#[then("the last action is rejected as a conflicting action")]
async fn conflicting(world: &mut ConnectWorld) {
    assert!(
        matches!(world.last_error, Some(MatchEngineError::ConflictingAction { .. })),
        "Expected a conflicting action, got {:?}",
        world.last_error
    );
}

#[then(expr = "{word} has not liked {word}")]
async fn has_not_liked(world: &mut ConnectWorld, user: String, target: String) {
    let record = world.system().ledger.ledger(&user.into()).await.expect("Error fetching ledger");
    let target = ConnectId::from(target);
    assert!(record.map(|r| !r.likes.contains(&target)).unwrap_or(true));
}

#[then(expr = "{word} is matched with {word}")]
async fn matched_with(world: &mut ConnectWorld, user: String, other: String) {
    let (user, other) = (ConnectId::from(user), ConnectId::from(other));
    let ledger = &world.system().ledger;
    assert!(ledger.matches(&user).await.unwrap().contains(&other));
    assert!(ledger.matches(&other).await.unwrap().contains(&user));
}

#[then(expr = "the match between {word} and {word} is {word}")]
async fn match_status(world: &mut ConnectWorld, a: String, b: String, status: String) {
    let expected = status.parse::<MatchStatus>().expect("Not a valid match status");
    let m = world.system().matches.get_match(&pair(&a, &b)).await.expect("Error fetching match");
    assert_eq!(m.status, expected);
    let conversation = world.system().matches.get_conversation(&m.id).await.expect("Error fetching conversation");
    assert_eq!(conversation.status, expected.conversation_status());
}

#[then(expr = "{word} is offered {string}")]
async fn offered(world: &mut ConnectWorld, user: String, expected: String) {
    let next = world.system().queue.get_next(&user.into(), Some(50)).await.expect("Error fetching queue");
    let offered = next.iter().map(|c| c.peer_id.as_str()).collect::<Vec<_>>().join(", ");
    assert_eq!(offered, expected);
}

#[then(expr = "{word} has {int} daily entries")]
async fn daily_entries(world: &mut ConnectWorld, user: String, count: usize) {
    let queue = world.system().queue.fetch_queue(&user.into()).await.expect("Error fetching queue");
    assert_eq!(queue.map(|q| q.daily_entries.len()).unwrap_or(0), count);
}

#[then(expr = "{int} decisions were processed and {int} new matches were created")]
async fn batch_result(world: &mut ConnectWorld, processed: usize, new_matches: usize) {
    let result = world.last_batch_result.as_ref().expect("No decisions submitted");
    assert_eq!(result.actions_processed, processed);
    assert_eq!(result.new_matches, new_matches);
}
