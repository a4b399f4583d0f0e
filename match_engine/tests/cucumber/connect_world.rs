use cucumber::World;
use log::*;
use match_engine::{
    events::EventProducers,
    queue_objects::{BatchResult, LikeOutcome},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    BatchApi,
    LedgerApi,
    MatchApi,
    MatchEngineError,
    QueueApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct ConnectWorld {
    pub system: Option<MatchingSystem>,
    pub last_like: Option<LikeOutcome>,
    pub last_error: Option<MatchEngineError>,
    pub last_batch_result: Option<BatchResult>,
}

#[derive(Debug)]
pub struct MatchingSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub matches: MatchApi<SqliteDatabase>,
    pub batches: BatchApi<SqliteDatabase>,
    pub queue: QueueApi<SqliteDatabase>,
}

impl ConnectWorld {
    pub fn system(&self) -> &MatchingSystem {
        self.system.as_ref().expect("Matching system not initialised")
    }
}

impl MatchingSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        Self {
            db_path: url,
            ledger: LedgerApi::new(db.clone(), producers.clone()),
            matches: MatchApi::new(db.clone(), producers.clone()),
            batches: BatchApi::new(db.clone(), producers.clone()),
            queue: QueueApi::new(db.clone(), producers),
            db,
        }
    }
}

