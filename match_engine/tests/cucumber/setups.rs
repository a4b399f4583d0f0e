use cucumber::given;
use match_engine::db_types::{Gender, Profile};

use crate::cucumber::{connect_world::MatchingSystem, ConnectWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ConnectWorld) {
    let system = MatchingSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "{word} is a {int} year old {word}")]
async fn a_profile(world: &mut ConnectWorld, user: String, age: i64, gender: String) {
    let gender = gender.parse::<Gender>().expect("Not a valid gender");
    let name = user.clone();
    let profile = Profile::new(user, &name, age, gender);
    world.system().db.upsert_profile(&profile).await.expect("Error saving profile");
}

#[given(expr = "{word} blocked {word}")]
async fn a_block(world: &mut ConnectWorld, blocker: String, blocked: String) {
    world.system().db.block_user(&blocker.into(), &blocked.into()).await.expect("Error saving block");
}
