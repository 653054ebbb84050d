//! Interface tests for the event engine using Cucumber.
//!
//! These scenarios describe the engine's public contract: typed fan-out,
//! failure isolation and shutdown.
//!
//! ```bash
//! cargo test --test interfaces
//! ```

mod steps;

use cucumber::World;
use steps::event_engine::EngineWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running EventEngine Interface Tests ===\n");
    EngineWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/event_engine.feature")
        .await;
}
