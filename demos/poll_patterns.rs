//! Poll Patterns Example
//!
//! Demonstrates the ways a `Poller` is usually put to work:
//! - Waiting for a collection to grow past a threshold
//! - Waiting for every record of a resource to have a filled-in field
//! - Watching attempts through a hook and a progress subscriber
//! - Stopping a session early

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pollwater::prelude::*;
use pollwater::AttemptEvent;
use serde_json::{json, Value};

// ==================== Collection size ====================

/// Example 1: wait until a listing endpoint returns more than 101 posts.
///
/// The fake endpoint grows by 40 posts per call.
async fn example_collection_size() {
    println!("\n=== Example 1: Collection Size ===");

    let calls = Arc::new(AtomicU32::new(0));
    let fetch = {
        let calls = calls.clone();
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                println!("  Fetch {}: {} posts", n, n * 40);
                Ok::<_, String>(Value::Array(vec![json!({ "title": "post" }); (n * 40) as usize]))
            }
        }
    };

    let posts = ItemPoller::until_more_than(fetch, pollwater::validator::DEFAULT_MIN_ITEMS)
        .and_then(|p| p.with_policy(PollPolicy::new().with_interval(Duration::from_millis(50))))
        .expect("valid configuration");

    posts.start();
    let status = posts.finished().await;
    println!(
        "Finished with {:?} after {} attempts, {} posts",
        status,
        posts.progress().attempts,
        posts.item_count()
    );
}

// ==================== Field completeness ====================

/// Example 2: wait until every comment of post 42 has a body.
///
/// The first call fails, the second returns a blank body, the third is
/// complete.
async fn example_field_completeness() {
    println!("\n=== Example 2: Field Completeness ===");

    let calls = Arc::new(AtomicU32::new(0));
    let fetch_by_id = {
        let calls = calls.clone();
        move |post_id: u64| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                println!("  Fetching comments of post {} (call {})", post_id, n + 1);
                match n {
                    0 => Err("503 Service Unavailable".to_string()),
                    1 => Ok(json!([{ "body": "first" }, { "body": "  " }])),
                    _ => Ok(json!([{ "body": "first" }, { "body": "second" }])),
                }
            }
        }
    };

    let comments = ItemPoller::until_field_filled(42u64, fetch_by_id, "body")
        .and_then(|p| p.with_policy(PollPolicy::new().with_interval(Duration::from_millis(50))))
        .expect("valid configuration");

    comments.start();
    let status = comments.finished().await;
    println!(
        "Finished with {:?}, {} comments",
        status,
        comments.item_count()
    );
}

// ==================== Observability ====================

/// Example 3: a hook and a subscriber watching a session that never
/// succeeds.
async fn example_observing_attempts() {
    println!("\n=== Example 3: Observing Attempts ===");

    let poller = Poller::builder()
        .action(|| async { Ok::<u32, String>(1) })
        .validator(|n: &u32| *n > 1)
        .max_attempts(3)
        .interval(Duration::from_millis(20))
        .on_attempt(|event: &AttemptEvent<'_, u32, String>| {
            println!(
                "  Attempt {} accepted={} next={:?}",
                event.attempt, event.accepted, event.next_delay
            );
        })
        .build()
        .expect("valid configuration");

    let mut progress = poller.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            if !p.active {
                return p;
            }
        }
        PollProgress::default()
    });

    poller.start();
    let status = poller.finished().await;
    let last = watcher.await.unwrap_or_default();
    println!("Finished with {:?}, subscriber saw {:?}", status, last.status);
}

// ==================== Stopping early ====================

/// Example 4: stop a session between attempts.
async fn example_stop() {
    println!("\n=== Example 4: Stopping Early ===");

    let poller = Poller::new(
        || async { Ok::<u32, String>(0) },
        PollPolicy::new()
            .with_max_attempts(10)
            .with_interval(Duration::from_millis(100)),
        |n: &u32| *n > 0,
    )
    .expect("valid configuration");

    poller.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    poller.stop();

    let session = poller.snapshot();
    println!(
        "Stopped after {} attempts, active={}, status={:?}",
        session.attempt_count(),
        session.is_polling_job_active(),
        session.validation_status()
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("======================================");
    println!("        Poll Patterns Example         ");
    println!("======================================");

    example_collection_size().await;
    example_field_completeness().await;
    example_observing_attempts().await;
    example_stop().await;

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
