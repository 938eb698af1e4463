//! Engine tests. Time is paused so intervals elapse instantly and
//! deterministically.

use super::*;
use crate::testing::ScriptedSource;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new()
        .with_max_attempts(max_attempts)
        .with_interval(Duration::from_millis(100))
}

/// An action whose first call blocks until the gate is opened; later calls
/// resolve immediately with their call number.
fn gated_action(
    gate: Arc<Notify>,
    calls: Arc<AtomicU32>,
) -> impl Fn() -> futures::future::BoxFuture<'static, Result<u32, String>> + Send + Sync + 'static
{
    use futures::FutureExt;
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let gate = Arc::clone(&gate);
        async move {
            if n == 0 {
                gate.notified().await;
            }
            Ok(n)
        }
        .boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_immediate_success_schedules_no_delay() {
    let source = ScriptedSource::<u32, String>::new([Ok(7)]);
    let poller = Poller::new(source.action(), PollPolicy::default(), |_: &u32| true).unwrap();

    let before = tokio::time::Instant::now();
    poller.start();
    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));

    let session = poller.snapshot();
    assert_eq!(session.attempt_count(), 1);
    assert_eq!(session.payload(), Some(&7));
    assert!(!session.is_polling_job_active());
    assert_eq!(source.calls(), 1);
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_boundary() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(3), |_: &u32| false).unwrap();

    poller.start();
    assert_eq!(
        poller.finished().await,
        Some(ValidationStatus::MaxAttemptsReached)
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    let session = poller.snapshot();
    assert_eq!(session.attempt_count(), 3);
    assert!(!session.is_polling_job_active());
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_error_then_success() {
    let source = ScriptedSource::new([Err("timeout".to_string()), Ok(vec![1, 2, 3])]);
    let poller = Poller::new(source.action(), fast_policy(5), |v: &Vec<i32>| {
        !v.is_empty()
    })
    .unwrap();

    poller.start();
    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
    assert_eq!(poller.snapshot().attempt_count(), 2);
    assert_eq!(poller.snapshot().payload(), Some(&vec![1, 2, 3]));
}

#[tokio::test(start_paused = true)]
async fn test_failures_count_against_budget() {
    let source = ScriptedSource::<u32, String>::new([Err("down".to_string())]);
    let poller = Poller::new(source.action(), fast_policy(2), |_: &u32| true).unwrap();

    poller.start();
    assert_eq!(
        poller.finished().await,
        Some(ValidationStatus::MaxAttemptsReached)
    );
    let session = poller.snapshot();
    assert_eq!(session.attempt_count(), 2);
    assert_eq!(session.error(), Some(&"down".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_success_beats_exhaustion_on_last_attempt() {
    let source = ScriptedSource::<u32, String>::new([Ok(0), Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(2), |n: &u32| *n == 1).unwrap();

    poller.start();
    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
    assert_eq!(poller.progress().attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_schedules_first_attempt_asynchronously() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(3), |_: &u32| true).unwrap();

    poller.start();
    let progress = poller.progress();
    assert!(progress.active);
    assert!(!progress.polling);
    assert_eq!(progress.attempts, 0);
    assert_eq!(source.calls(), 0);

    poller.finished().await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resets_session() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(2), |_: &u32| false).unwrap();

    poller.start();
    poller.finished().await;
    assert_eq!(poller.snapshot().attempt_count(), 2);

    poller.start();
    let session = poller.snapshot();
    assert!(session.is_polling_job_active());
    assert_eq!(session.attempt_count(), 0);
    assert!(session.last_result().is_none());
    assert!(session.validation_status().is_none());

    assert_eq!(
        poller.finished().await,
        Some(ValidationStatus::MaxAttemptsReached)
    );
    assert_eq!(source.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicU32::new(0));
    let poller = Poller::new(
        gated_action(Arc::clone(&gate), Arc::clone(&calls)),
        fast_policy(5),
        |_: &u32| false,
    )
    .unwrap();

    poller.start();
    poller.subscribe().wait_for(|p| p.polling).await.unwrap();
    poller.stop();
    assert!(!poller.progress().active);
    assert!(!poller.progress().polling);

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let session = poller.snapshot();
    assert_eq!(session.attempt_count(), 0);
    assert!(session.last_result().is_none());
    assert!(session.validation_status().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_discarded_result_never_reaches_validator() {
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicU32::new(0));
    let checks = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&checks);
    let poller = Poller::new(
        gated_action(Arc::clone(&gate), Arc::clone(&calls)),
        fast_policy(5),
        move |_: &u32| {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        },
    )
    .unwrap();

    poller.start();
    poller.subscribe().wait_for(|p| p.polling).await.unwrap();
    poller.stop();

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(checks.load(Ordering::SeqCst), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(poller.snapshot().validation_status().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_attempt() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(
        source.action(),
        fast_policy(5).with_interval(Duration::from_secs(1)),
        |_: &u32| false,
    )
    .unwrap();

    poller.start();
    poller
        .subscribe()
        .wait_for(|p| p.attempts == 1)
        .await
        .unwrap();
    poller.stop();
    assert_eq!(poller.finished().await, None);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(poller.snapshot().attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_while_in_flight_latest_start_wins() {
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicU32::new(0));
    let poller = Poller::new(
        gated_action(Arc::clone(&gate), Arc::clone(&calls)),
        fast_policy(5),
        |_: &u32| true,
    )
    .unwrap();

    poller.start();
    poller.subscribe().wait_for(|p| p.polling).await.unwrap();
    poller.start();
    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
    assert_eq!(poller.snapshot().payload(), Some(&1));

    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let session = poller.snapshot();
    assert_eq!(session.attempt_count(), 1);
    assert_eq!(session.payload(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_hook_sees_monotonic_attempts() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);

    let poller = Poller::builder()
        .action(source.action())
        .validator(|_: &u32| false)
        .policy(fast_policy(4))
        .on_attempt({
            let seen = Arc::clone(&seen);
            move |event: &AttemptEvent<'_, u32, String>| {
                seen.lock()
                    .unwrap()
                    .push((event.attempt, event.next_delay, event.accepted));
            }
        })
        .build()
        .unwrap();

    poller.start();
    poller.finished().await;

    let delay = Some(Duration::from_millis(100));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, delay, false),
            (2, delay, false),
            (3, delay, false),
            (4, None, false)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_validator_update_applies_mid_session() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(5), |_: &u32| false).unwrap();

    poller.start();
    poller
        .subscribe()
        .wait_for(|p| p.attempts == 1)
        .await
        .unwrap();
    poller.set_validator(|_: &u32| true);

    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
    assert_eq!(poller.progress().attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_policy_update_applies_mid_session() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(10), |_: &u32| false).unwrap();

    poller.start();
    poller
        .subscribe()
        .wait_for(|p| p.attempts == 1)
        .await
        .unwrap();
    poller.set_policy(fast_policy(2)).unwrap();

    assert_eq!(
        poller.finished().await,
        Some(ValidationStatus::MaxAttemptsReached)
    );
    assert_eq!(poller.progress().attempts, 2);
    assert_eq!(poller.policy().max_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_action_update_applies_mid_session() {
    let first = ScriptedSource::<u32, String>::new([Ok(1)]);
    let second = ScriptedSource::<u32, String>::new([Ok(2)]);
    let poller = Poller::new(first.action(), fast_policy(5), |n: &u32| *n == 2).unwrap();

    poller.start();
    poller
        .subscribe()
        .wait_for(|p| p.attempts == 1)
        .await
        .unwrap();
    poller.set_action(second.action());

    assert_eq!(poller.finished().await, Some(ValidationStatus::Success));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test(start_paused = true)]
#[should_panic(expected = "validator blew up")]
async fn test_validator_panic_resumes_in_finished() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(3), |_: &u32| -> bool {
        panic!("validator blew up")
    })
    .unwrap();

    poller.start();
    poller.finished().await;
}

#[tokio::test(start_paused = true)]
async fn test_validator_panic_ends_session() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(3), |_: &u32| -> bool {
        panic!("validator blew up")
    })
    .unwrap();

    poller.start();
    poller.subscribe().wait_for(|p| !p.active).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let session = poller.snapshot();
    assert!(!session.is_polling_job_active());
    assert!(!session.is_polling());
    assert!(session.validation_status().is_none());
    assert_eq!(session.attempt_count(), 1);
    assert_eq!(session.payload(), Some(&1));
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_polling() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(5), |_: &u32| false).unwrap();

    poller.start();
    poller
        .subscribe()
        .wait_for(|p| p.attempts == 1)
        .await
        .unwrap();
    drop(poller);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_without_start_returns_immediately() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let poller = Poller::new(source.action(), fast_policy(5), |_: &u32| true).unwrap();

    assert_eq!(poller.finished().await, None);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_builder_rejects_bad_configuration() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);

    let zero = Poller::builder()
        .action(source.action())
        .validator(|_: &u32| true)
        .max_attempts(0)
        .build();
    assert_eq!(zero.unwrap_err(), PollError::ZeroMaxAttempts);

    let no_validator = Poller::<u32, String>::builder()
        .action(source.action())
        .build();
    assert_eq!(no_validator.unwrap_err(), PollError::MissingValidator);

    let poller = Poller::builder()
        .action(source.action())
        .validator(|_: &u32| true)
        .interval(Duration::ZERO)
        .build()
        .unwrap();
    assert_eq!(
        poller.set_policy(PollPolicy::new().with_max_attempts(0)),
        Err(PollError::ZeroMaxAttempts)
    );
    assert_eq!(poller.policy().interval(), Duration::ZERO);
}

#[test]
fn test_build_outside_runtime_fails() {
    let source = ScriptedSource::<u32, String>::new([Ok(1)]);
    let result = Poller::new(source.action(), PollPolicy::default(), |_: &u32| true);
    assert_eq!(result.unwrap_err(), PollError::NoRuntime);
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn test_logs_terminal_outcomes() {
    let source = ScriptedSource::<u32, String>::new([Err("503".to_string())]);
    let poller = Poller::new(source.action(), fast_policy(2), |_: &u32| true).unwrap();

    poller.start();
    poller.finished().await;

    assert!(logs_contain("attempt failed"));
    assert!(logs_contain("attempt budget exhausted"));
}
