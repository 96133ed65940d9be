use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use tokio::sync::oneshot;
use tokio::time::sleep;

use super::SequentialRequestQueue;
use crate::domain::models::QueueError;

#[derive(Debug, PartialEq, Eq)]
enum Mark {
    Start(u32),
    End(u32),
}

fn blocked_request(
    queue: &SequentialRequestQueue,
) -> (oneshot::Sender<()>, super::QueueOutcome<&'static str>) {
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let outcome = queue.add(move || async move {
        let _ = release_rx.await;
        return anyhow::Ok("released");
    });

    return (release_tx, outcome);
}

#[tokio::test]
async fn it_runs_requests_in_submission_order() -> Result<()> {
    let queue = SequentialRequestQueue::new();
    let marks = Arc::new(Mutex::new(vec![]));

    let outcomes = [(1, 100), (2, 50), (3, 75)]
        .into_iter()
        .map(|(id, delay)| {
            let marks = marks.clone();
            return queue.add(move || async move {
                marks.lock().unwrap().push(Mark::Start(id));
                sleep(Duration::from_millis(delay)).await;
                marks.lock().unwrap().push(Mark::End(id));
                return anyhow::Ok(id);
            });
        })
        .collect::<Vec<_>>();

    let mut results = vec![];
    for outcome in outcomes {
        results.push(outcome.await?);
    }

    assert_eq!(results, vec![1, 2, 3]);
    assert_eq!(
        *marks.lock().unwrap(),
        vec![
            Mark::Start(1),
            Mark::End(1),
            Mark::Start(2),
            Mark::End(2),
            Mark::Start(3),
            Mark::End(3),
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_keeps_going_after_a_failed_request() -> Result<()> {
    let queue = SequentialRequestQueue::new();

    let first = queue.add(|| async { return anyhow::Ok("A") });
    let second = queue.add(|| async {
        sleep(Duration::from_millis(10)).await;
        return Err::<&str, _>(anyhow!("upstream said no"));
    });
    let third = queue.add(|| async { return anyhow::Ok("C") });

    let results = vec![first.await, second.await, third.await];

    assert_eq!(results[0].as_ref().unwrap(), &"A");
    match &results[1] {
        Err(QueueError::Task(err)) => assert_eq!(err.to_string(), "upstream said no"),
        other => panic!("expected task failure, got {other:?}"),
    }
    assert_eq!(results[2].as_ref().unwrap(), &"C");
    assert_eq!(results.iter().filter(|res| return res.is_ok()).count(), 2);

    return Ok(());
}

#[tokio::test]
async fn it_counts_only_waiting_requests() -> Result<()> {
    let queue = SequentialRequestQueue::new();
    assert_eq!(queue.length(), 0);
    assert!(!queue.is_processing());

    let (release_tx, first) = blocked_request(&queue);
    assert_eq!(queue.length(), 0);
    assert!(queue.is_processing());

    let second = queue.add(|| async { return anyhow::Ok("second") });
    assert_eq!(queue.length(), 1);

    let third = queue.add(|| async { return anyhow::Ok("third") });
    assert_eq!(queue.length(), 2);

    release_tx.send(()).unwrap();
    assert_eq!(first.await?, "released");
    assert_eq!(second.await?, "second");
    assert_eq!(third.await?, "third");

    assert_eq!(queue.length(), 0);

    return Ok(());
}

#[tokio::test]
async fn it_does_not_invoke_a_request_before_its_turn() -> Result<()> {
    let queue = SequentialRequestQueue::new();
    let invoked = Arc::new(Mutex::new(false));

    let (release_tx, first) = blocked_request(&queue);
    let flag = invoked.clone();
    let second = queue.add(move || {
        *flag.lock().unwrap() = true;
        return async { return anyhow::Ok(()) };
    });

    sleep(Duration::from_millis(20)).await;
    assert!(!*invoked.lock().unwrap());

    release_tx.send(()).unwrap();
    first.await?;
    second.await?;
    assert!(*invoked.lock().unwrap());

    return Ok(());
}

#[tokio::test]
async fn it_cancels_waiting_requests_on_clear() -> Result<()> {
    let queue = SequentialRequestQueue::new();

    let (release_tx, first) = blocked_request(&queue);
    let second = queue.add(|| async { return anyhow::Ok("second") });
    let third = queue.add(|| async { return anyhow::Ok("third") });

    assert_eq!(queue.clear(), 2);
    assert_eq!(queue.length(), 0);
    assert!(matches!(second.await, Err(QueueError::Cancelled)));
    assert!(matches!(third.await, Err(QueueError::Cancelled)));

    release_tx.send(()).unwrap();
    assert_eq!(first.await?, "released");

    let after = queue.add(|| async { return anyhow::Ok("after") });
    assert_eq!(after.await?, "after");

    return Ok(());
}

#[tokio::test]
async fn it_times_out_a_stuck_request_and_moves_on() -> Result<()> {
    let queue = SequentialRequestQueue::new();

    let stuck = queue.add_with_timeout(
        || async {
            sleep(Duration::from_secs(30)).await;
            return anyhow::Ok("never");
        },
        Duration::from_millis(20),
    );
    let next = queue.add(|| async { return anyhow::Ok("next") });

    match stuck.await {
        Err(QueueError::TimedOut(limit)) => assert_eq!(limit, Duration::from_millis(20)),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(next.await?, "next");

    return Ok(());
}

#[tokio::test]
async fn it_applies_the_default_timeout() {
    let queue = SequentialRequestQueue::with_timeout(Duration::from_millis(20));

    let res = queue
        .add(|| async {
            sleep(Duration::from_secs(30)).await;
            return anyhow::Ok(());
        })
        .await;

    assert!(matches!(res, Err(QueueError::TimedOut(_))));
}

#[tokio::test]
async fn it_survives_a_panicking_request() -> Result<()> {
    let queue = SequentialRequestQueue::new();

    let broken = queue.add(|| async {
        if true {
            panic!("request blew up");
        }
        return anyhow::Ok(());
    });
    let next = queue.add(|| async { return anyhow::Ok("next") });

    assert!(matches!(broken.await, Err(QueueError::Dropped)));
    assert_eq!(next.await?, "next");
    assert!(!queue.is_processing());

    return Ok(());
}

#[tokio::test]
async fn it_shares_one_queue_between_clones() -> Result<()> {
    let queue = SequentialRequestQueue::new();
    let clone = queue.clone();

    let (release_tx, first) = blocked_request(&queue);
    let second = clone.add(|| async { return anyhow::Ok("from clone") });
    assert_eq!(queue.length(), 1);

    release_tx.send(()).unwrap();
    first.await?;
    assert_eq!(second.await?, "from clone");

    return Ok(());
}
