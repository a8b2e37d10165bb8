//! Integration tests for the middleware chain executor.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier::chain::{Chain, Flow, Handler};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn log_handler(chain: &Chain<Log>, name: &'static str) -> Arc<dyn Handler<Log>> {
    chain.use_fn(move |log: Log| async move {
        log.lock().unwrap().push(name);
        Flow::Continue(log)
    })
}

#[tokio::test]
async fn handlers_run_once_each_in_registration_order() {
    let chain: Chain<Log> = Chain::new();
    log_handler(&chain, "a");
    log_handler(&chain, "b");
    log_handler(&chain, "c");

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn terminate_skips_handlers_after_the_terminating_one() {
    let chain: Chain<Log> = Chain::new();
    log_handler(&chain, "a");
    chain.use_fn(|log: Log| async move {
        log.lock().unwrap().push("b");
        Flow::Terminate(log)
    });
    log_handler(&chain, "c");

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn removed_handler_is_absent_from_subsequent_runs() {
    let chain: Chain<Log> = Chain::new();
    log_handler(&chain, "a");
    let b = log_handler(&chain, "b");

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

    chain.remove_handler(&b);
    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["a"]);
}

#[tokio::test]
async fn handler_removed_mid_run_is_skipped_when_not_yet_reached() {
    let chain = Arc::new(Chain::<Log>::new());

    // Registered in order [remover, b, c]; the remover drops b before
    // the run reaches it.
    let slot: Arc<Mutex<Option<Arc<dyn Handler<Log>>>>> = Arc::new(Mutex::new(None));
    {
        let chain = Arc::clone(&chain);
        let slot = Arc::clone(&slot);
        chain.clone().use_fn(move |log: Log| {
            let chain = Arc::clone(&chain);
            let slot = Arc::clone(&slot);
            async move {
                log.lock().unwrap().push("remover");
                let b = slot.lock().unwrap().clone().unwrap();
                chain.remove_handler(&b);
                Flow::Continue(log)
            }
        });
    }
    let b = log_handler(&chain, "b");
    log_handler(&chain, "c");
    *slot.lock().unwrap() = Some(b);

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["remover", "c"]);
}

#[tokio::test]
async fn handler_added_mid_run_is_reached() {
    let chain = Arc::new(Chain::<Log>::new());
    {
        let chain = Arc::clone(&chain);
        chain.clone().use_fn(move |log: Log| {
            let chain = Arc::clone(&chain);
            async move {
                log.lock().unwrap().push("first");
                chain.use_fn(|log: Log| async move {
                    log.lock().unwrap().push("appended");
                    Flow::Continue(log)
                });
                Flow::Continue(log)
            }
        });
    }

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    assert_eq!(*log.lock().unwrap(), vec!["first", "appended"]);
}

#[tokio::test]
async fn completion_waits_for_a_deferred_advance() {
    let chain: Chain<Log> = Chain::new();
    log_handler(&chain, "sync");
    chain.use_fn(|log: Log| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        log.lock().unwrap().push("deferred");
        Flow::Continue(log)
    });

    let log = chain.run(Arc::new(Mutex::new(Vec::new()))).await;
    // The run only resolves after the deferred handler advanced.
    assert_eq!(*log.lock().unwrap(), vec!["sync", "deferred"]);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_cursor_state() {
    let chain = Arc::new(Chain::<Log>::new());
    for name in ["a", "b", "c"] {
        chain.use_fn(move |log: Log| async move {
            tokio::task::yield_now().await;
            log.lock().unwrap().push(name);
            Flow::Continue(log)
        });
    }

    let first = tokio::spawn({
        let chain = Arc::clone(&chain);
        async move { chain.run(Arc::new(Mutex::new(Vec::new()))).await }
    });
    let second = tokio::spawn({
        let chain = Arc::clone(&chain);
        async move { chain.run(Arc::new(Mutex::new(Vec::new()))).await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert_eq!(*first.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(*second.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn stalled_handler_withholds_completion() {
    let chain: Chain<Log> = Chain::new();
    chain.use_fn(|log: Log| async move {
        std::future::pending::<()>().await;
        Flow::Continue(log)
    });

    let run = chain.run(Arc::new(Mutex::new(Vec::new())));
    let timed_out = tokio::time::timeout(Duration::from_millis(50), run).await;
    assert!(timed_out.is_err());
}
