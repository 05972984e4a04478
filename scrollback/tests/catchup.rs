mod common;

use std::time::Duration;

use common::*;
use scrollback::{
    CrawlOptions, Cursor, Direction, Event, Handlers, History, HistoryConfig, HistoryError,
    MemoryBackend, QueryError,
};
use tokio_util::sync::CancellationToken;

fn history<B: scrollback::HistoryBackend>(backend: B) -> History<B> {
    History::new(backend, HistoryConfig::default(), Handlers::new())
}

fn chunk(n: usize) -> CrawlOptions {
    CrawlOptions::default().chunk_size(n)
}

#[tokio::test(start_paused = true)]
async fn short_page_ends_the_crawl() {
    let h = history(ScriptedBackend::new([
        Reply::Page(vec![text("m3", true), text("m2", false)]),
        Reply::Page(vec![text("m4", false)]),
        Reply::Page(texts(&["never"])),
    ]));
    let (handlers, seen) = collector();

    h.load_history_after("c1", "m1", Some(handlers), chunk(2)).await;

    assert_eq!(raw_ids(&seen), ["m3", "m2", "m4"]);
    let q = h.backend().queries();
    assert_eq!(q.len(), 2);
    assert_eq!(q[0].cursor, Cursor::new("m1", true, Direction::After));
    assert_eq!(q[1].cursor, Cursor::new("m3", true, Direction::After));
}

#[tokio::test(start_paused = true)]
async fn two_not_found_in_a_row_give_up() {
    let h = history(ScriptedBackend::new([
        Reply::Fail(QueryError::Status(404)),
        Reply::Fail(QueryError::Status(404)),
        Reply::Page(texts(&["never"])),
    ]));
    let (handlers, seen) = collector();

    h.load_history_after("c1", "bogus", Some(handlers), chunk(5)).await;

    let q = h.backend().queries();
    assert_eq!(q.len(), 2);
    assert!(q[0].cursor.anchor_is_own);
    assert!(!q[1].cursor.anchor_is_own);
    assert_eq!(q[1].cursor.anchor_id, "bogus");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn not_found_on_foreign_anchor_is_reported_once_then_gives_up() {
    let h = history(ScriptedBackend::new([
        Reply::Page(vec![text("m3", false), text("m2", true)]),
        Reply::Fail(QueryError::Status(404)),
        Reply::Fail(QueryError::Status(404)),
        Reply::Page(texts(&["never"])),
    ]));
    let (handlers, seen) = collector();

    h.load_history_after("c1", "m1", Some(handlers), chunk(2)).await;

    assert_eq!(h.backend().queries().len(), 3);
    assert_eq!(labels(&seen), ["typed(m3)", "raw(m3)", "typed(m2)", "raw(m2)", "error"]);
    let events = seen.lock().unwrap();
    assert_eq!(
        events[4],
        Event::Error(HistoryError::AmbiguousOwnership { message_id: "m3".into(), owner_guess: false }),
    );
}

#[tokio::test(start_paused = true)]
async fn generic_failures_are_dispatched_and_retried() {
    let h = history(ScriptedBackend::new([
        Reply::Fail(QueryError::Io("reset".into())),
        Reply::Fail(QueryError::Status(500)),
        Reply::Page(vec![text("m2", false)]),
    ]));
    let (handlers, seen) = collector();

    h.load_history_after("c1", "m1", Some(handlers), chunk(3)).await;

    assert_eq!(labels(&seen), ["error", "error", "typed(m2)", "raw(m2)"]);
    let q = h.backend().queries();
    assert_eq!(q.len(), 3);
    assert!(q.iter().all(|r| r.cursor == Cursor::after("m1")));
}

#[tokio::test(start_paused = true)]
async fn pauses_between_pages() {
    let h = history(ScriptedBackend::new([
        Reply::Page(vec![text("m3", true), text("m2", false)]),
        Reply::Fail(QueryError::Status(404)),
        Reply::Page(Vec::new()),
    ]));
    let start = tokio::time::Instant::now();

    let options = chunk(2).pause(Duration::from_secs(5));
    h.load_history_after("c1", "m1", None, options).await;

    // one page pause, then the one second ownership retry pause
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_millis(6100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn catches_up_past_a_foreign_anchor() {
    let backend = MemoryBackend::new();
    for i in 1..=6 {
        backend.push("c1", text(&format!("m{i}"), i % 2 == 0));
    }
    let h = history(backend);
    let (handlers, seen) = collector();

    // m1 is not ours: first query is answered 404, the retry succeeds
    h.load_history_after("c1", "m1", Some(handlers), chunk(2)).await;

    assert_eq!(raw_ids(&seen), ["m3", "m2", "m5", "m4", "m6"]);
    let q = h.backend().queries();
    assert_eq!(q.len(), 4);
    assert_eq!(q[1].cursor, Cursor::new("m1", false, Direction::After));
    assert_eq!(q[2].cursor, Cursor::new("m3", false, Direction::After));
}

#[tokio::test(start_paused = true)]
async fn zero_chunk_size_does_nothing() {
    let h = history(ScriptedBackend::new([Reply::Page(texts(&["m2"]))]));
    h.load_history_after("c1", "m1", None, chunk(0)).await;
    assert!(h.backend().queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_stops_before_next_query() {
    let h = history(ScriptedBackend::new([
        Reply::Fail(QueryError::Dropped),
        Reply::Fail(QueryError::Dropped),
    ]));
    let token = CancellationToken::new();
    let (handlers, seen) = collector();

    let cancel = token.clone();
    let crawl = h.load_history_after("c1", "m1", Some(handlers), chunk(2).cancel_on(token));
    let stop = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    tokio::join!(crawl, stop);

    assert_eq!(h.backend().queries().len(), 1);
    assert_eq!(labels(&seen), ["error"]);
}
