use super::*;
use crate::queue;
use crate::test_helpers::{ScriptedSource, drain, photo_post, photo_url, post};

const HOST: &str = "demo.example.com";

/// Posts `newest..=oldest` stepping down by `step`, one photo each
fn descending(newest: i64, oldest: i64, step: i64) -> Vec<crate::types::Post> {
    (oldest..=newest)
        .rev()
        .step_by(step as usize)
        .map(photo_post)
        .collect()
}

#[tokio::test]
async fn test_bootstrap_queues_nothing_and_sets_watermark() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![photo_post(105), photo_post(103)]);
    let (tx, mut rx) = queue::channel();
    let feed = Feed::new(HOST);

    let report = scan(&feed, &source, &tx, DEFAULT_PAGE_SIZE).await.unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::Bootstrapped);
    assert_eq!(report.watermark, Some(PostId(105)));
    assert_eq!(report.urls_queued, 0);
    assert!(drain(&mut rx).await.is_empty());
    assert_eq!(
        source.offsets_for(HOST),
        vec![0],
        "bootstrap must stop after the first page"
    );
}

#[tokio::test]
async fn test_bootstrap_of_large_feed_reads_one_page() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, descending(200, 101, 1));
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::new(HOST), &source, &tx, 20).await.unwrap();
    drop(tx);

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.watermark, Some(PostId(200)));
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn test_bootstrap_of_empty_feed_keeps_watermark_absent() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![]);
    let (tx, _rx) = queue::channel();

    let report = scan(&Feed::new(HOST), &source, &tx, 20).await.unwrap();

    assert_eq!(report.end, ScanEnd::Exhausted);
    assert_eq!(report.watermark, None);
}

#[tokio::test]
async fn test_incremental_queues_newer_posts_newest_first() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![photo_post(110), photo_post(108), photo_post(105)]);
    let (tx, mut rx) = queue::channel();
    let feed = Feed::with_watermark(HOST, PostId(105));

    let report = scan(&feed, &source, &tx, DEFAULT_PAGE_SIZE).await.unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::ReachedWatermark);
    assert_eq!(report.watermark, Some(PostId(110)));
    assert_eq!(report.urls_queued, 2);
    let urls: Vec<_> = drain(&mut rx).await.into_iter().map(|t| t.url).collect();
    assert_eq!(urls, vec![photo_url(110), photo_url(108)]);
}

#[tokio::test]
async fn test_photos_queued_in_post_then_photo_order() {
    let source = ScriptedSource::new();
    source.set_posts(
        HOST,
        vec![
            post(12, &["https://m.example.com/12a.jpg", "https://m.example.com/12b.jpg"]),
            post(11, &["https://m.example.com/11a.jpg"]),
            post(10, &["https://m.example.com/10a.jpg"]),
        ],
    );
    let (tx, mut rx) = queue::channel();

    scan(&Feed::with_watermark(HOST, PostId(10)), &source, &tx, 20)
        .await
        .unwrap();
    drop(tx);

    let tasks = drain(&mut rx).await;
    let urls: Vec<_> = tasks.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://m.example.com/12a.jpg",
            "https://m.example.com/12b.jpg",
            "https://m.example.com/11a.jpg",
        ]
    );
    assert!(tasks.iter().all(|t| t.hostname == HOST));
}

#[tokio::test]
async fn test_incremental_spans_multiple_pages() {
    let source = ScriptedSource::new();
    // 150..=101 newest first, watermark at 107 sits on the third page of 20
    source.set_posts(HOST, descending(150, 101, 1));
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::with_watermark(HOST, PostId(107)), &source, &tx, 20)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::ReachedWatermark);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.watermark, Some(PostId(150)));
    assert_eq!(source.offsets_for(HOST), vec![0, 20, 40]);

    let urls: Vec<_> = drain(&mut rx).await.into_iter().map(|t| t.url).collect();
    let expected: Vec<_> = (108..=150).rev().map(photo_url).collect();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_only_posts_above_watermark_are_queued() {
    let source = ScriptedSource::new();
    // Gaps in ids: 60, 55, ..., 5
    source.set_posts(HOST, descending(60, 5, 5));
    let (tx, mut rx) = queue::channel();

    // 33 is not a post id; the scan must stop at 30 without queueing it
    let report = scan(&Feed::with_watermark(HOST, PostId(33)), &source, &tx, 4)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::PassedWatermark);
    let urls: Vec<_> = drain(&mut rx).await.into_iter().map(|t| t.url).collect();
    assert_eq!(
        urls,
        vec![
            photo_url(60),
            photo_url(55),
            photo_url(50),
            photo_url(45),
            photo_url(40),
            photo_url(35)
        ]
    );
}

#[tokio::test]
async fn test_watermark_already_newest_queues_nothing() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![photo_post(105), photo_post(103)]);
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::with_watermark(HOST, PostId(105)), &source, &tx, 20)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::ReachedWatermark);
    assert_eq!(report.watermark, Some(PostId(105)));
    assert_eq!(report.pages_fetched, 1);
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn test_stale_watermark_above_every_post_stops_cleanly() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![photo_post(90), photo_post(80)]);
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::with_watermark(HOST, PostId(100)), &source, &tx, 20)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::PassedWatermark);
    assert!(drain(&mut rx).await.is_empty());
    assert_eq!(
        report.watermark,
        Some(PostId(90)),
        "first post of the scan still becomes the watermark"
    );
}

#[tokio::test]
async fn test_watermark_missing_upstream_exhausts_feed() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![photo_post(30), photo_post(20)]);
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::with_watermark(HOST, PostId(10)), &source, &tx, 2)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.end, ScanEnd::Exhausted);
    assert_eq!(report.watermark, Some(PostId(30)));
    assert_eq!(source.offsets_for(HOST), vec![0, 2]);
    assert_eq!(drain(&mut rx).await.len(), 2);
}

#[tokio::test]
async fn test_posts_without_photos_are_skipped_but_counted_as_new() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, vec![post(12, &[]), photo_post(11), photo_post(10)]);
    let (tx, mut rx) = queue::channel();

    let report = scan(&Feed::with_watermark(HOST, PostId(10)), &source, &tx, 20)
        .await
        .unwrap();
    drop(tx);

    assert_eq!(report.watermark, Some(PostId(12)));
    let urls: Vec<_> = drain(&mut rx).await.into_iter().map(|t| t.url).collect();
    assert_eq!(urls, vec![photo_url(11)]);
}

#[tokio::test]
async fn test_fetch_error_mid_scan_propagates() {
    let source = ScriptedSource::new();
    source.set_posts(HOST, descending(150, 101, 1));
    source.fail_from(HOST, 20);
    let (tx, mut rx) = queue::channel();
    let feed = Feed::with_watermark(HOST, PostId(101));

    let err = scan(&feed, &source, &tx, 20).await.unwrap_err();
    drop(tx);

    assert!(matches!(err, FetchError::Api { .. }));
    assert_eq!(
        feed.watermark(),
        Some(PostId(101)),
        "scan must not touch the watermark"
    );
    // URLs from the first page were already handed to the workers
    assert_eq!(drain(&mut rx).await.len(), 20);
}

#[test]
fn test_apply_scan_updates_watermark_and_state() {
    let mut feed = Feed::new(HOST);
    assert_eq!(feed.state(), ScanState::Idle);

    feed.begin_scan();
    assert_eq!(feed.state(), ScanState::Scanning);

    feed.apply_scan(&ScanReport {
        end: ScanEnd::Bootstrapped,
        watermark: Some(PostId(105)),
        pages_fetched: 1,
        urls_queued: 0,
    });

    assert_eq!(feed.watermark(), Some(PostId(105)));
    assert_eq!(feed.state(), ScanState::Done);
}

#[test]
fn test_reset_clears_watermark() {
    let mut feed = Feed::with_watermark(HOST, PostId(42));

    feed.reset();

    assert_eq!(feed.watermark(), None);
    assert_eq!(feed.state(), ScanState::Failed);
}

#[tokio::test]
async fn test_bootstrap_then_incremental_scenario() {
    let source = ScriptedSource::new();
    let (tx, mut rx) = queue::channel();
    let mut feed = Feed::new(HOST);

    // First tick: bootstrap
    source.set_posts(HOST, vec![photo_post(105), photo_post(103)]);
    let report = scan(&feed, &source, &tx, 20).await.unwrap();
    feed.apply_scan(&report);
    assert_eq!(feed.watermark(), Some(PostId(105)));

    // Second tick: two new posts on top
    source.set_posts(
        HOST,
        vec![photo_post(110), photo_post(108), photo_post(105), photo_post(103)],
    );
    let report = scan(&feed, &source, &tx, 20).await.unwrap();
    feed.apply_scan(&report);
    drop(tx);

    assert_eq!(feed.watermark(), Some(PostId(110)));
    let urls: Vec<_> = drain(&mut rx).await.into_iter().map(|t| t.url).collect();
    assert_eq!(urls, vec![photo_url(110), photo_url(108)]);
}
