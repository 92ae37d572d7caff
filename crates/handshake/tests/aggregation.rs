//! Integration tests for depth statistics and growth series.

use chrono::{DateTime, NaiveDate, Utc};
use handshake::store::InMemoryConnectionStore;
use handshake::{CallContext, EngineConfig, Error, Limits};
use rstest::{fixture, rstest};
use std::collections::BTreeMap;

mod common;
use common::{StalledStore, engine, engine_with, graph};

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
}

/// Alice's connections: two before the window, then activity on June 3 and 5.
#[fixture]
async fn growth_store() -> InMemoryConnectionStore {
    let store = InMemoryConnectionStore::new(100);
    let history = [
        ("bob", "2026-05-20T10:00:00Z"),
        ("carol", "2026-05-31T23:59:59Z"),
        ("dave", "2026-06-03T00:00:00Z"),
        ("erin", "2026-06-03T18:30:00Z"),
        ("frank", "2026-06-05T23:59:59Z"),
        ("gina", "2026-06-06T00:00:00Z"),
    ];
    for (friend, created) in history {
        store
            .connect("alice".into(), friend.into(), at(created))
            .await
            .unwrap();
    }
    // Connections not touching alice must not count.
    store
        .connect("bob".into(), "carol".into(), at("2026-06-02T12:00:00Z"))
        .await
        .unwrap();
    store
}

// ========== Depth Statistics ==========

#[tokio::test]
async fn test_histogram_counts_each_level() {
    let engine = engine(
        graph(&[
            ("root", "a"),
            ("root", "b"),
            ("a", "c"),
            ("b", "c"),
            ("c", "d"),
            ("d", "e"),
        ])
        .await,
    );

    let histogram = engine
        .stats_by_depth(&CallContext::new(), &"root".into())
        .await
        .unwrap();

    assert_eq!(histogram.counts, BTreeMap::from([(1, 2), (2, 1), (3, 1)]));
    assert_eq!(histogram.total(), 4);
    assert!(!histogram.truncated);
}

#[tokio::test]
async fn test_histogram_zero_fills_unreached_levels() {
    let engine = engine(graph(&[("root", "a")]).await);

    let histogram = engine
        .stats_by_depth(&CallContext::new(), &"root".into())
        .await
        .unwrap();

    assert_eq!(histogram.counts, BTreeMap::from([(1, 1), (2, 0), (3, 0)]));
}

#[tokio::test]
async fn test_histogram_respects_configured_levels() {
    let config = EngineConfig {
        limits: Limits {
            stats_depth: 2,
            ..Limits::default()
        },
        ..EngineConfig::default()
    };
    let engine = engine_with(graph(&[("r", "a"), ("a", "b"), ("b", "c")]).await, config);

    let histogram = engine
        .stats_by_depth(&CallContext::new(), &"r".into())
        .await
        .unwrap();

    assert_eq!(histogram.counts, BTreeMap::from([(1, 1), (2, 1)]));
}

// ========== Growth Series ==========

#[rstest]
#[tokio::test]
async fn test_growth_is_cumulative_and_zero_filled(
    #[future] growth_store: InMemoryConnectionStore,
) {
    let engine = engine(growth_store.await);

    let series = engine
        .growth_series_until(&CallContext::new(), &"alice".into(), 5, june(5))
        .await
        .unwrap();

    let points: Vec<_> = series.iter().map(|p| (p.date, p.cumulative)).collect();
    assert_eq!(
        points,
        vec![
            (june(1), 2),
            (june(2), 2),
            (june(3), 4),
            (june(4), 4),
            (june(5), 5),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_single_day_window(#[future] growth_store: InMemoryConnectionStore) {
    let engine = engine(growth_store.await);

    let series = engine
        .growth_series_until(&CallContext::new(), &"alice".into(), 1, june(6))
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].date, june(6));
    assert_eq!(series[0].cumulative, 6);
}

#[tokio::test]
async fn test_growth_ending_today_has_requested_length() {
    let engine = engine(graph(&[("a", "b")]).await);

    let series = engine
        .growth_series(&CallContext::new(), &"a".into(), 7)
        .await
        .unwrap();

    assert_eq!(series.len(), 7);
    assert_eq!(series.last().unwrap().date, Utc::now().date_naive());
    assert_eq!(series.last().unwrap().cumulative, 1);
}

#[rstest]
#[case::zero(0)]
#[case::over_limit(367)]
#[tokio::test]
async fn test_growth_window_bounds(#[case] days: u32) {
    let engine = engine(graph(&[("a", "b")]).await);

    let err = engine
        .growth_series_until(&CallContext::new(), &"a".into(), days, june(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "days", .. }));
}

#[tokio::test]
async fn test_growth_deadline() {
    let engine = engine(StalledStore::new(graph(&[("a", "b")]).await));
    let ctx = CallContext::new().with_timeout(std::time::Duration::from_millis(25));

    let err = engine
        .growth_series_until(&ctx, &"a".into(), 3, june(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded(_)));
}
