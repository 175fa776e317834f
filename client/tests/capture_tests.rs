//! Boundary capture integration tests
//!
//! Trace sessions driven through a host-fed location source, plus
//! properties of the closed rings both capture modes produce.

use std::time::Duration;

use proptest::prelude::*;
use shared::{LatLng, MIN_BOUNDARY_POINTS};
use tokio::sync::oneshot;

use farmdesk::external::ChannelLocationSource;
use farmdesk::services::capture::{
    trace_boundary, CaptureError, DrawSession, PositionFix, TraceProgress, TraceSession,
};

/// Let the trace task pick up everything pushed so far
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ============================================================================
// Trace mode
// ============================================================================

#[tokio::test]
async fn test_trace_closes_ring_on_stop() {
    let source = ChannelLocationSource::new();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = {
        let source = source.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            let ring = trace_boundary(
                &source,
                2.0,
                async {
                    let _ = stop_rx.await;
                },
                |p: &TraceProgress| seen.push(p.clone()),
            )
            .await;
            (ring, seen)
        })
    };

    while !source.is_watching() {
        settle().await;
    }

    for (lat, lng) in [(9.0, 7.0), (9.0, 7.0001), (9.001, 7.0), (9.001, 7.001)] {
        assert!(source.push(PositionFix::new(lat, lng, Some(3.0))));
        settle().await;
    }
    stop_tx.send(()).unwrap();

    let (ring, seen) = driver.await.unwrap();
    let ring = ring.unwrap().unwrap();

    // (9.0, 7.0001) is ~11 m from the first fix, so all four are kept
    assert_eq!(ring.vertex_count(), 4);
    assert_eq!(ring.points().first(), ring.points().last());

    assert_eq!(seen.len(), 4);
    assert_eq!(seen[3].accepted_points, 4);
    assert_eq!(seen[3].accuracy_meters, Some(3.0));
    assert!(!source.is_watching());
}

#[tokio::test]
async fn test_trace_with_two_points_is_noop() {
    let source = ChannelLocationSource::new();
    let driver = {
        let source = source.clone();
        tokio::spawn(async move {
            trace_boundary(&source, 2.0, std::future::pending::<()>(), |_: &TraceProgress| {}).await
        })
    };

    while !source.is_watching() {
        settle().await;
    }
    source.push(PositionFix::new(9.0, 7.0, None));
    source.push(PositionFix::new(9.001, 7.0, None));
    settle().await;
    // The device going away ends the trace like a stop
    source.close();

    let result = driver.await.unwrap();
    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn test_permission_denied_aborts_trace() {
    let source = ChannelLocationSource::denied();
    let result = trace_boundary(&source, 2.0, std::future::pending::<()>(), |_: &TraceProgress| {}).await;
    assert_eq!(result, Err(CaptureError::PermissionDenied));
}

#[tokio::test]
async fn test_source_failure_discards_points() {
    let source = ChannelLocationSource::new();
    let driver = {
        let source = source.clone();
        tokio::spawn(async move {
            trace_boundary(&source, 2.0, std::future::pending::<()>(), |_: &TraceProgress| {}).await
        })
    };

    while !source.is_watching() {
        settle().await;
    }
    for (lat, lng) in [(9.0, 7.0), (9.001, 7.0), (9.001, 7.001)] {
        source.push(PositionFix::new(lat, lng, None));
    }
    source.fail(CaptureError::Unavailable("signal lost".to_string()));

    let result = driver.await.unwrap();
    assert_eq!(
        result,
        Err(CaptureError::Unavailable("signal lost".to_string()))
    );
    assert!(!source.is_watching());
}

// ============================================================================
// Property Tests
// ============================================================================

fn nigeria_point() -> impl Strategy<Value = (f64, f64)> {
    (4.0f64..14.0, 3.0f64..15.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Drawn rings with enough vertices are closed and keep every vertex
    #[test]
    fn prop_draw_ring_is_closed(points in prop::collection::vec(nigeria_point(), 3..20)) {
        let mut draw = DrawSession::new();
        for (lat, lng) in &points {
            draw.add_vertex(LatLng::new(*lat, *lng)).unwrap();
        }
        let ring = draw.finish();

        // Duplicated vertices may leave fewer than three distinct points
        if let Ok(ring) = ring {
            let closed = ring.points();
            prop_assert_eq!(closed.first(), closed.last());
            prop_assert!(ring.vertex_count() >= MIN_BOUNDARY_POINTS);
            prop_assert!(closed.len() <= points.len() + 1);
        }
    }

    /// Consecutive accepted trace points are always farther apart than the threshold
    #[test]
    fn prop_trace_drops_jitter(
        steps in prop::collection::vec((-0.00005f64..0.00005, -0.00005f64..0.00005), 1..60),
        min_distance in 1.0f64..5.0,
    ) {
        let mut session = TraceSession::new(min_distance);
        let (mut lat, mut lng) = (9.0, 7.0);
        for (dlat, dlng) in steps {
            lat += dlat;
            lng += dlng;
            session.record(&PositionFix::new(lat, lng, None));
        }

        for pair in session.points().windows(2) {
            prop_assert!(pair[0].distance_meters(&pair[1]) > min_distance);
        }

        let kept = session.points().len();
        match session.finish() {
            Some(ring) => {
                prop_assert!(kept >= MIN_BOUNDARY_POINTS);
                prop_assert_eq!(ring.points().first(), ring.points().last());
            }
            None => prop_assert!(kept < MIN_BOUNDARY_POINTS),
        }
    }
}
