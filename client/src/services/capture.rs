//! Boundary capture
//!
//! Two ways to produce a farm outline: clicking vertices on the map
//! ([`DrawSession`]) or walking the boundary with a GPS receiver
//! ([`trace_boundary`]).

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    accept_trace_point, validate_coordinates, BoundaryRing, LatLng, RingError, MIN_BOUNDARY_POINTS,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Minimum movement between accepted GPS fixes, in meters
pub const DEFAULT_MIN_DISTANCE_METERS: f64 = 2.0;

/// Location source failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(&'static str),
}

/// A single reading from a location source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFix {
    pub position: LatLng,
    /// Horizontal accuracy radius in meters, when the source reports one
    pub accuracy_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(lat: f64, lng: f64, accuracy_meters: Option<f64>) -> Self {
        Self {
            position: LatLng::new(lat, lng),
            accuracy_meters,
            timestamp: Utc::now(),
        }
    }
}

pub type FixResult = Result<PositionFix, CaptureError>;

/// Live subscription to a location source
///
/// The subscription is released by [`PositionWatch::cancel`] or when the
/// watch is dropped, whichever comes first.
pub struct PositionWatch {
    receiver: mpsc::Receiver<FixResult>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl PositionWatch {
    pub fn new(receiver: mpsc::Receiver<FixResult>, on_cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Next fix, or `None` once the source has stopped
    pub async fn next(&mut self) -> Option<FixResult> {
        if self.on_cancel.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(release) = self.on_cancel.take() {
            self.receiver.close();
            release();
            tracing::debug!("Position watch cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.on_cancel.is_some()
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Anything that can stream device positions
pub trait LocationSource: Send + Sync {
    /// Start watching; fails when the source is missing or access is denied
    fn watch(&self) -> Result<PositionWatch, CaptureError>;
}

// ============================================================================
// Trace mode
// ============================================================================

/// Snapshot pushed to the observer on every fix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceProgress {
    pub accepted_points: usize,
    pub fixes_seen: usize,
    pub latest: Option<LatLng>,
    pub accuracy_meters: Option<f64>,
    /// Whether the most recent fix was kept
    pub last_fix_accepted: bool,
}

/// Points collected while walking a boundary
#[derive(Debug, Clone)]
pub struct TraceSession {
    points: Vec<LatLng>,
    min_distance_meters: f64,
    fixes_seen: usize,
    last_accuracy: Option<f64>,
    last_fix_accepted: bool,
}

impl TraceSession {
    pub fn new(min_distance_meters: f64) -> Self {
        Self {
            points: Vec::new(),
            min_distance_meters,
            fixes_seen: 0,
            last_accuracy: None,
            last_fix_accepted: false,
        }
    }

    /// Record a fix; returns whether it was appended
    ///
    /// Fixes within the minimum distance of the last accepted point are
    /// treated as jitter and dropped.
    pub fn record(&mut self, fix: &PositionFix) -> bool {
        self.fixes_seen += 1;
        self.last_accuracy = fix.accuracy_meters;

        let accepted =
            accept_trace_point(self.points.last(), &fix.position, self.min_distance_meters);

        if accepted {
            self.points.push(fix.position);
        }
        self.last_fix_accepted = accepted;
        accepted
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn progress(&self) -> TraceProgress {
        TraceProgress {
            accepted_points: self.points.len(),
            fixes_seen: self.fixes_seen,
            latest: self.points.last().copied(),
            accuracy_meters: self.last_accuracy,
            last_fix_accepted: self.last_fix_accepted,
        }
    }

    /// Close the traced ring, or `None` when fewer than three points were kept
    pub fn finish(self) -> Option<BoundaryRing> {
        if self.points.len() < MIN_BOUNDARY_POINTS {
            tracing::info!(
                points = self.points.len(),
                "Trace stopped with too few points, discarding"
            );
            return None;
        }
        BoundaryRing::close(self.points).ok()
    }
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DISTANCE_METERS)
    }
}

/// Walk a boundary until `stop` resolves or the source runs out
///
/// The watch is held only for the duration of this call. A source error
/// aborts the trace and no partial polygon is returned.
pub async fn trace_boundary<S, F, P>(
    source: &S,
    min_distance_meters: f64,
    stop: F,
    mut on_progress: P,
) -> Result<Option<BoundaryRing>, CaptureError>
where
    S: LocationSource + ?Sized,
    F: Future<Output = ()>,
    P: FnMut(&TraceProgress),
{
    let mut watch = source.watch()?;
    let mut session = TraceSession::new(min_distance_meters);
    tokio::pin!(stop);

    tracing::info!(min_distance_meters, "Trace started");

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = watch.next() => match next {
                Some(Ok(fix)) => {
                    session.record(&fix);
                    on_progress(&session.progress());
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Trace aborted");
                    return Err(e);
                }
                None => break,
            },
        }
    }

    watch.cancel();
    Ok(session.finish())
}

// ============================================================================
// Draw mode
// ============================================================================

/// Vertices placed by clicking on the map
#[derive(Debug, Clone, Default)]
pub struct DrawSession {
    vertices: Vec<LatLng>,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex; tapping the last vertex again is ignored
    pub fn add_vertex(&mut self, position: LatLng) -> Result<(), CaptureError> {
        validate_coordinates(position.lat, position.lng).map_err(CaptureError::InvalidCoordinate)?;
        if self.vertices.last() != Some(&position) {
            self.vertices.push(position);
        }
        Ok(())
    }

    pub fn undo_vertex(&mut self) -> Option<LatLng> {
        self.vertices.pop()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[LatLng] {
        &self.vertices
    }

    pub fn can_finish(&self) -> bool {
        self.vertices.len() >= MIN_BOUNDARY_POINTS
    }

    /// Close the drawn ring
    pub fn finish(self) -> Result<BoundaryRing, RingError> {
        BoundaryRing::close(self.vertices)
    }
}
