//! GPS location sources
//!
//! [`NmeaLocationSource`] reads NMEA 0183 sentences from a receiver (serial
//! device, file, or stdin). [`ChannelLocationSource`] is fed by the host
//! application, e.g. from browser geolocation callbacks.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::services::capture::{
    CaptureError, FixResult, LocationSource, PositionFix, PositionWatch,
};

/// Capacity of the fix channel between a source and its watch
const FIX_BUFFER: usize = 64;

/// User equivalent range error used to turn HDOP into meters
pub const NMEA_UERE_METERS: f64 = 5.0;

// ============================================================================
// NMEA
// ============================================================================

/// Location source reading GGA sentences from an async reader
pub struct NmeaLocationSource<R> {
    reader: Mutex<Option<R>>,
}

impl<R> NmeaLocationSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }
}

impl NmeaLocationSource<tokio::fs::File> {
    /// Open a GPS device or a recorded NMEA log
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::Unavailable(format!("{}: {}", path.display(), e)),
        })?;
        Ok(Self::new(file))
    }
}

impl<R> LocationSource for NmeaLocationSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn watch(&self) -> Result<PositionWatch, CaptureError> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CaptureError::Unavailable("GPS reader poisoned".to_string()))?
            .take()
            .ok_or_else(|| CaptureError::Unavailable("GPS stream already in use".to_string()))?;

        let (tx, rx) = mpsc::channel(FIX_BUFFER);
        let task = tokio::spawn(read_sentences(reader, tx));

        Ok(PositionWatch::new(rx, move || task.abort()))
    }
}

async fn read_sentences<R>(reader: R, tx: mpsc::Sender<FixResult>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(fix) = parse_gga(&line) {
                    if tx.send(Ok(fix)).await.is_err() {
                        return;
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = tx
                    .send(Err(CaptureError::Unavailable(format!("GPS read failed: {}", e))))
                    .await;
                return;
            }
        }
    }
}

/// Parse a GGA sentence (`$GPGGA`, `$GNGGA`, ...)
///
/// Returns `None` for other sentence types, bad checksums, and sentences
/// without a position fix.
pub fn parse_gga(sentence: &str) -> Option<PositionFix> {
    let sentence = sentence.trim();
    let body = sentence.strip_prefix('$')?;

    let body = match body.split_once('*') {
        Some((data, checksum)) => {
            let expected = u8::from_str_radix(checksum.get(..2)?, 16).ok()?;
            let actual = data.bytes().fold(0u8, |acc, b| acc ^ b);
            if actual != expected {
                return None;
            }
            data
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 9 || !fields[0].ends_with("GGA") {
        return None;
    }

    let quality: u8 = fields[6].parse().ok()?;
    if quality == 0 {
        return None;
    }

    let lat = parse_coordinate(fields[2], fields[3], 2)?;
    let lng = parse_coordinate(fields[4], fields[5], 3)?;
    let accuracy = fields[8]
        .parse::<f64>()
        .ok()
        .map(|hdop| hdop * NMEA_UERE_METERS);

    Some(PositionFix::new(lat, lng, accuracy))
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere to signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    if !value.is_ascii() || value.len() <= degree_digits {
        return None;
    }
    let degrees: f64 = value.get(..degree_digits)?.parse().ok()?;
    let minutes: f64 = value.get(degree_digits..)?.parse().ok()?;
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}

// ============================================================================
// Host-fed channel
// ============================================================================

#[derive(Default)]
struct ChannelState {
    sender: Option<mpsc::Sender<FixResult>>,
    permission_denied: bool,
}

/// Location source driven by pushed fixes
#[derive(Clone, Default)]
pub struct ChannelLocationSource {
    state: Arc<Mutex<ChannelState>>,
}

impl ChannelLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose user refused location access
    pub fn denied() -> Self {
        let source = Self::default();
        if let Ok(mut state) = source.state.lock() {
            state.permission_denied = true;
        }
        source
    }

    /// Deliver a fix to the active watch; false when nobody is watching
    pub fn push(&self, fix: PositionFix) -> bool {
        self.deliver(Ok(fix))
    }

    /// Report a source failure to the active watch
    pub fn fail(&self, error: CaptureError) -> bool {
        self.deliver(Err(error))
    }

    pub fn is_watching(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.sender.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false))
            .unwrap_or(false)
    }

    /// End the current watch as if the device stopped reporting
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.sender = None;
        }
    }

    fn deliver(&self, item: FixResult) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        match &state.sender {
            Some(tx) => tx.try_send(item).is_ok(),
            None => false,
        }
    }
}

impl LocationSource for ChannelLocationSource {
    fn watch(&self) -> Result<PositionWatch, CaptureError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CaptureError::Unavailable("location state poisoned".to_string()))?;
        if state.permission_denied {
            return Err(CaptureError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(FIX_BUFFER);
        state.sender = Some(tx);

        let shared = Arc::downgrade(&self.state);
        Ok(PositionWatch::new(rx, move || {
            if let Some(state) = shared.upgrade() {
                if let Ok(mut state) = state.lock() {
                    state.sender = None;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gga() {
        let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47")
            .unwrap();
        assert!((fix.position.lat - 48.1173).abs() < 1e-4);
        assert!((fix.position.lng - 11.516_666).abs() < 1e-4);
        assert!((fix.accuracy_meters.unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_gga_southern_western() {
        let fix = parse_gga("$GNGGA,101010,0330.000,S,00715.000,W,1,05,1.2,10.0,M,0.0,M,,").unwrap();
        assert!((fix.position.lat + 3.5).abs() < 1e-9);
        assert!((fix.position.lng + 7.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_gga_rejects_bad_checksum_and_no_fix() {
        assert!(
            parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48").is_none()
        );
        assert!(parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,").is_none());
        assert!(parse_gga("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W").is_none());
    }

    #[test]
    fn test_parse_gga_rejects_non_ascii_coordinates() {
        assert!(parse_gga("$GPGGA,123519,4é7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,").is_none());
        assert!(parse_gga("$GPGGA,123519,4807.038,N,0113°.000,E,1,08,0.9,545.4,M,46.9,M,,").is_none());
        assert!(parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*é7").is_none());
    }

    #[tokio::test]
    async fn test_channel_source_watch_lifecycle() {
        let source = ChannelLocationSource::new();
        assert!(!source.push(PositionFix::new(9.0, 7.0, None)));

        let mut watch = source.watch().unwrap();
        assert!(source.is_watching());
        assert!(source.push(PositionFix::new(9.0, 7.0, Some(5.0))));
        let fix = watch.next().await.unwrap().unwrap();
        assert_eq!(fix.accuracy_meters, Some(5.0));

        drop(watch);
        assert!(!source.is_watching());
    }

    #[test]
    fn test_denied_source() {
        let source = ChannelLocationSource::denied();
        assert!(matches!(source.watch(), Err(CaptureError::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_nmea_source_reads_until_eof() {
        let log = "$GPGGA,000001,0900.000,N,00700.000,E,1,08,1.0,0,M,0,M,,\n\
                   $GPGSV,3,1,11,03,03,111,00*74\n\
                   $GPGGA,000002,0900.060,N,00700.000,E,1,08,1.0,0,M,0,M,,\n";
        let source = NmeaLocationSource::new(std::io::Cursor::new(log.as_bytes().to_vec()));
        let mut watch = source.watch().unwrap();

        assert!(watch.next().await.unwrap().is_ok());
        assert!(watch.next().await.unwrap().is_ok());
        assert!(watch.next().await.is_none());

        assert!(matches!(source.watch(), Err(CaptureError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_nmea_source_skips_garbled_sentence() {
        let log = "$GPGGA,000001,09é0.000,N,00700.000,E,1,08,1.0,0,M,0,M,,\n\
                   $GPGGA,000002,0900.060,N,00700.000,E,1,08,1.0,0,M,0,M,,\n";
        let source = NmeaLocationSource::new(std::io::Cursor::new(log.as_bytes().to_vec()));
        let mut watch = source.watch().unwrap();

        let fix = watch.next().await.unwrap().unwrap();
        assert!((fix.position.lat - 9.001).abs() < 1e-9);
        assert!(watch.next().await.is_none());
    }
}
