//! Farmer and farm directory
//!
//! Debounced farmer search, cached farmer detail lookups, and the map layer
//! that switches between clustered markers and farm polygons by zoom level.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared::{is_searchable, BoundaryRing, Farm, Farmer, FarmerSummary, LatLng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::AppResult;
use crate::external::FarmApi;
use crate::services::cache::TtlCache;

// ============================================================================
// Search
// ============================================================================

/// What the search box currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Pending {
        query: String,
    },
    Results {
        query: String,
        farmers: Vec<FarmerSummary>,
    },
    Failed {
        query: String,
        message: String,
    },
}

/// Debounced farmer search
///
/// Each keystroke aborts the previous pending or in-flight search, so only
/// the latest query's results are ever published.
pub struct SearchController {
    api: Arc<dyn FarmApi>,
    cache: Arc<TtlCache<String, Vec<FarmerSummary>>>,
    debounce: Duration,
    min_length: usize,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    state: Arc<watch::Sender<SearchState>>,
}

impl SearchController {
    pub fn new(
        api: Arc<dyn FarmApi>,
        cache: Arc<TtlCache<String, Vec<FarmerSummary>>>,
        config: &SearchConfig,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            api,
            cache,
            debounce: config.debounce(),
            min_length: config.min_length,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Handle a change of the search box text
    pub fn on_input(&mut self, query: &str) {
        self.abort_pending();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim().to_string();
        if query.chars().count() < self.min_length || !is_searchable(&query) {
            self.state.send_replace(SearchState::Idle);
            return;
        }

        self.state.send_replace(SearchState::Pending {
            query: query.clone(),
        });

        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let next = match cache.get(&query).await {
                Some(farmers) => SearchState::Results { query, farmers },
                None => {
                    tracing::debug!(%query, "Searching farmers");
                    match api.search_farmers(&query).await {
                        Ok(farmers) => {
                            cache.insert(query.clone(), farmers.clone()).await;
                            SearchState::Results { query, farmers }
                        }
                        Err(e) => {
                            tracing::warn!(%query, error = %e, "Farmer search failed");
                            SearchState::Failed {
                                query,
                                message: e.detail().message,
                            }
                        }
                    }
                }
            };

            state.send_if_modified(|shown| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *shown = next;
                true
            });
        }));
    }

    /// Abort any pending search and clear the results
    pub fn clear(&mut self) {
        self.abort_pending();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SearchState::Idle);
    }

    fn abort_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            if !task.is_finished() {
                tracing::trace!("Superseded farmer search aborted");
            }
            task.abort();
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

// ============================================================================
// Detail
// ============================================================================

/// A farmer with all of their farms
#[derive(Debug, Clone, Serialize)]
pub struct FarmerDetail {
    pub farmer: Farmer,
    pub farms: Vec<Farm>,
}

impl FarmerDetail {
    /// Farms whose stored geometry can be read as a boundary
    pub fn map_farms(&self) -> Vec<MapFarm> {
        self.farms
            .iter()
            .filter_map(|farm| {
                farm.boundary().ok().map(|ring| MapFarm {
                    farm_id: farm.id,
                    ring,
                })
            })
            .collect()
    }
}

/// Lazily loaded farmer details with a per-id cache
#[derive(Clone)]
pub struct FarmerDirectory {
    api: Arc<dyn FarmApi>,
    cache: Arc<TtlCache<Uuid, FarmerDetail>>,
}

impl FarmerDirectory {
    pub fn new(api: Arc<dyn FarmApi>, cache: Arc<TtlCache<Uuid, FarmerDetail>>) -> Self {
        Self { api, cache }
    }

    /// Farmer and farms, fetched together on first access
    pub async fn detail(&self, farmer_id: Uuid) -> AppResult<FarmerDetail> {
        if let Some(detail) = self.cache.get(&farmer_id).await {
            tracing::debug!(%farmer_id, "Farmer detail served from cache");
            return Ok(detail);
        }

        let (farmer, farms) = tokio::try_join!(
            self.api.get_farmer(farmer_id),
            self.api.farmer_farms(farmer_id),
        )?;

        let detail = FarmerDetail { farmer, farms };
        self.cache.insert(farmer_id, detail.clone()).await;
        Ok(detail)
    }

    /// Forget a farmer after it or one of its farms changed
    pub async fn invalidate(&self, farmer_id: Uuid) {
        self.cache.invalidate(&farmer_id).await;
    }
}

// ============================================================================
// Map layer
// ============================================================================

/// Default zoom from which polygons are drawn instead of clusters
pub const DEFAULT_POLYGON_ZOOM: u8 = 14;

/// Grid cells per tile width when clustering
const CLUSTER_CELLS_PER_TILE: f64 = 4.0;

/// A farm placed on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFarm {
    pub farm_id: Uuid,
    pub ring: BoundaryRing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub center: LatLng,
    pub farm_ids: Vec<Uuid>,
}

impl Cluster {
    pub fn count(&self) -> usize {
        self.farm_ids.len()
    }
}

/// What to draw for the current zoom level
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", content = "items", rename_all = "snake_case")]
pub enum MapLayer {
    Clusters(Vec<Cluster>),
    Polygons(Vec<MapFarm>),
}

impl MapLayer {
    /// Clustered markers below `polygon_zoom`, individual polygons from it
    pub fn for_zoom(zoom: u8, polygon_zoom: u8, farms: &[MapFarm]) -> Self {
        if zoom >= polygon_zoom {
            return MapLayer::Polygons(farms.to_vec());
        }

        let cell = 360.0 / 2f64.powi(zoom as i32) / CLUSTER_CELLS_PER_TILE;
        let mut cells: BTreeMap<(i64, i64), Vec<(LatLng, Uuid)>> = BTreeMap::new();
        for farm in farms {
            let center = farm.ring.center();
            let key = (
                (center.lat / cell).floor() as i64,
                (center.lng / cell).floor() as i64,
            );
            cells.entry(key).or_default().push((center, farm.farm_id));
        }

        let clusters = cells
            .into_values()
            .map(|members| {
                let n = members.len() as f64;
                let (lat, lng) = members
                    .iter()
                    .fold((0.0, 0.0), |(lat, lng), (p, _)| (lat + p.lat, lng + p.lng));
                Cluster {
                    center: LatLng::new(lat / n, lng / n),
                    farm_ids: members.into_iter().map(|(_, id)| id).collect(),
                }
            })
            .collect();

        MapLayer::Clusters(clusters)
    }
}

/// Base map tile providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileProvider {
    OpenStreetMap,
    EsriSatellite,
    CartoDark,
}

impl TileProvider {
    pub fn url_template(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileProvider::EsriSatellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            TileProvider::CartoDark => {
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "© OpenStreetMap contributors",
            TileProvider::EsriSatellite => "Tiles © Esri",
            TileProvider::CartoDark => "© OpenStreetMap contributors © CARTO",
        }
    }

    /// Concrete tile URL for the slippy-map tile at `z/x/y`
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        self.url_template()
            .replace("{s}", "a")
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

/// Slippy-map tile containing a position
pub fn tile_for(position: LatLng, zoom: u8) -> (u32, u32) {
    let n = 2f64.powi(zoom as i32);
    let lat_rad = position.lat.to_radians();
    let x = ((position.lng + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor();
    let max = n - 1.0;
    (x.clamp(0.0, max) as u32, y.clamp(0.0, max) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farm_at(lat: f64, lng: f64) -> MapFarm {
        MapFarm {
            farm_id: Uuid::new_v4(),
            ring: BoundaryRing::close(vec![
                LatLng::new(lat, lng),
                LatLng::new(lat, lng + 0.001),
                LatLng::new(lat + 0.001, lng + 0.001),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn test_polygons_from_threshold_zoom() {
        let farms = vec![farm_at(9.0, 7.0), farm_at(9.002, 7.002)];
        match MapLayer::for_zoom(14, DEFAULT_POLYGON_ZOOM, &farms) {
            MapLayer::Polygons(polygons) => assert_eq!(polygons.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nearby_farms_cluster_at_low_zoom() {
        let farms = vec![farm_at(9.0, 7.0), farm_at(9.002, 7.002), farm_at(12.0, 8.5)];
        match MapLayer::for_zoom(8, DEFAULT_POLYGON_ZOOM, &farms) {
            MapLayer::Clusters(clusters) => {
                assert_eq!(clusters.len(), 2);
                let total: usize = clusters.iter().map(Cluster::count).sum();
                assert_eq!(total, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tile_urls() {
        assert_eq!(
            TileProvider::OpenStreetMap.tile_url(3, 4, 2),
            "https://tile.openstreetmap.org/3/4/2.png"
        );
        assert!(TileProvider::EsriSatellite.tile_url(3, 4, 2).ends_with("/tile/3/2/4"));
        assert!(TileProvider::CartoDark
            .tile_url(1, 0, 0)
            .starts_with("https://a.basemaps.cartocdn.com"));
    }

    #[test]
    fn test_tile_for() {
        assert_eq!(tile_for(LatLng::new(0.0, 0.0), 1), (1, 1));
        assert_eq!(tile_for(LatLng::new(0.0, 0.0), 0), (0, 0));
    }
}
