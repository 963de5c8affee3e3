use radarcore::record::RadarFrameRecord;
use radarcore::telemetry::FrameStatsSnapshot;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::thread;
use tokio::runtime::Builder;
use warp::Filter;

fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9100))
}

#[derive(Default)]
struct BridgeState {
    record: Option<RadarFrameRecord>,
    stats: Option<FrameStatsSnapshot>,
}

/// Publishes the latest frame record and cumulative statistics over HTTP.
///
/// Routes are read-only (`GET /record`, `GET /stats`); frame processing
/// stays on the driver thread, which pushes state here after each frame.
pub struct RecordBridge {
    state: Arc<RwLock<BridgeState>>,
}

impl RecordBridge {
    pub fn serve() -> Self {
        let state = Arc::new(RwLock::new(BridgeState::default()));
        let state_for_filter = state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());

        let record_route = warp::path("record")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<BridgeState>>| {
                let guard = state.read().unwrap();
                match guard.record.as_ref() {
                    Some(record) => warp::reply::json(record),
                    None => warp::reply::json(&json!({"status": "no frames processed yet"})),
                }
            });

        let stats_route = warp::path("stats")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<BridgeState>>| {
                let guard = state.read().unwrap();
                warp::reply::json(&guard.stats)
            });

        thread::spawn(move || {
            let routes = record_route.or(stats_route);
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build bridge runtime");
            runtime.block_on(async move {
                warp::serve(routes).run(bridge_bind_address()).await;
            });
        });

        Self { state }
    }

    pub fn publish(&self, record: &RadarFrameRecord, stats: FrameStatsSnapshot) {
        let mut guard = self.state.write().unwrap();
        guard.record = Some(record.clone());
        guard.stats = Some(stats);
    }

    #[cfg(test)]
    pub fn latest_record(&self) -> Option<RadarFrameRecord> {
        self.state.read().unwrap().record.clone()
    }
}
