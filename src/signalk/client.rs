use crate::clock::{Clock, SystemClock};
use crate::signalk::convert::{convert_value, find_converter};
use crate::signalk::discovery::{Discovered, Discovery, TankType};
use crate::signalk::snapshot::{
    BatteryReading, EngineReading, Environment, Navigation, Position, Readings, Snapshot,
    SnapshotMeta, TankReading,
};
use crate::signalk::store::ValueStore;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

pub const POSITION_PATH: &str = "navigation.position";

/// SignalK server configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SignalKConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub use_tls: bool,
    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl Default for SignalKConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            use_tls: false,
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl SignalKConfig {
    /// Streaming endpoint subscribed to every path
    pub fn stream_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!(
            "{}://{}:{}/signalk/v1/stream?subscribe=all",
            scheme, self.host, self.port
        )
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Connection and discovery notifications
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    Discovered(Discovery),
}

/// Everything learned from the stream. Only the client writes it.
#[derive(Debug, Default)]
struct VesselState {
    raw: ValueStore,
    state: ValueStore,
    paths: HashSet<String>,
    discovered: Discovered,
    last_update: Option<DateTime<Utc>>,
}

impl VesselState {
    fn get_f64(&self, path: &str) -> Option<f64> {
        self.state.get_f64(path)
    }

    fn position(&self) -> Option<Position> {
        self.raw
            .get_lat_lon(POSITION_PATH)
            .map(|(lat, lon)| Position { lat, lon })
    }

    fn engine(&self, id: &str) -> EngineReading {
        let p = format!("propulsion.{}", id);
        let rpm = self.get_f64(&format!("{}.revolutions", p));
        EngineReading {
            id: id.to_string(),
            rpm,
            oil_pressure: self.get_f64(&format!("{}.oilPressure", p)),
            coolant_temp: self.get_f64(&format!("{}.coolantTemperature", p)),
            exhaust_temp: self.get_f64(&format!("{}.exhaustTemperature", p)),
            hours: self.get_f64(&format!("{}.runTime", p)),
            fuel_rate: self.get_f64(&format!("{}.fuel.rate", p)),
            running: rpm.unwrap_or(0.0) > 50.0,
        }
    }

    fn battery(&self, id: &str) -> BatteryReading {
        let p = format!("electrical.batteries.{}", id);
        BatteryReading {
            id: id.to_string(),
            voltage: self.get_f64(&format!("{}.voltage", p)),
            current: self.get_f64(&format!("{}.current", p)),
            soc: self.get_f64(&format!("{}.capacity.stateOfCharge", p)),
        }
    }

    fn tank(&self, tank_type: TankType, id: &str) -> TankReading {
        TankReading {
            tank_type,
            id: id.to_string(),
            level: self.get_f64(&format!("tanks.{}.{}.currentLevel", tank_type, id)),
        }
    }

    fn first_of(&self, primary: &str, fallback: &str) -> Option<f64> {
        self.get_f64(primary).or_else(|| self.get_f64(fallback))
    }
}

/// SignalK stream client
///
/// Maintains the raw and converted state trees plus the discovered equipment
/// inventory. Every accessor returns `None` for data the vessel has not
/// reported; nothing here fails on missing sensors.
pub struct SignalKClient {
    config: SignalKConfig,
    vessel: RwLock<VesselState>,
    connected: AtomicBool,
    events_tx: broadcast::Sender<ClientEvent>,
    clock: Arc<dyn Clock>,
}

impl SignalKClient {
    pub fn new(config: SignalKConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SignalKConfig, clock: Arc<dyn Clock>) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            config,
            vessel: RwLock::new(VesselState::default()),
            connected: AtomicBool::new(false),
            events_tx,
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VesselState> {
        self.vessel.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VesselState> {
        self.vessel.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to connection and discovery events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stream opened. Emits `Connected` on every open.
    pub fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!(url = %self.config.stream_url(), "SignalK connected");
        }
        let _ = self.events_tx.send(ClientEvent::Connected);
    }

    /// Stream closed or connection attempt failed. Emits `Disconnected` on
    /// every close, including repeated failed attempts. Stored values are
    /// kept.
    pub fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("SignalK disconnected");
        }
        let _ = self.events_tx.send(ClientEvent::Disconnected);
    }

    /// Process one text frame from the stream
    ///
    /// Only `updates[0].values` is read. Frames of any other shape are
    /// dropped without error. Returns the number of values applied.
    pub fn process_frame(&self, text: &str) -> usize {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Dropping unparseable SignalK frame");
                return 0;
            }
        };

        let values = match frame
            .get("updates")
            .and_then(|updates| updates.get(0))
            .and_then(|update| update.get("values"))
            .and_then(Value::as_array)
        {
            Some(values) => values,
            None => return 0,
        };

        self.apply_values(values)
    }

    fn apply_values(&self, values: &[Value]) -> usize {
        let mut applied = 0;
        let mut discoveries = Vec::new();

        {
            let mut vessel = self.write();
            vessel.last_update = Some(self.clock.now());

            for entry in values {
                let path = match entry.get("path").and_then(Value::as_str) {
                    Some(path) => path,
                    None => continue,
                };
                let value = match entry.get("value") {
                    Some(value) if !value.is_null() => value,
                    _ => continue,
                };

                vessel.raw.insert(path, value.clone());
                let is_new = vessel.paths.insert(path.to_string());
                vessel.state.insert(path, convert_value(path, value));

                if is_new {
                    debug!(
                        path,
                        unit = find_converter(path).map(|c| c.unit).unwrap_or(""),
                        "New SignalK path"
                    );
                    discoveries.extend(vessel.discovered.classify(path));
                }
                applied += 1;
            }
        }

        for discovery in discoveries {
            info!(?discovery, "Discovered equipment");
            let _ = self.events_tx.send(ClientEvent::Discovered(discovery));
        }

        applied
    }

    /// Converted value at `path`
    pub fn get(&self, path: &str) -> Option<Value> {
        self.read().state.get(path).cloned()
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.read().get_f64(path)
    }

    /// Unconverted value at `path`
    pub fn get_raw(&self, path: &str) -> Option<Value> {
        self.read().raw.get(path).cloned()
    }

    pub fn raw_f64(&self, path: &str) -> Option<f64> {
        self.read().raw.get_f64(path)
    }

    pub fn raw_lat_lon(&self, path: &str) -> Option<(f64, f64)> {
        self.read().raw.get_lat_lon(path)
    }

    pub fn raw_is_truthy(&self, path: &str) -> bool {
        self.read().raw.is_truthy(path)
    }

    /// Converted value of `primary`, else of `fallback`
    pub fn get_first_f64(&self, primary: &str, fallback: &str) -> Option<f64> {
        self.read().first_of(primary, fallback)
    }

    pub fn get_position(&self) -> Option<Position> {
        self.read().position()
    }

    pub fn get_engine(&self, id: &str) -> EngineReading {
        self.read().engine(id)
    }

    pub fn get_battery(&self, id: &str) -> BatteryReading {
        self.read().battery(id)
    }

    pub fn get_tank(&self, tank_type: TankType, id: &str) -> TankReading {
        self.read().tank(tank_type, id)
    }

    /// Copy of the equipment inventory
    pub fn discovered(&self) -> Discovered {
        self.read().discovered.clone()
    }

    pub fn path_count(&self) -> usize {
        self.read().paths.len()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.read().last_update
    }

    /// Build the full snapshot under a single read lock
    pub fn get_snapshot(&self) -> Snapshot {
        let vessel = self.read();
        let discovered = &vessel.discovered;

        let navigation = Navigation {
            position: vessel
                .position()
                .map(|p| format!("{:.4}, {:.4}", p.lat, p.lon)),
            sog: vessel.get_f64("navigation.speedOverGround"),
            cog: vessel.get_f64("navigation.courseOverGroundTrue"),
            heading: vessel.first_of("navigation.headingMagnetic", "navigation.headingTrue"),
        };

        let has_wind = discovered.features.has_wind;
        let environment = Environment {
            depth: vessel.first_of(
                "environment.depth.belowTransducer",
                "environment.depth.belowKeel",
            ),
            water_temp: vessel.get_f64("environment.water.temperature"),
            wind_speed: has_wind.then(|| vessel.get_f64("environment.wind.speedApparent")),
            wind_angle: has_wind.then(|| vessel.get_f64("environment.wind.angleApparent")),
        };

        let engines: Readings<_> = discovered
            .engines
            .iter()
            .map(|id| (id.clone(), vessel.engine(id)))
            .collect();
        let batteries: Readings<_> = discovered
            .batteries
            .iter()
            .map(|id| (id.clone(), vessel.battery(id)))
            .collect();
        let tanks: Readings<_> = discovered
            .tanks
            .iter()
            .map(|(tank_type, id)| (format!("{}_{}", tank_type, id), vessel.tank(tank_type, id)))
            .collect();

        Snapshot {
            meta: SnapshotMeta {
                connected: self.is_connected(),
                last_update: vessel.last_update,
                path_count: vessel.paths.len(),
            },
            navigation,
            environment,
            engines,
            batteries,
            tanks,
        }
    }

    /// Connect and keep reconnecting for the life of the process
    ///
    /// Transport failures never escape this loop; they only flip the
    /// connection state and schedule another attempt.
    pub async fn run(self: Arc<Self>) {
        let url = self.config.stream_url();

        loop {
            info!(url = %url, "Connecting to SignalK");

            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((mut stream, _)) => {
                    self.mark_connected();

                    while let Some(msg) = stream.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                self.process_frame(text.as_str());
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {
                                // Ping/pong/binary carry no deltas
                            }
                            Err(e) => {
                                log_transport_error(&e);
                                break;
                            }
                        }
                    }

                    self.mark_disconnected();
                }
                Err(e) => {
                    log_transport_error(&e);
                    self.mark_disconnected();
                }
            }

            info!(
                delay_secs = self.config.reconnect_delay_secs,
                "SignalK unavailable, reconnect scheduled"
            );
            tokio::time::sleep(self.config.reconnect_delay()).await;
        }
    }
}

fn is_connection_refused(err: &tungstenite::Error) -> bool {
    matches!(err, tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused)
}

fn log_transport_error(err: &tungstenite::Error) {
    if is_connection_refused(err) {
        debug!("SignalK connection refused");
    } else {
        warn!(error = %err, "SignalK transport error");
    }
}
