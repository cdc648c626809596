use crate::alerts::alert::{Alert, AlertSubscriber, Severity};
use crate::alerts::config::AlertConfig;
use crate::clock::{Clock, SystemClock};
use crate::geo::haversine_m;
use crate::signalk::{SignalKClient, TankType};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const ANCHOR_POSITION_PATH: &str = "navigation.anchor.position";
pub const ANCHOR_RADIUS_PATH: &str = "navigation.anchor.maxRadius";
pub const BILGE_PUMP_PATH: &str = "notifications.bilgePump.running";
const DEPTH_TRANSDUCER_PATH: &str = "environment.depth.belowTransducer";
const DEPTH_KEEL_PATH: &str = "environment.depth.belowKeel";
const APPARENT_WIND_PATH: &str = "environment.wind.speedApparent";

// Per-rule cooldowns (seconds)
const BATTERY_CRITICAL_COOLDOWN: i64 = 300;
const BATTERY_LOW_COOLDOWN: i64 = 600;
const ENGINE_CRITICAL_COOLDOWN: i64 = 60;
const ENGINE_EXHAUST_COOLDOWN: i64 = 120;
const SHALLOW_COOLDOWN: i64 = 60;
const ANCHOR_DRAG_COOLDOWN: i64 = 120;
const BILGE_COOLDOWN: i64 = 300;
const TANK_LOW_COOLDOWN: i64 = 3600;

/// Debounce and window state. Only the engine touches it.
#[derive(Debug, Default)]
struct RuleState {
    /// Last emission per alert id
    last_fired: HashMap<String, DateTime<Utc>>,
    /// Ticks on which the bilge pump was seen running, oldest first
    bilge_activations: VecDeque<DateTime<Utc>>,
}

/// Collects the alerts produced by one evaluation pass
struct Pass<'a> {
    state: &'a mut RuleState,
    now: DateTime<Utc>,
    fired: Vec<Alert>,
}

impl Pass<'_> {
    /// Emit `id` unless it already fired within `cooldown_secs`.
    /// The message is only built when the alert actually fires.
    fn fire(
        &mut self,
        id: String,
        severity: Severity,
        cooldown_secs: i64,
        message: impl FnOnce() -> String,
    ) {
        if let Some(last) = self.state.last_fired.get(&id) {
            if self.now - *last < Duration::seconds(cooldown_secs) {
                return;
            }
        }
        self.state.last_fired.insert(id.clone(), self.now);
        self.fired.push(Alert {
            id,
            severity,
            message: message(),
            timestamp: self.now,
        });
    }
}

fn reading(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "--".to_string())
}

/// Threshold rule evaluator with per-alert cooldowns and a sliding-window
/// bilge pump detector
pub struct AlertEngine {
    client: Arc<SignalKClient>,
    config: AlertConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<RuleState>,
    subscribers: RwLock<Vec<Arc<dyn AlertSubscriber>>>,
}

impl AlertEngine {
    pub fn new(client: Arc<SignalKClient>, config: AlertConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: Arc<SignalKClient>,
        config: AlertConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            config,
            clock,
            state: Mutex::new(RuleState::default()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler. Handlers are called in registration order.
    pub fn subscribe(&self, subscriber: Arc<dyn AlertSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    fn notify(&self, alert: &Alert) {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in subscribers {
            subscriber.on_alert(alert);
        }
    }

    /// Run one evaluation pass and deliver whatever fired
    ///
    /// Skipped entirely while the SignalK client is disconnected.
    pub fn tick(&self) -> Vec<Alert> {
        if !self.client.is_connected() {
            debug!("SignalK disconnected, skipping alert pass");
            return Vec::new();
        }

        let fired = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let mut pass = Pass {
                state: &mut state,
                now: self.clock.now(),
                fired: Vec::new(),
            };

            self.check_batteries(&mut pass);
            self.check_engines(&mut pass);
            self.check_depth(&mut pass);
            self.check_anchor(&mut pass);
            self.check_bilge(&mut pass);
            self.check_tanks(&mut pass);

            pass.fired
        };

        for alert in &fired {
            warn!(id = %alert.id, severity = %alert.severity, "{}", alert.message);
            self.notify(alert);
        }

        fired
    }

    /// Drive `tick` every `interval_ms` until the task is dropped
    pub async fn run(self: Arc<Self>) {
        let period = self.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = self.config.interval_ms, "Alert engine started");

        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    fn check_batteries(&self, pass: &mut Pass<'_>) {
        let t = &self.config.batteries;

        for id in self.client.discovered().batteries {
            let b = self.client.get_battery(&id);
            let soc = match b.soc {
                Some(soc) => soc,
                None => continue,
            };

            if soc < t.soc_critical {
                pass.fire(
                    format!("batt_crit_{}", id),
                    Severity::Critical,
                    BATTERY_CRITICAL_COOLDOWN,
                    || {
                        let sign = if b.current.unwrap_or(0.0) > 0.0 { "+" } else { "" };
                        format!(
                            "BATTERY CRITICAL [{}]: {}% | {}V | {}{}A - SHED LOADS NOW",
                            id,
                            soc,
                            reading(b.voltage),
                            sign,
                            reading(b.current)
                        )
                    },
                );
            } else if soc < t.soc_warning {
                pass.fire(
                    format!("batt_low_{}", id),
                    Severity::Warning,
                    BATTERY_LOW_COOLDOWN,
                    || {
                        let direction = if b.current.unwrap_or(0.0) > 0.0 {
                            "charging"
                        } else {
                            "discharging"
                        };
                        format!(
                            "Battery low [{}]: {}% | {}V | {} {}A",
                            id,
                            soc,
                            reading(b.voltage),
                            direction,
                            reading(b.current.map(f64::abs))
                        )
                    },
                );
            }
        }
    }

    fn check_engines(&self, pass: &mut Pass<'_>) {
        let t = &self.config.engines;

        for id in self.client.discovered().engines {
            let e = self.client.get_engine(&id);
            if !e.running {
                continue;
            }

            if let Some(coolant) = e.coolant_temp.filter(|c| *c > t.coolant_temp_max) {
                pass.fire(
                    format!("eng_heat_{}", id),
                    Severity::Critical,
                    ENGINE_CRITICAL_COOLDOWN,
                    || {
                        format!(
                            "ENGINE OVERHEAT [{}]: Coolant {}°C - check raw water intake & impeller!",
                            id, coolant
                        )
                    },
                );
            }
            if let Some(oil) = e.oil_pressure.filter(|p| *p < t.oil_pressure_min) {
                pass.fire(
                    format!("eng_oil_{}", id),
                    Severity::Critical,
                    ENGINE_CRITICAL_COOLDOWN,
                    || {
                        format!(
                            "LOW OIL PRESSURE [{}]: {} PSI at {} RPM - reduce power, check oil level!",
                            id,
                            oil,
                            reading(e.rpm)
                        )
                    },
                );
            }
            if let Some(exhaust) = e.exhaust_temp.filter(|x| *x > t.exhaust_temp_max) {
                pass.fire(
                    format!("eng_exhaust_{}", id),
                    Severity::Warning,
                    ENGINE_EXHAUST_COOLDOWN,
                    || {
                        format!(
                            "High exhaust temp [{}]: {}°C at {} RPM",
                            id,
                            exhaust,
                            reading(e.rpm)
                        )
                    },
                );
            }
        }
    }

    fn check_depth(&self, pass: &mut Pass<'_>) {
        if !self.client.discovered().features.has_depth {
            return;
        }

        let minimum = self.config.safety.depth_minimum;
        if let Some(depth) = self
            .client
            .get_first_f64(DEPTH_TRANSDUCER_PATH, DEPTH_KEEL_PATH)
            .filter(|d| *d > 0.0 && *d < minimum)
        {
            pass.fire("shallow".to_string(), Severity::Warning, SHALLOW_COOLDOWN, || {
                format!("SHALLOW WATER: {}m - proceed with caution", depth)
            });
        }
    }

    fn check_anchor(&self, pass: &mut Pass<'_>) {
        if !self.client.discovered().features.has_anchor {
            return;
        }

        let (anchor_lat, anchor_lon) = match self.client.raw_lat_lon(ANCHOR_POSITION_PATH) {
            Some(anchor) => anchor,
            None => return,
        };
        let boat = match self.client.get_position() {
            Some(boat) => boat,
            None => return,
        };
        let max_radius = self
            .client
            .raw_f64(ANCHOR_RADIUS_PATH)
            .unwrap_or(self.config.safety.anchor_alarm_radius);

        let distance = haversine_m(boat.lat, boat.lon, anchor_lat, anchor_lon);
        if distance > max_radius {
            let wind = self.client.get_f64(APPARENT_WIND_PATH).filter(|w| *w != 0.0);
            pass.fire(
                "anchor_drag".to_string(),
                Severity::Critical,
                ANCHOR_DRAG_COOLDOWN,
                || {
                    let wind = wind
                        .map(|w| format!(" | Wind {} kts", w))
                        .unwrap_or_default();
                    format!(
                        "ANCHOR DRAG: {}m from set point (limit {}m){} - CHECK ANCHOR",
                        distance.round(),
                        max_radius.round(),
                        wind
                    )
                },
            );
        }
    }

    /// Samples the pump state once per tick; a pump held on across several
    /// ticks counts once per tick.
    fn check_bilge(&self, pass: &mut Pass<'_>) {
        let safety = &self.config.safety;
        let window = Duration::minutes(safety.bilge_window_minutes);
        let now = pass.now;

        if self.client.raw_is_truthy(BILGE_PUMP_PATH) {
            pass.state.bilge_activations.push_back(now);
        }
        pass.state
            .bilge_activations
            .retain(|activated| now - *activated < window);

        let count = pass.state.bilge_activations.len();
        if count > safety.bilge_cycles_max {
            let minutes = safety.bilge_window_minutes;
            pass.fire("bilge".to_string(), Severity::Critical, BILGE_COOLDOWN, || {
                format!(
                    "BILGE PUMP cycling: {}x in {} min - POSSIBLE LEAK, inspect bilge!",
                    count, minutes
                )
            });
        }
    }

    fn check_tanks(&self, pass: &mut Pass<'_>) {
        let t = &self.config.tanks;
        let discovered = self.client.discovered();

        for (tank_type, id) in discovered.tanks.iter() {
            let threshold = match tank_type {
                TankType::Fuel => t.fuel_low,
                TankType::FreshWater => t.water_low,
                TankType::WasteWater => continue,
            };

            if let Some(level) = self
                .client
                .get_tank(tank_type, id)
                .level
                .filter(|l| *l > 0.0 && *l < threshold)
            {
                pass.fire(
                    format!("tank_{}_{}", tank_type, id),
                    Severity::Info,
                    TANK_LOW_COOLDOWN,
                    || format!("{} low [{}]: {}%", tank_type, id, level),
                );
            }
        }
    }
}
