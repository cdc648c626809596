use crate::signalk::discovery::TankType;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Decimal-degree position
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReading {
    pub id: String,
    pub rpm: Option<f64>,
    pub oil_pressure: Option<f64>,
    pub coolant_temp: Option<f64>,
    pub exhaust_temp: Option<f64>,
    pub hours: Option<f64>,
    pub fuel_rate: Option<f64>,
    /// rpm above 50
    pub running: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatteryReading {
    pub id: String,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub soc: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TankReading {
    #[serde(rename = "type")]
    pub tank_type: TankType,
    pub id: String,
    pub level: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub connected: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub path_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Navigation {
    /// "lat, lon" at four decimals
    pub position: Option<String>,
    pub sog: Option<f64>,
    pub cog: Option<f64>,
    pub heading: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub depth: Option<f64>,
    pub water_temp: Option<f64>,
    /// Only present once wind instruments were discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_angle: Option<Option<f64>>,
}

/// Readings keyed by id, serialized as a JSON object in discovery order
#[derive(Clone, Debug, PartialEq)]
pub struct Readings<T> {
    entries: Vec<(String, T)>,
}

impl<T> Readings<T> {
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, reading)| reading)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, reading)| reading)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for Readings<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T: Serialize> Serialize for Readings<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, reading)| (k, reading)))
    }
}

/// Full current-state projection handed to downstream consumers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "_meta")]
    pub meta: SnapshotMeta,
    pub navigation: Navigation,
    pub environment: Environment,
    pub engines: Readings<EngineReading>,
    pub batteries: Readings<BatteryReading>,
    /// Keyed `<type>_<id>`; fuel, then freshWater, then wasteWater
    pub tanks: Readings<TankReading>,
}

impl Snapshot {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
