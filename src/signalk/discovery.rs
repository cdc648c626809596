// Schema-less equipment discovery
//
// Every path seen for the first time runs through DISCOVERY_RULES in order.
// Each rule is a (predicate, classifier) pair; adding a new equipment
// category means adding a row. Registries only ever grow.

use serde::Serialize;

/// Tank type. `blackWater` paths are filed under `WasteWater`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TankType {
    Fuel,
    FreshWater,
    WasteWater,
}

impl TankType {
    pub const ALL: [TankType; 3] = [TankType::Fuel, TankType::FreshWater, TankType::WasteWater];

    /// Map a SignalK tank segment to its type
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "fuel" => Some(TankType::Fuel),
            "freshWater" => Some(TankType::FreshWater),
            "wasteWater" | "blackWater" => Some(TankType::WasteWater),
            _ => None,
        }
    }

    /// SignalK path segment
    pub fn as_str(self) -> &'static str {
        match self {
            TankType::Fuel => "fuel",
            TankType::FreshWater => "freshWater",
            TankType::WasteWater => "wasteWater",
        }
    }
}

impl std::fmt::Display for TankType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean feature flags. Once set, never cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub has_wind: bool,
    pub has_depth: bool,
    pub has_autopilot: bool,
    pub has_anchor: bool,
    pub has_solar: bool,
    pub has_generator: bool,
    pub has_shore: bool,
}

/// Tank ids per type, in discovery order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tanks {
    pub fuel: Vec<String>,
    pub fresh_water: Vec<String>,
    pub waste_water: Vec<String>,
}

impl Tanks {
    pub fn ids(&self, tank_type: TankType) -> &[String] {
        match tank_type {
            TankType::Fuel => &self.fuel,
            TankType::FreshWater => &self.fresh_water,
            TankType::WasteWater => &self.waste_water,
        }
    }

    fn ids_mut(&mut self, tank_type: TankType) -> &mut Vec<String> {
        match tank_type {
            TankType::Fuel => &mut self.fuel,
            TankType::FreshWater => &mut self.fresh_water,
            TankType::WasteWater => &mut self.waste_water,
        }
    }

    /// All (type, id) pairs in type order, then discovery order
    pub fn iter(&self) -> impl Iterator<Item = (TankType, &str)> + '_ {
        TankType::ALL
            .into_iter()
            .flat_map(move |t| self.ids(t).iter().map(move |id| (t, id.as_str())))
    }
}

/// Classified equipment inventory for the connected vessel
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovered {
    pub engines: Vec<String>,
    pub batteries: Vec<String>,
    pub tanks: Tanks,
    #[serde(flatten)]
    pub features: Features,
}

/// One newly classified piece of equipment
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Discovery {
    Engine { id: String },
    Battery { id: String },
    Tank { tank_type: TankType, id: String },
}

type Predicate = fn(&str) -> bool;
type Classifier = fn(&str, &mut Discovered) -> Option<Discovery>;

/// Ordered (predicate, classifier) table
const DISCOVERY_RULES: &[(Predicate, Classifier)] = &[
    (is_engine_path, classify_engine),
    (is_battery_path, classify_battery),
    (is_tank_path, classify_tank),
    (any_path, classify_features),
];

fn any_path(_path: &str) -> bool {
    true
}

fn segment(path: &str, index: usize) -> Option<&str> {
    path.split('.').nth(index).filter(|s| !s.is_empty())
}

fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

fn is_engine_path(path: &str) -> bool {
    path.starts_with("propulsion.") && !path.contains("generator")
}

fn classify_engine(path: &str, discovered: &mut Discovered) -> Option<Discovery> {
    let id = segment(path, 1)?;
    push_unique(&mut discovered.engines, id).then(|| Discovery::Engine { id: id.to_string() })
}

fn is_battery_path(path: &str) -> bool {
    path.starts_with("electrical.batteries.")
}

fn classify_battery(path: &str, discovered: &mut Discovered) -> Option<Discovery> {
    let id = segment(path, 2)?;
    push_unique(&mut discovered.batteries, id).then(|| Discovery::Battery { id: id.to_string() })
}

fn is_tank_path(path: &str) -> bool {
    path.starts_with("tanks.")
}

fn classify_tank(path: &str, discovered: &mut Discovered) -> Option<Discovery> {
    let tank_type = TankType::from_segment(segment(path, 1)?)?;
    let id = segment(path, 2)?;
    push_unique(discovered.tanks.ids_mut(tank_type), id).then(|| Discovery::Tank {
        tank_type,
        id: id.to_string(),
    })
}

fn classify_features(path: &str, discovered: &mut Discovered) -> Option<Discovery> {
    let flags = &mut discovered.features;
    for (needle, flag) in [
        ("wind", &mut flags.has_wind),
        ("depth", &mut flags.has_depth),
        ("autopilot", &mut flags.has_autopilot),
        ("anchor", &mut flags.has_anchor),
        ("solar", &mut flags.has_solar),
        ("generator", &mut flags.has_generator),
        ("shore", &mut flags.has_shore),
    ] {
        if path.contains(needle) {
            *flag = true;
        }
    }
    None
}

impl Discovered {
    /// Classify a newly observed path. Returns the equipment added, if any.
    pub fn classify(&mut self, path: &str) -> Vec<Discovery> {
        DISCOVERY_RULES
            .iter()
            .filter(|(matches, _)| matches(path))
            .filter_map(|(_, classify)| classify(path, self))
            .collect()
    }
}
