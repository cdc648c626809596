// SI → human unit conversions for SignalK paths
//
// SignalK reports everything in SI (Kelvin, m/s, radians, Pascal, Hz, m³/s,
// seconds, ratios). The state store keeps the converted projection so every
// consumer sees knots, °C, PSI, RPM and percentages.

use serde_json::Value;

/// Round half-up to `decimals` places (`floor(x * 10^d + 0.5) / 10^d`).
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

pub fn kelvin_to_c(k: Option<f64>) -> Option<f64> {
    k.map(|k| round_to(k - 273.15, 1))
}

pub fn ms_to_knots(v: Option<f64>) -> Option<f64> {
    v.map(|v| round_to(v * 1.94384, 1))
}

pub fn rad_to_deg(r: Option<f64>) -> Option<f64> {
    r.map(|r| round_to(r * 180.0 / std::f64::consts::PI, 0))
}

pub fn pa_to_psi(p: Option<f64>) -> Option<f64> {
    p.map(|p| round_to(p / 6894.76, 0))
}

pub fn hz_to_rpm(h: Option<f64>) -> Option<f64> {
    h.map(|h| round_to(h * 60.0, 0))
}

pub fn m3s_to_lph(v: Option<f64>) -> Option<f64> {
    v.map(|v| round_to(v * 3_600_000.0, 1))
}

pub fn sec_to_hours(s: Option<f64>) -> Option<f64> {
    s.map(|s| round_to(s / 3600.0, 0))
}

pub fn frac_to_percent(f: Option<f64>) -> Option<f64> {
    f.map(|f| round_to(f * 100.0, 0))
}

pub fn round1(v: Option<f64>) -> Option<f64> {
    v.map(|v| round_to(v, 1))
}

/// A conversion applied to one SignalK path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Structured values (e.g. position) kept as-is
    Identity,
    KelvinToC,
    MsToKnots,
    RadToDeg,
    PaToPsi,
    PaToHpa,
    HzToRpm,
    M3sToLph,
    SecToHours,
    FracToPercent,
    Round0,
    Round1,
}

impl Conversion {
    fn apply_f64(self, v: f64) -> Option<f64> {
        let v = Some(v);
        match self {
            Conversion::Identity => v,
            Conversion::KelvinToC => kelvin_to_c(v),
            Conversion::MsToKnots => ms_to_knots(v),
            Conversion::RadToDeg => rad_to_deg(v),
            Conversion::PaToPsi => pa_to_psi(v),
            Conversion::PaToHpa => v.map(|p| round_to(p / 100.0, 0)),
            Conversion::HzToRpm => hz_to_rpm(v),
            Conversion::M3sToLph => m3s_to_lph(v),
            Conversion::SecToHours => sec_to_hours(v),
            Conversion::FracToPercent => frac_to_percent(v),
            Conversion::Round0 => v.map(|v| round_to(v, 0)),
            Conversion::Round1 => round1(v),
        }
    }

    /// Convert a raw JSON value. Null stays null; non-numeric values
    /// pass through unchanged.
    pub fn apply(self, raw: &Value) -> Value {
        if self == Conversion::Identity {
            return raw.clone();
        }
        match raw.as_f64() {
            Some(v) => self
                .apply_f64(v)
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            None => raw.clone(),
        }
    }
}

/// Known paths. Full paths are matched first, then the last two segments,
/// then the last segment.
const CONVERSIONS: &[(&str, Conversion, &str)] = &[
    ("navigation.position", Conversion::Identity, ""),
    ("navigation.speedOverGround", Conversion::MsToKnots, "kts"),
    ("navigation.courseOverGroundTrue", Conversion::RadToDeg, "°"),
    ("navigation.headingMagnetic", Conversion::RadToDeg, "°"),
    ("navigation.headingTrue", Conversion::RadToDeg, "°"),
    ("environment.depth.belowTransducer", Conversion::Round1, "m"),
    ("environment.depth.belowKeel", Conversion::Round1, "m"),
    ("environment.wind.speedApparent", Conversion::MsToKnots, "kts"),
    ("environment.wind.angleApparent", Conversion::RadToDeg, "°"),
    ("environment.wind.speedTrue", Conversion::MsToKnots, "kts"),
    ("environment.water.temperature", Conversion::KelvinToC, "°C"),
    ("environment.outside.temperature", Conversion::KelvinToC, "°C"),
    ("environment.outside.pressure", Conversion::PaToHpa, "hPa"),
    // Leaf fallbacks for engines, batteries and tanks
    ("revolutions", Conversion::HzToRpm, "rpm"),
    ("oilPressure", Conversion::PaToPsi, "PSI"),
    ("coolantTemperature", Conversion::KelvinToC, "°C"),
    ("exhaustTemperature", Conversion::KelvinToC, "°C"),
    ("runTime", Conversion::SecToHours, "hrs"),
    ("fuel.rate", Conversion::M3sToLph, "L/hr"),
    ("voltage", Conversion::Round1, "V"),
    ("current", Conversion::Round1, "A"),
    ("power", Conversion::Round0, "W"),
    ("capacity.stateOfCharge", Conversion::FracToPercent, "%"),
    ("currentLevel", Conversion::FracToPercent, "%"),
];

/// Conversion plus the display unit of its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converter {
    pub conversion: Conversion,
    pub unit: &'static str,
}

fn lookup(key: &str) -> Option<Converter> {
    CONVERSIONS
        .iter()
        .find(|(path, _, _)| *path == key)
        .map(|(_, conversion, unit)| Converter {
            conversion: *conversion,
            unit: *unit,
        })
}

/// Find the converter for a path, or `None` to pass the raw value through.
pub fn find_converter(path: &str) -> Option<Converter> {
    if let Some(converter) = lookup(path) {
        return Some(converter);
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() >= 2 {
        let last_two = segments[segments.len() - 2..].join(".");
        if let Some(converter) = lookup(&last_two) {
            return Some(converter);
        }
    }

    segments.last().and_then(|leaf| lookup(leaf))
}

/// Converted value for `path`, or the raw value when no converter matches.
pub fn convert_value(path: &str, raw: &Value) -> Value {
    match find_converter(path) {
        Some(converter) => converter.conversion.apply(raw),
        None => raw.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_conversions() {
        assert_eq!(kelvin_to_c(Some(373.15)), Some(100.0));
        assert_eq!(ms_to_knots(Some(1.0)), Some(1.9));
        assert_eq!(hz_to_rpm(Some(25.0)), Some(1500.0));
        assert_eq!(pa_to_psi(Some(275_790.4)), Some(40.0));
        assert_eq!(frac_to_percent(Some(0.78)), Some(78.0));
        assert_eq!(sec_to_hours(Some(7200.0)), Some(2.0));
        assert_eq!(m3s_to_lph(Some(0.000001)), Some(3.6));
        assert_eq!(rad_to_deg(Some(std::f64::consts::PI)), Some(180.0));
    }

    #[test]
    fn test_null_input_yields_null() {
        assert_eq!(kelvin_to_c(None), None);
        assert_eq!(hz_to_rpm(None), None);
        assert_eq!(Conversion::HzToRpm.apply(&Value::Null), Value::Null);
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(2.5, 0), 3.0);
    }

    fn conversion_for(path: &str) -> Option<Conversion> {
        find_converter(path).map(|c| c.conversion)
    }

    #[test]
    fn test_lookup_order() {
        // Full path
        assert_eq!(
            conversion_for("navigation.speedOverGround"),
            Some(Conversion::MsToKnots)
        );
        // Last two segments
        assert_eq!(
            conversion_for("electrical.batteries.house.capacity.stateOfCharge"),
            Some(Conversion::FracToPercent)
        );
        assert_eq!(
            conversion_for("propulsion.port.fuel.rate"),
            Some(Conversion::M3sToLph)
        );
        // Last segment
        assert_eq!(
            conversion_for("propulsion.port.revolutions"),
            Some(Conversion::HzToRpm)
        );
        assert_eq!(conversion_for("design.airHeight"), None);
    }

    #[test]
    fn test_unknown_path_passes_through() {
        let raw = json!({"custom": [1, 2, 3]});
        assert_eq!(convert_value("vendor.custom.blob", &raw), raw);
        assert_eq!(convert_value("design.draft", &json!(1.234)), json!(1.234));
    }

    #[test]
    fn test_non_numeric_value_passes_through_numeric_converter() {
        let raw = json!("offline");
        assert_eq!(convert_value("propulsion.port.revolutions", &raw), raw);
    }

    #[test]
    fn test_units() {
        assert_eq!(
            find_converter("environment.outside.pressure").map(|c| c.unit),
            Some("hPa")
        );
        assert_eq!(
            find_converter("electrical.batteries.house.voltage").map(|c| c.unit),
            Some("V")
        );
    }
}
