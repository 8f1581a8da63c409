use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One bus stop of a route, as shown on the kiosk page.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    /// `NaN` when the page had no usable value. Serialized as `null` then.
    pub lat: f64,
    pub lng: f64,
    /// Direction marker, kept under the page's own key.
    #[serde(rename = "dr")]
    pub direction: String,
    pub zone: String,
}

impl StopRecord {
    /// Builds a stop from one object of the `bstp` array.
    ///
    /// Missing text fields become empty strings, coordinates are coerced the
    /// way the page's own script would read them.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        StopRecord {
            id: text_field(raw, "stop_id"),
            name: text_field(raw, "stop_name"),
            lat: number_field(raw, "lat"),
            lng: number_field(raw, "lng"),
            direction: text_field(raw, "dr"),
            zone: text_field(raw, "zone"),
        }
    }
}

/// An entry of the kiosk route dropdown: `<option value="673">T580</option>`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RouteOption {
    /// Internal route id used by the kiosk page
    pub id: String,
    /// Public route code, e.g. `T580`
    pub code: String,
}

fn text_field(raw: &Map<String, Value>, key: &str) -> String {
    match raw.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

fn number_field(raw: &Map<String, Value>, key: &str) -> f64 {
    match raw.get(key) {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                parse_js_number(s)
            }
        }
        Some(_) => f64::NAN,
    }
}

/// Reads a non-empty trimmed string the way JavaScript's `Number()` does.
/// Unparsable text is NaN.
fn parse_js_number(s: &str) -> f64 {
    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits
            .chars()
            .try_fold(0.0, |acc, c| {
                c.to_digit(radix)
                    .map(|d| acc * f64::from(radix) + f64::from(d))
            })
            .unwrap_or(f64::NAN);
    }

    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    // Rust also reads "inf" and "nan" in any case, JavaScript doesn't
    let is_decimal = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !is_decimal {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

// Whole floats print without a trailing ".0", like the page script does.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}
