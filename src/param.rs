//! Typed effect parameters and their persisted string form
//!
//! Every effect declares its parameters with [`ParamSpec`]. Values are resolved from
//! stored attribute strings, falling back to preferences and then to the declared
//! default, see [`ParamSet::resolve`].
use crate::{Error, Path, Point, Result, Scalar, SatelliteArray};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Kind of the value stored by a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    /// Integer, persisted values with a fractional part are rounded
    Int,
    Bool,
    /// One of the listed keys
    Enum(&'static [&'static str]),
    Point,
    Path,
    Text,
    /// RGBA color packed as `0xRRGGBBAA`
    Color,
    Satellites,
}

/// Value of a parameter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", content = "value", rename_all = "lowercase")
)]
pub enum ParamValue {
    Scalar(Scalar),
    Int(i64),
    Bool(bool),
    Enum(String),
    Point(Point),
    Path(Path),
    Text(String),
    Color(u32),
    Satellites(SatelliteArray),
}

impl ParamValue {
    /// Persisted string representation
    pub fn encode(&self) -> String {
        match self {
            ParamValue::Scalar(value) => format_scalar(*value),
            ParamValue::Int(value) => value.to_string(),
            ParamValue::Bool(value) => value.to_string(),
            ParamValue::Enum(value) | ParamValue::Text(value) => value.clone(),
            ParamValue::Point(point) => {
                format!("{},{}", format_scalar(point.x()), format_scalar(point.y()))
            }
            ParamValue::Path(path) => path.to_svg_path().trim_end().to_owned(),
            ParamValue::Color(color) => format!("#{:08x}", color),
            ParamValue::Satellites(satellites) => satellites.to_string(),
        }
    }

    /// Decode persisted string of the parameter `key` with the given kind
    pub fn decode(key: &str, kind: ParamKind, text: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue {
            key: key.to_owned(),
            value: text.to_owned(),
        };
        let trimmed = text.trim();
        let value = match kind {
            ParamKind::Scalar => ParamValue::Scalar(parse_scalar(trimmed).ok_or_else(invalid)?),
            ParamKind::Int => match trimmed.parse::<i64>() {
                Ok(value) => ParamValue::Int(value),
                Err(_) => {
                    let value = parse_scalar(trimmed)
                        .filter(|value| value.is_finite())
                        .ok_or_else(invalid)?;
                    ParamValue::Int(value.round() as i64)
                }
            },
            ParamKind::Bool => match trimmed {
                "true" | "1" => ParamValue::Bool(true),
                "false" | "0" => ParamValue::Bool(false),
                _ => return Err(invalid()),
            },
            ParamKind::Enum(variants) => {
                if !variants.contains(&trimmed) {
                    return Err(invalid());
                }
                ParamValue::Enum(trimmed.to_owned())
            }
            ParamKind::Point => {
                let (x, y) = trimmed.split_once(',').ok_or_else(invalid)?;
                let x = parse_scalar(x.trim()).ok_or_else(invalid)?;
                let y = parse_scalar(y.trim()).ok_or_else(invalid)?;
                ParamValue::Point(Point::new(x, y))
            }
            ParamKind::Path => ParamValue::Path(trimmed.parse().map_err(|_| invalid())?),
            ParamKind::Text => ParamValue::Text(text.to_owned()),
            ParamKind::Color => ParamValue::Color(parse_color(trimmed).ok_or_else(invalid)?),
            ParamKind::Satellites => {
                ParamValue::Satellites(trimmed.parse().map_err(|_| invalid())?)
            }
        };
        Ok(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Format scalar in the shortest form that reads back to the same value
pub fn format_scalar(value: Scalar) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return (value as i64).to_string();
    }
    let mut buffer = [0u8; lexical_core::BUFFER_SIZE];
    let bytes = lexical_core::write(value, &mut buffer);
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_scalar(text: &str) -> Option<Scalar> {
    text.parse::<Scalar>().ok().filter(|value| !value.is_nan())
}

/// Parse `#rrggbbaa` or `#rrggbb` color
fn parse_color(text: &str) -> Option<u32> {
    let hex = text.strip_prefix('#')?;
    let value = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        8 => Some(value),
        6 => Some((value << 8) | 0xff),
        _ => None,
    }
}

/// Preference key of the effect parameter
pub fn pref_key(effect_key: &str, param_key: &str) -> String {
    format!("/live_effects/{}/{}", effect_key, param_key)
}

/// Declaration of a single effect parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
    /// Inclusive range of numeric values
    pub min: Scalar,
    pub max: Scalar,
}

impl ParamSpec {
    fn new(key: &'static str, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            key,
            kind,
            default,
            min: Scalar::NEG_INFINITY,
            max: Scalar::INFINITY,
        }
    }

    pub fn scalar(key: &'static str, default: Scalar) -> Self {
        Self::new(key, ParamKind::Scalar, ParamValue::Scalar(default))
    }

    pub fn int(key: &'static str, default: i64) -> Self {
        Self::new(key, ParamKind::Int, ParamValue::Int(default))
    }

    pub fn bool(key: &'static str, default: bool) -> Self {
        Self::new(key, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn choice(key: &'static str, variants: &'static [&'static str], default: &str) -> Self {
        Self::new(
            key,
            ParamKind::Enum(variants),
            ParamValue::Enum(default.to_owned()),
        )
    }

    pub fn point(key: &'static str, default: Point) -> Self {
        Self::new(key, ParamKind::Point, ParamValue::Point(default))
    }

    pub fn path(key: &'static str, default: Path) -> Self {
        Self::new(key, ParamKind::Path, ParamValue::Path(default))
    }

    pub fn text(key: &'static str, default: &str) -> Self {
        Self::new(key, ParamKind::Text, ParamValue::Text(default.to_owned()))
    }

    pub fn color(key: &'static str, default: u32) -> Self {
        Self::new(key, ParamKind::Color, ParamValue::Color(default))
    }

    pub fn satellites(key: &'static str) -> Self {
        Self::new(
            key,
            ParamKind::Satellites,
            ParamValue::Satellites(SatelliteArray::default()),
        )
    }

    /// Restrict numeric values to `[min, max]`
    pub fn range(self, min: Scalar, max: Scalar) -> Self {
        Self { min, max, ..self }
    }

    pub(crate) fn clamp(&self, value: ParamValue) -> ParamValue {
        match value {
            ParamValue::Scalar(value) => ParamValue::Scalar(value.clamp(self.min, self.max)),
            ParamValue::Int(value) => {
                ParamValue::Int((value as Scalar).clamp(self.min, self.max).round() as i64)
            }
            value => value,
        }
    }

    /// Decode value, logging and returning `None` on failure
    fn decode_or_warn(&self, origin: &str, text: &str, fallback: &ParamValue) -> Option<ParamValue> {
        match ParamValue::decode(self.key, self.kind, text) {
            Ok(value) => Some(self.clamp(value)),
            Err(error) => {
                tracing::warn!(
                    "[param] {}: {}, falling back to {:?}",
                    origin,
                    error,
                    fallback.encode()
                );
                None
            }
        }
    }
}

/// Read-only snapshot of the application preferences
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Preferences {
    entries: BTreeMap<String, String>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder style version of `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Preferred default of the effect parameter
    pub fn effect_value(&self, effect_key: &str, param_key: &str) -> Option<&str> {
        self.get(&pref_key(effect_key, param_key))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Preferences {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Resolved values of all parameters of an effect
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParamSet {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard defaults of all declared parameters
    pub fn defaults(specs: &[ParamSpec]) -> Self {
        Self {
            values: specs
                .iter()
                .map(|spec| (spec.key.to_owned(), spec.default.clone()))
                .collect(),
        }
    }

    /// Resolve parameter values
    ///
    /// Precedence is the stored attribute string, then the preference entry
    /// `/live_effects/<effect>/<param>`, then the declared default. Strings that fail
    /// to decode are reported with `warn!` and skipped. Numeric values are clamped
    /// to the declared range.
    pub fn resolve(
        effect_key: &str,
        specs: &[ParamSpec],
        stored: &BTreeMap<String, String>,
        prefs: &Preferences,
    ) -> Self {
        let mut values = BTreeMap::new();
        for spec in specs {
            let mut value = spec.default.clone();
            let key = pref_key(effect_key, spec.key);
            if let Some(text) = prefs.get(&key) {
                if let Some(pref) = spec.decode_or_warn(&key, text, &value) {
                    value = pref;
                }
            }
            if let Some(text) = stored.get(spec.key) {
                if let Some(stored) = spec.decode_or_warn(&key, text, &value) {
                    value = stored;
                }
            }
            values.insert(spec.key.to_owned(), value);
        }
        for key in stored.keys() {
            if !values.contains_key(key) {
                tracing::debug!("[param] {}: unknown parameter {}", effect_key, key);
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    /// Builder style version of `set`
    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn scalar(&self, key: &str) -> Option<Scalar> {
        match self.get(key)? {
            ParamValue::Scalar(value) => Some(*value),
            ParamValue::Int(value) => Some(*value as Scalar),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            ParamValue::Int(value) => Some(*value),
            ParamValue::Scalar(value) => Some(value.round() as i64),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn point(&self, key: &str) -> Option<Point> {
        match self.get(key)? {
            ParamValue::Point(point) => Some(*point),
            _ => None,
        }
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        match self.get(key)? {
            ParamValue::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ParamValue::Text(text) | ParamValue::Enum(text) => Some(text),
            _ => None,
        }
    }

    pub fn color(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            ParamValue::Color(color) => Some(*color),
            _ => None,
        }
    }

    pub fn satellites(&self, key: &str) -> Option<&SatelliteArray> {
        match self.get(key)? {
            ParamValue::Satellites(satellites) => Some(satellites),
            _ => None,
        }
    }

    /// Enumeration value converted to its typed form
    pub fn choice<T: FromStr>(&self, key: &str) -> Option<T> {
        self.text(key)?.parse().ok()
    }

    /// Persisted string form of all values
    pub fn encode(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.encode()))
            .collect()
    }
}

/// Implement `FromStr` and `Display` for a plain enumeration through its keys
macro_rules! impl_choice {
    ($name:ident, { $($variant:ident => $key:literal),+ $(,)? }) => {
        impl $name {
            /// Persisted keys of all variants
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
                match text {
                    $($key => Ok($name::$variant),)+
                    _ => Err($crate::Error::InvalidValue {
                        key: stringify!($name).to_owned(),
                        value: text.to_owned(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}
pub(crate) use impl_choice;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::scalar("radius", 0.0).range(0.0, Scalar::INFINITY),
            ParamSpec::int("steps", 1).range(1.0, 999.0),
            ParamSpec::bool("flexible", false),
            ParamSpec::choice("method", &["auto", "arc", "bezier"], "auto"),
            ParamSpec::point("origin", Point::new(0.0, 0.0)),
            ParamSpec::color("color", 0x000000ff),
        ]
    }

    #[test]
    fn test_encode() {
        assert_eq!(format_scalar(2.0), "2");
        assert_eq!(format_scalar(-0.0), "0");
        assert_eq!(format_scalar(0.25), "0.25");
        assert_eq!(format_scalar(-1.5), "-1.5");
        assert_eq!(ParamValue::Bool(true).encode(), "true");
        assert_eq!(ParamValue::Point(Point::new(1.5, -2.0)).encode(), "1.5,-2");
        assert_eq!(ParamValue::Color(0xff8000ff).encode(), "#ff8000ff");
        let path: Path = "M0,0 L1,0".parse().unwrap();
        assert_eq!(ParamValue::Path(path).encode(), "M0,0 L1,0");
    }

    #[test]
    fn test_decode() -> Result<()> {
        assert_eq!(
            ParamValue::decode("k", ParamKind::Int, "2.6")?,
            ParamValue::Int(3)
        );
        assert_eq!(
            ParamValue::decode("k", ParamKind::Point, " 3, 4 ")?,
            ParamValue::Point(Point::new(3.0, 4.0))
        );
        assert_eq!(
            ParamValue::decode("k", ParamKind::Color, "#ff0000")?,
            ParamValue::Color(0xff0000ff)
        );
        assert!(ParamValue::decode("k", ParamKind::Bool, "yes").is_err());
        assert!(ParamValue::decode("k", ParamKind::Scalar, "NaN").is_err());
        assert!(ParamValue::decode("k", ParamKind::Enum(&["a", "b"]), "c").is_err());
        match ParamValue::decode("radius", ParamKind::Scalar, "abc") {
            Err(Error::InvalidValue { key, value }) => {
                assert_eq!(key, "radius");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_resolve_precedence() {
        let specs = specs();
        let prefs = Preferences::new()
            .with(pref_key("fillet_chamfer", "radius"), "5")
            .with(pref_key("fillet_chamfer", "method"), "arc");
        let stored: BTreeMap<String, String> = [
            ("method".to_owned(), "bezier".to_owned()),
            ("steps".to_owned(), "5000".to_owned()),
            ("flexible".to_owned(), "maybe".to_owned()),
        ]
        .into_iter()
        .collect();
        let params = ParamSet::resolve("fillet_chamfer", &specs, &stored, &prefs);
        // preference overrides default
        assert_approx_eq!(params.scalar("radius").unwrap(), 5.0, 1e-12);
        // stored overrides preference
        assert_eq!(params.text("method"), Some("bezier"));
        // clamped to range
        assert_eq!(params.int("steps"), Some(999));
        // decode failure falls back to default
        assert_eq!(params.bool("flexible"), Some(false));
        assert_eq!(params.point("origin"), Some(Point::new(0.0, 0.0)));
        assert_eq!(params.color("color"), Some(0x000000ff));
    }

    #[test]
    fn test_resolve_bad_preference() {
        let specs = specs();
        let prefs = Preferences::new().with(pref_key("e", "radius"), "-");
        let params = ParamSet::resolve("e", &specs, &BTreeMap::new(), &prefs);
        assert_eq!(params, ParamSet::defaults(&specs));

        let encoded = params.encode();
        assert_eq!(encoded["radius"], "0");
        assert_eq!(encoded["method"], "auto");
        assert_eq!(encoded["origin"], "0,0");
        let again = ParamSet::resolve("e", &specs, &encoded, &Preferences::new());
        assert_eq!(again, params);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<()> {
        let params = ParamSet::defaults(&specs()).with(
            "guide",
            ParamValue::Path("M0,0 L10,0".parse()?),
        );
        let json = serde_json::to_string(&params)?;
        let restored: ParamSet = serde_json::from_str(&json)?;
        assert_eq!(restored, params);
        Ok(())
    }
}
