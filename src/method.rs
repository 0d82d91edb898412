//! The command vocabulary spoken by Wiz bulbs.

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Methods this library knows how to classify.
///
/// The string form of each variant is its wire token; parsing is ASCII
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum KnownMethod {
    GetPilot,
    SetPilot,
    /// State change pushed by a registered bulb.
    SyncPilot,
    /// Heartbeat a bulb broadcasts after power-up.
    FirstBeat,
    GetSystemConfig,
    SetSystemConfig,
    Registration,
    Pulse,
}

impl KnownMethod {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn mutates_state(self) -> bool {
        matches!(
            self,
            KnownMethod::SetPilot | KnownMethod::SetSystemConfig | KnownMethod::Registration
        )
    }

    pub fn inbound_only(self) -> bool {
        matches!(self, KnownMethod::SyncPilot | KnownMethod::FirstBeat)
    }

    pub fn method(self) -> Method {
        Method {
            name: Cow::Borrowed(self.name()),
            mutates_state: self.mutates_state(),
            inbound_only: self.inbound_only(),
        }
    }
}

impl From<KnownMethod> for Method {
    fn from(known: KnownMethod) -> Self {
        known.method()
    }
}

/// A bulb method: its wire name plus how it behaves.
///
/// Two methods are equal only if the name and both flags match.
///
/// Use [`Method::lookup`] to classify a name received from the wire. Names the
/// library does not know are kept as-is and classified as non-mutating,
/// outbound-capable methods, so newer firmware keeps working.
///
/// # Example
///
/// ```
/// use wiz_profiles::{KnownMethod, Method};
///
/// let m = Method::lookup("SETPILOT");
/// assert_eq!(m, KnownMethod::SetPilot);
/// assert!(m.mutates_state());
/// assert_eq!(m.as_str(), "setPilot");
///
/// let future = Method::lookup("getFuturePilot");
/// assert_eq!(future.as_str(), "getFuturePilot");
/// assert!(!future.mutates_state() && !future.inbound_only());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    name: Cow<'static, str>,
    mutates_state: bool,
    inbound_only: bool,
}

impl Method {
    pub fn new(name: impl Into<Cow<'static, str>>, mutates_state: bool, inbound_only: bool) -> Self {
        Method {
            name: name.into(),
            mutates_state,
            inbound_only,
        }
    }

    /// Classifies `name` against the known vocabulary, ignoring case.
    pub fn lookup(name: &str) -> Self {
        match KnownMethod::from_str(name) {
            Ok(known) => known.method(),
            Err(_) => Method::new(name.to_string(), false, false),
        }
    }

    /// The wire name, exactly as stored.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn mutates_state(&self) -> bool {
        self.mutates_state
    }

    pub fn inbound_only(&self) -> bool {
        self.inbound_only
    }

    /// The registry entry this method is identical to, if any.
    pub fn known(&self) -> Option<KnownMethod> {
        KnownMethod::iter().find(|k| k.method() == *self)
    }
}

/// The empty, unknown method a missing or `null` method field decodes to.
impl Default for Method {
    fn default() -> Self {
        Method::lookup("")
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Method {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Method::lookup(s))
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.name.into_owned()
    }
}

impl PartialEq<KnownMethod> for Method {
    fn eq(&self, other: &KnownMethod) -> bool {
        *self == other.method()
    }
}

/// serde_with adapter for [`Method`] fields.
///
/// Writes the bare wire name and reclassifies through [`Method::lookup`] on
/// read. Anything other than a string (`null`, numbers, objects) reads as
/// the empty, unknown method.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use serde_with::serde_as;
/// use wiz_profiles::{KnownMethod, Method, MethodAsWire};
///
/// #[serde_as]
/// #[derive(Serialize, Deserialize)]
/// struct Envelope {
///     #[serde_as(as = "MethodAsWire")]
///     method: Method,
/// }
///
/// let env: Envelope = serde_json::from_str(r#"{"method":"syncpilot"}"#).unwrap();
/// assert!(env.method.inbound_only());
/// assert_eq!(serde_json::to_string(&env).unwrap(), r#"{"method":"syncPilot"}"#);
/// ```
pub struct MethodAsWire;

impl SerializeAs<Method> for MethodAsWire {
    fn serialize_as<S>(source: &Method, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(source.as_str())
    }
}

impl<'de> DeserializeAs<'de, Method> for MethodAsWire {
    fn deserialize_as<D>(deserializer: D) -> Result<Method, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MethodVisitor)
    }
}

struct MethodVisitor;

impl<'de> Visitor<'de> for MethodVisitor {
    type Value = Method;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a method name")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Method, E> {
        Ok(Method::lookup(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Method, E> {
        Ok(Method::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Method, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Method::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Method, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Method::default())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MethodAsWire::serialize_as(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        MethodAsWire::deserialize_as(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_any_casing() {
        for known in KnownMethod::iter() {
            let name = known.name();
            for input in [name.to_string(), name.to_uppercase(), name.to_lowercase()] {
                assert_eq!(Method::lookup(&input).to_string(), name);
                assert_eq!(String::from(Method::lookup(&input)), name);
            }
        }
    }

    #[test]
    fn test_vocabulary_table() {
        let table = [
            ("getPilot", false, false),
            ("setPilot", true, false),
            ("syncPilot", false, true),
            ("firstBeat", false, true),
            ("getSystemConfig", false, false),
            ("setSystemConfig", true, false),
            ("registration", true, false),
            ("pulse", false, false),
        ];
        assert_eq!(KnownMethod::iter().count(), table.len());
        for (name, mutates, inbound) in table {
            let m = Method::lookup(name);
            assert_eq!(m.as_str(), name);
            assert_eq!(m.mutates_state(), mutates, "{name}");
            assert_eq!(m.inbound_only(), inbound, "{name}");
            assert!(m.known().is_some());
        }
    }

    #[test]
    fn test_names_unique_ignoring_case() {
        let mut names: Vec<String> = KnownMethod::iter()
            .map(|k| k.name().to_ascii_lowercase())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), KnownMethod::iter().count());
    }

    #[test]
    fn test_unknown_method_is_tolerated() {
        let m = Method::lookup("futureMethod");
        assert_eq!(m.as_str(), "futureMethod");
        assert!(!m.mutates_state());
        assert!(!m.inbound_only());
        assert_eq!(m.known(), None);
        assert_eq!("futureMethod".parse::<Method>().unwrap(), m);
    }

    #[test]
    fn test_equality_covers_flags() {
        let a = Method::new("setPilot", true, false);
        assert_eq!(a, KnownMethod::SetPilot);
        assert_ne!(a, Method::new("setPilot", false, false));
        assert_ne!(a, Method::new("setPilot", true, true));
        assert_eq!(Method::new("setPilot", false, false).known(), None);
    }

    #[test]
    fn test_wire_encoding_is_raw_name() {
        let odd = Method::new("GETPILOT", true, false);
        assert_eq!(serde_json::to_string(&odd).unwrap(), "\"GETPILOT\"");

        let decoded: Method = serde_json::from_str("\"GETPILOT\"").unwrap();
        assert_eq!(decoded, KnownMethod::GetPilot);
    }

    #[test]
    fn test_non_string_decodes_as_empty_method() {
        for input in ["null", "42", "-7", "1.5", "true", "[1, \"setPilot\"]", r#"{"name": "setPilot"}"#] {
            let decoded: Method = serde_json::from_str(input).unwrap();
            assert_eq!(decoded, Method::default(), "{input}");
            assert_eq!(decoded.as_str(), "");
            assert!(!decoded.mutates_state());
        }
    }
}
