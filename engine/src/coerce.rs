//! Lenient integer fields. Documents written by form tooling often carry
//! numbers as strings (`"7"`); those are accepted and normalised to integers.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

struct LenientU32;

impl<'de> Visitor<'de> for LenientU32 {
    type Value = u32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
        u32::try_from(v).map_err(|_| E::custom(format!("{} is too large", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
        if v < 0 {
            return Err(E::custom(format!("{} is negative", v)));
        }
        self.visit_u64(v as u64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u32, E> {
        if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
            Ok(v as u32)
        } else {
            Err(E::custom(format!("{} is not a non-negative integer", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed
            .parse::<u32>()
            .map_err(|_| E::custom(format!("`{}` is not a non-negative integer", v)))
    }
}

struct LenientOptU32;

impl<'de> Visitor<'de> for LenientOptU32 {
    type Value = Option<u32>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or nothing")
    }

    fn visit_none<E: de::Error>(self) -> Result<Option<u32>, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Option<u32>, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Option<u32>, D::Error> {
        d.deserialize_any(self)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Option<u32>, E> {
        LenientU32.visit_u64(v).map(Some)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Option<u32>, E> {
        LenientU32.visit_i64(v).map(Some)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Option<u32>, E> {
        LenientU32.visit_f64(v).map(Some)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Option<u32>, E> {
        if v.trim().is_empty() {
            return Ok(None);
        }
        LenientU32.visit_str(v).map(Some)
    }
}

pub fn u32_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    d.deserialize_any(LenientU32)
}

pub fn opt_u32_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    d.deserialize_option(LenientOptU32)
}

pub fn usize_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    u32_lenient(d).map(|v| v as usize)
}

pub fn opt_usize_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    opt_u32_lenient(d).map(|v| v.map(|v| v as usize))
}

#[derive(Deserialize)]
struct MaybeU32(#[serde(deserialize_with = "opt_u32_lenient")] Option<u32>);

/// A sparse `key -> integer` table where blank entries mean "not set".
pub fn sparse_map_lenient<'de, D, K>(d: D) -> Result<BTreeMap<K, u32>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
{
    let raw: Option<BTreeMap<K, MaybeU32>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.0.map(|v| (k, v)))
        .collect())
}

/// Roll entry lists; blank entries become 0, i.e. "not rolled yet".
pub fn rolls_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u32>, D::Error> {
    let raw: Option<Vec<MaybeU32>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.0.unwrap_or(0))
        .collect())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "super::u32_lenient")]
        n: u32,
        #[serde(default, deserialize_with = "super::opt_u32_lenient")]
        m: Option<u32>,
    }

    #[test]
    fn numbers_and_strings() {
        let p: Probe = serde_json::from_str(r#"{"n": "7", "m": 3}"#).unwrap();
        assert_eq!((p.n, p.m), (7, Some(3)));
        let p: Probe = serde_json::from_str(r#"{"n": 4.0}"#).unwrap();
        assert_eq!((p.n, p.m), (4, None));
        let p: Probe = serde_json::from_str(r#"{"n": 1, "m": null}"#).unwrap();
        assert_eq!(p.m, None);
    }

    #[derive(Deserialize)]
    struct Rolls {
        #[serde(deserialize_with = "super::rolls_lenient")]
        rolls: Vec<u32>,
    }

    #[test]
    fn blank_rolls_become_zero() {
        let r: Rolls = serde_json::from_str(r#"{"rolls": [4, "", "6", null]}"#).unwrap();
        assert_eq!(r.rolls, vec![4, 0, 6, 0]);
    }

    #[test]
    fn rejects_negative_and_fractional() {
        assert!(serde_json::from_str::<Probe>(r#"{"n": -1}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"n": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Probe>(r#"{"n": "x"}"#).is_err());
    }
}
