//! Generic attribute storage.
//!
//! Used by `Settings` (preferences) and by media tags shown in the HUD.
//! Keys are kept in a `BTreeMap` so JSON output is stable and
//! `hash_all()` is deterministic without sorting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Generic attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Str(String),
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

impl Hash for AttrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use AttrValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Bool(v) => v.hash(state),
            Str(v) => v.hash(state),
            Int(v) => v.hash(state),
            UInt(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            Vec2(arr) => arr.iter().for_each(|f| f.to_bits().hash(state)),
            Vec4(arr) => arr.iter().for_each(|f| f.to_bits().hash(state)),
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Str(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::UInt(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v:.3}"),
            AttrValue::Vec2([x, y]) => write!(f, "{x:.3} {y:.3}"),
            AttrValue::Vec4([x, y, z, w]) => write!(f, "{x:.3} {y:.3} {z:.3} {w:.3}"),
        }
    }
}

/// Attribute container: string key -> typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs {
    #[serde(default)]
    map: BTreeMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.map.insert(key.into(), value);
    }

    /// Set only when the key is absent. Returns true if inserted.
    pub fn set_default(&mut self, key: &str, value: AttrValue) -> bool {
        if self.map.contains_key(key) {
            return false;
        }
        self.map.insert(key.to_string(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.map.get(key) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        match self.map.get(key) {
            Some(AttrValue::Int(v)) => Some(*v),
            Some(AttrValue::UInt(v)) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        match self.map.get(key) {
            Some(AttrValue::UInt(v)) => Some(*v),
            Some(AttrValue::Int(v)) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.map.get(key) {
            Some(AttrValue::Float(v)) => Some(*v),
            Some(AttrValue::Int(v)) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.map.get(key) {
            Some(AttrValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_vec4(&self, key: &str) -> Option<[f32; 4]> {
        match self.map.get(key) {
            Some(AttrValue::Vec4(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32_or(&self, key: &str, default: i32) -> i32 {
        self.get_i32(key).unwrap_or(default)
    }

    pub fn get_u32_or(&self, key: &str, default: u32) -> u32 {
        self.get_u32(key).unwrap_or(default)
    }

    pub fn get_float_or(&self, key: &str, default: f32) -> f32 {
        self.get_float(key).unwrap_or(default)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.map.remove(key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.map.iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Hash of every key and value; changes whenever any attribute changes.
    pub fn hash_all(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for (key, val) in &self.map {
            key.hash(&mut hasher);
            val.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut a = Attrs::new();
        a.set("pen_size", AttrValue::Int(10));
        a.set("laser", AttrValue::Bool(true));
        a.set("gamma", AttrValue::Float(2.2));
        assert_eq!(a.get_i32("pen_size"), Some(10));
        assert_eq!(a.get_u32("pen_size"), Some(10));
        assert_eq!(a.get_float("pen_size"), Some(10.0));
        assert_eq!(a.get_bool("pen_size"), None);
        assert!(a.get_bool_or("laser", false));
        assert_eq!(a.get_float_or("missing", 1.5), 1.5);
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut a = Attrs::new();
        a.set("font", AttrValue::Str("Mono".into()));
        assert!(!a.set_default("font", AttrValue::Str("Sans".into())));
        assert_eq!(a.get_str("font"), Some("Mono"));
        assert!(a.set_default("font_size", AttrValue::Int(30)));
    }

    #[test]
    fn test_hash_changes_with_value() {
        let mut a = Attrs::new();
        a.set("zoom_speed", AttrValue::Int(2));
        let h1 = a.hash_all();
        a.set("zoom_speed", AttrValue::Int(1));
        assert_ne!(h1, a.hash_all());
    }
}
