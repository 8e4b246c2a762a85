//! Document tree model.
//!
//! A document is a [`Value`]: the JSON shapes plus a [`Reference`] leaf that
//! only appears in compacted output. Object members keep insertion order and
//! member keys may themselves be references once key compression is on.

use crate::error::{FsError, Result};
use crate::hash::Digest;
use crate::ser::ValueSerializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Number
// ============================================================================

/// A number held as canonical decimal text.
///
/// Integers render in plain decimal. Floats render as the shortest decimal
/// that round-trips, without exponent and without a trailing `.0`, so `1`,
/// `1.0` and `1e0` are the same `Number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Number(String);

impl Number {
    pub fn from_i64(v: i64) -> Self {
        Self(v.to_string())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(v.to_string())
    }

    pub fn from_f64(v: f64) -> Result<Self> {
        if !v.is_finite() {
            return Err(FsError::UnsupportedShape(format!("non-finite number {v}")));
        }
        if v == 0.0 {
            // folds -0.0 into 0
            return Ok(Self("0".into()));
        }
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            return Ok(Self::from_i64(v as i64));
        }
        Ok(Self(format!("{v}")))
    }

    pub fn from_json(n: &serde_json::Number) -> Result<Self> {
        if let Some(i) = n.as_i64() {
            Ok(Self::from_i64(i))
        } else if let Some(u) = n.as_u64() {
            Ok(Self::from_u64(u))
        } else if let Some(f) = n.as_f64() {
            Self::from_f64(f)
        } else {
            Err(FsError::UnsupportedShape(format!("unrepresentable number {n}")))
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Number> {
        if let Ok(i) = self.0.parse::<i64>() {
            return Ok(i.into());
        }
        if let Ok(u) = self.0.parse::<u64>() {
            return Ok(u.into());
        }
        self.0
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| FsError::UnsupportedShape(format!("unrepresentable number {}", self.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// Trackable leaf content. Null carries no information and is never tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => Ok(Self::Number(Number::from_json(n)?)),
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            other => Err(FsError::UnsupportedShape(format!("not a scalar: {other}"))),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.to_json()?),
            Self::String(s) => serde_json::Value::String(s.clone()),
        })
    }

    /// Approximate inline cost in bytes, as JSON text.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Bool(true) => 4,
            Self::Bool(false) => 5,
            Self::Number(n) => n.as_str().len(),
            Self::String(s) => s.len() + 2,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Number(n) => Value::Number(n),
            Scalar::String(s) => Value::String(s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Scalar::from_json(&json).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Reference / Key
// ============================================================================

/// Placeholder for promoted content. Whether it stands for a key or a value
/// follows from where it sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(Digest);

impl Reference {
    pub fn new(digest: Digest) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> Digest {
        self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ref:{}>", self.0)
    }
}

/// Object member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Ref(Reference),
}

impl Key {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Ref(_) => None,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<Reference> for Key {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::Ref(r) => write!(f, "{r}"),
        }
    }
}

// ============================================================================
// Object
// ============================================================================

/// Ordered object members with unique keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Object {
    members: Vec<(Key, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from members, rejecting duplicate keys.
    pub fn from_members(members: Vec<(Key, Value)>) -> Result<Self> {
        let mut seen: HashSet<&Key> = HashSet::with_capacity(members.len());
        for (key, _) in &members {
            if !seen.insert(key) {
                return Err(FsError::UnsupportedShape(format!("duplicate object key {key}")));
            }
        }
        Ok(Self { members })
    }

    /// Append a member; fails if the key is already present.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.members.iter().any(|(k, _)| *k == key) {
            return Err(FsError::UnsupportedShape(format!("duplicate object key {key}")));
        }
        self.members.push((key, value.into()));
        Ok(())
    }

    /// Look up a member by literal name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(k, _)| k.as_name() == Some(name))
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.members.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Key, Value)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a (Key, Value);
    type IntoIter = std::slice::Iter<'a, (Key, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl IntoIterator for Object {
    type Item = (Key, Value);
    type IntoIter = std::vec::IntoIter<(Key, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

// ============================================================================
// Value
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Ref(Reference),
}

/// Per-node hook for [`Value::rewrite`].
///
/// `rewrite_leaf` sees every node that is not an array or object, including
/// nulls and references; `rewrite_key` sees every object member key.
pub trait Rewrite {
    fn rewrite_key(&mut self, key: &Key) -> Result<Key>;
    fn rewrite_leaf(&mut self, leaf: &Value) -> Result<Value>;
}

impl Value {
    /// Convert a plain decoded JSON document. Nothing in the input is
    /// interpreted as a reference.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(Number::from_json(n)?),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(
                items.iter().map(Value::from_json).collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(map) => {
                let mut members = Vec::with_capacity(map.len());
                for (k, v) in map {
                    members.push((Key::Name(k.clone()), Value::from_json(v)?));
                }
                // serde_json maps cannot hold duplicate keys
                Value::Object(Object { members })
            }
        })
    }

    /// Convert any serializable host value. Map keys that are not strings
    /// and non-finite floats fail with `UnsupportedShape`.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        value.serialize(ValueSerializer)
    }

    /// Convert back to plain JSON. A tree that still holds references is
    /// not a plain document.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.to_json()?),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(obj) => {
                let mut map = serde_json::Map::with_capacity(obj.len());
                for (k, v) in obj {
                    match k {
                        Key::Name(name) => {
                            map.insert(name.clone(), v.to_json()?);
                        }
                        Key::Ref(r) => {
                            return Err(FsError::UnsupportedShape(format!(
                                "unexpanded key reference {r}"
                            )))
                        }
                    }
                }
                serde_json::Value::Object(map)
            }
            Value::Ref(r) => {
                return Err(FsError::UnsupportedShape(format!("unexpanded reference {r}")))
            }
        })
    }

    /// The trackable content of this node, if it is a bool, number or string.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Whether any leaf or key in the tree is a reference.
    pub fn contains_refs(&self) -> bool {
        match self {
            Value::Ref(_) => true,
            Value::Array(items) => items.iter().any(Value::contains_refs),
            Value::Object(obj) => obj.iter().any(|(k, v)| k.is_ref() || v.contains_refs()),
            _ => false,
        }
    }

    /// Rebuild the tree, passing every key and leaf through `rewriter`.
    ///
    /// Array and member order are preserved. A document nesting more than
    /// `max_depth` arrays/objects fails with `UnsupportedShape`.
    pub fn rewrite<R: Rewrite + ?Sized>(&self, rewriter: &mut R, max_depth: usize) -> Result<Value> {
        self.rewrite_at(rewriter, 0, max_depth)
    }

    fn rewrite_at<R: Rewrite + ?Sized>(
        &self,
        rewriter: &mut R,
        depth: usize,
        max_depth: usize,
    ) -> Result<Value> {
        match self {
            Value::Array(items) => {
                let depth = enter(depth, max_depth)?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.rewrite_at(rewriter, depth, max_depth)?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(obj) => {
                let depth = enter(depth, max_depth)?;
                let mut members = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    let key = rewriter.rewrite_key(key)?;
                    let value = value.rewrite_at(rewriter, depth, max_depth)?;
                    members.push((key, value));
                }
                Ok(Value::Object(Object::from_members(members)?))
            }
            leaf => rewriter.rewrite_leaf(leaf),
        }
    }
}

fn enter(depth: usize, max_depth: usize) -> Result<usize> {
    let depth = depth + 1;
    if depth > max_depth {
        return Err(FsError::UnsupportedShape(format!(
            "document nests deeper than {max_depth} levels"
        )));
    }
    Ok(depth)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::from_i64(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::from_i64(i64::from(i)))
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::Number(Number::from_u64(u64::from(u)))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Number(Number::from_u64(u))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Ref(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}
