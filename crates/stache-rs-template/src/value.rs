//! The dynamic value model.
//!
//! Template data is a tree of [`Value`]s. Scalars, lists, and maps are
//! built in; host types take part by implementing [`Object`] (usually via
//! `#[derive(Object)]`), and section callbacks by implementing [`Lambda`].
//!
//! Any [`serde::Serialize`] type can be converted with
//! [`Value::from_serialize`], and `serde_json::Value` converts directly.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use stache_rs_core::{StacheError, StacheResult};

use crate::collector::VariableFetcher;
use crate::template::Fragment;

/// A value that can be rendered by a template.
#[derive(Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
    /// A host object exposing named members through [`Object::fetcher`].
    Object(Arc<dyn Object>),
    /// A callback invoked in place of a section body.
    Lambda(Arc<dyn Lambda>),
}

/// The runtime type of a value, used to key the fetcher cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Lambda,
    Object(TypeId),
}

/// A host type that templates can read members from.
///
/// Implementations hand out a [`VariableFetcher`] per member name. The
/// fetcher is cached per `(type, name)` and reused for every later lookup
/// of that name on any value of the same type, so it must not capture
/// `self`; it receives the value to read from on each call.
pub trait Object: Any + Send + Sync + fmt::Debug {
    /// Returns a fetcher for `name`, or `None` if this type has no such member.
    fn fetcher(&self, name: &str) -> Option<Arc<dyn VariableFetcher>>;

    /// Returns the elements when this object should be iterated by sections.
    fn iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        None
    }

    /// Upcasts to [`Any`] for downcasting in fetchers.
    fn as_any(&self) -> &dyn Any;

    /// The concrete type name, used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A section callback.
///
/// When a section name resolves to a lambda, the section body is not
/// rendered. The lambda is handed a [`Fragment`] and decides what, if
/// anything, to write.
pub trait Lambda: Send + Sync {
    fn execute(&self, frag: &Fragment<'_>, out: &mut dyn fmt::Write) -> StacheResult<()>;
}

impl<F> Lambda for F
where
    F: Fn(&Fragment<'_>, &mut dyn fmt::Write) -> StacheResult<()> + Send + Sync,
{
    fn execute(&self, frag: &Fragment<'_>, out: &mut dyn fmt::Write) -> StacheResult<()> {
        self(frag, out)
    }
}

/// Conversion into a [`Value`] by reference.
///
/// Derived [`Object`] types use this to expose fields and method results.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl Value {
    /// Wraps a host object.
    pub fn object<T: Object>(object: T) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Wraps a lambda closure.
    ///
    /// # Examples
    ///
    /// ```
    /// use stache_rs_template::{Compiler, Value};
    /// use std::collections::BTreeMap;
    ///
    /// let bold = Value::lambda(|frag, out| {
    ///     out.write_str("<b>")?;
    ///     frag.execute(out)?;
    ///     out.write_str("</b>")?;
    ///     Ok(())
    /// });
    /// let data = Value::from(BTreeMap::from([("bold".to_string(), bold)]));
    /// let t = Compiler::default().compile("{{#bold}}hi{{/bold}}").unwrap();
    /// assert_eq!(t.execute(data).unwrap(), "<b>hi</b>");
    /// ```
    pub fn lambda<F>(lambda: F) -> Self
    where
        F: Fn(&Fragment<'_>, &mut dyn fmt::Write) -> StacheResult<()> + Send + Sync + 'static,
    {
        Self::Lambda(Arc::new(lambda))
    }

    /// Converts any serializable value through `serde_json`.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> StacheResult<Self> {
        serde_json::to_value(value)
            .map(Self::from)
            .map_err(|e| StacheError::SerializationError(e.to_string()))
    }

    /// Returns the runtime type key.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Self::Null => TypeKey::Null,
            Self::Bool(_) => TypeKey::Bool,
            Self::Int(_) => TypeKey::Int,
            Self::Float(_) => TypeKey::Float,
            Self::Str(_) => TypeKey::Str,
            Self::List(_) => TypeKey::List,
            Self::Map(_) => TypeKey::Map,
            Self::Lambda(_) => TypeKey::Lambda,
            Self::Object(o) => TypeKey::Object(o.as_any().type_id()),
        }
    }

    /// A short name for the runtime type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Lambda(_) => "lambda",
            Self::Object(o) => o.type_name(),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for integer or float zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Downcasts an [`Value::Object`] to its concrete type.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        match self {
            Self::Object(o) => o.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Object(o) => f.debug_tuple("Object").field(o).finish(),
            Self::Lambda(_) => f.write_str("Lambda"),
        }
    }
}

/// The default textual rendering of a value.
///
/// Null renders as `null`; lists and maps render their elements.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(list) => {
                f.write_str("[")?;
                for (ii, item) in list.iter().enumerate() {
                    if ii > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (ii, (key, item)) in map.iter().enumerate() {
                    if ii > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}={item}")?;
                }
                f.write_str("}")
            }
            Self::Object(o) => write!(f, "{o:?}"),
            Self::Lambda(_) => f.write_str("<lambda>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Lambda(a), Self::Lambda(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(i: $ty) -> Self {
                    Self::Int(i64::from(i))
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_from_wide_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[allow(clippy::cast_precision_loss)]
                fn from(i: $ty) -> Self {
                    i64::try_from(i).map_or(Self::Float(i as f64), Self::Int)
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

impl_from_wide_int!(u64, usize, isize);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Self::Map(Arc::new(map.into_iter().map(|(k, v)| (k, v.into())).collect()))
    }
}

impl<T: Into<Self>, S: std::hash::BuildHasher> From<HashMap<String, T, S>> for Value {
    fn from(map: HashMap<String, T, S>) -> Self {
        Self::Map(Arc::new(map.into_iter().map(|(k, v)| (k, v.into())).collect()))
    }
}

impl From<Arc<dyn Lambda>> for Value {
    fn from(lambda: Arc<dyn Lambda>) -> Self {
        Self::Lambda(lambda)
    }
}

impl From<Arc<dyn Object>> for Value {
    fn from(object: Arc<dyn Object>) -> Self {
        Self::Object(object)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Array(items) => Self::from(items),
            serde_json::Value::Object(map) => {
                Self::Map(Arc::new(map.into_iter().map(|(k, v)| (k, v.into())).collect()))
            }
        }
    }
}

impl FromIterator<Self> for Value {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        Self::List(Arc::new(iter.into_iter().collect()))
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        self.iter().map(ToValue::to_value).collect()
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(Arc::new(
            self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect(),
        ))
    }
}

impl<T: ToValue, S: std::hash::BuildHasher> ToValue for HashMap<String, T, S> {
    fn to_value(&self) -> Value {
        Value::Map(Arc::new(
            self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect(),
        ))
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Arc<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Point {
        x: i64,
    }

    impl Object for Point {
        fn fetcher(&self, _name: &str) -> Option<Arc<dyn VariableFetcher>> {
            None
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"a": [1, 2.5, "x", null, true]}));
        let list = value.as_map().unwrap()["a"].as_list().unwrap().to_vec();
        assert_eq!(
            list,
            vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Null,
                Value::Bool(true)
            ]
        );
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct User {
            name: String,
            age: u32,
        }
        let value = Value::from_serialize(&User {
            name: "Ada".into(),
            age: 36,
        })
        .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["name"], Value::from("Ada"));
        assert_eq!(map["age"], Value::Int(36));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::from(json!({"b": 2, "a": 1})).to_string(), "{a=1, b=2}");
    }

    #[test]
    fn test_wide_ints() {
        assert_eq!(Value::from(7usize), Value::Int(7));
        assert!(matches!(Value::from(u64::MAX), Value::Float(_)));
    }

    #[test]
    fn test_type_keys_distinguish_objects() {
        let point = Value::object(Point { x: 1 });
        assert_eq!(point.type_key(), TypeKey::Object(TypeId::of::<Point>()));
        assert_ne!(point.type_key(), Value::from("x").type_key());
        assert_eq!(point.downcast_ref::<Point>().map(|p| p.x), Some(1));
        assert!(point.type_name().ends_with("Point"));
    }

    #[test]
    fn test_is_zero() {
        assert!(Value::Int(0).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(!Value::Float(0.5).is_zero());
        assert!(!Value::from("0").is_zero());
    }

    #[test]
    fn test_to_value_containers() {
        let nested: Vec<Option<&str>> = vec![Some("a"), None];
        assert_eq!(
            nested.to_value(),
            Value::from(vec![Value::from("a"), Value::Null])
        );
        let map = HashMap::from([("k".to_string(), 3u8)]);
        assert_eq!(map.to_value().as_map().unwrap()["k"], Value::Int(3));
    }
}
