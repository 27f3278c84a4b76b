//! Variable fetchers and collectors.
//!
//! Resolving `{{name}}` against a context value is a two-step protocol. A
//! [`Collector`] inspects the value and the name and produces a
//! [`VariableFetcher`]; the fetcher then reads the member. Fetchers are
//! cached per `(runtime type, name)` in a [`FetcherCache`] owned by each
//! compiled template, so the inspection step runs once per type and name.
//!
//! A fetcher reports three outcomes:
//!
//! - `Ok(Some(value))` when the member exists (the value may be `Null`),
//! - `Ok(None)` when the value has no such member,
//! - `Err(FetchError)` when it was handed a value it cannot read. A cached
//!   fetcher that fails this way is discarded and a fresh one is created.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::value::{Object, TypeKey, Value};

/// A fetcher was applied to a value of the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct FetchError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl FetchError {
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.type_name(),
        }
    }
}

/// Reads a named member out of a context value.
pub trait VariableFetcher: Send + Sync {
    fn get(&self, ctx: &Value, name: &str) -> Result<Option<Value>, FetchError>;
}

/// Returns the context value itself; used for `.` and `this`.
#[derive(Debug, Clone, Copy)]
pub struct ThisFetcher;

impl VariableFetcher for ThisFetcher {
    fn get(&self, ctx: &Value, _name: &str) -> Result<Option<Value>, FetchError> {
        Ok(Some(ctx.clone()))
    }
}

/// Reads a key from a map.
#[derive(Debug, Clone, Copy)]
pub struct MapFetcher;

impl VariableFetcher for MapFetcher {
    fn get(&self, ctx: &Value, name: &str) -> Result<Option<Value>, FetchError> {
        match ctx {
            Value::Map(map) => Ok(map.get(name).cloned()),
            other => Err(FetchError::mismatch("map", other)),
        }
    }
}

/// Reads a list element by decimal index. Out-of-range indices are not found.
#[derive(Debug, Clone, Copy)]
pub struct ListIndexFetcher;

impl VariableFetcher for ListIndexFetcher {
    fn get(&self, ctx: &Value, name: &str) -> Result<Option<Value>, FetchError> {
        match ctx {
            Value::List(list) => Ok(name.parse::<usize>().ok().and_then(|ii| list.get(ii).cloned())),
            other => Err(FetchError::mismatch("list", other)),
        }
    }
}

/// Reports every name as not found.
#[derive(Debug, Clone, Copy)]
pub struct NotFoundFetcher;

impl VariableFetcher for NotFoundFetcher {
    fn get(&self, _ctx: &Value, _name: &str) -> Result<Option<Value>, FetchError> {
        Ok(None)
    }
}

pub static THIS_FETCHER: Lazy<Arc<dyn VariableFetcher>> = Lazy::new(|| Arc::new(ThisFetcher));
pub static MAP_FETCHER: Lazy<Arc<dyn VariableFetcher>> = Lazy::new(|| Arc::new(MapFetcher));
pub static LIST_INDEX_FETCHER: Lazy<Arc<dyn VariableFetcher>> =
    Lazy::new(|| Arc::new(ListIndexFetcher));
pub static NOT_FOUND_FETCHER: Lazy<Arc<dyn VariableFetcher>> =
    Lazy::new(|| Arc::new(NotFoundFetcher));

/// Reads a member of a host type through an accessor function.
///
/// This is what `#[derive(Object)]` generates for each field and method.
pub struct TypedFetcher<T> {
    accessor: fn(&T) -> Value,
}

impl<T: Object> VariableFetcher for TypedFetcher<T> {
    fn get(&self, ctx: &Value, _name: &str) -> Result<Option<Value>, FetchError> {
        ctx.downcast_ref::<T>()
            .map(|object| Some((self.accessor)(object)))
            .ok_or_else(|| FetchError::mismatch(std::any::type_name::<T>(), ctx))
    }
}

/// Creates a fetcher that applies `accessor` to values of type `T`.
///
/// # Examples
///
/// ```
/// use std::any::Any;
/// use std::sync::Arc;
/// use stache_rs_template::collector::{object_fetcher, VariableFetcher};
/// use stache_rs_template::value::{Object, Value};
///
/// #[derive(Debug)]
/// struct Celsius(f64);
///
/// impl Object for Celsius {
///     fn fetcher(&self, name: &str) -> Option<Arc<dyn VariableFetcher>> {
///         match name {
///             "fahrenheit" => Some(object_fetcher::<Self>(|c| Value::from(c.0 * 9.0 / 5.0 + 32.0))),
///             _ => None,
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let temp = Value::object(Celsius(100.0));
/// let fetcher = temp.downcast_ref::<Celsius>().unwrap().fetcher("fahrenheit").unwrap();
/// assert_eq!(fetcher.get(&temp, "fahrenheit").unwrap(), Some(Value::Float(212.0)));
/// ```
pub fn object_fetcher<T: Object>(accessor: fn(&T) -> Value) -> Arc<dyn VariableFetcher> {
    Arc::new(TypedFetcher { accessor })
}

/// Looks a name up in values embedded in a host value, in order, and
/// returns the first member found. Backs `#[stache(flatten)]`.
///
/// The embedded values are inspected on every call, so one fetcher serves
/// every instance of `T` whatever members each instance happens to have.
pub struct FlattenFetcher<T> {
    embedded: Vec<fn(&T) -> Value>,
}

impl<T: Object> VariableFetcher for FlattenFetcher<T> {
    fn get(&self, ctx: &Value, name: &str) -> Result<Option<Value>, FetchError> {
        let object = ctx
            .downcast_ref::<T>()
            .ok_or_else(|| FetchError::mismatch(std::any::type_name::<T>(), ctx))?;
        for project in &self.embedded {
            let inner = project(object);
            let found = DefaultCollector
                .create_fetcher(&inner, name)
                .and_then(|fetcher| fetcher.get(&inner, name).ok().flatten());
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }
}

/// Creates a fetcher that searches the values `embedded` returns, in order.
pub fn flatten_fetcher<T: Object>(embedded: Vec<fn(&T) -> Value>) -> Arc<dyn VariableFetcher> {
    Arc::new(FlattenFetcher { embedded })
}

/// The cache key: a runtime type and a member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetcherKey {
    pub type_key: TypeKey,
    pub name: Arc<str>,
}

impl FetcherKey {
    pub fn new(ctx: &Value, name: &Arc<str>) -> Self {
        Self {
            type_key: ctx.type_key(),
            name: Arc::clone(name),
        }
    }
}

/// A concurrent map from `(type, name)` to the fetcher created for it.
///
/// Shared by all executions of one template. Concurrent writers may race
/// to insert equivalent fetchers; the last one wins.
#[derive(Default)]
pub struct FetcherCache {
    entries: DashMap<FetcherKey, Arc<dyn VariableFetcher>>,
}

impl FetcherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FetcherKey) -> Option<Arc<dyn VariableFetcher>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(&self, key: FetcherKey, fetcher: Arc<dyn VariableFetcher>) {
        self.entries.insert(key, fetcher);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FetcherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Decides how values are iterated by sections and how members are fetched.
pub trait Collector: Send + Sync {
    /// Returns the elements of `value` if sections should iterate it.
    fn to_iterator<'v>(&self, value: &'v Value) -> Option<Box<dyn Iterator<Item = Value> + 'v>>;

    /// Creates a fetcher for `name` on values shaped like `ctx`, or `None`
    /// if no member by that name can exist.
    fn create_fetcher(&self, ctx: &Value, name: &str) -> Option<Arc<dyn VariableFetcher>>;

    /// Creates the per-template fetcher cache.
    fn create_fetcher_cache(&self) -> FetcherCache {
        FetcherCache::new()
    }
}

/// Iterates lists and iterable host objects; fetches from maps, lists (by
/// index), and host objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollector;

impl Collector for DefaultCollector {
    fn to_iterator<'v>(&self, value: &'v Value) -> Option<Box<dyn Iterator<Item = Value> + 'v>> {
        match value {
            Value::List(list) => Some(Box::new(list.iter().cloned())),
            Value::Object(object) => object.iter(),
            _ => None,
        }
    }

    fn create_fetcher(&self, ctx: &Value, name: &str) -> Option<Arc<dyn VariableFetcher>> {
        if name == "." || name == "this" {
            return Some(Arc::clone(&THIS_FETCHER));
        }
        match ctx {
            Value::Map(_) => Some(Arc::clone(&MAP_FETCHER)),
            Value::List(_) if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) => {
                Some(Arc::clone(&LIST_INDEX_FETCHER))
            }
            Value::Object(object) => object.fetcher(name),
            _ => None,
        }
    }
}
