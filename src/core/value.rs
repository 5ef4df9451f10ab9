// src/core/value.rs

use std::any::{Any, TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased, owned argument or conversion product.
pub type Value = Box<dyn Any + Send + Sync>;

/// A borrowed view of a [`Value`], as handed to converters.
pub type ValueRef<'a> = &'a (dyn Any + Send + Sync);

/// Runtime type identity plus the human-readable name used in diagnostics.
#[derive(Clone, Copy, Eq)]
pub struct TypeSpec {
    id: TypeId,
    name: &'static str,
}

impl TypeSpec {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeSpec {
    fn eq(&self, other: &Self) -> bool {
        // Identity is the TypeId; names are display-only.
        self.id == other.id
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({})", self.name)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One call-time argument: the erased value together with its static type,
/// captured at the call site before erasure loses it.
pub struct Arg {
    pub(crate) value: Value,
    pub(crate) value_type: TypeSpec,
}

impl Arg {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            value_type: TypeSpec::of::<T>(),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arg({})", self.value_type)
    }
}

/// Shorthand for [`Arg::new`].
pub fn arg<T: Any + Send + Sync>(value: T) -> Arg {
    Arg::new(value)
}

/// The extra-parameter map of one call chain: out-of-band context that
/// bypasses conversion and is readable by every converter, flattener,
/// aggregator and executor of that chain.
///
/// Values are shared (`Arc`) because the interactive executor hands the map
/// to two concurrently running reader threads; mutable accumulators must
/// bring their own lock (e.g. `Arc<Mutex<String>>`).
#[derive(Default, Clone)]
pub struct Extras {
    entries: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    pub fn insert_shared(&mut self, name: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.entries.insert(name.into(), value);
    }

    pub(crate) fn insert_value(&mut self, name: String, value: Value) {
        self.entries.insert(name, Arc::from(value));
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.as_ref().downcast_ref::<T>()
    }

    pub fn get_shared(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_type_spec_identity() {
        assert_eq!(TypeSpec::of::<String>(), TypeSpec::of::<String>());
        assert_ne!(TypeSpec::of::<String>(), TypeSpec::of::<i32>());
        assert!(TypeSpec::of::<String>().is::<String>());
        assert!(TypeSpec::of::<String>().name().contains("String"));
    }

    #[test]
    fn test_arg_captures_static_type() {
        let argument = arg(42i32);
        assert!(argument.value_type.is::<i32>());
        assert_eq!(argument.value.downcast_ref::<i32>(), Some(&42));
    }

    #[test]
    fn test_extras_typed_access() {
        let mut extras = Extras::new();
        extras.insert("name", "Llama".to_string());
        extras.insert("timeout", 2i32);
        assert_eq!(extras.get::<String>("name").map(String::as_str), Some("Llama"));
        assert_eq!(extras.get::<i32>("timeout"), Some(&2));
        assert_eq!(extras.get::<i32>("name"), None);
        assert!(extras.get::<i32>("missing").is_none());
        assert_eq!(extras.len(), 2);
    }

    #[test]
    fn test_extras_shared_accumulator() {
        let accumulator: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
        let mut extras = Extras::new();
        extras.insert_shared("buffer", accumulator.clone());

        let buffer = extras.get::<Mutex<String>>("buffer").unwrap();
        buffer.lock().unwrap().push_str("hello");
        assert_eq!(accumulator.lock().unwrap().as_str(), "hello");
    }
}
