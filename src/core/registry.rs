// src/core/registry.rs

use crate::core::converters::{
    CompositeConverter, Converter, DisplayConverter, ItemsConverter, PathConverter,
    QuotedIfNeeded,
};
use crate::core::factory::FactorySet;
use crate::core::joining::{Aggregator, Flattener, JoiningFlattener, SymbolAggregator};
use crate::core::result_converters::{default_result_converter, RegexResultConverter};
use crate::core::value::TypeSpec;
use crate::error::Error;
use crate::models::{ComponentChoice, ExecutionResult};
use crate::system::executor::{Executor, ProcessExecutor, TracingExecutor};
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    /// The shared parameter-to-string converter: `Display` rendering for the
    /// common primitives plus paths, with whitespace-bearing values quoted.
    static ref STRING_CONVERTER: Arc<dyn Converter> = Arc::new(CompositeConverter::new(vec![
        Arc::new(QuotedIfNeeded::new(DisplayConverter::<String>::new())) as Arc<dyn Converter>,
        Arc::new(QuotedIfNeeded::new(DisplayConverter::<&'static str>::new())),
        Arc::new(DisplayConverter::<i8>::new()),
        Arc::new(DisplayConverter::<i16>::new()),
        Arc::new(DisplayConverter::<i32>::new()),
        Arc::new(DisplayConverter::<i64>::new()),
        Arc::new(DisplayConverter::<u8>::new()),
        Arc::new(DisplayConverter::<u16>::new()),
        Arc::new(DisplayConverter::<u32>::new()),
        Arc::new(DisplayConverter::<u64>::new()),
        Arc::new(DisplayConverter::<f32>::new()),
        Arc::new(DisplayConverter::<f64>::new()),
        Arc::new(DisplayConverter::<bool>::new()),
        Arc::new(DisplayConverter::<char>::new()),
        Arc::new(PathConverter),
    ]));
}

/// Path list separator used when a `paths` converter gets no explicit one.
fn platform_path_delimiter() -> &'static str {
    if cfg!(windows) { ";" } else { ":" }
}

// --- TYPE REGISTRY ---

/// Maps spec-level type identifiers to concrete Rust types and records, per
/// type, the factories able to build it from an [`ExecutionResult`].
pub struct TypeRegistry {
    ids: HashMap<String, TypeSpec>,
    entries: HashMap<TypeId, FactorySet>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            ids: HashMap::new(),
            entries: HashMap::new(),
        };
        registry.register::<ExecutionResult>("result");
        registry.register::<String>("string");
        registry.register::<i32>("int");
        registry.register::<()>("unit");
        registry
    }
}

impl TypeRegistry {
    /// Makes `id` resolve to `T`, without factories.
    pub fn register<T: std::any::Any + Send + Sync>(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into(), TypeSpec::of::<T>());
    }

    /// Makes `id` resolve to `T` and records how to build `T` from a result.
    pub fn register_with_factories<T: std::any::Any + Send + Sync>(
        &mut self,
        id: impl Into<String>,
        factories: FactorySet,
    ) {
        self.register::<T>(id);
        self.entries.insert(TypeId::of::<T>(), factories);
    }

    pub fn resolve(&self, id: &str) -> Result<TypeSpec, Error> {
        self.ids
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownType(id.to_string()))
    }

    pub fn factory_set(&self, spec: TypeSpec) -> Option<&FactorySet> {
        self.entries.get(&spec.id())
    }
}

// --- COMPONENT REGISTRY ---

type Provider<T> = Box<dyn Fn(Option<&str>) -> Result<Arc<T>, Error> + Send + Sync>;

/// Resolves the component identifiers a spec names into live converter,
/// aggregator, flattener, and executor instances. Each provider receives the
/// choice's configuration string, so one identifier like `regex` can cover a
/// family of differently-configured components.
pub struct ComponentRegistry {
    types: Arc<TypeRegistry>,
    converters: HashMap<String, Provider<dyn Converter>>,
    aggregators: HashMap<String, Provider<dyn Aggregator>>,
    flatteners: HashMap<String, Provider<dyn Flattener>>,
    executors: HashMap<String, Provider<dyn Executor>>,
}

impl ComponentRegistry {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        let mut registry = Self {
            types,
            converters: HashMap::new(),
            aggregators: HashMap::new(),
            flatteners: HashMap::new(),
            executors: HashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    fn register_builtins(&mut self) {
        self.register_converter("string", |_| Ok(Arc::clone(&STRING_CONVERTER)));
        self.register_converter("path", |_| Ok(Arc::new(PathConverter)));
        self.register_converter("paths", |config| {
            let delimiter = config
                .map(str::to_string)
                .unwrap_or_else(|| platform_path_delimiter().to_string());
            Ok(Arc::new(ItemsConverter::new(
                Arc::new(PathConverter),
                Arc::new(JoiningFlattener),
                delimiter,
            )))
        });
        self.register_converter("items", |config| {
            let delimiter = config.unwrap_or(" ").to_string();
            Ok(Arc::new(ItemsConverter::new(
                Arc::clone(&STRING_CONVERTER),
                Arc::new(JoiningFlattener),
                delimiter,
            )))
        });
        let types = Arc::clone(&self.types);
        self.register_converter("result", move |_| {
            Ok(Arc::new(default_result_converter(Arc::clone(&types))))
        });
        self.register_converter("regex", |config| {
            let pattern = config.ok_or_else(|| {
                Error::InvalidConfig("the 'regex' converter requires a pattern".to_string())
            })?;
            Ok(Arc::new(RegexResultConverter::new(pattern)?))
        });
        self.register_aggregator("symbol", |_| Ok(Arc::new(SymbolAggregator)));
        self.register_flattener("joining", |_| Ok(Arc::new(JoiningFlattener)));
        self.register_executor("process", |_| Ok(Arc::new(ProcessExecutor)));
        self.register_executor("traced_process", |_| {
            Ok(Arc::new(TracingExecutor::new(Arc::new(ProcessExecutor))))
        });
    }

    pub fn register_converter(
        &mut self,
        id: impl Into<String>,
        provider: impl Fn(Option<&str>) -> Result<Arc<dyn Converter>, Error> + Send + Sync + 'static,
    ) {
        self.converters.insert(id.into(), Box::new(provider));
    }

    pub fn register_aggregator(
        &mut self,
        id: impl Into<String>,
        provider: impl Fn(Option<&str>) -> Result<Arc<dyn Aggregator>, Error> + Send + Sync + 'static,
    ) {
        self.aggregators.insert(id.into(), Box::new(provider));
    }

    pub fn register_flattener(
        &mut self,
        id: impl Into<String>,
        provider: impl Fn(Option<&str>) -> Result<Arc<dyn Flattener>, Error> + Send + Sync + 'static,
    ) {
        self.flatteners.insert(id.into(), Box::new(provider));
    }

    pub fn register_executor(
        &mut self,
        id: impl Into<String>,
        provider: impl Fn(Option<&str>) -> Result<Arc<dyn Executor>, Error> + Send + Sync + 'static,
    ) {
        self.executors.insert(id.into(), Box::new(provider));
    }

    pub fn converter(&self, choice: &ComponentChoice) -> Result<Arc<dyn Converter>, Error> {
        Self::instantiate(&self.converters, choice, "converter")
    }

    pub fn aggregator(&self, choice: &ComponentChoice) -> Result<Arc<dyn Aggregator>, Error> {
        Self::instantiate(&self.aggregators, choice, "aggregator")
    }

    pub fn flattener(&self, choice: &ComponentChoice) -> Result<Arc<dyn Flattener>, Error> {
        Self::instantiate(&self.flatteners, choice, "flattener")
    }

    pub fn executor(&self, choice: &ComponentChoice) -> Result<Arc<dyn Executor>, Error> {
        Self::instantiate(&self.executors, choice, "executor")
    }

    fn instantiate<T: ?Sized>(
        providers: &HashMap<String, Provider<T>>,
        choice: &ComponentChoice,
        kind: &'static str,
    ) -> Result<Arc<T>, Error> {
        let provider = providers.get(&choice.id).ok_or_else(|| Error::UnknownComponent {
            kind,
            id: choice.id.clone(),
        })?;
        provider(choice.config.as_deref())
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new(Arc::new(TypeRegistry::default()))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::core::value::Extras;
    use std::path::PathBuf;

    #[test]
    fn test_type_registry_resolves_builtins() {
        let types = TypeRegistry::default();
        assert_eq!(types.resolve("string").unwrap(), TypeSpec::of::<String>());
        assert_eq!(types.resolve("int").unwrap(), TypeSpec::of::<i32>());
        assert_eq!(
            types.resolve("result").unwrap(),
            TypeSpec::of::<ExecutionResult>()
        );
        assert!(matches!(
            types.resolve("nope").unwrap_err(),
            Error::UnknownType(_)
        ));
    }

    #[test]
    fn test_string_converter_handles_common_primitives() {
        let registry = ComponentRegistry::default();
        let converter = registry
            .converter(&ComponentChoice::new("string"))
            .unwrap();
        let extras = Extras::new();
        for (argument, expected) in [
            (crate::arg(42i32), "42"),
            (crate::arg(true), "true"),
            (crate::arg("Some message".to_string()), "\"Some message\""),
            (crate::arg(PathBuf::from("a.jar")), "a.jar"),
        ] {
            let converted = converter
                .convert(
                    argument.value.as_ref(),
                    argument.value_type,
                    TypeSpec::of::<String>(),
                    &extras,
                )
                .unwrap();
            assert_eq!(*converted.downcast::<String>().unwrap(), expected);
        }
    }

    #[test]
    fn test_regex_converter_requires_configuration() {
        let registry = ComponentRegistry::default();
        let error = registry
            .converter(&ComponentChoice::new("regex"))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidConfig(_)));
        assert!(registry
            .converter(&ComponentChoice::with_config("regex", r"v(\d+)"))
            .is_ok());
    }

    #[test]
    fn test_unknown_component_names_its_kind() {
        let registry = ComponentRegistry::default();
        let error = registry
            .aggregator(&ComponentChoice::new("missing"))
            .unwrap_err();
        match error {
            Error::UnknownComponent { kind, id } => {
                assert_eq!(kind, "aggregator");
                assert_eq!(id, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_paths_converter_defaults_to_platform_delimiter() {
        let registry = ComponentRegistry::default();
        let converter = registry.converter(&ComponentChoice::new("paths")).unwrap();
        let list = crate::core::converters::ValueList::of(vec![
            PathBuf::from("a.jar"),
            PathBuf::from("b.jar"),
        ]);
        let extras = Extras::new();
        let converted = converter
            .convert(
                &list,
                TypeSpec::of::<crate::core::converters::ValueList>(),
                TypeSpec::of::<String>(),
                &extras,
            )
            .unwrap();
        let expected = if cfg!(windows) { "a.jar;b.jar" } else { "a.jar:b.jar" };
        assert_eq!(*converted.downcast::<String>().unwrap(), expected);
    }
}
