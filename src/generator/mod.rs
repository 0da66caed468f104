//! Synthetic implementation generator.
//!
//! Given an interface, the generator emits a brand-new concrete class that implements every
//! abstract, default, and inherited instance method of that interface by forwarding it to a
//! single static dispatch hook (see [`DispatchHook`]). The generated class has a public
//! no-argument constructor, directly implements only the target interface, and carries a
//! generic class signature when the target is generic.
//!
//! # Architecture
//!
//! [`ImplementationGenerator`] is stateless apart from a [`MetadataCache`] of parsed interfaces
//! and its [`GeneratorConfig`]. Every [`ImplementationGenerator::generate`] call runs a fresh
//! session owning the class writer and all traversal state, so one generator can serve many
//! requests, including concurrently through [`ImplementationGenerator::generate_all`].
//!
//! # Override Resolution
//!
//! When a super-interface redeclares a method already implemented:
//!
//! - the same `name + descriptor` is skipped (first declaration wins), after checking that
//!   unrelated interfaces do not attach conflicting generic contracts to it;
//! - a generic declaration that erases to an implemented method's parameters under the
//!   interface's type arguments is a **generic override**. It is suppressed, or emitted as a
//!   bridge with [`GeneratorConfig::emit_bridges`];
//! - a declaration differing only in its return type is a **plain override** and is reported
//!   to the hook as owned by the target interface.
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{InterfaceBuilder, MemoryClassSource};
//! use classforge::generator::{GeneratorConfig, ImplementationGenerator, MethodKind, TargetInterface};
//!
//! let source = MemoryClassSource::new()
//!     .with("demo/Shape", InterfaceBuilder::new("demo/Shape").method("area", "()D").build()?)
//!     .with(
//!         "demo/NamedShape",
//!         InterfaceBuilder::new("demo/NamedShape")
//!             .extends("demo/Shape")
//!             .method("name", "()Ljava/lang/String;")
//!             .build()?,
//!     );
//!
//! let generator = ImplementationGenerator::new(&source, GeneratorConfig::default());
//! let class = generator.generate(&TargetInterface::new("demo/NamedShape"), "demo/NamedShapeImpl")?;
//!
//! assert_eq!(class.implemented.len(), 3);
//! assert_eq!(class.method("area", "()D").map(|m| m.owner.as_str()), Some("demo/Shape"));
//! assert_eq!(class.implemented[0].kind, MethodKind::Constructor);
//! # Ok::<(), classforge::Error>(())
//! ```

mod config;
mod hook;
mod report;
mod session;

pub use config::{AmbiguityPolicy, DispatchHook, GeneratorConfig, DISPATCH_DESCRIPTOR};
pub use report::{Diagnostic, GeneratedClass, ImplementedMethod, MethodKind};

use rayon::prelude::*;

use crate::{
    classfile::{ClassSource, MetadataCache},
    generator::session::GenerationSession,
    Error, Result,
};

/// The interface to implement, optionally parameterised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetInterface {
    /// Internal name of the interface
    pub name: String,
    /// Type argument signatures (`Ljava/lang/String;`), empty for a raw or non-generic target
    pub type_arguments: Vec<String>,
}

impl TargetInterface {
    /// A raw or non-generic target.
    #[must_use]
    pub fn new(name: &str) -> Self {
        TargetInterface {
            name: name.replace('.', "/"),
            type_arguments: Vec::new(),
        }
    }

    /// Adds a type argument.
    #[must_use]
    pub fn with_argument(mut self, signature: &str) -> Self {
        self.type_arguments.push(signature.to_string());
        self
    }
}

impl From<&str> for TargetInterface {
    fn from(name: &str) -> Self {
        TargetInterface::new(name)
    }
}

/// Generator of forwarding implementations for interfaces.
pub struct ImplementationGenerator<S> {
    cache: MetadataCache<S>,
    config: GeneratorConfig,
}

impl<S: ClassSource> ImplementationGenerator<S> {
    /// Creates a generator resolving interfaces through `source`.
    pub fn new(source: S, config: GeneratorConfig) -> Self {
        ImplementationGenerator {
            cache: MetadataCache::new(source),
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The metadata cache shared by all requests of this generator.
    pub fn cache(&self) -> &MetadataCache<S> {
        &self.cache
    }

    /// Generates the class `name` implementing `target`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if `name` is not a valid internal name
    /// - [`Error::Resolution`] if the target or a super-interface cannot be found
    /// - [`Error::NotAnInterface`] if one of them is a class
    /// - [`Error::Malformed`] if a class file cannot be parsed
    /// - [`Error::AmbiguousOverride`] under [`AmbiguityPolicy::Error`]
    /// - [`Error::RecursionLimit`] if the interface graph is deeper than
    ///   [`GeneratorConfig::max_depth`]
    /// - [`Error::InvalidSignature`] or [`Error::LimitExceeded`] for unusable declarations
    ///
    /// No bytes are produced on failure.
    pub fn generate(&self, target: &TargetInterface, name: &str) -> Result<GeneratedClass> {
        let name = validate_name(name)?;
        GenerationSession::run(&self.cache, &self.config, target, &name)
    }

    /// Generates several classes in parallel; results are in request order.
    pub fn generate_all(&self, requests: &[(TargetInterface, String)]) -> Vec<Result<GeneratedClass>> {
        requests
            .par_iter()
            .map(|(target, name)| self.generate(target, name))
            .collect()
    }
}

/// Generates several classes in parallel with a generator over `source`.
///
/// # Examples
///
/// ```rust
/// use classforge::classfile::{InterfaceBuilder, MemoryClassSource};
/// use classforge::generator::{generate_all, GeneratorConfig, TargetInterface};
///
/// let source = MemoryClassSource::new()
///     .with("demo/Task", InterfaceBuilder::new("demo/Task").method("run", "()V").build()?);
/// let requests = vec![
///     (TargetInterface::new("demo/Task"), "demo/TaskA".to_string()),
///     (TargetInterface::new("demo/Task"), "demo/TaskB".to_string()),
/// ];
///
/// let results = generate_all(&source, &GeneratorConfig::default(), &requests);
/// assert!(results.iter().all(Result::is_ok));
/// # Ok::<(), classforge::Error>(())
/// ```
pub fn generate_all<S: ClassSource>(
    source: &S,
    config: &GeneratorConfig,
    requests: &[(TargetInterface, String)],
) -> Vec<Result<GeneratedClass>> {
    ImplementationGenerator::new(source, config.clone()).generate_all(requests)
}

/// Normalises a class name to internal form and validates it.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] for empty names, empty package segments, or segments
/// containing `;`, `[`, `<`, or `>`.
pub fn validate_name(name: &str) -> Result<String> {
    let internal = name.replace('.', "/");
    let valid = !internal.is_empty()
        && internal
            .split('/')
            .all(|segment| !segment.is_empty() && !segment.contains([';', '[', '<', '>']));
    if valid {
        Ok(internal)
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::{ClassMetadataReader, InterfaceBuilder, MemoryClassSource, MethodAccessFlags},
        test::{conflicting_generics, covariant_generic, diamond, named_shape},
    };

    fn keys(class: &GeneratedClass) -> Vec<String> {
        class.implemented.iter().map(ImplementedMethod::key).collect()
    }

    #[test]
    fn test_named_shape_forwards_to_declaring_interfaces() {
        let generator = ImplementationGenerator::new(named_shape(), GeneratorConfig::default());
        let class = generator
            .generate(&TargetInterface::new("demo/NamedShape"), "demo/NamedShapeImpl")
            .unwrap();

        assert_eq!(keys(&class), vec!["<init>()V", "area()D", "name()Ljava/lang/String;"]);
        assert_eq!(class.implemented[1].owner, "demo/Shape");
        assert_eq!(class.implemented[2].owner, "demo/Named");
        assert!(class.diagnostics.is_empty());

        let metadata = ClassMetadataReader::parse(&class.bytes).unwrap();
        assert_eq!(metadata.name, "demo/NamedShapeImpl");
        assert_eq!(metadata.interfaces, vec!["demo/NamedShape"]);
        assert_eq!(metadata.signature, None);
    }

    #[test]
    fn test_diamond_is_implemented_once() {
        let generator = ImplementationGenerator::new(diamond(), GeneratorConfig::default());
        let class = generator
            .generate(&TargetInterface::new("demo/D"), "demo/DImpl")
            .unwrap();

        assert_eq!(keys(&class), vec!["<init>()V", "b(I)I", "r()V"]);
        assert_eq!(class.method("r", "()V").unwrap().owner, "demo/A");
    }

    #[test]
    fn test_covariant_generic_override_keeps_narrow_descriptor() {
        let generator = ImplementationGenerator::new(covariant_generic(), GeneratorConfig::default());
        let class = generator
            .generate(&TargetInterface::new("demo/Sub"), "demo/SubImpl")
            .unwrap();

        let m: Vec<_> = class.methods_named("m").collect();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].descriptor, "(Ljava/lang/String;)Ljava/lang/String;");
        assert_eq!(m[0].kind, MethodKind::Forward);
    }

    #[test]
    fn test_covariant_generic_override_with_bridges() {
        let generator =
            ImplementationGenerator::new(covariant_generic(), GeneratorConfig::with_bridges());
        let class = generator
            .generate(&TargetInterface::new("demo/Sub"), "demo/SubImpl")
            .unwrap();

        let bridge = class
            .method("m", "(Ljava/lang/Object;)Ljava/lang/Object;")
            .unwrap();
        assert_eq!(bridge.kind, MethodKind::Bridge);
        assert_eq!(bridge.owner, "demo/Sub");
        assert_eq!(bridge.generic_signature, None);

        let metadata = ClassMetadataReader::parse(&class.bytes).unwrap();
        let access = metadata.methods[2].access;
        assert!(access.contains(MethodAccessFlags::BRIDGE | MethodAccessFlags::SYNTHETIC));
    }

    #[test]
    fn test_conflicting_contracts_fail_by_default() {
        let generator = ImplementationGenerator::new(conflicting_generics(), GeneratorConfig::strict());
        match generator.generate(&TargetInterface::new("demo/Both"), "demo/BothImpl") {
            Err(Error::AmbiguousOverride {
                name,
                first,
                second,
                ..
            }) => {
                assert_eq!(name, "accept");
                assert_eq!(first, "demo/Left");
                assert_eq!(second, "demo/Right");
            }
            other => panic!("expected an ambiguous override, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_contracts_are_reported_when_lenient() {
        let generator =
            ImplementationGenerator::new(conflicting_generics(), GeneratorConfig::lenient());
        let class = generator
            .generate(&TargetInterface::new("demo/Both"), "demo/BothImpl")
            .unwrap();

        assert_eq!(class.methods_named("accept").count(), 1);
        assert_eq!(
            class.diagnostics,
            vec![Diagnostic::AmbiguousOverride {
                name: "accept".to_string(),
                descriptor: "(Ljava/lang/Object;)V".to_string(),
                kept: "demo/Left".to_string(),
                ignored: "demo/Right".to_string(),
            }]
        );
    }

    #[test]
    fn test_recursion_limit() {
        let source = MemoryClassSource::new()
            .with("demo/A", InterfaceBuilder::new("demo/A").extends("demo/B").build().unwrap())
            .with("demo/B", InterfaceBuilder::new("demo/B").extends("demo/C").build().unwrap())
            .with("demo/C", InterfaceBuilder::new("demo/C").build().unwrap());
        let config = GeneratorConfig {
            max_depth: 1,
            ..GeneratorConfig::default()
        };
        let generator = ImplementationGenerator::new(source, config);

        assert!(matches!(
            generator.generate(&TargetInterface::new("demo/A"), "demo/AImpl"),
            Err(Error::RecursionLimit(1))
        ));
    }

    #[test]
    fn test_cyclic_graphs_terminate() {
        let source = MemoryClassSource::new()
            .with(
                "demo/Ping",
                InterfaceBuilder::new("demo/Ping").extends("demo/Pong").method("ping", "()V").build().unwrap(),
            )
            .with(
                "demo/Pong",
                InterfaceBuilder::new("demo/Pong").extends("demo/Ping").method("pong", "()V").build().unwrap(),
            );
        let generator = ImplementationGenerator::new(source, GeneratorConfig::default());
        let class = generator
            .generate(&TargetInterface::new("demo/Ping"), "demo/PingImpl")
            .unwrap();
        assert_eq!(keys(&class), vec!["<init>()V", "ping()V", "pong()V"]);
    }

    #[test]
    fn test_names_are_normalised() {
        assert_eq!(validate_name("org.example.Impl").unwrap(), "org/example/Impl");
        assert_eq!(validate_name("Impl$1").unwrap(), "Impl$1");
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a//b", "/a", "a.", "a;b", "[I", "List<T>"] {
            assert!(matches!(validate_name(name), Err(Error::InvalidName(_))), "{name}");
        }
    }

    #[test]
    fn test_target_builder() {
        let target = TargetInterface::from("java.util.function.Function")
            .with_argument("Ljava/lang/String;")
            .with_argument("Ljava/lang/Integer;");
        assert_eq!(target.name, "java/util/function/Function");
        assert_eq!(target.type_arguments.len(), 2);
    }
}
