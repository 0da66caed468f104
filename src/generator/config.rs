//! Generator configuration
//!
//! [`GeneratorConfig`] controls what the dispatch hook is, how conflicting generic contracts are
//! treated, whether bridge methods are emitted for suppressed covariant declarations, and the
//! limits applied while walking an interface graph.

use crate::classfile::ClassVersion;

/// Descriptor of the static dispatch method every forwarding body calls.
///
/// Arguments: the receiver, the method's access flags, the owner's internal name,
/// `name + descriptor`, the generic signature (or `null`), and the boxed arguments.
pub const DISPATCH_DESCRIPTOR: &str = "(Ljava/lang/Object;ILjava/lang/String;Ljava/lang/String;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;";

/// The static method generated bodies forward to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchHook {
    /// Internal name of the class declaring the hook
    pub owner: String,
    /// Method name; the descriptor is always [`DISPATCH_DESCRIPTOR`]
    pub name: String,
}

impl DispatchHook {
    /// Creates a hook on `owner.name`.
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        DispatchHook {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
        }
    }
}

impl Default for DispatchHook {
    fn default() -> Self {
        DispatchHook::new("classforge/runtime/Dispatcher", "dispatch")
    }
}

/// What to do when two unrelated super-interfaces declare the same erased method with
/// different generic contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AmbiguityPolicy {
    /// Fail generation with [`crate::Error::AmbiguousOverride`]
    #[default]
    Error,
    /// Log a warning, record a diagnostic, and keep the first declaration
    Warn,
}

/// Configuration for synthetic implementation generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Static method every forwarding body calls
    pub hook: DispatchHook,

    /// Emit synthetic bridges for broader declarations suppressed by a generic override
    /// (default: false)
    pub emit_bridges: bool,

    /// Handling of ambiguous generic contracts (default: fail)
    pub ambiguity: AmbiguityPolicy,

    /// Class file version of the output; `None` uses the target interface's version
    pub class_version: Option<ClassVersion>,

    /// Maximum depth of the super-interface graph below the target (default: 256)
    pub max_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            hook: DispatchHook::default(),
            emit_bridges: false,
            ambiguity: AmbiguityPolicy::Error,
            class_version: None,
            max_depth: 256,
        }
    }
}

impl GeneratorConfig {
    /// Fails on ambiguous contracts and emits no bridges. Same as the default.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Reports ambiguous contracts as diagnostics instead of failing
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            ambiguity: AmbiguityPolicy::Warn,
            ..Self::default()
        }
    }

    /// Emits bridges for suppressed covariant declarations
    #[must_use]
    pub fn with_bridges() -> Self {
        Self {
            emit_bridges: true,
            ..Self::default()
        }
    }

    /// Replaces the dispatch hook.
    #[must_use]
    pub fn hook(mut self, owner: &str, name: &str) -> Self {
        self.hook = DispatchHook::new(owner, name);
        self
    }

    /// Pins the output class file version.
    #[must_use]
    pub fn class_version(mut self, version: ClassVersion) -> Self {
        self.class_version = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_config_presets() {
        let strict = GeneratorConfig::strict();
        assert_eq!(strict, GeneratorConfig::default());
        assert_eq!(strict.ambiguity, AmbiguityPolicy::Error);
        assert!(!strict.emit_bridges);
        assert_eq!(strict.max_depth, 256);

        let lenient = GeneratorConfig::lenient();
        assert_eq!(lenient.ambiguity, AmbiguityPolicy::Warn);
        assert!(!lenient.emit_bridges);

        let bridges = GeneratorConfig::with_bridges();
        assert!(bridges.emit_bridges);
        assert_eq!(bridges.ambiguity, AmbiguityPolicy::Error);
    }

    #[test]
    fn test_hook_normalises_owner() {
        let config = GeneratorConfig::default()
            .hook("org.example.Mocks", "invoke")
            .class_version(ClassVersion::V11);
        assert_eq!(config.hook.owner, "org/example/Mocks");
        assert_eq!(config.hook.name, "invoke");
        assert_eq!(config.class_version, Some(ClassVersion::V11));
    }
}
