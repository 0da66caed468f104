//! Results of a generation request.

use std::fmt;

use strum::Display;

/// How a method of the generated class came to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MethodKind {
    /// The no-argument constructor
    Constructor,
    /// Forwarding implementation of an interface method, owned by its declaring interface
    Forward,
    /// Forwarding implementation of an overridden declaration, owned by the target interface
    Override,
    /// Synthetic bridge for a broader declaration, dispatching with the narrower descriptor
    Bridge,
}

/// One method of the generated class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementedMethod {
    /// Owner reported to the dispatch hook
    pub owner: String,
    /// Method name
    pub name: String,
    /// Descriptor of the emitted method
    pub descriptor: String,
    /// Generic signature attached to the emitted method
    pub generic_signature: Option<String>,
    /// Why the method exists
    pub kind: MethodKind,
}

impl ImplementedMethod {
    /// The `name + descriptor` key of the method.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

impl fmt::Display for ImplementedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}{}", self.kind, self.owner, self.name, self.descriptor)
    }
}

/// A non-fatal finding recorded while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Two unrelated interfaces declare `name + descriptor` with different generic contracts;
    /// the declaration from `kept` was implemented and the one from `ignored` skipped.
    AmbiguousOverride {
        /// Method name
        name: String,
        /// Erased descriptor shared by both declarations
        descriptor: String,
        /// Interface whose declaration was implemented
        kept: String,
        /// Interface whose declaration was skipped
        ignored: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousOverride {
                name,
                descriptor,
                kept,
                ignored,
            } => write!(
                f,
                "ambiguous override of {name}{descriptor}: kept {kept}, ignored {ignored}"
            ),
        }
    }
}

/// A generated class and what went into it.
#[derive(Debug, Clone)]
pub struct GeneratedClass {
    /// Internal name of the generated class
    pub name: String,
    /// The class file
    pub bytes: Vec<u8>,
    /// Emitted methods in class file order
    pub implemented: Vec<ImplementedMethod>,
    /// Non-fatal findings
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedClass {
    /// Looks up an emitted method by name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&ImplementedMethod> {
        self.implemented
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    /// All emitted methods with the given name.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ImplementedMethod> {
        self.implemented.iter().filter(move |method| method.name == name)
    }
}
