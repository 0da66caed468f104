//! One generation request.
//!
//! A [`GenerationSession`] holds every piece of mutable state a request needs: the class
//! writer (and with it the symbol table), the methods implemented so far, the interfaces
//! already expanded, and the worklist of interfaces still to visit. Nothing in it is shared,
//! so sessions for different requests never coordinate.
//!
//! # Traversal
//!
//! The target interface is expanded first, then its super-interfaces depth-first and
//! left-to-right. Each interface is expanded at most once, which also terminates cyclic graphs
//! found in malformed input. Within an interface, methods are visited in declaration order and
//! the first declaration of every `name + descriptor` wins.
//!
//! Each interface is visited with the type arguments it was reached with ([`TypeBindings`]),
//! derived from the class signature of the interface that extends it. These bindings decide
//! whether a generic declaration is really a broader form of a method already implemented.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    classfile::{
        parameters_prefix, ClassAccessFlags, ClassMetadataRc, ClassSignature, ClassSource,
        ClassTypeSignature, ClassWriter, MetadataCache, MethodAccessFlags, MethodDescriptor,
        MethodInfo, MethodSignature, ReturnType, TypeArgument, TypeBindings, TypeParameter, TypeSignature,
    },
    generator::{
        config::{AmbiguityPolicy, GeneratorConfig},
        hook::{emit_forwarding_body, DispatchCall},
        report::{Diagnostic, GeneratedClass, ImplementedMethod, MethodKind},
        TargetInterface,
    },
    Error, Result,
};

const OBJECT: &str = "java/lang/Object";

/// Direct supertypes of platform classes commonly used as covariant return types, consulted
/// when they are not on the class path.
const PLATFORM_SUPERTYPES: &[(&str, &[&str])] = &[
    (
        "java/lang/String",
        &["java/lang/CharSequence", "java/lang/Comparable", "java/io/Serializable"],
    ),
    ("java/lang/StringBuilder", &["java/lang/CharSequence", "java/io/Serializable"]),
    ("java/lang/Integer", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Long", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Short", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Byte", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Double", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Float", &["java/lang/Number", "java/lang/Comparable"]),
    ("java/lang/Number", &["java/io/Serializable"]),
    ("java/lang/Boolean", &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/lang/Character", &["java/io/Serializable", "java/lang/Comparable"]),
    ("java/util/ArrayList", &["java/util/AbstractList", "java/util/List"]),
    ("java/util/AbstractList", &["java/util/AbstractCollection", "java/util/List"]),
    ("java/util/AbstractCollection", &["java/util/Collection"]),
    ("java/util/List", &["java/util/Collection"]),
    ("java/util/Set", &["java/util/Collection"]),
    ("java/util/Collection", &["java/lang/Iterable"]),
];

/// An interface waiting on the worklist.
struct Frame {
    metadata: ClassMetadataRc,
    bindings: TypeBindings,
    depth: usize,
}

/// A `name + descriptor` that has been implemented or deliberately suppressed.
struct VisitedMethod {
    /// Interface whose declaration claimed the key
    interface: String,
    name: String,
    descriptor: String,
    /// Generic contract under the declaring interface's bindings
    resolved: Option<MethodSignature>,
}

/// Mutable state of a single generation request.
pub(crate) struct GenerationSession<'g, S> {
    cache: &'g MetadataCache<S>,
    config: &'g GeneratorConfig,
    /// Internal name of the target interface
    target: String,
    writer: ClassWriter,
    visited: Vec<VisitedMethod>,
    visited_keys: FxHashMap<String, usize>,
    expanded: FxHashSet<String>,
    /// Transitive super-interfaces, computed on demand for ambiguity checks
    ancestors: FxHashMap<String, FxHashSet<String>>,
    implemented: Vec<ImplementedMethod>,
    diagnostics: Vec<Diagnostic>,
}

impl<'g, S: ClassSource> GenerationSession<'g, S> {
    /// Runs a complete request: resolves the target, emits the class, and returns it.
    ///
    /// `name` must already be a validated internal name.
    pub(crate) fn run(
        cache: &'g MetadataCache<S>,
        config: &'g GeneratorConfig,
        target: &TargetInterface,
        name: &str,
    ) -> Result<GeneratedClass> {
        let metadata = cache.metadata(&target.name)?;
        ensure_interface(&metadata)?;

        let arguments = target
            .type_arguments
            .iter()
            .map(|argument| reference_argument(argument))
            .collect::<Result<Vec<_>>>()?;
        let parameters = metadata
            .class_signature()?
            .map(|signature| signature.type_parameters)
            .unwrap_or_default();
        let bindings = TypeBindings::bind(&parameters, &arguments)?;

        let signature = implementation_signature(&metadata.name, &parameters, &arguments);
        let version = config.class_version.unwrap_or(metadata.version);
        let writer = ClassWriter::new(
            version,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL | ClassAccessFlags::SUPER,
            name,
            signature.as_deref(),
            Some(OBJECT),
            &[metadata.name.as_str()],
        )?;

        log::debug!("Generating {} implementing {}", name, metadata.name);

        let mut session = GenerationSession {
            cache,
            config,
            target: metadata.name.clone(),
            writer,
            visited: Vec::new(),
            visited_keys: FxHashMap::default(),
            expanded: FxHashSet::default(),
            ancestors: FxHashMap::default(),
            implemented: Vec::new(),
            diagnostics: Vec::new(),
        };

        session.emit_constructor(name)?;
        session.traverse(Frame {
            metadata,
            bindings,
            depth: 0,
        })?;
        session.finish(name)
    }

    fn emit_constructor(&mut self, name: &str) -> Result<()> {
        let mut init = self
            .writer
            .begin_method(MethodAccessFlags::PUBLIC, "<init>", "()V", None, &[])?;
        init.aload(0)?
            .invokespecial(OBJECT, "<init>", "()V", false)?
            .return_value(&ReturnType::Void)?;
        init.end()?;

        self.implemented.push(ImplementedMethod {
            owner: name.to_string(),
            name: "<init>".to_string(),
            descriptor: "()V".to_string(),
            generic_signature: None,
            kind: MethodKind::Constructor,
        });
        Ok(())
    }

    fn traverse(&mut self, root: Frame) -> Result<()> {
        let mut worklist = vec![root];

        while let Some(frame) = worklist.pop() {
            if !self.expanded.insert(frame.metadata.name.clone()) {
                log::trace!("{} already expanded", frame.metadata.name);
                continue;
            }
            if frame.depth > self.config.max_depth {
                return Err(Error::RecursionLimit(self.config.max_depth));
            }

            log::debug!(
                "Expanding {} ({} methods, depth {})",
                frame.metadata.name,
                frame.metadata.methods.len(),
                frame.depth
            );
            for method in &frame.metadata.methods {
                self.visit_method(&frame, method)?;
            }

            let class_signature = frame.metadata.class_signature()?;
            // Reversed so the leftmost super-interface is popped first
            for interface in frame.metadata.interfaces.iter().rev() {
                let metadata = self.cache.metadata(interface)?;
                ensure_interface(&metadata)?;
                let bindings =
                    inherited_bindings(&frame.bindings, class_signature.as_ref(), &metadata)?;
                worklist.push(Frame {
                    metadata,
                    bindings,
                    depth: frame.depth + 1,
                });
            }
        }
        Ok(())
    }

    fn visit_method(&mut self, frame: &Frame, method: &MethodInfo) -> Result<()> {
        if method.is_static() || method.access.is_private() || method.name == "<clinit>" {
            log::trace!("Skipping {}.{}{}", method.owner, method.name, method.descriptor);
            return Ok(());
        }

        let interface = frame.metadata.name.as_str();
        let key = method.key();
        let signature = method
            .signature
            .as_deref()
            .map(MethodSignature::parse)
            .transpose()?;
        let resolved = signature
            .as_ref()
            .map(|signature| frame.bindings.resolve_method(signature));

        if let Some(&position) = self.visited_keys.get(&key) {
            return self.check_ambiguity(position, interface, method, resolved);
        }

        // Compiler-generated bridges forward to a narrower declaration of the same interface
        if method.access.contains(MethodAccessFlags::BRIDGE) {
            if let Some(bridged) = bridged_method(&frame.metadata.methods, method) {
                self.generic_override(method, &bridged.key())?;
                self.record(interface, method, None);
                return Ok(());
            }
        }

        if let Some(signature) = &signature {
            let erased = frame.bindings.erase_method(signature).parameters_descriptor();
            let narrower = self.find_visited(interface, &method.name, |descriptor| {
                parameters_prefix(descriptor) == Some(erased.as_str())
            });
            if let Some(narrower) = narrower {
                self.generic_override(method, &narrower)?;
                self.record(interface, method, resolved);
                return Ok(());
            }
        }

        let overrides = self
            .find_visited(interface, &method.name, |descriptor| {
                parameters_prefix(descriptor) == parameters_prefix(&method.descriptor)
            })
            .is_some();
        let (owner, kind) = if overrides {
            (self.target.clone(), MethodKind::Override)
        } else {
            (interface.to_string(), MethodKind::Forward)
        };

        // Only the target's own declarations carry their throws clause over
        let exceptions: &[String] = if interface == self.target {
            &method.exceptions
        } else {
            &[]
        };
        let call = DispatchCall {
            access: method.access.bits(),
            owner: &owner,
            key: &key,
            signature: method.signature.as_deref(),
        };
        self.emit(
            MethodAccessFlags::PUBLIC,
            &method.name,
            &method.descriptor,
            method.signature.as_deref(),
            exceptions,
            &call,
        )?;
        log::debug!("{} {}.{}{}", kind, owner, method.name, method.descriptor);

        self.implemented.push(ImplementedMethod {
            owner,
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            generic_signature: method.signature.clone(),
            kind,
        });
        self.record(interface, method, resolved);
        Ok(())
    }

    /// Handles a generic declaration whose erasure under the current bindings matches a method
    /// already implemented with a narrower descriptor.
    fn generic_override(&mut self, method: &MethodInfo, narrower: &str) -> Result<()> {
        if !self.config.emit_bridges {
            log::debug!(
                "Suppressing {}.{}{}, overridden by {}",
                method.owner,
                method.name,
                method.descriptor,
                narrower
            );
            return Ok(());
        }

        let target = self.target.clone();
        let call = DispatchCall {
            access: method.access.bits(),
            owner: &target,
            key: narrower,
            signature: None,
        };
        self.emit(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::BRIDGE | MethodAccessFlags::SYNTHETIC,
            &method.name,
            &method.descriptor,
            None,
            &[],
            &call,
        )?;
        log::debug!("Bridge {}{} -> {}", method.name, method.descriptor, narrower);

        self.implemented.push(ImplementedMethod {
            owner: target,
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            generic_signature: None,
            kind: MethodKind::Bridge,
        });
        Ok(())
    }

    fn check_ambiguity(
        &mut self,
        position: usize,
        interface: &str,
        method: &MethodInfo,
        resolved: Option<MethodSignature>,
    ) -> Result<()> {
        let prior = &self.visited[position];
        let (Some(kept), Some(candidate)) = (prior.resolved.clone(), resolved) else {
            log::trace!("{} already implemented", method.key());
            return Ok(());
        };
        if kept == candidate || prior.interface == interface {
            log::trace!("{} already implemented", method.key());
            return Ok(());
        }

        let first = prior.interface.clone();
        if self.is_ancestor(&first, interface)? || self.is_ancestor(interface, &first)? {
            log::trace!("{} refined along {} -> {}", method.key(), first, interface);
            return Ok(());
        }

        if let Some(narrower) = self.reconcile(&kept, &candidate) {
            log::debug!(
                "{} from {} and {} reconciled by a covariant return",
                method.key(),
                first,
                interface
            );
            if narrower {
                self.visited[position].resolved = Some(candidate);
            }
            return Ok(());
        }

        match self.config.ambiguity {
            AmbiguityPolicy::Error => Err(Error::AmbiguousOverride {
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
                first,
                second: interface.to_string(),
            }),
            AmbiguityPolicy::Warn => {
                log::warn!(
                    "Ambiguous override of {}{} between {} and {}; keeping {}",
                    method.name,
                    method.descriptor,
                    first,
                    interface,
                    first
                );
                self.diagnostics.push(Diagnostic::AmbiguousOverride {
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                    kept: first,
                    ignored: interface.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Checks whether two contracts with equal parameters differ only by return types where
    /// one is assignable to the other.
    ///
    /// Returns `Some(true)` when `candidate` has the narrower return, `Some(false)` when `kept`
    /// does, and `None` when the contracts cannot be reconciled.
    fn reconcile(&self, kept: &MethodSignature, candidate: &MethodSignature) -> Option<bool> {
        if kept.type_parameters != candidate.type_parameters
            || kept.parameters != candidate.parameters
        {
            return None;
        }
        let (Some(kept), Some(candidate)) = (&kept.result, &candidate.result) else {
            return None;
        };

        if self.is_assignable(candidate, kept) {
            Some(true)
        } else if self.is_assignable(kept, candidate) {
            Some(false)
        } else {
            None
        }
    }

    /// Returns `true` if a value of type `from` can be returned where `to` is expected.
    ///
    /// Parameterized targets only accept the identical type. Classes missing from the class
    /// path, other than a few core platform types, are never assignable.
    fn is_assignable(&self, from: &TypeSignature, to: &TypeSignature) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (TypeSignature::Array(from), TypeSignature::Array(to)) => {
                !matches!(**from, TypeSignature::Base(_)) && self.is_assignable(from, to)
            }
            (TypeSignature::Class(_) | TypeSignature::Array(_), TypeSignature::Class(to))
                if to.erased_name() == OBJECT =>
            {
                true
            }
            (TypeSignature::Array(_), TypeSignature::Class(to)) => matches!(
                to.erased_name().as_str(),
                "java/lang/Cloneable" | "java/io/Serializable"
            ),
            (TypeSignature::Class(from), TypeSignature::Class(to))
                if to.segments.iter().all(|segment| segment.type_arguments.is_empty()) =>
            {
                self.is_subtype(&from.erased_name(), &to.erased_name())
            }
            _ => false,
        }
    }

    /// Walks superclasses and super-interfaces of `class` looking for `ancestor`.
    fn is_subtype(&self, class: &str, ancestor: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut pending = vec![class.to_string()];

        while let Some(name) = pending.pop() {
            if name == ancestor {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            match self.cache.metadata(&name) {
                Ok(metadata) => {
                    pending.extend(metadata.super_name.iter().cloned());
                    pending.extend(metadata.interfaces.iter().cloned());
                }
                Err(_) => {
                    let supertypes = PLATFORM_SUPERTYPES
                        .iter()
                        .find(|(platform, _)| *platform == name)
                        .map_or(&[][..], |(_, supertypes)| *supertypes);
                    pending.extend(supertypes.iter().map(|name| (*name).to_string()));
                }
            }
        }
        false
    }

    /// Returns `true` if `ancestor` is a transitive super-interface of `descendant`.
    fn is_ancestor(&mut self, descendant: &str, ancestor: &str) -> Result<bool> {
        if !self.ancestors.contains_key(descendant) {
            let mut reachable = FxHashSet::default();
            let mut pending = self.cache.metadata(descendant)?.interfaces.clone();
            while let Some(name) = pending.pop() {
                if reachable.insert(name.clone()) {
                    pending.extend(self.cache.metadata(&name)?.interfaces.iter().cloned());
                }
            }
            self.ancestors.insert(descendant.to_string(), reachable);
        }
        Ok(self
            .ancestors
            .get(descendant)
            .is_some_and(|reachable| reachable.contains(ancestor)))
    }

    /// First method with `name` visited in an interface other than `interface` whose
    /// descriptor satisfies `matches`, as its `name + descriptor` key.
    fn find_visited(
        &self,
        interface: &str,
        name: &str,
        matches: impl Fn(&str) -> bool,
    ) -> Option<String> {
        self.visited
            .iter()
            .find(|visited| {
                visited.interface != interface
                    && visited.name == name
                    && matches(&visited.descriptor)
            })
            .map(|visited| format!("{}{}", visited.name, visited.descriptor))
    }

    fn record(&mut self, interface: &str, method: &MethodInfo, resolved: Option<MethodSignature>) {
        self.visited_keys.insert(method.key(), self.visited.len());
        self.visited.push(VisitedMethod {
            interface: interface.to_string(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            resolved,
        });
    }

    fn emit(
        &mut self,
        access: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
        call: &DispatchCall<'_>,
    ) -> Result<()> {
        let mut method = self
            .writer
            .begin_method(access, name, descriptor, signature, exceptions)?;
        emit_forwarding_body(&mut method, &self.config.hook, call)?;
        method.end()
    }

    fn finish(self, name: &str) -> Result<GeneratedClass> {
        log::trace!(
            "{} uses {} constant pool slots",
            name,
            self.writer.symbols().constant_pool_count()
        );
        Ok(GeneratedClass {
            name: name.to_string(),
            bytes: self.writer.finish()?,
            implemented: self.implemented,
            diagnostics: self.diagnostics,
        })
    }
}

/// The declaration a compiler-generated bridge forwards to: a non-bridge instance method of
/// the same interface with the same name and parameter count but a different descriptor.
fn bridged_method<'m>(methods: &'m [MethodInfo], bridge: &MethodInfo) -> Option<&'m MethodInfo> {
    let arity = parameter_count(&bridge.descriptor)?;
    methods.iter().find(|method| {
        method.name == bridge.name
            && method.descriptor != bridge.descriptor
            && !method.access.contains(MethodAccessFlags::BRIDGE)
            && !method.is_static()
            && !method.access.is_private()
            && parameter_count(&method.descriptor) == Some(arity)
    })
}

fn parameter_count(descriptor: &str) -> Option<usize> {
    MethodDescriptor::parse(descriptor)
        .ok()
        .map(|descriptor| descriptor.parameters().len())
}

fn ensure_interface(metadata: &ClassMetadataRc) -> Result<()> {
    if metadata.is_interface() {
        Ok(())
    } else {
        Err(Error::NotAnInterface(metadata.name.clone()))
    }
}

/// Parses a type argument of the target; primitives cannot be type arguments.
fn reference_argument(argument: &str) -> Result<TypeSignature> {
    match TypeSignature::parse(argument)? {
        TypeSignature::Base(_) => Err(Error::InvalidSignature(format!(
            "{argument} is not a reference type argument"
        ))),
        signature => Ok(signature),
    }
}

/// Bindings for `child` as reached from an interface with `parent` bindings and class
/// signature.
fn inherited_bindings(
    parent: &TypeBindings,
    parent_signature: Option<&ClassSignature>,
    child: &ClassMetadataRc,
) -> Result<TypeBindings> {
    let parameters = child
        .class_signature()?
        .map(|signature| signature.type_parameters)
        .unwrap_or_default();
    let arguments: Vec<TypeSignature> = parent_signature
        .and_then(|signature| signature.interface(&child.name))
        .map(|reference| {
            reference
                .type_arguments()
                .iter()
                .map(|argument| parent.substitute(&capture(argument)))
                .collect()
        })
        .unwrap_or_default();

    Ok(TypeBindings::bind(&parameters, &arguments)?.within(parent))
}

/// The type a wildcard stands for when only erasure and contract comparison matter.
fn capture(argument: &TypeArgument) -> TypeSignature {
    match argument {
        TypeArgument::Exact(signature) | TypeArgument::Extends(signature) => signature.clone(),
        TypeArgument::Unbounded | TypeArgument::Super(_) => {
            TypeSignature::Class(ClassTypeSignature::new(OBJECT, Vec::new()))
        }
    }
}

/// Class signature of the generated class, present only for generic targets.
fn implementation_signature(
    target: &str,
    parameters: &[TypeParameter],
    arguments: &[TypeSignature],
) -> Option<String> {
    if parameters.is_empty() {
        return None;
    }

    let (type_parameters, type_arguments) = if arguments.is_empty() {
        let variables = parameters
            .iter()
            .map(|parameter| {
                TypeArgument::Exact(TypeSignature::TypeVariable(parameter.name.clone()))
            })
            .collect();
        (parameters.to_vec(), variables)
    } else {
        let exact = arguments.iter().cloned().map(TypeArgument::Exact).collect();
        (Vec::new(), exact)
    };

    let signature = ClassSignature {
        type_parameters,
        superclass: ClassTypeSignature::new(OBJECT, Vec::new()),
        interfaces: vec![ClassTypeSignature::new(target, type_arguments)],
    };
    Some(signature.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implementation_signature_redeclares_formals() {
        let class = ClassSignature::parse(
            "<K:Ljava/lang/Object;V::Ljava/lang/Comparable<TV;>;>Ljava/lang/Object;",
        )
        .unwrap();
        assert_eq!(
            implementation_signature("demo/Store", &class.type_parameters, &[]).as_deref(),
            Some("<K:Ljava/lang/Object;V::Ljava/lang/Comparable<TV;>;>Ljava/lang/Object;Ldemo/Store<TK;TV;>;")
        );

        let arguments = [
            TypeSignature::parse("Ljava/lang/String;").unwrap(),
            TypeSignature::parse("Ljava/lang/Integer;").unwrap(),
        ];
        assert_eq!(
            implementation_signature("demo/Store", &class.type_parameters, &arguments).as_deref(),
            Some("Ljava/lang/Object;Ldemo/Store<Ljava/lang/String;Ljava/lang/Integer;>;")
        );

        assert_eq!(implementation_signature("demo/Plain", &[], &[]), None);
    }

    #[test]
    fn test_wildcards_capture_to_their_bound() {
        let number = TypeSignature::parse("Ljava/lang/Number;").unwrap();
        assert_eq!(capture(&TypeArgument::Extends(number.clone())), number);
        assert_eq!(capture(&TypeArgument::Super(number)).to_string(), "Ljava/lang/Object;");
        assert_eq!(capture(&TypeArgument::Unbounded).to_string(), "Ljava/lang/Object;");
    }

    #[test]
    fn test_bridged_method_lookup() {
        let method = |name: &str, descriptor: &str, access: MethodAccessFlags| MethodInfo {
            owner: "demo/Sub".to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            access,
            exceptions: Vec::new(),
        };
        let bridge_flags =
            MethodAccessFlags::PUBLIC | MethodAccessFlags::BRIDGE | MethodAccessFlags::SYNTHETIC;
        let abstract_flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT;
        let static_flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        let methods = vec![
            method("put", "()V", abstract_flags),
            method("put", "(Ljava/lang/String;)V", static_flags),
            method("put", "(Ljava/lang/String;)V", abstract_flags),
            method("put", "(Ljava/lang/Object;)V", bridge_flags),
        ];

        let bridged = bridged_method(&methods, &methods[3]).unwrap();
        assert_eq!(bridged.key(), "put(Ljava/lang/String;)V");
        assert!(!bridged.is_static());

        let lonely = method("get", "()Ljava/lang/Object;", bridge_flags);
        assert!(bridged_method(&methods, &lonely).is_none());
    }

    #[test]
    fn test_primitive_type_arguments_are_rejected() {
        assert!(matches!(reference_argument("I"), Err(Error::InvalidSignature(_))));
        assert!(reference_argument("[I").is_ok());
        assert!(reference_argument("TT;").is_ok());
    }
}
