//! Generic signatures (JVMS §4.7.9.1).
//!
//! Descriptors erase generic information; the `Signature` attribute keeps it. This module
//! parses class and method signatures into typed trees, substitutes type variables, and
//! erases signatures back to descriptors.
//!
//! # Key Components
//!
//! - [`TypeSignature`] - A Java type signature: primitive, class type, type variable, or array
//! - [`ClassTypeSignature`] - A possibly parameterised, possibly nested class type
//! - [`MethodSignature`] - Type parameters, parameters, result and throws clauses of a method
//! - [`ClassSignature`] - Type parameters, superclass, and super-interfaces of a class
//! - [`TypeBindings`] - Type variable assignments in effect for one interface
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{ClassSignature, TypeBindings, TypeSignature};
//!
//! let class = ClassSignature::parse("<T:Ljava/lang/Object;>Ljava/lang/Object;")?;
//! let argument = TypeSignature::parse("Ljava/lang/String;")?;
//! let bindings = TypeBindings::bind(&class.type_parameters, &[argument])?;
//!
//! let variable = TypeSignature::parse("TT;")?;
//! assert_eq!(bindings.erase(&variable, &[]).to_string(), "Ljava/lang/String;");
//! # Ok::<(), classforge::Error>(())
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{
    classfile::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType},
    Error, Result,
};

/// A reference or primitive type appearing in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// A primitive type
    Base(BaseType),
    /// A class or interface type
    Class(ClassTypeSignature),
    /// A type variable such as `TT;`
    TypeVariable(String),
    /// An array type
    Array(Box<TypeSignature>),
}

impl TypeSignature {
    /// Parses a single Java type signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] on grammar violations or trailing input.
    pub fn parse(signature: &str) -> Result<Self> {
        let mut parser = SignatureParser::new(signature);
        let result = parser.java_type()?;
        parser.expect_end()?;
        Ok(result)
    }

    /// Returns `true` if a type variable occurs anywhere in this signature.
    #[must_use]
    pub fn has_type_variables(&self) -> bool {
        match self {
            TypeSignature::Base(_) => false,
            TypeSignature::TypeVariable(_) => true,
            TypeSignature::Array(component) => component.has_type_variables(),
            TypeSignature::Class(class) => class.segments.iter().any(|segment| {
                segment
                    .type_arguments
                    .iter()
                    .any(|argument| argument.signature().is_some_and(TypeSignature::has_type_variables))
            }),
        }
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Base(base) => write!(f, "{}", base.descriptor_char()),
            TypeSignature::Class(class) => write!(f, "{class}"),
            TypeSignature::TypeVariable(name) => write!(f, "T{name};"),
            TypeSignature::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// One `Identifier [TypeArguments]` segment of a class type signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleClassType {
    /// The identifier; the first segment carries the package prefix
    pub name: String,
    /// Type arguments applied to this segment
    pub type_arguments: Vec<TypeArgument>,
}

/// A class type signature: `Lpkg/Outer<TA;>.Inner<TB;>;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSignature {
    /// Outermost segment first
    pub segments: Vec<SimpleClassType>,
}

impl ClassTypeSignature {
    /// Creates a non-nested class type with the given arguments.
    #[must_use]
    pub fn new(internal_name: impl Into<String>, type_arguments: Vec<TypeArgument>) -> Self {
        ClassTypeSignature {
            segments: vec![SimpleClassType {
                name: internal_name.into(),
                type_arguments,
            }],
        }
    }

    /// The erased internal name; nested segments are joined with `$`.
    #[must_use]
    pub fn erased_name(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.name.as_str())
            .collect::<Vec<_>>()
            .join("$")
    }

    /// Type arguments of the innermost segment.
    #[must_use]
    pub fn type_arguments(&self) -> &[TypeArgument] {
        self.segments
            .last()
            .map_or(&[][..], |segment| segment.type_arguments.as_slice())
    }
}

impl fmt::Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L")?;
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            if !segment.type_arguments.is_empty() {
                write!(f, "<")?;
                for argument in &segment.type_arguments {
                    write!(f, "{argument}")?;
                }
                write!(f, ">")?;
            }
        }
        write!(f, ";")
    }
}

/// A type argument of a parameterised class type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    /// `*`
    Unbounded,
    /// An exact reference type
    Exact(TypeSignature),
    /// `+` upper-bounded wildcard
    Extends(TypeSignature),
    /// `-` lower-bounded wildcard
    Super(TypeSignature),
}

impl TypeArgument {
    /// The referenced type, if any.
    #[must_use]
    pub fn signature(&self) -> Option<&TypeSignature> {
        match self {
            TypeArgument::Unbounded => None,
            TypeArgument::Exact(signature)
            | TypeArgument::Extends(signature)
            | TypeArgument::Super(signature) => Some(signature),
        }
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Unbounded => write!(f, "*"),
            TypeArgument::Exact(signature) => write!(f, "{signature}"),
            TypeArgument::Extends(signature) => write!(f, "+{signature}"),
            TypeArgument::Super(signature) => write!(f, "-{signature}"),
        }
    }
}

/// A formal type parameter with its bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    /// The type variable name
    pub name: String,
    /// The class bound; absent when only interface bounds are declared
    pub class_bound: Option<TypeSignature>,
    /// Interface bounds in declaration order
    pub interface_bounds: Vec<TypeSignature>,
}

impl TypeParameter {
    /// The bound a variable of this parameter erases to: the class bound, else the first
    /// interface bound.
    #[must_use]
    pub fn leftmost_bound(&self) -> Option<&TypeSignature> {
        self.class_bound
            .as_ref()
            .or_else(|| self.interface_bounds.first())
    }
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if let Some(bound) = &self.class_bound {
            write!(f, "{bound}")?;
        }
        for bound in &self.interface_bounds {
            write!(f, ":{bound}")?;
        }
        Ok(())
    }
}

fn write_type_parameters(f: &mut fmt::Formatter<'_>, parameters: &[TypeParameter]) -> fmt::Result {
    if parameters.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for parameter in parameters {
        write!(f, "{parameter}")?;
    }
    write!(f, ">")
}

/// A parsed method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Method-level type parameters
    pub type_parameters: Vec<TypeParameter>,
    /// Parameter types in declaration order
    pub parameters: Vec<TypeSignature>,
    /// Result type; `None` for `void`
    pub result: Option<TypeSignature>,
    /// Throws clauses
    pub throws: Vec<TypeSignature>,
}

impl MethodSignature {
    /// Parses a method signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] on grammar violations.
    pub fn parse(signature: &str) -> Result<Self> {
        let mut parser = SignatureParser::new(signature);
        let type_parameters = parser.type_parameters()?;

        parser.expect('(')?;
        let mut parameters = Vec::new();
        while parser.peek() != Some(')') {
            parameters.push(parser.java_type()?);
        }
        parser.expect(')')?;

        let result = if parser.peek() == Some('V') {
            parser.bump();
            None
        } else {
            Some(parser.java_type()?)
        };

        let mut throws = Vec::new();
        while parser.peek() == Some('^') {
            parser.bump();
            match parser.peek() {
                Some('L' | 'T') => throws.push(parser.reference_type()?),
                _ => return Err(parser.error("expected class or type variable after '^'")),
            }
        }
        parser.expect_end()?;

        Ok(MethodSignature {
            type_parameters,
            parameters,
            result,
            throws,
        })
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        write!(f, "(")?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        write!(f, ")")?;
        match &self.result {
            Some(result) => write!(f, "{result}")?,
            None => write!(f, "V")?,
        }
        for throws in &self.throws {
            write!(f, "^{throws}")?;
        }
        Ok(())
    }
}

/// A parsed class signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    /// Class-level type parameters
    pub type_parameters: Vec<TypeParameter>,
    /// The superclass
    pub superclass: ClassTypeSignature,
    /// Super-interfaces in declaration order
    pub interfaces: Vec<ClassTypeSignature>,
}

impl ClassSignature {
    /// Parses a class signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] on grammar violations.
    pub fn parse(signature: &str) -> Result<Self> {
        let mut parser = SignatureParser::new(signature);
        let type_parameters = parser.type_parameters()?;
        let superclass = parser.class_type()?;

        let mut interfaces = Vec::new();
        while parser.peek().is_some() {
            interfaces.push(parser.class_type()?);
        }

        Ok(ClassSignature {
            type_parameters,
            superclass,
            interfaces,
        })
    }

    /// Returns the signature of the super-interface with the given erased name.
    #[must_use]
    pub fn interface(&self, internal_name: &str) -> Option<&ClassTypeSignature> {
        self.interfaces
            .iter()
            .find(|interface| interface.erased_name() == internal_name)
    }
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        write!(f, "{}", self.superclass)?;
        for interface in &self.interfaces {
            write!(f, "{interface}")?;
        }
        Ok(())
    }
}

/// The type-variable assignments in effect while visiting one interface.
///
/// Variables declared by the interface map to the type arguments it was reached with.
/// Declared variables that have no argument (a raw reference) keep their declaration so they
/// can erase to their bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBindings {
    bound: FxHashMap<String, TypeSignature>,
    declared: Vec<TypeParameter>,
    /// Unbound declarations of the scopes the arguments were written in
    enclosing: Vec<TypeParameter>,
}

impl TypeBindings {
    /// Bindings with no variables in scope.
    #[must_use]
    pub fn empty() -> Self {
        TypeBindings::default()
    }

    /// Binds `parameters` positionally to `arguments`.
    ///
    /// An empty `arguments` slice is a raw reference: every variable stays unbound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] when a non-empty argument list has the wrong arity.
    pub fn bind(parameters: &[TypeParameter], arguments: &[TypeSignature]) -> Result<Self> {
        if !arguments.is_empty() && arguments.len() != parameters.len() {
            return Err(Error::InvalidSignature(format!(
                "expected {} type arguments, got {}",
                parameters.len(),
                arguments.len()
            )));
        }

        let bound = parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| (parameter.name.clone(), argument.clone()))
            .collect();
        Ok(TypeBindings {
            bound,
            declared: parameters.to_vec(),
            enclosing: Vec::new(),
        })
    }

    /// Records the scope the bound arguments were written in, so variables of an enclosing
    /// interface that are themselves unbound still erase to their declared bounds.
    #[must_use]
    pub fn within(mut self, enclosing: &TypeBindings) -> Self {
        self.enclosing = enclosing
            .declared
            .iter()
            .filter(|parameter| !enclosing.bound.contains_key(&parameter.name))
            .chain(enclosing.enclosing.iter())
            .cloned()
            .collect();
        self
    }

    /// Returns the type a variable is bound to.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&TypeSignature> {
        self.bound.get(variable)
    }

    /// Returns `true` when no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Replaces every bound type variable in `signature`.
    #[must_use]
    pub fn substitute(&self, signature: &TypeSignature) -> TypeSignature {
        match signature {
            TypeSignature::Base(_) => signature.clone(),
            TypeSignature::TypeVariable(name) => self
                .bound
                .get(name)
                .cloned()
                .unwrap_or_else(|| signature.clone()),
            TypeSignature::Array(component) => {
                TypeSignature::Array(Box::new(self.substitute(component)))
            }
            TypeSignature::Class(class) => TypeSignature::Class(self.substitute_class(class)),
        }
    }

    /// Replaces every bound type variable in a class type signature.
    #[must_use]
    pub fn substitute_class(&self, class: &ClassTypeSignature) -> ClassTypeSignature {
        ClassTypeSignature {
            segments: class
                .segments
                .iter()
                .map(|segment| SimpleClassType {
                    name: segment.name.clone(),
                    type_arguments: segment
                        .type_arguments
                        .iter()
                        .map(|argument| match argument {
                            TypeArgument::Unbounded => TypeArgument::Unbounded,
                            TypeArgument::Exact(inner) => TypeArgument::Exact(self.substitute(inner)),
                            TypeArgument::Extends(inner) => {
                                TypeArgument::Extends(self.substitute(inner))
                            }
                            TypeArgument::Super(inner) => TypeArgument::Super(self.substitute(inner)),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Erases `signature` to a field type.
    ///
    /// Bound variables erase to their argument. Unbound variables erase to the leftmost bound of
    /// their declaration, looked up first in `method_parameters` and then in the interface's
    /// own declarations, and to `java/lang/Object` when undeclared.
    #[must_use]
    pub fn erase(&self, signature: &TypeSignature, method_parameters: &[TypeParameter]) -> FieldType {
        self.erase_bounded(signature, method_parameters, 0)
    }

    /// Erases the parameters and result of a method signature to a descriptor.
    #[must_use]
    pub fn erase_method(&self, signature: &MethodSignature) -> MethodDescriptor {
        let parameters = signature
            .parameters
            .iter()
            .map(|parameter| self.erase(parameter, &signature.type_parameters))
            .collect();
        let result = match &signature.result {
            Some(result) => ReturnType::Value(self.erase(result, &signature.type_parameters)),
            None => ReturnType::Void,
        };
        MethodDescriptor::new(parameters, result)
    }

    /// Substitutes bound variables in a method signature and renames its own type parameters
    /// positionally, so two signatures that differ only in variable names compare equal.
    #[must_use]
    pub fn resolve_method(&self, signature: &MethodSignature) -> MethodSignature {
        let mut scoped = self.clone();
        for (position, parameter) in signature.type_parameters.iter().enumerate() {
            scoped.bound.insert(
                parameter.name.clone(),
                TypeSignature::TypeVariable(format!("M{position}")),
            );
        }

        let type_parameters = signature
            .type_parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| TypeParameter {
                name: format!("M{position}"),
                class_bound: parameter.class_bound.as_ref().map(|bound| scoped.substitute(bound)),
                interface_bounds: parameter
                    .interface_bounds
                    .iter()
                    .map(|bound| scoped.substitute(bound))
                    .collect(),
            })
            .collect();

        MethodSignature {
            type_parameters,
            parameters: signature
                .parameters
                .iter()
                .map(|parameter| scoped.substitute(parameter))
                .collect(),
            result: signature.result.as_ref().map(|result| scoped.substitute(result)),
            throws: signature
                .throws
                .iter()
                .map(|throws| scoped.substitute(throws))
                .collect(),
        }
    }

    fn erase_bounded(
        &self,
        signature: &TypeSignature,
        method_parameters: &[TypeParameter],
        depth: usize,
    ) -> FieldType {
        const OBJECT: &str = "java/lang/Object";

        // Cyclic variable bounds (<T:TU;U:TT;>) never bottom out
        if depth > 32 {
            return FieldType::Object(OBJECT.to_string());
        }

        match signature {
            TypeSignature::Base(base) => FieldType::Base(*base),
            TypeSignature::Class(class) => FieldType::Object(class.erased_name()),
            TypeSignature::Array(component) => FieldType::Array(Box::new(self.erase_bounded(
                component,
                method_parameters,
                depth + 1,
            ))),
            TypeSignature::TypeVariable(name) => {
                if let Some(parameter) = method_parameters.iter().find(|p| &p.name == name) {
                    return match parameter.leftmost_bound() {
                        Some(bound) => self.erase_bounded(bound, method_parameters, depth + 1),
                        None => FieldType::Object(OBJECT.to_string()),
                    };
                }
                if let Some(argument) = self.bound.get(name) {
                    let outer = TypeBindings {
                        declared: self.enclosing.clone(),
                        ..TypeBindings::default()
                    };
                    return outer.erase_bounded(argument, &[], depth + 1);
                }
                match self
                    .declared
                    .iter()
                    .find(|p| &p.name == name)
                    .and_then(TypeParameter::leftmost_bound)
                {
                    Some(bound) => self.erase_bounded(bound, method_parameters, depth + 1),
                    None => FieldType::Object(OBJECT.to_string()),
                }
            }
        }
    }
}

struct SignatureParser<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> SignatureParser<'a> {
    fn new(text: &'a str) -> Self {
        SignatureParser { text, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn error(&self, what: &str) -> Error {
        Error::InvalidSignature(format!(
            "{what} at offset {} in signature '{}'",
            self.position, self.text
        ))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{expected}'"))),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.position == self.text.len() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing characters"))
        }
    }

    /// Reads an identifier up to (not including) one of the given terminators.
    fn identifier(&mut self, terminators: &[char]) -> Result<&'a str> {
        let start = self.position;
        while let Some(c) = self.peek() {
            if terminators.contains(&c) {
                break;
            }
            if matches!(c, '.' | ';' | '[' | '/' | '<' | '>' | ':') {
                return Err(self.error(&format!("unexpected '{c}' in identifier")));
            }
            self.bump();
        }
        if self.position == start {
            return Err(self.error("empty identifier"));
        }
        Ok(&self.text[start..self.position])
    }

    fn type_parameters(&mut self) -> Result<Vec<TypeParameter>> {
        let mut parameters = Vec::new();
        if self.peek() != Some('<') {
            return Ok(parameters);
        }
        self.bump();

        loop {
            let name = self.identifier(&[':'])?.to_string();
            self.expect(':')?;
            let class_bound = match self.peek() {
                Some('L' | 'T' | '[') => Some(self.reference_type()?),
                _ => None,
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(':') {
                self.bump();
                interface_bounds.push(self.reference_type()?);
            }
            parameters.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
            if self.peek() == Some('>') {
                self.bump();
                break;
            }
        }
        Ok(parameters)
    }

    fn java_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(c) => match BaseType::from_char(c) {
                Some(base) => {
                    self.bump();
                    Ok(TypeSignature::Base(base))
                }
                None => self.reference_type(),
            },
            None => Err(self.error("unexpected end")),
        }
    }

    fn reference_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some('L') => Ok(TypeSignature::Class(self.class_type()?)),
            Some('T') => {
                self.bump();
                let name = self.identifier(&[';'])?.to_string();
                self.expect(';')?;
                Ok(TypeSignature::TypeVariable(name))
            }
            Some('[') => {
                self.bump();
                Ok(TypeSignature::Array(Box::new(self.java_type()?)))
            }
            _ => Err(self.error("expected reference type")),
        }
    }

    fn class_type(&mut self) -> Result<ClassTypeSignature> {
        self.expect('L')?;

        // The first segment includes the package specifier
        let start = self.position;
        loop {
            self.identifier(&['/', '<', '.', ';'])?;
            if self.peek() == Some('/') {
                self.bump();
            } else {
                break;
            }
        }
        let mut segments = vec![SimpleClassType {
            name: self.text[start..self.position].to_string(),
            type_arguments: self.type_arguments()?,
        }];

        while self.peek() == Some('.') {
            self.bump();
            let name = self.identifier(&['<', '.', ';'])?.to_string();
            segments.push(SimpleClassType {
                name,
                type_arguments: self.type_arguments()?,
            });
        }
        self.expect(';')?;

        Ok(ClassTypeSignature { segments })
    }

    fn type_arguments(&mut self) -> Result<Vec<TypeArgument>> {
        let mut arguments = Vec::new();
        if self.peek() != Some('<') {
            return Ok(arguments);
        }
        self.bump();

        loop {
            let argument = match self.peek() {
                Some('*') => {
                    self.bump();
                    TypeArgument::Unbounded
                }
                Some('+') => {
                    self.bump();
                    TypeArgument::Extends(self.reference_type()?)
                }
                Some('-') => {
                    self.bump();
                    TypeArgument::Super(self.reference_type()?)
                }
                _ => TypeArgument::Exact(self.reference_type()?),
            };
            arguments.push(argument);
            if self.peek() == Some('>') {
                self.bump();
                break;
            }
        }
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_signature_roundtrip() {
        let text = "<T:Ljava/lang/Object;U::Ljava/lang/Comparable<-TU;>;>(TT;Ljava/util/List<+TU;>;[I)Ljava/util/Map<TT;*>;^Ljava/io/IOException;^TX;";
        let signature = MethodSignature::parse(text).unwrap();

        assert_eq!(signature.type_parameters.len(), 2);
        assert!(signature.type_parameters[1].class_bound.is_none());
        assert_eq!(signature.type_parameters[1].interface_bounds.len(), 1);
        assert_eq!(signature.parameters.len(), 3);
        assert_eq!(signature.throws.len(), 2);
        assert_eq!(signature.to_string(), text);
    }

    #[test]
    fn test_class_signature_with_inner_types() {
        let text = "<K:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Map<TK;Ljava/lang/String;>;Lpkg/Outer<TK;>.Inner<TK;>;";
        let signature = ClassSignature::parse(text).unwrap();

        assert_eq!(signature.interfaces.len(), 2);
        assert_eq!(signature.interfaces[1].erased_name(), "pkg/Outer$Inner");
        assert!(signature.interface("java/util/Map").is_some());
        assert_eq!(signature.to_string(), text);
    }

    #[test]
    fn test_erase_bound_and_unbound_variables() {
        let class = ClassSignature::parse(
            "<T:Ljava/lang/Number;E:Ljava/lang/Object;>Ljava/lang/Object;",
        )
        .unwrap();
        let raw = TypeBindings::bind(&class.type_parameters, &[]).unwrap();
        let method = MethodSignature::parse("<R::Ljava/lang/CharSequence;>(TT;TE;TR;)[TT;").unwrap();

        let descriptor = raw.erase_method(&method);
        assert_eq!(
            descriptor.to_string(),
            "(Ljava/lang/Number;Ljava/lang/Object;Ljava/lang/CharSequence;)[Ljava/lang/Number;"
        );

        let bound = TypeBindings::bind(
            &class.type_parameters,
            &[
                TypeSignature::parse("Ljava/lang/Integer;").unwrap(),
                TypeSignature::parse("Ljava/util/List<Ljava/lang/String;>;").unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(
            bound.erase_method(&method).to_string(),
            "(Ljava/lang/Integer;Ljava/util/List;Ljava/lang/CharSequence;)[Ljava/lang/Integer;"
        );
    }

    #[test]
    fn test_recursive_bounds_terminate() {
        let method = MethodSignature::parse("<T::Ljava/lang/Comparable<TT;>;>(TT;)V").unwrap();
        assert_eq!(
            TypeBindings::empty().erase_method(&method).to_string(),
            "(Ljava/lang/Comparable;)V"
        );
    }

    #[test]
    fn test_enclosing_variables_erase_to_their_bounds() {
        // Sub<S extends Number> extends Base<S>, reached raw
        let sub = ClassSignature::parse("<S:Ljava/lang/Number;>Ljava/lang/Object;Ldemo/Base<TS;>;")
            .unwrap();
        let base = ClassSignature::parse("<E:Ljava/lang/Object;>Ljava/lang/Object;").unwrap();
        let outer = TypeBindings::bind(&sub.type_parameters, &[]).unwrap();
        let inherited = sub.interface("demo/Base").unwrap().type_arguments()[0]
            .signature()
            .map(|argument| outer.substitute(argument))
            .unwrap();

        let inner = TypeBindings::bind(&base.type_parameters, &[inherited])
            .unwrap()
            .within(&outer);
        let method = MethodSignature::parse("(TE;)V").unwrap();
        assert_eq!(inner.erase_method(&method).to_string(), "(Ljava/lang/Number;)V");
    }

    #[test]
    fn test_substitution_reaches_nested_arguments() {
        let class = ClassSignature::parse("<T:Ljava/lang/Object;>Ljava/lang/Object;").unwrap();
        let bindings = TypeBindings::bind(
            &class.type_parameters,
            &[TypeSignature::parse("Ljava/lang/String;").unwrap()],
        )
        .unwrap();

        let sub = TypeSignature::parse("Ljava/util/Map<TT;[TT;>;").unwrap();
        assert_eq!(
            bindings.substitute(&sub).to_string(),
            "Ljava/util/Map<Ljava/lang/String;[Ljava/lang/String;>;"
        );
        assert!(sub.has_type_variables());
        assert!(!bindings.substitute(&sub).has_type_variables());
    }

    #[test]
    fn test_resolve_method_ignores_variable_names() {
        let first = MethodSignature::parse("<A:Ljava/lang/Object;>(TA;)TA;").unwrap();
        let second = MethodSignature::parse("<B:Ljava/lang/Object;>(TB;)TB;").unwrap();
        let bindings = TypeBindings::empty();

        assert_eq!(bindings.resolve_method(&first), bindings.resolve_method(&second));
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let class = ClassSignature::parse("<T:Ljava/lang/Object;>Ljava/lang/Object;").unwrap();
        let arguments = [
            TypeSignature::parse("Ljava/lang/String;").unwrap(),
            TypeSignature::parse("Ljava/lang/String;").unwrap(),
        ];
        assert!(matches!(
            TypeBindings::bind(&class.type_parameters, &arguments),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_invalid_signatures() {
        for bad in ["", "(", "()", "(TT)V", "<>()V", "(Ljava/util/List<>;)V", "()V^I"] {
            assert!(MethodSignature::parse(bad).is_err(), "{bad}");
        }
    }
}
