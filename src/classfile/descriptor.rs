//! Field and method descriptors (JVMS §4.3).
//!
//! A descriptor is the erased, structural encoding of a field or method type:
//! `(ILjava/lang/String;[J)Ljava/lang/Object;` describes a method taking an `int`, a `String`
//! and a `long[]` and returning an `Object`. Descriptors carry no generic information; see
//! [`crate::classfile::signature`] for that.
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::{FieldType, MethodDescriptor, ReturnType};
//!
//! let descriptor = MethodDescriptor::parse("(IJ[Ljava/lang/String;)V")?;
//! assert_eq!(descriptor.parameters().len(), 3);
//! assert_eq!(descriptor.parameter_slots(), 4);
//! assert_eq!(descriptor.return_type(), &ReturnType::Void);
//! assert_eq!(descriptor.parameters_descriptor(), "(IJ[Ljava/lang/String;)");
//! assert_eq!(descriptor.to_string(), "(IJ[Ljava/lang/String;)V");
//! # Ok::<(), classforge::Error>(())
//! ```

use std::fmt;

use strum::{Display, EnumIter};

use crate::{Error, Result};

/// Maximum number of array dimensions a descriptor may declare.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// The eight primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BaseType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
}

impl BaseType {
    /// Returns the base type for a descriptor character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(BaseType::Byte),
            'C' => Some(BaseType::Char),
            'D' => Some(BaseType::Double),
            'F' => Some(BaseType::Float),
            'I' => Some(BaseType::Int),
            'J' => Some(BaseType::Long),
            'S' => Some(BaseType::Short),
            'Z' => Some(BaseType::Boolean),
            _ => None,
        }
    }

    /// Returns the descriptor character.
    #[must_use]
    pub fn descriptor_char(self) -> char {
        match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        }
    }

    /// Number of local variable and operand stack slots a value of this type occupies.
    #[must_use]
    pub fn slots(self) -> u16 {
        match self {
            BaseType::Long | BaseType::Double => 2,
            _ => 1,
        }
    }

    /// Internal name of the wrapper class.
    #[must_use]
    pub fn box_class(self) -> &'static str {
        match self {
            BaseType::Byte => "java/lang/Byte",
            BaseType::Char => "java/lang/Character",
            BaseType::Double => "java/lang/Double",
            BaseType::Float => "java/lang/Float",
            BaseType::Int => "java/lang/Integer",
            BaseType::Long => "java/lang/Long",
            BaseType::Short => "java/lang/Short",
            BaseType::Boolean => "java/lang/Boolean",
        }
    }

    /// Name of the wrapper's unboxing accessor (`intValue`, `booleanValue`, ...).
    #[must_use]
    pub fn unbox_method(self) -> &'static str {
        match self {
            BaseType::Byte => "byteValue",
            BaseType::Char => "charValue",
            BaseType::Double => "doubleValue",
            BaseType::Float => "floatValue",
            BaseType::Int => "intValue",
            BaseType::Long => "longValue",
            BaseType::Short => "shortValue",
            BaseType::Boolean => "booleanValue",
        }
    }

    /// Descriptor of the wrapper's static `valueOf` factory.
    #[must_use]
    pub fn value_of_descriptor(self) -> String {
        format!("({})L{};", self.descriptor_char(), self.box_class())
    }

    /// Descriptor of the wrapper's unboxing accessor.
    #[must_use]
    pub fn unbox_descriptor(self) -> String {
        format!("(){}", self.descriptor_char())
    }
}

/// The type of a field, parameter, or local variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A primitive type
    Base(BaseType),
    /// A class or interface type, by internal name
    Object(String),
    /// An array type with the given component type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parses a complete field descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if `descriptor` is not exactly one field type.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut cursor = DescriptorCursor::new(descriptor);
        let field = cursor.field_type()?;
        cursor.expect_end()?;
        Ok(field)
    }

    /// Number of local variable and operand stack slots a value of this type occupies.
    #[must_use]
    pub fn slots(&self) -> u16 {
        match self {
            FieldType::Base(base) => base.slots(),
            FieldType::Object(_) | FieldType::Array(_) => 1,
        }
    }

    /// Returns `true` for class, interface, and array types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !matches!(self, FieldType::Base(_))
    }

    /// The operand of a `checkcast` for this type: the internal name for classes, the full
    /// descriptor for arrays. `None` for primitives.
    #[must_use]
    pub fn cast_target(&self) -> Option<String> {
        match self {
            FieldType::Base(_) => None,
            FieldType::Object(name) => Some(name.clone()),
            FieldType::Array(_) => Some(self.to_string()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => write!(f, "{}", base.descriptor_char()),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// The return type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// `V`
    Void,
    /// Any field type
    Value(FieldType),
}

impl ReturnType {
    /// Number of operand stack slots the returned value occupies.
    #[must_use]
    pub fn slots(&self) -> u16 {
        match self {
            ReturnType::Void => 0,
            ReturnType::Value(field) => field.slots(),
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => write!(f, "V"),
            ReturnType::Value(field) => write!(f, "{field}"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    parameters: Vec<FieldType>,
    return_type: ReturnType,
}

impl MethodDescriptor {
    /// Creates a descriptor from its parts.
    #[must_use]
    pub fn new(parameters: Vec<FieldType>, return_type: ReturnType) -> Self {
        MethodDescriptor {
            parameters,
            return_type,
        }
    }

    /// Parses a method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if `descriptor` does not follow the
    /// `( {FieldType} ) ReturnType` grammar.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut cursor = DescriptorCursor::new(descriptor);
        cursor.expect('(')?;

        let mut parameters = Vec::new();
        while cursor.peek() != Some(')') {
            parameters.push(cursor.field_type()?);
        }
        cursor.expect(')')?;

        let return_type = if cursor.peek() == Some('V') {
            cursor.bump();
            ReturnType::Void
        } else {
            ReturnType::Value(cursor.field_type()?)
        };
        cursor.expect_end()?;

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// The parameter types in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[FieldType] {
        &self.parameters
    }

    /// The return type.
    #[must_use]
    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    /// Total local-variable slots taken by the parameters (excluding `this`).
    #[must_use]
    pub fn parameter_slots(&self) -> u16 {
        self.parameters.iter().map(FieldType::slots).sum()
    }

    /// The `(...)` prefix of the descriptor, without the return type.
    #[must_use]
    pub fn parameters_descriptor(&self) -> String {
        let mut out = String::from("(");
        for parameter in &self.parameters {
            out.push_str(&parameter.to_string());
        }
        out.push(')');
        out
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.parameters_descriptor(), self.return_type)
    }
}

/// Returns the `(...)` prefix of a raw method descriptor string.
///
/// Returns `None` when the string has no closing parenthesis.
#[must_use]
pub fn parameters_prefix(descriptor: &str) -> Option<&str> {
    descriptor.find(')').map(|end| &descriptor[..=end])
}

struct DescriptorCursor<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> DescriptorCursor<'a> {
    fn new(text: &'a str) -> Self {
        DescriptorCursor { text, position: 0 }
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
            "{what} at offset {} in descriptor '{}'",
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

    fn field_type(&mut self) -> Result<FieldType> {
        let mut dimensions = 0usize;
        while self.peek() == Some('[') {
            self.bump();
            dimensions += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(self.error("too many array dimensions"));
        }

        let mut field = match self.bump() {
            Some('L') => {
                let start = self.position;
                let Some(length) = self.text[start..].find(';') else {
                    return Err(self.error("unterminated class type"));
                };
                let name = &self.text[start..start + length];
                if name.is_empty()
                    || name.contains(['.', '[', '<', '>'])
                    || name.split('/').any(str::is_empty)
                {
                    return Err(self.error("invalid class name"));
                }
                self.position = start + length + 1;
                FieldType::Object(name.to_string())
            }
            Some(c) => match BaseType::from_char(c) {
                Some(base) => FieldType::Base(base),
                None => return Err(self.error(&format!("unexpected '{c}'"))),
            },
            None => return Err(self.error("unexpected end")),
        };

        for _ in 0..dimensions {
            field = FieldType::Array(Box::new(field));
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_base_types() {
        let descriptor = MethodDescriptor::parse("(BCDFIJSZ)V").unwrap();
        assert_eq!(descriptor.parameters().len(), 8);
        assert_eq!(descriptor.parameter_slots(), 10);
        assert_eq!(descriptor.to_string(), "(BCDFIJSZ)V");
    }

    #[test]
    fn test_parse_reference_types() {
        let descriptor = MethodDescriptor::parse("([[ILjava/util/List;)[Ljava/lang/String;").unwrap();
        assert_eq!(
            descriptor.parameters()[0],
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Base(
                BaseType::Int
            )))))
        );
        assert_eq!(
            descriptor.parameters()[1],
            FieldType::Object("java/util/List".to_string())
        );
        assert_eq!(
            descriptor.return_type(),
            &ReturnType::Value(FieldType::Array(Box::new(FieldType::Object(
                "java/lang/String".to_string()
            ))))
        );
    }

    #[test]
    fn test_cast_targets() {
        assert_eq!(
            FieldType::parse("Ljava/lang/String;").unwrap().cast_target(),
            Some("java/lang/String".to_string())
        );
        assert_eq!(
            FieldType::parse("[I").unwrap().cast_target(),
            Some("[I".to_string())
        );
        assert_eq!(FieldType::parse("J").unwrap().cast_target(), None);
    }

    #[test]
    fn test_invalid_descriptors() {
        for bad in ["", "V", "()", "(V)V", "(L;)V", "(Ljava/lang/String)V", "()VV", "(Q)V", "(Ljava.lang.String;)V"] {
            assert!(
                matches!(MethodDescriptor::parse(bad), Err(Error::InvalidSignature(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_boxing_helpers() {
        assert_eq!(BaseType::Int.value_of_descriptor(), "(I)Ljava/lang/Integer;");
        assert_eq!(BaseType::Boolean.unbox_descriptor(), "()Z");
        assert_eq!(BaseType::Char.box_class(), "java/lang/Character");
    }

    #[test]
    fn test_parameters_prefix_of_raw_descriptor() {
        assert_eq!(parameters_prefix("(IJ)Ljava/lang/Object;"), Some("(IJ)"));
        assert_eq!(parameters_prefix("I"), None);
    }
}
