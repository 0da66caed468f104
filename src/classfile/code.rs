//! Bytecode emission with operand stack tracking.
//!
//! [`CodeBuffer`] encodes the straight-line instruction subset needed for forwarding method
//! bodies and records the operand stack depth after every instruction, so `max_stack` is
//! known exactly when the buffer is finished. It works on already-resolved constant-pool
//! indices; symbol interning is the job of [`crate::classfile::MethodWriter`].
//!
//! # Examples
//!
//! ```rust
//! use classforge::classfile::CodeBuffer;
//!
//! let mut code = CodeBuffer::new();
//! code.aload(0)?;
//! code.push_short(5)?;
//! code.pop()?;
//! code.areturn()?;
//!
//! let (bytecode, max_stack) = code.finish()?;
//! assert_eq!(bytecode, vec![0x2A, 0x08, 0x57, 0xB0]);
//! assert_eq!(max_stack, 2);
//! # Ok::<(), classforge::Error>(())
//! ```

use crate::{
    classfile::{
        descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType},
        opcodes,
    },
    file::io::write_be,
    Error, Result,
};

/// Maximum length of a `Code` attribute's bytecode array.
pub const MAX_CODE_LENGTH: usize = u16::MAX as usize;

/// Straight-line bytecode encoder with exact stack depth tracking.
#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    /// Generated bytecode
    bytecode: Vec<u8>,
    /// Operand stack depth after the last instruction, in slots
    current_stack_depth: u16,
    /// Maximum operand stack depth reached
    max_stack_depth: u16,
    /// Set once a return instruction has been emitted
    terminated: bool,
}

impl CodeBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        CodeBuffer::default()
    }

    /// Pushes `null`.
    ///
    /// # Errors
    ///
    /// See [`CodeBuffer::finish`] for the conditions under which emission fails.
    pub fn aconst_null(&mut self) -> Result<()> {
        self.emit(opcodes::ACONST_NULL, 0, 1)
    }

    /// Pushes an `int` constant in the `i16` range using the shortest encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if code was emitted after a return.
    pub fn push_short(&mut self, value: i16) -> Result<()> {
        match value {
            -1..=5 => {
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let opcode = (i16::from(opcodes::ICONST_0) + value) as u8;
                self.emit(opcode, 0, 1)
            }
            -128..=127 => {
                self.emit(opcodes::BIPUSH, 0, 1)?;
                #[allow(clippy::cast_possible_truncation)]
                self.bytecode.push(value as i8 as u8);
                Ok(())
            }
            _ => {
                self.emit(opcodes::SIPUSH, 0, 1)?;
                write_be(&mut self.bytecode, value);
                Ok(())
            }
        }
    }

    /// Pushes the zero value of a return type: `null`, `0`, `0L`, `0.0f`, or `0.0`. Pushes
    /// nothing for `void`.
    ///
    /// # Errors
    ///
    /// Returns an error if code was emitted after a return.
    pub fn push_default(&mut self, return_type: &ReturnType) -> Result<()> {
        match return_type {
            ReturnType::Void => Ok(()),
            ReturnType::Value(FieldType::Base(BaseType::Long)) => self.emit(opcodes::LCONST_0, 0, 2),
            ReturnType::Value(FieldType::Base(BaseType::Float)) => self.emit(opcodes::FCONST_0, 0, 1),
            ReturnType::Value(FieldType::Base(BaseType::Double)) => {
                self.emit(opcodes::DCONST_0, 0, 2)
            }
            ReturnType::Value(FieldType::Base(_)) => self.emit(opcodes::ICONST_0, 0, 1),
            ReturnType::Value(_) => self.emit(opcodes::ACONST_NULL, 0, 1),
        }
    }

    /// Pushes a constant-pool entry. `wide_value` selects `ldc2_w` for `long` and `double`.
    ///
    /// # Errors
    ///
    /// Returns an error if code was emitted after a return.
    pub fn ldc(&mut self, index: u16, wide_value: bool) -> Result<()> {
        if wide_value {
            self.emit(opcodes::LDC2_W, 0, 2)?;
            write_be(&mut self.bytecode, index);
        } else if let Ok(short) = u8::try_from(index) {
            self.emit(opcodes::LDC, 0, 1)?;
            self.bytecode.push(short);
        } else {
            self.emit(opcodes::LDC_W, 0, 1)?;
            write_be(&mut self.bytecode, index);
        }
        Ok(())
    }

    /// Loads a reference from a local variable slot.
    ///
    /// # Errors
    ///
    /// Returns an error if code was emitted after a return.
    pub fn aload(&mut self, slot: u16) -> Result<()> {
        self.load_with(opcodes::ALOAD, opcodes::ALOAD_0, slot, 1)
    }

    /// Loads a value of the given type from a local variable slot.
    ///
    /// # Errors
    ///
    /// Returns an error if code was emitted after a return.
    pub fn load(&mut self, field: &FieldType, slot: u16) -> Result<()> {
        let (opcode, short_base) = match field {
            FieldType::Base(BaseType::Long) => (opcodes::LLOAD, opcodes::LLOAD_0),
            FieldType::Base(BaseType::Float) => (opcodes::FLOAD, opcodes::FLOAD_0),
            FieldType::Base(BaseType::Double) => (opcodes::DLOAD, opcodes::DLOAD_0),
            FieldType::Base(_) => (opcodes::ILOAD, opcodes::ILOAD_0),
            FieldType::Object(_) | FieldType::Array(_) => (opcodes::ALOAD, opcodes::ALOAD_0),
        };
        self.load_with(opcode, short_base, slot, field.slots())
    }

    /// `new`, `anewarray`, or `checkcast` with a class index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for any other opcode, or if code was emitted after a
    /// return.
    pub fn type_insn(&mut self, opcode: u8, class_index: u16) -> Result<()> {
        match opcode {
            opcodes::NEW => self.emit(opcode, 0, 1)?,
            opcodes::ANEWARRAY | opcodes::CHECKCAST => self.emit(opcode, 1, 1)?,
            _ => return Err(malformed_error!("0x{:02X} is not a type instruction", opcode)),
        }
        write_be(&mut self.bytecode, class_index);
        Ok(())
    }

    /// Stores into a reference array: `arrayref, index, value ->`.
    ///
    /// # Errors
    ///
    /// Returns an error on stack underflow.
    pub fn aastore(&mut self) -> Result<()> {
        self.emit(opcodes::AASTORE, 3, 0)
    }

    /// Duplicates the top single-slot value.
    ///
    /// # Errors
    ///
    /// Returns an error on stack underflow.
    pub fn dup(&mut self) -> Result<()> {
        self.emit(opcodes::DUP, 1, 2)
    }

    /// Discards the top single-slot value.
    ///
    /// # Errors
    ///
    /// Returns an error on stack underflow.
    pub fn pop(&mut self) -> Result<()> {
        self.emit(opcodes::POP, 1, 0)
    }

    /// Emits an invoke instruction; the stack effect is derived from `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for a non-invoke opcode or on stack underflow.
    pub fn invoke(&mut self, opcode: u8, method_index: u16, descriptor: &MethodDescriptor) -> Result<()> {
        let receiver = u16::from(opcode != opcodes::INVOKESTATIC);
        let arguments = descriptor.parameter_slots() + receiver;
        let pushes = descriptor.return_type().slots();

        match opcode {
            opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKESTATIC => {
                self.emit(opcode, arguments, pushes)?;
                write_be(&mut self.bytecode, method_index);
            }
            opcodes::INVOKEINTERFACE => {
                let count = u8::try_from(arguments)
                    .map_err(|_| Error::LimitExceeded(format!("{arguments} argument slots")))?;
                self.emit(opcode, arguments, pushes)?;
                write_be(&mut self.bytecode, method_index);
                self.bytecode.push(count);
                self.bytecode.push(0);
            }
            _ => return Err(malformed_error!("0x{:02X} is not an invoke instruction", opcode)),
        }
        Ok(())
    }

    /// Emits `return` for `void` methods.
    ///
    /// # Errors
    ///
    /// Returns an error if code was already terminated.
    pub fn return_void(&mut self) -> Result<()> {
        self.emit(opcodes::RETURN, 0, 0)?;
        self.terminated = true;
        Ok(())
    }

    /// Emits `areturn`.
    ///
    /// # Errors
    ///
    /// Returns an error on stack underflow.
    pub fn areturn(&mut self) -> Result<()> {
        self.emit(opcodes::ARETURN, 1, 0)?;
        self.terminated = true;
        Ok(())
    }

    /// Emits the return instruction matching `return_type`.
    ///
    /// # Errors
    ///
    /// Returns an error on stack underflow.
    pub fn return_value(&mut self, return_type: &ReturnType) -> Result<()> {
        let opcode = match return_type {
            ReturnType::Void => opcodes::RETURN,
            ReturnType::Value(FieldType::Base(BaseType::Long)) => opcodes::LRETURN,
            ReturnType::Value(FieldType::Base(BaseType::Float)) => opcodes::FRETURN,
            ReturnType::Value(FieldType::Base(BaseType::Double)) => opcodes::DRETURN,
            ReturnType::Value(FieldType::Base(_)) => opcodes::IRETURN,
            ReturnType::Value(_) => opcodes::ARETURN,
        };
        self.emit(opcode, return_type.slots(), 0)?;
        self.terminated = true;
        Ok(())
    }

    /// Current bytecode length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// Returns `true` when nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Operand stack depth after the last instruction.
    #[must_use]
    pub fn current_stack_depth(&self) -> u16 {
        self.current_stack_depth
    }

    /// Maximum operand stack depth reached so far.
    #[must_use]
    pub fn max_stack_depth(&self) -> u16 {
        self.max_stack_depth
    }

    /// Consumes the buffer, returning the bytecode and its `max_stack`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the code does not end in a return instruction, or
    /// [`Error::LimitExceeded`] if it is longer than 65535 bytes.
    pub fn finish(self) -> Result<(Vec<u8>, u16)> {
        if !self.terminated {
            return Err(malformed_error!("Method body does not end with a return instruction"));
        }
        if self.bytecode.len() > MAX_CODE_LENGTH {
            return Err(Error::LimitExceeded(format!(
                "code length {} exceeds {}",
                self.bytecode.len(),
                MAX_CODE_LENGTH
            )));
        }
        Ok((self.bytecode, self.max_stack_depth))
    }

    fn load_with(&mut self, opcode: u8, short_base: u8, slot: u16, pushes: u16) -> Result<()> {
        match slot {
            0..=3 => {
                #[allow(clippy::cast_possible_truncation)]
                let opcode = short_base + slot as u8;
                self.emit(opcode, 0, pushes)
            }
            4..=255 => {
                self.emit(opcode, 0, pushes)?;
                #[allow(clippy::cast_possible_truncation)]
                self.bytecode.push(slot as u8);
                Ok(())
            }
            _ => {
                self.bytecode.push(opcodes::WIDE);
                self.emit(opcode, 0, pushes)?;
                write_be(&mut self.bytecode, slot);
                Ok(())
            }
        }
    }

    fn emit(&mut self, opcode: u8, pops: u16, pushes: u16) -> Result<()> {
        if self.terminated {
            return Err(malformed_error!(
                "Instruction 0x{:02X} emitted after the method returned",
                opcode
            ));
        }
        let Some(depth) = self.current_stack_depth.checked_sub(pops) else {
            return Err(malformed_error!(
                "Stack underflow: instruction 0x{:02X} pops {} with depth {}",
                opcode,
                pops,
                self.current_stack_depth
            ));
        };
        self.current_stack_depth = depth
            .checked_add(pushes)
            .ok_or_else(|| Error::LimitExceeded("operand stack depth".to_string()))?;
        self.max_stack_depth = self.max_stack_depth.max(self.current_stack_depth);
        self.bytecode.push(opcode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_short_encodings() {
        let mut code = CodeBuffer::new();
        for value in [-1, 0, 5, 6, -128, 127, 128, -129, i16::MAX] {
            code.push_short(value).unwrap();
        }
        assert_eq!(
            code.bytecode,
            vec![
                0x02, 0x03, 0x08, // iconst_m1, iconst_0, iconst_5
                0x10, 0x06, 0x10, 0x80, 0x10, 0x7F, // bipush 6, -128, 127
                0x11, 0x00, 0x80, 0x11, 0xFF, 0x7F, // sipush 128, -129
                0x11, 0x7F, 0xFF, // sipush 32767
            ]
        );
        assert_eq!(code.current_stack_depth(), 9);
    }

    #[test]
    fn test_loads_choose_shortest_form() {
        let mut code = CodeBuffer::new();
        code.load(&FieldType::Base(BaseType::Int), 1).unwrap();
        code.load(&FieldType::Base(BaseType::Long), 2).unwrap();
        code.load(&FieldType::Base(BaseType::Double), 7).unwrap();
        code.load(&FieldType::Object("a/B".into()), 300).unwrap();

        assert_eq!(
            code.bytecode,
            vec![0x1B, 0x20, 0x18, 0x07, 0xC4, 0x19, 0x01, 0x2C]
        );
        assert_eq!(code.max_stack_depth(), 6);
    }

    #[test]
    fn test_invoke_stack_effects() {
        let mut code = CodeBuffer::new();
        let descriptor = MethodDescriptor::parse("(IJ)D").unwrap();
        code.aload(0).unwrap();
        code.push_short(1).unwrap();
        code.ldc(3, true).unwrap();
        code.invoke(opcodes::INVOKEVIRTUAL, 9, &descriptor).unwrap();

        assert_eq!(code.current_stack_depth(), 2);
        assert_eq!(code.max_stack_depth(), 4);

        code.return_value(&ReturnType::Value(FieldType::Base(BaseType::Double)))
            .unwrap();
        let (bytecode, max_stack) = code.finish().unwrap();
        assert_eq!(bytecode.last(), Some(&opcodes::DRETURN));
        assert_eq!(max_stack, 4);
    }

    #[test]
    fn test_invokeinterface_encodes_count() {
        let mut code = CodeBuffer::new();
        let descriptor = MethodDescriptor::parse("(J)V").unwrap();
        code.aload(0).unwrap();
        code.ldc(1, true).unwrap();
        code.invoke(opcodes::INVOKEINTERFACE, 4, &descriptor).unwrap();

        assert_eq!(&code.bytecode[2..], &[0x00, 0x01, 0xB9, 0x00, 0x04, 0x03, 0x00]);
        assert_eq!(code.current_stack_depth(), 0);
    }

    #[test]
    fn test_underflow_is_rejected() {
        let mut code = CodeBuffer::new();
        assert!(code.pop().is_err());
        assert!(code.aastore().is_err());
    }

    #[test]
    fn test_finish_requires_return() {
        let mut code = CodeBuffer::new();
        code.aconst_null().unwrap();
        assert!(code.clone().finish().is_err());

        code.areturn().unwrap();
        assert!(code.aconst_null().is_err());
        assert!(code.finish().is_ok());
    }

    #[test]
    fn test_default_values() {
        let mut code = CodeBuffer::new();
        let long = ReturnType::Value(FieldType::Base(BaseType::Long));
        code.push_default(&long).unwrap();
        code.push_default(&ReturnType::Void).unwrap();
        code.return_value(&long).unwrap();

        let (bytecode, max_stack) = code.finish().unwrap();
        assert_eq!(bytecode, vec![opcodes::LCONST_0, opcodes::LRETURN]);
        assert_eq!(max_stack, 2);
    }

    #[test]
    fn test_ldc_forms() {
        let mut code = CodeBuffer::new();
        code.ldc(200, false).unwrap();
        code.ldc(300, false).unwrap();
        assert_eq!(code.bytecode, vec![0x12, 200, 0x13, 0x01, 0x2C]);
    }
}
