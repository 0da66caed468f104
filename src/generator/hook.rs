//! Forwarding bodies.
//!
//! Every generated method has the same shape: collect the call's identity and its boxed
//! arguments, invoke the static dispatch hook, and convert the returned `Object` back to the
//! method's return type.
//!
//! ```text
//! aload_0                         // this
//! sipush   <access>
//! ldc      "<owner>"
//! ldc      "<name><descriptor>"
//! ldc      "<signature>" | aconst_null
//! bipush   <argc>
//! anewarray java/lang/Object
//! (dup; bipush <i>; xload <slot>; [Box.valueOf]; aastore)*
//! invokestatic <hook>
//! pop; return | checkcast <Box>; invokevirtual <Box>.xValue; xreturn | [checkcast <T>]; areturn
//! ```

use crate::{
    classfile::{FieldType, MethodDescriptor, MethodWriter, ReturnType},
    generator::config::{DispatchHook, DISPATCH_DESCRIPTOR},
    Error, Result,
};

const OBJECT: &str = "java/lang/Object";

/// The identity of a call as reported to the dispatch hook.
pub(crate) struct DispatchCall<'a> {
    /// Access flags of the implemented declaration
    pub access: u16,
    /// Owner reported to the hook
    pub owner: &'a str,
    /// `name + descriptor` reported to the hook
    pub key: &'a str,
    /// Generic signature reported to the hook
    pub signature: Option<&'a str>,
}

/// Emits a complete forwarding body into `method`.
///
/// Arguments are read from the method's own parameter slots and the result is converted to its
/// own return type, so bridges can report a narrower `key` than the descriptor they implement.
pub(crate) fn emit_forwarding_body(
    method: &mut MethodWriter<'_>,
    hook: &DispatchHook,
    call: &DispatchCall<'_>,
) -> Result<()> {
    let descriptor: MethodDescriptor = method.descriptor().clone();
    let argument_count = i32::try_from(descriptor.parameters().len())
        .map_err(|_| Error::LimitExceeded("parameter count".to_string()))?;

    method
        .aload(0)?
        .push_int(i32::from(call.access))?
        .push_string(call.owner)?
        .push_string(call.key)?
        .push_optional_string(call.signature)?
        .push_int(argument_count)?
        .anewarray(OBJECT)?;

    let mut slot = 1u16;
    for (position, parameter) in descriptor.parameters().iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let position = position as i32;
        method.dup()?.push_int(position)?.load(parameter, slot)?;
        if let FieldType::Base(base) = parameter {
            method.invokestatic(base.box_class(), "valueOf", &base.value_of_descriptor(), false)?;
        }
        method.aastore()?;
        slot += parameter.slots();
    }

    method.invokestatic(&hook.owner, &hook.name, DISPATCH_DESCRIPTOR, false)?;
    emit_return(method, descriptor.return_type())
}

/// Converts the `Object` on the stack to `return_type` and returns it.
fn emit_return(method: &mut MethodWriter<'_>, return_type: &ReturnType) -> Result<()> {
    match return_type {
        ReturnType::Void => {
            method.pop()?;
        }
        ReturnType::Value(FieldType::Base(base)) => {
            method
                .checkcast(base.box_class())?
                .invokevirtual(base.box_class(), base.unbox_method(), &base.unbox_descriptor())?;
        }
        ReturnType::Value(reference) => {
            if let Some(target) = reference.cast_target().filter(|target| target != OBJECT) {
                method.checkcast(&target)?;
            }
        }
    }
    method.return_value(return_type)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{
        opcodes, ClassAccessFlags, ClassVersion, ClassWriter, MethodAccessFlags,
    };

    fn body(descriptor: &str) -> (Vec<u8>, u16, u16) {
        let mut writer = ClassWriter::new(
            ClassVersion::V1_8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            "demo/Impl",
            None,
            Some("java/lang/Object"),
            &["demo/Api"],
        )
        .unwrap();
        let mut method = writer
            .begin_method(MethodAccessFlags::PUBLIC, "call", descriptor, None, &[])
            .unwrap();
        let key = format!("call{descriptor}");
        let call = DispatchCall {
            access: 0x0401,
            owner: "demo/Api",
            key: &key,
            signature: None,
        };
        emit_forwarding_body(&mut method, &DispatchHook::default(), &call).unwrap();
        let max_locals = method.max_locals();
        let max_stack = method.code().max_stack_depth();
        let bytecode = method.code().clone().finish().unwrap().0;
        (bytecode, max_stack, max_locals)
    }

    #[test]
    fn test_void_method_pops_result() {
        let (bytecode, max_stack, max_locals) = body("()V");
        assert_eq!(bytecode[0], opcodes::ALOAD_0);
        assert_eq!(&bytecode[bytecode.len() - 2..], &[opcodes::POP, opcodes::RETURN]);
        // this, access, owner, key, signature, array
        assert_eq!(max_stack, 6);
        assert_eq!(max_locals, 1);
    }

    #[test]
    fn test_wide_arguments_are_boxed() {
        let (bytecode, max_stack, max_locals) = body("(IJ)J");
        assert!(bytecode.contains(&(opcodes::ILOAD_0 + 1)));
        assert!(bytecode.contains(&(opcodes::LLOAD_0 + 2)));
        // array, dup, index, and a two-slot long on top of the five call arguments
        assert_eq!(max_stack, 10);
        assert_eq!(max_locals, 4);
        assert_eq!(*bytecode.last().unwrap(), opcodes::LRETURN);
    }

    #[test]
    fn test_object_result_is_not_cast() {
        let (bytecode, _, _) = body("()Ljava/lang/Object;");
        assert!(!bytecode.contains(&opcodes::CHECKCAST));
        assert_eq!(*bytecode.last().unwrap(), opcodes::ARETURN);

        let (bytecode, _, _) = body("()[Ljava/lang/String;");
        assert!(bytecode.contains(&opcodes::CHECKCAST));
    }
}
