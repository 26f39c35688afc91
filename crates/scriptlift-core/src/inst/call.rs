use std::fmt;

use fieldscript::{Cursor, Opcode};

use super::{InstHeader, Instruction, StackEffect};
use crate::codegen::CodeGenerator;
use crate::engine::Engine;
use crate::error::{DecompileError, DecompileResult};
use crate::function::Function;
use crate::stack::ValueStack;
use crate::value::Value;

/// `RET` / `RETV`.
#[derive(Debug, Default)]
pub struct Return {
    header: InstHeader,
}

impl Return {
    fn with_value(&self) -> bool {
        self.header.opcode() == Some(Opcode::RetV)
    }
}

impl Instruction for Return {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, _cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        Ok(())
    }

    fn process_inst(
        &self,
        func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let address = self.header.address;
        if self.with_value() {
            let value = stack.pop(address)?;
            code_gen.add_output_line(format!("return {value}"));
        } else if !func.is_last_instruction(address) {
            code_gen.add_output_line("return");
        }
        if !stack.is_empty() {
            return Err(DecompileError::StackImbalance {
                address,
                depth: stack.len(),
            });
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }

    fn stack_effect(&self) -> StackEffect {
        if self.with_value() {
            StackEffect::new(1, 0)
        } else {
            StackEffect::NONE
        }
    }

    fn return_arity(&self) -> Option<u32> {
        Some(u32::from(self.with_value()))
    }
}

/// Pop `argc` values and arrange them into source order.
fn pop_arguments(
    stack: &mut ValueStack,
    argc: u8,
    address: u32,
    code_gen: &CodeGenerator<'_>,
) -> DecompileResult<Vec<Value>> {
    let popped = stack.pop_n(usize::from(argc), address)?;
    Ok(code_gen.config().call_arguments(popped))
}

/// `CALL` / `CALLV`: call another function of the same script.
#[derive(Debug, Default)]
pub struct CallInst {
    header: InstHeader,
    dest: u32,
    argc: u8,
}

impl CallInst {
    fn with_value(&self) -> bool {
        self.header.opcode() == Some(Opcode::CallV)
    }
}

impl Instruction for CallInst {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.dest = u32::from(cur.read_u16()?);
        self.argc = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let address = self.header.address;
        let name = engine
            .function_name(self.dest)
            .ok_or(DecompileError::UnresolvedJumpTarget { address, dest: self.dest })?
            .to_owned();
        let args = pop_arguments(stack, self.argc, address, code_gen)?;
        let call = Value::Call { name, args };
        if self.with_value() {
            stack.push(call);
        } else {
            code_gen.add_output_line(call.to_string());
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#06x} argc={}", self.header.mnemonic(), self.dest, self.argc)
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(u32::from(self.argc), u32::from(self.with_value()))
    }

    fn emits_output(&self) -> bool {
        !self.with_value()
    }

    fn is_func_call(&self) -> bool {
        true
    }

    fn dest_address(&self) -> Option<u32> {
        Some(self.dest)
    }
}

/// `KCALL` / `KCALLV`: call a built-in engine routine from the target's
/// kernel table.
#[derive(Debug, Default)]
pub struct KernelCall {
    header: InstHeader,
    id: u8,
    argc: u8,
}

impl KernelCall {
    fn with_value(&self) -> bool {
        self.header.opcode() == Some(Opcode::KCallV)
    }
}

impl Instruction for KernelCall {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        self.id = cur.read_u8()?;
        self.argc = cur.read_u8()?;
        if let Some(sig) = engine.kernel(self.id) {
            if sig.argc != self.argc {
                return Err(self.header.malformed(format!(
                    "{} takes {} argument(s), got {}",
                    sig.name, sig.argc, self.argc
                )));
            }
            if self.with_value() && !sig.returns_value {
                return Err(self.header.malformed(format!("{} returns no value", sig.name)));
            }
        }
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let args = pop_arguments(stack, self.argc, self.header.address, code_gen)?;
        let (name, metadata) = match engine.kernel(self.id) {
            Some(sig) => (sig.name.clone(), sig.metadata.as_str()),
            None => (format!("kernel_{}", self.id), ""),
        };
        if self.with_value() {
            stack.push(Value::Call { name, args });
        } else {
            let rendered = code_gen.format_args(&self.header, &args, metadata);
            code_gen.add_output_line(format!("{name}({rendered})"));
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} argc={}", self.header.mnemonic(), self.id, self.argc)
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(u32::from(self.argc), u32::from(self.with_value()))
    }

    fn emits_output(&self) -> bool {
        !self.with_value()
    }
}
