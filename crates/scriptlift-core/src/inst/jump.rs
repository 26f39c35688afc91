use std::fmt;

use fieldscript::{Cursor, Opcode};

use super::{InstHeader, Instruction, StackEffect};
use crate::codegen::CodeGenerator;
use crate::engine::Engine;
use crate::error::DecompileResult;
use crate::function::Function;
use crate::stack::ValueStack;
use crate::structure::JumpRole;

/// `JMPF` / `JMPFL` / `JMPB` / `JMPBL`.
///
/// Forward offsets count from the byte after the opcode, backward offsets
/// from the opcode itself.
#[derive(Debug, Default)]
pub struct UncondJump {
    header: InstHeader,
    dest: u32,
    /// Set when the destination turned out to be another function's entry.
    call: Option<String>,
}

impl Instruction for UncondJump {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        let address = self.header.address;
        self.dest = match self.header.opcode() {
            Some(Opcode::Jmpf) => address + 1 + u32::from(cur.read_u8()?),
            Some(Opcode::Jmpfl) => address + 1 + u32::from(cur.read_u16()?),
            Some(Opcode::Jmpb) | Some(Opcode::Jmpbl) => {
                let offset = match self.header.opcode() {
                    Some(Opcode::Jmpb) => u32::from(cur.read_u8()?),
                    _ => u32::from(cur.read_u16()?),
                };
                address
                    .checked_sub(offset)
                    .ok_or_else(|| self.header.malformed(format!("backward offset {offset} runs before the code start")))?
            }
            _ => return Err(self.header.malformed("not an unconditional jump")),
        };
        Ok(())
    }

    fn process_inst(
        &self,
        func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        if let Some(callee) = &self.call {
            code_gen.add_output_line(format!("return {callee}()"));
            return Ok(());
        }
        match func.structure.role_at(self.header.address) {
            Some(JumpRole::Absorbed) => {}
            _ => {
                let label = code_gen.dialect().label_name(self.dest);
                code_gen.add_output_line(format!("goto {label}"));
            }
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#06x}", self.header.mnemonic(), self.dest)?;
        if let Some(callee) = &self.call {
            write!(f, " ({callee})")?;
        }
        Ok(())
    }

    fn is_func_call(&self) -> bool {
        self.call.is_some()
    }

    fn is_uncond_jump(&self) -> bool {
        self.call.is_none()
    }

    fn dest_address(&self) -> Option<u32> {
        Some(self.dest)
    }

    fn mark_as_call(&mut self, callee: String) {
        self.call = Some(callee);
    }
}

/// `JMPZ` / `JMPNZ`: pop a condition and jump forward on zero / non-zero.
#[derive(Debug, Default)]
pub struct CondJump {
    header: InstHeader,
    dest: u32,
}

impl CondJump {
    fn jumps_on_zero(&self) -> bool {
        self.header.opcode() == Some(Opcode::Jmpz)
    }
}

impl Instruction for CondJump {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.dest = self.header.address + 1 + u32::from(cur.read_u16()?);
        Ok(())
    }

    fn process_inst(
        &self,
        func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let cond = stack.pop(self.header.address)?;
        // The fall-through path runs while the jump is not taken.
        let enter = if self.jumps_on_zero() { cond } else { cond.negate() };
        match func.structure.role_at(self.header.address) {
            Some(JumpRole::If) => code_gen.open_block(format!("if {enter} then")),
            Some(JumpRole::While) => code_gen.open_block(format!("while {enter} do")),
            _ => {
                let label = code_gen.dialect().label_name(self.dest);
                code_gen.add_output_line(format!("if {} then goto {label} end", enter.negate()));
            }
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#06x}", self.header.mnemonic(), self.dest)
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(1, 0)
    }

    fn is_cond_jump(&self) -> bool {
        true
    }

    fn dest_address(&self) -> Option<u32> {
        Some(self.dest)
    }
}
