//! Decoded instructions.
//!
//! Each opcode family is one struct implementing [`Instruction`]. Structs are
//! built empty by the registry's factory, then fill themselves in from the
//! byte stream in `decode_operands`. The generic families (stack ops, jumps,
//! calls, returns) live here; targets add their own.

mod call;
mod jump;
mod stack_ops;

use std::fmt;

use fieldscript::opcode::mnemonic_of;
use fieldscript::{Cursor, Opcode};

use crate::codegen::CodeGenerator;
use crate::engine::{Engine, InstFactory};
use crate::error::{DecompileError, DecompileResult};
use crate::factory::Upcast;
use crate::function::Function;
use crate::stack::ValueStack;

pub use call::{CallInst, KernelCall, Return};
pub use jump::{CondJump, UncondJump};
pub use stack_ops::{BinaryOpStack, BoolNegate, Discard, DupStack, PushLiteral, PushString, PushVar, Store};

/// Fields every instruction carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstHeader {
    /// Byte offset of the opcode within the script's code.
    pub address: u32,
    pub opcode: u8,
    /// Operand bytes following the opcode.
    pub raw: Vec<u8>,
}

impl InstHeader {
    pub fn new(address: u32, opcode: u8) -> Self {
        Self {
            address,
            opcode,
            raw: Vec::new(),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        mnemonic_of(self.opcode)
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Address of the first byte after the opcode.
    pub fn operand_address(&self) -> u32 {
        self.address + 1
    }

    /// Total encoded width in bytes.
    pub fn width(&self) -> u32 {
        1 + self.raw.len() as u32
    }

    /// Build a `MalformedOperand` error for this instruction.
    pub fn malformed(&self, message: impl Into<String>) -> DecompileError {
        DecompileError::MalformedOperand {
            address: self.address,
            opcode: self.opcode,
            message: message.into(),
        }
    }
}

/// Net stack behaviour of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackEffect {
    pub pops: u32,
    pub pushes: u32,
}

impl StackEffect {
    pub const NONE: StackEffect = StackEffect { pops: 0, pushes: 0 };

    pub fn new(pops: u32, pushes: u32) -> Self {
        Self { pops, pushes }
    }
}

pub trait Instruction: fmt::Debug + Send + Sync {
    fn header(&self) -> &InstHeader;

    fn header_mut(&mut self) -> &mut InstHeader;

    /// Read this instruction's operands. The cursor sits just past the
    /// opcode byte and must be left just past the last operand byte.
    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()>;

    /// Apply the instruction to the simulated stack and emit any lines it
    /// produces.
    fn process_inst(
        &self,
        func: &Function,
        stack: &mut ValueStack,
        engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()>;

    /// Render the instruction for disassembly listings (mnemonic + operands).
    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    fn stack_effect(&self) -> StackEffect {
        StackEffect::NONE
    }

    /// Whether processing may write output lines. Pure expression builders
    /// return `false`.
    fn emits_output(&self) -> bool {
        true
    }

    /// A transfer of control into another function.
    fn is_func_call(&self) -> bool {
        false
    }

    fn is_uncond_jump(&self) -> bool {
        false
    }

    fn is_cond_jump(&self) -> bool {
        false
    }

    /// Number of values returned, for return instructions.
    fn return_arity(&self) -> Option<u32> {
        None
    }

    /// Absolute jump or call destination.
    fn dest_address(&self) -> Option<u32> {
        None
    }

    /// Turn an unconditional jump into a call of `callee`. Called while
    /// sealing when the destination is another function's entry.
    fn mark_as_call(&mut self, _callee: String) {}
}

impl<T: Instruction + 'static> Upcast<dyn Instruction> for T {
    fn upcast(self: Box<Self>) -> Box<dyn Instruction> {
        self
    }
}

impl fmt::Display for dyn Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}: ", self.header().address)?;
        self.print(f)
    }
}

/// Register every target-independent opcode.
pub fn register_core_instructions(factory: &mut InstFactory) {
    factory.add_entry::<Return>(Opcode::Ret.as_u8());
    factory.add_entry::<Return>(Opcode::RetV.as_u8());
    factory.add_entry::<CallInst>(Opcode::Call.as_u8());
    factory.add_entry::<CallInst>(Opcode::CallV.as_u8());
    factory.add_entry::<KernelCall>(Opcode::KCall.as_u8());
    factory.add_entry::<KernelCall>(Opcode::KCallV.as_u8());

    factory.add_entry::<PushLiteral>(Opcode::PushB.as_u8());
    factory.add_entry::<PushLiteral>(Opcode::PushW.as_u8());
    factory.add_entry::<PushVar>(Opcode::PushV.as_u8());
    factory.add_entry::<PushString>(Opcode::PushS.as_u8());
    factory.add_entry::<Store>(Opcode::Store.as_u8());
    factory.add_entry::<DupStack>(Opcode::Dup.as_u8());
    factory.add_entry::<Discard>(Opcode::Popz.as_u8());
    factory.add_entry::<BoolNegate>(Opcode::Not.as_u8());

    factory.add_entry::<UncondJump>(Opcode::Jmpf.as_u8());
    factory.add_entry::<UncondJump>(Opcode::Jmpfl.as_u8());
    factory.add_entry::<UncondJump>(Opcode::Jmpb.as_u8());
    factory.add_entry::<UncondJump>(Opcode::Jmpbl.as_u8());
    factory.add_entry::<CondJump>(Opcode::Jmpz.as_u8());
    factory.add_entry::<CondJump>(Opcode::Jmpnz.as_u8());

    for byte in 0x20..=0x31u8 {
        factory.add_entry::<BinaryOpStack>(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_registration_covers_generic_opcodes() {
        let mut factory = InstFactory::new();
        register_core_instructions(&mut factory);
        for op in [Opcode::Ret, Opcode::Dup, Opcode::Jmpz, Opcode::Add, Opcode::LOr, Opcode::KCallV] {
            assert!(factory.contains(&op.as_u8()), "{op:?} missing");
        }
        // Target families are left to the target.
        assert!(!factory.contains(&Opcode::Vwoft.as_u8()));
    }

    #[test]
    fn header_helpers() {
        let mut header = InstHeader::new(0x10, Opcode::Jmpfl.as_u8());
        header.raw = vec![0x04, 0x00];
        assert_eq!(header.mnemonic(), "JMPFL");
        assert_eq!(header.operand_address(), 0x11);
        assert_eq!(header.width(), 3);
        assert!(matches!(
            header.malformed("bad"),
            DecompileError::MalformedOperand { address: 0x10, opcode: 0x11, .. }
        ));
    }
}
