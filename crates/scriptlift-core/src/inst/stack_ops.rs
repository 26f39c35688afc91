use std::fmt;

use fieldscript::operand::Bank;
use fieldscript::{Cursor, Opcode};

use super::{InstHeader, Instruction, StackEffect};
use crate::codegen::CodeGenerator;
use crate::engine::Engine;
use crate::error::DecompileResult;
use crate::function::Function;
use crate::stack::ValueStack;
use crate::value::{BinaryOp, Value, VariableRef};

/// `PUSHB` / `PUSHW`: push an integer literal.
#[derive(Debug, Default)]
pub struct PushLiteral {
    header: InstHeader,
    value: i32,
}

impl Instruction for PushLiteral {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.value = match self.header.opcode() {
            Some(Opcode::PushB) => i32::from(cur.read_u8()?),
            _ => i32::from(cur.read_i16()?),
        };
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        _code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        stack.push(Value::Int(self.value));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.header.mnemonic(), self.value)
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(0, 1)
    }

    fn emits_output(&self) -> bool {
        false
    }
}

/// `PUSHS`: push a string literal.
#[derive(Debug, Default)]
pub struct PushString {
    header: InstHeader,
    value: String,
}

impl Instruction for PushString {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.value = cur.read_short_string().map_err(|e| match e {
            fieldscript::Error::InvalidString { .. } => self.header.malformed(e.to_string()),
            other => other.into(),
        })?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        _code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        stack.push(Value::Str(self.value.clone()));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.header.mnemonic(), self.value)
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(0, 1)
    }

    fn emits_output(&self) -> bool {
        false
    }
}

/// Decode the `bank, address` operand pair shared by `PUSHV` and `STORE`.
fn read_variable(header: &InstHeader, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<VariableRef> {
    let bank = Bank::new(cur.read_u8()?);
    let address = cur.read_u8()?;
    if bank.is_literal() {
        return Err(header.malformed("bank 0 does not name a variable"));
    }
    Ok(VariableRef {
        bank: bank.index(),
        address,
        volatile: engine.is_volatile_bank(bank.index()),
    })
}

/// `PUSHV`: push a variable read.
#[derive(Debug, Default)]
pub struct PushVar {
    header: InstHeader,
    var: Option<VariableRef>,
}

impl Instruction for PushVar {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        self.var = Some(read_variable(&self.header, cur, engine)?);
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        _code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let var = self.var.ok_or_else(|| self.header.malformed("variable operand not decoded"))?;
        stack.push(Value::Var(var));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.var {
            Some(var) => write!(f, "{} var[{}][{}]", self.header.mnemonic(), var.bank, var.address),
            None => write!(f, "{}", self.header.mnemonic()),
        }
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(0, 1)
    }

    fn emits_output(&self) -> bool {
        false
    }
}

/// `STORE`: pop a value into a variable.
#[derive(Debug, Default)]
pub struct Store {
    header: InstHeader,
    var: Option<VariableRef>,
}

impl Instruction for Store {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        self.var = Some(read_variable(&self.header, cur, engine)?);
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let var = self.var.ok_or_else(|| self.header.malformed("variable operand not decoded"))?;
        let value = stack.pop(self.header.address)?;
        stack.bind_reads_of(var, code_gen);
        code_gen.add_output_line(format!("{} = {value}", Value::Var(var)));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.var {
            Some(var) => write!(f, "{} var[{}][{}]", self.header.mnemonic(), var.bank, var.address),
            None => write!(f, "{}", self.header.mnemonic()),
        }
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(1, 0)
    }
}

/// `DUP`: duplicate the top of the stack.
#[derive(Debug, Default)]
pub struct DupStack {
    header: InstHeader,
}

impl Instruction for DupStack {
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
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let value = stack.pop(self.header.address)?.dup(code_gen);
        stack.push(value.clone());
        stack.push(value);
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(1, 2)
    }
}

/// `POPZ`: drop the top of the stack, keeping any side effect it carries.
#[derive(Debug, Default)]
pub struct Discard {
    header: InstHeader,
}

impl Instruction for Discard {
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
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let value = stack.pop(self.header.address)?;
        match value {
            Value::Call { .. } => code_gen.add_output_line(value.to_string()),
            _ if value.has_side_effects() => code_gen.add_output_line(format!("local _ = {value}")),
            _ => {}
        }
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(1, 0)
    }
}

/// `NOT`: logical negation of the top of the stack.
#[derive(Debug, Default)]
pub struct BoolNegate {
    header: InstHeader,
}

impl Instruction for BoolNegate {
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
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        _code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let value = stack.pop(self.header.address)?;
        stack.push(value.negate());
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(1, 1)
    }

    fn emits_output(&self) -> bool {
        false
    }
}

fn binary_op_for(opcode: Opcode) -> Option<BinaryOp> {
    Some(match opcode {
        Opcode::Add => BinaryOp::Add,
        Opcode::Sub => BinaryOp::Sub,
        Opcode::Mul => BinaryOp::Mul,
        Opcode::Div => BinaryOp::Div,
        Opcode::Mod => BinaryOp::Mod,
        Opcode::BAnd => BinaryOp::BitAnd,
        Opcode::BOr => BinaryOp::BitOr,
        Opcode::BXor => BinaryOp::BitXor,
        Opcode::Shl => BinaryOp::Shl,
        Opcode::Shr => BinaryOp::Shr,
        Opcode::Eq => BinaryOp::Eq,
        Opcode::Ne => BinaryOp::Ne,
        Opcode::Lt => BinaryOp::Lt,
        Opcode::Gt => BinaryOp::Gt,
        Opcode::Le => BinaryOp::Le,
        Opcode::Ge => BinaryOp::Ge,
        Opcode::LAnd => BinaryOp::And,
        Opcode::LOr => BinaryOp::Or,
        _ => return None,
    })
}

/// Two-operand arithmetic, comparison and logic opcodes.
#[derive(Debug, Default)]
pub struct BinaryOpStack {
    header: InstHeader,
    op: Option<BinaryOp>,
}

impl Instruction for BinaryOpStack {
    fn header(&self) -> &InstHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut InstHeader {
        &mut self.header
    }

    fn decode_operands(&mut self, _cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        let op = self.header.opcode().and_then(binary_op_for);
        self.op = Some(op.ok_or_else(|| self.header.malformed("not a binary operator"))?);
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let op = self.op.ok_or_else(|| self.header.malformed("operator not decoded"))?;
        let first = stack.pop(self.header.address)?;
        let second = stack.pop(self.header.address)?;
        let (lhs, rhs) = code_gen.config().binary_operands(first, second);
        stack.push(Value::binary(op, lhs, rhs));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }

    fn stack_effect(&self) -> StackEffect {
        StackEffect::new(2, 1)
    }

    fn emits_output(&self) -> bool {
        false
    }
}
