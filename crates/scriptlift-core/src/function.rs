use std::collections::{BTreeSet, HashSet};

use fieldscript::Cursor;
use tracing::debug;

use crate::engine::Engine;
use crate::error::{DecompileError, DecompileResult};
use crate::inst::{InstHeader, Instruction};
use crate::structure::Structure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    Decoding,
    Sealed,
}

/// A contiguous run of instructions `[start, end)` beginning at a script
/// entry point.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub instructions: Vec<Box<dyn Instruction>>,
    state: FunctionState,
    /// Intra-function jump destinations.
    pub labels: BTreeSet<u32>,
    /// Entry addresses of called functions.
    pub calls: BTreeSet<u32>,
    /// Best-effort: values popped before the body's first push.
    pub param_count: u32,
    pub returns_value: bool,
    pub structure: Structure,
}

impl Function {
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            instructions: Vec::new(),
            state: FunctionState::Decoding,
            labels: BTreeSet::new(),
            calls: BTreeSet::new(),
            param_count: 0,
            returns_value: false,
            structure: Structure::default(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.state == FunctionState::Sealed
    }

    pub fn push(&mut self, inst: Box<dyn Instruction>) {
        debug_assert_eq!(self.state, FunctionState::Decoding);
        self.instructions.push(inst);
    }

    pub fn is_last_instruction(&self, address: u32) -> bool {
        self.instructions
            .last()
            .is_some_and(|inst| inst.header().address == address)
    }

    /// Resolve every jump and call destination, infer the parameter count
    /// and recover block structure.
    pub fn seal(&mut self, engine: &Engine<'_>) -> DecompileResult<()> {
        let boundaries: HashSet<u32> = self.instructions.iter().map(|inst| inst.header().address).collect();
        let (start, end) = (self.start, self.end);

        for inst in &mut self.instructions {
            let Some(dest) = inst.dest_address() else {
                continue;
            };
            let address = inst.header().address;
            if inst.is_func_call() {
                if !engine.is_function_entry(dest) {
                    return Err(DecompileError::UnresolvedJumpTarget { address, dest });
                }
                self.calls.insert(dest);
            } else if dest == end || ((start..end).contains(&dest) && boundaries.contains(&dest)) {
                self.labels.insert(dest);
            } else if let Some(callee) = engine.function_name(dest).filter(|_| inst.is_uncond_jump()) {
                inst.mark_as_call(callee.to_owned());
                self.calls.insert(dest);
            } else {
                return Err(DecompileError::UnresolvedJumpTarget { address, dest });
            }
        }

        self.param_count = infer_param_count(&self.instructions);
        self.returns_value = self.instructions.iter().any(|inst| inst.return_arity() == Some(1));
        self.structure = Structure::analyze(self);
        self.state = FunctionState::Sealed;
        Ok(())
    }
}

/// Values the caller must have pushed: the pops made from an initially
/// empty stack before the body pushes anything of its own. A deficit after
/// the first push is left for code generation to report as an underflow.
fn infer_param_count(instructions: &[Box<dyn Instruction>]) -> u32 {
    let mut pops = 0;
    for inst in instructions {
        let effect = inst.stack_effect();
        pops += effect.pops;
        if effect.pushes > 0 {
            break;
        }
    }
    pops
}

/// Decode the instructions of `[start, end)` into an unsealed function.
pub fn decode_function(
    engine: &Engine<'_>,
    code: &[u8],
    name: impl Into<String>,
    start: u32,
    end: u32,
) -> DecompileResult<Function> {
    let mut func = Function::new(name, start, end);
    let mut cur = Cursor::new(code);
    cur.seek(start as usize);

    while (cur.position() as u32) < end {
        let address = cur.position() as u32;
        let opcode = cur.read_u8()?;
        let mut inst = engine
            .registry()
            .create_instruction(opcode)
            .ok_or(DecompileError::UnknownOpcode { address, opcode })?;
        *inst.header_mut() = InstHeader::new(address, opcode);
        inst.decode_operands(&mut cur, engine)?;

        let next = cur.position();
        if next as u32 > end {
            return Err(inst.header().malformed(format!("operands run past the function end at {end:#06x}")));
        }
        inst.header_mut().raw = code[address as usize + 1..next].to_vec();
        func.push(inst);
    }

    debug!(
        function = %func.name,
        start = format_args!("{start:#06x}"),
        end = format_args!("{end:#06x}"),
        instructions = func.instructions.len(),
        "decoded function"
    );
    Ok(func)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::engine::Registry;
    use crate::inst::register_core_instructions;
    use crate::structure::JumpRole;

    fn registry() -> Registry {
        let mut registry = Registry::new("test");
        register_core_instructions(registry.factory_mut());
        registry
    }

    fn decode(registry: &Registry, code: &[u8]) -> DecompileResult<Function> {
        let functions = BTreeMap::from([(0, "f".to_owned())]);
        let engine = Engine::new(registry, functions);
        let mut func = decode_function(&engine, code, "f", 0, code.len() as u32)?;
        func.seal(&engine)?;
        Ok(func)
    }

    #[test]
    fn decodes_and_records_raw_bytes() {
        let registry = registry();
        // PUSHW 0x1234; STORE var[1][2]; RET
        let func = decode(&registry, &[0x09, 0x34, 0x12, 0x0C, 0x01, 0x02, 0x00]).unwrap();
        assert!(func.is_sealed());
        let addresses: Vec<u32> = func.instructions.iter().map(|i| i.header().address).collect();
        assert_eq!(addresses, [0, 3, 6]);
        assert_eq!(func.instructions[0].header().raw, [0x34, 0x12]);
        assert_eq!(func.instructions[1].header().raw, [0x01, 0x02]);
        assert_eq!(func.param_count, 0);
        assert!(!func.returns_value);
    }

    #[test]
    fn unknown_opcode_reports_offset() {
        let registry = registry();
        let err = decode(&registry, &[0x08, 0x01, 0xEE, 0x00]).unwrap_err();
        assert!(matches!(err, DecompileError::UnknownOpcode { address: 2, opcode: 0xEE }));
    }

    #[test]
    fn truncated_operand_is_format_error() {
        let registry = registry();
        let err = decode(&registry, &[0x09, 0x01]).unwrap_err();
        assert_eq!(err.kind(), "Format");
    }

    #[test]
    fn operands_may_not_cross_function_end() {
        let registry = registry();
        let functions = BTreeMap::from([(0, "a".to_owned()), (1, "b".to_owned())]);
        let engine = Engine::new(&registry, functions);
        // PUSHB's operand straddles the boundary at 1.
        let err = decode_function(&engine, &[0x08, 0x01, 0x09, 0x00, 0x00], "a", 0, 1).unwrap_err();
        assert!(matches!(err, DecompileError::MalformedOperand { address: 0, .. }));
    }

    #[test]
    fn params_from_stack_deficit() {
        let registry = registry();
        // ADD; STORE var[1][0]; RET  → needs two incoming values
        let func = decode(&registry, &[0x20, 0x0C, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(func.param_count, 2);
    }

    #[test]
    fn params_stop_at_first_push() {
        let registry = registry();
        // PUSHB 1; ADD; STORE var[1][0]; RET  → ADD underflows, no parameters
        let func = decode(&registry, &[0x08, 0x01, 0x20, 0x0C, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(func.param_count, 0);
        // STORE var[1][0]; STORE var[1][1]; PUSHB 1; RETV
        let func = decode(&registry, &[0x0C, 0x01, 0x00, 0x0C, 0x01, 0x01, 0x08, 0x01, 0x01]).unwrap();
        assert_eq!(func.param_count, 2);
    }

    #[test]
    fn jump_into_operand_bytes_is_unresolved() {
        let registry = registry();
        // PUSHW 0; JMPB 2 → lands on the middle of PUSHW
        let err = decode(&registry, &[0x09, 0x00, 0x00, 0x12, 0x02, 0x00]).unwrap_err();
        assert!(matches!(err, DecompileError::UnresolvedJumpTarget { address: 3, dest: 1 }));
    }

    #[test]
    fn jump_to_other_entry_becomes_call() {
        let registry = registry();
        let code = [0x10, 0x02, 0x00, 0x00];
        let functions = BTreeMap::from([(0, "a".to_owned()), (3, "b".to_owned())]);
        let engine = Engine::new(&registry, functions);
        // JMPF +2 → 3, past this function's end at 2
        let mut func = decode_function(&engine, &code, "a", 0, 2).unwrap();
        func.seal(&engine).unwrap();
        assert!(func.instructions[0].is_func_call());
        assert!(func.calls.contains(&3));
        assert!(func.labels.is_empty());
    }

    #[test]
    fn jump_to_end_is_local() {
        let registry = registry();
        // PUSHB 1; JMPZ +2 → 5 == end
        let func = decode(&registry, &[0x08, 0x01, 0x14, 0x02, 0x00]).unwrap();
        assert!(func.labels.contains(&5));
        assert_eq!(func.structure.role_at(2), Some(JumpRole::If));
    }

    #[test]
    fn call_must_target_entry() {
        let registry = registry();
        // CALL 0x0040 argc 0; RET
        let err = decode(&registry, &[0x02, 0x40, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, DecompileError::UnresolvedJumpTarget { address: 0, dest: 0x40 }));
    }
}
