use std::mem;

use crate::codegen::CodeGenerator;
use crate::error::{DecompileError, DecompileResult};
use crate::value::{Value, VariableRef};

/// The simulated VM operand stack.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Pop the top value. `address` is the instruction doing the pop, used
    /// for the underflow diagnostic.
    pub fn pop(&mut self, address: u32) -> DecompileResult<Value> {
        self.values.pop().ok_or(DecompileError::StackUnderflow { address })
    }

    /// Pop `count` values, returned in pop order (top first).
    pub fn pop_n(&mut self, count: usize, address: u32) -> DecompileResult<Vec<Value>> {
        let mut popped = Vec::with_capacity(count);
        for _ in 0..count {
            popped.push(self.pop(address)?);
        }
        Ok(popped)
    }

    /// Bind every side-effecting value below the top `keep` entries to a
    /// temporary, deepest first. Run before a statement is written so effects
    /// pushed earlier come out ahead of it.
    pub fn bind_pending_effects(&mut self, keep: usize, code_gen: &mut CodeGenerator<'_>) {
        let end = self.values.len().saturating_sub(keep);
        self.bind_where(end, code_gen, Value::has_side_effects);
    }

    /// Bind every value that reads `var` to a temporary, deepest first. Run
    /// before `var` is assigned.
    pub fn bind_reads_of(&mut self, var: VariableRef, code_gen: &mut CodeGenerator<'_>) {
        let end = self.values.len();
        self.bind_where(end, code_gen, |value| value.reads(var));
    }

    fn bind_where(&mut self, end: usize, code_gen: &mut CodeGenerator<'_>, pred: impl Fn(&Value) -> bool) {
        for slot in &mut self.values[..end] {
            if pred(slot) {
                let value = mem::replace(slot, Value::Int(0));
                *slot = value.bind(code_gen);
            }
        }
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::DefaultDialect;
    use crate::config::GeneratorConfig;

    fn call(name: &str) -> Value {
        Value::Call {
            name: name.into(),
            args: vec![],
        }
    }

    #[test]
    fn lifo_order() {
        let mut stack = ValueStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert_eq!(stack.peek(), Some(&Value::Int(2)));
        assert_eq!(stack.pop(0).unwrap(), Value::Int(2));
        assert_eq!(stack.pop(0).unwrap(), Value::Int(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut stack = ValueStack::new();
        let err = stack.pop(0x12).unwrap_err();
        assert!(matches!(err, DecompileError::StackUnderflow { address: 0x12 }));
    }

    #[test]
    fn pop_n_is_top_first_and_fails_whole() {
        let mut stack = ValueStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        assert_eq!(stack.pop_n(2, 0).unwrap(), vec![Value::Int(2), Value::Int(1)]);
        stack.push(Value::Int(1));
        assert!(stack.pop_n(2, 4).is_err());
    }

    #[test]
    fn pending_effects_bind_below_operands_only() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        let mut stack = ValueStack::new();
        stack.push(call("a"));
        stack.push(Value::Int(1));
        stack.push(call("b"));
        stack.push(call("c"));
        stack.bind_pending_effects(1, &mut code_gen);
        assert_eq!(code_gen.lines(), ["local temp_0 = a()", "local temp_1 = b()"]);
        assert_eq!(stack.pop_n(4, 0).unwrap(), vec![call("c"), Value::Dup(1), Value::Int(1), Value::Dup(0)]);
    }

    #[test]
    fn reads_of_assigned_slot_are_bound() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        let slot = VariableRef {
            bank: 1,
            address: 0,
            volatile: false,
        };
        let mut stack = ValueStack::new();
        stack.push(Value::Var(slot));
        stack.push(Value::Int(2));
        stack.bind_reads_of(slot, &mut code_gen);
        assert_eq!(code_gen.lines(), ["local temp_0 = var[1][0]"]);
        assert_eq!(stack.pop_n(2, 0).unwrap(), vec![Value::Int(2), Value::Dup(0)]);
    }
}
