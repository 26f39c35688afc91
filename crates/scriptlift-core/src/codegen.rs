//! Pseudocode generation.
//!
//! A `CodeGenerator` owns the output line buffer for one script. Instructions
//! write to it while they are processed; the target's [`Dialect`] supplies the
//! parts of the output that differ between targets (signatures, names,
//! argument annotations).

use crate::config::GeneratorConfig;
use crate::engine::Engine;
use crate::error::{DecompileError, DecompileResult};
use crate::function::Function;
use crate::inst::InstHeader;
use crate::stack::ValueStack;
use crate::structure::Marker;
use crate::value::Value;

const INDENT: &str = "    ";

// ---------------------------------------------------------------------------
// Dialect hooks
// ---------------------------------------------------------------------------

/// Target-specific code-generation hooks.
pub trait Dialect: Send + Sync {
    /// First line of a function: `function name(arg0, arg1)`.
    fn construct_func_signature(&self, func: &Function) -> String {
        format!("function {}({})", func.name, param_list(func.param_count))
    }

    /// Decorated rendering of argument `position` of `inst`, annotated with
    /// `marker`. `None` falls back to the plain value.
    fn process_special_metadata(
        &self,
        _inst: &InstHeader,
        _value: &Value,
        _marker: char,
        _position: usize,
    ) -> Option<String> {
        None
    }

    /// Name of the function at `address`, the `index`-th entry of its script.
    fn function_name(&self, _index: usize, address: u32) -> String {
        format!("func_{address:04x}")
    }

    fn label_name(&self, address: u32) -> String {
        format!("label_{address:04x}")
    }
}

/// `arg0, arg1, ...`
pub fn param_list(count: u32) -> String {
    (0..count).map(|n| format!("arg{n}")).collect::<Vec<_>>().join(", ")
}

/// Dialect with no target-specific behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDialect;

impl Dialect for DefaultDialect {}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct CodeGenerator<'d> {
    config: GeneratorConfig,
    dialect: &'d dyn Dialect,
    lines: Vec<String>,
    indent: usize,
    temp_counter: u32,
}

impl<'d> CodeGenerator<'d> {
    pub fn new(config: GeneratorConfig, dialect: &'d dyn Dialect) -> Self {
        Self {
            config,
            dialect,
            lines: Vec::new(),
            indent: 0,
            temp_counter: 0,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Append a line at the current indentation.
    pub fn add_output_line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.lines.push(text);
        } else {
            self.lines.push(format!("{}{text}", INDENT.repeat(self.indent)));
        }
    }

    /// Append a line whose operand meaning is only partly known.
    pub fn add_best_effort_line(&mut self, text: impl AsRef<str>, note: impl AsRef<str>) {
        self.add_output_line(format!("{} -- best-effort: {}", text.as_ref(), note.as_ref()));
    }

    /// Append `text` and indent what follows.
    pub fn open_block(&mut self, text: impl Into<String>) {
        self.add_output_line(text);
        self.indent += 1;
    }

    /// Dedent and append `text`.
    pub fn close_block(&mut self, text: impl Into<String>) {
        self.indent = self.indent.saturating_sub(1);
        self.add_output_line(text);
    }

    pub fn else_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.add_output_line("else");
        self.indent += 1;
    }

    /// Allocate the next `temp_N` index.
    pub fn next_temp(&mut self) -> u32 {
        let index = self.temp_counter;
        self.temp_counter += 1;
        index
    }

    /// Reset per-function state. Temporaries are numbered per function.
    pub fn begin_function(&mut self) {
        self.indent = 0;
        self.temp_counter = 0;
    }

    pub fn checkpoint(&self) -> usize {
        self.lines.len()
    }

    /// Drop every line written since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        self.lines.truncate(checkpoint);
        self.indent = 0;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn construct_func_signature(&self, func: &Function) -> String {
        self.dialect.construct_func_signature(func)
    }

    pub fn process_special_metadata(&self, inst: &InstHeader, value: &Value, marker: char, position: usize) -> Option<String> {
        self.dialect.process_special_metadata(inst, value, marker, position)
    }

    /// Render call arguments, one metadata marker per position. Positions
    /// past the end of `metadata` carry no annotation.
    pub fn format_args(&self, inst: &InstHeader, args: &[Value], metadata: &str) -> String {
        let mut markers = metadata.chars();
        args.iter()
            .enumerate()
            .map(|(position, value)| {
                let marker = markers.next().unwrap_or('_');
                self.process_special_metadata(inst, value, marker, position)
                    .unwrap_or_else(|| value.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Function emission
// ---------------------------------------------------------------------------

fn emit_markers(func: &Function, index: usize, code_gen: &mut CodeGenerator<'_>) {
    for marker in func.structure.markers_before(index) {
        match marker {
            Marker::End => code_gen.close_block("end"),
            Marker::Else => code_gen.else_block(),
            Marker::Label(address) => {
                let label = code_gen.dialect().label_name(*address);
                code_gen.add_output_line(format!("::{label}::"));
            }
        }
    }
}

/// Emit one sealed function: signature, body, `end`.
///
/// The stack starts with the inferred parameters (`arg0` deepest) and must
/// be empty once the last instruction has run. Before an instruction that
/// writes lines runs, side-effecting values it does not consume are bound to
/// temporaries so every effect stays in program order.
pub fn generate_function(func: &Function, engine: &Engine<'_>, code_gen: &mut CodeGenerator<'_>) -> DecompileResult<()> {
    code_gen.begin_function();
    let signature = code_gen.construct_func_signature(func);
    code_gen.open_block(signature);

    let mut stack = ValueStack::new();
    for n in 0..func.param_count {
        stack.push(Value::Arg(n));
    }

    for (index, inst) in func.instructions.iter().enumerate() {
        emit_markers(func, index, code_gen);
        if inst.emits_output() {
            let operands = inst.stack_effect().pops as usize;
            stack.bind_pending_effects(operands, code_gen);
        }
        inst.process_inst(func, &mut stack, engine, code_gen)?;
    }
    emit_markers(func, func.instructions.len(), code_gen);

    if !stack.is_empty() {
        return Err(DecompileError::StackImbalance {
            address: func.end,
            depth: stack.len(),
        });
    }
    code_gen.close_block("end");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_indent_by_four() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        code_gen.open_block("if x then");
        code_gen.add_output_line("a()");
        code_gen.else_block();
        code_gen.add_output_line("b()");
        code_gen.close_block("end");
        assert_eq!(code_gen.lines(), ["if x then", "    a()", "else", "    b()", "end"]);
    }

    #[test]
    fn rollback_discards_partial_output() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        code_gen.add_output_line("kept()");
        let cp = code_gen.checkpoint();
        code_gen.open_block("function f()");
        code_gen.add_output_line("dropped()");
        code_gen.rollback(cp);
        code_gen.add_output_line("next()");
        assert_eq!(code_gen.lines(), ["kept()", "next()"]);
    }

    #[test]
    fn empty_lines_carry_no_indent() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        code_gen.open_block("do");
        code_gen.add_output_line("");
        assert_eq!(code_gen.lines()[1], "");
    }

    #[test]
    fn temps_restart_per_function() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        assert_eq!(code_gen.next_temp(), 0);
        assert_eq!(code_gen.next_temp(), 1);
        code_gen.begin_function();
        assert_eq!(code_gen.next_temp(), 0);
    }

    #[test]
    fn default_names() {
        assert_eq!(DefaultDialect.function_name(3, 0x1a), "func_001a");
        assert_eq!(DefaultDialect.label_name(0x102), "label_0102");
        assert_eq!(param_list(3), "arg0, arg1, arg2");
        assert_eq!(param_list(0), "");
    }

    #[test]
    fn best_effort_note() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        code_gen.add_best_effort_line("camera:fade(1)", "adjust");
        assert_eq!(code_gen.lines(), ["camera:fade(1) -- best-effort: adjust"]);
    }
}
