//! Script-level driver: split a script into functions, decode, seal and
//! generate each one, and collect per-function failures.

use std::collections::BTreeMap;
use std::fmt;

use fieldscript::Script;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::codegen::{generate_function, CodeGenerator, Dialect};
use crate::config::GeneratorConfig;
use crate::engine::{Engine, Target};
use crate::error::{DecompileError, DecompileResult};
use crate::function::{decode_function, Function};

/// A function that could not be decompiled.
#[derive(Debug)]
pub struct FunctionFailure {
    pub function: String,
    pub address: u32,
    pub error: DecompileError,
}

impl fmt::Display for FunctionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x}): {}", self.function, self.address, self.error)
    }
}

/// Result of decompiling (or disassembling) one script.
#[derive(Debug)]
pub struct ScriptReport {
    pub name: String,
    pub output: String,
    pub functions_ok: usize,
    pub failures: Vec<FunctionFailure>,
}

impl ScriptReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entry address → function name, in address order.
pub fn function_table(script: &Script, dialect: &dyn Dialect) -> BTreeMap<u32, String> {
    let code_len = script.code.len() as u32;
    let mut entries: Vec<u32> = script.entries.iter().copied().filter(|&e| e < code_len).collect();
    if entries.len() != script.entries.len() {
        warn!(script = %script.name, "ignoring entry points past the end of the code");
    }
    entries.sort_unstable();
    entries.dedup();
    entries
        .into_iter()
        .enumerate()
        .map(|(index, address)| (address, dialect.function_name(index, address)))
        .collect()
}

/// `(name, start, end)` for each function.
fn function_spans(functions: &BTreeMap<u32, String>, code_len: u32) -> Vec<(String, u32, u32)> {
    let starts: Vec<u32> = functions.keys().copied().collect();
    functions
        .iter()
        .enumerate()
        .map(|(i, (&start, name))| {
            let end = starts.get(i + 1).copied().unwrap_or(code_len);
            (name.clone(), start, end)
        })
        .collect()
}

fn decode_and_seal(engine: &Engine<'_>, script: &Script, name: &str, start: u32, end: u32) -> DecompileResult<Function> {
    let mut func = decode_function(engine, &script.code, name, start, end)?;
    func.seal(engine)?;
    Ok(func)
}

fn record_failure(
    script: &Script,
    failures: &mut Vec<FunctionFailure>,
    function: String,
    address: u32,
    error: DecompileError,
) -> String {
    warn!(
        script = %script.name,
        function = %function,
        address = format_args!("{address:#06x}"),
        kind = error.kind(),
        "{error}"
    );
    let comment = format!("-- {function}: {error}");
    failures.push(FunctionFailure {
        function,
        address,
        error,
    });
    comment
}

/// Decompile every function of `script`. A failing function is replaced in
/// the output by a one-line comment; the others are unaffected.
pub fn decompile_script(target: &dyn Target, script: &Script, config: GeneratorConfig) -> ScriptReport {
    let functions = function_table(script, target.dialect());
    let spans = function_spans(&functions, script.code.len() as u32);
    let engine = Engine::new(target.registry(), functions);
    let mut code_gen = CodeGenerator::new(config, target.dialect());
    let mut failures = Vec::new();
    let mut functions_ok = 0;

    for (i, (name, start, end)) in spans.into_iter().enumerate() {
        if i > 0 {
            code_gen.add_output_line("");
        }
        let checkpoint = code_gen.checkpoint();
        let result = decode_and_seal(&engine, script, &name, start, end)
            .and_then(|func| generate_function(&func, &engine, &mut code_gen));
        match result {
            Ok(()) => functions_ok += 1,
            Err(error) => {
                code_gen.rollback(checkpoint);
                let comment = record_failure(script, &mut failures, name, start, error);
                code_gen.add_output_line(comment);
            }
        }
    }

    info!(
        script = %script.name,
        target = target.name(),
        functions = functions_ok + failures.len(),
        failed = failures.len(),
        "decompiled script"
    );
    ScriptReport {
        name: script.name.clone(),
        output: join_lines(code_gen.into_lines()),
        functions_ok,
        failures,
    }
}

/// Decompile independent scripts in parallel. Reports come back in input
/// order.
pub fn decompile_batch(target: &dyn Target, scripts: &[Script], config: GeneratorConfig) -> Vec<ScriptReport> {
    scripts
        .par_iter()
        .map(|script| decompile_script(target, script, config))
        .collect()
}

/// List every function's decoded instructions.
pub fn disassemble(target: &dyn Target, script: &Script) -> ScriptReport {
    let functions = function_table(script, target.dialect());
    let spans = function_spans(&functions, script.code.len() as u32);
    let engine = Engine::new(target.registry(), functions);
    let mut lines = Vec::new();
    let mut failures = Vec::new();
    let mut functions_ok = 0;

    for (i, (name, start, end)) in spans.into_iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        match decode_and_seal(&engine, script, &name, start, end) {
            Ok(func) => {
                lines.push(format!("{name}:"));
                lines.extend(func.instructions.iter().map(|inst| format!("    {inst}")));
                functions_ok += 1;
            }
            Err(error) => lines.push(record_failure(script, &mut failures, name, start, error)),
        }
    }

    ScriptReport {
        name: script.name.clone(),
        output: join_lines(lines),
        functions_ok,
        failures,
    }
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::DefaultDialect;

    #[test]
    fn table_sorts_and_dedups_entries() {
        let script = Script::from_raw("s", vec![0; 16], vec![8, 0, 8, 4, 99]);
        let table = function_table(&script, &DefaultDialect);
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), [0, 4, 8]);
        assert_eq!(table[&4], "func_0004");
    }

    #[test]
    fn spans_run_to_next_entry() {
        let table = BTreeMap::from([(0, "a".to_owned()), (4, "b".to_owned())]);
        assert_eq!(
            function_spans(&table, 10),
            [("a".to_owned(), 0, 4), ("b".to_owned(), 4, 10)]
        );
    }
}
