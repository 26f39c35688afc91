//! Decompilation through the generic instruction set and default dialect.

use fieldscript::Script;
use scriptlift_core::inst::register_core_instructions;
use scriptlift_core::{decompile_script, DefaultDialect, Dialect, GeneratorConfig, KernelSignature, Registry, Target};

struct CoreTarget {
    registry: Registry,
}

impl CoreTarget {
    fn new() -> Self {
        let mut registry = Registry::new("core");
        register_core_instructions(registry.factory_mut());
        registry.add_kernel(0, KernelSignature::new("print", 1, "_"));
        Self { registry }
    }
}

impl Target for CoreTarget {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn dialect(&self) -> &dyn Dialect {
        &DefaultDialect
    }
}

fn decompile(code: Vec<u8>, entries: Vec<u32>) -> String {
    let target = CoreTarget::new();
    let report = decompile_script(&target, &Script::from_raw("t", code, entries), GeneratorConfig::default());
    assert!(report.is_clean(), "{:?}", report.failures);
    report.output
}

#[test]
fn default_signature_and_names() {
    // STORE var[1][0]; RET, one inferred parameter
    let output = decompile(vec![0x0C, 0x01, 0x00, 0x00], vec![0]);
    assert_eq!(output, "function func_0000(arg0)\n    var[1][0] = arg0\nend\n");
}

#[test]
fn string_literals_are_quoted() {
    // PUSHS "hi"; KCALL print
    let output = decompile(vec![0x0B, 0x02, b'h', b'i', 0x04, 0x00, 0x01, 0x00], vec![0]);
    assert!(output.contains("print(\"hi\")"), "{output}");
}

#[test]
fn precedence_survives_nesting() {
    // PUSHB 1; PUSHB 2; ADD; PUSHB 3; MUL; STORE var[1][0]; RET
    let output = decompile(vec![0x08, 1, 0x08, 2, 0x20, 0x08, 3, 0x22, 0x0C, 0x01, 0x00, 0x00], vec![0]);
    assert!(output.contains("var[1][0] = (1 + 2) * 3"), "{output}");
}

#[test]
fn popz_keeps_side_effects_only() {
    // KCALLV 9 argc 0 (unknown kernel); POPZ; PUSHB 4; POPZ; RET
    let output = decompile(vec![0x05, 0x09, 0x00, 0x0E, 0x08, 0x04, 0x0E, 0x00], vec![0]);
    assert_eq!(output, "function func_0000()\n    kernel_9()\nend\n");
}

#[test]
fn nested_if_closes_inner_block_first() {
    let code = vec![
        0x0A, 0x01, 0x00, // 0: PUSHV var[1][0]
        0x14, 0x12, 0x00, // 3: JMPZ → 22
        0x0A, 0x01, 0x01, // 6: PUSHV var[1][1]
        0x14, 0x07, 0x00, // 9: JMPZ → 17
        0x08, 0x01, // 12: PUSHB 1
        0x04, 0x00, 0x01, // 14: KCALL print
        0x08, 0x02, // 17: PUSHB 2
        0x04, 0x00, 0x01, // 19: KCALL print
        0x00, // 22: RET
    ];
    let output = decompile(code, vec![0]);
    assert_eq!(
        output,
        "function func_0000()\n    if var[1][0] then\n        if var[1][1] then\n            print(1)\n        end\n        print(2)\n    end\nend\n"
    );
}
