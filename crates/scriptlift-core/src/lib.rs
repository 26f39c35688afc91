//! Stack-machine bytecode decompiler.
//!
//! Pipeline: raw bytes → instructions (built by the target's opcode
//! factory) → sealed [`Function`]s with recovered block structure →
//! pseudocode lines from the [`CodeGenerator`].
//!
//! Targets plug in through [`Target`]: a read-only [`Registry`] of opcodes
//! and kernel routines plus a [`Dialect`] for target-specific output.

pub mod codegen;
pub mod config;
pub mod decompile;
pub mod engine;
pub mod error;
pub mod factory;
pub mod function;
pub mod inst;
pub mod stack;
pub mod structure;
pub mod value;

pub use codegen::{CodeGenerator, DefaultDialect, Dialect};
pub use config::{ArgOrder, GeneratorConfig};
pub use decompile::{decompile_batch, decompile_script, disassemble, FunctionFailure, ScriptReport};
pub use engine::{Engine, KernelSignature, Registry, Target};
pub use error::{DecompileError, DecompileResult};
pub use function::Function;
pub use inst::{InstHeader, Instruction, StackEffect};
pub use stack::ValueStack;
pub use value::{BinaryOp, Value, VariableRef};
