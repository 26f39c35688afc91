use std::collections::{BTreeMap, HashMap, HashSet};

use crate::codegen::Dialect;
use crate::factory::ObjectFactory;
use crate::inst::Instruction;

/// Opcode byte → instruction constructor.
pub type InstFactory = ObjectFactory<u8, dyn Instruction>;

/// Signature of a built-in engine routine reached through `KCALL`/`KCALLV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    pub name: String,
    pub argc: u8,
    /// One annotation marker per argument (see `Dialect::process_special_metadata`).
    pub metadata: String,
    pub returns_value: bool,
}

impl KernelSignature {
    pub fn new(name: impl Into<String>, argc: u8, metadata: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argc,
            metadata: metadata.into(),
            returns_value: false,
        }
    }

    pub fn returning(mut self) -> Self {
        self.returns_value = true;
        self
    }
}

/// Everything a target knows about its bytecode that does not change
/// between scripts: the opcode factory, the kernel call table and which
/// variable banks are volatile.
///
/// Built once; shared read-only by every decompilation run.
pub struct Registry {
    name: String,
    factory: InstFactory,
    kernels: HashMap<u8, KernelSignature>,
    volatile_banks: HashSet<u8>,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: InstFactory::new(),
            kernels: HashMap::new(),
            volatile_banks: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &InstFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut InstFactory {
        &mut self.factory
    }

    pub fn add_kernel(&mut self, id: u8, signature: KernelSignature) {
        self.kernels.insert(id, signature);
    }

    pub fn kernel(&self, id: u8) -> Option<&KernelSignature> {
        self.kernels.get(&id)
    }

    pub fn mark_volatile_bank(&mut self, bank: u8) {
        self.volatile_banks.insert(bank);
    }

    pub fn is_volatile_bank(&self, bank: u8) -> bool {
        self.volatile_banks.contains(&bank)
    }

    pub fn create_instruction(&self, opcode: u8) -> Option<Box<dyn Instruction>> {
        self.factory.create(&opcode)
    }
}

/// A decompilation target: its registry plus its code-generation dialect.
pub trait Target: Send + Sync {
    fn registry(&self) -> &Registry;

    fn dialect(&self) -> &dyn Dialect;

    fn name(&self) -> &str {
        self.registry().name()
    }
}

/// Per-run decode context: the shared registry and the current script's
/// function table (entry address → function name).
pub struct Engine<'r> {
    registry: &'r Registry,
    functions: BTreeMap<u32, String>,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r Registry, functions: BTreeMap<u32, String>) -> Self {
        Self { registry, functions }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn kernel(&self, id: u8) -> Option<&'r KernelSignature> {
        self.registry.kernel(id)
    }

    pub fn is_volatile_bank(&self, bank: u8) -> bool {
        self.registry.is_volatile_bank(bank)
    }

    pub fn is_function_entry(&self, address: u32) -> bool {
        self.functions.contains_key(&address)
    }

    pub fn function_name(&self, address: u32) -> Option<&str> {
        self.functions.get(&address).map(String::as_str)
    }
}
