//! Field-script target.
//!
//! Adds the camera, window and field opcode families on top of the generic
//! instructions, the kernel routine table, and the Lua-flavoured dialect the
//! generated scripts are written in.

mod camera;
mod dialect;
mod field;
mod window;

use fieldscript::operand::{Bank, Banked};
use fieldscript::Opcode;
use scriptlift_core::engine::{Engine, InstFactory, KernelSignature, Registry, Target};
use scriptlift_core::inst::register_core_instructions;
use scriptlift_core::{Dialect, Value};
use tracing::debug;

pub use camera::{Fade, Scroll2d, ScrollWait, ViewOffset};
pub use dialect::FieldDialect;
pub use field::{Battle, BattleMode, MapJump};
pub use window::{Message, WindowClose, WindowMode, WindowOpen};

/// Variable bank holding system registers; reads have side effects.
pub const SYSTEM_BANK: u8 = 15;

/// Header accessors shared by every instruction struct with a `header` field.
macro_rules! inst_header {
    () => {
        fn header(&self) -> &scriptlift_core::InstHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut scriptlift_core::InstHeader {
            &mut self.header
        }
    };
}
pub(crate) use inst_header;

/// Resolve a banked operand to a literal or variable value.
pub(crate) fn banked(bank: Bank, raw: i32, engine: &Engine<'_>) -> Value {
    Value::from_banked(Banked::new(bank, raw), engine)
}

/// Register the camera, window and field opcode families.
pub fn register_field_instructions(factory: &mut InstFactory) {
    factory.add_entry::<Message>(Opcode::Message.as_u8());
    factory.add_entry::<WindowOpen>(Opcode::Window.as_u8());
    factory.add_entry::<WindowMode>(Opcode::WMode.as_u8());
    factory.add_entry::<WindowClose>(Opcode::Wcls.as_u8());

    factory.add_entry::<MapJump>(Opcode::MapJump.as_u8());
    factory.add_entry::<Battle>(Opcode::Battle.as_u8());
    factory.add_entry::<BattleMode>(Opcode::BtlOn.as_u8());

    factory.add_entry::<Scroll2d>(Opcode::Scr2d.as_u8());
    factory.add_entry::<ScrollWait>(Opcode::Scrlw.as_u8());
    factory.add_entry::<ViewOffset>(Opcode::Vwoft.as_u8());
    factory.add_entry::<Fade>(Opcode::Fade.as_u8());
}

/// Kernel routines reachable through `KCALL` / `KCALLV`, keyed by id.
pub fn kernel_table() -> Vec<(u8, KernelSignature)> {
    vec![
        (0, KernelSignature::new("script:wait", 1, "f")),
        (1, KernelSignature::new("audio:play_music", 1, "_")),
        (2, KernelSignature::new("audio:play_sound", 2, "__")),
        (3, KernelSignature::new("entity:set_speed", 2, "_s")),
        (4, KernelSignature::new("entity:turn_to", 2, "_d")),
        (5, KernelSignature::new("game:random", 0, "").returning()),
        (6, KernelSignature::new("game:has_item", 1, "_").returning()),
    ]
}

/// The field target: registry plus dialect. Build once and share.
pub struct FieldTarget {
    registry: Registry,
    dialect: FieldDialect,
}

impl FieldTarget {
    pub fn new() -> Self {
        let mut registry = Registry::new("field");
        register_core_instructions(registry.factory_mut());
        register_field_instructions(registry.factory_mut());
        for (id, signature) in kernel_table() {
            registry.add_kernel(id, signature);
        }
        registry.mark_volatile_bank(SYSTEM_BANK);
        debug!(opcodes = registry.factory().len(), "field target ready");
        Self {
            registry,
            dialect: FieldDialect,
        }
    }
}

impl Default for FieldTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl Target for FieldTarget {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_known_opcode() {
        let target = FieldTarget::new();
        for byte in 0..=u8::MAX {
            if Opcode::from_u8(byte).is_some() {
                assert!(target.registry().factory().contains(&byte), "{byte:#04x} not registered");
            }
        }
    }

    #[test]
    fn kernel_table_and_volatile_bank() {
        let target = FieldTarget::new();
        let registry = target.registry();
        assert_eq!(registry.kernel(0).map(|k| k.name.as_str()), Some("script:wait"));
        assert!(registry.kernel(5).is_some_and(|k| k.returns_value));
        assert!(registry.kernel(7).is_none());
        assert!(registry.is_volatile_bank(SYSTEM_BANK));
        assert!(!registry.is_volatile_bank(1));
        assert_eq!(target.name(), "field");
    }
}
