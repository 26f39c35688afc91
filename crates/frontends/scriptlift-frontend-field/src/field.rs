use std::fmt;

use fieldscript::operand::Bank;
use fieldscript::Cursor;
use scriptlift_core::{CodeGenerator, DecompileResult, Engine, Function, InstHeader, Instruction, Value, ValueStack};

use crate::{banked, inst_header};

/// `MAPJUMP`: move the party to another field map.
#[derive(Debug, Default)]
pub struct MapJump {
    header: InstHeader,
    field: u16,
    x: i16,
    y: i16,
    triangle: u16,
    direction: u8,
}

impl Instruction for MapJump {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.field = cur.read_u16()?;
        self.x = cur.read_i16()?;
        self.y = cur.read_i16()?;
        self.triangle = cur.read_u16()?;
        self.direction = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let values = [
            i32::from(self.field),
            i32::from(self.x),
            i32::from(self.y),
            i32::from(self.triangle),
            i32::from(self.direction),
        ]
        .map(Value::Int);
        let rendered = code_gen.format_args(&self.header, &values, "____d");
        code_gen.add_output_line(format!("field:jump_to_map({rendered})"));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} field={} x={} y={} triangle={} dir={}",
            self.header.mnemonic(),
            self.field,
            self.x,
            self.y,
            self.triangle,
            self.direction
        )
    }
}

/// `BATTLE`: start battle `n` (low bank nibble selects a variable).
#[derive(Debug, Default)]
pub struct Battle {
    header: InstHeader,
    battle: Option<Value>,
}

impl Instruction for Battle {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        let bank = Bank::new(cur.read_u8()?);
        self.battle = Some(banked(bank, i32::from(cur.read_u16()?), engine));
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let battle = self.battle.as_ref().ok_or_else(|| self.header.malformed("operands not decoded"))?;
        code_gen.add_output_line(format!("field:battle({battle})"));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())?;
        if let Some(battle) = &self.battle {
            write!(f, " battle={battle}")?;
        }
        Ok(())
    }
}

/// `BTLON`: toggle random encounters. The flag is inverted: 0 enables.
#[derive(Debug, Default)]
pub struct BattleMode {
    header: InstHeader,
    enabled: bool,
}

impl Instruction for BattleMode {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.enabled = match cur.read_u8()? {
            0 => true,
            1 => false,
            other => return Err(self.header.malformed(format!("encounter flag must be 0 or 1, got {other}"))),
        };
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line(format!("field:random_encounters({})", self.enabled));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} enabled={}", self.header.mnemonic(), self.enabled)
    }
}
