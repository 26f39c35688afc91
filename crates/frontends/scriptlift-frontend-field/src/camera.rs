use std::fmt;

use fieldscript::operand::split_banks;
use fieldscript::Cursor;
use scriptlift_core::{CodeGenerator, DecompileResult, Engine, Function, InstHeader, Instruction, Value, ValueStack};

use crate::{banked, inst_header};

fn args(values: &[&Value]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

/// `SCR2D`: scroll the camera to a point.
#[derive(Debug, Default)]
pub struct Scroll2d {
    header: InstHeader,
    x: Option<Value>,
    y: Option<Value>,
}

impl Instruction for Scroll2d {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        let (bx, by) = split_banks(cur.read_u8()?);
        self.x = Some(banked(bx, i32::from(cur.read_i16()?), engine));
        self.y = Some(banked(by, i32::from(cur.read_i16()?), engine));
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let (Some(x), Some(y)) = (&self.x, &self.y) else {
            return Err(self.header.malformed("operands not decoded"));
        };
        code_gen.add_output_line(format!("camera:scroll_to({})", args(&[x, y])));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())?;
        if let (Some(x), Some(y)) = (&self.x, &self.y) {
            write!(f, " x={x} y={y}")?;
        }
        Ok(())
    }
}

/// `SCRLW`: block until the current scroll finishes.
#[derive(Debug, Default)]
pub struct ScrollWait {
    header: InstHeader,
}

impl Instruction for ScrollWait {
    inst_header!();

    fn decode_operands(&mut self, _cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line("camera:wait_for_scroll()");
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())
    }
}

/// `VWOFT`: offset the view. Bank byte high nibble selects Y, low nibble X.
///
/// The last byte is only known to shape the transition; it is emitted as is
/// and flagged.
#[derive(Debug, Default)]
pub struct ViewOffset {
    header: InstHeader,
    y: Option<Value>,
    x: Option<Value>,
    s: u8,
}

impl Instruction for ViewOffset {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        let (by, bx) = split_banks(cur.read_u8()?);
        self.y = Some(banked(by, i32::from(cur.read_i16()?), engine));
        self.x = Some(banked(bx, i32::from(cur.read_i16()?), engine));
        self.s = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        let (Some(y), Some(x)) = (&self.y, &self.x) else {
            return Err(self.header.malformed("operands not decoded"));
        };
        let s = Value::Int(i32::from(self.s));
        code_gen.add_best_effort_line(
            format!("camera:view_offset({})", args(&[y, x, &s])),
            "third argument read as transition speed",
        );
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())?;
        if let (Some(y), Some(x)) = (&self.y, &self.x) {
            write!(f, " y={y} x={x} s={}", self.s)?;
        }
        Ok(())
    }
}

/// `FADE`: screen fade. Two bank bytes cover r, g (first byte) and b (high
/// nibble of the second); the second byte's low nibble is reserved.
#[derive(Debug, Default)]
pub struct Fade {
    header: InstHeader,
    rgb: Vec<Value>,
    speed: u8,
    kind: u8,
    adjust: u8,
}

impl Instruction for Fade {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, engine: &Engine<'_>) -> DecompileResult<()> {
        let (br, bg) = split_banks(cur.read_u8()?);
        let (bb, reserved) = split_banks(cur.read_u8()?);
        if !reserved.is_literal() {
            return Err(self
                .header
                .malformed(format!("reserved bank nibble is {}, expected 0", reserved.index())));
        }
        let r = banked(br, i32::from(cur.read_u8()?), engine);
        let g = banked(bg, i32::from(cur.read_u8()?), engine);
        let b = banked(bb, i32::from(cur.read_u8()?), engine);
        self.rgb = vec![r, g, b];
        self.speed = cur.read_u8()?;
        self.kind = cur.read_u8()?;
        self.adjust = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        if self.rgb.len() != 3 {
            return Err(self.header.malformed("operands not decoded"));
        }
        let rest = [self.speed, self.kind, self.adjust].map(|n| Value::Int(i32::from(n)));
        let all: Vec<&Value> = self.rgb.iter().chain(rest.iter()).collect();
        code_gen.add_best_effort_line(format!("camera:fade({})", args(&all)), "meaning of adjust is unknown");
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header.mnemonic())?;
        if let [r, g, b] = self.rgb.as_slice() {
            write!(
                f,
                " r={r} g={g} b={b} speed={} type={} adjust={}",
                self.speed, self.kind, self.adjust
            )?;
        }
        Ok(())
    }
}
