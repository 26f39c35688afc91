use std::fmt;

use fieldscript::Cursor;
use scriptlift_core::{CodeGenerator, DecompileResult, Engine, Function, InstHeader, Instruction, ValueStack};

use crate::inst_header;

/// `MESSAGE`: show dialog text `dialog` in window `window`.
#[derive(Debug, Default)]
pub struct Message {
    header: InstHeader,
    window: u8,
    dialog: u8,
}

impl Instruction for Message {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.window = cur.read_u8()?;
        self.dialog = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line(format!("dialog:message({}, {})", self.window, self.dialog));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} window={} dialog={}", self.header.mnemonic(), self.window, self.dialog)
    }
}

/// `WINDOW`: create or resize a window.
#[derive(Debug, Default)]
pub struct WindowOpen {
    header: InstHeader,
    id: u8,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
}

impl Instruction for WindowOpen {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.id = cur.read_u8()?;
        self.x = cur.read_u16()?;
        self.y = cur.read_u16()?;
        self.width = cur.read_u16()?;
        self.height = cur.read_u16()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line(format!(
            "dialog:window({}, {}, {}, {}, {})",
            self.id, self.x, self.y, self.width, self.height
        ));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} id={} x={} y={} w={} h={}",
            self.header.mnemonic(),
            self.id,
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

const WINDOW_MODES: [&str; 3] = ["normal", "no_frame", "transparent"];

/// `WMODE`: window frame style and whether the player may close it.
#[derive(Debug, Default)]
pub struct WindowMode {
    header: InstHeader,
    id: u8,
    mode: &'static str,
    closable: bool,
}

impl Instruction for WindowMode {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.id = cur.read_u8()?;
        let mode = cur.read_u8()?;
        self.mode = WINDOW_MODES
            .get(usize::from(mode))
            .copied()
            .ok_or_else(|| self.header.malformed(format!("unknown window mode {mode}")))?;
        self.closable = cur.read_u8()? != 0;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line(format!("dialog:set_mode({}, {:?}, {})", self.id, self.mode, self.closable));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} id={} mode={} closable={}",
            self.header.mnemonic(),
            self.id,
            self.mode,
            self.closable
        )
    }
}

/// `WCLS`: close a window.
#[derive(Debug, Default)]
pub struct WindowClose {
    header: InstHeader,
    id: u8,
}

impl Instruction for WindowClose {
    inst_header!();

    fn decode_operands(&mut self, cur: &mut Cursor<'_>, _engine: &Engine<'_>) -> DecompileResult<()> {
        self.id = cur.read_u8()?;
        Ok(())
    }

    fn process_inst(
        &self,
        _func: &Function,
        _stack: &mut ValueStack,
        _engine: &Engine<'_>,
        code_gen: &mut CodeGenerator<'_>,
    ) -> DecompileResult<()> {
        code_gen.add_output_line(format!("dialog:close({})", self.id));
        Ok(())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id={}", self.header.mnemonic(), self.id)
    }
}
