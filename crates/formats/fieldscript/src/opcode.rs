/// Opcodes of the field-script VM.
///
/// Every opcode is a single byte followed by a fixed operand layout, except
/// `PushS` whose length byte sizes the string that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Returns and calls
    Ret = 0x00,
    RetV = 0x01,
    Call = 0x02,
    CallV = 0x03,
    KCall = 0x04,
    KCallV = 0x05,

    // Stack
    PushB = 0x08,
    PushW = 0x09,
    PushV = 0x0A,
    PushS = 0x0B,
    Store = 0x0C,
    Dup = 0x0D,
    Popz = 0x0E,
    Not = 0x0F,

    // Jumps (offsets relative to the byte after the opcode, or backwards from it)
    Jmpf = 0x10,
    Jmpfl = 0x11,
    Jmpb = 0x12,
    Jmpbl = 0x13,
    Jmpz = 0x14,
    Jmpnz = 0x15,

    // Arithmetic/logic (two-operand)
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Mod = 0x24,
    BAnd = 0x25,
    BOr = 0x26,
    BXor = 0x27,
    Shl = 0x28,
    Shr = 0x29,
    Eq = 0x2A,
    Ne = 0x2B,
    Lt = 0x2C,
    Gt = 0x2D,
    Le = 0x2E,
    Ge = 0x2F,
    LAnd = 0x30,
    LOr = 0x31,

    // Window
    Message = 0x40,
    Window = 0x50,
    WMode = 0x52,
    Wcls = 0x55,

    // Field
    MapJump = 0x60,
    Battle = 0x70,
    BtlOn = 0x71,

    // Camera
    Scr2d = 0x64,
    Scrlw = 0x67,
    Vwoft = 0x6A,
    Fade = 0x6B,
}

impl Opcode {
    /// Decode an opcode byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Ret),
            0x01 => Some(Self::RetV),
            0x02 => Some(Self::Call),
            0x03 => Some(Self::CallV),
            0x04 => Some(Self::KCall),
            0x05 => Some(Self::KCallV),
            0x08 => Some(Self::PushB),
            0x09 => Some(Self::PushW),
            0x0A => Some(Self::PushV),
            0x0B => Some(Self::PushS),
            0x0C => Some(Self::Store),
            0x0D => Some(Self::Dup),
            0x0E => Some(Self::Popz),
            0x0F => Some(Self::Not),
            0x10 => Some(Self::Jmpf),
            0x11 => Some(Self::Jmpfl),
            0x12 => Some(Self::Jmpb),
            0x13 => Some(Self::Jmpbl),
            0x14 => Some(Self::Jmpz),
            0x15 => Some(Self::Jmpnz),
            0x20 => Some(Self::Add),
            0x21 => Some(Self::Sub),
            0x22 => Some(Self::Mul),
            0x23 => Some(Self::Div),
            0x24 => Some(Self::Mod),
            0x25 => Some(Self::BAnd),
            0x26 => Some(Self::BOr),
            0x27 => Some(Self::BXor),
            0x28 => Some(Self::Shl),
            0x29 => Some(Self::Shr),
            0x2A => Some(Self::Eq),
            0x2B => Some(Self::Ne),
            0x2C => Some(Self::Lt),
            0x2D => Some(Self::Gt),
            0x2E => Some(Self::Le),
            0x2F => Some(Self::Ge),
            0x30 => Some(Self::LAnd),
            0x31 => Some(Self::LOr),
            0x40 => Some(Self::Message),
            0x50 => Some(Self::Window),
            0x52 => Some(Self::WMode),
            0x55 => Some(Self::Wcls),
            0x60 => Some(Self::MapJump),
            0x64 => Some(Self::Scr2d),
            0x67 => Some(Self::Scrlw),
            0x6A => Some(Self::Vwoft),
            0x6B => Some(Self::Fade),
            0x70 => Some(Self::Battle),
            0x71 => Some(Self::BtlOn),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Upper-case assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Ret => "RET",
            Self::RetV => "RETV",
            Self::Call => "CALL",
            Self::CallV => "CALLV",
            Self::KCall => "KCALL",
            Self::KCallV => "KCALLV",
            Self::PushB => "PUSHB",
            Self::PushW => "PUSHW",
            Self::PushV => "PUSHV",
            Self::PushS => "PUSHS",
            Self::Store => "STORE",
            Self::Dup => "DUP",
            Self::Popz => "POPZ",
            Self::Not => "NOT",
            Self::Jmpf => "JMPF",
            Self::Jmpfl => "JMPFL",
            Self::Jmpb => "JMPB",
            Self::Jmpbl => "JMPBL",
            Self::Jmpz => "JMPZ",
            Self::Jmpnz => "JMPNZ",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::BAnd => "BAND",
            Self::BOr => "BOR",
            Self::BXor => "BXOR",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Ge => "GE",
            Self::LAnd => "LAND",
            Self::LOr => "LOR",
            Self::Message => "MESSAGE",
            Self::Window => "WINDOW",
            Self::WMode => "WMODE",
            Self::Wcls => "WCLS",
            Self::MapJump => "MAPJUMP",
            Self::Battle => "BATTLE",
            Self::BtlOn => "BTLON",
            Self::Scr2d => "SCR2D",
            Self::Scrlw => "SCRLW",
            Self::Vwoft => "VWOFT",
            Self::Fade => "FADE",
        }
    }

    /// Whether this is one of the two-operand stack operators.
    pub fn is_binary(self) -> bool {
        matches!(self.as_u8(), 0x20..=0x31)
    }
}

/// Mnemonic for a raw opcode byte, or `"???"` for unknown bytes.
pub fn mnemonic_of(v: u8) -> &'static str {
    Opcode::from_u8(v).map(Opcode::mnemonic).unwrap_or("???")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_round_trips_every_known_byte() {
        for b in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(b) {
                assert_eq!(op.as_u8(), b, "{op:?}");
            }
        }
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert_eq!(Opcode::from_u8(0x06), None);
        assert_eq!(Opcode::from_u8(0xFE), None);
        assert_eq!(mnemonic_of(0xFE), "???");
    }

    #[test]
    fn binary_range() {
        assert!(Opcode::Add.is_binary());
        assert!(Opcode::LOr.is_binary());
        assert!(!Opcode::Not.is_binary());
        assert!(!Opcode::Message.is_binary());
    }
}
