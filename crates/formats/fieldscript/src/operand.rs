/// A 4-bit bank selector. Bank 0 means the paired operand is a literal;
/// any other bank names the variable bank the operand's low byte indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bank(u8);

impl Bank {
    pub const LITERAL: Bank = Bank(0);

    /// Build a bank from a nibble. Upper bits are masked off.
    pub fn new(nibble: u8) -> Self {
        Self(nibble & 0x0F)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_literal(self) -> bool {
        self.0 == 0
    }
}

/// Split a packed bank byte into `(high, low)` selectors.
///
/// ```text
/// 0x12 → (Bank(1), Bank(2))
/// 0x00 → (literal, literal)
/// ```
pub fn split_banks(packed: u8) -> (Bank, Bank) {
    (Bank::new(packed >> 4), Bank::new(packed))
}

/// A decoded banked operand: either an immediate or a variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banked {
    Literal(i32),
    Variable { bank: u8, address: u8 },
}

impl Banked {
    /// Pair a raw operand with its bank selector. Variable slots use the low
    /// byte of the raw operand as their address.
    pub fn new(bank: Bank, raw: i32) -> Self {
        if bank.is_literal() {
            Self::Literal(raw)
        } else {
            Self::Variable {
                bank: bank.index(),
                address: (raw & 0xFF) as u8,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_packed_banks() {
        let (hi, lo) = split_banks(0x12);
        assert_eq!(hi.index(), 1);
        assert_eq!(lo.index(), 2);
        let (hi, lo) = split_banks(0x00);
        assert!(hi.is_literal());
        assert!(lo.is_literal());
    }

    #[test]
    fn banked_literal_keeps_sign() {
        assert_eq!(Banked::new(Bank::LITERAL, -5), Banked::Literal(-5));
    }

    #[test]
    fn banked_variable_uses_low_byte() {
        assert_eq!(
            Banked::new(Bank::new(3), 0x1234),
            Banked::Variable { bank: 3, address: 0x34 }
        );
    }
}
