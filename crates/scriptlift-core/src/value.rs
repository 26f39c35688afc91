//! Symbolic values living on the simulated VM stack.
//!
//! Values are expression trees. They are never mutated once built; an
//! instruction that consumes a value takes ownership of it.

use std::fmt;

use fieldscript::operand::Banked;

use crate::codegen::CodeGenerator;
use crate::engine::Engine;

/// A variable slot: `var[bank][address]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub bank: u8,
    pub address: u8,
    /// Reading this slot has side effects (e.g. a hardware or RNG register).
    pub volatile: bool,
}

/// Binary operators, rendered with Lua-style tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "~",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge => 3,
            Self::BitOr => 4,
            Self::BitXor => 5,
            Self::BitAnd => 6,
            Self::Shl | Self::Shr => 7,
            Self::Add | Self::Sub => 8,
            Self::Mul | Self::Div | Self::Mod => 9,
        }
    }

    /// The comparison that holds exactly when `self` does not.
    fn inverse(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Ne),
            Self::Ne => Some(Self::Eq),
            Self::Lt => Some(Self::Ge),
            Self::Ge => Some(Self::Lt),
            Self::Gt => Some(Self::Le),
            Self::Le => Some(Self::Gt),
            _ => None,
        }
    }
}

const UNARY_PRECEDENCE: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer literal.
    Int(i32),
    /// String literal.
    Str(String),
    /// Variable read.
    Var(VariableRef),
    /// Inferred function parameter `argN`.
    Arg(u32),
    /// Temporary `temp_N` introduced when duplicating a non-repeatable value.
    Dup(u32),
    Binary {
        op: BinaryOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Not(Box<Value>),
    /// Call whose result is used as a value.
    Call { name: String, args: Vec<Value> },
}

impl Value {
    /// Build a value from a banked operand, consulting the engine for
    /// volatile banks.
    pub fn from_banked(operand: Banked, engine: &Engine<'_>) -> Self {
        match operand {
            Banked::Literal(n) => Self::Int(n),
            Banked::Variable { bank, address } => Self::Var(VariableRef {
                bank,
                address,
                volatile: engine.is_volatile_bank(bank),
            }),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Whether evaluating this value has an observable effect.
    pub fn has_side_effects(&self) -> bool {
        match self {
            Self::Call { .. } => true,
            Self::Var(var) => var.volatile,
            Self::Binary { lhs, rhs, .. } => lhs.has_side_effects() || rhs.has_side_effects(),
            Self::Not(inner) => inner.has_side_effects(),
            Self::Int(_) | Self::Str(_) | Self::Arg(_) | Self::Dup(_) => false,
        }
    }

    /// Whether the value can be written out twice without changing meaning
    /// or duplicating work.
    pub fn is_repeatable(&self) -> bool {
        match self {
            Self::Int(_) | Self::Str(_) | Self::Arg(_) | Self::Dup(_) => true,
            Self::Var(var) => !var.volatile,
            _ => false,
        }
    }

    /// Produce the handle used for both stack copies of a duplicated value.
    ///
    /// Repeatable values are returned as is. Anything else is first bound to
    /// a fresh temporary, and that binding line is written to `code_gen`
    /// before this returns, so the original expression is evaluated once.
    pub fn dup(self, code_gen: &mut CodeGenerator<'_>) -> Value {
        if self.is_repeatable() {
            return self;
        }
        self.bind(code_gen)
    }

    /// Evaluate the value now: write `local temp_N = <expr>` and return the
    /// `temp_N` handle. Temporaries are already bound and come back as is.
    pub fn bind(self, code_gen: &mut CodeGenerator<'_>) -> Value {
        if let Self::Dup(_) = self {
            return self;
        }
        let index = code_gen.next_temp();
        code_gen.add_output_line(format!("local temp_{index} = {self}"));
        Self::Dup(index)
    }

    /// Whether evaluating the value reads the slot `var`.
    pub fn reads(&self, var: VariableRef) -> bool {
        match self {
            Self::Var(v) => v.bank == var.bank && v.address == var.address,
            Self::Binary { lhs, rhs, .. } => lhs.reads(var) || rhs.reads(var),
            Self::Not(inner) => inner.reads(var),
            Self::Call { args, .. } => args.iter().any(|arg| arg.reads(var)),
            Self::Int(_) | Self::Str(_) | Self::Arg(_) | Self::Dup(_) => false,
        }
    }

    /// Logical negation, folding double negation and inverting comparisons.
    pub fn negate(self) -> Value {
        match self {
            Self::Not(inner) => *inner,
            Self::Binary { op, lhs, rhs } => match op.inverse() {
                Some(inv) => Self::Binary { op: inv, lhs, rhs },
                None => Self::Not(Box::new(Self::Binary { op, lhs, rhs })),
            },
            other => Self::Not(Box::new(other)),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Binary { op, .. } => op.precedence(),
            Self::Not(_) => UNARY_PRECEDENCE,
            _ => u8::MAX,
        }
    }
}

fn fmt_operand(value: &Value, parent: u8, right: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let prec = value.precedence();
    if prec < parent || (right && prec == parent) {
        write!(f, "({value})")
    } else {
        write!(f, "{value}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Var(var) => write!(f, "var[{}][{}]", var.bank, var.address),
            Self::Arg(n) => write!(f, "arg{n}"),
            Self::Dup(n) => write!(f, "temp_{n}"),
            Self::Binary { op, lhs, rhs } => {
                fmt_operand(lhs, op.precedence(), false, f)?;
                write!(f, " {} ", op.token())?;
                fmt_operand(rhs, op.precedence(), true, f)
            }
            Self::Not(inner) => {
                write!(f, "not ")?;
                fmt_operand(inner, UNARY_PRECEDENCE, false, f)
            }
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::DefaultDialect;
    use crate::config::GeneratorConfig;

    fn var(bank: u8, address: u8) -> Value {
        Value::Var(VariableRef {
            bank,
            address,
            volatile: false,
        })
    }

    #[test]
    fn display_literals_and_vars() {
        assert_eq!(Value::Int(-5).to_string(), "-5");
        assert_eq!(Value::Str("hi \"you\"".into()).to_string(), r#""hi \"you\"""#);
        assert_eq!(var(1, 16).to_string(), "var[1][16]");
        assert_eq!(Value::Arg(2).to_string(), "arg2");
        assert_eq!(Value::Dup(0).to_string(), "temp_0");
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let sum = Value::binary(BinaryOp::Add, Value::Int(1), Value::Int(2));
        let product = Value::binary(BinaryOp::Mul, sum.clone(), Value::Int(3));
        assert_eq!(product.to_string(), "(1 + 2) * 3");

        let no_parens = Value::binary(BinaryOp::Add, Value::binary(BinaryOp::Mul, Value::Int(1), Value::Int(2)), Value::Int(3));
        assert_eq!(no_parens.to_string(), "1 * 2 + 3");

        // Right operand at equal precedence keeps its grouping.
        let right = Value::binary(BinaryOp::Sub, Value::Int(1), sum);
        assert_eq!(right.to_string(), "1 - (1 + 2)");
    }

    #[test]
    fn negate_inverts_comparisons_and_folds_not() {
        let cmp = Value::binary(BinaryOp::Lt, var(1, 0), Value::Int(3));
        assert_eq!(cmp.clone().negate().to_string(), "var[1][0] >= 3");
        assert_eq!(var(1, 0).negate().to_string(), "not var[1][0]");
        assert_eq!(var(1, 0).negate().negate(), var(1, 0));
        let sum = Value::binary(BinaryOp::Add, Value::Int(1), Value::Int(2));
        assert_eq!(sum.negate().to_string(), "not (1 + 2)");
    }

    #[test]
    fn side_effects_propagate() {
        let call = Value::Call {
            name: "game:random".into(),
            args: vec![],
        };
        assert!(call.has_side_effects());
        assert!(Value::binary(BinaryOp::Add, Value::Int(1), call).has_side_effects());
        assert!(!Value::binary(BinaryOp::Add, Value::Int(1), var(1, 1)).has_side_effects());
        let volatile = Value::Var(VariableRef {
            bank: 15,
            address: 0,
            volatile: true,
        });
        assert!(volatile.has_side_effects());
        assert!(!volatile.is_repeatable());
    }

    #[test]
    fn dup_repeatable_emits_nothing() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        let dup = var(2, 4).dup(&mut code_gen);
        assert_eq!(dup, var(2, 4));
        assert!(code_gen.lines().is_empty());
    }

    #[test]
    fn dup_call_binds_temporary_first() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        let call = Value::Call {
            name: "game:random".into(),
            args: vec![],
        };
        let dup = call.dup(&mut code_gen);
        assert_eq!(dup, Value::Dup(0));
        assert_eq!(code_gen.lines(), ["local temp_0 = game:random()"]);
    }

    #[test]
    fn reads_looks_through_expressions() {
        let slot = VariableRef {
            bank: 1,
            address: 0,
            volatile: false,
        };
        let call = Value::Call {
            name: "f".into(),
            args: vec![Value::binary(BinaryOp::Add, var(1, 0), Value::Int(1))],
        };
        assert!(call.reads(slot));
        assert!(var(1, 0).negate().reads(slot));
        assert!(!var(1, 1).reads(slot));
        assert!(!var(2, 0).reads(slot));
        assert!(!Value::Dup(0).reads(slot));
    }

    #[test]
    fn bind_keeps_existing_temporaries() {
        let dialect = DefaultDialect;
        let mut code_gen = CodeGenerator::new(GeneratorConfig::default(), &dialect);
        assert_eq!(var(1, 0).bind(&mut code_gen), Value::Dup(0));
        assert_eq!(Value::Dup(0).bind(&mut code_gen), Value::Dup(0));
        assert_eq!(code_gen.lines(), ["local temp_0 = var[1][0]"]);
    }
}
