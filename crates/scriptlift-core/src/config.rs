use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Operand ordering convention for multi-operand instructions.
///
/// The native bytecode does not guarantee that the order operands were
/// pushed matches the order they appear in source, so each target picks
/// one per instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgOrder {
    /// First pushed is first in source.
    #[default]
    Fifo,
    /// First popped is first in source.
    Lifo,
}

impl FromStr for ArgOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            other => Err(format!("unknown argument order {other:?} (valid: \"fifo\", \"lifo\")")),
        }
    }
}

impl fmt::Display for ArgOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "fifo"),
            Self::Lifo => write!(f, "lifo"),
        }
    }
}

/// Code generator configuration, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Operand order for binary operators.
    pub binary_order: ArgOrder,
    /// Argument order for calls and kernel calls.
    pub call_order: ArgOrder,
}

impl GeneratorConfig {
    pub fn new(binary_order: ArgOrder, call_order: ArgOrder) -> Self {
        Self {
            binary_order,
            call_order,
        }
    }

    /// Arrange two popped operands into `(lhs, rhs)`.
    pub fn binary_operands(&self, first_popped: Value, second_popped: Value) -> (Value, Value) {
        match self.binary_order {
            ArgOrder::Fifo => (second_popped, first_popped),
            ArgOrder::Lifo => (first_popped, second_popped),
        }
    }

    /// Arrange call arguments given in pop order into source order.
    pub fn call_arguments(&self, mut popped: Vec<Value>) -> Vec<Value> {
        if self.call_order == ArgOrder::Fifo {
            popped.reverse();
        }
        popped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fifo_for_both() {
        let config = GeneratorConfig::default();
        assert_eq!(config.binary_order, ArgOrder::Fifo);
        assert_eq!(config.call_order, ArgOrder::Fifo);
    }

    #[test]
    fn parse_orders() {
        assert_eq!("fifo".parse::<ArgOrder>().unwrap(), ArgOrder::Fifo);
        assert_eq!("LIFO".parse::<ArgOrder>().unwrap(), ArgOrder::Lifo);
        assert!("stack".parse::<ArgOrder>().is_err());
    }

    #[test]
    fn deserialize_partial_config() {
        let config: GeneratorConfig = serde_json::from_str(r#"{ "call_order": "lifo" }"#).unwrap();
        assert_eq!(config.binary_order, ArgOrder::Fifo);
        assert_eq!(config.call_order, ArgOrder::Lifo);
    }

    #[test]
    fn call_arguments_follow_policy() {
        // Pushed a, b, c → popped c, b, a.
        let popped = vec![Value::Int(3), Value::Int(2), Value::Int(1)];
        let fifo = GeneratorConfig::new(ArgOrder::Fifo, ArgOrder::Fifo);
        let lifo = GeneratorConfig::new(ArgOrder::Fifo, ArgOrder::Lifo);
        assert_eq!(fifo.call_arguments(popped.clone()), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(lifo.call_arguments(popped), vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
    }
}
