//! Reader for compiled field-script bytecode.
//!
//! Two layers:
//! - **Layer 1** (`cursor`, `script`): byte-level reads and the `FSCR` script container
//! - **Layer 2** (`opcode`, `operand`): the opcode table and packed operand helpers
//!
//! Nothing here knows about values or code generation; that lives in `scriptlift-core`.

pub mod cursor;
pub mod error;
pub mod opcode;
pub mod operand;
pub mod script;

pub use cursor::Cursor;
pub use error::{Error, Result};
pub use opcode::Opcode;
pub use script::Script;
