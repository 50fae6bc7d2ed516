#[macro_use]
pub mod output;

// Loading
mod parser;
pub use parser::AsmParser;
mod program;
pub use program::{DataDecl, Program, Stmt, DEFAULT_STACK_SIZE};

// Machine state
mod flags;
pub use flags::Flags;
mod memory;
pub use memory::{Address, Memory, Value, Variable, MEMORY_SIZE};
mod register;
pub use register::{Reg16, Register, Registers};

// Running
mod instruction;
pub use instruction::{BinaryOp, Instruction, JumpCond};
mod operand;
mod runtime;
pub use runtime::{Emulator, Outcome, RunResult, TERMINATION_NOTICE};
pub mod io;

mod span;
pub use span::Span;
mod symbol;
pub use symbol::FxMap;

pub mod error;
pub use error::EmuError;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
