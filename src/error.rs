use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::span::Span;

/// Failure while executing a single instruction.
///
/// Raised where the offending operand or mnemonic is resolved; the emulator does not
/// undo side effects made by the instruction before the failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmuError {
    InvalidRegister {
        name: String,
    },
    InvalidOperand {
        operand: String,
    },
    UndefinedVariable {
        name: String,
    },
    DivisionByZero,
    UnsupportedInterrupt {
        vector: String,
        /// `AH` value when the vector itself is known but the service is not.
        service: Option<u8>,
    },
    MalformedInstruction {
        mnemonic: String,
        expected: usize,
        found: usize,
    },
    UnknownInstruction {
        mnemonic: String,
    },
}

impl EmuError {
    pub fn invalid_register(name: impl Into<String>) -> Self {
        Self::InvalidRegister { name: name.into() }
    }

    pub fn invalid_operand(operand: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operand: operand.into(),
        }
    }

    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }

    /// Diagnostic code, used when reporting through `miette`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegister { .. } => "runtime::invalid_register",
            Self::InvalidOperand { .. } => "runtime::invalid_operand",
            Self::UndefinedVariable { .. } => "runtime::undefined_variable",
            Self::DivisionByZero => "runtime::division_by_zero",
            Self::UnsupportedInterrupt { .. } => "runtime::unsupported_interrupt",
            Self::MalformedInstruction { .. } => "runtime::malformed_instruction",
            Self::UnknownInstruction { .. } => "runtime::unknown_instruction",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::InvalidRegister { .. } => {
                "available registers are ax bx cx dx si di bp sp ds and their 8-bit halves"
            }
            Self::InvalidOperand { .. } => {
                "operands are registers, variables, or literals like 10, 0Ah, 0x0A, 1010b or 'a'"
            }
            Self::UndefinedVariable { .. } => "variables are declared in the .data segment with `db`",
            Self::DivisionByZero => "check the divisor before executing `div`",
            Self::UnsupportedInterrupt { service: None, .. } => "only `int 21h` is supported",
            Self::UnsupportedInterrupt { .. } => "int 21h supports services 1, 2, 9 and 4Ch in AH",
            Self::MalformedInstruction { .. } => "check the number of operands for this instruction",
            Self::UnknownInstruction { .. } => {
                "supported: mov add sub and or xor cmp lea mul div aam int je jmp proc endp end"
            }
        }
    }
}

impl Error for EmuError {}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegister { name } => write!(f, "Invalid register `{}`", name),
            Self::InvalidOperand { operand } => write!(f, "Invalid operand `{}`", operand),
            Self::UndefinedVariable { name } => write!(f, "Undefined variable `{}`", name),
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::UnsupportedInterrupt {
                vector,
                service: None,
            } => write!(f, "Unsupported interrupt `{}`", vector),
            Self::UnsupportedInterrupt {
                vector,
                service: Some(service),
            } => write!(
                f,
                "Unsupported service {:02X}h for interrupt `{}`",
                service, vector
            ),
            Self::MalformedInstruction {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "`{}` expects {} operand{}, found {}",
                mnemonic,
                expected,
                if *expected == 1 { "" } else { "s" },
                found
            ),
            Self::UnknownInstruction { mnemonic } => write!(f, "Unknown instruction `{}`", mnemonic),
        }
    }
}

// Load errors

pub fn load_bad_stack(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::stack",
        help = "the stack size is hexadecimal, like `.stack 100h`",
        labels = vec![LabeledSpan::at(span, "not a hexadecimal size")],
        "Expected a valid hexadecimal stack size",
    )
    .with_source_code(src.to_owned())
}

pub fn load_duplicate_label(span: Span, previous: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Warning,
        code = "load::duplicate_label",
        help = "jumps to this label go to its last definition",
        labels = vec![
            LabeledSpan::at(span, "redefined here"),
            LabeledSpan::at(previous, "previously defined here"),
        ],
        "Label defined more than once",
    )
    .with_source_code(src.to_owned())
}

// Runtime errors

pub fn runtime_fault(error: &EmuError, span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = error.code(),
        help = error.help(),
        labels = vec![LabeledSpan::at(span, "while executing this instruction")],
        "{error}",
    )
    .with_source_code(src.to_owned())
}

pub fn runtime_step_limit(limit: u64, span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "runtime::step_limit",
        help = "raise the limit with `--max-steps` or EMU86_MAX_STEPS if the program is not stuck",
        labels = vec![LabeledSpan::at(span, "next instruction")],
        "Stopped after executing {limit} instructions",
    )
    .with_source_code(src.to_owned())
}
