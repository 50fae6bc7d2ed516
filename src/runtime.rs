use miette::Result;

use crate::error::EmuError;
use crate::flags::Flags;
use crate::instruction::{BinaryOp, Instruction, JumpCond};
use crate::io::{Console, TerminalConsole};
use crate::memory::{Address, Memory};
use crate::operand::{resolve_location, resolve_value};
use crate::parser::AsmParser;
use crate::program::Program;
use crate::register::{Register, Registers};
use crate::symbol::{canonical, FxMap};

/// Text emitted by `int 21h` service 4Ch.
pub const TERMINATION_NOTICE: &str = "\nProgram terminated.\n";

/// Result of executing a single instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Proceed to the following instruction.
    Continue,
    /// Branch taken; the cursor already points at this instruction index.
    Jump(usize),
    /// Execution failed. Side effects made before the failure are kept.
    Fault(EmuError),
}

/// How a call to [`Emulator::run`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunResult {
    /// Cursor moved past the last instruction.
    Finished { steps: u64 },
    /// Instruction at `index` failed; the cursor still points at it.
    Fault {
        index: usize,
        error: EmuError,
        steps: u64,
    },
    /// Step budget ran out before the program finished.
    StepLimit { index: usize, steps: u64 },
}

/// Complete machine state: registers, flags, memory and the loaded program.
///
/// Registers and flags survive [`Emulator::load`]; only [`Emulator::reset`] clears them.
pub struct Emulator<C = TerminalConsole> {
    regs: Registers,
    flags: Flags,
    mem: Memory,
    program: Program,
    /// Index of the next instruction in `program`
    cursor: usize,
    /// Set by `name proc`, cleared by `endp`. Informational only.
    current_procedure: Option<String>,
    console: C,
    trace: bool,
}

impl<C: Console> Emulator<C> {
    pub fn new(console: C) -> Self {
        Emulator {
            regs: Registers::new(),
            flags: Flags::new(),
            mem: Memory::new(),
            program: Program::new(),
            cursor: 0,
            current_procedure: None,
            console,
            trace: false,
        }
    }

    /// Print every instruction to stderr before executing it.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Parse `src` and replace the loaded program, memory and variables with it.
    ///
    /// On failure the previously loaded program is kept.
    pub fn load(&mut self, src: &str) -> Result<()> {
        let program = AsmParser::new(src).parse()?;
        self.load_program(program);
        Ok(())
    }

    pub fn load_program(&mut self, program: Program) {
        let mut mem = Memory::new();
        for decl in program.data() {
            mem.define_variable(&decl.name, decl.value.clone());
        }
        self.mem = mem;
        self.program = program;
        self.cursor = 0;
        self.current_procedure = None;
    }

    /// Zero registers and flags and discard the program and memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.flags.reset();
        self.mem = Memory::new();
        self.program = Program::new();
        self.cursor = 0;
        self.current_procedure = None;
    }

    /// Execute one already-fetched instruction.
    ///
    /// Moves the cursor only when a branch is taken.
    pub fn step(&mut self, text: &str) -> Outcome {
        match self.execute(text) {
            Ok(Some(target)) => {
                self.cursor = target;
                Outcome::Jump(target)
            }
            Ok(None) => Outcome::Continue,
            Err(error) => Outcome::Fault(error),
        }
    }

    /// Execute the instruction at the cursor and advance past it.
    ///
    /// `None` once the cursor is past the end of the program. A faulting instruction leaves
    /// the cursor in place.
    pub fn step_next(&mut self) -> Option<Outcome> {
        let text = self.program.get(self.cursor)?.text.clone();
        if self.trace {
            tprintln!(Always, "{:>5}  {}", self.cursor, text);
        }
        let outcome = self.step(&text);
        match &outcome {
            Outcome::Continue => self.cursor += 1,
            Outcome::Jump(target) => {
                if self.trace {
                    tprintln!(Always, "{:>5}  -> {}", "", target);
                }
            }
            Outcome::Fault(_) => (),
        }
        Some(outcome)
    }

    /// Move past the instruction at the cursor without executing it.
    pub fn skip(&mut self) {
        if !self.is_finished() {
            self.cursor += 1;
        }
    }

    /// Step until the program finishes, faults, or `max_steps` instructions have run.
    pub fn run(&mut self, max_steps: Option<u64>) -> RunResult {
        let mut steps = 0;
        loop {
            if max_steps.is_some_and(|limit| steps >= limit) && !self.is_finished() {
                return RunResult::StepLimit {
                    index: self.cursor,
                    steps,
                };
            }
            match self.step_next() {
                None => return RunResult::Finished { steps },
                Some(Outcome::Fault(error)) => {
                    return RunResult::Fault {
                        index: self.cursor,
                        error,
                        steps,
                    }
                }
                Some(Outcome::Continue | Outcome::Jump(_)) => steps += 1,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.program.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_procedure(&self) -> Option<&str> {
        self.current_procedure.as_deref()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn get_register(&self, name: &str) -> Result<u16, EmuError> {
        self.regs.get_named(name)
    }

    pub fn set_register(&mut self, name: &str, value: u32) -> Result<(), EmuError> {
        self.regs.set_named(name, value)
    }

    pub fn read_memory_byte<'a>(&self, addr: impl Into<Address<'a>>) -> Result<u8, EmuError> {
        self.mem.read_byte(addr)
    }

    pub fn write_memory_byte<'a>(
        &mut self,
        addr: impl Into<Address<'a>>,
        value: u32,
    ) -> Result<(), EmuError> {
        self.mem.write_byte(addr, value)
    }

    pub fn flags(&self) -> FxMap<&'static str, bool> {
        self.flags.snapshot()
    }

    pub fn raw_flags(&self) -> &Flags {
        &self.flags
    }

    /// Returns the branch target if a jump is taken.
    fn execute(&mut self, text: &str) -> Result<Option<usize>, EmuError> {
        match Instruction::decode(text)? {
            Instruction::Binary { op, dest, src } => self.binary(op, dest, src)?,
            Instruction::Lea { dest, src } => {
                let reg: Register = dest.parse()?;
                let offset = self.mem.resolve_offset(src)?;
                self.regs.set(reg, offset.into());
            }
            Instruction::Mul { src } => {
                let value = resolve_value(src, &self.regs, &self.mem)?;
                let al = u32::from(self.regs.get(Register::AL));
                let result = al.wrapping_mul(value);
                self.regs.set(Register::AX, result);
                self.flags.update(result, 16);
            }
            Instruction::Div { src } => {
                let divisor = resolve_value(src, &self.regs, &self.mem)?;
                if divisor == 0 {
                    return Err(EmuError::DivisionByZero);
                }
                let ax = u32::from(self.regs.get(Register::AX));
                self.regs.set(Register::AL, ax / divisor);
                self.regs.set(Register::AH, ax % divisor);
            }
            Instruction::Aam => {
                let al = u32::from(self.regs.get(Register::AL));
                self.regs.set(Register::AH, al / 10);
                self.regs.set(Register::AL, al % 10);
                self.flags.update(self.regs.get(Register::AX).into(), 16);
            }
            Instruction::Int { vector } => self.interrupt(vector)?,
            Instruction::Jump { cond, label } => {
                let taken = match cond {
                    JumpCond::Always => true,
                    JumpCond::Equal => self.flags.zero,
                };
                // Unknown labels fall through
                if taken {
                    return Ok(self.program.label(label));
                }
            }
            Instruction::Proc { name } => self.current_procedure = Some(canonical(name)),
            Instruction::Endp => self.current_procedure = None,
            Instruction::End => (),
        }
        Ok(None)
    }

    fn binary(&mut self, op: BinaryOp, dest: &str, src: &str) -> Result<(), EmuError> {
        let location = resolve_location(dest, &self.mem)?;
        let src_val = resolve_value(src, &self.regs, &self.mem)?;
        let dest_val = match op {
            BinaryOp::Mov => 0,
            _ => location.read(&self.regs, &self.mem)?,
        };
        let result = op.apply(dest_val, src_val);

        if op.affects_flags() {
            self.flags.update(result, location.width());
        }
        if op == BinaryOp::Cmp {
            self.flags.set_carry(dest_val < src_val);
        }
        if op.writes_back() {
            location.write(&mut self.regs, &mut self.mem, result)?;
        }
        Ok(())
    }

    /// `int 21h`, service selected by AH.
    fn interrupt(&mut self, vector: &str) -> Result<(), EmuError> {
        if !matches!(vector.to_ascii_lowercase().as_str(), "21h" | "21" | "0x21") {
            return Err(EmuError::UnsupportedInterrupt {
                vector: vector.to_owned(),
                service: None,
            });
        }

        let service = self.regs.get(Register::AH) as u8;
        match service {
            // Character input with echo
            0x01 => {
                let line = self.console.request_input();
                if let Some(ch) = line.chars().next() {
                    self.regs.set(Register::AL, ch.into());
                    // Echo the byte AL holds, not the whole character
                    let echo = char::from(self.regs.get(Register::AL) as u8);
                    self.console.emit_output(echo.encode_utf8(&mut [0; 4]));
                }
            }
            // Character output
            0x02 => {
                let ch = self.regs.get(Register::DL) as u8 as char;
                self.console.emit_output(ch.encode_utf8(&mut [0; 4]));
            }
            // `$`-terminated string output
            0x09 => {
                let offset = self.regs.get(Register::DX);
                let text: String = self.mem.terminated_from(offset).map(char::from).collect();
                self.console.emit_output(&text);
            }
            // Exit. The caller decides whether to stop stepping.
            0x4C => self.console.emit_output(TERMINATION_NOTICE),
            _ => {
                return Err(EmuError::UnsupportedInterrupt {
                    vector: vector.to_owned(),
                    service: Some(service),
                })
            }
        }
        Ok(())
    }
}
