use std::{fmt, str::FromStr};

use crate::error::EmuError;

/// 16-bit registers, in display order. Also indexes the backing cells of [`Registers`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Reg16 {
    Ax = 0,
    Bx,
    Cx,
    Dx,
    Si,
    Di,
    Bp,
    Sp,
    /// Only exists so `mov ds, ax` is accepted; memory is flat.
    Ds,
}

impl Reg16 {
    pub const ALL: [Reg16; 9] = [
        Reg16::Ax,
        Reg16::Bx,
        Reg16::Cx,
        Reg16::Dx,
        Reg16::Si,
        Reg16::Di,
        Reg16::Bp,
        Reg16::Sp,
        Reg16::Ds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Reg16::Ax => "ax",
            Reg16::Bx => "bx",
            Reg16::Cx => "cx",
            Reg16::Dx => "dx",
            Reg16::Si => "si",
            Reg16::Di => "di",
            Reg16::Bp => "bp",
            Reg16::Sp => "sp",
            Reg16::Ds => "ds",
        }
    }
}

/// Which byte of a pair an 8-bit register names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Half {
    High,
    Low,
}

/// Any addressable register.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Register {
    Word(Reg16),
    /// Parent is always one of `Ax`, `Bx`, `Cx`, `Dx`.
    Byte(Reg16, Half),
}

impl Register {
    pub const AL: Register = Register::Byte(Reg16::Ax, Half::Low);
    pub const AH: Register = Register::Byte(Reg16::Ax, Half::High);
    pub const AX: Register = Register::Word(Reg16::Ax);
    pub const DL: Register = Register::Byte(Reg16::Dx, Half::Low);
    pub const DX: Register = Register::Word(Reg16::Dx);

    /// Width in bits.
    pub fn width(self) -> u32 {
        match self {
            Register::Word(_) => 16,
            Register::Byte(..) => 8,
        }
    }

    pub fn mask(self) -> u32 {
        (1 << self.width()) - 1
    }
}

impl FromStr for Register {
    type Err = EmuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use self::Half::*;
        use self::Reg16::*;
        let reg = match s.trim().to_ascii_lowercase().as_str() {
            "ax" => Register::Word(Ax),
            "bx" => Register::Word(Bx),
            "cx" => Register::Word(Cx),
            "dx" => Register::Word(Dx),
            "si" => Register::Word(Si),
            "di" => Register::Word(Di),
            "bp" => Register::Word(Bp),
            "sp" => Register::Word(Sp),
            "ds" => Register::Word(Ds),
            "ah" => Register::Byte(Ax, High),
            "al" => Register::Byte(Ax, Low),
            "bh" => Register::Byte(Bx, High),
            "bl" => Register::Byte(Bx, Low),
            "ch" => Register::Byte(Cx, High),
            "cl" => Register::Byte(Cx, Low),
            "dh" => Register::Byte(Dx, High),
            "dl" => Register::Byte(Dx, Low),
            _ => return Err(EmuError::invalid_register(s.trim())),
        };
        Ok(reg)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Word(reg) => f.write_str(reg.name()),
            Register::Byte(parent, half) => {
                let prefix = &parent.name()[..1];
                let suffix = match half {
                    Half::High => "h",
                    Half::Low => "l",
                };
                write!(f, "{prefix}{suffix}")
            }
        }
    }
}

/// Register file. Each 8-bit pair shares its parent's 16-bit cell, so aliasing holds by
/// construction.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Registers {
    cells: [u16; Reg16::ALL.len()],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::Word(reg) => self.cells[reg as usize],
            Register::Byte(parent, Half::High) => self.cells[parent as usize] >> 8,
            Register::Byte(parent, Half::Low) => self.cells[parent as usize] & 0xFF,
        }
    }

    /// Store `value` truncated to the register's width.
    pub fn set(&mut self, reg: Register, value: u32) {
        let value = (value & reg.mask()) as u16;
        match reg {
            Register::Word(reg) => self.cells[reg as usize] = value,
            Register::Byte(parent, Half::High) => {
                let cell = &mut self.cells[parent as usize];
                *cell = (*cell & 0x00FF) | (value << 8);
            }
            Register::Byte(parent, Half::Low) => {
                let cell = &mut self.cells[parent as usize];
                *cell = (*cell & 0xFF00) | value;
            }
        }
    }

    pub fn get_named(&self, name: &str) -> Result<u16, EmuError> {
        Ok(self.get(name.parse()?))
    }

    pub fn set_named(&mut self, name: &str, value: u32) -> Result<(), EmuError> {
        self.set(name.parse()?, value);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.cells = Default::default();
    }
}
