use crate::{
    error::EmuError,
    memory::Memory,
    register::{Register, Registers},
};

/// A resolved operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Immediate(u32),
    Register(Register),
    /// Offset of a memory byte.
    Memory(u16),
}

/// Somewhere a result can be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Register(Register),
    Memory(u16),
}

impl Location {
    /// Width in bits. Memory is addressed a byte at a time.
    pub fn width(self) -> u32 {
        match self {
            Location::Register(reg) => reg.width(),
            Location::Memory(_) => 8,
        }
    }

    pub fn read(self, regs: &Registers, mem: &Memory) -> Result<u32, EmuError> {
        match self {
            Location::Register(reg) => Ok(regs.get(reg).into()),
            Location::Memory(offset) => Ok(mem.read_byte(offset)?.into()),
        }
    }

    pub fn write(self, regs: &mut Registers, mem: &mut Memory, value: u32) -> Result<(), EmuError> {
        match self {
            Location::Register(reg) => regs.set(reg, value),
            Location::Memory(offset) => mem.write_byte(offset, value)?,
        }
        Ok(())
    }
}

/// Recognises one kind of immediate literal.
struct LiteralRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    /// Only called on tokens accepted by `matches`. `None` if the literal does not fit.
    convert: fn(&str) -> Option<u32>,
}

/// Tried in order; the first rule whose `matches` accepts the token decides its value.
const LITERAL_RULES: [LiteralRule; 6] = [
    LiteralRule {
        name: "binary",
        matches: |t| {
            t.len() > 1
                && t.ends_with(['b', 'B'])
                && t[..t.len() - 1].bytes().all(|b| b == b'0' || b == b'1')
        },
        convert: |t| u32::from_str_radix(&t[..t.len() - 1], 2).ok(),
    },
    LiteralRule {
        name: "hex",
        matches: |t| {
            (t.starts_with("0x") || t.starts_with("0X"))
                && t.len() > 2
                && t[2..].bytes().all(|b| b.is_ascii_hexdigit())
        },
        convert: |t| u32::from_str_radix(&t[2..], 16).ok(),
    },
    // Must start with a digit so `ah`, `bh`, `ch`, `dh` stay registers
    LiteralRule {
        name: "hex suffix",
        matches: |t| {
            t.len() > 1
                && t.ends_with(['h', 'H'])
                && t.starts_with(|c: char| c.is_ascii_digit())
                && t[..t.len() - 1].bytes().all(|b| b.is_ascii_hexdigit())
        },
        convert: |t| u32::from_str_radix(&t[..t.len() - 1], 16).ok(),
    },
    LiteralRule {
        name: "decimal",
        matches: |t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()),
        convert: |t| t.parse().ok(),
    },
    LiteralRule {
        name: "character",
        matches: |t| {
            let mut chars = t.chars();
            chars.next() == Some('\'')
                && chars.next().is_some()
                && chars.next() == Some('\'')
                && chars.next().is_none()
        },
        convert: |t| t.chars().nth(1).map(u32::from),
    },
    // Data segment base; memory is flat so it is always zero
    LiteralRule {
        name: "segment",
        matches: |t| t.eq_ignore_ascii_case("@data"),
        convert: |_| Some(0),
    },
];

/// Name of the literal rule accepting `token`, if any.
pub fn literal_kind(token: &str) -> Option<&'static str> {
    let token = token.trim();
    LITERAL_RULES
        .iter()
        .find(|rule| (rule.matches)(token))
        .map(|rule| rule.name)
}

/// Value of `token` as an immediate literal.
///
/// `Ok(None)` if no literal rule applies, an error if one applies but the value does not fit.
pub fn literal(token: &str) -> Result<Option<u32>, EmuError> {
    let token = token.trim();
    match LITERAL_RULES.iter().find(|rule| (rule.matches)(token)) {
        Some(rule) => (rule.convert)(token)
            .map(Some)
            .ok_or_else(|| EmuError::invalid_operand(token)),
        None => Ok(None),
    }
}

impl Operand {
    /// Classify `token` as a literal, then a register, then a variable reference.
    pub fn resolve(token: &str, mem: &Memory) -> Result<Operand, EmuError> {
        let token = token.trim();
        if let Some(value) = literal(token)? {
            return Ok(Operand::Immediate(value));
        }
        if let Ok(reg) = token.parse::<Register>() {
            return Ok(Operand::Register(reg));
        }
        match mem.resolve_offset(token) {
            Ok(offset) => Ok(Operand::Memory(offset)),
            Err(_) => Err(EmuError::invalid_operand(token)),
        }
    }

    pub fn value(self, regs: &Registers, mem: &Memory) -> Result<u32, EmuError> {
        match self {
            Operand::Immediate(value) => Ok(value),
            Operand::Register(reg) => Location::Register(reg).read(regs, mem),
            Operand::Memory(offset) => Location::Memory(offset).read(regs, mem),
        }
    }
}

/// Resolve a source operand to its current value.
pub fn resolve_value(token: &str, regs: &Registers, mem: &Memory) -> Result<u32, EmuError> {
    Operand::resolve(token, mem)?.value(regs, mem)
}

/// Resolve a destination operand. Registers win over variables of the same name.
pub fn resolve_location(token: &str, mem: &Memory) -> Result<Location, EmuError> {
    let token = token.trim();
    if let Ok(reg) = token.parse::<Register>() {
        return Ok(Location::Register(reg));
    }
    if literal_kind(token).is_some() {
        return Err(EmuError::invalid_operand(token));
    }
    Ok(Location::Memory(mem.resolve_offset(token)?))
}
