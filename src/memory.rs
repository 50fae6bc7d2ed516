use crate::{
    error::EmuError,
    symbol::{canonical, fx_map, FxMap},
};

/// Flat address space of 64 KiB.
pub const MEMORY_SIZE: usize = 0x10000;

/// Marks the end of a string for `int 21h` service 9.
pub const STRING_TERMINATOR: u8 = b'$';

/// Value a variable was declared with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Number(u32),
    Str(String),
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub offset: u16,
    pub size: u16,
    pub value: Value,
}

/// Either a raw offset or a symbolic reference such as `msg` or `buf+2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Address<'a> {
    Offset(u16),
    Symbol(&'a str),
}

impl From<u16> for Address<'_> {
    fn from(value: u16) -> Self {
        Address::Offset(value)
    }
}

impl<'a> From<&'a str> for Address<'a> {
    fn from(value: &'a str) -> Self {
        Address::Symbol(value)
    }
}

/// Byte-addressable memory plus the variable table placing data in it.
///
/// Variables are placed by a bump cursor that only moves forward. Nothing is reclaimed and
/// overlapping definitions are not detected.
pub struct Memory {
    bytes: Box<[u8; MEMORY_SIZE]>,
    /// Next free offset.
    cursor: usize,
    variables: FxMap<String, Variable>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            bytes: Box::new([0; MEMORY_SIZE]),
            cursor: 0,
            variables: fx_map(),
        }
    }

    /// Define a variable occupying one byte if numeric.
    pub fn define_variable(&mut self, name: &str, value: impl Into<Value>) -> u16 {
        self.define_variable_sized(name, value, 1)
    }

    /// Define a variable at the cursor and advance past it.
    ///
    /// Numeric values occupy `size` bytes, of which only the first is written. Strings are
    /// written up to the first terminator in the text, followed by a single terminator, and
    /// ignore `size`.
    ///
    /// Offsets are taken modulo 64 KiB. Once the cursor passes the end of memory, new variables
    /// wrap around to the start and overlap earlier ones.
    pub fn define_variable_sized(&mut self, name: &str, value: impl Into<Value>, size: u16) -> u16 {
        let value = value.into();
        let offset = self.cursor as u16;
        let size = match &value {
            Value::Str(text) => {
                let mut written = 0;
                for byte in text.chars().map(|c| c as u32 as u8) {
                    if byte == STRING_TERMINATOR {
                        break;
                    }
                    self.poke(self.cursor + written, byte);
                    written += 1;
                }
                self.poke(self.cursor + written, STRING_TERMINATOR);
                written + 1
            }
            Value::Number(number) => {
                self.poke(self.cursor, *number as u8);
                size as usize
            }
        };
        self.cursor += size;
        self.variables.insert(
            canonical(name),
            Variable {
                offset,
                size: size as u16,
                value,
            },
        );
        offset
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(&canonical(name))
    }

    /// Variables in definition order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(name, var)| (name.as_str(), var))
    }

    /// Resolve `name` or `name+displacement` to an offset.
    pub fn resolve_offset(&self, reference: &str) -> Result<u16, EmuError> {
        let (name, displacement) = match reference.split_once('+') {
            Some((name, displacement)) => {
                let displacement = displacement
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| EmuError::invalid_operand(reference.trim()))?;
                (name, displacement)
            }
            None => (reference, 0),
        };
        let var = self
            .variable(name)
            .ok_or_else(|| EmuError::undefined_variable(name.trim()))?;
        Ok((i64::from(var.offset) + displacement).rem_euclid(MEMORY_SIZE as i64) as u16)
    }

    pub fn read_byte<'a>(&self, addr: impl Into<Address<'a>>) -> Result<u8, EmuError> {
        let offset = self.offset_of(addr.into())?;
        Ok(self.bytes[offset as usize])
    }

    /// Store the low 8 bits of `value`.
    pub fn write_byte<'a>(&mut self, addr: impl Into<Address<'a>>, value: u32) -> Result<(), EmuError> {
        let offset = self.offset_of(addr.into())?;
        self.bytes[offset as usize] = value as u8;
        Ok(())
    }

    /// Bytes from `offset` up to, not including, the next terminator.
    ///
    /// Gives up after one full pass over memory.
    pub fn terminated_from(&self, offset: u16) -> impl Iterator<Item = u8> + '_ {
        (0..MEMORY_SIZE)
            .map(move |i| self.bytes[(offset as usize + i) % MEMORY_SIZE])
            .take_while(|&byte| byte != STRING_TERMINATOR)
    }

    /// Amount of memory handed out to variables so far.
    pub fn used(&self) -> usize {
        self.cursor.min(MEMORY_SIZE)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    fn offset_of(&self, addr: Address) -> Result<u16, EmuError> {
        match addr {
            Address::Offset(offset) => Ok(offset),
            Address::Symbol(reference) => self.resolve_offset(reference),
        }
    }

    fn poke(&mut self, addr: usize, byte: u8) {
        self.bytes[addr % MEMORY_SIZE] = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocation() {
        let mut mem = Memory::new();
        assert_eq!(mem.define_variable("a", 7u32), 0);
        assert_eq!(mem.define_variable("msg", "HI"), 1);
        // "HI" + terminator
        assert_eq!(mem.define_variable("b", 300u32), 4);
        assert_eq!(mem.used(), 5);
        assert_eq!(mem.read_byte(0u16).unwrap(), 7);
        assert_eq!(mem.read_byte("msg").unwrap(), b'H');
        assert_eq!(mem.read_byte(3u16).unwrap(), STRING_TERMINATOR);
        // Masked to a byte
        assert_eq!(mem.read_byte("b").unwrap(), 44);
    }

    #[test]
    fn string_stops_at_terminator() {
        let mut mem = Memory::new();
        mem.define_variable("msg", "HI$THERE");
        let var = mem.variable("msg").unwrap();
        assert_eq!(var.size, 3);
        assert_eq!(var.value, Value::Str("HI$THERE".into()));
        assert_eq!(mem.used(), 3);
        assert_eq!(&mem.bytes()[..3], b"HI$");
    }

    #[test]
    fn sized_numeric() {
        let mut mem = Memory::new();
        mem.define_variable_sized("buf", 1u32, 10);
        assert_eq!(mem.define_variable("next", 2u32), 10);
        assert_eq!(mem.variable("buf").unwrap().size, 10);
    }

    #[test]
    fn allocation_wraps_past_end() {
        let mut mem = Memory::new();
        mem.define_variable_sized("big", 1u32, 0xFFFF);
        assert_eq!(mem.define_variable("last", "ab"), 0xFFFF);
        assert_eq!(mem.read_byte(0xFFFFu16).unwrap(), b'a');
        assert_eq!(mem.read_byte(0u16).unwrap(), b'b');
        assert_eq!(mem.read_byte(1u16).unwrap(), STRING_TERMINATOR);
        assert_eq!(mem.define_variable("next", 9u32), 2);
        assert_eq!(mem.used(), MEMORY_SIZE);
    }

    #[test]
    fn names_are_canonical() {
        let mut mem = Memory::new();
        mem.define_variable(" Count ", 5u32);
        assert_eq!(mem.resolve_offset("COUNT").unwrap(), 0);
        assert_eq!(mem.read_byte("count").unwrap(), 5);
    }

    #[test]
    fn displacement() {
        let mut mem = Memory::new();
        mem.define_variable("pad", 0u32);
        mem.define_variable("buf", "abcd");
        let base = mem.resolve_offset("buf").unwrap();
        assert_eq!(mem.resolve_offset("buf+2").unwrap(), base + 2);
        assert_eq!(mem.resolve_offset("buf + 2").unwrap(), base + 2);
        assert_eq!(mem.read_byte("buf+2").unwrap(), b'c');
        assert_eq!(mem.resolve_offset("buf+-1").unwrap(), base - 1);
        mem.write_byte("buf+1", 0x1FF).unwrap();
        assert_eq!(mem.read_byte(base + 1).unwrap(), 0xFF);
    }

    #[test]
    fn undefined_and_malformed() {
        let mut mem = Memory::new();
        mem.define_variable("buf", 0u32);
        assert_eq!(
            mem.resolve_offset("nope"),
            Err(EmuError::undefined_variable("nope"))
        );
        assert_eq!(
            mem.read_byte("nope+1"),
            Err(EmuError::undefined_variable("nope"))
        );
        assert_eq!(
            mem.resolve_offset("buf+x"),
            Err(EmuError::invalid_operand("buf+x"))
        );
    }

    #[test]
    fn redefinition_replaces_entry() {
        let mut mem = Memory::new();
        mem.define_variable("x", 1u32);
        mem.define_variable("x", 2u32);
        assert_eq!(mem.resolve_offset("x").unwrap(), 1);
        assert_eq!(mem.variables().count(), 1);
    }

    #[test]
    fn terminated_read() {
        let mut mem = Memory::new();
        let offset = mem.define_variable("msg", "hello");
        let text: Vec<u8> = mem.terminated_from(offset).collect();
        assert_eq!(text, b"hello");
    }
}
