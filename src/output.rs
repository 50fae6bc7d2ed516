use std::cell::RefCell;
use std::io::{stdout, Write as _};
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::flags::Flags;
use crate::memory::Memory;
use crate::register::{Reg16, Register, Registers};

#[macro_export]
macro_rules! tprint {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            $fmt
            $($tt)*
        );
        $crate::output::Output::Trace($cond).print_str(&s);
    }};
}

#[macro_export]
macro_rules! tprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Trace($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Trace($cond).print_str(&s);
    }};
}

/// Where text is sent: program output on stdout, emulator commentary on stderr.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Trace(Condition),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Printed even with `--minimal`, without colour.
    Always,
    /// Dropped with `--minimal`.
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    /// Private. Use [`Output::start_new_line`].
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    fn set_line_start_from_str(string: &str) {
        let last = Decolored::new(string).last();
        if let Some(ch) = last {
            Output::set_line_start(ch == '\n');
        }
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                // Program output is never recoloured
                print!("{}", string);
                let _ = stdout().flush();
                Self::set_line_start_from_str(string);
            }

            Self::Trace(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", ColoredString::from(string).blue());
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Always) => {
                    eprint_colorless(string);
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_str("\n");
        }
    }

    pub fn print_registers(&self, regs: &Registers) {
        if Self::is_minimal() {
            for reg in Reg16::ALL {
                self.print_str(&format!(
                    "{} {}\n",
                    reg.name().to_uppercase(),
                    regs.get(Register::Word(reg))
                ));
            }
            return;
        }

        self.print_str("\x1b[2m┌────────────────────────────────────┐\x1b[0m\n");
        self.print_str(
            "\x1b[2m│        \x1b[3mhex     int    uint    char\x1b[0m\x1b[2m │\x1b[0m\n",
        );
        for reg in Reg16::ALL {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1m{}\x1b[0m  ", reg.name().to_uppercase()));
            self.print_integer(regs.get(Register::Word(reg)));
            self.print_str(" \x1b[2m│\x1b[0m\n");
        }
        self.print_str("\x1b[2m└────────────────────────────────────┘\x1b[0m\n");
    }

    pub fn print_flags(&self, flags: &Flags) {
        let line = flags
            .snapshot()
            .iter()
            .map(|(name, set)| format!("{}={}", name, *set as u8))
            .collect::<Vec<_>>()
            .join(" ");
        self.print_str(&line);
        self.print_str("\n");
    }

    /// Hex dump of the bytes handed out to variables, 16 per row.
    pub fn print_memory(&self, mem: &Memory) {
        let used = mem.used();
        if used == 0 {
            return;
        }
        for (row, chunk) in mem.bytes()[..used].chunks(16).enumerate() {
            let hex = chunk
                .iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            let text: String = chunk
                .iter()
                .map(|&byte| match byte {
                    0x20..=0x7e => byte as char,
                    _ => '.',
                })
                .collect();
            if Self::is_minimal() {
                self.print_str(&format!("{:04X} {}\n", row * 16, hex));
            } else {
                self.print_str(&format!(
                    "\x1b[2m{:04X}\x1b[0m  {:<47}  \x1b[2m{}\x1b[0m\n",
                    row * 16,
                    hex,
                    text
                ));
            }
        }
    }

    pub fn print_decimal(&self, value: u16) {
        self.print_str(&format!("{}", value as i16));
    }

    pub fn print_integer(&self, value: u16) {
        if Self::is_minimal() {
            self.print_decimal(value);
            return;
        }
        self.print_str(&format!("0x{:04x}  ", value));
        self.print_str(&format!("{:-6}  ", value as i16));
        self.print_str(&format!("{:-6}  ", value));
        self.print_char_display(value);
    }

    fn print_char_display(&self, value: u16) {
        debug_assert!(
            !Self::is_minimal(),
            "`print_char_display` should not be called if `--minimal`"
        );
        // Print 3 characters
        match value {
            0x00 => self.print_str("NUL"),
            0x08 => self.print_str("BS "),
            0x09 => self.print_str("HT "),
            0x0a => self.print_str("LF "),
            0x0d => self.print_str("CR "),
            0x1b => self.print_str("ESC"),
            0x24 => self.print_str("$  "),
            0x20 => self.print_str("[_]"),
            0x21..=0x7e => self.print_str(&format!("{:<3}", value as u8 as char)),
            0x00..=0x7f => self.print_str("\x1b[2m───\x1b[0m"),
            0x0080.. => self.print_str("\x1b[2m┄┄┄\x1b[0m"),
        }
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    for ch in Decolored::new(string) {
        eprint!("{}", ch);
    }
}
