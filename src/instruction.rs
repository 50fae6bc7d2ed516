use crate::error::EmuError;

/// Two-operand arithmetic and logic instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Mov,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Cmp,
}

impl BinaryOp {
    /// Result written back (or, for `cmp`, only used for flags).
    pub fn apply(self, dest: u32, src: u32) -> u32 {
        match self {
            BinaryOp::Mov => src,
            BinaryOp::Add => dest.wrapping_add(src),
            BinaryOp::Sub | BinaryOp::Cmp => dest.wrapping_sub(src),
            BinaryOp::And => dest & src,
            BinaryOp::Or => dest | src,
            BinaryOp::Xor => dest ^ src,
        }
    }

    pub fn affects_flags(self) -> bool {
        self != BinaryOp::Mov
    }

    pub fn writes_back(self) -> bool {
        self != BinaryOp::Cmp
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpCond {
    Always,
    /// Taken if ZF is set
    Equal,
}

/// A decoded code segment line. Operands borrow from the source text.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction<'a> {
    Binary {
        op: BinaryOp,
        dest: &'a str,
        src: &'a str,
    },
    /// Load the offset of a variable into a register
    Lea {
        dest: &'a str,
        src: &'a str,
    },
    /// `AX = AL * src`
    Mul {
        src: &'a str,
    },
    /// `AL = AX / src`, `AH = AX % src`
    Div {
        src: &'a str,
    },
    /// Split AL into decimal digits
    Aam,
    Int {
        vector: &'a str,
    },
    Jump {
        cond: JumpCond,
        label: &'a str,
    },
    /// `name proc`
    Proc {
        name: &'a str,
    },
    /// `endp` or `name endp`
    Endp,
    /// `end`, optionally naming the entry point
    End,
}

impl<'a> Instruction<'a> {
    pub fn decode(text: &'a str) -> Result<Self, EmuError> {
        let text = text.trim();
        let (mnemonic, rest) = match text.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (text, ""),
        };

        // `name proc` and `name endp` lead with the procedure name
        let second = rest.split_whitespace().next().unwrap_or_default();
        if second.eq_ignore_ascii_case("proc") {
            return Ok(Instruction::Proc { name: mnemonic });
        }
        if second.eq_ignore_ascii_case("endp") {
            return Ok(Instruction::Endp);
        }

        let operands = split_operands(rest);
        let mnemonic_lower = mnemonic.to_ascii_lowercase();
        let expect = |count: usize| -> Result<(), EmuError> {
            if operands.len() == count {
                Ok(())
            } else {
                Err(EmuError::MalformedInstruction {
                    mnemonic: mnemonic_lower.clone(),
                    expected: count,
                    found: operands.len(),
                })
            }
        };

        let binary = |op| -> Result<Self, EmuError> {
            expect(2)?;
            Ok(Instruction::Binary {
                op,
                dest: operands[0],
                src: operands[1],
            })
        };

        let instr = match mnemonic_lower.as_str() {
            "mov" => binary(BinaryOp::Mov)?,
            "add" => binary(BinaryOp::Add)?,
            "sub" => binary(BinaryOp::Sub)?,
            "and" => binary(BinaryOp::And)?,
            "or" => binary(BinaryOp::Or)?,
            "xor" => binary(BinaryOp::Xor)?,
            "cmp" => binary(BinaryOp::Cmp)?,
            "lea" => {
                expect(2)?;
                Instruction::Lea {
                    dest: operands[0],
                    src: operands[1],
                }
            }
            "mul" => {
                expect(1)?;
                Instruction::Mul { src: operands[0] }
            }
            "div" => {
                expect(1)?;
                Instruction::Div { src: operands[0] }
            }
            "aam" => {
                expect(0)?;
                Instruction::Aam
            }
            "int" => {
                expect(1)?;
                Instruction::Int {
                    vector: operands[0],
                }
            }
            "jmp" | "je" => {
                expect(1)?;
                let cond = match mnemonic_lower.as_str() {
                    "je" => JumpCond::Equal,
                    _ => JumpCond::Always,
                };
                Instruction::Jump {
                    cond,
                    label: operands[0],
                }
            }
            "endp" => Instruction::Endp,
            "end" => Instruction::End,
            _ => {
                return Err(EmuError::UnknownInstruction {
                    mnemonic: mnemonic.to_owned(),
                })
            }
        };
        Ok(instr)
    }
}

/// Split on commas that are not inside a character literal, trimming each operand.
fn split_operands(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut operands = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => {
                operands.push(text[start..i].trim());
                start = i + 1;
            }
            _ => (),
        }
    }
    operands.push(text[start..].trim());
    operands
}
