use miette::{Report, Result};

use crate::{
    error,
    memory::Value,
    program::{DataDecl, Program, Stmt},
    span::{Span, SrcOffset},
    symbol::{canonical, fx_map, is_ident, FxMap},
};

/// Which declarative region of the source subsequent lines belong to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Segment {
    #[default]
    None,
    Stack,
    Data,
    Code,
}

/// A source line after comments and surrounding whitespace are removed.
#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    text: &'a str,
    span: Span,
}

impl<'a> Line<'a> {
    /// Span of `part`, which must be a sub-slice of this line.
    fn span_of(&self, part: &str) -> Span {
        let start = part.as_ptr() as usize - self.text.as_ptr() as usize;
        self.span.sub(start, part.len())
    }
}

/// Turns source text into a [`Program`], one line at a time.
///
/// Only directives, data declarations and labels are understood here. Instructions are stored
/// as text and any mistakes in them surface when they are executed.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    segment: Segment,
    program: Program,
    /// Where each label was last defined, for redefinition warnings
    label_spans: FxMap<String, Span>,
    warnings: Vec<Report>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            segment: Segment::None,
            program: Program::new(),
            label_spans: fx_map(),
            warnings: Vec::new(),
        }
    }

    /// Create a program out of the source
    pub fn parse(self) -> Result<Program> {
        self.parse_with_warnings().map(|(program, _)| program)
    }

    /// Like [`AsmParser::parse`], also returning non-fatal diagnostics such as redefined labels.
    pub fn parse_with_warnings(mut self) -> Result<(Program, Vec<Report>)> {
        for line in lines(self.src) {
            self.parse_line(line)?;
        }
        // Consume self to return program
        Ok((self.program, self.warnings))
    }

    fn parse_line(&mut self, line: Line) -> Result<()> {
        let mut words = line.text.split_whitespace();
        let first = words.next().unwrap_or_default();

        if first.starts_with('.') {
            match first.to_ascii_lowercase().as_str() {
                ".model" => self.program.model = words.next().map(str::to_ascii_lowercase),
                ".stack" => {
                    if let Some(size) = words.next() {
                        self.program.stack_size = parse_stack_size(size)
                            .ok_or_else(|| error::load_bad_stack(line.span_of(size), self.src))?;
                    }
                    self.segment = Segment::Stack;
                }
                ".data" => self.segment = Segment::Data,
                ".code" => self.segment = Segment::Code,
                // Processor selection and the like have no meaning here
                _ => (),
            }
            return Ok(());
        }

        match self.segment {
            Segment::Data => self.parse_data(line),
            Segment::Code => self.parse_code(line)?,
            Segment::None | Segment::Stack => (),
        }
        Ok(())
    }

    /// `name db value`. Anything else in the data segment is skipped.
    fn parse_data(&mut self, line: Line) {
        let words: Vec<&str> = line.text.split_whitespace().collect();
        if words.len() < 3 || !words[1].eq_ignore_ascii_case("db") {
            return;
        }
        let name = words[0].trim_end_matches(',');

        let value = match (line.text.find('\''), line.text.rfind('\'')) {
            (Some(first), Some(last)) if first < last => Value::Str(line.text[first + 1..last].into()),
            (Some(_), Some(_)) => Value::Str(String::new()),
            _ => match words[2] {
                "?" => Value::Number(0),
                word if word.bytes().all(|b| b.is_ascii_digit()) => {
                    Value::Number(word.parse().unwrap_or(0))
                }
                _ => Value::Number(0),
            },
        };

        self.program.data.push(DataDecl {
            name: canonical(name),
            value,
            span: line.span,
        });
    }

    /// Instruction, optionally prefixed by `label:`.
    fn parse_code(&mut self, line: Line) -> Result<()> {
        let mut text = line.text;

        if let Some((label, rest)) = text.split_once(':') {
            if is_ident(label.trim_end()) {
                let label = label.trim_end();
                self.insert_label(label, line.span_of(label));
                text = rest.trim();
            }
        }

        if !text.is_empty() {
            self.program.stmts.push(Stmt {
                text: text.to_owned(),
                span: line.span_of(text),
            });
        }
        Ok(())
    }

    /// Later definitions of a label replace earlier ones.
    fn insert_label(&mut self, label: &str, span: Span) {
        let name = canonical(label);
        if let Some(previous) = self.label_spans.get(&name) {
            self.warnings
                .push(error::load_duplicate_label(span, *previous, self.src));
        }
        // Index the next instruction will occupy
        self.program.labels.insert(name.clone(), self.program.stmts.len());
        self.label_spans.insert(name, span);
    }
}

/// Non-empty lines with comments removed, alongside their location.
fn lines(src: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offs = 0;
    src.split_inclusive('\n').filter_map(move |raw| {
        let start = offs;
        offs += raw.len();

        let code = strip_comment(raw);
        let text = code.trim();
        if text.is_empty() {
            return None;
        }
        let lead = code.len() - code.trim_start().len();
        Some(Line {
            text,
            span: Span::new(SrcOffset(start + lead), text.len()),
        })
    })
}

/// Cut the line at the first `;` that is not inside a character or string literal.
fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ';' if !in_quote => return &line[..i],
            _ => (),
        }
    }
    line
}

/// Hexadecimal, with or without a trailing `h`.
fn parse_stack_size(text: &str) -> Option<u16> {
    let digits = text.strip_suffix(['h', 'H']).unwrap_or(text);
    u16::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::DEFAULT_STACK_SIZE;
    use miette::Severity;

    fn parse(src: &str) -> Program {
        AsmParser::new(src).parse().unwrap()
    }

    fn texts(program: &Program) -> Vec<&str> {
        program.iter().map(|stmt| stmt.text.as_str()).collect()
    }

    #[test]
    fn segments() {
        let program = parse(
            r#"
            .model small
            .stack 200h
            .data
            msg db 'Hello$'
            .code
            mov ah, 9
            "#,
        );
        assert_eq!(program.model(), Some("small"));
        assert_eq!(program.stack_size(), 0x200);
        assert_eq!(program.data().len(), 1);
        assert_eq!(texts(&program), ["mov ah, 9"]);
    }

    #[test]
    fn lines_outside_code_are_not_instructions() {
        let program = parse(
            r#"
            mov ax, 1
            .stack
            mov bx, 2
            .data
            mov cx, 3
            "#,
        );
        assert!(program.is_empty());
        assert_eq!(program.stack_size(), DEFAULT_STACK_SIZE);
    }

    #[test]
    fn directives_are_case_insensitive() {
        let program = parse(".DATA\nx DB 5\n.Code\nMOV AL, X\n");
        assert_eq!(program.data()[0].name, "x");
        assert_eq!(program.data()[0].value, Value::Number(5));
        assert_eq!(texts(&program), ["MOV AL, X"]);
    }

    #[test]
    fn data_values() {
        let program = parse(
            r#"
            .data
            msg db 'Hi there$'
            q db ?
            n db 42
            h db 0Ah
            e db ''
            s db 'x'
            c, db 7
            skipped dw 4
            "#,
        );
        let values: Vec<_> = program
            .data()
            .iter()
            .map(|decl| (decl.name.as_str(), decl.value.clone()))
            .collect();
        assert_eq!(
            values,
            [
                ("msg", Value::Str("Hi there$".into())),
                ("q", Value::Number(0)),
                ("n", Value::Number(42)),
                ("h", Value::Number(0)),
                ("e", Value::Str(String::new())),
                ("s", Value::Str("x".into())),
                ("c", Value::Number(7)),
            ]
        );
    }

    #[test]
    fn comments() {
        let program = parse(
            r#"
            ; whole line
            .code ; trailing
            mov al, ';' ; not the first semicolon
              ;indented comment
            add al, 1;tight
            "#,
        );
        assert_eq!(texts(&program), ["mov al, ';'", "add al, 1"]);
    }

    #[test]
    fn labels() {
        let program = parse(
            r#"
            .code
            start:
                mov al, 1
            again: add al, 1
                jmp done
            done:
            "#,
        );
        assert_eq!(texts(&program), ["mov al, 1", "add al, 1", "jmp done"]);
        assert_eq!(program.label("start"), Some(0));
        assert_eq!(program.label("AGAIN"), Some(1));
        // Trailing label points past the end
        assert_eq!(program.label("done"), Some(3));
        assert_eq!(program.label("missing"), None);
    }

    #[test]
    fn colon_in_operand_is_not_label() {
        let program = parse(".code\nmov dl, ':'\n");
        assert_eq!(texts(&program), ["mov dl, ':'"]);
        assert_eq!(program.labels().count(), 0);
    }

    #[test]
    fn redefined_label_uses_last_definition() {
        let (program, warnings) = AsmParser::new(".code\nl1: mov al, 1\nL1: mov al, 2\njmp l1\n")
            .parse_with_warnings()
            .unwrap();
        assert_eq!(texts(&program), ["mov al, 1", "mov al, 2", "jmp l1"]);
        assert_eq!(program.label("l1"), Some(1));
        assert_eq!(program.labels().count(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity(), Some(Severity::Warning));

        let program = parse(".code\nl1: mov al, 1\nl1: mov al, 2\n");
        assert_eq!(program.label("l1"), Some(1));
    }

    #[test]
    fn bad_stack_size() {
        assert!(AsmParser::new(".stack zz\n").parse().is_err());
        assert!(AsmParser::new(".stack 10000h\n").parse().is_err());
    }

    #[test]
    fn spans_point_at_source() {
        let src = ".code\n   mov al, 1 ; comment\nlbl: add al, 2\n";
        let program = parse(src);
        for stmt in &program {
            assert_eq!(&src[stmt.span.offs()..stmt.span.end()], stmt.text);
        }
    }

    #[test]
    fn reload_is_independent() {
        let first = parse(".code\na: mov al, 1\n");
        let second = parse(".code\nmov al, 2\n");
        assert_eq!(first.label("a"), Some(0));
        assert_eq!(second.label("a"), None);
        assert_eq!(texts(&second), ["mov al, 2"]);
    }
}
