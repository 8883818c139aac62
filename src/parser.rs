//! The parser engine: byte-at-a-time dispatch through the character
//! classification tables, driving the number accumulator and container
//! stack, chunk-boundary invariant by construction (spec §2, §4.4).

use std::io::Read;

use crate::error::ParseError;
use crate::number::NumberAccumulator;
use crate::position::Position;
use crate::stack::ContainerStack;
use crate::table::{self, Mode, Opcode, Terminator};
use crate::value::Value;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lit {
    Null,
    True,
    False,
}

impl Lit {
    fn rest(self) -> &'static [u8] {
        match self {
            Lit::Null => b"ull",
            Lit::True => b"rue",
            Lit::False => b"alse",
        }
    }

    fn value(self) -> Value {
        match self {
            Lit::Null => Value::Null,
            Lit::True => Value::Bool(true),
            Lit::False => Value::Bool(false),
        }
    }

    fn mismatch_message(self) -> &'static str {
        match self {
            Lit::Null => "expected null",
            Lit::True => "expected true",
            Lit::False => "expected false",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bom {
    NotStarted,
    SawEf,
    SawEfBb,
    Done,
}

/// A reusable streaming JSON parser.
///
/// A `Parser` owns all of its working state (the [`ContainerStack`], the
/// [`NumberAccumulator`], string scratch space, and position tracking) so
/// that a single instance can be reused across many parses without
/// reallocating; call [`Parser::reset`] between uses, or just construct a
/// fresh one.
#[derive(Debug)]
pub struct Parser {
    mode: Mode,
    stack: ContainerStack,
    num: NumberAccumulator,
    pos: Position,
    buf: Vec<u8>,
    building_key: bool,
    rn: u32,
    ri: u8,
    lit: Option<Lit>,
    bom: Bom,
    consumed: i64,
    last_offset: usize,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Value,
            stack: ContainerStack::new(),
            num: NumberAccumulator::new(),
            pos: Position::new(),
            buf: Vec::new(),
            building_key: false,
            rn: 0,
            ri: 0,
            lit: None,
            bom: Bom::NotStarted,
            consumed: 0,
            last_offset: 0,
        }
    }

    /// Restore a `Parser` to its just-constructed state, keeping allocated
    /// buffers around for reuse.
    pub fn reset(&mut self) {
        self.mode = Mode::Value;
        self.stack.reset();
        self.num.reset();
        self.pos.reset();
        self.buf.clear();
        self.building_key = false;
        self.rn = 0;
        self.ri = 0;
        self.lit = None;
        self.bom = Bom::NotStarted;
        self.consumed = 0;
        self.last_offset = 0;
    }

    /// Parse `input` as a single JSON value. Trailing whitespace is
    /// tolerated; any other trailing byte is an error.
    pub fn parse(&mut self, input: &[u8]) -> Result<Value, ParseError> {
        self.reset();
        let mut result = None;
        self.drive_chunk(input, true, &mut |v| result = Some(v))?;
        self.finish(true, &mut |v| result = Some(v))?;
        result.ok_or_else(|| self.error_at_eof("incomplete JSON"))
    }

    /// Parse `input` as a whitespace-separated sequence of JSON values,
    /// invoking `on_value` once per value as it completes.
    pub fn parse_each(
        &mut self,
        input: &[u8],
        mut on_value: impl FnMut(Value),
    ) -> Result<(), ParseError> {
        self.reset();
        self.drive_chunk(input, false, &mut on_value)?;
        self.finish(false, &mut on_value)
    }

    /// Like [`Parser::parse`], reading from a [`Read`] in fixed-size chunks
    /// rather than from an in-memory slice.
    pub fn parse_reader(&mut self, mut reader: impl Read) -> Result<Value, ParseError> {
        self.reset();
        let mut result = None;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| ParseError::new(format!("read error: {e}"), 0, 0))?;
            if n == 0 {
                break;
            }
            self.drive_chunk(&buf[..n], true, &mut |v| result = Some(v))?;
        }
        self.finish(true, &mut |v| result = Some(v))?;
        result.ok_or_else(|| self.error_at_eof("incomplete JSON"))
    }

    /// Like [`Parser::parse_each`], reading from a [`Read`] in fixed-size
    /// chunks. The result is identical regardless of how the reader happens
    /// to split its data across `read` calls.
    pub fn parse_reader_each(
        &mut self,
        mut reader: impl Read,
        mut on_value: impl FnMut(Value),
    ) -> Result<(), ParseError> {
        self.reset();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| ParseError::new(format!("read error: {e}"), 0, 0))?;
            if n == 0 {
                break;
            }
            self.drive_chunk(&buf[..n], false, &mut on_value)?;
        }
        self.finish(false, &mut on_value)
    }

    fn drive_chunk(
        &mut self,
        chunk: &[u8],
        only_one: bool,
        on_value: &mut dyn FnMut(Value),
    ) -> Result<(), ParseError> {
        self.pos.begin_chunk(self.consumed);
        for (offset, &byte) in chunk.iter().enumerate() {
            self.step(byte, offset)?;
            self.try_deliver(only_one, on_value);
        }
        self.consumed += chunk.len() as i64;
        self.last_offset = chunk.len();
        Ok(())
    }

    fn finish(
        &mut self,
        only_one: bool,
        on_value: &mut dyn FnMut(Value),
    ) -> Result<(), ParseError> {
        if matches!(self.bom, Bom::SawEf | Bom::SawEfBb) {
            return Err(self.bom_error());
        }
        match table::terminator_for(self.mode) {
            Some(Terminator::Number) => {
                let v = self.num.as_value();
                self.stack.add(v);
                if self.stack.has_root() {
                    self.deliver(only_one, on_value);
                    Ok(())
                } else {
                    Err(self.error_at_eof("incomplete JSON"))
                }
            }
            Some(Terminator::Value) if self.stack.has_root() => {
                self.deliver(only_one, on_value);
                Ok(())
            }
            Some(Terminator::Space) => Ok(()),
            _ => Err(self.error_at_eof("incomplete JSON")),
        }
    }

    fn try_deliver(&mut self, only_one: bool, on_value: &mut dyn FnMut(Value)) {
        if table::terminator_for(self.mode) == Some(Terminator::Value) && self.stack.has_root() {
            self.deliver(only_one, on_value);
        }
    }

    fn deliver(&mut self, only_one: bool, on_value: &mut dyn FnMut(Value)) {
        let Some(v) = self.stack.take_root() else {
            return;
        };
        on_value(v);
        self.mode = if only_one { Mode::Space } else { Mode::Value };
    }

    fn step(&mut self, byte: u8, offset: usize) -> Result<(), ParseError> {
        if self.bom != Bom::Done {
            match self.bom {
                Bom::NotStarted => {
                    if byte == 0xEF {
                        self.bom = Bom::SawEf;
                        return Ok(());
                    }
                    self.bom = Bom::Done;
                }
                Bom::SawEf => {
                    return if byte == 0xBB {
                        self.bom = Bom::SawEfBb;
                        Ok(())
                    } else {
                        Err(self.bom_error())
                    };
                }
                Bom::SawEfBb => {
                    return if byte == 0xBF {
                        self.bom = Bom::Done;
                        Ok(())
                    } else {
                        Err(self.bom_error())
                    };
                }
                Bom::Done => unreachable!(),
            }
        }

        if self.mode == Mode::Literal {
            return self.step_literal(byte, offset);
        }

        let opcode = table::opcode_for(self.mode, byte);
        self.apply(opcode, byte, offset)
    }

    fn step_literal(&mut self, byte: u8, offset: usize) -> Result<(), ParseError> {
        let lit = self.lit.expect("Mode::Literal implies self.lit is set");
        let rest = lit.rest();
        if byte != rest[self.ri as usize] {
            let (line, column) = self.pos.locate(offset);
            return Err(ParseError::new(lit.mismatch_message(), line, column));
        }
        self.ri += 1;
        if self.ri as usize == rest.len() {
            self.stack.add(lit.value());
            self.mode = Mode::AfterValue;
        }
        Ok(())
    }

    fn begin_literal(&mut self, lit: Lit) {
        self.lit = Some(lit);
        self.ri = 0;
        self.mode = Mode::Literal;
    }

    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, opcode: Opcode, byte: u8, offset: usize) -> Result<(), ParseError> {
        use Opcode::*;
        match opcode {
            SkipChar => {}
            SkipNewline => self.pos.newline(offset),

            OpenArray => {
                self.stack.open_array();
                self.mode = Mode::ArrayStart;
            }
            CloseArray => {
                self.stack
                    .close_array()
                    .map_err(|e| self.stack_error(e, offset))?;
                self.mode = Mode::AfterValue;
            }
            OpenObject => {
                self.stack.open_object();
                self.mode = Mode::ObjectStart;
            }
            CloseObject => {
                self.stack
                    .close_object()
                    .map_err(|e| self.stack_error(e, offset))?;
                self.mode = Mode::AfterValue;
            }
            AfterComma => match self.stack.current_container() {
                Some(crate::stack::Container::Array) => self.mode = Mode::Value,
                Some(crate::stack::Container::Object) => self.mode = Mode::Key,
                None => return Err(self.char_error(Mode::Value, b',', offset)),
            },
            ColonColon => self.mode = Mode::Value,

            ValNull => self.begin_literal(Lit::Null),
            ValTrue => self.begin_literal(Lit::True),
            ValFalse => self.begin_literal(Lit::False),
            ValNeg => {
                self.num.reset();
                self.num.set_neg();
                self.mode = Mode::NumNeg;
            }
            Val0 => {
                self.num.reset();
                self.mode = Mode::NumZero;
            }
            ValDigit => {
                self.num.reset();
                self.num.add_digit(byte);
                self.mode = Mode::NumDigit;
            }
            ValQuote => {
                self.buf.clear();
                self.building_key = false;
                self.mode = Mode::Str;
            }
            KeyQuote => {
                self.buf.clear();
                self.building_key = true;
                self.mode = Mode::Str;
            }

            NumZero => self.mode = Mode::NumZero,
            NegDigit => {
                self.num.add_digit(byte);
                self.mode = Mode::NumDigit;
            }
            NumDigit => {
                self.num.add_digit(byte);
            }
            NumDot => self.mode = Mode::NumDot,
            NumFrac => {
                self.num.add_frac(byte);
                self.mode = Mode::NumFrac;
            }
            FracE => {
                self.num.begin_exp();
                self.mode = Mode::NumExpStart;
            }
            ExpSign => {
                self.num.set_exp_sign(byte == b'-');
                self.mode = Mode::NumExpZero;
            }
            ExpDigit => {
                self.num.add_exp(byte);
                self.mode = Mode::NumExpDigit;
            }
            NumSpc => {
                self.emit_number();
                self.mode = Mode::AfterValue;
            }
            NumNewline => {
                self.emit_number();
                self.pos.newline(offset);
                self.mode = Mode::AfterValue;
            }
            NumComma => {
                self.emit_number();
                match self.stack.current_container() {
                    Some(crate::stack::Container::Array) => self.mode = Mode::Value,
                    Some(crate::stack::Container::Object) => self.mode = Mode::Key,
                    None => return Err(self.char_error(Mode::Value, b',', offset)),
                }
            }
            NumCloseArray => {
                self.emit_number();
                self.stack
                    .close_array()
                    .map_err(|e| self.stack_error(e, offset))?;
                self.mode = Mode::AfterValue;
            }
            NumCloseObject => {
                self.emit_number();
                self.stack
                    .close_object()
                    .map_err(|e| self.stack_error(e, offset))?;
                self.mode = Mode::AfterValue;
            }

            StrOk => self.buf.push(byte),
            StrQuote => self.finish_string(),
            StrSlash => self.mode = Mode::Esc,
            EscOk => {
                let mapped = match byte {
                    b'"' => b'"',
                    b'\\' => b'\\',
                    b'/' => b'/',
                    b'b' => 0x08,
                    b'f' => 0x0C,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    _ => unreachable!("classify_esc only allows these bytes through"),
                };
                self.buf.push(mapped);
                self.mode = Mode::Str;
            }
            EscU => {
                self.rn = 0;
                self.ri = 0;
                self.mode = Mode::Unicode;
            }
            UOk => {
                let nibble = (byte as char).to_digit(16).expect("classify_unicode checked this");
                self.rn = (self.rn << 4) | nibble;
                self.ri += 1;
                if self.ri == 4 {
                    self.push_unicode_scalar();
                    self.mode = Mode::Str;
                }
            }

            CharErr => return Err(self.char_error(self.mode, byte, offset)),
        }
        Ok(())
    }

    fn emit_number(&mut self) {
        let v = self.num.as_value();
        self.stack.add(v);
    }

    fn finish_string(&mut self) {
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        if self.building_key {
            self.stack.push_key(text);
            self.mode = Mode::Colon;
        } else {
            self.stack.add(Value::String(text));
            self.mode = Mode::AfterValue;
        }
    }

    /// Encode the 4 accumulated hex nibbles as UTF-8 and append to `buf`.
    /// Lone surrogates (no pairing is attempted) fall back to U+FFFD.
    fn push_unicode_scalar(&mut self) {
        let scalar = char::from_u32(self.rn).unwrap_or('\u{FFFD}');
        let mut tmp = [0u8; 4];
        self.buf
            .extend_from_slice(scalar.encode_utf8(&mut tmp).as_bytes());
    }

    fn char_error(&self, mode: Mode, byte: u8, offset: usize) -> ParseError {
        let (line, column) = self.pos.locate(offset);
        ParseError::new(message_for(mode, byte), line, column)
    }

    fn stack_error(&self, err: crate::stack::StackError, offset: usize) -> ParseError {
        let (line, column) = self.pos.locate(offset);
        ParseError::from_stack(err, line, column)
    }

    fn bom_error(&self) -> ParseError {
        ParseError::new("expected BOM at 1:3", 1, 3)
    }

    fn error_at_eof(&self, message: &str) -> ParseError {
        let (line, column) = self.pos.locate(self.last_offset);
        ParseError::new(message, line, column)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn render_char(byte: u8) -> String {
    (byte as char).to_string()
}

fn message_for(mode: Mode, byte: u8) -> String {
    use Mode::*;
    match mode {
        ObjectStart => format!(
            "expected a string start or object close, not '{}'",
            render_char(byte)
        ),
        Key => format!("expected a string start, not '{}'", render_char(byte)),
        Colon => format!("expected a colon, not '{}'", render_char(byte)),
        AfterValue => format!("expected a comma or close, not '{}'", render_char(byte)),
        Space => format!("extra characters after close, '{}'", render_char(byte)),
        Str => format!("invalid JSON character 0x{byte:02x}"),
        Esc => format!("invalid JSON escape character '{}'", render_char(byte)),
        Unicode => format!("invalid JSON unicode character '{}'", render_char(byte)),
        NumNeg | NumZero | NumDigit | NumDot | NumFrac | NumExpStart | NumExpZero
        | NumExpDigit => "invalid number".to_string(),
        _ => format!("unexpected character '{}'", render_char(byte)),
    }
}
