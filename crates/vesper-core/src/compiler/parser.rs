//! Shunting-Yard Parser
//!
//! Turns the token stream into, per function, a list of RPN expression lines
//! and block markers. Function calls and keywords are operators on the
//! operator stack. The parser is an explicit state machine:
//!
//! - `LineStart`: start of a statement; handles `def`, `}` and empty `;`
//! - `WantOperand`: expects a value, a prefix operator, `(` or a call
//! - `HaveOperand`: expects an infix/postfix operator, `)`, `,`, `{` or `;`
//! - `FunctionDef`: the `name(params) {` header after `def`

use indexmap::{IndexMap, IndexSet};

use super::token::{classify, Class, Fixity, Sym, Token};
use crate::bytecode::OpCode;
use crate::env::Environment;
use crate::error::{CompileError, CompileResult};
use crate::host::registry::is_valid_name;

/// Keywords that may open a block
const CONDITIONS: [&str; 4] = ["if", "elif", "else", "while"];

/// One parsed line of a function body
#[derive(Debug, Clone, PartialEq)]
pub enum RpnLine {
    Expr(Vec<Sym>),
    BlockStart,
    BlockEnd,
}

/// A function as seen by the parser
#[derive(Debug, Clone, Default)]
pub struct ParsedFunction {
    pub name: String,
    pub argn: u32,

    /// Parameters first, in declaration order, then locals by first use
    pub vars: IndexSet<String>,
    pub lines: Vec<RpnLine>,
}

impl ParsedFunction {
    fn new(name: &str) -> Self {
        ParsedFunction {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Functions keyed by name; the unnamed entry point comes first, the rest in
/// definition order.
pub type ParsedProgram = IndexMap<String, ParsedFunction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    LineStart,
    WantOperand,
    HaveOperand,
    FunctionDef,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a Environment,

    functions: ParsedProgram,
    current: String,
    scope: usize,

    stack: Vec<Sym>,
    output: Vec<Sym>,
}

/// Parse a token stream
pub fn parse(tokens: &[Token], env: &Environment) -> CompileResult<ParsedProgram> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        env,
        functions: IndexMap::new(),
        current: String::new(),
        scope: 0,
        stack: Vec::new(),
        output: Vec::new(),
    };
    parser.functions.insert(String::new(), ParsedFunction::new(""));

    match parser.run() {
        Ok(()) => Ok(parser.functions),
        Err(e) => {
            parser.dump();
            Err(e)
        }
    }
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> CompileResult<()> {
        let mut state = State::LineStart;
        loop {
            state = match state {
                State::LineStart => match self.line_start()? {
                    Some(next) => next,
                    None => return Ok(()),
                },
                State::WantOperand => self.want_operand()?,
                State::HaveOperand => self.have_operand()?,
                State::FunctionDef => self.function_def()?,
            };
        }
    }

    fn line_start(&mut self) -> CompileResult<Option<State>> {
        let Some(token) = self.peek() else {
            if !self.current.is_empty() {
                return Err(self.eof());
            }
            return Ok(None);
        };

        match token.text.as_str() {
            "def" => {
                if !self.current.is_empty() || self.scope != 0 {
                    return Err(self.unexpected(token));
                }
                self.pos += 1;
                Ok(Some(State::FunctionDef))
            }
            "}" => {
                if self.scope == 0 {
                    if self.current.is_empty() {
                        return Err(CompileError::UnmatchedBracket { line: token.line });
                    }
                    self.current.clear();
                } else {
                    self.function().lines.push(RpnLine::BlockEnd);
                    self.scope -= 1;
                }
                self.pos += 1;
                Ok(Some(State::LineStart))
            }
            ";" => {
                self.pos += 1;
                Ok(Some(State::LineStart))
            }
            _ => Ok(Some(State::WantOperand)),
        }
    }

    fn want_operand(&mut self) -> CompileResult<State> {
        let token = self.next().ok_or_else(|| self.eof())?;
        let text = token.text.as_str();

        if text == "(" {
            let call = matches!(self.stack.last(), Some(Sym::Function { argc: None, .. }));
            self.stack.push(Sym::LeftBracket { call, commas: 0 });
            return Ok(State::WantOperand);
        }
        if let Some(code) = OpCode::from_symbol(text).filter(|c| c.is_prefix()) {
            self.stack.push(Sym::Operator(code, Fixity::Prefix));
            return Ok(State::WantOperand);
        }
        if text == ")" {
            // Empty brackets: a call without arguments
            match self.stack.pop() {
                Some(Sym::LeftBracket { call, commas: 0 }) => {
                    if call {
                        self.close_call(0);
                    }
                    return Ok(State::HaveOperand);
                }
                Some(Sym::LeftBracket { .. }) => return Err(self.unexpected(token)),
                _ => return Err(CompileError::UnmatchedBracket { line: token.line }),
            }
        }
        if text == "def" {
            return Err(CompileError::ReservedIdentifier { line: token.line });
        }

        let sym = match classify(text) {
            Class::Str(s) => Sym::Str(s),
            Class::Int => Sym::Int(text.parse().map_err(|_| self.invalid_literal(token))?),
            Class::Float => Sym::Float(text.parse().map_err(|_| self.invalid_literal(token))?),
            Class::Global => {
                let index: u32 = text[1..].parse().map_err(|_| self.unknown_global(token))?;
                if index as usize >= self.env.global_count() {
                    return Err(self.unknown_global(token));
                }
                Sym::Global(index)
            }
            Class::Name if self.is_function(text) => {
                self.stack.push(Sym::Function {
                    name: text.to_string(),
                    argc: None,
                });
                // Functions without parameters may omit the brackets
                let bare = self.arity(text) == Some(0)
                    && self.peek().map(|t| t.text.as_str()) != Some("(");
                return Ok(if bare {
                    State::HaveOperand
                } else {
                    State::WantOperand
                });
            }
            Class::Name => {
                let name = text.to_string();
                self.function().vars.insert(name.clone());
                Sym::Var(name)
            }
            Class::Invalid if text.starts_with('"') => return Err(self.invalid_literal(token)),
            Class::Invalid => return Err(self.unexpected(token)),
        };

        self.output.push(sym);
        Ok(State::HaveOperand)
    }

    fn have_operand(&mut self) -> CompileResult<State> {
        let token = self.next().ok_or_else(|| self.eof())?;
        let text = token.text.as_str();

        match text {
            "++" | "--" => {
                let code = if text == "++" { OpCode::Inc } else { OpCode::Dec };
                // Postfix only directly after a variable
                if matches!(self.output.last(), Some(Sym::Var(_))) {
                    self.output.push(Sym::Operator(code, Fixity::Postfix));
                    Ok(State::HaveOperand)
                } else {
                    self.stack.push(Sym::Operator(code, Fixity::Prefix));
                    Ok(State::WantOperand)
                }
            }
            ")" => {
                let (call, commas) = self.pop_to_bracket(token)?;
                self.stack.pop();
                if call {
                    self.close_call(commas + 1);
                }
                Ok(State::HaveOperand)
            }
            "," => {
                self.pop_to_bracket(token)?;
                if let Some(Sym::LeftBracket { commas, .. }) = self.stack.last_mut() {
                    *commas += 1;
                }
                Ok(State::WantOperand)
            }
            // A bracket after a plain name calls something never defined
            "(" => match self.output.last() {
                Some(Sym::Var(name)) => Err(CompileError::UnknownFunction(name.clone())),
                _ => Err(self.unexpected(token)),
            },
            "{" => {
                let opens_block = matches!(
                    self.stack.last(),
                    Some(Sym::Function { name, .. }) if CONDITIONS.contains(&name.as_str())
                );
                if !opens_block {
                    return Err(self.unexpected(token));
                }
                self.end_line(token)?;
                self.function().lines.push(RpnLine::BlockStart);
                self.scope += 1;
                Ok(State::LineStart)
            }
            ";" => {
                self.end_line(token)?;
                Ok(State::LineStart)
            }
            _ => match OpCode::from_symbol(text).filter(|c| c.is_infix()) {
                Some(code) => {
                    self.push_infix(code);
                    Ok(State::WantOperand)
                }
                None => Err(self.unexpected(token)),
            },
        }
    }

    fn function_def(&mut self) -> CompileResult<State> {
        let token = self.next().ok_or_else(|| self.eof())?;
        let name = token.text.clone();
        if !is_valid_name(&name) || self.is_function(&name) {
            return Err(CompileError::InvalidFunctionName {
                name,
                line: token.line,
            });
        }
        self.functions.insert(name.clone(), ParsedFunction::new(&name));
        self.current = name.clone();

        self.expect("(")?;
        let mut token = self.next().ok_or_else(|| self.eof())?;
        if token.text != ")" {
            loop {
                let param = token.text.clone();
                if !is_valid_name(&param) {
                    return Err(self.unexpected(token));
                }
                if self.is_function(&param) {
                    return Err(CompileError::InvalidFunctionName {
                        name: param,
                        line: token.line,
                    });
                }
                let function = self.function();
                if !function.vars.insert(param.clone()) {
                    return Err(CompileError::DuplicateParameter {
                        function: name,
                        name: param,
                        line: token.line,
                    });
                }
                function.argn += 1;

                let sep = self.next().ok_or_else(|| self.eof())?;
                match sep.text.as_str() {
                    ")" => break,
                    "," => token = self.next().ok_or_else(|| self.eof())?,
                    _ => return Err(self.unexpected(sep)),
                }
            }
        }
        self.expect("{")?;
        Ok(State::LineStart)
    }

    /// Pop operators to the output according to precedence, then stack `code`.
    fn push_infix(&mut self, code: OpCode) {
        let incoming = code.precedence();
        while let Some(top) = self.stack.last() {
            let pop = match top {
                Sym::Function { .. } => true,
                // An incoming `^` never pops operators
                Sym::Operator(_, _) if code == OpCode::BitXor => false,
                Sym::Operator(top_code, fixity) => {
                    let stacked = Sym::operator_precedence(*top_code, *fixity);
                    stacked > incoming
                        || (stacked == incoming
                            && (*fixity == Fixity::Prefix || !code.is_right_assoc()))
                }
                _ => false,
            };
            if !pop {
                break;
            }
            if let Some(sym) = self.stack.pop() {
                self.output.push(sym);
            }
        }
        self.stack.push(Sym::Operator(code, Fixity::Infix));
    }

    /// Move operators to the output until a `(` is on top. Returns that
    /// bracket's call flag and comma count; the bracket stays on the stack.
    fn pop_to_bracket(&mut self, token: &Token) -> CompileResult<(bool, usize)> {
        loop {
            match self.stack.last() {
                Some(Sym::LeftBracket { call, commas }) => return Ok((*call, *commas)),
                Some(_) => {
                    if let Some(sym) = self.stack.pop() {
                        self.output.push(sym);
                    }
                }
                None => return Err(CompileError::UnmatchedBracket { line: token.line }),
            }
        }
    }

    /// Record the argument count on the call whose bracket just closed.
    fn close_call(&mut self, args: usize) {
        if let Some(Sym::Function { argc, .. }) = self.stack.last_mut() {
            *argc = Some(args);
        }
    }

    /// Drain the operator stack and store the finished line.
    fn end_line(&mut self, token: &Token) -> CompileResult<()> {
        while let Some(sym) = self.stack.pop() {
            if matches!(sym, Sym::LeftBracket { .. }) {
                return Err(CompileError::UnmatchedBracket { line: token.line });
            }
            self.output.push(sym);
        }
        let line = std::mem::take(&mut self.output);
        self.function().lines.push(RpnLine::Expr(line));
        Ok(())
    }

    fn is_function(&self, name: &str) -> bool {
        self.env.hosts().lookup(name).is_some()
            || (!name.is_empty() && self.functions.contains_key(name))
    }

    fn arity(&self, name: &str) -> Option<usize> {
        let hosts = self.env.hosts();
        match hosts.lookup(name) {
            Some(id) => hosts.arity(id),
            None => self.functions.get(name).map(|f| f.argn as usize),
        }
    }

    fn function(&mut self) -> &mut ParsedFunction {
        self.functions
            .entry(self.current.clone())
            .or_insert_with_key(|name| ParsedFunction::new(name))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, text: &str) -> CompileResult<()> {
        let token = self.next().ok_or_else(|| self.eof())?;
        if token.text != text {
            return Err(self.unexpected(token));
        }
        Ok(())
    }

    fn eof(&self) -> CompileError {
        CompileError::UnexpectedEof {
            function: self.current.clone(),
        }
    }

    fn unexpected(&self, token: &Token) -> CompileError {
        CompileError::UnexpectedToken {
            token: token.text.clone(),
            line: token.line,
        }
    }

    fn invalid_literal(&self, token: &Token) -> CompileError {
        CompileError::InvalidLiteral {
            literal: token.text.clone(),
            line: token.line,
        }
    }

    fn unknown_global(&self, token: &Token) -> CompileError {
        CompileError::UnknownGlobal {
            index: token.text[1..].to_string(),
            line: token.line,
        }
    }

    /// Log what was parsed so far, one RPN line per row.
    fn dump(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for function in self.functions.values() {
            log::debug!("### {}", function.name);
            for line in &function.lines {
                match line {
                    RpnLine::Expr(syms) => {
                        let row: Vec<String> = syms.iter().map(describe).collect();
                        log::debug!("{}", row.join(" "));
                    }
                    RpnLine::BlockStart => log::debug!("{{"),
                    RpnLine::BlockEnd => log::debug!("}}"),
                }
            }
        }
    }
}

fn describe(sym: &Sym) -> String {
    match sym {
        Sym::Int(i) => i.to_string(),
        Sym::Float(x) => x.to_string(),
        Sym::Str(s) => format!("{:?}", s),
        Sym::Var(name) => name.clone(),
        Sym::Global(g) => format!("@{}", g),
        Sym::Temp(r) => format!("r{}", r),
        Sym::Operator(code, _) => code.symbol().to_string(),
        Sym::Function { name, .. } => name.clone(),
        Sym::LeftBracket { .. } => "(".to_string(),
        Sym::BlockStart => "{".to_string(),
        Sym::BlockEnd => "}".to_string(),
    }
}
