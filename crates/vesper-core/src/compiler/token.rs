//! Compiler Tokens
//!
//! Raw lexemes from the tokenizer and the typed symbols the parser builds
//! from them. Symbols flow unchanged through lowering and checking; only
//! the resolver turns them into bytecode operands.

use crate::bytecode::OpCode;

/// A lexeme and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, line: u32) -> Self {
        Token {
            text: text.into(),
            line,
        }
    }
}

/// Position of an operator relative to its operand(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Infix,
    Postfix,
}

/// Parsed symbol
#[derive(Debug, Clone, PartialEq)]
pub enum Sym {
    Int(i32),
    Float(f32),
    Str(String),

    /// Named local variable
    Var(String),

    /// `@N`
    Global(u32),

    /// Temporary register assigned during lowering
    Temp(u32),

    Operator(OpCode, Fixity),

    /// Call of a user function, host function or keyword. `argc` is the
    /// number of bracketed arguments when the call had a bracket.
    Function { name: String, argc: Option<usize> },

    /// `(` on the operator stack
    LeftBracket { call: bool, commas: usize },

    BlockStart,
    BlockEnd,
}

impl Sym {
    /// Literals and storage references; anything else is structural.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Sym::Int(_) | Sym::Float(_) | Sym::Str(_) | Sym::Var(_) | Sym::Global(_) | Sym::Temp(_)
        )
    }

    pub fn is_addressable(&self) -> bool {
        matches!(self, Sym::Var(_) | Sym::Global(_) | Sym::Temp(_))
    }

    /// Operand count of an operator symbol
    pub fn operator_arity(code: OpCode, fixity: Fixity) -> usize {
        if code.is_single() || (code == OpCode::Sub && fixity == Fixity::Prefix) {
            1
        } else {
            2
        }
    }

    /// Binding strength; prefix `-` binds like `!`.
    pub fn operator_precedence(code: OpCode, fixity: Fixity) -> u8 {
        if code == OpCode::Sub && fixity == Fixity::Prefix {
            OpCode::Not.precedence()
        } else {
            code.precedence()
        }
    }
}

/// Lexical class of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Class {
    /// `"..."`, payload without the quotes
    Str(String),
    Int,
    Float,
    Name,

    /// `@digits`
    Global,
    Invalid,
}

/// Classify a lexeme the way the parser sees operands.
pub fn classify(text: &str) -> Class {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Class::Str(text[1..text.len() - 1].to_string());
    }

    let Some(first) = text.chars().next() else {
        return Class::Invalid;
    };

    if first.is_ascii_digit() || first == '-' {
        let body = text.strip_prefix('-').unwrap_or(text);
        let mut digits = 0;
        let mut dot = false;
        for (i, c) in body.chars().enumerate() {
            match c {
                '0'..='9' => digits += 1,
                '.' if !dot && i > 0 && i + 1 < body.len() => dot = true,
                _ => return Class::Invalid,
            }
        }
        if digits == 0 {
            Class::Invalid
        } else if dot {
            Class::Float
        } else {
            Class::Int
        }
    } else if let Some(index) = text.strip_prefix('@') {
        if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
            Class::Global
        } else {
            Class::Invalid
        }
    } else if text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Class::Name
    } else {
        Class::Invalid
    }
}
