//! Bytecode Opcode Definitions
//!
//! Numeric encoding of every operator and assignment form.
//! Opcode values are written into bytecode files and must never change.

/// Operator opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Assign = 0,
    Add = 1,
    Sub = 2,
    Mul = 3,
    Div = 4,
    Not = 5,
    NotEqual = 6,
    Greater = 7,
    Less = 8,
    GreaterEqual = 9,
    LessEqual = 10,
    Equal = 11,
    BitAnd = 12,
    BitXor = 13,
    BitOr = 14,
    And = 15,
    Or = 16,
    Xor = 17,
    Inc = 18,
    Dec = 19,
    AddAssign = 20,
    SubAssign = 21,
    MulAssign = 22,
    DivAssign = 23,
    Mod = 24,
    ModAssign = 25,
}

const ALL: [OpCode; 26] = [
    OpCode::Assign,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Not,
    OpCode::NotEqual,
    OpCode::Greater,
    OpCode::Less,
    OpCode::GreaterEqual,
    OpCode::LessEqual,
    OpCode::Equal,
    OpCode::BitAnd,
    OpCode::BitXor,
    OpCode::BitOr,
    OpCode::And,
    OpCode::Or,
    OpCode::Xor,
    OpCode::Inc,
    OpCode::Dec,
    OpCode::AddAssign,
    OpCode::SubAssign,
    OpCode::MulAssign,
    OpCode::DivAssign,
    OpCode::Mod,
    OpCode::ModAssign,
];

impl OpCode {
    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        ALL.get(byte as usize).copied()
    }

    /// Look up the operator spelled by a source token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            OpCode::Assign => "=",
            OpCode::Add => "+",
            OpCode::Sub => "-",
            OpCode::Mul => "*",
            OpCode::Div => "/",
            OpCode::Not => "!",
            OpCode::NotEqual => "!=",
            OpCode::Greater => ">",
            OpCode::Less => "<",
            OpCode::GreaterEqual => ">=",
            OpCode::LessEqual => "<=",
            OpCode::Equal => "==",
            OpCode::BitAnd => "&",
            OpCode::BitXor => "^",
            OpCode::BitOr => "|",
            OpCode::And => "&&",
            OpCode::Or => "||",
            OpCode::Xor => "^^",
            OpCode::Inc => "++",
            OpCode::Dec => "--",
            OpCode::AddAssign => "+=",
            OpCode::SubAssign => "-=",
            OpCode::MulAssign => "*=",
            OpCode::DivAssign => "/=",
            OpCode::Mod => "%",
            OpCode::ModAssign => "%=",
        }
    }

    /// `!`, `++` and `--` always take a single operand.
    pub fn is_single(self) -> bool {
        matches!(self, OpCode::Not | OpCode::Inc | OpCode::Dec)
    }

    /// Operators allowed in prefix position.
    pub fn is_prefix(self) -> bool {
        self.is_single() || self == OpCode::Sub
    }

    /// Operators allowed between two operands.
    pub fn is_infix(self) -> bool {
        !self.is_single()
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, OpCode::Inc | OpCode::Dec)
    }

    /// `+=`, `-=`, `*=`, `/=`, `%=`: the first operand is also the target.
    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            OpCode::AddAssign
                | OpCode::SubAssign
                | OpCode::MulAssign
                | OpCode::DivAssign
                | OpCode::ModAssign
        )
    }

    /// Binding strength of the infix form (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            OpCode::Assign
            | OpCode::AddAssign
            | OpCode::SubAssign
            | OpCode::MulAssign
            | OpCode::DivAssign
            | OpCode::ModAssign => 0,
            OpCode::And | OpCode::Or | OpCode::Xor => 1,
            OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Greater
            | OpCode::Less
            | OpCode::GreaterEqual
            | OpCode::LessEqual => 2,
            OpCode::BitAnd | OpCode::BitXor | OpCode::BitOr => 3,
            OpCode::Add | OpCode::Sub => 4,
            OpCode::Mul | OpCode::Div | OpCode::Mod => 5,
            OpCode::Not => 6,
            OpCode::Inc | OpCode::Dec => 7,
        }
    }

    /// Assignment forms group to the right, everything else to the left.
    pub fn is_right_assoc(self) -> bool {
        self.precedence() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_numbers_are_stable() {
        for (n, op) in ALL.iter().enumerate() {
            assert_eq!(*op as u8 as usize, n);
            assert_eq!(OpCode::from_u8(n as u8), Some(*op));
        }
        assert_eq!(OpCode::from_u8(26), None);
        assert_eq!(OpCode::Mod as u8, 24);
        assert_eq!(OpCode::ModAssign as u8, 25);
    }

    #[test]
    fn symbols_round_trip() {
        for op in ALL {
            assert_eq!(OpCode::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(OpCode::from_symbol("**"), None);
    }
}
