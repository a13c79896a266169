//! The fixed operator catalogue.
//!
//! Every operator knows its spelling, arity, the method name it dispatches
//! to, its binding precedence and associativity, and three tags:
//! *comparative* (result reduced to a boolean by sign), *boolean*
//! (short-circuits, never dispatches) and *assignment* (`OP=` sugar that maps
//! to an underlying binary operator). [`Operator::Sentinel`] has precedence
//! zero and seeds the parser's precedence-climbing stack.

use std::fmt;

use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Sentinel,

    // ── unary prefix ────────────────────────────────────────────────────
    Negate,
    Not,
    BitwiseNot,

    // ── binary ──────────────────────────────────────────────────────────
    Pow,
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    ShiftLeft,
    ShiftRight,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    And,
    Or,

    // ── assignment sugar ────────────────────────────────────────────────
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
    PowAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

static BINARY: phf::Map<&'static str, Operator> = phf_map! {
    "**"  => Operator::Pow,
    "*"   => Operator::Multiply,
    "/"   => Operator::Divide,
    "%"   => Operator::Remainder,
    "+"   => Operator::Add,
    "-"   => Operator::Subtract,
    "<<"  => Operator::ShiftLeft,
    ">>"  => Operator::ShiftRight,
    "<"   => Operator::Less,
    ">"   => Operator::Greater,
    "<="  => Operator::LessEqual,
    ">="  => Operator::GreaterEqual,
    "=="  => Operator::Equal,
    "!="  => Operator::NotEqual,
    "===" => Operator::Identical,
    "!==" => Operator::NotIdentical,
    "&"   => Operator::BitwiseAnd,
    "^"   => Operator::BitwiseXor,
    "|"   => Operator::BitwiseOr,
    "&&"  => Operator::And,
    "||"  => Operator::Or,
};

static UNARY: phf::Map<&'static str, Operator> = phf_map! {
    "-" => Operator::Negate,
    "!" => Operator::Not,
    "~" => Operator::BitwiseNot,
};

static ASSIGNMENT: phf::Map<&'static str, Operator> = phf_map! {
    "+="  => Operator::AddAssign,
    "-="  => Operator::SubtractAssign,
    "*="  => Operator::MultiplyAssign,
    "/="  => Operator::DivideAssign,
    "%="  => Operator::RemainderAssign,
    "**=" => Operator::PowAssign,
    "<<=" => Operator::ShiftLeftAssign,
    ">>=" => Operator::ShiftRightAssign,
    "&="  => Operator::AndAssign,
    "|="  => Operator::OrAssign,
    "^="  => Operator::XorAssign,
};

impl Operator {
    pub fn binary(symbol: &str) -> Option<Operator> {
        BINARY.get(symbol).copied()
    }

    pub fn unary(symbol: &str) -> Option<Operator> {
        UNARY.get(symbol).copied()
    }

    pub fn assignment(symbol: &str) -> Option<Operator> {
        ASSIGNMENT.get(symbol).copied()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Sentinel => "",
            Operator::Negate => "-",
            Operator::Not => "!",
            Operator::BitwiseNot => "~",
            Operator::Pow => "**",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Remainder => "%",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::ShiftLeft => "<<",
            Operator::ShiftRight => ">>",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Identical => "===",
            Operator::NotIdentical => "!==",
            Operator::BitwiseAnd => "&",
            Operator::BitwiseXor => "^",
            Operator::BitwiseOr => "|",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::AddAssign => "+=",
            Operator::SubtractAssign => "-=",
            Operator::MultiplyAssign => "*=",
            Operator::DivideAssign => "/=",
            Operator::RemainderAssign => "%=",
            Operator::PowAssign => "**=",
            Operator::ShiftLeftAssign => "<<=",
            Operator::ShiftRightAssign => ">>=",
            Operator::AndAssign => "&=",
            Operator::OrAssign => "|=",
            Operator::XorAssign => "^=",
        }
    }

    /// Number of operands: 1 for prefix operators, 2 otherwise.
    pub fn arity(self) -> usize {
        match self {
            Operator::Negate | Operator::Not | Operator::BitwiseNot => 1,
            _ => 2,
        }
    }

    /// Name of the method a dispatched operator calls.
    pub fn method_name(self) -> &'static str {
        match self.underlying() {
            Operator::Negate => "negate",
            Operator::Not => "not",
            Operator::BitwiseNot => "bitwiseNot",
            Operator::Pow => "pow",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Remainder => "remainder",
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::ShiftLeft => "shiftLeft",
            Operator::ShiftRight => "shiftRight",
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual => {
                "compareTo"
            }
            Operator::Equal | Operator::NotEqual => "eq",
            Operator::BitwiseAnd => "bitwiseAnd",
            Operator::BitwiseXor => "bitwiseXor",
            Operator::BitwiseOr => "bitwiseOr",
            Operator::And => "and",
            Operator::Or => "or",
            _ => "",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::Sentinel => 0,
            Operator::Pow => 14,
            Operator::Negate | Operator::Not | Operator::BitwiseNot => 13,
            Operator::Multiply | Operator::Divide | Operator::Remainder => 12,
            Operator::Add | Operator::Subtract => 11,
            Operator::ShiftLeft | Operator::ShiftRight => 10,
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual => 9,
            Operator::Equal | Operator::NotEqual | Operator::Identical | Operator::NotIdentical => {
                8
            }
            Operator::BitwiseAnd => 7,
            Operator::BitwiseXor => 6,
            Operator::BitwiseOr => 5,
            Operator::And => 4,
            Operator::Or => 3,
            _ => 1,
        }
    }

    pub fn associativity(self) -> Associativity {
        match self {
            Operator::Pow | Operator::Negate | Operator::Not | Operator::BitwiseNot => {
                Associativity::Right
            }
            op if op.is_assignment() => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    /// `<`, `>`, `<=`, `>=`: the dispatched `compareTo` result is reduced to a
    /// boolean by its sign.
    pub fn is_comparative(self) -> bool {
        matches!(
            self,
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual
        )
    }

    /// `&&`, `||`, `!`: short-circuiting, never dispatched to methods.
    pub fn is_boolean(self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }

    /// `===`, `!==`: structural identity, never dispatched to methods.
    pub fn is_identity(self) -> bool {
        matches!(self, Operator::Identical | Operator::NotIdentical)
    }

    /// The `OP=` family.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Operator::AddAssign
                | Operator::SubtractAssign
                | Operator::MultiplyAssign
                | Operator::DivideAssign
                | Operator::RemainderAssign
                | Operator::PowAssign
                | Operator::ShiftLeftAssign
                | Operator::ShiftRightAssign
                | Operator::AndAssign
                | Operator::OrAssign
                | Operator::XorAssign
        )
    }

    /// For assignment sugar, the binary operator applied before the write;
    /// every other operator maps to itself.
    pub fn underlying(self) -> Operator {
        match self {
            Operator::AddAssign => Operator::Add,
            Operator::SubtractAssign => Operator::Subtract,
            Operator::MultiplyAssign => Operator::Multiply,
            Operator::DivideAssign => Operator::Divide,
            Operator::RemainderAssign => Operator::Remainder,
            Operator::PowAssign => Operator::Pow,
            Operator::ShiftLeftAssign => Operator::ShiftLeft,
            Operator::ShiftRightAssign => Operator::ShiftRight,
            Operator::AndAssign => Operator::BitwiseAnd,
            Operator::OrAssign => Operator::BitwiseOr,
            Operator::XorAssign => Operator::BitwiseXor,
            other => other,
        }
    }

    /// Should `self` be pushed on top of `top` rather than reducing `top`
    /// first?
    pub fn binds_tighter_than(self, top: Operator) -> bool {
        let (mine, theirs) = (self.precedence(), top.precedence());
        mine > theirs || (mine == theirs && self.associativity() == Associativity::Right)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
