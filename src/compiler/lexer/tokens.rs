use crate::compiler::{CompilerDisplay, CompilerDisplayError, SourceMap, Span, StringId, StringTable};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Lex {
    /// An integer literal, kept as written so that it can be validated and
    /// converted by the constant evaluator.
    Int(StringId),
    Identifier(StringId),
    Package,
    Const,
    Type,
    Func,
    Struct,
    Default,
    Add,
    Minus,
    Mul,
    Div,
    Rem,
    And,
    AndNot,
    Or,
    Xor,
    Shl,
    Shr,
    Assign,
    Comma,
    /// An explicit `;` or a newline which ends a statement.
    Semicolon,
    Colon,
    Ellipsis,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Lex {
    pub fn get_str(&self) -> Option<StringId> {
        match self {
            Lex::Int(s) | Lex::Identifier(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns true if a newline directly after this token ends the statement.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            Lex::Int(_) | Lex::Identifier(_) | Lex::RParen | Lex::RBracket | Lex::RBrace
        )
    }
}

impl std::fmt::Display for Lex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Lex::*;
        match self {
            Int(id) => f.write_fmt(format_args!("literal {}", id)),
            Identifier(id) => f.write_fmt(format_args!("identifier {}", id)),
            Package => f.write_str("package"),
            Const => f.write_str("const"),
            Type => f.write_str("type"),
            Func => f.write_str("func"),
            Struct => f.write_str("struct"),
            Default => f.write_str("default"),
            Add => f.write_str("+"),
            Minus => f.write_str("-"),
            Mul => f.write_str("*"),
            Div => f.write_str("/"),
            Rem => f.write_str("%"),
            And => f.write_str("&"),
            AndNot => f.write_str("&^"),
            Or => f.write_str("|"),
            Xor => f.write_str("^"),
            Shl => f.write_str("<<"),
            Shr => f.write_str(">>"),
            Assign => f.write_str("="),
            Comma => f.write_str(","),
            Semicolon => f.write_str(";"),
            Colon => f.write_str(":"),
            Ellipsis => f.write_str("..."),
            LParen => f.write_str("("),
            RParen => f.write_str(")"),
            LBracket => f.write_str("["),
            RBracket => f.write_str("]"),
            LBrace => f.write_str("{"),
            RBrace => f.write_str("}"),
        }
    }
}

impl CompilerDisplay for Lex {
    fn fmt(&self, _: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        match self {
            Lex::Identifier(sid) => Ok(format!("identifier {}", st.get(*sid)?)),
            Lex::Int(sid) => Ok(format!("literal {}", st.get(*sid)?)),
            _ => Ok(format!("'{}'", self)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The value of the token
    pub sym: Lex,

    pub span: Span,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("S{}: {}", self.span, self.sym))
    }
}

impl CompilerDisplay for Token {
    fn fmt(&self, sm: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        self.sym.fmt(sm, st)
    }
}

impl Token {
    pub fn new(s: Lex, span: Span) -> Token {
        Token { sym: s, span }
    }

    /// Compares only the kind of the token, ignoring any value it carries.
    pub fn token_eq(&self, a: &Lex) -> bool {
        std::mem::discriminant(&self.sym) == std::mem::discriminant(a)
    }
}
