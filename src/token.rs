//! Token classifier (C1) and lexer (C2).
//!
//! Unlike the teacher's character-at-a-time scanner, `luz` drives
//! tokenization off a single master [`regex::Regex`] built from named
//! alternatives, one per token family, tried left-to-right in the order
//! they appear in [`MASTER_PATTERN`] — i.e. longest/most-specific
//! alternatives are listed first so e.g. `**=` is matched before `**`
//! before `*`. Anything the regex does not match (whitespace) is silently
//! skipped, exactly as `spec.md` §4.1 requires.

use crate::position::{Cursor, Position};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A single scanned token together with the position it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: Position,
}

/// The closed set of lexical token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    BigInt(String),
    Str(String),
    Ident(String),
    Bool(bool),
    Null,
    Maybe,
    Inf,

    // Brackets/delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    VecStart,  // ![
    SetStart,  // @{
    RightBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Question,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    FloorSlash, // ~/
    Percent,
    Pow, // **

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Shr3, // >>>

    // Comparison / logic
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Spaceship, // <=>
    AndAnd,
    OrOr,
    QQ, // ??
    Bang,

    // Ranges
    DotDot,   // ..
    DotDotEq, // ..=

    // Assignment family
    Assign,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    FloorSlashEq, // ~/=
    PercentEq,
    PowEq, // **=
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,

    // Inc/dec as single tokens (carry the identifier they were fused with)
    PreIncr(String),
    PreDecr(String),
    PostIncr(String),
    PostDecr(String),

    // Keywords
    If,
    Else,
    Loop,
    In,
    Break,
    Continue,
    Fn,
    Return,
    Const,
    Del,
    Has,
    As,
    LenOf,
    TypeOf,
    CopyOf,
    SizeOf,
    FirstOf,
    LastOf,
    Log,
    LogLn,
    Get,
    GetLn,

    Eof,
}

const RESERVED_WORDS: &[&str] = &[
    "if", "else", "loop", "in", "break", "continue", "fn", "return", "const", "del", "has", "as",
    "lenof", "typeof", "copyof", "sizeof", "firstof", "lastof", "log", "logln", "get", "getln",
];

impl Token {
    /// Is this a keyword that may never be used as a variable name?
    #[must_use]
    pub fn is_reserved_word(name: &str) -> bool {
        RESERVED_WORDS.contains(&name)
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Num(_)
                | Self::BigInt(_)
                | Self::Str(_)
                | Self::Bool(_)
                | Self::Null
                | Self::Maybe
                | Self::Inf
        )
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Num(_))
    }

    #[must_use]
    pub fn is_big_int(&self) -> bool {
        matches!(self, Self::BigInt(_))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    #[must_use]
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Ident(_))
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_maybe(&self) -> bool {
        matches!(self, Self::Maybe)
    }

    #[must_use]
    pub fn is_inf(&self) -> bool {
        matches!(self, Self::Inf)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Regex alternatives, longest-match operators before their prefixes.
/// Each group name maps to a [`Token`] constructor in [`Lexer::classify`].
const MASTER_PATTERN: &str = r#"(?x)
    (?P<ws>\s+)
  | (?P<comment_line>//[^\n]*|\#[^\n]*)
  | (?P<comment_block>/\*[\s\S]*?\*/)
  | (?P<bigint>[0-9][0-9_]*[xX][lL])
  | (?P<number>(?:\d[\d_]*)?\.\d[\d_]*(?:[eE][+-]?\d+)? | \d[\d_]*(?:\.\d[\d_]*)?(?:[eE][+-]?\d+)?)
  | (?P<dqstr>"(?:\\.|[^"\\])*")
  | (?P<sqstr>'(?:\\.|[^'\\])*')
  | (?P<bqstr>`(?:\\.|[^`\\])*`)
  | (?P<preincr>\+\+[A-Za-z_$áéíóúüñÁÉÍÓÚÜÑ][A-Za-z0-9_$áéíóúüñÁÉÍÓÚÜÑ]*)
  | (?P<predecr>--[A-Za-z_$áéíóúüñÁÉÍÓÚÜÑ][A-Za-z0-9_$áéíóúüñÁÉÍÓÚÜÑ]*)
  | (?P<postincr>[A-Za-z_$áéíóúüñÁÉÍÓÚÜÑ][A-Za-z0-9_$áéíóúüñÁÉÍÓÚÜÑ]*\+\+)
  | (?P<postdecr>[A-Za-z_$áéíóúüñÁÉÍÓÚÜÑ][A-Za-z0-9_$áéíóúüñÁÉÍÓÚÜÑ]*--)
  | (?P<ident>[A-Za-z_$áéíóúüñÁÉÍÓÚÜÑ][A-Za-z0-9_$áéíóúüñÁÉÍÓÚÜÑ]*)
  | (?P<spaceship><=>)
  | (?P<dotdoteq>\.\.=)
  | (?P<vecstart>!\[)
  | (?P<setstart>@\{)
  | (?P<floorslasheq>~/=)
  | (?P<floorslash>~/)
  | (?P<shr3>>>>)
  | (?P<poweq>\*\*=)
  | (?P<pow>\*\*)
  | (?P<shleq><<=)
  | (?P<shreq>>>=)
  | (?P<shl><<)
  | (?P<shr>>>)
  | (?P<dotdot>\.\.)
  | (?P<eqeq>==)
  | (?P<noteq>!=)
  | (?P<le><=)
  | (?P<ge>>=)
  | (?P<andand>&&)
  | (?P<oror>\|\|)
  | (?P<qq>\?\?)
  | (?P<pluseq>\+=)
  | (?P<minuseq>-=)
  | (?P<stareq>\*=)
  | (?P<slasheq>/=)
  | (?P<percenteq>%=)
  | (?P<ampeq>&=)
  | (?P<pipeeq>\|=)
  | (?P<careteq>\^=)
  | (?P<lparen>\()
  | (?P<rparen>\))
  | (?P<lbrace>\{)
  | (?P<rbrace>\})
  | (?P<lbracket>\[)
  | (?P<rbracket>\])
  | (?P<comma>,)
  | (?P<semi>;)
  | (?P<colon>:)
  | (?P<dot>\.)
  | (?P<question>\?)
  | (?P<plus>\+)
  | (?P<minus>-)
  | (?P<star>\*)
  | (?P<slash>/)
  | (?P<percent>%)
  | (?P<amp>&)
  | (?P<pipe>\|)
  | (?P<caret>\^)
  | (?P<tilde>~)
  | (?P<lt><)
  | (?P<gt>>)
  | (?P<bang>!)
  | (?P<assign>=)
"#;

fn master_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MASTER_PATTERN).expect("master token regex is well-formed"))
}

/// Strips a single layer of quoting from a string/char literal, decoding
/// `\n \t \' \" \`` escapes. `quote` is `'`, `"` or `` ` ``.
fn decode_string_literal(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('`') => out.push('`'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Tokenizes an entire source string up front into a flat vector.
///
/// The regex-driven scan walks the source left to right; at every position
/// it tries `MASTER_PATTERN` and either emits a token, skips whitespace /
/// comments, or fails with [`crate::error::LuzError::Syntax`] on the first
/// byte it cannot classify.
pub struct Lexer;

impl Lexer {
    pub fn tokenize(src: &str) -> Result<Vec<Spanned>, crate::error::LuzError> {
        let re = master_regex();
        let mut out = Vec::new();
        let mut cursor = Cursor::new();
        let mut pos_bytes = 0usize;

        while pos_bytes < src.len() {
            let rest = &src[pos_bytes..];
            let caps = match re.captures(rest) {
                Some(c) if c.get(0).map(|m| m.start()) == Some(0) => c,
                _ => {
                    return Err(crate::error::LuzError::Syntax(
                        format!(
                            "unexpected character {:?}",
                            rest.chars().next().unwrap_or('?')
                        ),
                        cursor.position(),
                    ))
                }
            };

            let whole = caps.get(0).expect("group 0 always matches").as_str();
            let start_pos = cursor.position();

            // `regex` has no look-behind, so the "an identifier followed by
            // `.digits` is not a number" rule (spec.md §4.1) is enforced here
            // instead: if the previous token could anchor a dotted index
            // (`x.5`) and this match is a bare-dot number (no leading
            // digits), only consume the `.` and let the digits re-lex as
            // their own `Num` token on the next pass.
            if let Some(m) = caps.name("number") {
                if m.as_str().starts_with('.')
                    && prev_allows_dotted_index(out.last().map(|s: &Spanned| &s.token))
                {
                    cursor.advance(".");
                    pos_bytes += 1;
                    out.push(Spanned {
                        token: Token::Dot,
                        pos: start_pos,
                    });
                    continue;
                }
            }

            let token = classify(&caps);
            cursor.advance(whole);
            pos_bytes += whole.len();

            if let Some(token) = token {
                out.push(Spanned {
                    token,
                    pos: start_pos,
                });
            }
        }

        out.push(Spanned {
            token: Token::Eof,
            pos: cursor.position(),
        });
        Ok(out)
    }
}

/// Maps whichever named group fired to a [`Token`]. Returns `None` for
/// whitespace and comments, which are tokenized but dropped.
fn classify(caps: &regex::Captures) -> Option<Token> {
    macro_rules! hit {
        ($name:literal) => {
            caps.name($name).is_some()
        };
    }

    if hit!("ws") || hit!("comment_line") || hit!("comment_block") {
        return None;
    }

    let tok = if let Some(m) = caps.name("bigint") {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        Token::BigInt(digits)
    } else if let Some(m) = caps.name("number") {
        let cleaned: String = m.as_str().chars().filter(|&c| c != '_').collect();
        Token::Num(cleaned.parse().unwrap_or(f64::NAN))
    } else if let Some(m) = caps.name("dqstr") {
        Token::Str(decode_string_literal(m.as_str()))
    } else if let Some(m) = caps.name("sqstr") {
        Token::Str(decode_string_literal(m.as_str()))
    } else if let Some(m) = caps.name("bqstr") {
        Token::Str(decode_string_literal(m.as_str()))
    } else if let Some(m) = caps.name("preincr") {
        Token::PreIncr(m.as_str()[2..].to_string())
    } else if let Some(m) = caps.name("predecr") {
        Token::PreDecr(m.as_str()[2..].to_string())
    } else if let Some(m) = caps.name("postincr") {
        let s = m.as_str();
        Token::PostIncr(s[..s.len() - 2].to_string())
    } else if let Some(m) = caps.name("postdecr") {
        let s = m.as_str();
        Token::PostDecr(s[..s.len() - 2].to_string())
    } else if let Some(m) = caps.name("ident") {
        keyword_or_ident(m.as_str())
    } else if hit!("spaceship") {
        Token::Spaceship
    } else if hit!("dotdoteq") {
        Token::DotDotEq
    } else if hit!("vecstart") {
        Token::VecStart
    } else if hit!("setstart") {
        Token::SetStart
    } else if hit!("floorslasheq") {
        Token::FloorSlashEq
    } else if hit!("floorslash") {
        Token::FloorSlash
    } else if hit!("shr3") {
        Token::Shr3
    } else if hit!("poweq") {
        Token::PowEq
    } else if hit!("pow") {
        Token::Pow
    } else if hit!("shleq") {
        Token::ShlEq
    } else if hit!("shreq") {
        Token::ShrEq
    } else if hit!("shl") {
        Token::Shl
    } else if hit!("shr") {
        Token::Shr
    } else if hit!("dotdot") {
        Token::DotDot
    } else if hit!("eqeq") {
        Token::EqEq
    } else if hit!("noteq") {
        Token::NotEq
    } else if hit!("le") {
        Token::Le
    } else if hit!("ge") {
        Token::Ge
    } else if hit!("andand") {
        Token::AndAnd
    } else if hit!("oror") {
        Token::OrOr
    } else if hit!("qq") {
        Token::QQ
    } else if hit!("pluseq") {
        Token::PlusEq
    } else if hit!("minuseq") {
        Token::MinusEq
    } else if hit!("stareq") {
        Token::StarEq
    } else if hit!("slasheq") {
        Token::SlashEq
    } else if hit!("percenteq") {
        Token::PercentEq
    } else if hit!("ampeq") {
        Token::AmpEq
    } else if hit!("pipeeq") {
        Token::PipeEq
    } else if hit!("careteq") {
        Token::CaretEq
    } else if hit!("lparen") {
        Token::LeftParen
    } else if hit!("rparen") {
        Token::RightParen
    } else if hit!("lbrace") {
        Token::LeftBrace
    } else if hit!("rbrace") {
        Token::RightBrace
    } else if hit!("lbracket") {
        Token::LeftBracket
    } else if hit!("rbracket") {
        Token::RightBracket
    } else if hit!("comma") {
        Token::Comma
    } else if hit!("semi") {
        Token::Semi
    } else if hit!("colon") {
        Token::Colon
    } else if hit!("dot") {
        Token::Dot
    } else if hit!("question") {
        Token::Question
    } else if hit!("plus") {
        Token::Plus
    } else if hit!("minus") {
        Token::Minus
    } else if hit!("star") {
        Token::Star
    } else if hit!("slash") {
        Token::Slash
    } else if hit!("percent") {
        Token::Percent
    } else if hit!("amp") {
        Token::Amp
    } else if hit!("pipe") {
        Token::Pipe
    } else if hit!("caret") {
        Token::Caret
    } else if hit!("tilde") {
        Token::Tilde
    } else if hit!("lt") {
        Token::Lt
    } else if hit!("gt") {
        Token::Gt
    } else if hit!("bang") {
        Token::Bang
    } else if hit!("assign") {
        Token::Assign
    } else {
        unreachable!("MASTER_PATTERN group matched with no recognised name")
    };

    Some(tok)
}

/// Tokens that can sit just left of `.N` dotted positional indexing.
fn prev_allows_dotted_index(prev: Option<&Token>) -> bool {
    matches!(
        prev,
        Some(
            Token::Ident(_)
                | Token::Num(_)
                | Token::BigInt(_)
                | Token::Str(_)
                | Token::Bool(_)
                | Token::Null
                | Token::RightParen
                | Token::RightBracket
                | Token::PostIncr(_)
                | Token::PostDecr(_)
        )
    )
}

fn keyword_or_ident(s: &str) -> Token {
    match s {
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        "null" => Token::Null,
        "maybe" => Token::Maybe,
        "inf" => Token::Inf,
        "if" => Token::If,
        "else" => Token::Else,
        "loop" => Token::Loop,
        "in" => Token::In,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "fn" => Token::Fn,
        "return" => Token::Return,
        "const" => Token::Const,
        "del" => Token::Del,
        "has" => Token::Has,
        "as" => Token::As,
        "lenof" => Token::LenOf,
        "typeof" => Token::TypeOf,
        "copyof" => Token::CopyOf,
        "sizeof" => Token::SizeOf,
        "firstof" => Token::FirstOf,
        "lastof" => Token::LastOf,
        "log" => Token::Log,
        "logln" => Token::LogLn,
        "get" => Token::Get,
        "getln" => Token::GetLn,
        other => Token::Ident(other.to_string()),
    }
}
