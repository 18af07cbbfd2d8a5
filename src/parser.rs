//! Expression evaluator (C6) — parsing half. Precedence-climbing recursive
//! descent that builds the small AST from `ast.rs` (see `SPEC_FULL.md` §A
//! for why this crate parses-then-walks instead of the teacher's/original's
//! fused parse-and-evaluate). Grammar levels are named exactly as spec.md
//! §4.4 names them, loosest-binding first, each calling the next down.

use crate::ast::*;
use crate::error::{LuzError, LuzResult};
use crate::position::Position;
use crate::token::{Lexer, Spanned, Token};
use num_bigint::BigInt;

fn syntax(msg: impl Into<String>, pos: Position) -> LuzError {
    LuzError::Syntax(msg.into(), pos)
}

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

/// Parses an entire program (top-level statement sequence).
pub fn parse_program(src: &str) -> LuzResult<Vec<Expr>> {
    let tokens = Lexer::tokenize(src)?;
    Parser::new(tokens).program()
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek_tok(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn cur_pos(&self) -> Position {
        self.tokens[self.pos].pos
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, t: Token) -> bool {
        *self.peek_tok() == t
    }

    fn expect(&mut self, t: Token) -> LuzResult<()> {
        if self.check(t.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(syntax(
                format!("expected {t:?}, found {:?}", self.peek_tok()),
                self.cur_pos(),
            ))
        }
    }

    fn at_expr_start(&self) -> bool {
        !matches!(
            self.peek_tok(),
            Token::Semi
                | Token::RightBrace
                | Token::RightParen
                | Token::RightBracket
                | Token::Eof
                | Token::Comma
                | Token::Else
        )
    }

    // ---- top level -------------------------------------------------

    pub fn program(&mut self) -> LuzResult<Vec<Expr>> {
        let mut stmts = Vec::new();
        while !matches!(self.peek_tok(), Token::Eof) {
            if self.check(Token::Semi) {
                self.advance();
                continue;
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> LuzResult<Vec<Expr>> {
        self.expect(Token::LeftBrace)?;
        let mut stmts = Vec::new();
        while !self.check(Token::RightBrace) {
            if matches!(self.peek_tok(), Token::Eof) {
                return Err(syntax("unterminated block, expected '}'", self.cur_pos()));
            }
            if self.check(Token::Semi) {
                self.advance();
                continue;
            }
            stmts.push(self.statement()?);
        }
        self.advance();
        Ok(stmts)
    }

    /// `statement → expression [;]`, plus the reserved-word guard for
    /// `fn`/`return` (spec.md §9: unimplemented keywords).
    pub fn statement(&mut self) -> LuzResult<Expr> {
        if matches!(self.peek_tok(), Token::Fn | Token::Return) {
            return Err(LuzError::Unimplemented(
                "'fn'/'return' are reserved but not implemented".into(),
                self.cur_pos(),
            ));
        }
        if self.check(Token::Const) {
            return self.parse_const_decl();
        }
        let e = self.expr()?;
        if self.check(Token::Semi) {
            self.advance();
        }
        Ok(e)
    }

    /// `const NAME = expr` — the only statement-level production outside the
    /// expression chain (see `Expr::ConstDecl`'s doc comment).
    fn parse_const_decl(&mut self) -> LuzResult<Expr> {
        let pos = self.cur_pos();
        self.advance();
        let name = match self.peek_tok().clone() {
            Token::Ident(n) => n,
            other => {
                return Err(syntax(
                    format!("expected an identifier after 'const', found {other:?}"),
                    pos,
                ))
            }
        };
        self.advance();
        self.expect(Token::Assign)?;
        let value = self.assignment()?;
        if self.check(Token::Semi) {
            self.advance();
        }
        Ok(Expr::ConstDecl(name, Box::new(value), pos))
    }

    /// `expression → swap | assignment`. Swap requires both sides to parse
    /// as l-values; on any shape mismatch the cursor rewinds and the whole
    /// thing is re-tried as a plain assignment/expression (spec.md §4.4's
    /// "one structural backtrack").
    pub fn expr(&mut self) -> LuzResult<Expr> {
        let checkpoint = self.pos;
        if let Some(lhs) = self.try_parse_lvalue() {
            if self.check(Token::Spaceship) {
                let pos = self.cur_pos();
                self.advance();
                if let Some(rhs) = self.try_parse_lvalue() {
                    return Ok(Expr::Swap(Box::new(lhs), Box::new(rhs), pos));
                }
            }
        }
        self.pos = checkpoint;
        self.assignment()
    }

    fn assignment(&mut self) -> LuzResult<Expr> {
        let checkpoint = self.pos;
        if let Some(lvalue) = self.try_parse_lvalue() {
            if let Some(op) = self.try_consume_assign_op() {
                let pos = self.cur_pos();
                let rhs = self.assignment()?;
                return Ok(Expr::Assign(Box::new(lvalue), op, Box::new(rhs), pos));
            }
        }
        self.pos = checkpoint;
        self.range()
    }

    fn try_consume_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek_tok() {
            Token::Assign => AssignOp::Assign,
            Token::PlusEq => AssignOp::Add,
            Token::MinusEq => AssignOp::Sub,
            Token::StarEq => AssignOp::Mul,
            Token::SlashEq => AssignOp::Div,
            Token::FloorSlashEq => AssignOp::FloorDiv,
            Token::PercentEq => AssignOp::Mod,
            Token::PowEq => AssignOp::Pow,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Tries to parse `ident ('[' expr ']' | '.' number)*`. On any failure
    /// restores the cursor and returns `None`; never raises an error itself
    /// (the caller decides whether a missing l-value is fatal).
    fn try_parse_lvalue(&mut self) -> Option<Expr> {
        let checkpoint = self.pos;
        let name = match self.peek_tok() {
            Token::Ident(n) => n.clone(),
            _ => return None,
        };
        let pos0 = self.cur_pos();
        self.advance();
        let mut expr = Expr::Ident(name);
        loop {
            if self.check(Token::LeftBracket) {
                self.advance();
                let idx = match self.expr() {
                    Ok(e) => e,
                    Err(_) => {
                        self.pos = checkpoint;
                        return None;
                    }
                };
                if !self.check(Token::RightBracket) {
                    self.pos = checkpoint;
                    return None;
                }
                self.advance();
                expr = Expr::Index(Box::new(expr), Box::new(idx), pos0);
            } else if matches!(self.peek_tok(), Token::Dot)
                && matches!(self.peek_at(1), Some(Token::Num(_)))
            {
                self.advance();
                let n = match self.peek_tok() {
                    Token::Num(n) => *n,
                    _ => unreachable!(),
                };
                self.advance();
                expr = Expr::DotIndex(Box::new(expr), n as i64, pos0);
            } else {
                break;
            }
        }
        Some(expr)
    }

    // ---- binary precedence chain ------------------------------------

    fn range(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.logical_or()?;
        loop {
            let kind = match self.peek_tok() {
                Token::DotDot => RangeKind::HalfOpen,
                Token::DotDotEq => RangeKind::Closed,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.logical_or()?;
            lhs = Expr::Range(kind, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn logical_or(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.nullish()?;
        while self.check(Token::OrOr) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.nullish()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn nullish(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.logical_and()?;
        while self.check(Token::QQ) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.logical_and()?;
            lhs = Expr::Binary(BinOp::Nullish, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.equality()?;
        while self.check(Token::AndAnd) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek_tok() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                Token::Has => BinOp::Has,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.add_sub()?;
        loop {
            let op = match self.peek_tok() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.add_sub()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    /// `addSub → pow (('+'|'-') pow)*` — per spec.md §4.4's own precedence
    /// chain, `+`/`-` bind *looser* than `**` (addSub wraps pow), while `**`
    /// itself binds looser than `*`/`/` (pow wraps mulDiv). Kept exactly as
    /// specified rather than "corrected" to the usual math convention.
    fn add_sub(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.pow_level()?;
        loop {
            let op = match self.peek_tok() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.pow_level()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn pow_level(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.mul_div()?;
        while self.check(Token::Pow) {
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.mul_div()?;
            lhs = Expr::Binary(BinOp::Pow, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn mul_div(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.bitwise()?;
        loop {
            let op = match self.peek_tok() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                Token::FloorSlash => BinOp::FloorDiv,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.bitwise()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn bitwise(&mut self) -> LuzResult<Expr> {
        let mut lhs = self.as_level()?;
        loop {
            let op = match self.peek_tok() {
                Token::Amp => BinOp::BitAnd,
                Token::Pipe => BinOp::BitOr,
                Token::Caret => BinOp::BitXor,
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                Token::Shr3 => BinOp::Shr3,
                _ => break,
            };
            let pos = self.cur_pos();
            self.advance();
            let rhs = self.as_level()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), pos);
        }
        Ok(lhs)
    }

    fn as_level(&mut self) -> LuzResult<Expr> {
        let mut e = self.unary()?;
        while self.check(Token::As) {
            let pos = self.cur_pos();
            self.advance();
            let target = if self.check(Token::TypeOf) {
                self.advance();
                CastTarget::TypeOfExpr(Box::new(self.unary()?))
            } else {
                CastTarget::Type(self.parse_type_name()?)
            };
            e = Expr::Cast(Box::new(e), target, pos);
        }
        Ok(e)
    }

    fn parse_type_name(&mut self) -> LuzResult<String> {
        let pos = self.cur_pos();
        let name = match self.peek_tok().clone() {
            Token::Ident(s) => s,
            Token::Null => "null".to_string(),
            Token::Maybe => "maybe".to_string(),
            Token::Inf => "inf".to_string(),
            other => {
                return Err(syntax(
                    format!("expected a type name after 'as', found {other:?}"),
                    pos,
                ))
            }
        };
        self.advance();
        Ok(name)
    }

    /// `unary → (prefix-op) unary | postfix`. Prefix inc/dec are already
    /// fused with their identifier at the lexer level (spec.md §4.1), so
    /// they terminate here rather than recursing further.
    fn unary(&mut self) -> LuzResult<Expr> {
        let pos = self.cur_pos();
        match self.peek_tok().clone() {
            Token::PreIncr(name) => {
                self.advance();
                Ok(Expr::PreIncDec(IncDec::Inc, Box::new(Expr::Ident(name)), pos))
            }
            Token::PreDecr(name) => {
                self.advance();
                Ok(Expr::PreIncDec(IncDec::Dec, Box::new(Expr::Ident(name)), pos))
            }
            Token::Bang => {
                self.advance();
                Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?), pos))
            }
            Token::Tilde => {
                self.advance();
                Ok(Expr::Unary(UnOp::BitNot, Box::new(self.unary()?), pos))
            }
            Token::Plus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Pos, Box::new(self.unary()?), pos))
            }
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.unary()?), pos))
            }
            Token::Log => {
                self.advance();
                let operand = self.optional_unary_operand()?;
                Ok(Expr::Log(LogKind::Log, operand, pos))
            }
            Token::LogLn => {
                self.advance();
                let operand = self.optional_unary_operand()?;
                Ok(Expr::Log(LogKind::LogLn, operand, pos))
            }
            Token::Get => {
                self.advance();
                let operand = self.optional_unary_operand()?;
                Ok(Expr::Get(GetKind::Get, operand, pos))
            }
            Token::GetLn => {
                self.advance();
                let operand = self.optional_unary_operand()?;
                Ok(Expr::Get(GetKind::GetLn, operand, pos))
            }
            Token::LenOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::LenOf, Box::new(self.unary()?), pos))
            }
            Token::TypeOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::TypeOf, Box::new(self.unary()?), pos))
            }
            Token::CopyOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::CopyOf, Box::new(self.unary()?), pos))
            }
            Token::SizeOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::SizeOf, Box::new(self.unary()?), pos))
            }
            Token::FirstOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::FirstOf, Box::new(self.unary()?), pos))
            }
            Token::LastOf => {
                self.advance();
                Ok(Expr::Intrinsic(Intrinsic::LastOf, Box::new(self.unary()?), pos))
            }
            Token::Del => {
                self.advance();
                let target = self
                    .try_parse_lvalue()
                    .ok_or_else(|| syntax("expected a variable or element after 'del'", pos))?;
                Ok(Expr::Del(Box::new(target), pos))
            }
            _ => self.postfix(),
        }
    }

    fn optional_unary_operand(&mut self) -> LuzResult<Option<Box<Expr>>> {
        if self.at_expr_start() {
            Ok(Some(Box::new(self.unary()?)))
        } else {
            Ok(None)
        }
    }

    fn postfix(&mut self) -> LuzResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let pos = self.cur_pos();
            if self.check(Token::LeftBracket) {
                self.advance();
                let idx = self.expr()?;
                self.expect(Token::RightBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(idx), pos);
            } else if matches!(self.peek_tok(), Token::Dot)
                && matches!(self.peek_at(1), Some(Token::Num(_)))
            {
                self.advance();
                let n = match self.peek_tok() {
                    Token::Num(n) => *n,
                    _ => unreachable!(),
                };
                self.advance();
                expr = Expr::DotIndex(Box::new(expr), n as i64, pos);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> LuzResult<Expr> {
        let pos = self.cur_pos();
        match self.peek_tok().clone() {
            Token::Num(n) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            Token::BigInt(digits) => {
                self.advance();
                let n: BigInt = digits
                    .parse()
                    .map_err(|_| syntax(format!("invalid big-int literal '{digits}xl'"), pos))?;
                Ok(Expr::BigInt(n))
            }
            Token::Str(s) => {
                self.advance();
                build_interpolation(&s, pos)
            }
            Token::Bool(b) => {
                self.advance();
                Ok(Expr::Bool(b))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::Maybe => {
                self.advance();
                Ok(Expr::Maybe)
            }
            Token::Inf => {
                self.advance();
                Ok(Expr::Num(f64::INFINITY))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            Token::PostIncr(name) => {
                self.advance();
                Ok(Expr::PostIncDec(IncDec::Inc, Box::new(Expr::Ident(name)), pos))
            }
            Token::PostDecr(name) => {
                self.advance();
                Ok(Expr::PostIncDec(IncDec::Dec, Box::new(Expr::Ident(name)), pos))
            }
            Token::LeftParen => {
                self.advance();
                let e = self.expr()?;
                self.expect(Token::RightParen)?;
                Ok(e)
            }
            Token::LeftBracket => {
                self.advance();
                self.parse_container(ContainerKind::Arr)
            }
            Token::VecStart => {
                self.advance();
                self.parse_container(ContainerKind::Vec)
            }
            Token::SetStart => {
                self.advance();
                self.parse_container(ContainerKind::Set)
            }
            Token::If => {
                self.advance();
                self.parse_if()
            }
            Token::Loop => {
                self.advance();
                self.parse_loop(pos)
            }
            Token::Break => {
                self.advance();
                let value = if self.at_expr_start() {
                    Some(Box::new(self.expr()?))
                } else {
                    None
                };
                Ok(Expr::Break(value, pos))
            }
            Token::Continue => {
                self.advance();
                Ok(Expr::Continue(pos))
            }
            other => Err(syntax(format!("unexpected token {other:?}"), pos)),
        }
    }

    fn parse_container(&mut self, kind: ContainerKind) -> LuzResult<Expr> {
        let close = match kind {
            ContainerKind::Arr | ContainerKind::Vec => Token::RightBracket,
            ContainerKind::Set => Token::RightBrace,
        };
        if self.check(close.clone()) {
            self.advance();
            return Ok(Expr::ContainerLit(kind, Vec::new()));
        }
        let first = self.expr()?;
        if self.check(Token::Semi) {
            self.advance();
            let count = self.expr()?;
            self.expect(close)?;
            return Ok(Expr::ContainerRepeat(kind, Box::new(first), Box::new(count)));
        }
        let mut items = vec![first];
        while !self.check(close.clone()) {
            if matches!(self.peek_tok(), Token::Eof) {
                return Err(syntax("unterminated container literal", self.cur_pos()));
            }
            items.push(self.expr()?);
        }
        self.advance();
        Ok(Expr::ContainerLit(kind, items))
    }

    fn parse_if(&mut self) -> LuzResult<Expr> {
        let paren = self.check(Token::LeftParen);
        if paren {
            self.advance();
        }
        let cond = self.expr()?;
        if paren {
            self.expect(Token::RightParen)?;
        }
        let then_branch = self.parse_block()?;
        let else_branch = if self.check(Token::Else) {
            self.advance();
            if self.check(Token::If) {
                self.advance();
                Some(self.parse_if()?)
            } else {
                Some(Expr::Block(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(Expr::If(Box::new(IfExpr {
            cond,
            then_branch,
            else_branch,
        })))
    }

    /// `loop` has three shapes (spec.md §4.5); the for-in shape is only
    /// distinguished from the while shape by a one-token-of-lookahead
    /// backtrack on `ident in`.
    fn parse_loop(&mut self, pos: Position) -> LuzResult<Expr> {
        if self.check(Token::LeftBrace) {
            let body = self.parse_block()?;
            return Ok(Expr::Loop(Box::new(LoopExpr {
                shape: LoopShape::Infinite,
                body,
                pos,
            })));
        }

        let paren = self.check(Token::LeftParen);
        if paren {
            self.advance();
        }

        if let Token::Ident(name) = self.peek_tok().clone() {
            let save = self.pos;
            self.advance();
            if self.check(Token::In) {
                self.advance();
                let iter_expr = self.expr()?;
                if paren {
                    self.expect(Token::RightParen)?;
                }
                let body = self.parse_block()?;
                return Ok(Expr::Loop(Box::new(LoopExpr {
                    shape: LoopShape::ForIn(name, iter_expr),
                    body,
                    pos,
                })));
            }
            self.pos = save;
        }

        let cond = self.expr()?;
        if paren {
            self.expect(Token::RightParen)?;
        }
        let body = self.parse_block()?;
        Ok(Expr::Loop(Box::new(LoopExpr {
            shape: LoopShape::While(cond),
            body,
            pos,
        })))
    }
}

/// Splits a decoded string literal into literal/interpolated parts, brace
/// matching with nesting. An empty `{}` renders as the literal text `{}`
/// (spec.md §4.4). Each non-empty `{…}` span is re-tokenized and re-parsed
/// as its own expression (re-entrant per spec.md §5).
fn build_interpolation(s: &str, pos: Position) -> LuzResult<Expr> {
    let chars: Vec<char> = s.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            let mut depth = 1;
            let mut j = i + 1;
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            if depth != 0 {
                return Err(syntax("unclosed '{' in string interpolation", pos));
            }
            let inner: String = chars[i + 1..j].iter().collect();
            if inner.trim().is_empty() {
                literal.push_str("{}");
            } else {
                if !literal.is_empty() {
                    parts.push(InterpPart::Literal(std::mem::take(&mut literal)));
                }
                let sub_tokens = Lexer::tokenize(&inner)?;
                let expr = Parser::new(sub_tokens).expr()?;
                parts.push(InterpPart::Expr(expr));
            }
            i = j + 1;
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }
    if !literal.is_empty() || parts.is_empty() {
        parts.push(InterpPart::Literal(literal));
    }
    if parts.len() == 1 {
        if let InterpPart::Literal(lit) = &parts[0] {
            return Ok(Expr::Str(lit.clone()));
        }
    }
    Ok(Expr::InterpStr(parts))
}
