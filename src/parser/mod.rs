#[cfg(test)]
mod tests;

use crate::ast::{self, Expression, Statement};
use crate::lexer::Lexer;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,
    Equals,
    LessGreater,
    Sum,
    Product,
    Power,
    Prefix,
    Call,
    Index,
}

/// Deepest nesting of expressions and blocks the parser accepts. Every
/// pass over the tree recurses once per level, so the bound keeps rendering
/// and dropping a program within the stack.
pub const MAX_NESTING: usize = 512;

type PrefixParseFn = fn(&mut Parser) -> Option<Expression>;
type InfixParseFn = fn(&mut Parser, Expression) -> Option<Expression>;

lazy_static! {
    static ref PREFIX_PARSE_FNS: HashMap<TokenType, PrefixParseFn> = {
        let mut fns: HashMap<TokenType, PrefixParseFn> = HashMap::new();
        fns.insert(TokenType::Ident, Parser::parse_identifier);
        fns.insert(TokenType::Int, Parser::parse_integer_literal);
        fns.insert(TokenType::String, Parser::parse_string_literal);
        fns.insert(TokenType::True, Parser::parse_boolean);
        fns.insert(TokenType::False, Parser::parse_boolean);
        fns.insert(TokenType::Bang, Parser::parse_prefix_expression);
        fns.insert(TokenType::Minus, Parser::parse_prefix_expression);
        fns.insert(TokenType::LParen, Parser::parse_grouped_expression);
        fns.insert(TokenType::If, Parser::parse_if_expression);
        fns.insert(TokenType::Function, Parser::parse_function_literal);
        fns.insert(TokenType::LBracket, Parser::parse_array_literal);
        fns
    };
    static ref INFIX_PARSE_FNS: HashMap<TokenType, (Precedence, InfixParseFn)> = {
        let mut fns: HashMap<TokenType, (Precedence, InfixParseFn)> = HashMap::new();
        fns.insert(TokenType::Assign, (Precedence::Assign, Parser::parse_assign_expression));
        fns.insert(TokenType::Eq, (Precedence::Equals, Parser::parse_infix_expression));
        fns.insert(TokenType::NotEq, (Precedence::Equals, Parser::parse_infix_expression));
        fns.insert(TokenType::LT, (Precedence::LessGreater, Parser::parse_infix_expression));
        fns.insert(TokenType::GT, (Precedence::LessGreater, Parser::parse_infix_expression));
        fns.insert(TokenType::Plus, (Precedence::Sum, Parser::parse_infix_expression));
        fns.insert(TokenType::Minus, (Precedence::Sum, Parser::parse_infix_expression));
        fns.insert(TokenType::Asterisk, (Precedence::Product, Parser::parse_infix_expression));
        fns.insert(TokenType::Slash, (Precedence::Product, Parser::parse_infix_expression));
        fns.insert(TokenType::Caret, (Precedence::Power, Parser::parse_infix_expression));
        fns.insert(TokenType::LParen, (Precedence::Call, Parser::parse_call_expression));
        fns.insert(TokenType::LBracket, (Precedence::Index, Parser::parse_index_expression));
        fns
    };
}

fn precedence_of(token: &Token) -> Precedence {
    INFIX_PARSE_FNS
        .get(&token.token_type())
        .map(|(precedence, _)| *precedence)
        .unwrap_or(Precedence::Lowest)
}

pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<String>,
    depth: usize,
    too_deep: bool,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();

        Self {
            lexer,
            cur_token,
            peek_token,
            errors: vec![],
            depth: 0,
            too_deep: false,
        }
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
    }

    /// Parses the whole input, returning the program only if no diagnostics
    /// were produced.
    pub fn parse_program(self) -> Result<ast::Program, Vec<String>> {
        let (program, errors) = self.parse();

        if errors.is_empty() {
            Ok(program)
        } else {
            Err(errors)
        }
    }

    /// Parses the whole input and hands back the program alongside every
    /// diagnostic, in the order they were found.
    pub fn parse(mut self) -> (ast::Program, Vec<String>) {
        let mut program = ast::Program::default();

        while !self.cur_token.is(TokenType::Eof) {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt)
            }
            self.next_token();
        }

        tracing::debug!(
            statements = program.statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        (program, self.errors)
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        ensure_sufficient_stack(|| match self.cur_token {
            Token::Let => self.parse_let_statement().map(Statement::Let),
            Token::Return => self.parse_return_statement().map(Statement::Return),
            Token::LBrace => Some(Statement::Block(self.parse_block_statement())),
            _ => self.parse_expression_statement().map(Statement::Expr),
        })
    }

    fn parse_let_statement(&mut self) -> Option<ast::LetStatement> {
        if !self.expect_peek(TokenType::Ident) {
            return None;
        }

        let name = ast::Identifier::from(self.cur_token.literal());

        if !self.expect_peek(TokenType::Assign) {
            return None;
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token.is(TokenType::Semicolon) {
            self.next_token();
        }

        Some(ast::LetStatement { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<ast::ReturnStatement> {
        let bare = [TokenType::Semicolon, TokenType::RBrace, TokenType::Eof];
        let return_value = if bare.contains(&self.peek_token.token_type()) {
            None
        } else {
            self.next_token();
            Some(self.parse_expression(Precedence::Lowest)?)
        };

        if self.peek_token.is(TokenType::Semicolon) {
            self.next_token();
        }

        Some(ast::ReturnStatement { return_value })
    }

    fn parse_expression_statement(&mut self) -> Option<ast::ExpressionStatement> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token.is(TokenType::Semicolon) {
            self.next_token();
        }

        Some(ast::ExpressionStatement { expression })
    }

    // Called with `{` as the current token; leaves `}` as the current token.
    fn parse_block_statement(&mut self) -> ast::BlockStatement {
        let mut block = ast::BlockStatement::default();
        let depth = self.depth;
        if !self.enter_nested() {
            self.depth = depth;
            return block;
        }
        self.next_token();

        while !self.cur_token.is(TokenType::RBrace) {
            if self.cur_token.is(TokenType::Eof) {
                if !self.too_deep {
                    self.errors
                        .push("expected RBrace to close block, got Eof instead".to_owned());
                }
                break;
            }
            if let Some(stmt) = self.parse_statement() {
                block.statements.push(stmt);
            }
            self.next_token();
        }

        self.depth = depth;
        block
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let depth = self.depth;
        let expression = ensure_sufficient_stack(|| self.parse_nested_expression(precedence));
        self.depth = depth;
        expression
    }

    fn parse_nested_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        if !self.enter_nested() {
            return None;
        }
        let prefix = match PREFIX_PARSE_FNS.get(&self.cur_token.token_type()) {
            Some(prefix) => *prefix,
            None => {
                self.no_prefix_parse_fn_error();
                return None;
            }
        };
        let mut left = prefix(self)?;

        while !self.peek_token.is(TokenType::Semicolon)
            && precedence < precedence_of(&self.peek_token)
        {
            let infix = match INFIX_PARSE_FNS.get(&self.peek_token.token_type()) {
                Some((_, infix)) => *infix,
                None => return Some(left),
            };
            // Each infix step wraps `left` one level deeper.
            if !self.enter_nested() {
                return None;
            }
            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    // Past the limit the rest of the input is skipped, so one diagnostic
    // covers the whole overflow.
    fn enter_nested(&mut self) -> bool {
        self.depth += 1;
        if self.depth <= MAX_NESTING {
            return true;
        }
        if !self.too_deep {
            self.too_deep = true;
            self.errors.push(format!(
                "nesting exceeds the limit of {} levels",
                MAX_NESTING
            ));
            while !self.cur_token.is(TokenType::Eof) {
                self.next_token();
            }
        }
        false
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(self.cur_token.literal().into()))
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        let literal = self.cur_token.literal();
        match literal.parse() {
            Ok(value) => Some(Expression::IntegerLiteral(value)),
            Err(_) => {
                self.errors
                    .push(format!("could not parse {} as integer", literal));
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expression> {
        Some(Expression::String(self.cur_token.literal().into()))
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.cur_token.is(TokenType::True).into()))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let operator = self.cur_operator()?;
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix(ast::PrefixExpression {
            operator,
            right: Box::new(right),
        }))
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let operator = self.cur_operator()?;
        let precedence = precedence_of(&self.cur_token);
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix(ast::InfixExpression {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }))
    }

    fn parse_assign_expression(&mut self, left: Expression) -> Option<Expression> {
        let name = match left {
            Expression::Identifier(name) => name,
            other => {
                self.errors
                    .push(format!("invalid assignment target: {}", other));
                return None;
            }
        };
        self.next_token();
        // Parsed at the lowest precedence so `a = b = 1` nests to the right.
        let value = self.parse_expression(Precedence::Lowest)?;

        Some(Expression::Assign(ast::AssignExpression {
            name,
            value: Box::new(value),
        }))
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenType::RParen) {
            return None;
        }
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenType::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenType::RParen) || !self.expect_peek(TokenType::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let alternative = if self.peek_token.is(TokenType::Else) {
            self.next_token();
            if !self.expect_peek(TokenType::LBrace) {
                return None;
            }
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If(ast::IfExpression {
            condition: Box::new(condition),
            consequence,
            alternative,
        }))
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenType::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;

        if !self.expect_peek(TokenType::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();

        Some(Expression::Function(ast::FunctionLiteral {
            parameters,
            body: Rc::new(body),
        }))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<ast::Identifier>> {
        let mut identifiers = vec![];

        if self.peek_token.is(TokenType::RParen) {
            self.next_token();
            return Some(identifiers);
        }

        if !self.expect_peek(TokenType::Ident) {
            return None;
        }
        identifiers.push(self.cur_token.literal().into());

        while self.peek_token.is(TokenType::Comma) {
            self.next_token();
            if !self.expect_peek(TokenType::Ident) {
                return None;
            }
            identifiers.push(self.cur_token.literal().into());
        }

        if !self.expect_peek(TokenType::RParen) {
            return None;
        }
        Some(identifiers)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenType::RParen)?;

        Some(Expression::Call(ast::CallExpression {
            function: Box::new(function),
            arguments,
        }))
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenType::RBracket)?;
        Some(Expression::Array(elements.into()))
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenType::RBracket) {
            return None;
        }

        Some(Expression::Index(ast::IndexExpression {
            left: Box::new(left),
            index: Box::new(index),
        }))
    }

    // Shared by call arguments and array literals. Called with the opening
    // delimiter as the current token.
    fn parse_expression_list(&mut self, end: TokenType) -> Option<Vec<Expression>> {
        let mut list = vec![];

        if self.peek_token.is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token.is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    fn cur_operator(&mut self) -> Option<ast::Operator> {
        match ast::Operator::try_from(&self.cur_token) {
            Ok(operator) => Some(operator),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    fn expect_peek(&mut self, expected: TokenType) -> bool {
        if self.peek_token.is(expected) {
            self.next_token();
            true
        } else {
            self.peek_error(expected);
            false
        }
    }

    fn peek_error(&mut self, expected: TokenType) {
        if self.too_deep {
            return;
        }
        let message = Self::lexical_error(&self.peek_token).unwrap_or_else(|| {
            format!(
                "expected next token to be {}, got {} instead",
                expected,
                self.peek_token.token_type()
            )
        });
        self.errors.push(message);
    }

    fn no_prefix_parse_fn_error(&mut self) {
        if self.too_deep {
            return;
        }
        let message = Self::lexical_error(&self.cur_token).unwrap_or_else(|| {
            format!(
                "no prefix parse function for token {}",
                self.cur_token.token_type()
            )
        });
        self.errors.push(message);
    }

    fn lexical_error(token: &Token) -> Option<String> {
        match token {
            Token::Illegal(c) => Some(format!("illegal character: {:?}", c)),
            Token::UnterminatedString(start) => Some(format!(
                "unterminated string literal starting at byte {}",
                start
            )),
            _ => None,
        }
    }
}
