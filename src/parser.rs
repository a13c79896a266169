/*!
Parser: token slice to instruction tree
=======================================

### Cost

| Phase / function              | Cost | Rationale                                              |
|-------------------------------|-----:|--------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.           |
| `climb` (operator reduction)  | Θ(k) | Each operator is pushed and popped exactly once.       |

Call‑stack depth grows with syntactic nesting, not with operator chains:
infix expressions are reduced iteratively on two explicit stacks.

### Logging Policy

| Location                       | Level  | Purpose                                   |
|--------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`         | `info` | Lifecycle milestones.                     |
| `instruction`, `primary`, etc. | `debug`| High‑level descent into grammar branches. |

--------------------------------------------------------------------------------
Grammar (condensed EBNF)
------------------------

```text
program      → ( instruction ";"* )* EOF ;
instruction  → labeled | flag | let | control | expression ;
labeled      → IDENT ":" ( if | while | do | for | try | block ) ;
flag         → ( "private" | "final" | "noimport" ) IDENT ( "=" expression )? ;
let          → "let" IDENT "=" expression ;
control      → if | while | do | for | try | scope | return | break
             | continue | throw ;
if           → "if" expression body ( "elif" expression body )* ( "else" body )? ;
while        → "while" expression body ;
do           → "do" body "while" expression ;
for          → "for" ( "(" IDENT "in" expression ")" | IDENT "in" expression ) body ;
try          → "try" body "catch" ( "(" IDENT ")" | IDENT ) body ;
return       → "return" expression? ;
break        → "break" ( IDENT ":" )? expression? ;
continue     → "continue" IDENT? ;
throw        → "throw" expression ;
body         → block | instruction ;
block        → "{" ( instruction ";"* )* "}" ;
expression   → climb ( ( "=" | OP= ) expression )? ;
climb        → operand ( INFIX operand )* ;
operand      → PREFIX* postfix ;
postfix      → primary ( "." IDENT | "(" arguments? ")" )* ;
arguments    → expression ( "," expression )* ( "," IDENT "=" expression )* ;
primary      → NUMBER | STRING | CHAR | "true" | "false" | "null" | "void"
             | IDENT | "(" expression ")" | "[" ( expression "," ? )* "]"
             | function | "obj" block | "lazy" body | control ;
function     → "fn" "(" params? ")" ( "static" block )? body ;
params       → IDENT ( "=" expression )? ( "," IDENT ( "=" expression )? )* ;
```

A value after `return`/`break`, and the label after `continue`, must start on
the same line as the keyword.
*/

use std::rc::Rc;

use crate::error::{Result, ShnapError};
use crate::instruction::{Conditional, Instruction, InstructionKind, NamedArgument, Parameter};
use crate::numeric::{Number, Numeric};
use crate::operator::Operator;
use crate::result::State;
use crate::scanner::Scanner;
use crate::scope::BindingFlags;
use crate::source::{strip_comments, LineIndex, Location};
use crate::token::{Token, TokenType};
use crate::value::Value;

use log::{debug, info};

/// Strip comments, scan and parse a whole script.
pub fn parse_source(source: &str, script: &str) -> Result<Instruction> {
    let index = LineIndex::new(source.as_bytes(), Rc::from(script));
    let stripped = strip_comments(source, &index)?;
    let tokens = Scanner::new(&stripped, &index).collect::<Result<Vec<Token<'_>>>>()?;

    Parser::new(&tokens, &index).parse()
}

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    index: &'a LineIndex,
    current: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser. `tokens` must end with `EOF`.
    pub fn new(tokens: &'a [Token<'a>], index: &'a LineIndex) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            index,
            current: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program into a single `Sequence`.
    pub fn parse(&mut self) -> Result<Instruction> {
        let location = self.location(self.peek());
        let instructions = self.parse_top_level()?;

        Ok(Instruction::new(InstructionKind::Sequence(instructions), location))
    }

    /// Parse an entire program and return its top-level instructions.
    pub fn parse_top_level(&mut self) -> Result<Vec<Instruction>> {
        info!("Beginning parse phase");

        let mut instructions = Vec::new();
        self.skip_separators();

        while !self.is_at_end() {
            instructions.push(self.instruction()?);
            self.skip_separators();
        }

        info!("Parsed {} top-level instruction(s)", instructions.len());

        Ok(instructions)
    }

    // ──────────────────────── instruction rules ───────────────────

    fn instruction(&mut self) -> Result<Instruction> {
        debug!("Entering instruction at {}", self.peek());

        if self.check(TokenType::IDENTIFIER) && self.check_next(TokenType::COLON) {
            let name = self.advance().lexeme.to_string();
            self.advance();
            return self.labeled(Some(name));
        }

        match self.peek().token_type {
            TokenType::PRIVATE => self.flag_assign(BindingFlags::PRIVATE),
            TokenType::FINAL => self.flag_assign(BindingFlags::FINALIZED),
            TokenType::NOIMPORT => self.flag_assign(BindingFlags::DONT_IMPORT),
            TokenType::LET => self.let_assign(),
            _ => match self.control()? {
                Some(control) => Ok(control),
                None => self.expression(),
            },
        }
    }

    /// A block or loop preceded by `label:`.
    fn labeled(&mut self, label: Option<String>) -> Result<Instruction> {
        match self.peek().token_type {
            TokenType::IF => self.if_chain(label),
            TokenType::WHILE => self.while_loop(label),
            TokenType::DO => self.do_while(label),
            TokenType::FOR => self.for_each(label),
            TokenType::TRY => self.try_catch(label),
            TokenType::LEFT_BRACE => self.scope_block(label),
            _ => Err(self.error_at_peek("Expected a block or loop after label")),
        }
    }

    /// Control constructs that may appear wherever an operand may.
    fn control(&mut self) -> Result<Option<Instruction>> {
        let instruction = match self.peek().token_type {
            TokenType::IF
            | TokenType::WHILE
            | TokenType::DO
            | TokenType::FOR
            | TokenType::TRY
            | TokenType::LEFT_BRACE => self.labeled(None)?,
            TokenType::RETURN => self.return_change()?,
            TokenType::BREAK => self.break_change()?,
            TokenType::CONTINUE => self.continue_change()?,
            TokenType::THROW => self.throw_change()?,
            _ => return Ok(None),
        };

        Ok(Some(instruction))
    }

    fn flag_assign(&mut self, flag: BindingFlags) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);
        let name = self
            .consume(TokenType::IDENTIFIER, "Expected name after flag")?
            .lexeme
            .to_string();

        let value = if self.matches(TokenType::EQUAL) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        debug!("Flag {:?} on '{}'", flag, name);

        Ok(Instruction::new(
            InstructionKind::FlagAssign { flag, name, value },
            location,
        ))
    }

    fn let_assign(&mut self) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);
        let name = self
            .consume(TokenType::IDENTIFIER, "Expected name after 'let'")?
            .lexeme
            .to_string();
        self.consume(TokenType::EQUAL, "Expected '=' after name")?;
        let value = Box::new(self.expression()?);

        Ok(Instruction::new(
            InstructionKind::Set {
                target: None,
                name,
                operator: None,
                value,
                local: true,
            },
            location,
        ))
    }

    fn if_chain(&mut self, label: Option<String>) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);

        debug!("Parsing if chain");

        let condition = Box::new(self.expression()?);
        let body = Box::new(self.body()?);

        let mut links: Vec<(Option<Box<Instruction>>, Box<Instruction>)> =
            vec![(Some(condition), body)];

        loop {
            if self.matches(TokenType::ELIF) {
                let condition = Box::new(self.expression()?);
                let body = Box::new(self.body()?);
                links.push((Some(condition), body));
            } else if self.matches(TokenType::ELSE) {
                links.push((None, Box::new(self.body()?)));
                break;
            } else {
                break;
            }
        }

        // Fold back to front so each link owns its successor.
        let mut next: Option<Box<Conditional>> = None;
        while let Some((condition, body)) = links.pop() {
            next = Some(Box::new(Conditional {
                condition,
                body,
                next,
            }));
        }

        let chain = next
            .map(|head| *head)
            .ok_or_else(|| ShnapError::parse(location.clone(), "Empty if chain"))?;

        Ok(Instruction::new(InstructionKind::If { label, chain }, location))
    }

    fn while_loop(&mut self, label: Option<String>) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);
        let condition = Box::new(self.expression()?);
        let body = Box::new(self.body()?);

        Ok(Instruction::new(
            InstructionKind::While {
                label,
                condition,
                body,
            },
            location,
        ))
    }

    fn do_while(&mut self, label: Option<String>) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);
        let body = Box::new(self.body()?);
        self.skip_separators();
        self.consume(TokenType::WHILE, "Expected 'while' after do body")?;
        let condition = Box::new(self.expression()?);

        Ok(Instruction::new(
            InstructionKind::DoWhile {
                label,
                body,
                condition,
            },
            location,
        ))
    }

    fn for_each(&mut self, label: Option<String>) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);

        let parenthesized = self.check(TokenType::LEFT_PAREN)
            && self.check_at(1, TokenType::IDENTIFIER)
            && self.check_at(2, TokenType::IN);
        if parenthesized {
            self.advance();
        }

        let variable = self
            .consume(TokenType::IDENTIFIER, "Expected loop variable after 'for'")?
            .lexeme
            .to_string();
        self.consume(TokenType::IN, "Expected 'in' after loop variable")?;
        let iterable = Box::new(self.expression()?);

        if parenthesized {
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for header")?;
        }

        let body = Box::new(self.body()?);

        Ok(Instruction::new(
            InstructionKind::ForEach {
                label,
                variable,
                iterable,
                body,
            },
            location,
        ))
    }

    fn try_catch(&mut self, label: Option<String>) -> Result<Instruction> {
        let keyword = self.advance();
        let location = self.location(keyword);
        let body = Box::new(self.body()?);
        self.skip_separators();
        self.consume(TokenType::CATCH, "Expected 'catch' after try body")?;

        let parenthesized = self.matches(TokenType::LEFT_PAREN);
        let variable = self
            .consume(TokenType::IDENTIFIER, "Expected catch variable")?
            .lexeme
            .to_string();
        if parenthesized {
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after catch variable")?;
        }

        let handler = Box::new(self.body()?);

        Ok(Instruction::new(
            InstructionKind::TryCatch {
                label,
                body,
                variable,
                handler,
            },
            location,
        ))
    }

    fn scope_block(&mut self, label: Option<String>) -> Result<Instruction> {
        let location = self.location(self.peek());
        let body = Box::new(self.block()?);

        Ok(Instruction::new(
            InstructionKind::ScopeBlock { label, body },
            location,
        ))
    }

    fn return_change(&mut self) -> Result<Instruction> {
        let keyword = self.advance();
        let value = self.optional_value(keyword)?;

        Ok(self.state_change(keyword, State::Returning, None, value))
    }

    fn break_change(&mut self) -> Result<Instruction> {
        let keyword = self.advance();

        let label = if self.on_same_line(keyword)
            && self.check(TokenType::IDENTIFIER)
            && self.check_next(TokenType::COLON)
        {
            let name = self.advance().lexeme.to_string();
            self.advance();
            Some(name)
        } else {
            None
        };

        let value = self.optional_value(keyword)?;

        Ok(self.state_change(keyword, State::Breaking, label, value))
    }

    fn continue_change(&mut self) -> Result<Instruction> {
        let keyword = self.advance();

        let label = if self.on_same_line(keyword) && self.check(TokenType::IDENTIFIER) {
            Some(self.advance().lexeme.to_string())
        } else {
            None
        };

        Ok(self.state_change(keyword, State::Continuing, label, None))
    }

    fn throw_change(&mut self) -> Result<Instruction> {
        let keyword = self.advance();
        let value = Some(Box::new(self.expression()?));

        Ok(self.state_change(keyword, State::Throwing, None, value))
    }

    fn state_change(
        &self,
        keyword: &Token<'_>,
        state: State,
        label: Option<String>,
        value: Option<Box<Instruction>>,
    ) -> Instruction {
        Instruction::new(
            InstructionKind::StateChange {
                state,
                label,
                value,
            },
            self.location(keyword),
        )
    }

    fn optional_value(&mut self, keyword: &Token<'_>) -> Result<Option<Box<Instruction>>> {
        if self.on_same_line(keyword) && !self.at_terminator() {
            Ok(Some(Box::new(self.expression()?)))
        } else {
            Ok(None)
        }
    }

    fn body(&mut self) -> Result<Instruction> {
        if self.check(TokenType::LEFT_BRACE) {
            self.block()
        } else {
            self.instruction()
        }
    }

    /// `{ instruction* }` as a plain sequence.
    fn block(&mut self) -> Result<Instruction> {
        let open = self.consume(TokenType::LEFT_BRACE, "Expected '{'")?;
        let location = self.location(open);

        let mut instructions = Vec::new();
        self.skip_separators();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            instructions.push(self.instruction()?);
            self.skip_separators();
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;

        Ok(Instruction::new(
            InstructionKind::Sequence(instructions),
            location,
        ))
    }

    // ──────────────────────── expression rules ────────────────────

    /// An operator expression, optionally followed by an assignment.
    fn expression(&mut self) -> Result<Instruction> {
        let left = self.climb()?;

        let operator = if self.check(TokenType::EQUAL) {
            None
        } else if self.check(TokenType::OPERATOR) {
            match Operator::assignment(self.peek().lexeme) {
                Some(op) => Some(op.underlying()),
                None => return Ok(left),
            }
        } else {
            return Ok(left);
        };

        let assign = self.advance();
        let location = self.location(assign);

        let (target, name) = match left.kind {
            InstructionKind::Get { target, name } => (target, name),
            _ => return Err(ShnapError::parse(location, "Invalid assignment target")),
        };

        let value = Box::new(self.expression()?);

        Ok(Instruction::new(
            InstructionKind::Set {
                target,
                name,
                operator,
                value,
                local: false,
            },
            location,
        ))
    }

    /// Two-stack precedence climbing seeded with the sentinel operator.
    fn climb(&mut self) -> Result<Instruction> {
        let start = self.location(self.peek());
        let mut operands: Vec<Instruction> = Vec::new();
        let mut operators: Vec<(Operator, Location)> = vec![(Operator::Sentinel, start)];

        loop {
            // Prefix operators are always pushed.
            while let Some(op) = self.prefix_operator() {
                let token = self.advance();
                operators.push((op, self.location(token)));
            }

            operands.push(self.postfix()?);

            let Some(op) = self.infix_operator() else {
                break;
            };

            while let Some(&(top, _)) = operators.last() {
                if op.binds_tighter_than(top) {
                    break;
                }
                Self::reduce(&mut operands, &mut operators)?;
            }

            let token = self.advance();
            operators.push((op, self.location(token)));
        }

        while operators.len() > 1 {
            Self::reduce(&mut operands, &mut operators)?;
        }

        operands
            .pop()
            .ok_or_else(|| self.error_at_peek("Expected expression"))
    }

    /// Pop one operator and combine it with its operand(s).
    fn reduce(
        operands: &mut Vec<Instruction>,
        operators: &mut Vec<(Operator, Location)>,
    ) -> Result<()> {
        let Some((operator, location)) = operators.pop() else {
            return Err(ShnapError::parse(Location::native(), "Operator stack underflow"));
        };
        if operator == Operator::Sentinel {
            return Err(ShnapError::parse(location, "Operator stack underflow"));
        }

        let missing = || ShnapError::parse(location.clone(), "Missing operand");

        let kind = if operator.arity() == 1 {
            let operand = operands.pop().ok_or_else(missing)?;
            InstructionKind::Operate {
                operator,
                left: Box::new(operand),
                right: None,
            }
        } else {
            let right = operands.pop().ok_or_else(missing)?;
            let left = operands.pop().ok_or_else(missing)?;
            InstructionKind::Operate {
                operator,
                left: Box::new(left),
                right: Some(Box::new(right)),
            }
        };

        operands.push(Instruction::new(kind, location));
        Ok(())
    }

    fn prefix_operator(&self) -> Option<Operator> {
        if self.check(TokenType::OPERATOR) {
            Operator::unary(self.peek().lexeme)
        } else {
            None
        }
    }

    fn infix_operator(&self) -> Option<Operator> {
        if self.check(TokenType::OPERATOR) {
            Operator::binary(self.peek().lexeme)
        } else {
            None
        }
    }

    /// Member access and invocation, left to right.
    fn postfix(&mut self) -> Result<Instruction> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(TokenType::DOT) {
                let dot = self.previous();
                let name = self
                    .consume(TokenType::IDENTIFIER, "Expected member name after '.'")?
                    .lexeme
                    .to_string();

                expr = Instruction::new(
                    InstructionKind::Get {
                        target: Some(Box::new(expr)),
                        name,
                    },
                    self.location(dot),
                );
            } else if self.matches(TokenType::LEFT_PAREN) {
                let paren = self.previous();
                expr = self.finish_call(expr, paren)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Instruction, paren: &Token<'_>) -> Result<Instruction> {
        let mut arguments = Vec::new();
        let mut named: Vec<NamedArgument> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if self.check(TokenType::IDENTIFIER) && self.check_next(TokenType::EQUAL) {
                    let name_token = self.advance();
                    let name = name_token.lexeme.to_string();
                    self.advance();

                    if named.iter().any(|n| n.name == name) {
                        return Err(ShnapError::parse(
                            self.location(name_token),
                            format!("Duplicate named argument '{name}'"),
                        ));
                    }

                    let value = self.expression()?;
                    named.push(NamedArgument { name, value });
                } else {
                    if !named.is_empty() {
                        return Err(self.error_at_peek("Positional argument after named argument"));
                    }
                    arguments.push(self.expression()?);
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Instruction::new(
            InstructionKind::Invoke {
                target: Box::new(callee),
                arguments,
                named,
            },
            self.location(paren),
        ))
    }

    fn primary(&mut self) -> Result<Instruction> {
        debug!("Entering primary at {}", self.peek());

        if let Some(control) = self.control()? {
            return Ok(control);
        }

        let token = self.peek();
        let location = self.location(token);

        let kind = match &token.token_type {
            TokenType::NUMBER => {
                self.advance();
                InstructionKind::Literal(self.number_literal(token)?)
            }
            TokenType::STRING(s) => {
                self.advance();
                InstructionKind::Literal(Value::string(s))
            }
            TokenType::CHAR(c) => {
                self.advance();
                InstructionKind::Literal(Value::char(*c))
            }
            TokenType::TRUE => {
                self.advance();
                InstructionKind::Literal(Value::bool(true))
            }
            TokenType::FALSE => {
                self.advance();
                InstructionKind::Literal(Value::bool(false))
            }
            TokenType::NULL => {
                self.advance();
                InstructionKind::Literal(Value::Null)
            }
            TokenType::VOID => {
                self.advance();
                InstructionKind::Literal(Value::Void)
            }
            TokenType::IDENTIFIER => {
                self.advance();
                InstructionKind::Get {
                    target: None,
                    name: token.lexeme.to_string(),
                }
            }
            TokenType::LEFT_PAREN => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;
                return Ok(inner);
            }
            TokenType::LEFT_BRACKET => {
                self.advance();
                InstructionKind::ArrayLiteral(self.array_elements()?)
            }
            TokenType::FN => {
                self.advance();
                return self.function(location);
            }
            TokenType::OBJ => {
                self.advance();
                InstructionKind::MakeObject {
                    body: Box::new(self.block()?),
                }
            }
            TokenType::LAZY => {
                self.advance();
                InstructionKind::MakeResolver {
                    body: Rc::new(self.body()?),
                }
            }
            _ => return Err(self.error_at_peek("Expected expression")),
        };

        Ok(Instruction::new(kind, location))
    }

    fn array_elements(&mut self) -> Result<Vec<Instruction>> {
        let mut elements = Vec::new();

        while !self.check(TokenType::RIGHT_BRACKET) && !self.is_at_end() {
            elements.push(self.expression()?);
            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array elements")?;

        Ok(elements)
    }

    fn function(&mut self, location: Location) -> Result<Instruction> {
        debug!("Parsing function literal");

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'fn'")?;

        let mut parameters: Vec<Parameter> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                let name_token = self.consume(TokenType::IDENTIFIER, "Expected parameter name")?;
                let name = name_token.lexeme.to_string();

                if parameters.iter().any(|p| p.name == name) {
                    return Err(ShnapError::parse(
                        self.location(name_token),
                        format!("Duplicate parameter '{name}'"),
                    ));
                }

                let default = if self.matches(TokenType::EQUAL) {
                    Some(self.expression()?)
                } else {
                    None
                };

                if default.is_none() && parameters.iter().any(|p| p.default.is_some()) {
                    return Err(ShnapError::parse(
                        self.location(name_token),
                        format!("Required parameter '{name}' follows a defaulted one"),
                    ));
                }

                parameters.push(Parameter { name, default });

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        let statics = if self.matches(TokenType::STATIC) {
            match self.block()?.kind {
                InstructionKind::Sequence(statics) => statics,
                other => vec![Instruction::new(other, location.clone())],
            }
        } else {
            Vec::new()
        };

        let body = Rc::new(self.body()?);

        Ok(Instruction::new(
            InstructionKind::MakeFunction {
                parameters: Rc::from(parameters),
                statics,
                body,
            },
            location,
        ))
    }

    /// `12`, `-3`, `1.5`, `1e5`, `7i`, `2d`.
    fn number_literal(&self, token: &Token<'_>) -> Result<Value> {
        let lexeme = token.lexeme;
        let invalid = || {
            ShnapError::parse(
                self.location(token),
                format!("Invalid numeric literal: {lexeme}"),
            )
        };

        let numeric = if let Some(digits) = lexeme.strip_suffix('d') {
            let number = Number::parse_literal(digits, true).ok_or_else(invalid)?;
            Numeric::Decimal(number.to_decimal())
        } else if let Some(digits) = lexeme.strip_suffix('i') {
            let number = Number::parse_literal(digits, false).ok_or_else(invalid)?;
            Numeric::Int(number.to_bigint().ok_or_else(invalid)?)
        } else {
            Numeric::from(Number::parse_literal(lexeme, false).ok_or_else(invalid)?)
        };

        Ok(Value::Num(numeric))
    }

    // ────────────────────── utility helpers ───────────────────────

    fn location(&self, token: &Token<'_>) -> Location {
        self.index.locate(token.offset)
    }

    fn error_at_peek(&self, message: &str) -> ShnapError {
        let token = self.peek();
        debug!("Parse error at {}: {}", token, message);

        ShnapError::parse(self.location(token), format!("{message}, found '{}'", token.lexeme))
    }

    fn on_same_line(&self, keyword: &Token<'_>) -> bool {
        self.location(keyword).line == self.location(self.peek()).line
    }

    /// Tokens that cannot start an optional value.
    fn at_terminator(&self) -> bool {
        matches!(
            self.peek().token_type,
            TokenType::SEMICOLON
                | TokenType::RIGHT_BRACE
                | TokenType::RIGHT_PAREN
                | TokenType::RIGHT_BRACKET
                | TokenType::COMMA
                | TokenType::ELIF
                | TokenType::ELSE
                | TokenType::CATCH
                | TokenType::EOF
        )
    }

    fn skip_separators(&mut self) {
        while self.matches(TokenType::SEMICOLON) {}
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error_at_peek(message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        self.check_at(0, ttype)
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        self.check_at(1, ttype)
    }

    /// Does the token `ahead` positions past the current one have type `ttype`?
    fn check_at(&self, ahead: usize, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + ahead)
            .is_some_and(|t| t.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }
}
