//! Decompiler: turns an instruction tree back into script text.
//!
//! Output is fully parenthesized and every body is braced, so reparsing it
//! yields a tree that evaluates the same way. Formatting and comments of
//! the source are not preserved.

use std::fmt::Write;

use num_bigint::Sign;

use crate::instruction::{Conditional, Instruction, InstructionKind, Parameter};
use crate::numeric::Numeric;
use crate::result::State;
use crate::scope::BindingFlags;
use crate::value::Value;

const INDENT: &str = "    ";

impl Instruction {
    /// Render as script text. `indent` is the nesting depth used for the
    /// lines of nested blocks.
    pub fn pretty_print(&self, indent: usize) -> String {
        match &self.kind {
            // A program: one statement per line.
            InstructionKind::Sequence(instructions) => statements(instructions, indent),
            _ => expression(self, indent),
        }
    }
}

fn statements(instructions: &[Instruction], indent: usize) -> String {
    let pad = INDENT.repeat(indent);
    let mut out = String::new();

    for instruction in instructions {
        let _ = writeln!(out, "{pad}{};", expression(instruction, indent));
    }

    out
}

/// `{ ... }`, with the closing brace at `indent`.
fn block(body: &Instruction, indent: usize) -> String {
    let inner = match &body.kind {
        InstructionKind::Sequence(instructions) => statements(instructions, indent + 1),
        _ => statements(std::slice::from_ref(body), indent + 1),
    };

    if inner.is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{inner}{}}}", INDENT.repeat(indent))
    }
}

/// Parenthesize anything that is not already a postfix chain or wrapped.
fn operand(instruction: &Instruction, indent: usize) -> String {
    match &instruction.kind {
        InstructionKind::Get { .. }
        | InstructionKind::Invoke { .. }
        | InstructionKind::Operate { .. }
        | InstructionKind::ArrayLiteral(_) => expression(instruction, indent),
        _ => format!("({})", expression(instruction, indent)),
    }
}

/// Operand of a binary operator. Literals print bare; negative ones carry
/// their own parentheses.
fn term(instruction: &Instruction, indent: usize) -> String {
    match &instruction.kind {
        InstructionKind::Literal(_) => expression(instruction, indent),
        _ => operand(instruction, indent),
    }
}

/// A positional argument; a bare assignment would reparse as a named one.
fn argument(instruction: &Instruction, indent: usize) -> String {
    match &instruction.kind {
        InstructionKind::Set { .. } => format!("({})", expression(instruction, indent)),
        _ => expression(instruction, indent),
    }
}

fn labeled(label: &Option<String>, text: String) -> String {
    match label {
        Some(label) => format!("{label}: {text}"),
        None => text,
    }
}

fn expression(instruction: &Instruction, indent: usize) -> String {
    match &instruction.kind {
        InstructionKind::Literal(value) => literal(value),

        InstructionKind::ArrayLiteral(elements) => {
            let elements: Vec<String> = elements.iter().map(|e| expression(e, indent)).collect();
            format!("[{}]", elements.join(", "))
        }

        InstructionKind::Get { target, name } => match target {
            Some(target) => format!("{}.{}", operand(target, indent), name),
            None => name.clone(),
        },

        InstructionKind::Set {
            target,
            name,
            operator,
            value,
            local,
        } => {
            let place = match target {
                Some(target) => format!("{}.{}", operand(target, indent), name),
                None if *local => format!("let {name}"),
                None => name.clone(),
            };
            let symbol = operator.map(|op| op.symbol()).unwrap_or("");

            format!("{} {}= {}", place, symbol, expression(value, indent))
        }

        InstructionKind::Invoke {
            target,
            arguments,
            named,
        } => {
            let mut args: Vec<String> = arguments.iter().map(|a| argument(a, indent)).collect();
            args.extend(
                named
                    .iter()
                    .map(|n| format!("{} = {}", n.name, expression(&n.value, indent))),
            );

            format!("{}({})", operand(target, indent), args.join(", "))
        }

        InstructionKind::Operate {
            operator,
            left,
            right,
        } => match right {
            Some(right) => format!(
                "({} {} {})",
                term(left, indent),
                operator.symbol(),
                term(right, indent)
            ),
            None => format!("({}{})", operator.symbol(), operand(left, indent)),
        },

        InstructionKind::Sequence(_) => block(instruction, indent),

        InstructionKind::MakeFunction {
            parameters,
            statics,
            body,
        } => {
            let mut text = format!("fn({})", parameter_list(parameters, indent));

            if !statics.is_empty() {
                let statics = statements(statics, indent + 1);
                let _ = write!(text, " static {{\n{statics}{}}}", INDENT.repeat(indent));
            }

            format!("{} {}", text, block(body, indent))
        }

        InstructionKind::MakeObject { body } => format!("obj {}", block(body, indent)),

        InstructionKind::MakeResolver { body } => format!("lazy {}", block(body, indent)),

        InstructionKind::FlagAssign { flag, name, value } => {
            let keyword = if flag.contains(BindingFlags::PRIVATE) {
                "private"
            } else if flag.contains(BindingFlags::FINALIZED) {
                "final"
            } else {
                "noimport"
            };

            match value {
                Some(value) => format!("{} {} = {}", keyword, name, expression(value, indent)),
                None => format!("{keyword} {name}"),
            }
        }

        InstructionKind::StateChange {
            state,
            label,
            value,
        } => {
            let mut text = state.keyword().to_string();
            if let Some(label) = label {
                let _ = match state {
                    State::Breaking => write!(text, " {label}:"),
                    _ => write!(text, " {label}"),
                };
            }
            if let Some(value) = value {
                let _ = write!(text, " {}", expression(value, indent));
            }
            text.trim_start().to_string()
        }

        InstructionKind::If { label, chain } => labeled(label, if_chain(chain, indent)),

        InstructionKind::While {
            label,
            condition,
            body,
        } => labeled(
            label,
            format!("while {} {}", expression(condition, indent), block(body, indent)),
        ),

        InstructionKind::DoWhile {
            label,
            body,
            condition,
        } => labeled(
            label,
            format!("do {} while {}", block(body, indent), expression(condition, indent)),
        ),

        InstructionKind::ForEach {
            label,
            variable,
            iterable,
            body,
        } => labeled(
            label,
            format!(
                "for {} in {} {}",
                variable,
                expression(iterable, indent),
                block(body, indent)
            ),
        ),

        InstructionKind::TryCatch {
            label,
            body,
            variable,
            handler,
        } => labeled(
            label,
            format!(
                "try {} catch {} {}",
                block(body, indent),
                variable,
                block(handler, indent)
            ),
        ),

        InstructionKind::ScopeBlock { label, body } => labeled(label, block(body, indent)),
    }
}

fn if_chain(chain: &Conditional, indent: usize) -> String {
    let mut text = String::new();
    let mut link = Some(chain);
    let mut first = true;

    while let Some(conditional) = link {
        let keyword = if first { "if" } else { " elif" };
        let _ = match &conditional.condition {
            Some(condition) => write!(
                text,
                "{} {} {}",
                keyword,
                expression(condition, indent),
                block(&conditional.body, indent)
            ),
            None => write!(text, " else {}", block(&conditional.body, indent)),
        };

        first = false;
        link = conditional.next.as_deref();
    }

    text
}

fn parameter_list(parameters: &[Parameter], indent: usize) -> String {
    parameters
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{} = {}", p.name, expression(default, indent)),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn literal(value: &Value) -> String {
    match value {
        Value::Num(Numeric::Char(c)) => format!("'{}'", escape(&c.to_string(), '\'')),
        Value::Num(Numeric::Decimal(d)) if d.sign() == Sign::Minus => format!("({d}d)"),
        Value::Num(Numeric::Decimal(d)) => format!("{d}d"),
        Value::Num(n) if n.magnitude().signum() < 0 => format!("({n})"),
        Value::Str(s) => format!("\"{}\"", escape(s, '"')),
        other => other.to_string(),
    }
}

fn escape(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }

    out
}
