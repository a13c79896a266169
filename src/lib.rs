pub mod builtins;
pub mod coerce;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod function;
pub mod instruction;
pub mod interpreter;
pub mod numeric;
pub mod operator;
pub mod parser;
pub mod printer;
pub mod result;
pub mod scanner;
pub mod scope;
pub mod source;
pub mod token;
pub mod value;
