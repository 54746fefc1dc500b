//! SQL AST, helpers to build it, and conversion to SQL strings.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod string;
