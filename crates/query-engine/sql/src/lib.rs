//! A SQL AST for the statements the record services issue, and its rendering to
//! parameterized SQL strings.

pub mod sql;
