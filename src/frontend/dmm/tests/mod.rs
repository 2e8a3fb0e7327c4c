//! Map parser tests

mod parser;
