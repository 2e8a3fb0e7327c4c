//! Bytecode target tests

mod codec;
mod opcode;
