mod ast;
mod print;
