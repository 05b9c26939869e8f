//! Outline extraction for TypeScript-style declaration files.
//!
//! This crate provides a hand-written lexer and a scanning recursive-descent
//! parser that read `declare module X { class Y { ... } }` sources and build
//! an [`Outline`]: modules, their classes, inheritance links, properties and
//! method signatures. It is not a TypeScript front end; only declaration-level
//! shapes are recognized and everything else is scanned past.
//!
//! ```
//! let outline = dts_outline::parse("declare module M { class C { x: number; } }");
//! let class = outline.module("M").unwrap().class("C").unwrap();
//! assert_eq!(class.properties[0].ty, "number");
//! ```

mod lexer;
mod model;
mod parser;
mod render;
mod resolve;

pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use model::*;
pub use parser::{parse, parse_with_options, ParseOptions, Skip, SkipReason, Step};
pub use render::{lambda_signature, render_json, render_skips, render_text, RenderError};
