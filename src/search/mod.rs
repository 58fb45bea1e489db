//! Search engine
//!
//! jq-style filters evaluated over every document of a namespace.
//!
//! Supported language:
//! - paths: `.`, `.a.b`, `."key"`, `.["key"]`, `.[0]`, `.[]`, `expr?`
//! - combinators: `|`, `,`, parentheses
//! - literals, `[expr]` and `{key: expr}` construction
//! - `==` `!=` `<` `<=` `>` `>=`, `and`, `or`, `+ - * / %`
//! - builtins: `select`, `map`, `not`, `length`, `keys`, `has`, `type`,
//!   `empty`, `contains`, `startswith`, `endswith`, `ascii_downcase`,
//!   `ascii_upcase`, `tostring`, `tonumber`

mod ast;
mod builtins;
mod engine;
mod errors;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::{BinaryOp, Expr, ObjectKey};
pub use engine::{Filter, Outputs, SearchEngine, SearchHit};
pub use errors::{FilterError, FilterResult, SearchError, SearchResult};
pub use parser::{parse, MAX_DEPTH};
pub use value::compare;
