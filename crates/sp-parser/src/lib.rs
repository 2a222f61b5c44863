//! Just enough of the Python grammar to find statement boundaries and import
//! statements in third-party scripts.

mod imports;
mod statements;
mod tokenize;

pub use imports::{parse_imports, walk_imports, ImportAlias, ImportKind, ImportStmt, ImportVisitor};
pub use statements::{delimit_statements, StatementMap};
pub use tokenize::{tokenize, Token, TokenKind};
