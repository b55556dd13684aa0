mod imports;
mod interfaces;

use crate::filesystem::LocateError;
use thiserror::Error;

pub use imports::{
    ImportReference, get_external_imports, get_normalized_imports,
    get_normalized_imports_from_source, get_project_imports,
};
pub use interfaces::parse_interface_members;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse: {0}")]
    Syntax(String),
    #[error(transparent)]
    Locate(#[from] LocateError),
}

/// Macro to define a thread-local parser with a given language.
/// Usage: `define_parser!(PARSER_NAME, language_fn)`
#[macro_export]
macro_rules! define_parser {
    ($name:ident, $language:expr) => {
        thread_local! {
            static $name: std::cell::RefCell<tree_sitter::Parser> = std::cell::RefCell::new({
                let mut parser = tree_sitter::Parser::new();
                parser.set_language(&$language.into()).expect(concat!("Failed to set ", stringify!($name), " language"));
                parser
            });
        }
    };
}

define_parser!(PYTHON_PARSER, tree_sitter_python::LANGUAGE);

/// Parse Python source into a syntax tree. Source with syntax errors is
/// rejected so a garbled file degrades to a single warning upstream instead
/// of producing bogus boundary findings.
pub(crate) fn parse_python_source(source: &str) -> Result<tree_sitter::Tree, ParseError> {
    let tree = PYTHON_PARSER
        .with(|parser| parser.borrow_mut().parse(source, None))
        .ok_or_else(|| ParseError::Syntax("Failed to parse file".to_string()))?;

    if tree.root_node().has_error() {
        return Err(ParseError::Syntax("Source contains syntax errors".to_string()));
    }

    Ok(tree)
}
