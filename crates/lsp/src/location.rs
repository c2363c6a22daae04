//! A "source location" (glossary): a `(parsedSource, sourceIndex)` pair
//! pointing to a range in a file. This is what go-to-definition and
//! `collectParsed` (§4.I) hand back — a view, not an owned copy, since
//! the AST it points into is immutable and shared by reference.

use crate::source::ParsedData;
use ralph_compiler::SourceIndex;

#[derive(Debug, Clone)]
pub struct SourceLocation<'a> {
    pub source: &'a ParsedData,
    pub index: SourceIndex,
}

impl<'a> SourceLocation<'a> {
    pub fn new(source: &'a ParsedData, index: SourceIndex) -> Self {
        Self { source, index }
    }
}
