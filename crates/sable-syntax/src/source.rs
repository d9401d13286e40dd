//! Source buffers and locations.

use miette::SourceSpan;

/// Identifies one parsed source (a file, or an in-memory snippet with a
/// synthetic name). Declarations remember which buffer they came from so the
/// environment can group and evict them per buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Buffer {
    name: String,
}

impl Buffer {
    pub fn new(name: impl Into<String>) -> Self {
        Buffer { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A span inside a buffer. Declarations produced programmatically may have
/// no location at all; everything downstream treats locations as optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub buffer: Buffer,
    pub span: SourceSpan,
}

impl Location {
    pub fn new(buffer: Buffer, span: SourceSpan) -> Self {
        Location { buffer, span }
    }
}
