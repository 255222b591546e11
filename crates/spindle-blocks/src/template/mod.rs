//! Declarative template blocks.
//!
//! A template file is a TOML metadata header, a line containing only `---`,
//! and an assembly body:
//!
//! ```text
//! type = "math.gain"
//! name = "Gain"
//! category = "math"
//!
//! [[inputs]]
//! id = "in"
//!
//! [[outputs]]
//! id = "out"
//!
//! [[params]]
//! id = "gain"
//! default = 1.0
//! min = -2.0
//! max = 1.99
//! ---
//! @section main
//! @if connected(out)
//! rdax ${input.in}, ${param.gain:s1.14}
//! wrax ${output.out}, 0.0
//! @endif
//! ```
//!
//! # Body language
//!
//! - `@section <header|init|input|main|output>` switches the target section
//!   (default `main`).
//! - `@mem <name> <size>` reserves delay memory before anything is emitted.
//!   The size may use parameters.
//! - `@if connected(<port>)`, `@if !connected(<port>)`, `@else`, `@endif`
//!   select lines by connectivity, and nest.
//! - `${expr}` and `${expr:format}` substitute values; `format` is one of
//!   `s1.14`, `s.10`, `s1.9`, `s4.6`, `s.15` or `int`. See [`expr`] for the
//!   expression grammar.
//!
//! Every block is expected to leave the accumulator at zero, which in practice
//! means ending with a `wrax <reg>, 0.0` or similar.

pub mod body;
pub mod expr;
mod expand;

use spindle_core::CodegenContext;

use self::body::Body;
use self::expand::Expander;
use crate::BlockEnv;
use crate::error::{GenerateError, TemplateError};
use crate::info::BlockInfo;

/// A block defined by a template file.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateBlock {
    info: BlockInfo,
    body: Body,
    source: Option<String>,
}

impl TemplateBlock {
    /// Parses template file text.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let (meta, body) = split_sections(text).ok_or(TemplateError::MissingSeparator)?;
        let info: BlockInfo =
            toml::from_str(meta).map_err(|e| TemplateError::Metadata(e.to_string()))?;
        info.check().map_err(TemplateError::Metadata)?;
        let body = Body::parse(body, &info)?;
        tracing::debug!(
            type_id = %info.type_id,
            items = body.items.len(),
            memory = body.memory.len(),
            "parsed template"
        );
        Ok(Self {
            info,
            body,
            source: None,
        })
    }

    /// Records where the template came from, for listings and messages.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Block metadata.
    pub fn info(&self) -> &BlockInfo {
        &self.info
    }

    /// Parsed body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// File or bundle the template was loaded from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Expands the body for one block instance.
    pub fn generate(&self, env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
        Expander::new(env).run(&self.body, ctx)
    }
}

/// Splits at the first line that is exactly `---`.
fn split_sections(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
