//! Directive parsing.
//!
//! The markup tokenizer hands each ESI tag over as a tag name, its attribute
//! map and its body. Parsers turn that into a typed [`Directive`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::debug;

pub type Attributes = HashMap<String, String>;

pub const INCLUDE_TAG: &str = "include";
const ESI_PREFIX: &str = "esi:";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing required attribute '{attribute}' on <esi:{tag}>")]
    MissingAttribute { tag: String, attribute: String },
    #[error("Unknown ESI tag: {0}")]
    UnknownTag(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// What to do when an include cannot be fetched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OnError {
    /// Propagate the failure to the caller.
    #[default]
    Abort,
    /// Replace the include with empty content.
    Continue,
}

/// "Fetch the fragment at `src` and substitute it for the tag."
///
/// Never constructed without a non-empty `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirective {
    src: String,
    alt: Option<String>,
    on_error: OnError,
}

impl IncludeDirective {
    pub fn new(src: impl Into<String>) -> ParseResult<Self> {
        let src = src.into();
        if src.is_empty() {
            return Err(missing(INCLUDE_TAG, "src"));
        }
        Ok(Self {
            src,
            alt: None,
            on_error: OnError::default(),
        })
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into()).filter(|alt| !alt.is_empty());
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    pub fn on_error(&self) -> OnError {
        self.on_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    Include(IncludeDirective),
}

/// Uniform contract for every directive kind. `body` is the markup between
/// the opening and closing tag; directives without content ignore it.
pub trait DirectiveParser: Send + Sync {
    fn parse(&self, attributes: &Attributes, body: &str) -> ParseResult<Directive>;
}

/// Parses `<esi:include src="..." alt="..." onerror="continue"/>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeParser;

impl DirectiveParser for IncludeParser {
    fn parse(&self, attributes: &Attributes, _body: &str) -> ParseResult<Directive> {
        let src = attributes
            .get("src")
            .ok_or_else(|| missing(INCLUDE_TAG, "src"))?;

        let mut directive = IncludeDirective::new(src.as_str())?;
        if let Some(alt) = attributes.get("alt") {
            directive = directive.with_alt(alt.as_str());
        }
        if let Some(on_error) = attributes.get("onerror") {
            // Anything but "continue" keeps the default.
            directive = directive.with_on_error(on_error.parse().unwrap_or_default());
        }
        Ok(Directive::Include(directive))
    }
}

fn missing(tag: &str, attribute: &str) -> ParseError {
    ParseError::MissingAttribute {
        tag: tag.to_string(),
        attribute: attribute.to_string(),
    }
}

/// Dispatches tags to their parsers by name. Names are matched with or
/// without the `esi:` prefix.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn DirectiveParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::empty().register(INCLUDE_TAG, IncludeParser)
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    pub fn register(mut self, tag: &str, parser: impl DirectiveParser + 'static) -> Self {
        self.parsers
            .insert(normalize_tag(tag).to_string(), Arc::new(parser));
        self
    }

    pub fn parse(&self, tag: &str, attributes: &Attributes, body: &str) -> ParseResult<Directive> {
        let name = normalize_tag(tag);
        let parser = self
            .parsers
            .get(name)
            .ok_or_else(|| ParseError::UnknownTag(tag.to_string()))?;
        debug!("parsing <esi:{}>", name);
        parser.parse(attributes, body)
    }
}

fn normalize_tag(tag: &str) -> &str {
    tag.strip_prefix(ESI_PREFIX).unwrap_or(tag)
}
