//! Front matter detection and parsing.
//!
//! ```text
//! ---            +++             {
//! title: Hi      title = "Hi"      "title": "Hi"
//! ---            +++             }
//! body           body            body
//! ```
//!
//! Delimiters must sit on their own line. Keys are lowercased.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::JsonMap;
use crate::utils::value::{lowercase_keys, toml_to_json, type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontMatterFormat {
    Yaml,
    Toml,
    Json,
}

impl FrontMatterFormat {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
            Self::Json => "}",
        }
    }
}

impl fmt::Display for FrontMatterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("no front matter found")]
    Missing,

    #[error("{0} front matter is not closed by `{delim}`", delim = .0.delimiter())]
    Unterminated(FrontMatterFormat),

    #[error("invalid TOML front matter: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("invalid JSON front matter: {0}")]
    Json(#[from] serde_json::Error),

    #[error("front matter must be a table, found {0}")]
    NotATable(&'static str),
}

/// Parsed front matter and the body that follows it.
#[derive(Debug, Clone)]
pub struct FrontMatter<'a> {
    pub format: FrontMatterFormat,
    pub fields: JsonMap,
    pub body: &'a str,
}

impl<'a> FrontMatter<'a> {
    pub fn parse(content: &'a str) -> Result<Self, FrontMatterError> {
        let (format, raw, body) = split(content)?.ok_or(FrontMatterError::Missing)?;

        let value = match format {
            FrontMatterFormat::Yaml if raw.trim().is_empty() => Value::Object(JsonMap::new()),
            FrontMatterFormat::Yaml => serde_yaml_ng::from_str::<Value>(raw)?,
            FrontMatterFormat::Toml => toml_to_json(toml::from_str::<toml::Value>(raw)?),
            FrontMatterFormat::Json => serde_json::from_str::<Value>(raw)?,
        };

        match lowercase_keys(value) {
            Value::Object(fields) => Ok(Self {
                format,
                fields,
                body,
            }),
            other => Err(FrontMatterError::NotATable(type_name(&other))),
        }
    }
}

/// Locate the front matter block. Returns `(format, raw, body)`.
pub fn split(content: &str) -> Result<Option<(FrontMatterFormat, &str, &str)>, FrontMatterError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    if content.starts_with('{') {
        return split_json(content).map(Some);
    }

    let format = match first_line(content) {
        "---" => FrontMatterFormat::Yaml,
        "+++" => FrontMatterFormat::Toml,
        _ => return Ok(None),
    };
    let delimiter = format.delimiter();
    let start = content.find('\n').map_or(content.len(), |i| i + 1);

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let raw = &content[start..offset];
            let body = content[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Ok(Some((format, raw, body)));
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated(format))
}

fn first_line(content: &str) -> &str {
    content.lines().next().unwrap_or_default().trim_end()
}

/// JSON front matter is the first complete object in the file.
fn split_json(content: &str) -> Result<(FrontMatterFormat, &str, &str), FrontMatterError> {
    let mut stream = serde_json::Deserializer::from_str(content).into_iter::<serde::de::IgnoredAny>();
    match stream.next() {
        Some(Ok(_)) => {
            let end = stream.byte_offset();
            let body = content[end..].trim_start_matches(['\r', '\n', ' ', '\t']);
            Ok((FrontMatterFormat::Json, &content[..end], body))
        }
        Some(Err(err)) if err.is_eof() => Err(FrontMatterError::Unterminated(FrontMatterFormat::Json)),
        Some(Err(err)) => Err(err.into()),
        None => Err(FrontMatterError::Missing),
    }
}
