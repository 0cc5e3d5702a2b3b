use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

/// Failure to obtain a usable dataset. Fatal for the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read lexicon {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lexicon JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed lexicon document: {0}")]
    Shape(&'static str),
}

/// Root document: opaque metadata plus the ordered entry list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconDataset {
    #[serde(default, deserialize_with = "lenient::meta")]
    pub meta: Meta,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub entries: Vec<Entry>,
}

impl LexiconDataset {
    pub fn new(meta: Meta, entries: Vec<Entry>) -> Self {
        Self { meta, entries }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            entries = dataset.entries.len(),
            "Loaded lexicon"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }

    pub fn from_json_str(input: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    /// Field-level problems are coerced; only a non-object root is rejected.
    pub fn from_value(value: Value) -> Result<Self, LoadError> {
        if !value.is_object() {
            return Err(LoadError::Shape("document root must be an object"));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Free-form dataset description, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(Map<String, Value>);

impl Meta {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-blank string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn lang(&self) -> Option<&str> {
        self.text("lang")
    }

    pub fn source(&self) -> Option<&str> {
        self.text("source")
    }

    pub fn kind(&self) -> Option<&str> {
        self.text("type")
    }

    pub fn version(&self) -> Option<&str> {
        self.text("version")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub headword: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub pos: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pron: Option<String>,
    #[serde(default, deserialize_with = "lenient::definitions")]
    pub defs: Vec<Definition>,
    #[serde(default, deserialize_with = "lenient::examples")]
    pub examples: Vec<Example>,
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tags: Vec<String>,
}

impl Entry {
    pub fn has_headword(&self) -> bool {
        !self.headword.trim().is_empty()
    }

    /// Non-blank id, if any.
    pub fn stable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn primary_gloss(&self) -> &str {
        self.defs.first().map(|d| d.gloss.as_str()).unwrap_or("")
    }

    pub fn glosses(&self) -> impl Iterator<Item = &str> + '_ {
        self.defs.iter().map(|d| d.gloss.as_str())
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> + '_ {
        self.defs.iter().filter_map(|d| d.notes.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default, deserialize_with = "lenient::string")]
    pub gloss: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default, deserialize_with = "lenient::string")]
    pub src: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub gloss: Option<String>,
}

/// Load-time coercion: strings stay, numbers are stringified, anything else is absent.
mod lenient {
    use super::{Definition, Entry, Example, Meta};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn items(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(text(Value::deserialize(deserializer)?))
    }

    pub fn meta<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Meta, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(fields) => Meta::new(fields),
            _ => Meta::default(),
        })
    }

    pub fn entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Entry>, D::Error> {
        Ok(items(Value::deserialize(deserializer)?)
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    pub fn definitions<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Definition>, D::Error> {
        Ok(items(Value::deserialize(deserializer)?)
            .into_iter()
            .filter_map(|item| match item {
                Value::String(gloss) => Some(Definition { gloss, notes: None }),
                Value::Object(_) => serde_json::from_value(item).ok(),
                _ => None,
            })
            .collect())
    }

    pub fn examples<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Example>, D::Error> {
        Ok(items(Value::deserialize(deserializer)?)
            .into_iter()
            .filter_map(|item| match item {
                Value::String(src) => Some(Example { src, gloss: None }),
                Value::Object(_) => serde_json::from_value(item).ok(),
                _ => None,
            })
            .collect())
    }

    pub fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(items(Value::deserialize(deserializer)?)
            .into_iter()
            .filter_map(text)
            .filter(|tag| !tag.trim().is_empty())
            .collect())
    }
}
