//! Semantic value types for command-line arguments.
//!
//! [`CliType`] is the closed set of value kinds that an inferred argument can
//! take. Downstream serializers map each variant onto their own type system;
//! [`CliType::representable`] tells them whether that mapping is lossless.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value type of a flag or positional argument.
///
/// Leaf variants are always representable. Composite variants ([`List`],
/// [`Dict`], [`Tuple`]) are representable only when all of their children are.
///
/// [`List`]: CliType::List
/// [`Dict`]: CliType::Dict
/// [`Tuple`]: CliType::Tuple
///
/// # Examples
///
/// ```
/// use helpscope_core::CliType;
///
/// let files = CliType::list(CliType::File { output: false });
/// assert!(files.representable());
/// assert_eq!(files.to_string(), "list<file>");
///
/// let pair = CliType::tuple(vec![CliType::Integer, CliType::Integer]);
/// assert!(matches!(pair, CliType::Tuple { homogenous: true, .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CliType {
    /// A switch that takes no value.
    Boolean,
    /// Free text, the fallback when no recognizer matched.
    String,
    Integer,
    Float,
    /// One of a fixed set of literal values, in the order they were listed.
    Enum { choices: Vec<String> },
    /// Zero or more values of the inner type.
    List { inner: Box<CliType> },
    /// Key/value pairs.
    Dict { key: Box<CliType>, value: Box<CliType> },
    /// A fixed number of values, one per slot.
    Tuple {
        values: Vec<CliType>,
        homogenous: bool,
    },
    /// A file path. `output` marks paths the program writes to.
    File { output: bool },
    /// A directory path. `output` marks paths the program writes to.
    Directory { output: bool },
}

impl CliType {
    pub fn list(inner: CliType) -> Self {
        Self::List {
            inner: Box::new(inner),
        }
    }

    pub fn dict(key: CliType, value: CliType) -> Self {
        Self::Dict {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Builds a tuple type, deriving `homogenous` from the slot types.
    pub fn tuple(values: Vec<CliType>) -> Self {
        let homogenous = values
            .first()
            .is_some_and(|first| values.iter().all(|value| value == first));
        Self::Tuple { values, homogenous }
    }

    /// Builds an enum type, dropping duplicate choices while keeping order.
    pub fn enumeration<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for choice in choices {
            let choice = choice.into();
            if !choice.is_empty() && !unique.contains(&choice) {
                unique.push(choice);
            }
        }
        Self::Enum { choices: unique }
    }

    /// Whether this type maps without loss onto a strict target schema.
    pub fn representable(&self) -> bool {
        match self {
            Self::Boolean
            | Self::String
            | Self::Integer
            | Self::Float
            | Self::Enum { .. }
            | Self::File { .. }
            | Self::Directory { .. } => true,
            Self::List { inner } => inner.representable(),
            Self::Dict { key, value } => key.representable() && value.representable(),
            Self::Tuple { values, .. } => values.iter().all(CliType::representable),
        }
    }

    /// True for file and directory types the program writes to.
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            Self::File { output: true } | Self::Directory { output: true }
        )
    }

    /// Whether this type accepts a variable number of values.
    pub fn is_variadic(&self) -> bool {
        matches!(self, Self::List { .. } | Self::Dict { .. })
    }

    /// Rank used when two resolutions of the same argument disagree.
    ///
    /// Higher is more specific. `String` is the least specific value type and
    /// variadic wrappers rank below the concrete scalars they wrap.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::String => 0,
            Self::Boolean => 1,
            Self::List { .. } | Self::Dict { .. } => 2,
            Self::Tuple { .. } => 3,
            Self::Float => 4,
            Self::Integer => 5,
            Self::File { .. } | Self::Directory { .. } => 6,
            Self::Enum { .. } => 7,
        }
    }
}

impl fmt::Display for CliType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Enum { choices } => write!(f, "enum[{}]", choices.join(",")),
            Self::List { inner } => write!(f, "list<{inner}>"),
            Self::Dict { key, value } => write!(f, "dict<{key},{value}>"),
            Self::Tuple { values, .. } => {
                let inner = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "tuple<{inner}>")
            }
            Self::File { output: false } => write!(f, "file"),
            Self::File { output: true } => write!(f, "output file"),
            Self::Directory { output: false } => write!(f, "directory"),
            Self::Directory { output: true } => write!(f, "output directory"),
        }
    }
}
