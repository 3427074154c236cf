//! Element identity keys.
//!
//! A key either names an element by kind and position among its same-kind
//! siblings (`view-state#2`) or carries an opaque string that is matched
//! against the element's `id` attribute. Which one a key is gets decided
//! once, when the key is parsed.

use std::fmt;

use smol_str::SmolStr;

use super::kind::ElementKind;

/// A key identifying one element below a known parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementIdentity {
    /// The `ordinal`-th (0-based) child of `kind`.
    Typed { kind: ElementKind, ordinal: usize },
    /// Matched against the `id` attribute.
    Opaque(SmolStr),
}

impl ElementIdentity {
    pub fn typed(kind: ElementKind, ordinal: usize) -> Self {
        Self::Typed { kind, ordinal }
    }

    pub fn opaque(key: impl Into<SmolStr>) -> Self {
        Self::Opaque(key.into())
    }

    /// Parse a key of the form `<tag>#<ordinal>`.
    ///
    /// Anything that is not a known tag followed by a decimal ordinal is an
    /// opaque key, including ids that happen to contain `#`.
    pub fn parse(key: &str) -> Self {
        let typed = key.rsplit_once('#').and_then(|(tag, ordinal)| {
            let kind = ElementKind::from_tag(tag)?;
            if ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let ordinal = ordinal.parse::<usize>().ok()?;
            Some(Self::Typed { kind, ordinal })
        });
        typed.unwrap_or_else(|| Self::Opaque(SmolStr::new(key)))
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, Self::Typed { .. })
    }
}

impl fmt::Display for ElementIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typed { kind, ordinal } => write!(f, "{}#{}", kind.tag(), ordinal),
            Self::Opaque(key) => f.write_str(key),
        }
    }
}
