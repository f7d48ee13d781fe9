//! Template-expression modes.

use serde::{Deserialize, Serialize};

/// The leading sigil of a `{{...}}` marker.
///
/// `else` is not a mode: it is recognized from the expression body and
/// handled before mode dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Mode {
    /// No sigil: escaped value read or helper call
    #[default]
    Escaped = 0,
    /// `{` or `&`: unescaped value read or helper call
    Unescaped = 1,
    /// `#`: open a branch
    Section = 2,
    /// `^`: open an inverted branch
    Inverse = 3,
    /// `<`: open a named inline template
    InlineTemplate = 4,
    /// `/`: close the most recently opened branch
    Close = 5,
    /// `>`: invoke a partial
    Partial = 6,
    /// `!`: template comment, never rendered
    Comment = 7,
}

impl Mode {
    /// Parse a leading sigil.
    pub fn from_sigil(c: char) -> Option<Self> {
        match c {
            '{' | '&' => Some(Self::Unescaped),
            '#' => Some(Self::Section),
            '^' => Some(Self::Inverse),
            '<' => Some(Self::InlineTemplate),
            '/' => Some(Self::Close),
            '>' => Some(Self::Partial),
            '!' => Some(Self::Comment),
            _ => None,
        }
    }

    /// The sigil as written in templates (`""` for [`Mode::Escaped`]).
    pub fn sigil(&self) -> &'static str {
        match self {
            Self::Escaped => "",
            Self::Unescaped => "{",
            Self::Section => "#",
            Self::Inverse => "^",
            Self::InlineTemplate => "<",
            Self::Close => "/",
            Self::Partial => ">",
            Self::Comment => "!",
        }
    }

    /// Whether this mode opens a branch with a body.
    #[inline]
    pub fn opens_branch(&self) -> bool {
        matches!(self, Self::Section | Self::Inverse | Self::InlineTemplate)
    }
}
