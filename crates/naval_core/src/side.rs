//! Battle sides.

use serde::{Deserialize, Serialize};

/// The side a ship fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The player's fleet.
    Ally,
    /// The opposing fleet.
    Enemy,
}

impl Side {
    /// Both sides, in registry order.
    pub const ALL: [Self; 2] = [Self::Ally, Self::Enemy];

    /// The side this one fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Enemy,
            Self::Enemy => Self::Ally,
        }
    }

    /// Get the display name for this side.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Ally => "Allied fleet",
            Self::Enemy => "Enemy fleet",
        }
    }
}
