//! Error types for the planning core.
//!
//! Planners and the advisor report problems through their result records;
//! these errors come from order issuing and from loading data.

use thiserror::Error;

use crate::ids::Id;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the planning core.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unknown ship identifier.
    #[error("Ship not found: {0}")]
    ShipNotFound(Id),

    /// Unknown colony identifier.
    #[error("Colony not found: {0}")]
    ColonyNotFound(Id),

    /// Unknown wreck identifier.
    #[error("Wreck not found: {0}")]
    WreckNotFound(Id),

    /// Unknown star system identifier.
    #[error("System not found: {0}")]
    SystemNotFound(Id),

    /// Unknown faction identifier.
    #[error("Faction not found: {0}")]
    FactionNotFound(Id),

    /// The ship's faction may not interact with the colony.
    #[error(
        "Ship {ship_id} (faction {ship_faction}) cannot use colony {colony_id} \
         (faction {colony_faction})"
    )]
    NotPermitted {
        /// Ship issuing the order.
        ship_id: Id,
        /// Faction owning the ship.
        ship_faction: Id,
        /// Colony targeted by the order.
        colony_id: Id,
        /// Faction owning the colony.
        colony_faction: Id,
    },

    /// An order argument was out of range.
    #[error("Invalid order argument: {0}")]
    InvalidArgument(String),

    /// No jump route reaches the destination under the given constraints.
    #[error("No route for ship {ship_id} to system {system_id}")]
    NoRoute {
        /// Ship being routed.
        ship_id: Id,
        /// Destination system.
        system_id: Id,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
