use thiserror::Error;

/// Rejections raised by validating a command against current game state.
/// These are all `StateError`/`NotFound`/`InputError` in §7's taxonomy; the
/// session layer is the one that knows how to turn them into a response
/// envelope, so this enum only carries the reason.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("not your turn")]
    NotYourTurn,

    #[error("not enough mana")]
    NotEnoughMana,

    #[error("guards must be destroyed before the king can be attacked")]
    KingGuarded,

    #[error("unknown troop {0:?}")]
    UnknownTroop(String),

    #[error("only a healer troop can heal")]
    NotAHealer,

    #[error("the match is already over")]
    MatchOver,

    #[error("coordinates out of bounds")]
    OutOfBounds,

    #[error("spawn point is inside the river")]
    InRiver,

    #[error("spawn point is on the opponent's half")]
    WrongHalf,

    #[error("another troop is too close to that spawn point")]
    SpawnBlocked,
}
