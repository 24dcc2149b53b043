//! Local validation of user input before anything goes upstream

use crate::core::constants::MIN_ROOM_CODE_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyPlayerName,
    #[error("Game code must be at least {min} characters")]
    RoomCodeTooShort { min: usize },
    #[error("You are already in a game")]
    AlreadyInGame,
}

/// A join request that passed local checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub game_code: String,
    pub player_name: String,
}

/// Normalise and check the join form.
///
/// The name is trimmed; the code is trimmed and upper-cased.
pub fn validate_join(game_code: &str, player_name: &str) -> Result<JoinRequest, ValidationError> {
    let player_name = player_name.trim();
    if player_name.is_empty() {
        return Err(ValidationError::EmptyPlayerName);
    }

    let game_code = game_code.trim().to_uppercase();
    if game_code.chars().count() < MIN_ROOM_CODE_LEN {
        return Err(ValidationError::RoomCodeTooShort {
            min: MIN_ROOM_CODE_LEN,
        });
    }

    Ok(JoinRequest {
        game_code,
        player_name: player_name.to_string(),
    })
}
