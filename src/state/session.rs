//! Pure session rules: caller role derivation, authorization policies, scoring and
//! winner selection. Nothing here touches storage; callers pass in the current
//! game and player rows and act on the result.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, PlayerRole},
    state::identity::Caller,
};

pub const DEFAULT_NUMBER_OF_PLAYERS: u8 = 3;
pub const MIN_NUMBER_OF_PLAYERS: u8 = 2;
pub const MAX_NUMBER_OF_PLAYERS: u8 = 10;
pub const DEFAULT_NUMBER_OF_AI_PLAYERS: u8 = 0;
pub const DEFAULT_TIMER_SECS: u16 = 30;
pub const MIN_TIMER_SECS: u16 = 5;
pub const MAX_TIMER_SECS: u16 = 120;

/// Role of a caller within one session, derived on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    /// Creator of the game the session runs.
    Host,
    /// Seated with the `GAME_MASTER` player role.
    Gamemaster,
    /// Anyone else, seated or not; admin rights come from [`Caller`], not from this role.
    Player,
}

/// Derive the caller's role. Host wins over gamemaster, gamemaster over player.
pub fn derive_role(game_creator_id: Uuid, user_id: Uuid, players: &[PlayerEntity]) -> SessionRole {
    if game_creator_id == user_id {
        return SessionRole::Host;
    }

    let is_gamemaster = players
        .iter()
        .any(|player| player.user_id == Some(user_id) && player.role == PlayerRole::GameMaster);
    if is_gamemaster {
        SessionRole::Gamemaster
    } else {
        SessionRole::Player
    }
}

/// Whether the caller holds a seat in the session.
pub fn is_seated(user_id: Uuid, players: &[PlayerEntity]) -> bool {
    players.iter().any(|player| player.user_id == Some(user_id))
}

/// Board mutations and finalization: host, gamemaster or platform admin.
pub fn can_manage_board(role: SessionRole, caller: &Caller) -> bool {
    caller.is_admin() || matches!(role, SessionRole::Host | SessionRole::Gamemaster)
}

/// Turn updates: any seated player, the host or an admin.
pub fn can_set_turn(role: SessionRole, caller: &Caller, players: &[PlayerEntity]) -> bool {
    caller.is_admin() || role == SessionRole::Host || is_seated(caller.user_id, players)
}

/// Session deletion and player role changes: host or admin.
pub fn can_administer(role: SessionRole, caller: &Caller) -> bool {
    caller.is_admin() || role == SessionRole::Host
}

/// Points awarded (or withdrawn) for an answer to a question worth `value`.
pub fn point_delta(value: i32, correct: bool) -> i32 {
    if correct { value } else { -value }
}

/// Player with the strictly highest score; `None` when the top score is shared or nobody played.
pub fn select_winner(players: &[PlayerEntity]) -> Option<&PlayerEntity> {
    let best = players.iter().map(|player| player.points).max()?;
    let mut leaders = players.iter().filter(|player| player.points == best);
    let winner = leaders.next()?;
    match leaders.next() {
        Some(_) => None,
        None => Some(winner),
    }
}

/// Validated session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub number_of_players: u8,
    pub number_of_ai_players: u8,
    pub default_timer: u16,
}

impl SessionSettings {
    /// Apply defaults and check ranges, returning a message naming the offending field.
    pub fn resolve(
        number_of_players: Option<i64>,
        number_of_ai_players: Option<i64>,
        default_timer: Option<i64>,
    ) -> Result<Self, String> {
        let number_of_players = match number_of_players {
            None => DEFAULT_NUMBER_OF_PLAYERS,
            Some(value) => u8::try_from(value)
                .ok()
                .filter(|value| (MIN_NUMBER_OF_PLAYERS..=MAX_NUMBER_OF_PLAYERS).contains(value))
                .ok_or_else(|| {
                    format!(
                        "numberOfPlayers must be between {MIN_NUMBER_OF_PLAYERS} and {MAX_NUMBER_OF_PLAYERS}"
                    )
                })?,
        };
        let number_of_ai_players = match number_of_ai_players {
            None => DEFAULT_NUMBER_OF_AI_PLAYERS,
            Some(value) => u8::try_from(value)
                .ok()
                .filter(|value| *value <= number_of_players)
                .ok_or_else(|| {
                    format!("numberOfAiPlayers must be between 0 and {number_of_players}")
                })?,
        };
        let default_timer = match default_timer {
            None => DEFAULT_TIMER_SECS,
            Some(value) => u16::try_from(value)
                .ok()
                .filter(|value| (MIN_TIMER_SECS..=MAX_TIMER_SECS).contains(value))
                .ok_or_else(|| {
                    format!("defaultTimer must be between {MIN_TIMER_SECS} and {MAX_TIMER_SECS}")
                })?,
        };

        Ok(Self {
            number_of_players,
            number_of_ai_players,
            default_timer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::identity::SystemRole;
    use std::time::SystemTime;

    fn seat(user_id: Option<Uuid>, role: PlayerRole, points: i32) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            game_session_id: Uuid::nil(),
            user_id,
            name: "p".into(),
            points,
            role,
            joined_at: SystemTime::now(),
        }
    }

    #[test]
    fn creator_is_host_even_when_seated_as_gamemaster() {
        let creator = Uuid::new_v4();
        let players = vec![seat(Some(creator), PlayerRole::GameMaster, 0)];
        assert_eq!(derive_role(creator, creator, &players), SessionRole::Host);
    }

    #[test]
    fn gamemaster_seat_beats_plain_player() {
        let user = Uuid::new_v4();
        let players = vec![seat(Some(user), PlayerRole::GameMaster, 0)];
        assert_eq!(
            derive_role(Uuid::new_v4(), user, &players),
            SessionRole::Gamemaster
        );
        assert_eq!(
            derive_role(Uuid::new_v4(), Uuid::new_v4(), &players),
            SessionRole::Player
        );
    }

    #[test]
    fn board_management_policy() {
        let user = Caller::new(Uuid::new_v4(), SystemRole::User);
        let admin = Caller::new(Uuid::new_v4(), SystemRole::Admin);
        let moderator = Caller::new(Uuid::new_v4(), SystemRole::Moderator);

        assert!(can_manage_board(SessionRole::Host, &user));
        assert!(can_manage_board(SessionRole::Gamemaster, &user));
        assert!(!can_manage_board(SessionRole::Player, &user));
        assert!(!can_manage_board(SessionRole::Player, &moderator));
        assert!(can_manage_board(SessionRole::Player, &admin));
    }

    #[test]
    fn turn_policy_requires_a_seat() {
        let caller = Caller::new(Uuid::new_v4(), SystemRole::User);
        let players = vec![seat(Some(caller.user_id), PlayerRole::Contestant, 0)];
        assert!(can_set_turn(SessionRole::Player, &caller, &players));
        assert!(!can_set_turn(SessionRole::Player, &caller, &[]));
    }

    #[test]
    fn point_delta_sign_follows_correctness() {
        assert_eq!(point_delta(200, true), 200);
        assert_eq!(point_delta(100, false), -100);
    }

    #[test]
    fn winner_requires_strict_maximum() {
        let a = seat(Some(Uuid::new_v4()), PlayerRole::Contestant, 200);
        let b = seat(Some(Uuid::new_v4()), PlayerRole::Contestant, -100);
        let players = vec![a.clone(), b];
        assert_eq!(select_winner(&players).map(|p| p.id), Some(a.id));

        let tied = vec![
            seat(None, PlayerRole::Contestant, 300),
            seat(None, PlayerRole::Contestant, 300),
            seat(None, PlayerRole::Contestant, 100),
        ];
        assert!(select_winner(&tied).is_none());
        assert!(select_winner(&[]).is_none());
    }

    #[test]
    fn settings_defaults_and_ranges() {
        let defaults = SessionSettings::resolve(None, None, None).unwrap();
        assert_eq!(defaults.number_of_players, 3);
        assert_eq!(defaults.number_of_ai_players, 0);
        assert_eq!(defaults.default_timer, 30);

        assert!(SessionSettings::resolve(Some(1), None, None).is_err());
        assert!(SessionSettings::resolve(Some(11), None, None).is_err());
        assert!(SessionSettings::resolve(Some(4), Some(5), None).is_err());
        assert!(SessionSettings::resolve(Some(4), Some(4), None).is_ok());
        assert!(SessionSettings::resolve(None, None, Some(4)).is_err());
        assert!(SessionSettings::resolve(None, None, Some(121)).is_err());
        assert!(SessionSettings::resolve(None, Some(-1), None).is_err());
    }
}
