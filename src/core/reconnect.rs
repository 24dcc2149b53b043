//! Reconnection manager
//!
//! Persists the two opaque session credentials and turns them into
//! reconnect requests every time the transport (re)connects. The server is
//! authoritative: whatever is stored is simply presented back.

use tracing::{info, warn};

use crate::core::io_traits::{TokenStore, TokenStoreError};
use crate::core::protocol::ClientMessage;

pub const HOST_TOKEN_KEY: &str = "host_token";
pub const PLAYER_TOKEN_KEY: &str = "player_token";
pub const PLAYER_NAME_KEY: &str = "player_name";
pub const GAME_CODE_KEY: &str = "game_code";

/// What a player needs to resume their seat
#[derive(Clone, PartialEq, Eq)]
pub struct PlayerCredentials {
    pub player_token: String,
    pub player_name: String,
    pub game_code: String,
}

impl std::fmt::Debug for PlayerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerCredentials")
            .field("player_token", &"<redacted>")
            .field("player_name", &self.player_name)
            .field("game_code", &self.game_code)
            .finish()
    }
}

pub struct ReconnectionManager<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> ReconnectionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a value, treating empty strings as absent
    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|v| !v.is_empty())
    }

    pub fn host_token(&self) -> Option<String> {
        self.read(HOST_TOKEN_KEY)
    }

    /// All three player values, or nothing
    pub fn player_credentials(&self) -> Option<PlayerCredentials> {
        Some(PlayerCredentials {
            player_token: self.read(PLAYER_TOKEN_KEY)?,
            player_name: self.read(PLAYER_NAME_KEY)?,
            game_code: self.read(GAME_CODE_KEY)?,
        })
    }

    /// Requests to send after the transport reports a connection
    pub fn on_connected(&self) -> Vec<ClientMessage> {
        let mut requests = Vec::new();
        let host_token = self.host_token();
        let player = self.player_credentials();

        if host_token.is_some() && player.is_some() {
            warn!("[RECONNECT] Both host and player credentials stored, attempting both");
        }

        if let Some(host_token) = host_token {
            info!("[RECONNECT] Resuming host session");
            requests.push(ClientMessage::HostReconnect { host_token });
        }

        if let Some(creds) = player {
            info!(
                player = %creds.player_name,
                game_code = %creds.game_code,
                "[RECONNECT] Resuming player session"
            );
            requests.push(ClientMessage::PlayerReconnect {
                player_token: creds.player_token,
                player_name: creds.player_name,
                game_code: creds.game_code,
            });
        }

        requests
    }

    pub fn remember_host(&mut self, host_token: &str) -> Result<(), TokenStoreError> {
        self.store.set(HOST_TOKEN_KEY, host_token)
    }

    pub fn remember_player(&mut self, creds: &PlayerCredentials) -> Result<(), TokenStoreError> {
        self.store.set(PLAYER_TOKEN_KEY, &creds.player_token)?;
        self.store.set(PLAYER_NAME_KEY, &creds.player_name)?;
        self.store.set(GAME_CODE_KEY, &creds.game_code)
    }

    pub fn forget_host(&mut self) -> Result<(), TokenStoreError> {
        self.store.remove(HOST_TOKEN_KEY)
    }

    pub fn forget_player(&mut self) -> Result<(), TokenStoreError> {
        self.store.remove(PLAYER_TOKEN_KEY)?;
        self.store.remove(PLAYER_NAME_KEY)?;
        self.store.remove(GAME_CODE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io_traits::mocks::MemoryTokenStore;

    fn creds() -> PlayerCredentials {
        PlayerCredentials {
            player_token: "t1".to_string(),
            player_name: "Ann".to_string(),
            game_code: "AB12".to_string(),
        }
    }

    #[test]
    fn test_nothing_persisted_sends_nothing() {
        let manager = ReconnectionManager::new(MemoryTokenStore::new());
        assert!(manager.on_connected().is_empty());
    }

    #[test]
    fn test_host_token_only() {
        let manager = ReconnectionManager::new(MemoryTokenStore::with(&[("host_token", "h1")]));
        assert_eq!(
            manager.on_connected(),
            vec![ClientMessage::HostReconnect {
                host_token: "h1".to_string()
            }]
        );
    }

    #[test]
    fn test_player_credentials_need_all_three_values() {
        let manager = ReconnectionManager::new(MemoryTokenStore::with(&[
            ("player_token", "t1"),
            ("player_name", "Ann"),
        ]));
        assert!(manager.on_connected().is_empty());
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let manager = ReconnectionManager::new(MemoryTokenStore::with(&[
            ("host_token", ""),
            ("player_token", "t1"),
            ("player_name", ""),
            ("game_code", "AB12"),
        ]));
        assert!(manager.on_connected().is_empty());
    }

    #[test]
    fn test_both_roles_attempted() {
        let manager = ReconnectionManager::new(MemoryTokenStore::with(&[
            ("host_token", "h1"),
            ("player_token", "t1"),
            ("player_name", "Ann"),
            ("game_code", "AB12"),
        ]));
        let kinds: Vec<_> = manager.on_connected().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["host_reconnect", "player_reconnect"]);
    }

    #[test]
    fn test_remember_and_forget_player() {
        let mut manager = ReconnectionManager::new(MemoryTokenStore::new());
        manager.remember_player(&creds()).unwrap();
        assert_eq!(manager.player_credentials(), Some(creds()));
        assert_eq!(
            manager.on_connected(),
            vec![ClientMessage::PlayerReconnect {
                player_token: "t1".to_string(),
                player_name: "Ann".to_string(),
                game_code: "AB12".to_string(),
            }]
        );

        manager.forget_player().unwrap();
        assert!(manager.player_credentials().is_none());
        assert!(manager.store().values.is_empty());
    }

    #[test]
    fn test_forget_host_keeps_player() {
        let mut manager = ReconnectionManager::new(MemoryTokenStore::new());
        manager.remember_host("h1").unwrap();
        manager.remember_player(&creds()).unwrap();
        manager.forget_host().unwrap();
        assert!(manager.host_token().is_none());
        assert!(manager.player_credentials().is_some());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut manager = ReconnectionManager::new(MemoryTokenStore::failing());
        assert!(manager.remember_host("h1").is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let dbg = format!("{:?}", creds());
        assert!(!dbg.contains("t1"));
        assert!(dbg.contains("Ann"));
    }
}
