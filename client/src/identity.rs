//! Locally persisted player identity.
//!
//! Values are kept in a flat JSON key/value file so several game variants can
//! share one store (`platinum_user_id`, `gold_username`, ...).

use crate::Result;
use directories::ProjectDirs;
use paradrop_types::GameType;
use rand::Rng;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Identity used in requests and shown in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

pub struct IdentityStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

/// Default location of the identity file for the current user.
pub fn default_identity_path() -> Option<PathBuf> {
    ProjectDirs::from("xyz", "paradrop", "paradrop")
        .map(|dirs| dirs.config_dir().join("identity.json"))
}

impl IdentityStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "identity store not found, starting empty");
                BTreeMap::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the identity for `game`, generating and persisting whatever is missing.
    pub fn load_or_generate(&mut self, game: GameType, rng: &mut impl Rng) -> Result<Identity> {
        let user_key = format!("{game}_user_id");
        let name_key = format!("{game}_username");

        let mut dirty = false;
        let user_id = match self.values.get(&user_key) {
            Some(user_id) => user_id.clone(),
            None => {
                let user_id = format!("user_{}", rng.gen_range(0..100_000_000u32));
                self.values.insert(user_key, user_id.clone());
                dirty = true;
                user_id
            }
        };
        let username = match self.values.get(&name_key) {
            Some(username) => username.clone(),
            None => {
                let username = format!("Player{}", rng.gen_range(0..9_999u32));
                self.values.insert(name_key, username.clone());
                dirty = true;
                username
            }
        };

        if dirty {
            self.save()?;
            info!(%game, %user_id, %username, "generated local identity");
        }
        Ok(Identity { user_id, username })
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_vec_pretty(&self.values)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}
