//! Avatar URL resolution strategies.
//!
//! A session's avatar is resolved once, when the connection is accepted,
//! through whichever [`AvatarResolver`] was injected into the application
//! state. Strategies compose with [`TryAvatars`], which returns the first
//! one that succeeds.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::Identity;
use crate::error::ChatError;

/// Base URL for Gravatar images; the user id is appended.
const GRAVATAR_BASE: &str = "//www.gravatar.com/avatar/";

/// Something that can produce an avatar URL for a user.
pub trait AvatarResolver: Send + Sync + fmt::Debug {
    /// Returns the avatar URL for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoAvatarUrl`] when this strategy has no URL
    /// for the user.
    fn avatar_url(&self, user: &Identity) -> Result<String, ChatError>;
}

/// Uses the avatar URL supplied by the auth provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthAvatar;

impl AvatarResolver for AuthAvatar {
    fn avatar_url(&self, user: &Identity) -> Result<String, ChatError> {
        if user.avatar_url.is_empty() {
            return Err(ChatError::NoAvatarUrl);
        }
        Ok(user.avatar_url.clone())
    }
}

/// Derives a Gravatar URL from the user id.
#[derive(Debug, Clone, Copy, Default)]
pub struct GravatarAvatar;

impl AvatarResolver for GravatarAvatar {
    fn avatar_url(&self, user: &Identity) -> Result<String, ChatError> {
        if user.user_id.is_empty() {
            return Err(ChatError::NoAvatarUrl);
        }
        Ok(format!("{GRAVATAR_BASE}{}", user.user_id))
    }
}

/// Looks for an uploaded file named after the user id.
///
/// Scans the directory with blocking I/O; async callers should run it on
/// the blocking pool.
#[derive(Debug, Clone)]
pub struct FileSystemAvatar {
    dir: PathBuf,
    url_prefix: String,
}

impl FileSystemAvatar {
    /// Creates a strategy scanning `dir` and serving files under `url_prefix`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }
}

impl AvatarResolver for FileSystemAvatar {
    fn avatar_url(&self, user: &Identity) -> Result<String, ChatError> {
        if user.user_id.is_empty() {
            return Err(ChatError::NoAvatarUrl);
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|_| ChatError::NoAvatarUrl)?;
        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| !t.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .find(|name| name.starts_with(&user.user_id))
            .map(|name| format!("{}/{name}", self.url_prefix.trim_end_matches('/')))
            .ok_or(ChatError::NoAvatarUrl)
    }
}

/// Tries each strategy in order and returns the first URL found.
#[derive(Debug, Default)]
pub struct TryAvatars(Vec<Box<dyn AvatarResolver>>);

impl TryAvatars {
    /// Creates a chain from the given strategies.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn AvatarResolver>>) -> Self {
        Self(strategies)
    }

    /// Builds the chain named by `kinds`, in order.
    #[must_use]
    pub fn from_kinds(kinds: &[AvatarKind], avatar_dir: impl Into<PathBuf>) -> Self {
        let avatar_dir = avatar_dir.into();
        let strategies = kinds
            .iter()
            .map(|kind| -> Box<dyn AvatarResolver> {
                match kind {
                    AvatarKind::Auth => Box::new(AuthAvatar),
                    AvatarKind::Gravatar => Box::new(GravatarAvatar),
                    AvatarKind::FileSystem => {
                        Box::new(FileSystemAvatar::new(avatar_dir.clone(), "/avatars"))
                    }
                }
            })
            .collect();
        Self(strategies)
    }

    /// Returns the number of strategies in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the chain has no strategies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AvatarResolver for TryAvatars {
    fn avatar_url(&self, user: &Identity) -> Result<String, ChatError> {
        self.0
            .iter()
            .find_map(|strategy| strategy.avatar_url(user).ok())
            .ok_or(ChatError::NoAvatarUrl)
    }
}

/// Named avatar strategy, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarKind {
    /// [`AuthAvatar`].
    Auth,
    /// [`GravatarAvatar`].
    Gravatar,
    /// [`FileSystemAvatar`].
    FileSystem,
}

impl FromStr for AvatarKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(Self::Auth),
            "gravatar" => Ok(Self::Gravatar),
            "filesystem" | "file" => Ok(Self::FileSystem),
            other => Err(ChatError::InvalidConfig(format!(
                "unknown avatar strategy: {other}"
            ))),
        }
    }
}
