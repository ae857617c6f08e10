//! Upload sessions and their cancellation tokens.
//!
//! A session spans from the first `add_files` after construction (or after a
//! cancellation) to the next cancellation. Each session owns one
//! [`CancellationToken`]. Tokens are never reset: once a session is
//! cancelled it stays cancelled, and the next `add_files` replaces it with a
//! fresh session so that late completions from the old session can always be
//! told apart by id.

use std::fmt;
use tokio_util::sync::CancellationToken;

/// Monotonically increasing session identifier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One revocable upload session
#[derive(Clone, Debug, Default)]
pub struct UploadSession {
    id: SessionId,
    token: CancellationToken,
}

impl UploadSession {
    /// Start the first session
    pub fn new() -> Self {
        Self::default()
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// A clone of the session token, lent to an in-flight transport call
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether [`cancel`](Self::cancel) has been called on this session
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel this session. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Issue the session that follows this one, with a fresh token
    pub fn successor(&self) -> Self {
        Self {
            id: SessionId(self.id.0 + 1),
            token: CancellationToken::new(),
        }
    }

    /// The successor if this session is cancelled, `None` while it is still live
    pub(crate) fn renewed(&self) -> Option<Self> {
        self.is_cancelled().then(|| self.successor())
    }
}
