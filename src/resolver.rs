use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::debrid::{DebridClient, UnlockError};
use crate::descriptor::{StreamDescriptor, StreamKind, classify};
use crate::selector::pick_file;

/// Default umbrella deadline for one unlock attempt
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("stream does not include a playable URL")]
    NoPlayableSource,
}

/// Step of the unlock lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockStage {
    Register,
    Metadata,
    SelectFile,
    ReadyLinks,
    Unrestrict,
}

impl fmt::Display for UnlockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnlockStage::Register => "register",
            UnlockStage::Metadata => "metadata",
            UnlockStage::SelectFile => "select-file",
            UnlockStage::ReadyLinks => "ready-links",
            UnlockStage::Unrestrict => "unrestrict",
        };
        f.write_str(name)
    }
}

/// Where an unlock attempt stopped and why
#[derive(Error, Debug)]
#[error("unlock failed at {stage}: {error}")]
pub struct UnlockFailure {
    pub stage: UnlockStage,
    #[source]
    pub error: UnlockError,
}

impl UnlockFailure {
    fn at(stage: UnlockStage) -> impl FnOnce(UnlockError) -> Self {
        move |error| Self { stage, error }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, UnlockError::Cancelled)
    }
}

/// How the playable URL was obtained
#[derive(Debug)]
pub enum Route {
    /// Direct link passed through unchanged
    Direct,
    /// Magnet handed to the player, unlocking is disabled
    Magnet,
    /// Link produced by the unlock service
    Unlocked,
    /// Unlocking failed, the original link or magnet is returned instead
    Fallback(UnlockFailure),
}

#[derive(Debug)]
pub struct Playable {
    pub url: String,
    pub route: Route,
}

impl Playable {
    fn new(url: String, route: Route) -> Self {
        Self { url, route }
    }
}

/// Turns stream descriptors into something the player can open
pub struct Resolver {
    debrid: Option<DebridClient>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(debrid: Option<DebridClient>) -> Self {
        Self {
            debrid,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn unlock_enabled(&self) -> bool {
        self.debrid.is_some()
    }

    /// Resolve a descriptor to a playable URL.
    ///
    /// Unlock failures never surface as errors: the direct link or magnet is
    /// returned with [`Route::Fallback`]. The only error is a descriptor with
    /// nothing to play.
    pub async fn resolve(
        &self,
        descriptor: &StreamDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Playable, ResolveError> {
        let magnet = match classify(descriptor) {
            StreamKind::Direct(url) => return Ok(self.resolve_direct(url, cancel).await),
            StreamKind::MagnetUri(magnet) | StreamKind::HashSynthesized(magnet) => magnet,
        };

        if magnet.is_empty() {
            return Err(ResolveError::NoPlayableSource);
        }

        let Some(debrid) = &self.debrid else {
            debug!("unlocking disabled, using magnet");
            return Ok(Playable::new(magnet, Route::Magnet));
        };

        let deadline = self.deadline(cancel);
        let result = unlock_magnet(debrid, &magnet, descriptor.file_idx, &deadline).await;

        Ok(match result {
            Ok(url) => Playable::new(url, Route::Unlocked),
            Err(failure) => {
                warn!(stage = %failure.stage, error = %failure.error, "unlock failed, falling back to magnet");
                Playable::new(magnet, Route::Fallback(failure))
            }
        })
    }

    async fn resolve_direct(&self, url: String, cancel: &CancellationToken) -> Playable {
        let Some(debrid) = &self.debrid else {
            return Playable::new(url, Route::Direct);
        };

        let deadline = self.deadline(cancel);
        let _guard = deadline.clone().drop_guard();

        match debrid.unrestrict(&url, &deadline).await {
            Ok(link) => Playable::new(link, Route::Unlocked),
            Err(error) => {
                warn!(error = %error, "unrestrict failed, using direct link");
                let failure = UnlockFailure::at(UnlockStage::Unrestrict)(error);
                Playable::new(url, Route::Fallback(failure))
            }
        }
    }

    /// Child token that also fires once the resolve timeout elapses
    fn deadline(&self, cancel: &CancellationToken) -> CancellationToken {
        let token = cancel.child_token();
        let timer = token.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    debug!(timeout_secs = timeout.as_secs(), "resolve deadline reached");
                    timer.cancel();
                }
            }
        });

        token
    }
}

async fn unlock_magnet(
    debrid: &DebridClient,
    magnet: &str,
    file_idx: Option<usize>,
    cancel: &CancellationToken,
) -> Result<String, UnlockFailure> {
    // Stops the deadline timer once this attempt is over
    let _guard = cancel.clone().drop_guard();

    let handle = debrid
        .add_magnet(magnet, cancel)
        .await
        .map_err(UnlockFailure::at(UnlockStage::Register))?;

    let files = debrid
        .await_metadata(&handle, cancel)
        .await
        .map_err(UnlockFailure::at(UnlockStage::Metadata))?;

    let file_id = pick_file(&files, file_idx);
    debrid
        .select_file(&handle, file_id, cancel)
        .await
        .map_err(UnlockFailure::at(UnlockStage::SelectFile))?;

    let links = debrid
        .await_ready_links(&handle, cancel)
        .await
        .map_err(UnlockFailure::at(UnlockStage::ReadyLinks))?;

    let link = links.first().ok_or(UnlockFailure {
        stage: UnlockStage::ReadyLinks,
        error: UnlockError::LinksTimeout,
    })?;

    let url = debrid
        .unrestrict(link, cancel)
        .await
        .map_err(UnlockFailure::at(UnlockStage::Unrestrict))?;

    info!(torrent_id = %handle.id, file_id, "stream unlocked");
    Ok(url)
}
