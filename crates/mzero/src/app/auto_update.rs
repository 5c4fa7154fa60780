//! Application self-update: one check/download/install cycle at start, then an
//! optional restart once the new build is on disk.

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::watch;

use mzero_core::UpdateSource;
use mzero_core::auto_update::{ApplyResult, AutoUpdateError};

use crate::error::AppError;
use crate::state::{UpdateEvent, UpdateSessionState};

pub struct Updater {
    source: Arc<dyn UpdateSource>,
    state: watch::Sender<UpdateSessionState>,
    outcome: Option<ApplyResult>,
}

impl Updater {
    pub fn new(source: Arc<dyn UpdateSource>) -> Self {
        let (state, _) = watch::channel(UpdateSessionState::None);
        Self {
            source,
            state,
            outcome: None,
        }
    }

    /// Observe state changes, e.g. to show download progress.
    pub fn subscribe(&self) -> watch::Receiver<UpdateSessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UpdateSessionState {
        *self.state.borrow()
    }

    /// How the installed update must be activated, once `Ready`.
    pub fn outcome(&self) -> Option<ApplyResult> {
        self.outcome
    }

    fn apply(&self, event: UpdateEvent) {
        self.state.send_modify(|state| {
            let next = state.transition(event);
            if next != *state {
                debug!("Update state {state:?} -> {next:?}");
            }
            *state = next;
        });
    }

    /// Run one update cycle if auto-update is enabled. Errors are logged and
    /// leave the state at `None`.
    pub async fn run_cycle(&mut self, auto_update: bool) {
        if !auto_update {
            debug!("Auto update disabled, skipping update check");
            return;
        }

        self.outcome = None;
        self.apply(UpdateEvent::CheckStarted);

        match self.check_and_install().await {
            Ok(Some(result)) => {
                self.outcome = Some(result);
                self.apply(UpdateEvent::Installed);
                info!("Update installed ({result:?})");
            }
            Ok(None) => {}
            Err(error) => {
                error!("{error}");
                self.apply(UpdateEvent::Failed);
            }
        }
    }

    /// Run the update cycle concurrently with `work`. Both always run to
    /// completion, so a failing `work` never cuts the cycle short.
    pub async fn run_alongside<F: Future>(&mut self, auto_update: bool, work: F) -> F::Output {
        let ((), output) = tokio::join!(self.run_cycle(auto_update), work);
        output
    }

    async fn check_and_install(&self) -> Result<Option<ApplyResult>, AppError> {
        let update = self
            .source
            .check()
            .await
            .map_err(|error| AppError::auto_update_failed("check", error))?;
        let Some(update) = update else {
            info!("MetadataZero is up to date");
            return Ok(None);
        };

        self.apply(UpdateEvent::DownloadStarted);
        info!(
            "Downloading MetadataZero {} from {}",
            update.latest_version, update.download_url
        );
        let result = self
            .source
            .download_and_install(&update)
            .await
            .map_err(|error| AppError::auto_update_failed("install", error))?;
        Ok(Some(result))
    }

    /// Relaunch into the installed update.
    ///
    /// # Errors
    /// Returns an error telling the user to reopen the app manually when the
    /// relaunch fails.
    pub fn restart(
        &self,
        relaunch: impl FnOnce() -> Result<(), AutoUpdateError>,
    ) -> Result<(), AppError> {
        if self.state() != UpdateSessionState::Ready {
            return Err(AppError::from("No update is ready to install"));
        }

        info!("Restarting app for update");
        relaunch().map_err(|error| {
            let error = AppError::restart_failed(error);
            error!("{error}");
            error
        })
    }
}
