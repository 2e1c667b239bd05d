//! Host Lifecycle and Public API
//!
//! [`NyanHost`] owns the controller between `activate` and `deactivate`.
//! Collaborators get a [`ProgressApi`], which shares the host's controller
//! slot: once the host deactivates, every API call fails with
//! [`ApiError::NotInitialized`] instead of acting on a dead controller.

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::Settings;
use crate::context::{ContextId, STOPPED_BY_USER};
use crate::controller::{ActivityController, ProgressOptions, StartOptions};
use crate::dispatch::Dispatcher;
use crate::events::InboundEvent;
use crate::indicator::StatusSink;

/// Capacity of the inbound event queue
pub const INBOUND_CAPACITY: usize = 256;

/// Errors from the public API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Called before activation or after deactivation
    #[error("Nyan Progress controller is not initialised.")]
    NotInitialized,
}

type ControllerSlot = Arc<RwLock<Option<ActivityController>>>;

/// Owner of the controller's lifecycle
#[derive(Debug)]
pub struct NyanHost {
    slot: ControllerSlot,
    dispatchers: Mutex<Vec<AbortHandle>>,
}

impl NyanHost {
    /// Construct the controller
    pub fn activate(settings: Arc<dyn Settings>, sink: Arc<dyn StatusSink>) -> Self {
        tracing::info!("Activating Nyan Progress");
        let controller = ActivityController::new(settings, sink);
        Self {
            slot: Arc::new(RwLock::new(Some(controller))),
            dispatchers: Mutex::new(Vec::new()),
        }
    }

    /// A handle to the public API
    #[must_use]
    pub fn api(&self) -> ProgressApi {
        ProgressApi {
            slot: Arc::clone(&self.slot),
        }
    }

    /// The live controller, if still active
    #[must_use]
    pub fn controller(&self) -> Option<ActivityController> {
        self.slot.read().clone()
    }

    /// Start the inbound event queue
    ///
    /// Returns the sender collaborators push events into and the dispatcher
    /// task, which finishes once every sender is dropped and the queue is
    /// drained. Deactivating the host aborts it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] after deactivation.
    pub fn spawn_dispatcher(
        &self,
    ) -> Result<(mpsc::Sender<InboundEvent>, JoinHandle<()>), ApiError> {
        let controller = self.controller().ok_or(ApiError::NotInitialized)?;
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let task = tokio::spawn(Dispatcher::new(controller).run(rx));
        self.dispatchers.lock().push(task.abort_handle());
        Ok((tx, task))
    }

    /// Stop the dispatchers, dispose the controller and clear the slot
    ///
    /// Safe to call more than once.
    pub fn deactivate(&self) {
        for handle in self.dispatchers.lock().drain(..) {
            handle.abort();
        }
        if let Some(controller) = self.slot.write().take() {
            controller.dispose();
            tracing::info!("Nyan Progress deactivated");
        }
    }

    /// Whether the controller is live
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.read().is_some()
    }
}

impl Drop for NyanHost {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Public entry points for collaborators
#[derive(Clone, Debug)]
pub struct ProgressApi {
    slot: ControllerSlot,
}

impl ProgressApi {
    fn controller(&self) -> Result<ActivityController, ApiError> {
        self.slot.read().clone().ok_or(ApiError::NotInitialized)
    }

    /// Begin a context, ended when the guard is ended or dropped
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller.
    pub fn begin_context(
        &self,
        reason: &str,
        auto_reveal: bool,
    ) -> Result<ContextGuard, ApiError> {
        let controller = self.controller()?;
        let options = StartOptions {
            auto_reveal,
            force_reveal: false,
        };
        let id = controller.begin_context(reason, options, None);
        Ok(ContextGuard {
            controller,
            id: Some(id),
        })
    }

    /// Run `task` inside a context
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller; the
    /// task is not run.
    pub async fn with_progress<F, T>(
        &self,
        options: ProgressOptions,
        task: F,
    ) -> Result<T, ApiError>
    where
        F: Future<Output = T>,
    {
        let controller = self.controller()?;
        Ok(controller.with_progress(options, task).await)
    }

    /// Clear every context
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller.
    pub fn stop_all(&self, reason: Option<&str>) -> Result<(), ApiError> {
        self.controller()?.stop_all(reason);
        Ok(())
    }

    /// Flip the manual context
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller.
    pub fn toggle(&self) -> Result<(), ApiError> {
        self.controller()?.toggle();
        Ok(())
    }

    /// Stop everything on the user's behalf
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller.
    pub fn stop(&self) -> Result<(), ApiError> {
        self.controller()?.stop_all(Some(STOPPED_BY_USER));
        Ok(())
    }

    /// Run the demo sequence to completion
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotInitialized`] without a live controller.
    pub async fn demo(&self) -> Result<(), ApiError> {
        let controller = self.controller()?;
        controller.play_demo().await;
        Ok(())
    }
}

/// Handle to a context begun through [`ProgressApi::begin_context`]
#[derive(Debug)]
pub struct ContextGuard {
    controller: ActivityController,
    id: Option<ContextId>,
}

impl ContextGuard {
    /// The context's ID
    #[must_use]
    pub fn id(&self) -> Option<&ContextId> {
        self.id.as_ref()
    }

    /// End the context now
    pub fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.controller.end_context(&id, None);
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedSettings;
    use crate::context::{COMPLETION_FALLBACK, DEACTIVATED};
    use crate::events::Command;
    use crate::indicator::MemoryStatusSink;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn host() -> NyanHost {
        NyanHost::activate(
            Arc::new(SharedSettings::default()),
            Arc::new(MemoryStatusSink::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_ends_context_on_drop() {
        let host = host();
        let api = host.api();
        let controller = host.controller().unwrap();

        {
            let _guard = api.begin_context("Indexing", false).unwrap();
            assert_eq!(controller.displayed_reason(), "Indexing");
        }
        assert!(!controller.is_running());
        assert_eq!(controller.displayed_reason(), COMPLETION_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_end_is_single_shot() {
        let host = host();
        let api = host.api();
        let controller = host.controller().unwrap();

        let guard = api.begin_context("Indexing", false).unwrap();
        assert!(guard.id().is_some());
        guard.end();
        assert_eq!(controller.context_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_after_deactivate_fails() {
        let host = host();
        let api = host.api();
        let controller = host.controller().unwrap();
        api.toggle().unwrap();

        host.deactivate();
        assert!(!host.is_active());
        assert_eq!(controller.displayed_reason(), DEACTIVATED);

        assert_eq!(
            api.begin_context("late", false).err(),
            Some(ApiError::NotInitialized)
        );
        assert_eq!(api.stop_all(None), Err(ApiError::NotInitialized));
        assert_eq!(api.toggle(), Err(ApiError::NotInitialized));
        assert_eq!(
            api.with_progress(ProgressOptions::default(), async { 1 }).await,
            Err(ApiError::NotInitialized)
        );
        assert_eq!(
            ApiError::NotInitialized.to_string(),
            "Nyan Progress controller is not initialised."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_outliving_host_is_harmless() {
        let host = host();
        let guard = host.api().begin_context("Indexing", false).unwrap();
        host.deactivate();
        drop(guard);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_command_reason() {
        let host = host();
        let api = host.api();
        api.toggle().unwrap();
        api.stop().unwrap();
        assert_eq!(host.controller().unwrap().displayed_reason(), STOPPED_BY_USER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_progress_through_api() {
        let host = host();
        let value = host
            .api()
            .with_progress(ProgressOptions::titled("Fetching"), async { "ok" })
            .await
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_queue() {
        let host = host();
        let (tx, task) = host.spawn_dispatcher().unwrap();
        tx.send(Command::Toggle.into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(host.controller().unwrap().is_running());

        drop(tx);
        task.await.unwrap();
        host.deactivate();
        assert_eq!(host.spawn_dispatcher().err(), Some(ApiError::NotInitialized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_stops_dispatcher() {
        let host = host();
        let controller = host.controller().unwrap();
        let (tx, task) = host.spawn_dispatcher().unwrap();

        host.deactivate();
        let joined = task.await;
        assert!(joined.unwrap_err().is_cancelled());

        assert!(tx.send(Command::Toggle.into()).await.is_err());
        assert!(!controller.is_running());
        assert!(!controller.is_animating());
    }
}
