//! Device id bootstrap and one-shot readiness publication.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use peershare_api::DeviceApi;
use peershare_platform::DocumentRoot;
use peershare_protocol::RegisterRequest;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::agent::{ClientInfo, default_name};
use crate::store::IdStore;

/// Subscriber invoked once with the resolved id (`None` when unavailable).
pub type ReadyCallback = Box<dyn FnOnce(Option<String>) + Send>;

/// Document-root data key annotated with the resolved id.
pub const DEVICE_ID_DATA_KEY: &str = "deviceId";

enum Readiness {
    Pending(Vec<ReadyCallback>),
    Resolved(Option<String>),
}

/// Obtains a stable device id and publishes it to subscribers.
pub struct DeviceIdentity {
    api: Arc<dyn DeviceApi>,
    store: Arc<dyn IdStore>,
    root: Arc<dyn DocumentRoot>,
    client: ClientInfo,
    readiness: Mutex<Readiness>,
    started: AtomicBool,
}

impl DeviceIdentity {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        store: Arc<dyn IdStore>,
        root: Arc<dyn DocumentRoot>,
        client: ClientInfo,
    ) -> Self {
        Self {
            api,
            store,
            root,
            client,
            readiness: Mutex::new(Readiness::Pending(Vec::new())),
            started: AtomicBool::new(false),
        }
    }

    /// Registers with the server and publishes the resulting id.
    ///
    /// The stored id (if any) is sent along so the server keeps it. When
    /// registration fails the stored id is published instead, or `None`
    /// when there is nothing stored. Only the first call does any work.
    pub async fn init(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("device identity already initialised");
            return;
        }

        let stored = self.store.load();
        let req = RegisterRequest {
            id: stored.clone(),
            name: default_name(&self.client),
        };

        let mut fallback = PublishOnDrop {
            identity: self,
            stored: Some(stored.clone()),
        };
        let result = self.api.register(&req).await;
        fallback.disarm();

        match result {
            Ok(device) if !device.id.is_empty() => {
                if let Err(e) = self.store.save(&device.id) {
                    warn!(error = %e, "unable to persist device id");
                }
                info!(device = %device.id, name = %device.name, "device identity ready");
                self.publish(Some(device.id));
                return;
            }
            Ok(_) => warn!("device registration returned an empty id"),
            Err(e) => warn!(error = %e, "device auto-registration failed"),
        }

        if let Some(id) = &stored {
            info!(device = %id, "using stored device id");
        }
        self.publish(stored);
    }

    /// Runs `callback` with the resolved id.
    ///
    /// Runs immediately when the identity is already resolved, otherwise
    /// once at resolution, in subscription order.
    pub fn on_ready(&self, callback: impl FnOnce(Option<String>) + Send + 'static) {
        let resolved = {
            let Ok(mut guard) = self.readiness.lock() else {
                return;
            };
            match &mut *guard {
                Readiness::Pending(queue) => {
                    queue.push(Box::new(callback));
                    return;
                }
                Readiness::Resolved(id) => id.clone(),
            }
        };
        callback(resolved);
    }

    /// Resolves once the identity is published.
    pub async fn wait_ready(&self) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        self.on_ready(move |id| {
            let _ = tx.send(id);
        });
        rx.await.unwrap_or(None)
    }

    /// The resolved id, `None` before resolution or when unavailable.
    pub fn id(&self) -> Option<String> {
        match &*self.readiness.lock().ok()? {
            Readiness::Resolved(id) => id.clone(),
            Readiness::Pending(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.readiness
            .lock()
            .map(|g| matches!(*g, Readiness::Resolved(_)))
            .unwrap_or(false)
    }

    fn publish(&self, id: Option<String>) {
        let callbacks = {
            let Ok(mut guard) = self.readiness.lock() else {
                return;
            };
            if matches!(*guard, Readiness::Resolved(_)) {
                warn!("device identity already published");
                return;
            }
            match std::mem::replace(&mut *guard, Readiness::Resolved(id.clone())) {
                Readiness::Pending(queue) => queue,
                Readiness::Resolved(_) => Vec::new(),
            }
        };

        if let Some(id) = &id {
            self.root.set_data(DEVICE_ID_DATA_KEY, id);
        }
        for callback in callbacks {
            callback(id.clone());
        }
    }
}

/// Publishes the stored id if `init` is dropped while registering, so
/// subscribers are never left waiting.
struct PublishOnDrop<'a> {
    identity: &'a DeviceIdentity,
    stored: Option<Option<String>>,
}

impl PublishOnDrop<'_> {
    fn disarm(&mut self) {
        self.stored = None;
    }
}

impl Drop for PublishOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(stored) = self.stored.take() {
            warn!("device registration cancelled, publishing stored id");
            self.identity.publish(stored);
        }
    }
}
