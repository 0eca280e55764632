use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use no_dues::workflows::clearance::{
    Application, ApplicationId, ApplicationRepository, ClearanceNotification, NotificationError,
    NotificationPublisher, RepositoryError,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

/// Process-local store; the revision check runs under the same lock as the write.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn compare_and_swap(
        &self,
        expected_revision: u64,
        application: Application,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        let stored = guard
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::Conflict {
                expected: expected_revision,
                found: stored.revision,
            });
        }
        *stored = application;
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn open(&self) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|application| !application.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DeliveredNotification {
    pub(crate) delivered_at: DateTime<Utc>,
    pub(crate) notification: ClearanceNotification,
}

/// Inbox adapter that keeps every notification in memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<DeliveredNotification>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notification: ClearanceNotification) -> Result<(), NotificationError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotificationError::Transport("inbox mutex poisoned".to_string()))?;
        guard.push(DeliveredNotification {
            delivered_at: Utc::now(),
            notification,
        });
        Ok(())
    }
}

impl InMemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<DeliveredNotification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
