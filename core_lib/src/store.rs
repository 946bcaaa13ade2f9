//! In-memory registry of live contact form sessions

use crate::{
    config::FormSessionConfig,
    contact::ContactForm,
    error::{AppError, Result},
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use uuid::Uuid;

struct FormEntry {
    form: Arc<ContactForm>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct FormStore {
    forms: Arc<RwLock<HashMap<Uuid, FormEntry>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl FormStore {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            forms: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
            idle_timeout,
        }
    }

    pub fn from_config(config: &FormSessionConfig) -> Self {
        Self::new(
            config.max_sessions,
            Duration::from_secs(config.idle_timeout_seconds),
        )
    }

    pub fn insert(&self, form: ContactForm) -> Result<Arc<ContactForm>> {
        if self.len() >= self.max_sessions {
            self.prune_idle();
        }

        let mut forms = self.forms.write();
        if forms.len() >= self.max_sessions {
            tracing::warn!(capacity = self.max_sessions, "form session capacity reached");
            return Err(AppError::ServiceUnavailable(
                "Too many open contact forms".to_string(),
            ));
        }

        let form = Arc::new(form);
        forms.insert(
            form.id(),
            FormEntry {
                form: form.clone(),
                last_seen: Instant::now(),
            },
        );
        Ok(form)
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<ContactForm>> {
        let mut forms = self.forms.write();
        let entry = forms
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Contact form {} not found", id)))?;
        entry.last_seen = Instant::now();
        Ok(entry.form.clone())
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.forms.write().remove(&id).is_some()
    }

    /// Drops sessions idle for longer than the timeout. Forms mid-delivery are kept.
    pub fn prune_idle(&self) -> usize {
        let idle_timeout = self.idle_timeout;
        let mut forms = self.forms.write();
        let before = forms.len();
        forms.retain(|_, entry| {
            entry.last_seen.elapsed() < idle_timeout || entry.form.service().is_in_flight()
        });
        let removed = before - forms.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = forms.len(), "pruned idle contact forms");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.forms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
