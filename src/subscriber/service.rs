//! Subscriber operations
//!
//! Each operation routes the address to one router, holds that router's lock
//! for its whole call sequence, and releases it before returning. The
//! searches walk both routers one after the other, never holding both locks.
//!
//! Provisioning and limit changes finish by releasing the lock and then
//! delegating to `find_by_address` for the reply (release-then-delegate);
//! the lock is never held across the delegated call, which takes it again.
//!
//! Remote calls carry no timeout: a router that stops answering blocks the
//! calling task and everything queued behind that router's lock.

use std::sync::Arc;

use crate::error::{ApiError, OpError};
use crate::router::{Router, RouterRegistry};
use crate::routeros::AdminSession;
use crate::subscriber::format::{format_rate, to_device_rate};
use crate::subscriber::report::{
    Deprovisioned, IdentityReport, NameMatches, StatusAction, StatusChange, SubscriberReport,
    ToggleOutcome,
};
use crate::subscriber::resources::{self, Binding};

pub struct SubscriberService {
    registry: Arc<RouterRegistry>,
}

impl SubscriberService {
    pub fn new(registry: Arc<RouterRegistry>) -> Self {
        Self { registry }
    }

    /// Case-insensitive substring search on binding comments, on both routers
    ///
    /// A router that is unreachable or fails is skipped.
    pub async fn find_by_name(&self, name: &str) -> NameMatches {
        let needle = name.to_lowercase();
        let mut reports = Vec::new();

        for router in self.registry.routers() {
            match scan_by_name(router, &needle).await {
                Ok(found) => reports.extend(found),
                Err(e) => tracing::warn!(
                    "[Subscriber] Skipping {} in name search: {}",
                    router.label(),
                    e
                ),
            }
        }

        NameMatches {
            query: name.to_string(),
            reports,
        }
    }

    /// Exact address lookup, primary router first
    ///
    /// Stops at the first router holding a binding for `ip`. The address
    /// prefix is not consulted, so a stale binding with the same address on
    /// the primary router shadows the secondary's record.
    pub async fn find_by_address(&self, ip: &str) -> Result<SubscriberReport, OpError> {
        for router in self.registry.routers() {
            match lookup_address(router, ip).await {
                Ok(Some(report)) => return Ok(report),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "[Subscriber] Skipping {} in address lookup: {}",
                    router.label(),
                    e
                ),
            }
        }

        let [primary, secondary] = self.registry.routers();
        Err(OpError::SubscriberNotFound {
            ip: ip.to_string(),
            primary: primary.label().to_string(),
            secondary: secondary.label().to_string(),
        })
    }

    pub async fn toggle_status(
        &self,
        ip: &str,
        action: StatusAction,
    ) -> Result<ToggleOutcome, OpError> {
        let router = self.registry.select(ip)?;
        let label = router.label();
        let mut session = router.lock().await?;

        let binding = resources::find_binding(&mut **session, ip)
            .await
            .map_err(|e| OpError::remote("look up binding", label, e))?
            .ok_or_else(|| OpError::BindingNotFound {
                ip: ip.to_string(),
                router: label.to_string(),
            })?;

        let change = StatusChange {
            router: label.to_string(),
            subscriber: binding.comment.clone(),
            action,
        };

        if binding.disabled == action.disabled() {
            return Ok(ToggleOutcome::AlreadyInState(change));
        }

        resources::set_binding_disabled(&mut **session, &binding.id, action.disabled())
            .await
            .map_err(|e| OpError::remote("change status", label, e))?;

        tracing::info!(
            "[Subscriber] {} ({}) on {} set to {:?}",
            ip,
            binding.comment,
            label,
            action
        );
        Ok(ToggleOutcome::Changed(change))
    }

    /// Create or update the binding and queue for `ip`, then report it
    ///
    /// A queue failure after a successful binding step is reported as
    /// `PartialProvision` so the operator knows only the queue needs redoing.
    pub async fn provision(
        &self,
        ip: &str,
        limit: &str,
        name: &str,
    ) -> Result<SubscriberReport, OpError> {
        let router = self.registry.select(ip)?;
        let label = router.label();
        let device_rate = to_device_rate(limit);

        let mut session = router.lock().await?;

        resources::upsert_binding(&mut **session, ip, name)
            .await
            .map_err(|e| OpError::remote("save binding", label, e))?;

        resources::upsert_queue(&mut **session, ip, name, &device_rate)
            .await
            .map_err(|source| OpError::PartialProvision {
                router: label.to_string(),
                source,
            })?;

        tracing::info!(
            "[Subscriber] Provisioned {} ({}) on {} at {}",
            ip,
            name,
            label,
            device_rate
        );

        drop(session);
        self.find_by_address(ip).await
    }

    /// Remove the binding (required) and the queue (if any) for `ip`
    pub async fn deprovision(&self, ip: &str) -> Result<Deprovisioned, OpError> {
        let router = self.registry.select(ip)?;
        let label = router.label();
        let mut session = router.lock().await?;

        let binding = resources::find_binding(&mut **session, ip)
            .await
            .map_err(|e| OpError::remote("look up binding", label, e))?
            .ok_or_else(|| OpError::NotInBinding {
                ip: ip.to_string(),
                router: label.to_string(),
            })?;

        resources::remove_binding(&mut **session, &binding.id)
            .await
            .map_err(|e| OpError::remote("remove binding", label, e))?;

        let partial = |source: ApiError| OpError::PartialDeprovision {
            ip: ip.to_string(),
            router: label.to_string(),
            source,
        };

        let queue = resources::find_queue(&mut **session, ip)
            .await
            .map_err(partial)?;

        let queue_removed = match queue {
            Some(queue) => {
                resources::remove_queue(&mut **session, &queue.id)
                    .await
                    .map_err(partial)?;
                tracing::debug!(
                    "[Subscriber] Removed queue '{}' -> {} ({})",
                    queue.name,
                    queue.target,
                    queue.comment
                );
                true
            }
            None => false,
        };

        tracing::info!(
            "[Subscriber] Deprovisioned {} from {} (queue removed: {})",
            ip,
            label,
            queue_removed
        );

        Ok(Deprovisioned {
            ip: ip.to_string(),
            router: label.to_string(),
            queue_removed,
        })
    }

    /// Change the queue limit for `ip`; the binding is left untouched
    pub async fn update_limit(&self, ip: &str, limit: &str) -> Result<SubscriberReport, OpError> {
        let router = self.registry.select(ip)?;
        let label = router.label();
        let device_rate = to_device_rate(limit);

        let mut session = router.lock().await?;

        let queue = resources::find_queue(&mut **session, ip)
            .await
            .map_err(|e| OpError::remote("look up queue", label, e))?
            .ok_or_else(|| OpError::NotLimited {
                ip: ip.to_string(),
                router: label.to_string(),
            })?;

        resources::set_queue_limit(&mut **session, &queue, &device_rate)
            .await
            .map_err(|e| OpError::remote("update limit", label, e))?;

        tracing::info!(
            "[Subscriber] Limit of {} on {} set to {}",
            ip,
            label,
            device_rate
        );

        drop(session);
        self.find_by_address(ip).await
    }

    /// System identity of both routers
    pub async fn identities(&self) -> IdentityReport {
        let mut entries = Vec::new();

        for router in self.registry.routers() {
            let identity = match router.lock().await {
                Ok(mut session) => match resources::system_identity(&mut **session).await {
                    Ok(Some(name)) => name,
                    Ok(None) => "Unknown".to_string(),
                    Err(e) => format!("Error: {}", e),
                },
                Err(e) => format!("Error: {}", e),
            };
            entries.push((router.label().to_string(), identity));
        }

        IdentityReport { entries }
    }
}

async fn scan_by_name(router: &Router, needle: &str) -> Result<Vec<SubscriberReport>, OpError> {
    let mut session = router.lock().await?;

    let bindings = resources::list_bindings(&mut **session)
        .await
        .map_err(|e| OpError::remote("list bindings", router.label(), e))?;

    let mut reports = Vec::new();
    for binding in bindings
        .into_iter()
        .filter(|b| b.comment.to_lowercase().contains(needle))
    {
        let max_limit = current_limit(&mut **session, &binding.address).await;
        reports.push(build_report(router, binding, max_limit));
    }
    Ok(reports)
}

async fn lookup_address(router: &Router, ip: &str) -> Result<Option<SubscriberReport>, OpError> {
    let mut session = router.lock().await?;

    let binding = resources::find_binding(&mut **session, ip)
        .await
        .map_err(|e| OpError::remote("look up binding", router.label(), e))?;

    match binding {
        Some(binding) => {
            let max_limit = current_limit(&mut **session, ip).await;
            Ok(Some(build_report(router, binding, max_limit)))
        }
        None => Ok(None),
    }
}

/// Formatted limit of the queue for `ip`; a missing or unreadable queue reads as no limit
async fn current_limit(session: &mut dyn AdminSession, ip: &str) -> Option<String> {
    match resources::find_queue(session, ip).await {
        Ok(queue) => queue.map(|q| format_rate(&q.max_limit)),
        Err(e) => {
            tracing::debug!("[Subscriber] Queue lookup for {} failed: {}", ip, e);
            None
        }
    }
}

fn build_report(router: &Router, binding: Binding, max_limit: Option<String>) -> SubscriberReport {
    SubscriberReport {
        router: router.label().to_string(),
        comment: binding.comment,
        address: binding.address,
        active: !binding.disabled,
        max_limit,
    }
}
