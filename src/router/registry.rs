//! Router registry
//!
//! Holds the two routers and their sessions. Built once at startup; a router
//! whose first connection fails keeps no session for the rest of the process.
//! There is no reconnect or health check: recovering a dropped router
//! requires a restart.

use tokio::sync::{Mutex, MutexGuard};

use crate::config::{RouterConfig, RoutersConfig};
use crate::error::OpError;
use crate::router::selector::{select_site, Site};
use crate::routeros::{self, AdminSession};

/// Exclusive access to one router's session
pub type SessionGuard<'a> = MutexGuard<'a, Box<dyn AdminSession>>;

/// One router: identity, address, and its session behind the serialization lock
pub struct Router {
    site: Site,
    label: String,
    address: String,
    session: Option<Mutex<Box<dyn AdminSession>>>,
}

impl Router {
    pub fn new(
        site: Site,
        label: impl Into<String>,
        address: impl Into<String>,
        session: Option<Box<dyn AdminSession>>,
    ) -> Self {
        Self {
            site,
            label: label.into(),
            address: address.into(),
            session: session.map(Mutex::new),
        }
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Acquire the router's lock
    ///
    /// Fails immediately with `RouterUnreachable` when the router never
    /// connected. The returned guard must be held for a whole call sequence
    /// and dropped before delegating to another operation on this router.
    pub async fn lock(&self) -> Result<SessionGuard<'_>, OpError> {
        match &self.session {
            Some(session) => Ok(session.lock().await),
            None => Err(OpError::RouterUnreachable {
                router: self.label.clone(),
            }),
        }
    }
}

/// The fixed pair of routers
pub struct RouterRegistry {
    primary: Router,
    secondary: Router,
}

impl RouterRegistry {
    pub fn new(primary: Router, secondary: Router) -> Self {
        Self { primary, secondary }
    }

    /// Connect to both routers concurrently
    ///
    /// Connection failures are logged and leave that router unreachable;
    /// they never abort startup.
    pub async fn connect(config: &RoutersConfig) -> Self {
        let (primary, secondary) = tokio::join!(
            open(Site::Primary, &config.primary),
            open(Site::Secondary, &config.secondary),
        );
        Self::new(primary, secondary)
    }

    pub fn get(&self, site: Site) -> &Router {
        match site {
            Site::Primary => &self.primary,
            Site::Secondary => &self.secondary,
        }
    }

    /// Both routers, primary first
    pub fn routers(&self) -> [&Router; 2] {
        [&self.primary, &self.secondary]
    }

    /// Route a subscriber address to its router
    pub fn select(&self, ip: &str) -> Result<&Router, OpError> {
        select_site(ip)
            .map(|site| self.get(site))
            .ok_or_else(|| OpError::AddressNotRecognized(ip.to_string()))
    }

    /// Close every open session
    ///
    /// A router whose lock is held by an in-flight operation is skipped; its
    /// connection is dropped when the process exits.
    pub async fn close_all(&self) {
        for router in self.routers() {
            let Some(session) = &router.session else {
                continue;
            };
            match session.try_lock() {
                Ok(mut guard) => match guard.close().await {
                    Ok(()) => tracing::info!("[Registry] Closed session to {}", router.label),
                    Err(e) => tracing::warn!(
                        "[Registry] Closing session to {} failed: {}",
                        router.label,
                        e
                    ),
                },
                Err(_) => tracing::warn!(
                    "[Registry] {} is busy, leaving its session to drop on exit",
                    router.label
                ),
            }
        }
    }
}

async fn open(site: Site, config: &RouterConfig) -> Router {
    let address = format!("{}:{}", config.host, config.port());

    let session: Option<Box<dyn AdminSession>> = match routeros::connect(config).await {
        Ok(session) => {
            tracing::info!(
                "[Registry] Connected to {} ({}) at {}",
                config.label,
                site.as_str(),
                address
            );
            Some(Box::new(session))
        }
        Err(e) => {
            tracing::warn!(
                "[Registry] Could not connect to {} at {}, it stays unreachable until restart: {}",
                config.label,
                address,
                e
            );
            None
        }
    };

    Router::new(site, config.label.clone(), address, session)
}
