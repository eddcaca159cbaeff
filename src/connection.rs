// Obtaining an authenticated session: restore from the cache when the
// cached cookies still work, otherwise prompt and log in.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::platform::{Connector, Platform};
use crate::session::{Session, SessionStore};

/// A live platform client together with the store its cookies go back to.
///
/// Every remote call made through [`Connection::call`] persists the
/// session afterwards, whether the call succeeded or not.
pub struct Connection<P> {
    platform: P,
    session: Session,
    store: SessionStore,
}

impl<P: Platform> Connection<P> {
    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one remote operation, then persist the (possibly rotated) cookies.
    pub fn call<T>(&mut self, op: impl FnOnce(&P) -> Result<T>) -> Result<T> {
        let result = op(&self.platform);
        self.persist();
        result
    }

    /// Capture the client's current cookies and write them to the store.
    /// Failures are logged; a command never fails because of the cache.
    pub fn persist(&mut self) {
        self.session.cookies = self.platform.cookies();
        if let Err(e) = self.store.save(&self.session) {
            warn!(error = %e, "could not cache session");
        }
    }
}

/// Restore a cached session or log in interactively.
///
/// Returns an error only when the interactive login fails; callers treat
/// that as fatal.
pub fn obtain_session<C: Connector>(
    store: &SessionStore,
    base_url: &str,
    connector: &mut C,
) -> Result<Connection<C::Platform>> {
    if let Some(cached) = store.load(base_url) {
        if let Some(conn) = restore(store, cached, connector)? {
            return Ok(conn);
        }
        if let Err(e) = store.clear() {
            warn!(error = %e, "could not clear stale session cache");
        }
    }

    let credentials = connector.credentials()?;
    let mut session = Session::new(base_url);
    let platform = connector.connect(&session)?;
    platform
        .login(&credentials)
        .with_context(|| format!("login as {} failed", credentials.email))?;

    session.live = true;
    info!(email = %credentials.email, "logged in");
    let mut conn = Connection {
        platform,
        session,
        store: store.clone(),
    };
    conn.persist();
    Ok(conn)
}

fn restore<C: Connector>(
    store: &SessionStore,
    mut session: Session,
    connector: &mut C,
) -> Result<Option<Connection<C::Platform>>> {
    let platform = connector.connect(&session)?;
    match platform.probe() {
        Ok(true) => {
            debug!("cached session is live");
            session.live = true;
            let mut conn = Connection {
                platform,
                session,
                store: store.clone(),
            };
            conn.persist();
            Ok(Some(conn))
        }
        Ok(false) => {
            info!("cached session expired");
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "could not validate cached session");
            Ok(None)
        }
    }
}
