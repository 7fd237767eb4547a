//! Authentication state and the pairing coordinator.
//!
//! One [`AuthHandle`] exists per process. The coordinator mutates it while
//! driving the session through pairing (QR or phone code), connect and
//! logout; protocol events (`Connected` / `LoggedOut`) and the HTTP layer
//! override it. Readers get a consistent snapshot: a QR or pair code is
//! present exactly while the matching `waiting_for_*` status is.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use wabridge_proto::{PairClientKind, QrEvent};

use crate::api::AppState;

/// The pair code stays valid for roughly five minutes; poll the device store
/// until then.
const PAIR_POLL_ATTEMPTS: u32 = 60;
const PAIR_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Initializing,
    WaitingForQr,
    WaitingForPair,
    Connecting,
    Connected,
    LoggedOut,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthView {
    pub status: AuthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_code: Option<String>,
}

impl AuthView {
    pub fn connected() -> Self {
        Self {
            status: AuthStatus::Connected,
            qr_code: None,
            pair_code: None,
        }
    }
}

/// Process-wide auth state under a reader/writer lock.
pub struct AuthHandle {
    view: RwLock<AuthView>,
}

impl AuthHandle {
    pub fn new() -> Self {
        Self {
            view: RwLock::new(AuthView {
                status: AuthStatus::Initializing,
                qr_code: None,
                pair_code: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> AuthView {
        self.view.read().await.clone()
    }

    /// Enter a status that carries no pairing code; both codes are cleared.
    pub async fn set_status(&self, status: AuthStatus) {
        let mut view = self.view.write().await;
        view.status = status;
        view.qr_code = None;
        view.pair_code = None;
    }

    pub async fn set_waiting_for_qr(&self, code: String) {
        let mut view = self.view.write().await;
        view.status = AuthStatus::WaitingForQr;
        view.qr_code = Some(code);
        view.pair_code = None;
    }

    pub async fn set_waiting_for_pair(&self, code: String) {
        let mut view = self.view.write().await;
        view.status = AuthStatus::WaitingForPair;
        view.pair_code = Some(code);
        view.qr_code = None;
    }
}

impl Default for AuthHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive authentication once at startup: reconnect a stored identity, start
/// phone-code pairing when `PAIR_PHONE` is set, otherwise hand off to the
/// QR flow behind the web UI.
pub async fn authenticate_on_startup(state: &AppState) {
    if state.client.device_id().is_some() {
        state.auth.set_status(AuthStatus::Connecting).await;
        match state.client.connect().await {
            Ok(()) => {
                info!("connected with stored identity");
                state.auth.set_status(AuthStatus::Connected).await;
            }
            Err(e) => {
                error!(error = %e, "failed to connect");
                state.auth.set_status(AuthStatus::Error).await;
            }
        }
        return;
    }

    match state.config.pair_phone.clone() {
        Some(phone) => pair_with_phone(state, &phone).await,
        None => {
            info!("no existing session; open the web UI to scan the QR code");
            tokio::spawn(start_qr_auth(state.clone()));
        }
    }
}

/// Phone-code pairing: request a code, publish it, then poll the device
/// store until the primary device links or the code expires.
async fn pair_with_phone(state: &AppState, phone: &str) {
    state.auth.set_status(AuthStatus::Connecting).await;

    if let Err(e) = state.client.connect().await {
        error!(error = %e, "failed to connect for pairing");
        state.auth.set_status(AuthStatus::Error).await;
        return;
    }

    let code = match state
        .client
        .pair_phone(phone, true, PairClientKind::Chrome, "Chrome (Linux)")
        .await
    {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "failed to get pair code");
            state.auth.set_status(AuthStatus::Error).await;
            return;
        }
    };

    info!(code = %code, "pair code issued; enter it on your phone or open the web UI");
    state.auth.set_waiting_for_pair(code).await;

    for _ in 0..PAIR_POLL_ATTEMPTS {
        if state.client.device_id().is_some() {
            state.auth.set_status(AuthStatus::Connected).await;
            return;
        }
        tokio::time::sleep(PAIR_POLL_INTERVAL).await;
    }

    warn!("pair code expired without a link");
    state.auth.set_status(AuthStatus::Error).await;
}

/// Fresh QR pairing: discard the stored device identity and publish rotating
/// QR codes until the server reports success or timeout.
///
/// The loop ends at the first terminal event; re-pairing after that takes a
/// new `POST /api/auth/start`.
pub async fn start_qr_auth(state: AppState) {
    state.client.disconnect().await;
    if let Err(e) = state.client.reset_device().await {
        error!(error = %e, "failed to reset device store");
        state.auth.set_status(AuthStatus::Error).await;
        return;
    }

    state.auth.set_status(AuthStatus::Connecting).await;

    let mut qr = match state.client.qr_channel().await {
        Ok(rx) => rx,
        Err(e) => {
            error!(error = %e, "failed to open QR channel");
            state.auth.set_status(AuthStatus::Error).await;
            return;
        }
    };

    if let Err(e) = state.client.connect().await {
        error!(error = %e, "failed to connect for QR auth");
        state.auth.set_status(AuthStatus::Error).await;
        return;
    }

    while let Some(event) = qr.recv().await {
        match event {
            QrEvent::Code(code) => {
                info!("new QR code generated, waiting for scan");
                state.auth.set_waiting_for_qr(code).await;
            }
            QrEvent::Success => {
                info!("QR auth successful");
                state.auth.set_status(AuthStatus::Connected).await;
                return;
            }
            QrEvent::Timeout => {
                warn!("QR auth timed out");
                state.auth.set_status(AuthStatus::LoggedOut).await;
                return;
            }
        }
    }
}
