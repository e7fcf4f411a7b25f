/*
[INPUT]:  Session state, loading toggles and flow errors
[OUTPUT]: Visibility, loading, profile and error-banner updates
[POS]:    UI boundary - what the flow asks of the page
[UPDATE]: When controls or banner behaviour change
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use crate::types::{SessionState, WalletKind};

/// A triggering control on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    SignIn(WalletKind),
    SignOut,
}

/// Profile panel contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub user_id: String,
    pub email: String,
    pub wallet_address: String,
}

impl ProfileView {
    pub fn from_state(state: &SessionState) -> Option<Self> {
        match state {
            SessionState::Authenticated {
                user_id,
                email,
                wallet_address,
            } => Some(Self {
                user_id: user_id.clone(),
                email: email.clone().unwrap_or_else(|| "No email".to_string()),
                wallet_address: wallet_address
                    .clone()
                    .unwrap_or_else(|| "No wallet address".to_string()),
            }),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Page elements the flow drives
pub trait UiReflector: Send + Sync {
    /// Loading state also disables the control
    fn set_loading(&self, control: Control, loading: bool);

    fn set_control_visible(&self, control: Control, visible: bool);

    /// `None` hides the profile panel
    fn show_profile(&self, profile: Option<&ProfileView>);

    fn show_error(&self, message: &str);

    fn hide_error(&self);
}

/// Bring the page in line with `state`
pub fn reflect(ui: &dyn UiReflector, state: &SessionState, kinds: &[WalletKind]) {
    let authenticated = state.is_authenticated();
    for kind in kinds {
        ui.set_control_visible(Control::SignIn(*kind), !authenticated);
    }
    ui.set_control_visible(Control::SignOut, authenticated);
    ui.show_profile(ProfileView::from_state(state).as_ref());
}

/// Error banner with optional auto-dismiss
///
/// A newer error restarts the dismiss timer; an older timer never hides
/// a newer message.
#[derive(Clone)]
pub struct ErrorBanner {
    ui: Arc<dyn UiReflector>,
    dismiss_after: Option<Duration>,
    generation: Arc<AtomicU64>,
}

impl ErrorBanner {
    pub fn new(ui: Arc<dyn UiReflector>, dismiss_after: Option<Duration>) -> Self {
        Self {
            ui,
            dismiss_after,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Show `message`; outside a tokio runtime it stays until replaced
    pub fn show(&self, message: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ui.show_error(&format!("Error: {message}"));

        let Some(delay) = self.dismiss_after else {
            return;
        };
        match Handle::try_current() {
            Ok(runtime) => {
                let ui = self.ui.clone();
                let current = self.generation.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if current.load(Ordering::SeqCst) == generation {
                        ui.hide_error();
                    }
                });
            }
            Err(_) => debug!("no runtime, error banner will not auto-dismiss"),
        }
    }

    pub fn hide(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.ui.hide_error();
    }
}

/// One call made on a [`RecordingReflector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Loading(Control, bool),
    Visible(Control, bool),
    Profile(Option<ProfileView>),
    Error(String),
    ErrorHidden,
}

/// Reflector that records every update, for tests and headless hosts
#[derive(Debug, Default)]
pub struct RecordingReflector {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingReflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest visibility set for `control`
    pub fn is_visible(&self, control: Control) -> Option<bool> {
        self.events().iter().rev().find_map(|event| match event {
            UiEvent::Visible(target, visible) if *target == control => Some(*visible),
            _ => None,
        })
    }

    /// Latest loading state set for `control`
    pub fn is_loading(&self, control: Control) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::Loading(target, loading) if *target == control => Some(*loading),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Banner text if the banner is currently shown
    pub fn current_error(&self) -> Option<String> {
        self.events().iter().rev().find_map(|event| match event {
            UiEvent::Error(message) => Some(Some(message.clone())),
            UiEvent::ErrorHidden => Some(None),
            _ => None,
        })?
    }

    pub fn current_profile(&self) -> Option<ProfileView> {
        self.events().iter().rev().find_map(|event| match event {
            UiEvent::Profile(profile) => Some(profile.clone()),
            _ => None,
        })?
    }

    fn push(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl UiReflector for RecordingReflector {
    fn set_loading(&self, control: Control, loading: bool) {
        self.push(UiEvent::Loading(control, loading));
    }

    fn set_control_visible(&self, control: Control, visible: bool) {
        self.push(UiEvent::Visible(control, visible));
    }

    fn show_profile(&self, profile: Option<&ProfileView>) {
        self.push(UiEvent::Profile(profile.cloned()));
    }

    fn show_error(&self, message: &str) {
        self.push(UiEvent::Error(message.to_string()));
    }

    fn hide_error(&self) {
        self.push(UiEvent::ErrorHidden);
    }
}
