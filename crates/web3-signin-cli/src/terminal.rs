/*
[INPUT]:  Loading toggles, session profile and flow errors from the sign-in context
[OUTPUT]: Styled terminal lines
[POS]:    CLI output - UiReflector for a terminal host
[UPDATE]: When UI updates or their wording change
*/

use std::sync::{Mutex, PoisonError};

use console::{Term, style};
use tracing::{debug, warn};
use web3_signin_adapter::{Control, ProfileView, UiReflector};

/// Prints flow progress to the terminal instead of toggling page elements
pub struct TerminalReflector {
    out: Term,
    err: Term,
    last_profile: Mutex<Option<Option<ProfileView>>>,
}

impl Default for TerminalReflector {
    fn default() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            last_profile: Mutex::new(None),
        }
    }
}

impl TerminalReflector {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(term: &Term, line: &str) {
        if let Err(err) = term.write_line(line) {
            warn!(error = %err, "failed to write to terminal");
        }
    }
}

pub fn control_label(control: Control) -> String {
    match control {
        Control::SignIn(kind) => format!("Sign in with {kind}"),
        Control::SignOut => "Sign out".to_string(),
    }
}

pub fn profile_lines(profile: &ProfileView) -> Vec<String> {
    vec![
        format!("  user:   {}", profile.user_id),
        format!("  email:  {}", profile.email),
        format!("  wallet: {}", profile.wallet_address),
    ]
}

impl UiReflector for TerminalReflector {
    fn set_loading(&self, control: Control, loading: bool) {
        if loading {
            let line = format!("{}...", control_label(control));
            Self::write(&self.out, &style(line).dim().to_string());
        }
    }

    fn set_control_visible(&self, control: Control, visible: bool) {
        debug!(control = %control_label(control), visible, "control visibility");
    }

    fn show_profile(&self, profile: Option<&ProfileView>) {
        {
            let mut last = self
                .last_profile
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let current = profile.cloned();
            if last.as_ref() == Some(&current) {
                return;
            }
            *last = Some(current);
        }

        match profile {
            Some(profile) => {
                Self::write(&self.out, &style("Signed in").bold().green().to_string());
                for line in profile_lines(profile) {
                    Self::write(&self.out, &line);
                }
            }
            None => Self::write(&self.out, &style("Signed out").yellow().to_string()),
        }
    }

    fn show_error(&self, message: &str) {
        Self::write(&self.err, &style(message).bold().red().to_string());
    }

    fn hide_error(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use web3_signin_adapter::WalletKind;

    #[test]
    fn test_control_labels() {
        assert_eq!(
            control_label(Control::SignIn(WalletKind::Solana)),
            "Sign in with Solana"
        );
        assert_eq!(control_label(Control::SignOut), "Sign out");
    }

    #[test]
    fn test_profile_lines_show_placeholders() {
        let profile = ProfileView {
            user_id: "user-1".to_string(),
            email: "No email".to_string(),
            wallet_address: "0xabc".to_string(),
        };
        let lines = profile_lines(&profile);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("No email"));
        assert!(lines[2].ends_with("0xabc"));
    }
}
