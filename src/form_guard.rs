//! Submit-time validation for the login and registration forms, plus the
//! surrounding page plumbing: live error clearing, tab switching, and the
//! one-shot listener installation pass.
//!
//! Validation is purely presentational. A failing check shows a message in
//! the field's error slot and prevents the default submit action; nothing is
//! thrown and nothing is returned to the caller. Every independent field
//! check runs unconditionally so each invalid field reports its own error in
//! the same pass.

use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::dom::Dom;
use crate::page::{EventState, NodeHandler, Page};
use crate::selector;
use crate::Result;

pub const LOGIN_FORM_ID: &str = "login-form";
pub const REGISTER_FORM_ID: &str = "register-form";

pub const MSG_EMAIL_REQUIRED: &str = "Email address is required.";
pub const MSG_EMAIL_INVALID: &str = "Please enter a valid email address.";
pub const MSG_PASSWORD_REQUIRED: &str = "Password is required.";
pub const MSG_CONFIRM_REQUIRED: &str = "Please confirm your password.";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match.";

/// Error slots are keyed by naming convention: the field id plus this suffix.
const ERROR_SLOT_SUFFIX: &str = "-error";

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

pub fn is_valid_email(input: &str) -> bool {
    email_pattern().is_some_and(|pattern| pattern.is_match(input).unwrap_or(false))
}

/// Registers the form guards on whichever of the two forms exist, hooks live
/// error clearing onto every input, and tags each form with the entrance
/// animation class.
pub fn install_form_guard(page: &mut Page) -> Result<()> {
    if let Some(form) = page.dom().element_by_id(LOGIN_FORM_ID) {
        page.add_node_listener(form, "submit", NodeHandler::GuardLogin);
    }
    if let Some(form) = page.dom().element_by_id(REGISTER_FORM_ID) {
        page.add_node_listener(form, "submit", NodeHandler::GuardRegistration);
    }
    for input in page.select_all("input")? {
        page.add_node_listener(input, "input", NodeHandler::ClearOwnError);
    }
    for form in page.select_all("form")? {
        page.dom_mut().add_class(form, "fade-in");
    }
    Ok(())
}

pub fn validate_login(dom: &mut Dom, event: &mut EventState) {
    let email = field_value(dom, "email");
    let password = field_value(dom, "password");
    let mut valid = true;

    if email.is_empty() {
        show_error(dom, "email-error", MSG_EMAIL_REQUIRED);
        valid = false;
    } else if !is_valid_email(&email) {
        show_error(dom, "email-error", MSG_EMAIL_INVALID);
        valid = false;
    } else {
        hide_error(dom, "email-error");
    }

    if password.is_empty() {
        show_error(dom, "password-error", MSG_PASSWORD_REQUIRED);
        valid = false;
    } else {
        hide_error(dom, "password-error");
    }

    if !valid {
        event.prevent_default();
    }
}

pub fn validate_registration(dom: &mut Dom, event: &mut EventState) {
    let email = field_value(dom, "reg-email");
    let password = field_value(dom, "reg-password");
    let confirmation = field_value(dom, "reg-confirm-password");
    let mut valid = true;

    if email.is_empty() {
        show_error(dom, "reg-email-error", MSG_EMAIL_REQUIRED);
        valid = false;
    } else if !is_valid_email(&email) {
        show_error(dom, "reg-email-error", MSG_EMAIL_INVALID);
        valid = false;
    } else {
        hide_error(dom, "reg-email-error");
    }

    if password.is_empty() {
        show_error(dom, "reg-password-error", MSG_PASSWORD_REQUIRED);
        valid = false;
    } else {
        hide_error(dom, "reg-password-error");
    }

    if confirmation.is_empty() {
        show_error(dom, "reg-confirm-password-error", MSG_CONFIRM_REQUIRED);
        valid = false;
    } else if password != confirmation {
        // Byte equality, no normalization.
        show_error(dom, "reg-confirm-password-error", MSG_PASSWORD_MISMATCH);
        valid = false;
    } else {
        hide_error(dom, "reg-confirm-password-error");
    }

    if !valid {
        event.prevent_default();
    }
}

/// Any edit to an input hides that input's own error slot, whatever the new
/// value is. Re-validation only happens on the next submit.
pub(crate) fn clear_own_error(dom: &mut Dom, event: &mut EventState) {
    let slot_id = dom
        .attr(event.target(), "id")
        .map(|field_id| format!("{field_id}{ERROR_SLOT_SUFFIX}"));
    if let Some(slot_id) = slot_id {
        hide_error(dom, &slot_id);
    }
}

/// Moves the `active` class to the named tab's panel and to every tab link
/// whose text mentions the tab name, case-insensitively.
pub fn switch_tab(dom: &mut Dom, tab: &str) -> Result<()> {
    for node in selector::query_all(dom, ".tab-content")? {
        dom.remove_class(node, "active");
    }
    for node in selector::query_all(dom, ".tab-link")? {
        dom.remove_class(node, "active");
    }

    if let Some(panel) = dom.element_by_id(&format!("{tab}-tab")) {
        dom.add_class(panel, "active");
    }

    let wanted = tab.to_lowercase();
    for node in selector::query_all(dom, ".tab-link")? {
        if dom.text_content(node).to_lowercase().contains(&wanted) {
            dom.add_class(node, "active");
        }
    }
    Ok(())
}

fn field_value(dom: &Dom, field_id: &str) -> String {
    dom.element_by_id(field_id)
        .and_then(|node| dom.value(node))
        .unwrap_or_default()
        .to_string()
}

fn show_error(dom: &mut Dom, slot_id: &str, message: &str) {
    if let Some(node) = dom.element_by_id(slot_id) {
        dom.set_text_content(node, message);
        dom.set_style(node, "display", "block");
    }
}

/// Hides the slot without clearing its text.
fn hide_error(dom: &mut Dom, slot_id: &str) {
    if let Some(node) = dom.element_by_id(slot_id) {
        dom.set_style(node, "display", "none");
    }
}
