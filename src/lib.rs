//! Deterministic in-memory page runtime carrying two browser behaviors:
//! submit-time validation of the login/registration forms (`form_guard`) and
//! the cross-window configuration handshake of an embedded planner interface
//! (`bridge`).
//!
//! Pages are parsed from raw HTML into an arena DOM and driven through
//! explicit user actions (`type_text`, `set_checked`, `submit`, ...). Delays
//! run against a virtual clock, so the fixed settle timers of the embed
//! handshake execute deterministically via [`Page::advance_time`] instead of
//! real sleeps.

use std::error::Error as StdError;
use std::fmt;

mod bridge;
mod dom;
mod form_guard;
mod html;
mod message;
mod page;
mod selector;


pub use bridge::{
    BridgeState, ControlId, ControlSurface, EmbedBridge, SETTLE_DELAY_MS, apply_config,
};
pub use dom::{Dom, NodeId};
pub use form_guard::{
    LOGIN_FORM_ID, MSG_CONFIRM_REQUIRED, MSG_EMAIL_INVALID, MSG_EMAIL_REQUIRED,
    MSG_PASSWORD_MISMATCH, MSG_PASSWORD_REQUIRED, REGISTER_FORM_ID, install_form_guard,
    is_valid_email, switch_tab, validate_login, validate_registration,
};
pub use message::{
    CONFIG_MESSAGE_TYPE, ConfigMessage, READY_MESSAGE_TYPE, READY_STATUS, ReadinessNotice,
};
pub use page::{
    Embedding, EventState, MessageEvent, Page, PendingTimer, PostedMessage, WindowRef,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    ControlAccess(String),
    Runtime(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::ControlAccess(msg) => write!(f, "control access error: {msg}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}"
            ),
        }
    }
}

impl StdError for Error {}
