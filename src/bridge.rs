//! Embed-side half of the cross-window parameter handshake.
//!
//! The embedded page does not control the third-party document it lives in,
//! so controls are discovered by DOM shape: the first numeric-range input is
//! taken to be the day-count control, and checkboxes are matched to
//! preference labels through their parent element's text. Application is
//! deferred by a fixed settle delay because the embedded document exposes no
//! readiness signal; the delay is a heuristic, not a handshake.

use tracing::{debug, error, warn};

use crate::dom::NodeId;
use crate::message::{self, ReadinessNotice};
use crate::page::{MessageEvent, Page, TimerTask, WindowHandler};
use crate::selector;
use crate::{Error, Result};

/// Fixed delay granted to the embedded document's own initialization, both
/// before applying configuration and before announcing readiness.
pub const SETTLE_DELAY_MS: i64 = 2000;

/// Wildcard recipient for the readiness notice; the outbound contract has no
/// origin restriction.
const ANY_ORIGIN: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Synchronizing,
    Applying,
}

/// Bridge instance attached to an embedded page. Holds nothing but the
/// observable state; scheduled applies live on the page's timer queue and are
/// never cancelled or superseded.
#[derive(Debug, Clone)]
pub struct EmbedBridge {
    state: BridgeState,
}

impl EmbedBridge {
    /// Attaches the bridge to a page: listens for configuration messages and
    /// announces readiness after the page's `load` event.
    pub fn install(page: &mut Page) {
        page.bridge = Some(EmbedBridge {
            state: BridgeState::Idle,
        });
        page.add_window_listener("message", WindowHandler::BridgeMessage);
        page.add_window_listener("load", WindowHandler::BridgeAnnounce);
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    fn set_state(page: &mut Page, state: BridgeState) {
        if let Some(bridge) = &mut page.bridge {
            bridge.state = state;
        }
    }
}

/// Inbound message handling. Only messages sourced from the page's parent
/// window are considered; everything else is dropped without effect. A
/// matching configuration payload schedules an apply after the settle delay.
pub(crate) fn on_message(page: &mut Page, event: &MessageEvent) {
    if page.parent() != Some(event.source) {
        return;
    }
    debug!(data = %event.data, "received message from parent");

    let Some((days, preferences)) = message::config_from_value(&event.data) else {
        return;
    };
    EmbedBridge::set_state(page, BridgeState::Synchronizing);
    page.schedule(SETTLE_DELAY_MS, TimerTask::ApplyConfig { days, preferences });
}

pub(crate) fn on_load(page: &mut Page) {
    page.schedule(SETTLE_DELAY_MS, TimerTask::AnnounceReady);
}

/// Scheduled apply. The whole step is one fallible block: a control-access
/// failure is caught and logged here, abandoning the remaining mutations but
/// never propagating beyond the timer.
pub(crate) fn run_apply(page: &mut Page, days: i64, preferences: &[String]) {
    EmbedBridge::set_state(page, BridgeState::Applying);
    let mut controls = DocumentControls::new(page);
    if let Err(err) = apply_config(&mut controls, days, preferences) {
        error!(%err, "failed to apply configuration to embedded controls");
    }
    EmbedBridge::set_state(page, BridgeState::Idle);
}

pub(crate) fn run_announce(page: &mut Page) {
    debug!("announcing embedded interface ready");
    page.post_to_parent(ReadinessNotice::ready().to_value(), ANY_ORIGIN);
}

/// Handle for a control discovered on a [`ControlSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub usize);

/// Shape-based control discovery over the embedded document. The policy in
/// [`apply_config`] is written against this trait so it can be exercised
/// without a document.
pub trait ControlSurface {
    /// The first numeric-range input in document order, if any.
    fn first_range_control(&mut self) -> Option<ControlId>;
    /// Every checkbox input, in document order.
    fn checkboxes(&mut self) -> Vec<ControlId>;
    /// The visible label associated with a control (untrimmed).
    fn label_text(&mut self, control: ControlId) -> Result<String>;
    fn set_range_value(&mut self, control: ControlId, value: i64) -> Result<()>;
    fn set_checked(&mut self, control: ControlId, checked: bool) -> Result<()>;
    /// Notifies the embedded document's own logic that a control changed.
    fn dispatch_change(&mut self, control: ControlId) -> Result<()>;
}

/// Applies a received configuration to the discovered controls.
///
/// The day count goes to the first range control, with a change
/// notification; absence is logged and skipped. Checkboxes are all reset to
/// unchecked (silently), then each one whose trimmed label exactly equals a
/// preference entry is checked with a change notification. Matching is
/// case-sensitive whole-string equality. Either control kind may be absent
/// without affecting the other.
pub fn apply_config(
    surface: &mut dyn ControlSurface,
    days: i64,
    preferences: &[String],
) -> Result<()> {
    match surface.first_range_control() {
        Some(control) => {
            surface.set_range_value(control, days)?;
            surface.dispatch_change(control)?;
            debug!(days, "updated day-count control");
        }
        None => warn!("no day-count control present"),
    }

    let checkboxes = surface.checkboxes();
    if checkboxes.is_empty() {
        warn!("no preference checkboxes present");
        return Ok(());
    }
    debug!(count = checkboxes.len(), "found preference checkboxes");

    for control in &checkboxes {
        surface.set_checked(*control, false)?;
    }
    for control in checkboxes {
        let label = surface.label_text(control)?;
        let label = label.trim();
        if preferences.iter().any(|preference| preference == label) {
            surface.set_checked(control, true)?;
            surface.dispatch_change(control)?;
            debug!(label, "checked preference");
        }
    }
    Ok(())
}

/// [`ControlSurface`] backed by a page's DOM. Change notifications go through
/// the page's event dispatch so registered listeners observe them.
pub(crate) struct DocumentControls<'a> {
    page: &'a mut Page,
    nodes: Vec<NodeId>,
}

impl<'a> DocumentControls<'a> {
    pub(crate) fn new(page: &'a mut Page) -> Self {
        Self {
            page,
            nodes: Vec::new(),
        }
    }

    fn intern(&mut self, node: NodeId) -> ControlId {
        if let Some(idx) = self.nodes.iter().position(|existing| *existing == node) {
            return ControlId(idx);
        }
        self.nodes.push(node);
        ControlId(self.nodes.len() - 1)
    }

    fn resolve(&self, control: ControlId) -> Result<NodeId> {
        self.nodes
            .get(control.0)
            .copied()
            .ok_or_else(|| Error::ControlAccess(format!("unknown control handle {}", control.0)))
    }
}

impl ControlSurface for DocumentControls<'_> {
    fn first_range_control(&mut self) -> Option<ControlId> {
        let node = selector::query_all(self.page.dom(), "input[type='range']")
            .ok()?
            .into_iter()
            .next()?;
        Some(self.intern(node))
    }

    fn checkboxes(&mut self) -> Vec<ControlId> {
        let nodes =
            selector::query_all(self.page.dom(), "input[type='checkbox']").unwrap_or_default();
        nodes.into_iter().map(|node| self.intern(node)).collect()
    }

    fn label_text(&mut self, control: ControlId) -> Result<String> {
        let node = self.resolve(control)?;
        let parent = self
            .page
            .dom()
            .parent(node)
            .ok_or_else(|| Error::ControlAccess("checkbox has no parent element".to_string()))?;
        Ok(self.page.dom().text_content(parent))
    }

    fn set_range_value(&mut self, control: ControlId, value: i64) -> Result<()> {
        let node = self.resolve(control)?;
        if !self.page.dom_mut().set_value(node, &value.to_string()) {
            return Err(Error::ControlAccess(
                "range control is not an element".to_string(),
            ));
        }
        Ok(())
    }

    fn set_checked(&mut self, control: ControlId, checked: bool) -> Result<()> {
        let node = self.resolve(control)?;
        if !self.page.dom_mut().set_checked(node, checked) {
            return Err(Error::ControlAccess(
                "checkbox control is not an element".to_string(),
            ));
        }
        Ok(())
    }

    fn dispatch_change(&mut self, control: ControlId) -> Result<()> {
        let node = self.resolve(control)?;
        self.page.dispatch_event(node, "change");
        Ok(())
    }
}
