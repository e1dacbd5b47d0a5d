use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::bridge::{self, BridgeState, EmbedBridge};
use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::message::ConfigMessage;
use crate::selector;
use crate::{Error, Result};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque window identity. The embed handshake accepts configuration only
/// from the window reference recorded as the page's parent; equality is
/// identity, never origin strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowRef(u64);

impl WindowRef {
    fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct EventState {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A cross-window message as seen by the receiving page.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub source: WindowRef,
    pub data: Value,
}

/// A message the page posted toward its parent window.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub data: Value,
    pub target_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeHandler {
    GuardLogin,
    GuardRegistration,
    ClearOwnError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WindowHandler {
    BridgeMessage,
    BridgeAnnounce,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimerTask {
    ApplyConfig { days: i64, preferences: Vec<String> },
    AnnounceReady,
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    task: TimerTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
}

/// Per-document runtime: arena DOM, event listeners, a virtual clock, and a
/// message inbox/outbox. All suspension is timer-based against the virtual
/// clock; nothing here ever sleeps.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    window: WindowRef,
    parent: Option<WindowRef>,
    node_listeners: HashMap<NodeId, Vec<(String, NodeHandler)>>,
    window_listeners: Vec<(String, WindowHandler)>,
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    next_timer_id: i64,
    next_task_order: i64,
    outbox: Vec<PostedMessage>,
    pub(crate) bridge: Option<EmbedBridge>,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            window: WindowRef::next(),
            parent: None,
            node_listeners: HashMap::new(),
            window_listeners: Vec::new(),
            task_queue: Vec::new(),
            now_ms: 0,
            next_timer_id: 1,
            next_task_order: 0,
            outbox: Vec::new(),
            bridge: None,
        })
    }

    pub fn window_ref(&self) -> WindowRef {
        self.window
    }

    pub fn parent(&self) -> Option<WindowRef> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: WindowRef) {
        self.parent = Some(parent);
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        selector::query_one(&self.dom, selector)
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        selector::query_all(&self.dom, selector)
    }

    // --- listener registration -------------------------------------------

    pub(crate) fn add_node_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        handler: NodeHandler,
    ) {
        self.node_listeners
            .entry(node)
            .or_default()
            .push((event_type.to_string(), handler));
    }

    pub(crate) fn add_window_listener(&mut self, event_type: &str, handler: WindowHandler) {
        self.window_listeners
            .push((event_type.to_string(), handler));
    }

    // --- user actions -----------------------------------------------------

    /// Sets an input's value and fires `input`, like a user typing.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default().to_string();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".to_string(),
                actual: non_element_label(tag),
            });
        }
        self.dom.set_value(target, text);
        self.dispatch_event(target, "input");
        Ok(())
    }

    /// Sets a checkbox or radio input and fires `input` then `change`.
    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default().to_string();
        let input_type = self
            .dom
            .attr(target, "type")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" || !(input_type == "checkbox" || input_type == "radio") {
            let actual = if tag == "input" {
                format!("input[type='{input_type}']")
            } else {
                non_element_label(tag)
            };
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "checkbox or radio input".to_string(),
                actual,
            });
        }
        self.dom.set_checked(target, checked);
        self.dispatch_event(target, "input");
        self.dispatch_event(target, "change");
        Ok(())
    }

    /// Dispatches `submit` on a form and reports whether the default submit
    /// action would proceed (no listener called `prevent_default`).
    pub fn submit(&mut self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        let tag = self.dom.tag_name(target).unwrap_or_default().to_string();
        if tag != "form" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form".to_string(),
                actual: non_element_label(tag),
            });
        }
        let event = self.dispatch_event(target, "submit");
        Ok(!event.default_prevented())
    }

    /// Fires the window `load` event.
    pub fn fire_load(&mut self) {
        let handlers = self.window_handlers_for("load");
        for handler in handlers {
            self.invoke_window_handler(&handler, None);
        }
    }

    /// Delivers a cross-window message to this page's `message` listeners.
    pub fn deliver_message(&mut self, event: MessageEvent) {
        debug!(source = ?event.source, "delivering window message");
        let handlers = self.window_handlers_for("message");
        for handler in handlers {
            self.invoke_window_handler(&handler, Some(&event));
        }
    }

    // --- event dispatch ---------------------------------------------------

    /// Dispatches an event on the target, then bubbles through its ancestors.
    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> EventState {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        for node in path {
            event.current_target = node;
            let handlers: Vec<NodeHandler> = self
                .node_listeners
                .get(&node)
                .map(|listeners| {
                    listeners
                        .iter()
                        .filter(|(registered, _)| registered == event_type)
                        .map(|(_, handler)| handler.clone())
                        .collect()
                })
                .unwrap_or_default();
            for handler in handlers {
                self.invoke_node_handler(&handler, &mut event);
            }
        }

        event
    }

    fn invoke_node_handler(&mut self, handler: &NodeHandler, event: &mut EventState) {
        match handler {
            NodeHandler::GuardLogin => crate::form_guard::validate_login(&mut self.dom, event),
            NodeHandler::GuardRegistration => {
                crate::form_guard::validate_registration(&mut self.dom, event);
            }
            NodeHandler::ClearOwnError => {
                crate::form_guard::clear_own_error(&mut self.dom, event);
            }
        }
    }

    fn window_handlers_for(&self, event_type: &str) -> Vec<WindowHandler> {
        self.window_listeners
            .iter()
            .filter(|(registered, _)| registered == event_type)
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    fn invoke_window_handler(&mut self, handler: &WindowHandler, event: Option<&MessageEvent>) {
        match handler {
            WindowHandler::BridgeMessage => {
                if let Some(event) = event {
                    bridge::on_message(self, event);
                }
            }
            WindowHandler::BridgeAnnounce => bridge::on_load(self),
        }
    }

    // --- virtual clock ----------------------------------------------------

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn schedule(&mut self, delay_ms: i64, task: TimerTask) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms);
        debug!(id, due_at, "scheduling timer task");
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            task,
        });
        id
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    /// Moves the clock forward and runs every task that came due, in
    /// `(due_at, order)` order.
    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".to_string(),
            ));
        }
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        self.run_due_timers();
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        self.now_ms = target_ms;
        self.run_due_timers();
        Ok(())
    }

    /// Runs every pending task regardless of due time, advancing the clock to
    /// each task's deadline. Returns how many tasks ran.
    pub fn flush(&mut self) -> usize {
        let mut ran = 0;
        while let Some(idx) = self.next_task_index(None) {
            let task = self.task_queue.remove(idx);
            if task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            ran += 1;
            self.execute_timer_task(task);
        }
        ran
    }

    fn run_due_timers(&mut self) -> usize {
        let mut ran = 0;
        while let Some(idx) = self.next_task_index(Some(self.now_ms)) {
            let task = self.task_queue.remove(idx);
            ran += 1;
            self.execute_timer_task(task);
        }
        ran
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) {
        debug!(id = task.id, due_at = task.due_at, "running timer task");
        match task.task {
            TimerTask::ApplyConfig { days, preferences } => {
                bridge::run_apply(self, days, &preferences);
            }
            TimerTask::AnnounceReady => bridge::run_announce(self),
        }
    }

    // --- messaging --------------------------------------------------------

    pub(crate) fn post_to_parent(&mut self, data: Value, target_origin: &str) {
        debug!(%data, target_origin, "posting message to parent");
        self.outbox.push(PostedMessage {
            data,
            target_origin: target_origin.to_string(),
        });
    }

    /// Messages posted toward the parent window, oldest first.
    pub fn posted(&self) -> &[PostedMessage] {
        &self.outbox
    }

    pub fn take_posted(&mut self) -> Vec<PostedMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn bridge_state(&self) -> Option<BridgeState> {
        self.bridge.as_ref().map(EmbedBridge::state)
    }

    // --- assertions -------------------------------------------------------

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.text_content(node);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.value(node).unwrap_or_default().to_string();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.checked(node).unwrap_or(false);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Asserts the inline `display` style; an element without one reports the
    /// empty string.
    pub fn assert_display(&self, selector: &str, expected: &str) -> Result<()> {
        let node = self.select_one(selector)?;
        let actual = self.dom.style(node, "display").unwrap_or_default().to_string();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    pub fn has_class(&self, selector: &str, class: &str) -> Result<bool> {
        let node = self.select_one(selector)?;
        Ok(self.dom.has_class(node, class))
    }
}

fn non_element_label(tag: String) -> String {
    if tag.is_empty() {
        "non-element".to_string()
    } else {
        tag
    }
}

/// A host page with one embedded page, wired so the embedded side sees the
/// host as its parent window. Routes configuration posts downward and drains
/// readiness notices upward.
pub struct Embedding {
    host: Page,
    embedded: Page,
}

impl Embedding {
    pub fn new(host: Page, mut embedded: Page) -> Self {
        embedded.set_parent(host.window_ref());
        Self { host, embedded }
    }

    pub fn host(&self) -> &Page {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Page {
        &mut self.host
    }

    pub fn embedded(&self) -> &Page {
        &self.embedded
    }

    pub fn embedded_mut(&mut self) -> &mut Page {
        &mut self.embedded
    }

    /// Posts a configuration message into the embedded page, sourced from the
    /// host window.
    pub fn post_config(&mut self, message: &ConfigMessage) {
        let event = MessageEvent {
            source: self.host.window_ref(),
            data: message.to_value(),
        };
        self.embedded.deliver_message(event);
    }

    /// Moves everything the embedded page posted toward its parent into the
    /// host's message listeners, returning the drained messages.
    pub fn relay_to_host(&mut self) -> Vec<PostedMessage> {
        let posted = self.embedded.take_posted();
        let source = self.embedded.window_ref();
        for message in &posted {
            self.host.deliver_message(MessageEvent {
                source,
                data: message.data.clone(),
            });
        }
        posted
    }
}
