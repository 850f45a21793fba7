//! Scriptable in-memory backend.
//!
//! [`MemoryBackend`] holds an app tree and a system tree and lets a test
//! script how they change: reactions run when a gesture lands inside a given
//! element, and delayed mutations fire once the tokio clock passes their
//! deadline. Every gesture is recorded so tests can assert on exactly what
//! reached the "device".
//!
//! Delays use `tokio::time::Instant`, so tests running with a paused clock
//! (`#[tokio::test(start_paused = true)]`) advance through them instantly.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::backend::{AccessibilityBackend, BackendError, LaunchRequest};
use crate::descriptor::{Descriptor, Scope};
use crate::element::{kind, UIElement};

/// A 1x1 transparent PNG returned by [`MemoryBackend::screenshot`].
pub const BLANK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// A change applied to the simulated screen.
pub type Mutation = Box<dyn FnMut(&mut Screen) + Send>;

/// The two element layers of the simulated device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    pub app: Vec<UIElement>,
    pub system: Vec<UIElement>,
}

impl Screen {
    pub fn new(app: Vec<UIElement>, system: Vec<UIElement>) -> Self {
        Self { app, system }
    }

    pub fn roots(&self, scope: Scope) -> &[UIElement] {
        match scope {
            Scope::App => &self.app,
            Scope::System => &self.system,
        }
    }

    pub fn roots_mut(&mut self, scope: Scope) -> &mut Vec<UIElement> {
        match scope {
            Scope::App => &mut self.app,
            Scope::System => &mut self.system,
        }
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        descriptor.resolve(self.roots(descriptor.scope())).is_some()
    }

    /// Removes the element `descriptor` resolves to, with its subtree.
    pub fn remove(&mut self, descriptor: &Descriptor) -> Option<UIElement> {
        let path = self.locate(descriptor)?;
        remove_at(self.roots_mut(descriptor.scope()), &path)
    }

    /// Removes every element `descriptor` matches. Returns how many went.
    pub fn remove_all(&mut self, descriptor: &Descriptor) -> usize {
        let first = descriptor.clone().nth(0);
        let mut removed = 0;
        while self.remove(&first).is_some() {
            removed += 1;
        }
        removed
    }

    /// Applies `f` to the element `descriptor` resolves to.
    pub fn update(&mut self, descriptor: &Descriptor, f: impl FnOnce(&mut UIElement)) -> bool {
        let Some(path) = self.locate(descriptor) else {
            return false;
        };
        match node_mut(self.roots_mut(descriptor.scope()), &path) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    /// Appends `element` as the last child of the element `container` resolves to.
    pub fn insert_into(&mut self, container: &Descriptor, element: UIElement) -> bool {
        self.update(container, |parent| parent.children.push(element))
    }

    pub fn push_root(&mut self, scope: Scope, element: UIElement) {
        self.roots_mut(scope).push(element);
    }

    fn locate(&self, descriptor: &Descriptor) -> Option<Vec<usize>> {
        let roots = self.roots(descriptor.scope());
        let target = descriptor.resolve(roots)?;
        path_to(roots, target)
    }

    /// Topmost hittable element under a point, system layer first.
    fn hit(&self, x: i32, y: i32) -> Option<(Scope, Vec<usize>)> {
        [Scope::System, Scope::App]
            .into_iter()
            .find_map(|scope| hit_path(self.roots(scope), x, y).map(|path| (scope, path)))
    }
}

fn path_to(roots: &[UIElement], target: &UIElement) -> Option<Vec<usize>> {
    for (i, element) in roots.iter().enumerate() {
        if std::ptr::eq(element, target) {
            return Some(vec![i]);
        }
        if let Some(mut rest) = path_to(&element.children, target) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

fn node_mut<'a>(roots: &'a mut [UIElement], path: &[usize]) -> Option<&'a mut UIElement> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get_mut(*first)?;
    for &i in rest {
        node = node.children.get_mut(i)?;
    }
    Some(node)
}

fn remove_at(roots: &mut Vec<UIElement>, path: &[usize]) -> Option<UIElement> {
    let (last, parent_path) = path.split_last()?;
    let siblings = if parent_path.is_empty() {
        roots
    } else {
        &mut node_mut(roots, parent_path)?.children
    };
    (*last < siblings.len()).then(|| siblings.remove(*last))
}

// Later siblings are drawn on top, and children on top of their parent.
fn hit_path(roots: &[UIElement], x: i32, y: i32) -> Option<Vec<usize>> {
    for (i, element) in roots.iter().enumerate().rev() {
        if let Some(mut path) = hit_path(&element.children, x, y) {
            path.insert(0, i);
            return Some(path);
        }
        if element.is_hittable() && element.frame.map_or(false, |f| f.contains(x, y)) {
            return Some(vec![i]);
        }
    }
    None
}

/// A gesture that reached the simulated device.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    Tap { x: i32, y: i32 },
    DoubleTap { x: i32, y: i32 },
    LongPress { x: i32, y: i32, duration: Duration },
    Swipe { from: (i32, i32), to: (i32, i32) },
    TypeText(String),
    Launch(LaunchRequest),
    Terminate(String),
}

impl RecordedAction {
    /// Whether this is a touch or keyboard event rather than a lifecycle call.
    pub fn is_gesture(&self) -> bool {
        !matches!(self, RecordedAction::Launch(_) | RecordedAction::Terminate(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Tap,
    LongPress,
    Swipe,
}

struct Reaction {
    trigger: Trigger,
    target: Descriptor,
    mutation: Mutation,
}

struct Pending {
    due: Instant,
    mutation: Mutation,
}

#[derive(Default)]
struct State {
    screen: Screen,
    launch_screen: Option<Screen>,
    reactions: Vec<Reaction>,
    pending: Vec<Pending>,
    actions: Vec<RecordedAction>,
    focus: Option<(Scope, Vec<usize>)>,
    launched: Option<LaunchRequest>,
}

impl State {
    fn apply_due(&mut self) {
        let now = Instant::now();
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|p| p.due);
        for mut pending in due {
            (pending.mutation)(&mut self.screen);
        }
    }

    fn fire(&mut self, trigger: Trigger, x: i32, y: i32) {
        let Some((scope, hit)) = self.screen.hit(x, y) else {
            return;
        };
        if trigger == Trigger::Tap {
            let focusable = node_mut(self.screen.roots_mut(scope), &hit)
                .map_or(false, |node| node.is_type(kind::TEXT_FIELD));
            if focusable {
                self.focus = Some((scope, hit.clone()));
            }
        }

        // Decide against the tree as it was when the gesture landed.
        let matched: Vec<usize> = self
            .reactions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.trigger == trigger && r.target.scope() == scope)
            .filter(|(_, r)| {
                self.screen
                    .locate(&r.target)
                    .map_or(false, |path| hit.starts_with(&path))
            })
            .map(|(i, _)| i)
            .collect();
        for i in matched {
            (self.reactions[i].mutation)(&mut self.screen);
        }
    }

    fn type_into_focus(&mut self, text: &str) {
        let Some((scope, path)) = self.focus.clone() else {
            return;
        };
        let Some(node) = node_mut(self.screen.roots_mut(scope), &path) else {
            return;
        };
        let mut value = node.value.take().unwrap_or_default();
        for c in text.chars() {
            if c == '\u{8}' {
                value.pop();
            } else {
                value.push(c);
            }
        }
        node.value = Some(value);
    }
}

/// [`AccessibilityBackend`] over an in-memory, scriptable screen.
pub struct MemoryBackend {
    state: Mutex<State>,
    connected: AtomicBool,
    failing_snapshots: AtomicUsize,
    snapshots: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Screen::default())
    }
}

impl MemoryBackend {
    /// Creates a connected backend showing `screen`.
    pub fn new(screen: Screen) -> Self {
        Self {
            state: Mutex::new(State {
                screen,
                ..State::default()
            }),
            connected: AtomicBool::new(true),
            failing_snapshots: AtomicUsize::new(0),
            snapshots: AtomicUsize::new(0),
        }
    }

    /// Convenience for a screen with only app elements.
    pub fn with_app(app: Vec<UIElement>) -> Self {
        Self::new(Screen::new(app, Vec::new()))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_connected(&self) -> Result<(), BackendError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }

    /// Screen the app shows right after every launch.
    pub fn set_launch_screen(&self, screen: Screen) {
        self.state().launch_screen = Some(screen);
    }

    /// Replaces the whole screen.
    pub fn set_screen(&self, screen: Screen) {
        self.state().screen = screen;
    }

    /// A copy of the current screen, with due mutations applied.
    pub fn screen(&self) -> Screen {
        let mut state = self.state();
        state.apply_due();
        state.screen.clone()
    }

    /// Mutates the screen immediately.
    pub fn mutate(&self, f: impl FnOnce(&mut Screen)) {
        f(&mut self.state().screen);
    }

    /// Runs `mutation` once `delay` has elapsed on the tokio clock.
    pub fn after(&self, delay: Duration, mutation: impl FnMut(&mut Screen) + Send + 'static) {
        self.state().pending.push(Pending {
            due: Instant::now() + delay,
            mutation: Box::new(mutation),
        });
    }

    /// Runs `mutation` whenever a tap lands inside the element `target` resolves to.
    pub fn on_tap(&self, target: Descriptor, mutation: impl FnMut(&mut Screen) + Send + 'static) {
        self.react(Trigger::Tap, target, mutation);
    }

    /// Runs `mutation` whenever a long press lands inside `target`.
    pub fn on_long_press(&self, target: Descriptor, mutation: impl FnMut(&mut Screen) + Send + 'static) {
        self.react(Trigger::LongPress, target, mutation);
    }

    /// Runs `mutation` whenever a swipe starts inside `target`.
    pub fn on_swipe(&self, target: Descriptor, mutation: impl FnMut(&mut Screen) + Send + 'static) {
        self.react(Trigger::Swipe, target, mutation);
    }

    fn react(&self, trigger: Trigger, target: Descriptor, mutation: impl FnMut(&mut Screen) + Send + 'static) {
        self.state().reactions.push(Reaction {
            trigger,
            target,
            mutation: Box::new(mutation),
        });
    }

    /// Simulates the device going away. Every later call fails with
    /// [`BackendError::NotConnected`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Makes the next `count` snapshots fail with a transient error.
    pub fn fail_snapshots(&self, count: usize) {
        self.failing_snapshots.store(count, Ordering::SeqCst);
    }

    /// Number of snapshot requests served so far, failed ones included.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    /// Every recorded gesture and lifecycle call, oldest first.
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state().actions.clone()
    }

    /// Recorded touch and keyboard events only.
    pub fn gestures(&self) -> Vec<RecordedAction> {
        self.state()
            .actions
            .iter()
            .filter(|a| a.is_gesture())
            .cloned()
            .collect()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }

    /// The request of the most recent launch, if the app is running.
    pub fn launched(&self) -> Option<LaunchRequest> {
        self.state().launched.clone()
    }

    fn gesture(&self, action: RecordedAction, trigger: Option<(Trigger, i32, i32)>) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let mut state = self.state();
        state.apply_due();
        state.actions.push(action);
        if let Some((trigger, x, y)) = trigger {
            state.fire(trigger, x, y);
        }
        Ok(())
    }
}

#[async_trait]
impl AccessibilityBackend for MemoryBackend {
    async fn connect(&mut self) -> Result<(), BackendError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn snapshot(&self, scope: Scope) -> Result<Vec<UIElement>, BackendError> {
        self.ensure_connected()?;
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_snapshots.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_snapshots.store(failing - 1, Ordering::SeqCst);
            return Err(BackendError::CommandFailed("simulated snapshot failure".into()));
        }
        let mut state = self.state();
        state.apply_due();
        Ok(state.screen.roots(scope).to_vec())
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.gesture(RecordedAction::Tap { x, y }, Some((Trigger::Tap, x, y)))
    }

    async fn double_tap(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.gesture(RecordedAction::DoubleTap { x, y }, Some((Trigger::Tap, x, y)))
    }

    async fn long_press(&self, x: i32, y: i32, duration: Duration) -> Result<(), BackendError> {
        self.gesture(
            RecordedAction::LongPress { x, y, duration },
            Some((Trigger::LongPress, x, y)),
        )
    }

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        _duration: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.gesture(
            RecordedAction::Swipe { from, to },
            Some((Trigger::Swipe, from.0, from.1)),
        )
    }

    async fn type_text(&self, text: &str) -> Result<(), BackendError> {
        self.gesture(RecordedAction::TypeText(text.to_string()), None)?;
        self.state().type_into_focus(text);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BackendError> {
        self.ensure_connected()?;
        Ok(BLANK_PNG.to_vec())
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let mut state = self.state();
        state.actions.push(RecordedAction::Launch(request.clone()));
        state.launched = Some(request.clone());
        state.focus = None;
        if let Some(screen) = state.launch_screen.clone() {
            state.screen = screen;
        }
        Ok(())
    }

    async fn terminate(&self, bundle_id: &str) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let mut state = self.state();
        state.actions.push(RecordedAction::Terminate(bundle_id.to_string()));
        if state.launched.as_ref().map_or(false, |r| r.bundle_id == bundle_id) {
            state.launched = None;
            state.screen.app.clear();
            state.focus = None;
        }
        Ok(())
    }
}
