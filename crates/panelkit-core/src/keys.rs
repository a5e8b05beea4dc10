// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::action::{Action, Payload, payload};
use crate::navigation::NavigationStack;

/// Terminal-independent key event. Frontends translate their native events
/// into this before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Esc,
    Enter,
    Tab,
    BackTab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Char(char),
    Ctrl(char),
    Other,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esc => f.write_str("esc"),
            Self::Enter => f.write_str("enter"),
            Self::Tab => f.write_str("tab"),
            Self::BackTab => f.write_str("shift+tab"),
            Self::Backspace => f.write_str("backspace"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::Home => f.write_str("home"),
            Self::End => f.write_str("end"),
            Self::PageUp => f.write_str("pgup"),
            Self::PageDown => f.write_str("pgdn"),
            Self::Char(ch) => write!(f, "{ch}"),
            Self::Ctrl(ch) => write!(f, "ctrl+{ch}"),
            Self::Other => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: String,
    pub description: String,
}

pub type KeyHandler = Box<dyn FnMut()>;

/// Defaults applied to registered keys nobody else handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    Refresh,
    OpenFilter,
    ToggleHelp,
}

impl BuiltIn {
    pub const ALL: [Self; 3] = [Self::Refresh, Self::OpenFilter, Self::ToggleHelp];

    pub fn for_key(key: &str) -> Option<Self> {
        match key {
            "R" => Some(Self::Refresh),
            "/" => Some(Self::OpenFilter),
            "?" => Some(Self::ToggleHelp),
            _ => None,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Refresh => "R",
            Self::OpenFilter => "/",
            Self::ToggleHelp => "?",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::OpenFilter => "filter",
            Self::ToggleHelp => "help",
        }
    }
}

/// Resolution strategies for a registered character key, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DirectHandler,
    Delegate,
    BuiltIn,
}

pub const RESOLUTION_ORDER: [Strategy; 3] =
    [Strategy::DirectHandler, Strategy::Delegate, Strategy::BuiltIn];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NavigatedBack { from: String, to: String },
    LoadMore,
    Handler,
    Delegated,
    BuiltIn(BuiltIn),
    /// Registered key with no effect; still consumed.
    Swallowed,
    /// Edited or closed the open filter prompt.
    Prompt,
    /// Closed the help overlay.
    Dismissed,
    /// Consumed by the outer handler after the dispatcher forwarded it.
    Outer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Consumed(Resolution),
    Forwarded(Key),
}

impl KeyOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed(_))
    }
}

/// What the dispatcher needs from its owner.
pub trait DispatchContext {
    fn navigation(&mut self) -> &mut NavigationStack;
    /// `None` when no delegate is installed.
    fn delegate(&mut self, action: Action, payload: &Payload) -> Option<Result<()>>;
    fn lazy_loading(&self) -> bool;
    fn load_more(&mut self);
    fn run_builtin(&mut self, builtin: BuiltIn);
}

#[derive(Default)]
pub struct KeyDispatcher {
    bindings: Vec<KeyBinding>,
    handlers: HashMap<String, KeyHandler>,
}

impl fmt::Debug for KeyDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDispatcher")
            .field("bindings", &self.bindings)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KeyDispatcher {
    /// Registers `key`. Re-registering replaces the description and the
    /// handler, keeping the binding's position in the help listing.
    pub fn bind(
        &mut self,
        key: impl Into<String>,
        description: impl Into<String>,
        handler: Option<KeyHandler>,
    ) {
        let key = key.into();
        let description = description.into();
        match self.bindings.iter_mut().find(|binding| binding.key == key) {
            Some(existing) => existing.description = description,
            None => self.bindings.push(KeyBinding {
                key: key.clone(),
                description,
            }),
        }
        match handler {
            Some(handler) => {
                self.handlers.insert(key, handler);
            }
            None => {
                self.handlers.remove(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.handlers.clear();
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.iter().any(|binding| binding.key == key)
    }

    pub fn has_handler(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn dispatch<C: DispatchContext>(&mut self, key: Key, ctx: &mut C) -> KeyOutcome {
        match key {
            Key::Esc => navigate_back(ctx),
            Key::PageDown if ctx.lazy_loading() => {
                ctx.load_more();
                KeyOutcome::Consumed(Resolution::LoadMore)
            }
            Key::Char(ch) => self.resolve_char(ch, ctx),
            other => KeyOutcome::Forwarded(other),
        }
    }

    fn resolve_char<C: DispatchContext>(&mut self, ch: char, ctx: &mut C) -> KeyOutcome {
        let name = ch.to_string();
        if !self.is_bound(&name) {
            return KeyOutcome::Forwarded(Key::Char(ch));
        }

        for strategy in RESOLUTION_ORDER {
            if let Some(resolution) = self.try_strategy(strategy, &name, ctx) {
                debug!(key = %name, ?strategy, "key resolved");
                return KeyOutcome::Consumed(resolution);
            }
        }
        debug!(key = %name, "registered key had no effect");
        KeyOutcome::Consumed(Resolution::Swallowed)
    }

    fn try_strategy<C: DispatchContext>(
        &mut self,
        strategy: Strategy,
        name: &str,
        ctx: &mut C,
    ) -> Option<Resolution> {
        match strategy {
            Strategy::DirectHandler => {
                let handler = self.handlers.get_mut(name)?;
                handler();
                Some(Resolution::Handler)
            }
            Strategy::Delegate => {
                match ctx.delegate(Action::KeyPress, &payload([("key", name.to_owned())]))? {
                    Ok(()) => Some(Resolution::Delegated),
                    Err(error) => {
                        debug!(key = %name, error = %error, "delegate declined key");
                        None
                    }
                }
            }
            Strategy::BuiltIn => {
                let builtin = BuiltIn::for_key(name)?;
                ctx.run_builtin(builtin);
                Some(Resolution::BuiltIn(builtin))
            }
        }
    }
}

fn navigate_back<C: DispatchContext>(ctx: &mut C) -> KeyOutcome {
    let navigation = ctx.navigation();
    if !navigation.can_go_back() {
        return KeyOutcome::Forwarded(Key::Esc);
    }
    let from = navigation.pop().unwrap_or_default();
    let to = navigation.current().to_owned();

    let notifications = [
        (
            Action::Back,
            payload([("from", from.clone()), ("to", to.clone())]),
        ),
        (Action::NavigateBack, payload([("current_view", to.clone())])),
    ];
    for (action, body) in notifications {
        if let Some(Err(error)) = ctx.delegate(action, &body) {
            warn!(action = action.as_str(), error = %error, "back notification failed");
        }
    }
    KeyOutcome::Consumed(Resolution::NavigatedBack { from, to })
}
