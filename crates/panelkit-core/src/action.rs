// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::BTreeMap;

/// Notifications delivered to the owning plugin through its action delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    KeyPress,
    Back,
    NavigateBack,
    RowSelected,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyPress => "keypress",
            Self::Back => "back",
            Self::NavigateBack => "navigate_back",
            Self::RowSelected => "rowSelected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keypress" => Some(Self::KeyPress),
            "back" => Some(Self::Back),
            "navigate_back" => Some(Self::NavigateBack),
            "rowSelected" => Some(Self::RowSelected),
            _ => None,
        }
    }
}

pub type Payload = BTreeMap<String, String>;

pub type ActionDelegate = Box<dyn FnMut(Action, &Payload) -> Result<()>>;

pub fn payload<const N: usize>(entries: [(&str, String); N]) -> Payload {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
