// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod action;
pub mod content;
pub mod dashboard;
pub mod filter;
pub mod keys;
pub mod messages;
pub mod navigation;
pub mod picker;
pub mod refresh;
pub mod row;
pub mod selection;
pub mod signature;
pub mod state;

pub use action::*;
pub use content::*;
pub use dashboard::*;
pub use filter::*;
pub use keys::*;
pub use messages::*;
pub use navigation::*;
pub use picker::*;
pub use refresh::*;
pub use row::*;
pub use selection::*;
pub use signature::*;
pub use state::*;
