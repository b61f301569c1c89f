//! Headless intake page: the controller state machine and the markup it renders.

pub mod controller;
pub mod render;

pub use controller::{
    events::{FieldUpdate, Notification, NotificationLevel, RenderTarget, UiEvent},
    state::{Phase, RequestKind},
    Controller, Services,
};
