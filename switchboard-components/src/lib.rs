//! Interactive component dispatch for Switchboard.
//!
//! Buttons and select menus are built with [`ComponentBuilder`], registered
//! in a [`ComponentRouter`], and handed activation events. Each component
//! handles one activation at a time.

pub mod breadcrumb;
pub mod callback;
pub mod check;
pub mod component;
pub mod context;
pub mod response;
pub mod router;

pub use breadcrumb::{Breadcrumb, BreadcrumbTrail, DEFAULT_BREADCRUMB_CAPACITY};
pub use callback::{
    action_fn, ActionError, ActionResult, Callback, CallbackRegistry, ComponentAction, FnAction,
};
pub use check::{check_fn, BotPermissionsCheck, Check, CheckOutcome, CheckPipeline, FnCheck};
pub use component::{
    default_failure_response, ComponentBuilder, ComponentSettings, DispatchOutcome,
    FailureResponseBuilder, InteractiveComponent,
};
pub use context::InvocationContext;
pub use response::{
    AckState, AckStrategy, InitialResponseBuilder, InteractionResponder, ResponseHandle,
    ResponseSelector,
};
pub use router::ComponentRouter;
