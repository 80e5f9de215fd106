//! Diagnostics
//!
//! Misuse of the dynamic mutation API never fails the caller. Instead a
//! [`Diagnostic`] is produced and routed through [`warn`], which logs it
//! with `tracing` and forwards it to an optional warn handler.
//!
//! Nothing is produced in production mode. `silent` only mutes logging.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::config;

/// A non-fatal misuse report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("cannot set reactive property `{key}` on {found} value")]
    SetOnPrimitive { key: String, found: &'static str },

    #[error("cannot delete reactive property `{key}` on {found} value")]
    DeleteOnPrimitive { key: String, found: &'static str },

    #[error(
        "avoid adding reactive property `{key}` to an instance or its root data at runtime; \
         declare it upfront instead"
    )]
    AddToRoot { key: String },

    #[error("avoid deleting property `{key}` on an instance or its root data; set it to null instead")]
    DeleteFromRoot { key: String },

    #[error("`{key}` is not a valid array index")]
    InvalidArrayIndex { key: String },

    #[error("cannot grow array to hold index `{key}`")]
    ArrayTooLarge { key: String },
}

type WarnHandler = Rc<dyn Fn(&Diagnostic)>;

thread_local! {
    static WARN_HANDLER: RefCell<Option<WarnHandler>> = const { RefCell::new(None) };
}

/// Install a handler that receives every emitted diagnostic.
pub fn set_warn_handler<F>(handler: F)
where
    F: Fn(&Diagnostic) + 'static,
{
    WARN_HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::new(handler)));
}

/// Remove the installed warn handler, if any.
pub fn clear_warn_handler() {
    WARN_HANDLER.with(|slot| slot.borrow_mut().take());
}

/// Emit a diagnostic.
pub fn warn(diagnostic: Diagnostic) {
    let (silent, production) = config::with(|c| (c.silent, c.production));
    if production {
        return;
    }

    // Clone out so the handler may itself install or clear handlers.
    let handler = WARN_HANDLER.with(|slot| slot.borrow().clone());
    if let Some(handler) = handler {
        handler(&diagnostic);
    }

    if !silent {
        tracing::warn!(%diagnostic, "reactivity misuse");
    }
}
