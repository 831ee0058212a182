pub mod comment;
pub mod notify;
pub mod problem;
pub mod user;

use board_core::{Actor, Board};
use serde::Serialize;
use std::io::Write;

use crate::identity::{self, IdentityFlags};
use crate::output::OutputMode;

/// Everything a command handler needs: the opened board, the resolved
/// output mode, and the identity flags to resolve an actor from.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub board: &'a Board,
    pub output: OutputMode,
    pub identity: IdentityFlags<'a>,
}

impl Context<'_> {
    /// The acting user; mutating commands fail with `auth/unauthenticated`
    /// when none resolves.
    pub fn actor(&self) -> board_core::error::Result<Actor> {
        identity::require(self.identity)
    }
}

/// JSON shape for commands that only produce an id.
#[derive(Debug, Serialize)]
pub struct Created {
    pub ok: bool,
    pub id: String,
}

impl Created {
    pub const fn new(id: String) -> Self {
        Self { ok: true, id }
    }
}

/// JSON shape for commands with nothing else to report.
#[derive(Debug, Serialize)]
pub struct Done<'a> {
    pub ok: bool,
    pub action: &'static str,
    pub id: &'a str,
}

impl<'a> Done<'a> {
    pub const fn new(action: &'static str, id: &'a str) -> Self {
        Self {
            ok: true,
            action,
            id,
        }
    }
}

/// Shared human rendering for [`Done`].
pub fn render_done(ctx: &Context<'_>, action: &'static str, id: &str) -> anyhow::Result<()> {
    crate::output::render(ctx.output, &Done::new(action, id), |d, w| {
        writeln!(w, "{} {}", d.action, d.id)
    })
}
