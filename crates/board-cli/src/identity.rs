//! Acting-user resolution for CLI commands.
//!
//! The uid chain: `--user` flag > `PB_USER` env > `USER` env (TTY only).
//! Display name: `--name` > `PB_USER_NAME` > the uid. Email: `--email` >
//! `PB_USER_EMAIL`. Mutating commands require a uid; read-only commands
//! work without one.

use board_core::{Actor, require_actor};
use std::env;

/// Identity flags as parsed from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFlags<'a> {
    pub user: Option<&'a str>,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn flag(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(ToString::to_string)
}

fn resolve_uid_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(uid) = flag(cli_flag) {
        return Some(uid);
    }
    if let Some(uid) = env.get("PB_USER") {
        return Some(uid);
    }
    // USER only names a person at an interactive terminal.
    if env.is_tty() {
        return env.get("USER");
    }
    None
}

fn resolve_actor_with(flags: IdentityFlags<'_>, env: &dyn EnvReader) -> Option<Actor> {
    let uid = resolve_uid_with(flags.user, env)?;
    let name = flag(flags.name)
        .or_else(|| env.get("PB_USER_NAME"))
        .unwrap_or_else(|| uid.clone());
    let email = flag(flags.email)
        .or_else(|| env.get("PB_USER_EMAIL"))
        .unwrap_or_default();
    Some(Actor::new(uid, name).with_email(email))
}

/// Resolve the acting user, if any source names one.
pub fn resolve_actor(flags: IdentityFlags<'_>) -> Option<Actor> {
    resolve_actor_with(flags, &RealEnv)
}

/// Resolve the acting user for a mutating command.
pub fn require(flags: IdentityFlags<'_>) -> board_core::error::Result<Actor> {
    let actor = resolve_actor(flags);
    require_actor(actor.as_ref()).cloned()
}
