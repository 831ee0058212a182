//! `pb notify`: the acting user's unread notifications.

use board_core::model::Notification;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;

use super::{Context, render_done};
use crate::output::{local_time, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    #[command(about = "Count unread notifications")]
    Count,

    #[command(about = "List unread notifications, newest first")]
    List,

    #[command(about = "Mark a notification as read")]
    Read(ReadArgs),
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Notification ID.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct UnreadCount<'a> {
    recipient: &'a str,
    unread: usize,
}

pub fn run_notify(args: &NotifyArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        NotifyCommand::Count => run_count(ctx),
        NotifyCommand::List => run_list(ctx),
        NotifyCommand::Read(read) => run_read(&read.id, ctx),
    }
}

fn run_count(ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let unread = ctx.board.notifications().count_unread(&actor.uid)?;
    let out = UnreadCount {
        recipient: &actor.uid,
        unread,
    };
    render(ctx.output, &out, |c, w| writeln!(w, "{}", c.unread))
}

fn run_list(ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let items: Vec<Notification> = ctx.board.notifications().list_unread(&actor.uid)?;
    render_mode(
        ctx.output,
        &items,
        |items, w| {
            for n in items {
                writeln!(w, "{}\t{}\t{}\t{}", n.id, n.kind, n.problem_id, n.message)?;
            }
            Ok(())
        },
        |items, w| {
            if items.is_empty() {
                return writeln!(w, "No unread notifications.");
            }
            pretty_section(w, &format!("Unread ({})", items.len()))?;
            for n in items {
                let title = n.problem_title.as_deref().unwrap_or(&n.problem_id);
                writeln!(w, "{}  {}", local_time(&n.created_at), n.message)?;
                writeln!(w, "    on \"{title}\" · {}", n.id)?;
            }
            Ok(())
        },
    )
}

fn run_read(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    ctx.board.notifications().mark_read(id)?;
    render_done(ctx, "read", id)
}
