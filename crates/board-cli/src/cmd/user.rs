//! `pb user`: profile management and account deletion.

use board_core::model::{NewProfile, ProfilePatch, UserProfile};
use board_core::{AccountDeletion, MigrationReport};
use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{Context, render_done};
use crate::output::{local_time, pretty_kv, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(
        about = "Create your profile",
        after_help = "EXAMPLES:\n    pb --user u1 --name \"Ann\" --email ann@example.com user create"
    )]
    Create,

    #[command(about = "Show a profile (yours by default)")]
    Show(ShowArgs),

    #[command(about = "Change your display name or email")]
    Edit(EditArgs),

    #[command(about = "Delete your account: comments, problems, then profile")]
    Delete,

    #[command(about = "Create profiles for commenters that have none")]
    Migrate,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Profile uid; defaults to the acting user.
    pub uid: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[arg(long = "display-name")]
    pub display_name: Option<String>,

    #[arg(long = "set-email")]
    pub email: Option<String>,
}

pub fn run_user(args: &UserArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        UserCommand::Create => run_create(ctx),
        UserCommand::Show(show) => run_show(show, ctx),
        UserCommand::Edit(edit) => run_edit(edit, ctx),
        UserCommand::Delete => run_delete(ctx),
        UserCommand::Migrate => run_migrate(ctx),
    }
}

fn profile_text(p: &UserProfile, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\t{}\t{}", p.id, p.display_name, p.email)
}

fn profile_pretty(p: &UserProfile, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &p.display_name)?;
    pretty_kv(w, "UID", &p.id)?;
    pretty_kv(w, "Email", &p.email)?;
    pretty_kv(w, "Joined", local_time(&p.created_at))?;
    if let Some(solutions) = p.accepted_solutions.as_deref().filter(|s| !s.is_empty()) {
        writeln!(w, "Accepted solutions:")?;
        for title in solutions {
            writeln!(w, "  - {title}")?;
        }
    }
    Ok(())
}

fn run_create(ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let profile = ctx.board.users().create_profile(
        &actor.uid,
        &NewProfile {
            display_name: actor.display_name.clone(),
            email: actor.email.clone(),
        },
    )?;
    render_mode(ctx.output, &profile, profile_text, profile_pretty)
}

fn run_show(args: &ShowArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let uid = match &args.uid {
        Some(uid) => uid.clone(),
        None => ctx.actor()?.uid,
    };
    let profile = ctx.board.users().get_profile(&uid)?;
    render_mode(ctx.output, &profile, profile_text, profile_pretty)
}

fn run_edit(args: &EditArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let patch = ProfilePatch {
        display_name: args.display_name.clone(),
        email: args.email.clone(),
        accepted_solutions: None,
    };
    ctx.board.users().update_profile(&actor.uid, &patch)?;
    render_done(ctx, "updated", &actor.uid)
}

fn run_delete(ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let report: AccountDeletion = ctx.board.delete_account(&actor)?;
    render(ctx.output, &report, |r, w| {
        writeln!(
            w,
            "deleted {} comments, {} problems, profile {}",
            r.comments,
            r.problems,
            if r.profile { "removed" } else { "absent" }
        )
    })
}

fn run_migrate(ctx: &Context<'_>) -> anyhow::Result<()> {
    let report: MigrationReport = ctx.board.users().migrate_profiles_from_comments()?;
    render(ctx.output, &report, |r, w| {
        writeln!(
            w,
            "migrated {}, skipped {}, errors {}",
            r.migrated, r.skipped, r.errors
        )
    })
}
