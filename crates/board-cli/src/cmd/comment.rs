//! `pb comment`: comments, reactions, and accepted solutions.

use board_core::model::NewComment;
use board_core::{CommentForest, ReactionToggle, build_threads, ensure_owned_by};
use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{Context, Created, render_done};
use crate::output::{local_time, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(
        about = "Comment on a problem",
        after_help = "EXAMPLES:\n    pb comment add <problem-id> \"Try a second alarm across the room\"\n\n    # Reply to another comment\n    pb comment add <problem-id> \"Worked for me\" --reply-to <comment-id>"
    )]
    Add(AddArgs),

    #[command(about = "Show the comment threads of a problem")]
    List(ListArgs),

    #[command(about = "Edit a comment you wrote")]
    Edit(EditArgs),

    #[command(about = "Delete a comment you wrote")]
    Delete(IdArg),

    #[command(about = "Toggle your like on a comment")]
    Like(IdArg),

    #[command(about = "Toggle your dislike on a comment")]
    Dislike(IdArg),

    #[command(about = "Toggle a comment as the accepted solution (problem owner only)")]
    Accept(IdArg),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Problem ID to comment on.
    pub problem_id: String,

    /// Comment text.
    pub content: String,

    /// Comment ID this is a reply to.
    #[arg(long = "reply-to")]
    pub parent_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Problem ID.
    pub problem_id: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Comment ID.
    pub id: String,

    /// Replacement text.
    pub content: String,
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Comment ID.
    pub id: String,
}

pub fn run_comment(args: &CommentArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        CommentCommand::Add(add) => run_add(add, ctx),
        CommentCommand::List(list) => run_list(&list.problem_id, ctx),
        CommentCommand::Edit(edit) => run_edit(edit, ctx),
        CommentCommand::Delete(delete) => run_delete(&delete.id, ctx),
        CommentCommand::Like(like) => run_like(&like.id, ctx),
        CommentCommand::Dislike(dislike) => run_dislike(&dislike.id, ctx),
        CommentCommand::Accept(accept) => run_accept(&accept.id, ctx),
    }
}

fn run_add(args: &AddArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let new = NewComment {
        problem_id: args.problem_id.clone(),
        content: args.content.clone(),
        parent_id: args.parent_id.clone(),
    };
    let id = ctx.board.comments().add(&new, &actor)?;
    render(ctx.output, &Created::new(id), |c, w| {
        writeln!(w, "created comment {}", c.id)
    })
}

fn text_rows(forest: &CommentForest, w: &mut dyn Write) -> io::Result<()> {
    for (depth, c) in forest.walk() {
        writeln!(
            w,
            "{}\t{depth}\t{}\t{}\t{}\t{}\t{}",
            c.id,
            c.likes,
            c.dislikes,
            u8::from(c.accepted),
            c.user_id,
            c.content
        )?;
    }
    Ok(())
}

fn pretty_threads(forest: &CommentForest, w: &mut dyn Write) -> io::Result<()> {
    if forest.is_empty() {
        return writeln!(w, "No comments yet.");
    }
    pretty_section(w, &format!("Comments ({})", forest.len()))?;
    for (depth, c) in forest.walk() {
        let indent = "    ".repeat(depth);
        let mark = if c.accepted { " [accepted]" } else { "" };
        writeln!(
            w,
            "{indent}{} · {} · {}{mark}",
            c.user_name,
            local_time(&c.created_at),
            c.id
        )?;
        writeln!(w, "{indent}  {}", c.content)?;
        writeln!(w, "{indent}  +{} / -{}", c.likes, c.dislikes)?;
    }
    Ok(())
}

fn run_list(problem_id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let comments = ctx.board.comments().list(problem_id)?;
    let forest = build_threads(comments);
    render_mode(ctx.output, &forest, text_rows, pretty_threads)
}

fn run_edit(args: &EditArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let comments = ctx.board.comments();
    let current = comments.get(&args.id)?;
    ensure_owned_by(&current.user_id, &actor, "comment")?;
    comments.update(&args.id, &args.content, &actor)?;
    render_done(ctx, "updated", &args.id)
}

fn run_delete(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let comments = ctx.board.comments();
    let current = comments.get(id)?;
    ensure_owned_by(&current.user_id, &actor, "comment")?;
    comments.delete(id, &actor)?;
    render_done(ctx, "deleted", id)
}

fn render_reaction(ctx: &Context<'_>, id: &str, toggled: &ReactionToggle) -> anyhow::Result<()> {
    render(ctx.output, toggled, |t, w| {
        let state = match (t.liked, t.disliked) {
            (true, _) => "liked",
            (_, true) => "disliked",
            _ => "no reaction on",
        };
        writeln!(w, "{state} {id} (+{} / -{})", t.likes, t.dislikes)
    })
}

fn run_like(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let toggled = ctx.board.comments().toggle_like(id, &actor)?;
    render_reaction(ctx, id, &toggled)
}

fn run_dislike(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let toggled = ctx.board.comments().toggle_dislike(id, &actor)?;
    render_reaction(ctx, id, &toggled)
}

fn run_accept(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let comment = ctx.board.comments().get(id)?;
    let problem = ctx.board.problems().get(&comment.problem_id)?;
    ensure_owned_by(&problem.user_id, &actor, "problem")?;

    let toggled = ctx.board.comments().toggle_accept(id, &actor)?;
    render(ctx.output, &toggled, |t, w| {
        let verb = if t.accepted { "accepted" } else { "unaccepted" };
        writeln!(w, "{verb} {id} (problem is {})", t.status.as_str())
    })
}
