//! `pb problem`: post, browse, edit, and engage with problems.

use board_core::model::{Category, NewProblem, ParseEnumError, Problem, ProblemPatch};
use board_core::{BoardError, ErrorCode, ensure_owned_by};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{self, Write};

use super::{Context, Created, render_done};
use crate::output::{local_time, pretty_kv, pretty_rule, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct ProblemArgs {
    #[command(subcommand)]
    pub command: ProblemCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProblemCommand {
    #[command(
        about = "Post a new problem",
        after_help = "EXAMPLES:\n    pb problem create --title \"Alarm never wakes me\" \\\n        --description \"Snooze is too easy\" --category general --frequency daily"
    )]
    Create(CreateArgs),

    #[command(about = "List problems, newest first")]
    List(ListArgs),

    #[command(about = "Show one problem")]
    Show(IdArg),

    #[command(about = "Edit a problem you posted")]
    Edit(EditArgs),

    #[command(about = "Delete a problem you posted")]
    Delete(IdArg),

    #[command(about = "Toggle watching a problem")]
    Watch(IdArg),

    #[command(about = "Toggle empathy for a problem")]
    Empathize(IdArg),

    #[command(about = "Record that you viewed a problem")]
    View(IdArg),
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Problem ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// One of: general, work, health, study, finance.
    #[arg(long)]
    pub category: String,

    /// One of: daily, weekly, monthly, sometimes.
    #[arg(long)]
    pub frequency: String,

    /// Desired feature of a solution (repeatable).
    #[arg(long = "feature")]
    pub features: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only problems in this category.
    #[arg(long, conflicts_with_all = ["owner", "mine"])]
    pub category: Option<String>,

    /// Only problems posted by this uid.
    #[arg(long, conflicts_with = "mine")]
    pub owner: Option<String>,

    /// Only problems posted by the acting user.
    #[arg(long)]
    pub mine: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Problem ID.
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub frequency: Option<String>,

    /// Replace the feature list (repeatable).
    #[arg(long = "feature")]
    pub features: Option<Vec<String>>,
}

pub fn run_problem(args: &ProblemArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        ProblemCommand::Create(create) => run_create(create, ctx),
        ProblemCommand::List(list) => run_list(list, ctx),
        ProblemCommand::Show(show) => run_show(&show.id, ctx),
        ProblemCommand::Edit(edit) => run_edit(edit, ctx),
        ProblemCommand::Delete(delete) => run_delete(&delete.id, ctx),
        ProblemCommand::Watch(watch) => run_watch(&watch.id, ctx),
        ProblemCommand::Empathize(empathize) => run_empathize(&empathize.id, ctx),
        ProblemCommand::View(view) => run_view(&view.id, ctx),
    }
}

fn run_create(args: &CreateArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let payload = NewProblem {
        title: args.title.clone(),
        description: args.description.clone(),
        category: args.category.clone(),
        frequency: args.frequency.clone(),
        features: args.features.clone(),
    };
    let id = ctx.board.problems().create(&payload, &actor)?;
    render(ctx.output, &Created::new(id), |c, w| {
        writeln!(w, "created problem {}", c.id)
    })
}

fn run_list(args: &ListArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let problems = ctx.board.problems();
    let items = if let Some(raw) = &args.category {
        let category: Category = raw.parse().map_err(|err: ParseEnumError| {
            BoardError::Validation {
                code: ErrorCode::InvalidCategory,
                detail: err.to_string(),
            }
        })?;
        problems.list_by_category(category)?
    } else if args.mine {
        problems.list_by_owner(&ctx.actor()?.uid)?
    } else if let Some(owner) = &args.owner {
        problems.list_by_owner(owner)?
    } else {
        problems.list_all()?
    };

    render_mode(
        ctx.output,
        &items,
        |items, w| {
            for p in items {
                text_row(p, w)?;
            }
            Ok(())
        },
        |items, w| {
            if items.is_empty() {
                return writeln!(w, "No problems posted yet.");
            }
            pretty_section(w, &format!("Problems ({})", items.len()))?;
            for p in items {
                writeln!(
                    w,
                    "{:<22} {:<9} {:<11} {}",
                    p.id,
                    p.status.as_str(),
                    p.category.as_str(),
                    p.title
                )?;
            }
            Ok(())
        },
    )
}

fn text_row(p: &Problem, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        p.id,
        p.status.as_str(),
        p.category.as_str(),
        p.watching,
        p.empathy,
        p.views,
        p.title
    )
}

fn pretty_card(p: &Problem, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &p.title)?;
    pretty_kv(w, "ID", &p.id)?;
    pretty_kv(w, "Status", p.status.as_str())?;
    pretty_kv(w, "Category", p.category.as_str())?;
    pretty_kv(w, "Frequency", p.frequency.as_str())?;
    pretty_kv(w, "Posted by", format!("{} ({})", p.user_name, p.user_id))?;
    pretty_kv(w, "Posted", local_time(&p.created_at))?;
    if let Some(updated) = &p.updated_at {
        pretty_kv(w, "Updated", local_time(updated))?;
    }
    pretty_kv(
        w,
        "Engagement",
        format!(
            "{} watching, {} empathy, {} views",
            p.watching, p.empathy, p.views
        ),
    )?;
    pretty_rule(w)?;
    writeln!(w, "{}", p.description)?;
    if !p.features.is_empty() {
        writeln!(w)?;
        writeln!(w, "Wanted features:")?;
        for feature in &p.features {
            writeln!(w, "  - {feature}")?;
        }
    }
    Ok(())
}

fn run_show(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let problem = ctx.board.problems().get(id)?;
    render_mode(ctx.output, &problem, text_row, pretty_card)
}

fn run_edit(args: &EditArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let problems = ctx.board.problems();
    let current = problems.get(&args.id)?;
    ensure_owned_by(&current.user_id, &actor, "problem")?;

    let patch = ProblemPatch {
        title: args.title.clone(),
        description: args.description.clone(),
        category: args.category.clone(),
        frequency: args.frequency.clone(),
        features: args.features.clone(),
    };
    problems.update(&args.id, &patch, &actor)?;
    render_done(ctx, "updated", &args.id)
}

fn run_delete(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let problems = ctx.board.problems();
    let current = problems.get(id)?;
    ensure_owned_by(&current.user_id, &actor, "problem")?;
    problems.delete(id, &actor)?;
    render_done(ctx, "deleted", id)
}

fn run_watch(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let toggled = ctx.board.problems().toggle_watch(id, &actor)?;
    render(ctx.output, &toggled, |t, w| {
        let verb = if t.watched { "watching" } else { "stopped watching" };
        writeln!(
            w,
            "{verb} {id} ({} watching, status {})",
            t.watching,
            t.status.as_str()
        )
    })
}

fn run_empathize(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let toggled = ctx.board.problems().toggle_empathy(id, &actor)?;
    render(ctx.output, &toggled, |t, w| {
        let verb = if t.empathized {
            "empathized with"
        } else {
            "withdrew empathy from"
        };
        writeln!(w, "{verb} {id} ({} empathy)", t.empathy)
    })
}

#[derive(Debug, Serialize)]
struct ViewOutput<'a> {
    id: &'a str,
    counted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    views: Option<u64>,
}

fn run_view(id: &str, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let views = ctx.board.problems().increase_view(id, &actor)?;
    let out = ViewOutput {
        id,
        counted: views.is_some(),
        views,
    };
    render(ctx.output, &out, |v, w| match v.views {
        Some(n) => writeln!(w, "viewed {} ({n} views)", v.id),
        None => writeln!(w, "already viewed {}", v.id),
    })
}
