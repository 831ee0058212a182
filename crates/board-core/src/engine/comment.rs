use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

use super::notification::NotificationEngine;
use super::problem::ProblemEngine;
use super::user::UserEngine;
use super::{
    decode_all, load, members_value, require_id, side_effect, store_error, to_document,
};
use crate::config::BoardConfig;
use crate::error::{BoardError, ErrorCode, Result};
use crate::identity::Actor;
use crate::model::{
    Comment, CommentStatus, NewComment, NewNotification, NotificationKind, Problem, Status,
};
use crate::store::{Collection, DocumentStore, Filter, fields, timestamp_value};

/// Outcome of a like or dislike toggle. Both counters are reported because
/// exclusive reactions can change the opposite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionToggle {
    pub likes: u64,
    pub dislikes: u64,
    pub liked: bool,
    pub disliked: bool,
}

/// Outcome of [`CommentEngine::toggle_accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcceptToggle {
    pub accepted: bool,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Like,
    Dislike,
}

/// Comments, reactions, and the accept-solution workflow.
#[derive(Clone, Copy)]
pub struct CommentEngine<'a> {
    store: &'a dyn DocumentStore,
    config: &'a BoardConfig,
}

fn require_content(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(BoardError::validation(
            ErrorCode::EmptyComment,
            "content is blank",
        ));
    }
    Ok(trimmed)
}

impl<'a> CommentEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, config: &'a BoardConfig) -> Self {
        Self { store, config }
    }

    const fn problems(&self) -> ProblemEngine<'a> {
        ProblemEngine::new(self.store, self.config)
    }

    fn notifier(&self) -> Option<NotificationEngine<'a>> {
        self.config
            .notifications
            .enabled
            .then(|| NotificationEngine::new(self.store))
    }

    /// Post a comment on a problem. The problem must exist; `parent_id` is
    /// stored as given and is not required to resolve.
    ///
    /// Notifies the problem owner when the author is someone else.
    pub fn add(&self, new: &NewComment, author: &Actor) -> Result<String> {
        author.validate()?;
        let content = require_content(&new.content)?;
        let problem_id = require_id(&new.problem_id, ErrorCode::InvalidCommentProblem)?;
        let problem = self.problems().get(problem_id)?;

        let comment = Comment {
            id: String::new(),
            problem_id: problem.id.clone(),
            user_id: author.uid.clone(),
            user_name: author.display_name.clone(),
            content: content.to_string(),
            parent_id: new
                .parent_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string),
            status: CommentStatus::Posted,
            likes: 0,
            liked_by: BTreeSet::new(),
            dislikes: 0,
            disliked_by: BTreeSet::new(),
            accepted: false,
            created_at: self.store.server_timestamp(),
            updated_at: None,
        };
        let id = self
            .store
            .create(Collection::Comments, to_document(&comment)?)?;
        tracing::debug!(id = %id, problem = %problem.id, author = %author.uid, "comment added");

        if problem.user_id != author.uid {
            if let Some(notifier) = self.notifier() {
                let emitted = notifier.emit(&NewNotification {
                    recipient_id: problem.user_id.clone(),
                    kind: NotificationKind::Comment,
                    problem_id: problem.id.clone(),
                    problem_title: Some(problem.title.clone()),
                    actor_id: author.uid.clone(),
                    actor_name: author.display_name.clone(),
                });
                side_effect("emit notification", &id, emitted)?;
            }
        }
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Comment> {
        let id = require_id(id, ErrorCode::InvalidCommentId)?;
        load(
            self.store,
            Collection::Comments,
            id,
            ErrorCode::CommentNotFound,
            "comment",
        )
    }

    /// All comments on a problem, oldest first.
    pub fn list(&self, problem_id: &str) -> Result<Vec<Comment>> {
        let problem_id = require_id(problem_id, ErrorCode::InvalidCommentProblem)?;
        let mut comments: Vec<Comment> = decode_all(
            Collection::Comments,
            self.store
                .query(Collection::Comments, &[Filter::equals("problemId", problem_id)])?,
        )?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Replace a comment's content.
    pub fn update(&self, id: &str, content: &str, actor: &Actor) -> Result<()> {
        actor.validate()?;
        let id = require_id(id, ErrorCode::InvalidCommentId)?;
        let content = require_content(content)?;
        self.store
            .update(
                Collection::Comments,
                id,
                fields([
                    ("content", json!(content)),
                    ("updatedAt", timestamp_value(self.store.server_timestamp())),
                ]),
            )
            .map_err(|err| store_error(err, ErrorCode::CommentNotFound, "comment"))?;
        tracing::debug!(id, actor = %actor.uid, "comment updated");
        Ok(())
    }

    /// Hard-delete a comment. Deleting an accepted comment re-derives the
    /// parent problem's status.
    pub fn delete(&self, id: &str, actor: &Actor) -> Result<()> {
        actor.validate()?;
        let comment = self.get(id)?;
        self.remove(&comment)?;
        tracing::info!(id = %comment.id, actor = %actor.uid, "comment deleted");
        Ok(())
    }

    /// Delete every comment written by `user_id`. Returns how many were
    /// removed.
    pub fn delete_by_user(&self, user_id: &str) -> Result<usize> {
        let user_id = require_id(user_id, ErrorCode::InvalidUser)?;
        let comments: Vec<Comment> = decode_all(
            Collection::Comments,
            self.store
                .query(Collection::Comments, &[Filter::equals("userId", user_id)])?,
        )?;
        for comment in &comments {
            self.remove(comment)?;
        }
        tracing::info!(user = user_id, removed = comments.len(), "comments deleted for user");
        Ok(comments.len())
    }

    fn remove(&self, comment: &Comment) -> Result<()> {
        self.store
            .delete(Collection::Comments, &comment.id)
            .map_err(|err| store_error(err, ErrorCode::CommentNotFound, "comment"))?;
        if comment.accepted {
            let refreshed = self.refresh_problem_status(&comment.problem_id);
            side_effect("refresh status", &comment.problem_id, refreshed)?;
        }
        Ok(())
    }

    /// Re-derive status after an accepted comment disappeared. A problem
    /// that no longer exists is skipped.
    fn refresh_problem_status(&self, problem_id: &str) -> Result<()> {
        let Some(record) = self.store.get(Collection::Problems, problem_id)? else {
            return Ok(());
        };
        let problem: Problem = record.decode(Collection::Problems)?;
        let status = Status::derive(
            self.any_accepted(problem_id, None)?,
            problem.watching,
            self.config.engagement.trending_threshold,
        );
        if status != problem.status {
            self.problems().set_status(problem_id, status)?;
            tracing::debug!(problem = problem_id, %status, "status refreshed");
        }
        Ok(())
    }

    fn any_accepted(&self, problem_id: &str, except: Option<&str>) -> Result<bool> {
        let accepted = self.accepted_on(problem_id)?;
        Ok(accepted.iter().any(|id| Some(id.as_str()) != except))
    }

    fn accepted_on(&self, problem_id: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .query(
                Collection::Comments,
                &[
                    Filter::equals("problemId", problem_id),
                    Filter::equals("accepted", true),
                ],
            )?
            .into_iter()
            .map(|record| record.id)
            .collect())
    }

    pub fn toggle_like(&self, id: &str, actor: &Actor) -> Result<ReactionToggle> {
        self.react(id, actor, Reaction::Like)
    }

    pub fn toggle_dislike(&self, id: &str, actor: &Actor) -> Result<ReactionToggle> {
        self.react(id, actor, Reaction::Dislike)
    }

    fn react(&self, id: &str, actor: &Actor, reaction: Reaction) -> Result<ReactionToggle> {
        actor.validate()?;
        let comment = self.get(id)?;

        let (toggled_side, other_side) = match reaction {
            Reaction::Like => (comment.likers(), comment.dislikers()),
            Reaction::Dislike => (comment.dislikers(), comment.likers()),
        };
        let toggled = toggled_side.toggle(&actor.uid);
        let other = if toggled.is_member && self.config.engagement.exclusive_reactions {
            other_side.remove(&actor.uid).unwrap_or(other_side)
        } else {
            other_side
        };

        let (likes, dislikes) = match reaction {
            Reaction::Like => (toggled.membership, other),
            Reaction::Dislike => (other, toggled.membership),
        };
        self.store
            .update(
                Collection::Comments,
                &comment.id,
                fields([
                    ("likes", json!(likes.count)),
                    ("likedBy", members_value(&likes.members)),
                    ("dislikes", json!(dislikes.count)),
                    ("dislikedBy", members_value(&dislikes.members)),
                ]),
            )
            .map_err(|err| store_error(err, ErrorCode::CommentNotFound, "comment"))?;
        tracing::debug!(
            id = %comment.id,
            actor = %actor.uid,
            ?reaction,
            likes = likes.count,
            dislikes = dislikes.count,
            "reaction toggled"
        );

        Ok(ReactionToggle {
            likes: likes.count,
            dislikes: dislikes.count,
            liked: likes.contains(&actor.uid),
            disliked: dislikes.contains(&actor.uid),
        })
    }

    /// Flip a comment's accepted flag and re-derive the parent problem's
    /// status.
    ///
    /// Both the comment and its problem are loaded before anything is
    /// written. Accepting pins the problem to `Resolved`; un-accepting falls
    /// back to `Resolved` only if another comment is still accepted, else to
    /// the watch-count rule. On accept, the comment author is notified and
    /// the problem title is recorded on their profile.
    pub fn toggle_accept(&self, comment_id: &str, actor: &Actor) -> Result<AcceptToggle> {
        actor.validate()?;
        let comment = self.get(comment_id)?;
        let problem = self.problems().get(&comment.problem_id)?;
        let accepted = !comment.accepted;

        if accepted && self.config.engagement.single_accepted_solution {
            for sibling in self.accepted_on(&problem.id)? {
                if sibling == comment.id {
                    continue;
                }
                self.store
                    .update(
                        Collection::Comments,
                        &sibling,
                        fields([("accepted", Value::Bool(false))]),
                    )
                    .map_err(|err| store_error(err, ErrorCode::CommentNotFound, "comment"))?;
                tracing::debug!(id = %sibling, problem = %problem.id, "sibling un-accepted");
            }
        }

        self.store
            .update(
                Collection::Comments,
                &comment.id,
                fields([("accepted", Value::Bool(accepted))]),
            )
            .map_err(|err| store_error(err, ErrorCode::CommentNotFound, "comment"))?;

        let status = Status::derive(
            accepted || self.any_accepted(&problem.id, Some(&comment.id))?,
            problem.watching,
            self.config.engagement.trending_threshold,
        );
        let persisted = self.problems().set_status(&problem.id, status);
        side_effect("persist status", &problem.id, persisted)?;
        tracing::info!(
            comment = %comment.id,
            problem = %problem.id,
            accepted,
            %status,
            "acceptance toggled"
        );

        if accepted {
            self.announce_acceptance(&comment, &problem, actor)?;
        }

        Ok(AcceptToggle { accepted, status })
    }

    fn announce_acceptance(
        &self,
        comment: &Comment,
        problem: &Problem,
        actor: &Actor,
    ) -> Result<()> {
        if comment.user_id != actor.uid {
            if let Some(notifier) = self.notifier() {
                let emitted = notifier.emit(&NewNotification {
                    recipient_id: comment.user_id.clone(),
                    kind: NotificationKind::Accept,
                    problem_id: problem.id.clone(),
                    problem_title: Some(problem.title.clone()),
                    actor_id: actor.uid.clone(),
                    actor_name: actor.display_name.clone(),
                });
                side_effect("emit notification", &comment.id, emitted)?;
            }
        }
        let recorded =
            UserEngine::new(self.store).record_accepted_solution(&comment.user_id, &problem.title);
        side_effect("record accepted solution", &comment.user_id, recorded).map(|_| ())
    }
}
