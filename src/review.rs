use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub type ReviewId = i64;

type DateTime = String;

const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stars: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ReviewId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub replies: Vec<Review>,
}

impl Review {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// Reply chains can be arbitrarily deep; unlink them level by level.
impl Drop for Review {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut review) = pending.pop() {
            pending.append(&mut review.replies);
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: i64,
    pub description: String,
    pub stars: u8,
}

impl NewReview {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.stars > MAX_STARS {
            return Err(Error::InvalidReview(format!(
                "stars must be between 0 and {MAX_STARS}, got {}",
                self.stars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReply {
    pub product_id: i64,
    pub parent_id: ReviewId,
    pub description: String,
}

/// A bearer token for review mutations, supplied by the caller's session
/// store.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn token(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Arranges flat reviews into reply trees and returns the roots.
///
/// Input order is kept among roots and within each `replies` list. A reply
/// whose parent is not in `flat` is dropped, as is anything that only hangs
/// off a cycle.
pub fn build_tree(flat: Vec<Review>) -> Vec<Review> {
    let mut index: HashMap<ReviewId, usize> = HashMap::with_capacity(flat.len());
    for (pos, review) in flat.iter().enumerate() {
        index.entry(review.id).or_insert(pos);
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
    for (pos, review) in flat.iter().enumerate() {
        match review.parent_id {
            None => roots.push(pos),
            Some(parent_id) => match index.get(&parent_id) {
                Some(&parent) if parent != pos => children[parent].push(pos),
                _ => debug!(
                    "Dropping orphan review {} (parent {parent_id} not found)",
                    review.id
                ),
            },
        }
    }

    // Post-order walk from the roots; nodes reachable only through a cycle
    // are never visited.
    let mut order = Vec::with_capacity(flat.len());
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&pos| (pos, false)).collect();
    while let Some((pos, expanded)) = stack.pop() {
        if expanded {
            order.push(pos);
        } else {
            stack.push((pos, true));
            stack.extend(children[pos].iter().rev().map(|&child| (child, false)));
        }
    }

    let mut slots: Vec<Option<Review>> = flat
        .into_iter()
        .map(|mut review| {
            review.replies.clear();
            Some(review)
        })
        .collect();
    for pos in order {
        let replies: Vec<Review> = children[pos]
            .iter()
            .filter_map(|&child| slots[child].take())
            .collect();
        if let Some(review) = slots[pos].as_mut() {
            review.replies = replies;
        }
    }

    roots.into_iter().filter_map(|pos| slots[pos].take()).collect()
}

/// Number of levels in the deepest thread of `roots`; `0` when empty.
pub fn depth(roots: &[Review]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&Review, usize)> = roots.iter().map(|review| (review, 1)).collect();
    while let Some((review, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(review.replies.iter().map(|reply| (reply, level + 1)));
    }
    deepest
}

/// Undoes [`build_tree`]: every review of every thread, parents before their
/// replies, with `replies` emptied. `parent_id` still links them.
pub fn flatten(roots: Vec<Review>) -> Vec<Review> {
    let mut flat = Vec::new();
    let mut stack: Vec<Review> = roots.into_iter().rev().collect();
    while let Some(mut review) = stack.pop() {
        let replies = std::mem::take(&mut review.replies);
        stack.extend(replies.into_iter().rev());
        flat.push(review);
    }
    flat
}
