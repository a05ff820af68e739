//! log.tag + log.tag.link — Named labels and their attachments.

use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{log_tag_links, log_tags};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = log_tags)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub create_date: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = log_tags)]
pub struct NewTag<'a> {
    pub name: &'a str,
}

/// The record a tag is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LinkTarget {
    Run(i64),
    Entry(i64),
}

impl LinkTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            LinkTarget::Run(_) => "run",
            LinkTarget::Entry(_) => "entry",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            LinkTarget::Run(id) | LinkTarget::Entry(id) => *id,
        }
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = log_tag_links)]
pub struct TagLink {
    pub id: i64,
    pub target_kind: String,
    pub target_id: i64,
    pub tag_id: i64,
    pub create_date: DateTime<Utc>,
}

/// A pending (target, tag) association. Equality is the link's uniqueness key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewTagLink {
    pub target: LinkTarget,
    pub tag_id: i64,
}

/// Row shape for inserting a [`NewTagLink`].
#[derive(Debug, Insertable)]
#[diesel(table_name = log_tag_links)]
pub struct TagLinkRow {
    pub target_kind: &'static str,
    pub target_id: i64,
    pub tag_id: i64,
}

impl From<NewTagLink> for TagLinkRow {
    fn from(link: NewTagLink) -> Self {
        Self {
            target_kind: link.target.kind(),
            target_id: link.target.id(),
            tag_id: link.tag_id,
        }
    }
}
