//! Category domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{DomainEvent, EventMetadata};

use super::Slug;

/// Events raised by the category aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryEvent {
    Created(CategoryCreated),
    Renamed(CategoryRenamed),
    Activated(CategoryActivated),
    Deactivated(CategoryDeactivated),
    Deleted(CategoryDeleted),
}

impl CategoryEvent {
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            CategoryEvent::Created(e) => &e.metadata,
            CategoryEvent::Renamed(e) => &e.metadata,
            CategoryEvent::Activated(e) => &e.metadata,
            CategoryEvent::Deactivated(e) => &e.metadata,
            CategoryEvent::Deleted(e) => &e.metadata,
        }
    }

    pub fn category_id(&self) -> AggregateId {
        match self {
            CategoryEvent::Created(e) => e.category_id,
            CategoryEvent::Renamed(e) => e.category_id,
            CategoryEvent::Activated(e) => e.category_id,
            CategoryEvent::Deactivated(e) => e.category_id,
            CategoryEvent::Deleted(e) => e.category_id,
        }
    }
}

impl DomainEvent for CategoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CategoryEvent::Created(_) => CategoryCreated::EVENT_TYPE,
            CategoryEvent::Renamed(_) => CategoryRenamed::EVENT_TYPE,
            CategoryEvent::Activated(_) => CategoryActivated::EVENT_TYPE,
            CategoryEvent::Deactivated(_) => CategoryDeactivated::EVENT_TYPE,
            CategoryEvent::Deleted(_) => CategoryDeleted::EVENT_TYPE,
        }
    }

    fn event_id(&self) -> Uuid {
        self.metadata().id()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata().occurred_at()
    }
}

/// A category was created, as a root or under a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub category_id: AggregateId,
    pub name: String,
    pub slug: Slug,
    #[serde(default)]
    pub parent_id: Option<AggregateId>,
    pub level: u32,
    pub path: String,
    pub created_by: String,
}

impl CategoryCreated {
    pub const EVENT_TYPE: &'static str = "catalog.category.created.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRenamed {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub category_id: AggregateId,
    pub old_name: String,
    pub new_name: String,
    pub old_slug: Slug,
    pub new_slug: Slug,
    pub updated_by: String,
}

impl CategoryRenamed {
    pub const EVENT_TYPE: &'static str = "catalog.category.renamed.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryActivated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub category_id: AggregateId,
    pub name: String,
    pub activated_by: String,
}

impl CategoryActivated {
    pub const EVENT_TYPE: &'static str = "catalog.category.activated.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDeactivated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub category_id: AggregateId,
    pub name: String,
    pub reason: String,
    pub deactivated_by: String,
}

impl CategoryDeactivated {
    pub const EVENT_TYPE: &'static str = "catalog.category.deactivated.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDeleted {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub category_id: AggregateId,
    pub name: String,
    pub deleted_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CategoryDeleted {
    pub const EVENT_TYPE: &'static str = "catalog.category.deleted.v1";
}
