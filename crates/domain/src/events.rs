//! The closed set of events the catalog publishes.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::DomainEvent;
use crate::category::CategoryEvent;
use crate::product::ProductEvent;

/// Any event raised by a catalog aggregate, as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEvent {
    Product(ProductEvent),
    Category(CategoryEvent),
}

impl CatalogEvent {
    /// Returns the ID of the aggregate that raised the event.
    pub fn aggregate_id(&self) -> AggregateId {
        match self {
            CatalogEvent::Product(e) => e.product_id(),
            CatalogEvent::Category(e) => e.category_id(),
        }
    }
}

impl DomainEvent for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::Product(e) => e.event_type(),
            CatalogEvent::Category(e) => e.event_type(),
        }
    }

    fn event_id(&self) -> Uuid {
        match self {
            CatalogEvent::Product(e) => e.event_id(),
            CatalogEvent::Category(e) => e.event_id(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::Product(e) => e.occurred_at(),
            CatalogEvent::Category(e) => e.occurred_at(),
        }
    }
}

impl From<ProductEvent> for CatalogEvent {
    fn from(event: ProductEvent) -> Self {
        CatalogEvent::Product(event)
    }
}

impl From<CategoryEvent> for CatalogEvent {
    fn from(event: CategoryEvent) -> Self {
        CatalogEvent::Category(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, CategoryCreated, NewCategory};

    #[test]
    fn delegates_to_the_wrapped_event() {
        let category = Category::create_root(NewCategory {
            name: "Books".to_string(),
            slug: None,
            description: String::new(),
            created_by: "alice".to_string(),
        })
        .unwrap();
        let inner = category.events()[0].clone();

        let event = CatalogEvent::from(inner.clone());

        assert_eq!(event.event_type(), CategoryCreated::EVENT_TYPE);
        assert_eq!(event.event_id(), inner.event_id());
        assert_eq!(event.aggregate_id(), category.id());
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::to_value(&inner).unwrap()
        );
    }
}
