//! Message type to event decoder mapping.

use std::collections::HashMap;

use domain::{
    CatalogEvent, CategoryActivated, CategoryCreated, CategoryDeactivated, CategoryDeleted,
    CategoryEvent, CategoryRenamed, ProductActivated, ProductCreated, ProductDeactivated,
    ProductDeleted, ProductDetailsChanged, ProductEvent, ProductLowStock, ProductOutOfStock,
    ProductPriceChanged, ProductStockChanged,
};
use outbox::OutboxMessage;
use serde_json::Error as JsonError;
use thiserror::Error;

type Decoder = Box<dyn Fn(&str) -> Result<CatalogEvent, JsonError> + Send + Sync>;

/// Why a stored message could not be turned back into an event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unknown event type: {0}")]
    UnknownType(String),

    #[error("Malformed {event_type} payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: JsonError,
    },
}

/// Maps outbox message types to typed decoders.
///
/// Populated once at startup and shared read-only afterwards.
#[derive(Default)]
pub struct EventRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl EventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that knows every event the catalog publishes.
    pub fn catalog() -> Self {
        let mut registry = Self::new();

        registry
            .register::<ProductCreated>(ProductCreated::EVENT_TYPE, |e| {
                ProductEvent::Created(e).into()
            })
            .register::<ProductPriceChanged>(ProductPriceChanged::EVENT_TYPE, |e| {
                ProductEvent::PriceChanged(e).into()
            })
            .register::<ProductStockChanged>(ProductStockChanged::EVENT_TYPE, |e| {
                ProductEvent::StockChanged(e).into()
            })
            .register::<ProductLowStock>(ProductLowStock::EVENT_TYPE, |e| {
                ProductEvent::LowStock(e).into()
            })
            .register::<ProductOutOfStock>(ProductOutOfStock::EVENT_TYPE, |e| {
                ProductEvent::OutOfStock(e).into()
            })
            .register::<ProductActivated>(ProductActivated::EVENT_TYPE, |e| {
                ProductEvent::Activated(e).into()
            })
            .register::<ProductDeactivated>(ProductDeactivated::EVENT_TYPE, |e| {
                ProductEvent::Deactivated(e).into()
            })
            .register::<ProductDetailsChanged>(ProductDetailsChanged::EVENT_TYPE, |e| {
                ProductEvent::DetailsChanged(e).into()
            })
            .register::<ProductDeleted>(ProductDeleted::EVENT_TYPE, |e| {
                ProductEvent::Deleted(e).into()
            });

        registry
            .register::<CategoryCreated>(CategoryCreated::EVENT_TYPE, |e| {
                CategoryEvent::Created(e).into()
            })
            .register::<CategoryRenamed>(CategoryRenamed::EVENT_TYPE, |e| {
                CategoryEvent::Renamed(e).into()
            })
            .register::<CategoryActivated>(CategoryActivated::EVENT_TYPE, |e| {
                CategoryEvent::Activated(e).into()
            })
            .register::<CategoryDeactivated>(CategoryDeactivated::EVENT_TYPE, |e| {
                CategoryEvent::Deactivated(e).into()
            })
            .register::<CategoryDeleted>(CategoryDeleted::EVENT_TYPE, |e| {
                CategoryEvent::Deleted(e).into()
            });

        registry
    }

    /// Registers the payload type `T` under `event_type`.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register<T>(
        &mut self,
        event_type: &'static str,
        wrap: fn(T) -> CatalogEvent,
    ) -> &mut Self
    where
        T: serde::de::DeserializeOwned + 'static,
    {
        self.decoders.insert(
            event_type,
            Box::new(move |content: &str| serde_json::from_str::<T>(content).map(wrap)),
        );
        self
    }

    /// Returns true if `event_type` has a decoder.
    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decodes a stored message into its event.
    pub fn decode(&self, message: &OutboxMessage) -> Result<CatalogEvent, DecodeError> {
        let decoder = self
            .decoders
            .get(message.message_type.as_str())
            .ok_or_else(|| DecodeError::UnknownType(message.message_type.clone()))?;

        decoder(&message.content).map_err(|source| DecodeError::Malformed {
            event_type: message.message_type.clone(),
            source,
        })
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.decoders.keys().collect();
        types.sort();
        f.debug_struct("EventRegistry")
            .field("event_types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::AggregateId;
    use domain::{Category, DomainEvent, Money, NewCategory, NewProduct, Product};
    use outbox::TrackedAggregate;

    fn to_messages(aggregate: &dyn TrackedAggregate) -> Vec<OutboxMessage> {
        aggregate
            .pending_events()
            .unwrap()
            .into_iter()
            .map(|e| OutboxMessage::new(e.event_type, e.content, e.occurred_at))
            .collect()
    }

    /// Raises every catalog event once and returns each with its stored form.
    fn every_event() -> Vec<(CatalogEvent, OutboxMessage)> {
        let mut product = Product::create(NewProduct {
            name: "Widget".to_string(),
            sku: None,
            description: String::new(),
            price: Money::parse(1000, "EUR").unwrap(),
            initial_stock: 50,
            category_id: AggregateId::new(),
            created_by: "alice".to_string(),
        })
        .unwrap();
        product
            .update_price(Money::parse(1200, "EUR").unwrap(), "bob")
            .unwrap();
        product.update_stock(5, "bob", "recount").unwrap();
        product.update_stock(0, "bob", "sold out").unwrap();
        product
            .update_details("Widget Pro", "Now with more widget", "bob")
            .unwrap();
        product.deactivate("bob", "seasonal").unwrap();
        product.activate("bob").unwrap();
        product.deactivate("bob", "discontinued").unwrap();
        product.mark_as_deleted("bob", Some("cleanup")).unwrap();

        let mut category = Category::create_root(NewCategory {
            name: "Garden".to_string(),
            slug: None,
            description: String::new(),
            created_by: "alice".to_string(),
        })
        .unwrap();
        category.rename("Garden & Patio", None, "bob").unwrap();
        category.deactivate("bob", "restructure").unwrap();
        category.activate("bob").unwrap();
        category.deactivate("bob", "merged").unwrap();
        category.mark_as_deleted("bob", None).unwrap();

        let product_events = product.events().iter().cloned().map(CatalogEvent::from);
        let category_events = category.events().iter().cloned().map(CatalogEvent::from);
        let messages = to_messages(&product)
            .into_iter()
            .chain(to_messages(&category));

        product_events.chain(category_events).zip(messages).collect()
    }

    #[test]
    fn catalog_registers_every_event_type() {
        let registry = EventRegistry::catalog();
        assert_eq!(registry.len(), 14);
        assert!(registry.contains(ProductCreated::EVENT_TYPE));
        assert!(registry.contains(CategoryDeleted::EVENT_TYPE));
        assert!(!registry.contains("catalog.product.created.v2"));
    }

    #[test]
    fn every_event_decodes_to_an_identical_value() {
        let registry = EventRegistry::catalog();
        let events = every_event();

        let mut types: Vec<_> = events.iter().map(|(e, _)| e.event_type()).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), registry.len());

        for (original, message) in events {
            assert_eq!(message.message_type, original.event_type());
            let decoded = registry.decode(&message).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn unknown_type_is_reported() {
        let registry = EventRegistry::catalog();
        let message = OutboxMessage::new("catalog.product.teleported.v1", "{}", Utc::now());

        assert!(matches!(
            registry.decode(&message),
            Err(DecodeError::UnknownType(t)) if t == "catalog.product.teleported.v1"
        ));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let registry = EventRegistry::catalog();
        let message =
            OutboxMessage::new(ProductCreated::EVENT_TYPE, "{\"productId\":", Utc::now());

        assert!(matches!(
            registry.decode(&message),
            Err(DecodeError::Malformed { .. })
        ));
    }
}
