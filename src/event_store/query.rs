// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative event filters
//!
//! A [`SearchQuery`] is a disjunction of [`AggregateFilter`]s, narrowed by
//! optional instance, resource owner and position bounds:
//!
//! ```text
//! instance ∧ owner ∧ position > after ∧ (filter₁ ∨ filter₂ ∨ …)
//! ```
//!
//! An empty field inside a filter matches everything, so a query without
//! filters selects the whole (instance-scoped) log.

use crate::events::{Aggregate, AggregateType, StoredEvent};

/// Criteria on aggregate type, aggregate id and event type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    aggregate_types: Vec<AggregateType>,
    aggregate_ids: Vec<String>,
    event_types: Vec<String>,
}

impl AggregateFilter {
    pub fn new(aggregate_type: AggregateType) -> Self {
        Self {
            aggregate_types: vec![aggregate_type],
            ..Self::default()
        }
    }

    pub fn aggregate_id(mut self, id: impl Into<String>) -> Self {
        self.aggregate_ids.push(id.into());
        self
    }

    pub fn aggregate_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types.extend(event_types.into_iter().map(Into::into));
        self
    }

    fn matches(&self, aggregate: &Aggregate, event_type: &str) -> bool {
        (self.aggregate_types.is_empty() || self.aggregate_types.contains(&aggregate.aggregate_type))
            && (self.aggregate_ids.is_empty() || self.aggregate_ids.iter().any(|id| *id == aggregate.id))
            && (self.event_types.is_empty() || self.event_types.iter().any(|t| t == event_type))
    }
}

/// Filter over the event log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    instance_id: Option<String>,
    resource_owner: Option<String>,
    position_after: Option<u64>,
    filters: Vec<AggregateFilter>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn resource_owner(mut self, resource_owner: impl Into<String>) -> Self {
        self.resource_owner = Some(resource_owner.into());
        self
    }

    /// Only events persisted after `position`
    pub fn position_after(mut self, position: u64) -> Self {
        self.position_after = Some(position);
        self
    }

    pub fn filter(mut self, filter: AggregateFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Evaluate the query against the identifying parts of an event
    pub fn matches(&self, aggregate: &Aggregate, event_type: &str, position: u64) -> bool {
        if self
            .instance_id
            .as_ref()
            .is_some_and(|instance| *instance != aggregate.instance_id)
        {
            return false;
        }
        if self
            .resource_owner
            .as_ref()
            .is_some_and(|owner| *owner != aggregate.resource_owner)
        {
            return false;
        }
        if self.position_after.is_some_and(|after| position <= after) {
            return false;
        }
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(aggregate, event_type))
    }

    pub fn matches_event(&self, event: &StoredEvent) -> bool {
        self.matches(&event.aggregate, &event.event_type, event.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_types;

    fn org_aggregate(id: &str) -> Aggregate {
        Aggregate::new(AggregateType::Org, id, id, "instance1")
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = SearchQuery::new();

        assert!(query.matches(&org_aggregate("org1"), event_types::MEMBER_ADDED, 1));
    }

    #[test]
    fn test_filter_narrows_by_type_id_and_event_type() {
        let query = SearchQuery::new().instance_id("instance1").filter(
            AggregateFilter::new(AggregateType::Org)
                .aggregate_id("org1")
                .event_types([event_types::MEMBER_ADDED, event_types::MEMBER_REMOVED]),
        );

        assert!(query.matches(&org_aggregate("org1"), event_types::MEMBER_ADDED, 3));
        assert!(!query.matches(&org_aggregate("org2"), event_types::MEMBER_ADDED, 3));
        assert!(!query.matches(&org_aggregate("org1"), event_types::MEMBER_CHANGED, 3));
    }

    #[test]
    fn test_filters_are_alternatives() {
        let query = SearchQuery::new()
            .filter(AggregateFilter::new(AggregateType::Instance).aggregate_id("instance1"))
            .filter(AggregateFilter::new(AggregateType::Org).aggregate_id("org1"));
        let instance = Aggregate::new(AggregateType::Instance, "instance1", "instance1", "instance1");

        assert!(query.matches(&instance, event_types::LABEL_POLICY_ADDED, 1));
        assert!(query.matches(&org_aggregate("org1"), event_types::LABEL_POLICY_ADDED, 2));
    }

    #[test]
    fn test_scope_bounds() {
        let query = SearchQuery::new()
            .instance_id("instance1")
            .resource_owner("org1")
            .position_after(5);

        assert!(!query.matches(&org_aggregate("org1"), event_types::MEMBER_ADDED, 5));
        assert!(query.matches(&org_aggregate("org1"), event_types::MEMBER_ADDED, 6));
        assert!(!query.matches(&org_aggregate("org2"), event_types::MEMBER_ADDED, 6));

        let other_instance = Aggregate::new(AggregateType::Org, "org1", "org1", "instance2");
        assert!(!query.matches(&other_instance, event_types::MEMBER_ADDED, 6));
    }
}
