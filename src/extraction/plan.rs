//! Extraction plans: what to query, how to validate it and how to merge it
//!
//! A plan bundles a query template, the record schema handed to the validator, the edge
//! collection strategy and the merge rule that turns one valid record into node upserts
//! and edges. The pagination driver is generic over plans.

use crate::core::{Edge, EdgeStrategy, EntityId, Node, PipelineState};
use crate::extraction::catalog::EntityCategory;
use crate::extraction::query::QueryTemplate;
use crate::extraction::record::ValidRecord;
use crate::extraction::schema::{FieldKind, RecordSchema};
use crate::extraction::validator::RecordValidationError;

/// File names of a plan's final tables. `None` means the plan produces no such table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub nodes: Option<String>,
    pub edges: Option<String>,
}

pub trait ExtractionPlan: Send + Sync {
    fn name(&self) -> &str;

    fn query(&self) -> &QueryTemplate;

    fn schema(&self) -> &RecordSchema;

    fn edge_strategy(&self) -> EdgeStrategy;

    /// Merge one valid record into `state`. Either the whole record is merged or, on error,
    /// nothing is.
    fn merge(&self, record: &ValidRecord, state: &mut PipelineState)
        -> Result<(), RecordValidationError>;

    /// Count used to tag checkpoints and decide when one is due.
    fn progress(&self, state: &PipelineState) -> u64 {
        state.edge_count() as u64
    }

    fn output_files(&self) -> OutputFiles;
}

/// Entity id from the URI in `field`.
fn entity_id(record: &ValidRecord, field: &str) -> Result<EntityId, RecordValidationError> {
    let uri = record
        .text(field)
        .ok_or_else(|| RecordValidationError::MissingField(field.to_string()))?;
    EntityId::from_uri(uri).ok_or_else(|| RecordValidationError::EmptyIdentifier(field.to_string()))
}

fn literal<'a>(record: &'a ValidRecord, field: &str) -> Result<&'a str, RecordValidationError> {
    record.text(field).ok_or_else(|| RecordValidationError::MissingField(field.to_string()))
}

/// Events connected by "has cause" / "immediate cause of".
#[derive(Debug, Clone)]
pub struct CausalityPlan {
    query: QueryTemplate,
    schema: RecordSchema,
}

impl CausalityPlan {
    pub const TYPE_TAG: &'static str = "Entity";

    pub fn new() -> Self {
        Self {
            query: QueryTemplate::causality(),
            schema: RecordSchema::new()
                .require("event1", FieldKind::Uri)
                .require("event1Label", FieldKind::Literal)
                .require("event2", FieldKind::Uri)
                .require("event2Label", FieldKind::Literal)
                .require("causeType", FieldKind::Literal),
        }
    }
}

impl Default for CausalityPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionPlan for CausalityPlan {
    fn name(&self) -> &str {
        "causes"
    }

    fn query(&self) -> &QueryTemplate {
        &self.query
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn edge_strategy(&self) -> EdgeStrategy {
        EdgeStrategy::Ordered
    }

    fn merge(
        &self,
        record: &ValidRecord,
        state: &mut PipelineState,
    ) -> Result<(), RecordValidationError> {
        let cause = entity_id(record, "event1")?;
        let effect = entity_id(record, "event2")?;
        let cause_label = literal(record, "event1Label")?;
        let effect_label = literal(record, "event2Label")?;
        let relation = literal(record, "causeType")?;

        state.nodes.upsert(Node::new(cause.clone(), cause_label, Self::TYPE_TAG));
        state.nodes.upsert(Node::new(effect.clone(), effect_label, Self::TYPE_TAG));
        state.edges.add(Edge::new(cause, effect, relation));
        Ok(())
    }

    fn output_files(&self) -> OutputFiles {
        OutputFiles {
            nodes: Some("nodes.csv".to_string()),
            edges: Some("relationships.csv".to_string()),
        }
    }
}

/// "Influenced by" pairs, stored as influencer -> influenced.
#[derive(Debug, Clone)]
pub struct InfluencePlan {
    query: QueryTemplate,
    schema: RecordSchema,
}

impl InfluencePlan {
    pub const RELATION: &'static str = "INFLUENCED";

    pub fn new() -> Self {
        Self {
            query: QueryTemplate::influence(),
            schema: RecordSchema::new()
                .require("influenced_entity", FieldKind::Uri)
                .require("influencer_entity", FieldKind::Uri),
        }
    }
}

impl Default for InfluencePlan {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionPlan for InfluencePlan {
    fn name(&self) -> &str {
        "influences"
    }

    fn query(&self) -> &QueryTemplate {
        &self.query
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn edge_strategy(&self) -> EdgeStrategy {
        EdgeStrategy::UniquePairs
    }

    fn merge(
        &self,
        record: &ValidRecord,
        state: &mut PipelineState,
    ) -> Result<(), RecordValidationError> {
        let influenced = entity_id(record, "influenced_entity")?;
        let influencer = entity_id(record, "influencer_entity")?;
        state.edges.add(Edge::new(influencer, influenced, Self::RELATION));
        Ok(())
    }

    fn output_files(&self) -> OutputFiles {
        OutputFiles { nodes: None, edges: Some("relationships.csv".to_string()) }
    }
}

/// Entities of one catalog category, with the category's optional properties.
#[derive(Debug, Clone)]
pub struct EntityPlan {
    category: &'static EntityCategory,
    query: QueryTemplate,
    schema: RecordSchema,
}

impl EntityPlan {
    pub fn new(category: &'static EntityCategory) -> Self {
        let schema = category.properties.iter().fold(
            RecordSchema::new()
                .require("entity", FieldKind::Uri)
                .require("entityLabel", FieldKind::Literal),
            |schema, property| schema.optional(property.field_name(), FieldKind::Literal),
        );

        Self { category, query: QueryTemplate::entities(category), schema }
    }
}

impl ExtractionPlan for EntityPlan {
    fn name(&self) -> &str {
        self.category.key
    }

    fn query(&self) -> &QueryTemplate {
        &self.query
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn edge_strategy(&self) -> EdgeStrategy {
        EdgeStrategy::UniquePairs
    }

    fn merge(
        &self,
        record: &ValidRecord,
        state: &mut PipelineState,
    ) -> Result<(), RecordValidationError> {
        let id = entity_id(record, "entity")?;
        let label = literal(record, "entityLabel")?;

        // One row per property combination; the first row for an entity wins
        if state.nodes.contains(&id) {
            return Ok(());
        }

        let node = self.category.properties.iter().fold(
            Node::new(id, label, self.category.type_tag),
            |node, property| match record.text(&property.field_name()) {
                Some(value) => node.with_property(property.name, value),
                None => node,
            },
        );
        state.nodes.upsert(node);
        Ok(())
    }

    fn progress(&self, state: &PipelineState) -> u64 {
        state.node_count() as u64
    }

    fn output_files(&self) -> OutputFiles {
        OutputFiles { nodes: Some(self.category.file_name.to_string()), edges: None }
    }
}
