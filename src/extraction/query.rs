//! SPARQL query templates

use crate::extraction::catalog::EntityCategory;

/// Wikidata "influenced by"
pub const INFLUENCED_BY: &str = "wdt:P737";
/// Wikidata "has cause"
pub const HAS_CAUSE: &str = "wdt:P828";
/// Wikidata "immediate cause of"
pub const IMMEDIATE_CAUSE_OF: &str = "wdt:P1478";
/// Wikidata "instance of"
pub const INSTANCE_OF: &str = "wdt:P31";

/// A query body with its filter, type and property clauses already embedded.
/// Pagination clauses are appended per call by [`QueryTemplate::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    body: String,
}

impl QueryTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn render(&self, limit: u64, offset: u64) -> String {
        format!("{}\nLIMIT {}\nOFFSET {}", self.body.trim_end(), limit, offset)
    }

    /// Events linked by "has cause" or "immediate cause of", with the relation name bound to
    /// `?causeType`.
    pub fn causality() -> Self {
        Self::new(format!(
            r#"SELECT ?event1 ?event1Label ?event2 ?event2Label ?causeType
WHERE {{
  {{
    ?event2 {HAS_CAUSE} ?event1.
    BIND("has cause" AS ?causeType)
  }} UNION {{
    ?event2 {IMMEDIATE_CAUSE_OF} ?event1.
    BIND("immediate cause of" AS ?causeType)
  }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "[AUTO_LANGUAGE],en". }}
}}"#
        ))
    }

    /// Every "influenced by" pair.
    pub fn influence() -> Self {
        Self::new(format!(
            r#"SELECT DISTINCT ?influenced_entity ?influencer_entity
WHERE {{
  ?influenced_entity {INFLUENCED_BY} ?influencer_entity.
}}"#
        ))
    }

    /// Entities of `category` that influenced, or were influenced by, anything, with the
    /// category's properties as optional columns.
    pub fn entities(category: &EntityCategory) -> Self {
        let type_filters = category
            .wikidata_types
            .iter()
            .map(|t| format!("{{ ?entity {INSTANCE_OF} {t}. }}"))
            .collect::<Vec<_>>()
            .join(" UNION ");

        let mut selects = Vec::with_capacity(category.properties.len());
        let mut optionals = Vec::with_capacity(category.properties.len());
        for property in category.properties {
            if property.labelled {
                selects.push(format!("?{0} ?{0}Label", property.name));
            } else {
                selects.push(format!("?{}", property.name));
            }
            optionals.push(format!("  OPTIONAL {{ ?entity {} ?{}. }}", property.property, property.name));
        }

        Self::new(format!(
            r#"SELECT DISTINCT ?entity ?entityLabel {selects}
WHERE {{
  {{
    ?entity {INFLUENCED_BY} ?influencer.
    {type_filters}
  }} UNION {{
    ?influenced {INFLUENCED_BY} ?entity.
    {type_filters}
  }}
{optionals}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}}"#,
            selects = selects.join(" "),
            optionals = optionals.join("\n"),
        ))
    }
}
