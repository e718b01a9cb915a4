use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{BoundingBox, ResourceType};

/// Field results can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrderingField {
    #[default]
    Name,
}

impl OrderingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingField::Name => "name",
        }
    }
}

/// Axis a search can be constrained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterAxis {
    Title,
    Abstract,
    Keyword,
    TopicCategory,
    ResourceTypes,
    TemporalExtent,
    PublicationDate,
    SpatialExtent,
}

impl FilterAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAxis::Title => "title",
            FilterAxis::Abstract => "abstract",
            FilterAxis::Keyword => "keyword",
            FilterAxis::TopicCategory => "topic_category",
            FilterAxis::ResourceTypes => "resource_types",
            FilterAxis::TemporalExtent => "temporal_extent",
            FilterAxis::PublicationDate => "publication_date",
            FilterAxis::SpatialExtent => "spatial_extent",
        }
    }
}

/// Optional constraints for a catalogue search
///
/// Every field is optional; an unset field places no constraint on its axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub title: Option<String>,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub keywords: Vec<String>,

    pub topic_category: Option<String>,

    pub resource_types: Vec<ResourceType>,

    pub ordering_field: Option<OrderingField>,

    /// Descending order when set
    pub reverse_ordering: bool,

    pub temporal_extent_start: Option<DateTime<Utc>>,
    pub temporal_extent_end: Option<DateTime<Utc>>,

    pub publication_date_start: Option<DateTime<Utc>>,
    pub publication_date_end: Option<DateTime<Utc>>,

    pub spatial_extent: Option<BoundingBox>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn ordered_by(mut self, field: OrderingField, reverse: bool) -> Self {
        self.ordering_field = Some(field);
        self.reverse_ordering = reverse;
        self
    }

    /// Axes that carry a constraint, in declaration order
    pub fn active_axes(&self) -> Vec<FilterAxis> {
        let mut axes = Vec::new();
        if self.title.is_some() {
            axes.push(FilterAxis::Title);
        }
        if self.abstract_text.is_some() {
            axes.push(FilterAxis::Abstract);
        }
        if !self.keywords.is_empty() {
            axes.push(FilterAxis::Keyword);
        }
        if self.topic_category.is_some() {
            axes.push(FilterAxis::TopicCategory);
        }
        if !self.resource_types.is_empty() {
            axes.push(FilterAxis::ResourceTypes);
        }
        if self.temporal_extent_start.is_some() || self.temporal_extent_end.is_some() {
            axes.push(FilterAxis::TemporalExtent);
        }
        if self.publication_date_start.is_some() || self.publication_date_end.is_some() {
            axes.push(FilterAxis::PublicationDate);
        }
        if self.spatial_extent.is_some() {
            axes.push(FilterAxis::SpatialExtent);
        }
        axes
    }
}
