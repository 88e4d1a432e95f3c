//! `ordering` parameter: comma-separated sort keys, `-` prefix for descending

use std::cmp;
use std::fmt::{self, Display, Formatter};

use super::filter::BookFields;
use super::sql::DatabaseOrderBy;

/// Columns a book list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortField {
    Title,
    PublicationYear,
}

impl BookSortField {
    /// Map a request key to a field; unknown keys yield `None`
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "title" => Some(Self::Title),
            "publication_year" => Some(Self::PublicationYear),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "b.title",
            Self::PublicationYear => "b.publication_year",
        }
    }

    fn compare<B: BookFields + ?Sized>(&self, lhs: &B, rhs: &B) -> cmp::Ordering {
        match self {
            Self::Title => lhs.title().cmp(rhs.title()),
            Self::PublicationYear => lhs.publication_year().cmp(&rhs.publication_year()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingDirection {
    Ascending,
    Descending,
}

impl OrderingDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl Display for OrderingDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingTerm {
    pub field: BookSortField,
    pub direction: OrderingDirection,
}

impl OrderingTerm {
    pub fn asc(field: BookSortField) -> Self {
        Self {
            field,
            direction: OrderingDirection::Ascending,
        }
    }

    pub fn desc(field: BookSortField) -> Self {
        Self {
            field,
            direction: OrderingDirection::Descending,
        }
    }
}

/// Parsed sort order. Never empty: falls back to ascending title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub terms: Vec<OrderingTerm>,
}

impl Default for Ordering {
    fn default() -> Self {
        Self {
            terms: vec![OrderingTerm::asc(BookSortField::Title)],
        }
    }
}

impl Ordering {
    /// Parse `title,-publication_year`. Unknown and repeated keys are dropped.
    pub fn parse(source: Option<&str>) -> Self {
        let mut terms: Vec<OrderingTerm> = Vec::new();

        for part in source.unwrap_or_default().split(',').map(str::trim) {
            let (key, direction) = match part.strip_prefix('-') {
                Some(key) => (key, OrderingDirection::Descending),
                None => (part, OrderingDirection::Ascending),
            };
            let Some(field) = BookSortField::parse(key) else {
                continue;
            };
            if terms.iter().any(|t| t.field == field) {
                continue;
            }
            terms.push(OrderingTerm { field, direction });
        }

        if terms.is_empty() {
            Self::default()
        } else {
            Self { terms }
        }
    }

    /// Compare two records; ties on every term fall back to ascending id.
    pub fn compare<B: BookFields + ?Sized>(&self, lhs: &B, rhs: &B) -> cmp::Ordering {
        for term in &self.terms {
            let ordering = term.field.compare(lhs, rhs);
            let ordering = match term.direction {
                OrderingDirection::Ascending => ordering,
                OrderingDirection::Descending => ordering.reverse(),
            };
            if ordering != cmp::Ordering::Equal {
                return ordering;
            }
        }
        lhs.id().cmp(&rhs.id())
    }
}

impl DatabaseOrderBy for Ordering {
    fn to_sql_order(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{} {}", t.field.column(), t.direction))
            .collect();
        parts.push("b.id ASC".to_string());
        Some(parts.join(", "))
    }
}
