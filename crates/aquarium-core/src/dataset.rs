//! Tabular dataset snapshot supplied by the host.
//!
//! A snapshot has one category column (a label plus an identity token per row)
//! and up to [`MAX_SERIES`] numeric series. Either part may be missing; the
//! reconciler treats that as an empty aquarium.

use serde::{Deserialize, Serialize};

use crate::MAX_SERIES;

/// Opaque identity used to correlate selections with other visuals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionToken(pub String);

impl SelectionToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The grouping column: one label and one identity token per row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryColumn {
    pub labels: Vec<String>,
    #[serde(default)]
    pub identities: Vec<SelectionToken>,
}

impl CategoryColumn {
    #[must_use]
    pub fn label(&self, row: usize) -> Option<&str> {
        self.labels.get(row).map(String::as_str)
    }

    /// Identity token for `row`; rows without one fall back to their label.
    #[must_use]
    pub fn identity(&self, row: usize) -> Option<SelectionToken> {
        self.identities
            .get(row)
            .cloned()
            .or_else(|| self.label(row).map(SelectionToken::new))
    }
}

/// One measure column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub values: Vec<Option<f64>>,
}

impl SeriesColumn {
    #[must_use]
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { name: None, values }
    }

    /// Cell value at `row`, or `None` when the cell is empty or not a finite number.
    #[must_use]
    pub fn value(&self, row: usize) -> Option<f64> {
        self.values
            .get(row)
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    }
}

/// Snapshot of the host's categorical data view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetView {
    #[serde(default)]
    pub categories: Option<CategoryColumn>,
    #[serde(default)]
    pub series: Option<Vec<SeriesColumn>>,
}

impl DatasetView {
    /// Builds a view from labels and series, deriving identities from the labels.
    #[must_use]
    pub fn from_columns(labels: Vec<String>, series: Vec<SeriesColumn>) -> Self {
        let identities = labels.iter().cloned().map(SelectionToken).collect();
        Self {
            categories: Some(CategoryColumn { labels, identities }),
            series: Some(series),
        }
    }

    /// Parse a snapshot from JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The category column and the consumed series, or `None` when the view is malformed.
    #[must_use]
    pub fn parts(&self) -> Option<(&CategoryColumn, &[SeriesColumn])> {
        let categories = self.categories.as_ref()?;
        let series = self.series.as_deref()?;
        if series.is_empty() {
            return None;
        }
        let consumed = series.len().min(MAX_SERIES);
        Some((categories, &series[..consumed]))
    }

    /// Rows are counted from the first series, matching how hosts shape the view.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.parts()
            .and_then(|(_, series)| series.first())
            .map_or(0, |first| first.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parts_are_malformed() {
        assert!(DatasetView::default().parts().is_none());
        let no_series = DatasetView {
            categories: Some(CategoryColumn::default()),
            series: Some(Vec::new()),
        };
        assert!(no_series.parts().is_none());
        let no_categories = DatasetView {
            categories: None,
            series: Some(vec![SeriesColumn::new(vec![Some(1.0)])]),
        };
        assert!(no_categories.parts().is_none());
    }

    #[test]
    fn only_first_two_series_are_consumed() {
        let view = DatasetView::from_columns(
            vec!["A".into()],
            vec![
                SeriesColumn::new(vec![Some(1.0)]),
                SeriesColumn::new(vec![Some(2.0)]),
                SeriesColumn::new(vec![Some(3.0)]),
            ],
        );
        let (_, series) = view.parts().expect("well formed");
        assert_eq!(series.len(), 2);
        assert_eq!(view.row_count(), 1);
    }

    #[test]
    fn non_finite_cells_read_as_empty() {
        let column = SeriesColumn::new(vec![Some(f64::NAN), None, Some(4.0), Some(f64::INFINITY)]);
        assert_eq!(column.value(0), None);
        assert_eq!(column.value(1), None);
        assert_eq!(column.value(2), Some(4.0));
        assert_eq!(column.value(3), None);
        assert_eq!(column.value(9), None);
    }

    #[test]
    fn parses_json_with_nulls_and_fallback_identities() {
        let view = DatasetView::from_json_str(
            r#"{
                "categories": { "labels": ["Cod", "Eel"] },
                "series": [ { "name": "Weight", "values": [3.5, null] } ]
            }"#,
        )
        .expect("valid json");
        let (categories, series) = view.parts().expect("well formed");
        assert_eq!(categories.identity(1), Some(SelectionToken::new("Eel")));
        assert_eq!(series[0].value(0), Some(3.5));
        assert_eq!(series[0].value(1), None);
    }
}
