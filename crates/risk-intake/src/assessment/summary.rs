use std::cmp::Ordering;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::RecordId;
use super::repository::StoredSubmission;
use super::viewer::{
    created_at_millis, display_risk_label, format_fixed, meta_number, meta_text, CODE_KEYS,
    LAT_KEYS, LNG_KEYS, NAME_KEYS, PLACEHOLDER,
};

/// Sortable columns of the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Code,
    Coordinates,
    RiskIndex,
    RiskDescription,
}

impl SortKey {
    pub const fn column_label(self) -> &'static str {
        match self {
            SortKey::Name => "Building Name",
            SortKey::Code => "Building Unique Code",
            SortKey::Coordinates => "Coordinates",
            SortKey::RiskIndex => "Risk Index",
            SortKey::RiskDescription => "Risk Description",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Column selection with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    #[serde(default)]
    pub dir: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            dir: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub fn new(key: SortKey, dir: SortDirection) -> Self {
        Self { key, dir }
    }

    /// Header click: same column flips direction, a new column starts ascending.
    pub fn select(self, key: SortKey) -> Self {
        if self.key == key {
            Self {
                key,
                dir: self.dir.reversed(),
            }
        } else {
            Self {
                key,
                dir: SortDirection::Asc,
            }
        }
    }
}

/// Comparable value of one row under a sort key.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Number(f64),
    Text(String),
}

/// One row of the summary table, with raw sort inputs and display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub id: RecordId,
    pub building_name: Option<String>,
    pub building_unique_code: Option<String>,
    pub coordinates_lat: Option<f64>,
    pub coordinates_lng: Option<f64>,
    pub score: Option<f64>,
    pub risk: Option<String>,
    pub reasons: Vec<String>,
    #[serde(skip)]
    pub created_at_millis: i64,
}

impl SummaryRow {
    pub fn from_stored(record: &StoredSubmission) -> Self {
        let document = &record.document;
        let meta = document.get("meta").unwrap_or(&Value::Null);
        let prediction = document.get("prediction").unwrap_or(&Value::Null);

        Self {
            id: record.id.clone(),
            building_name: meta_text(meta, &NAME_KEYS),
            building_unique_code: meta_text(meta, &CODE_KEYS),
            coordinates_lat: meta_number(meta, &LAT_KEYS),
            coordinates_lng: meta_number(meta, &LNG_KEYS),
            score: prediction
                .get("score")
                .and_then(Value::as_f64)
                .filter(|score| score.is_finite()),
            risk: prediction
                .get("risk")
                .and_then(Value::as_str)
                .map(str::to_string),
            reasons: prediction
                .get("reasons")
                .and_then(Value::as_array)
                .map(|reasons| {
                    reasons
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            created_at_millis: created_at_millis(document),
        }
    }

    fn sort_value(&self, key: SortKey) -> SortValue {
        let lower = |value: Option<&str>| SortValue::Text(value.unwrap_or_default().to_lowercase());
        match key {
            SortKey::Name => lower(self.building_name.as_deref()),
            SortKey::Code => lower(self.building_unique_code.as_deref()),
            SortKey::Coordinates => {
                let part = |value: Option<f64>| value.map(|value| value.to_string()).unwrap_or_default();
                SortValue::Text(format!(
                    "{},{}",
                    part(self.coordinates_lat),
                    part(self.coordinates_lng)
                ))
            }
            SortKey::RiskIndex => SortValue::Number(self.score.unwrap_or(-1.0)),
            SortKey::RiskDescription => {
                let reasons = self.reasons.join("; ").to_lowercase();
                if reasons.is_empty() {
                    lower(self.risk.as_deref())
                } else {
                    SortValue::Text(reasons)
                }
            }
        }
    }

    pub fn name_display(&self) -> String {
        self.building_name
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn code_display(&self) -> String {
        self.building_unique_code
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn coordinates_display(&self) -> String {
        match (self.coordinates_lat, self.coordinates_lng) {
            (Some(lat), Some(lng)) => format!("{lat:.5}, {lng:.5}"),
            _ => PLACEHOLDER.to_string(),
        }
    }

    pub fn risk_index_display(&self) -> String {
        format_fixed(self.score, 3)
    }

    pub fn description_display(&self) -> String {
        if self.reasons.is_empty() {
            display_risk_label(self.risk.as_deref().unwrap_or_default())
        } else {
            self.reasons.join(" • ")
        }
    }

    pub fn display(&self) -> SummaryRowView {
        SummaryRowView {
            id: self.id.clone(),
            building_name: self.name_display(),
            building_unique_code: self.code_display(),
            coordinates: self.coordinates_display(),
            risk_index: self.risk_index_display(),
            risk_description: self.description_display(),
        }
    }
}

fn compare(left: &SortValue, right: &SortValue) -> Ordering {
    match (left, right) {
        (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
        (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
        (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
        (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
    }
}

/// Display strings of one table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRowView {
    pub id: RecordId,
    pub building_name: String,
    pub building_unique_code: String,
    pub coordinates: String,
    pub risk_index: String,
    pub risk_description: String,
}

/// The owner's records, newest first unless a column sort is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryList {
    rows: Vec<SummaryRow>,
    sort: Option<SortState>,
}

impl SummaryList {
    pub fn from_records(records: &[StoredSubmission]) -> Self {
        let mut rows: Vec<SummaryRow> = records.iter().map(SummaryRow::from_stored).collect();
        rows.sort_by(|left, right| right.created_at_millis.cmp(&left.created_at_millis));
        Self { rows, sort: None }
    }

    /// Stable sort; ties keep their newest-first order.
    pub fn sorted_by(mut self, sort: SortState) -> Self {
        self.rows.sort_by(|left, right| {
            let ordering = compare(&left.sort_value(sort.key), &right.sort_value(sort.key));
            match sort.dir {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        self.sort = Some(sort);
        self
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    pub fn views(&self) -> Vec<SummaryRowView> {
        self.rows.iter().map(SummaryRow::display).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with the on-screen column headers.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "Id",
            SortKey::Name.column_label(),
            SortKey::Code.column_label(),
            SortKey::Coordinates.column_label(),
            SortKey::RiskIndex.column_label(),
            SortKey::RiskDescription.column_label(),
        ])?;
        for view in self.views() {
            csv.write_record([
                view.id.0.as_str(),
                view.building_name.as_str(),
                view.building_unique_code.as_str(),
                view.coordinates.as_str(),
                view.risk_index.as_str(),
                view.risk_description.as_str(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}
