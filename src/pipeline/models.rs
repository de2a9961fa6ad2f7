use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::SchemaColumn;

/// The closed set of visualizations a generated artifact may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    NumberCard,
    BarChart,
    LineChart,
    PieChart,
    AreaChart,
    DonutChart,
    RadialChart,
    Table,
}

impl ChartType {
    pub const ALL: [ChartType; 8] = [
        ChartType::NumberCard,
        ChartType::BarChart,
        ChartType::LineChart,
        ChartType::AreaChart,
        ChartType::PieChart,
        ChartType::DonutChart,
        ChartType::RadialChart,
        ChartType::Table,
    ];

    /// One line telling the model when this chart fits.
    pub fn guidance(self) -> &'static str {
        match self {
            ChartType::NumberCard => "Single metric/KPI (e.g., \"total sales\", \"average price\")",
            ChartType::BarChart => "Comparing categories (e.g., \"sales by region\")",
            ChartType::LineChart => "Trends over time (e.g., \"sales over months\")",
            ChartType::AreaChart => "Cumulative trends over time",
            ChartType::PieChart => "Parts of a whole (e.g., \"market share by category\")",
            ChartType::DonutChart => "Similar to pie chart",
            ChartType::RadialChart => "Circular progress/comparison",
            ChartType::Table => "Detailed data view",
        }
    }
}

/// Writes the serde wire name, e.g. `number-card`.
impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.serialize(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ChartConfig {
    /// Keys that must name a column of the result set.
    pub fn referenced_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.data_key.as_str())
            .chain(self.category_key.as_deref())
            .chain(self.value_key.as_deref())
    }
}

/// The `{sqlQuery, chartConfig}` pair produced by one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub sql_query: String,
    pub chart_config: ChartConfig,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub natural_language_query: String,
    pub schema: Vec<SchemaColumn>,
    pub requested_chart_type: Option<ChartType>,
}
