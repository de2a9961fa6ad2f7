//! Instruction templates for the two generation flows.
//!
//! Both prompts are pure functions of the table name, the introspected schema
//! and (for charts) the requested chart type, so the same inputs always yield
//! the same text.

use std::fmt::Write;

use crate::db::SchemaColumn;
use crate::pipeline::models::{ChartConfig, ChartType, GeneratedArtifact, GenerationRequest};

/// The instruction context and the user's question, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const DATE_RULES: &str = "\
IMPORTANT DATE FORMAT INFORMATION:
- All dates are stored as DATE values in 'YYYY-MM-DD' format (e.g., '2023-01-15')
- NEVER use LIKE '%MonthName%' or any substring matching for date filtering
- Use proper DuckDB date functions:
  * year(date_column) = 2023
  * month(date_column) = 1 (for January)
  * quarter(date_column) = 1
  * strftime(date_column, '%Y-%m') = '2023-01'
  * strftime(date_column, '%B') = 'January' (for display only)
  * date_trunc('month', date_column) for monthly buckets
  * WHERE date_column BETWEEN DATE '2023-01-01' AND DATE '2023-01-31'";

const OUTPUT_FORMAT: &str = r#"{
  "sqlQuery": "SELECT statement here",
  "chartConfig": {
    "type": "chart-type",
    "title": "Chart Title",
    "description": "Brief description",
    "dataKey": "column_name_for_values",
    "categoryKey": "column_name_for_categories"
  }
}"#;

/// A worked example; `{table}` in the SQL is replaced with the target table.
pub struct ChartExample {
    pub question: &'static str,
    pub sql: &'static str,
    pub chart_type: ChartType,
    pub title: &'static str,
    pub description: &'static str,
    pub data_key: &'static str,
    pub category_key: Option<&'static str>,
}

impl ChartExample {
    pub fn artifact(&self, table: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            sql_query: self.sql.replace("{table}", table),
            chart_config: ChartConfig {
                chart_type: self.chart_type,
                title: self.title.to_string(),
                description: self.description.to_string(),
                data_key: self.data_key.to_string(),
                category_key: self.category_key.map(str::to_string),
                value_key: None,
                color: None,
            },
        }
    }
}

pub const CHART_EXAMPLES: &[ChartExample] = &[
    ChartExample {
        question: "What's the total revenue?",
        sql: "SELECT SUM(price * quantity) AS total_revenue FROM {table}",
        chart_type: ChartType::NumberCard,
        title: "Total Revenue",
        description: "All-time revenue",
        data_key: "total_revenue",
        category_key: None,
    },
    ChartExample {
        question: "Show sales by category",
        sql: "SELECT category, SUM(price * quantity) AS total_sales FROM {table} GROUP BY category ORDER BY total_sales DESC",
        chart_type: ChartType::BarChart,
        title: "Sales by Category",
        description: "Total sales broken down by product category",
        data_key: "total_sales",
        category_key: Some("category"),
    },
    ChartExample {
        question: "Sales by month for 2023",
        sql: "SELECT strftime(sales_date, '%Y-%m') AS month, SUM(price * quantity) AS total_sales FROM {table} WHERE year(sales_date) = 2023 GROUP BY strftime(sales_date, '%Y-%m') ORDER BY month",
        chart_type: ChartType::LineChart,
        title: "Monthly Sales 2023",
        description: "Sales trends by month",
        data_key: "total_sales",
        category_key: Some("month"),
    },
    ChartExample {
        question: "Revenue in March 2023",
        sql: "SELECT SUM(price * quantity) AS total_revenue FROM {table} WHERE year(sales_date) = 2023 AND month(sales_date) = 3",
        chart_type: ChartType::NumberCard,
        title: "March 2023 Revenue",
        description: "Total revenue for March 2023",
        data_key: "total_revenue",
        category_key: None,
    },
    ChartExample {
        question: "Quarterly sales",
        sql: "SELECT concat('Q', quarter(sales_date), ' ', year(sales_date)) AS quarter, SUM(price * quantity) AS total_sales FROM {table} GROUP BY year(sales_date), quarter(sales_date) ORDER BY year(sales_date), quarter(sales_date)",
        chart_type: ChartType::BarChart,
        title: "Quarterly Sales",
        description: "Sales by quarter",
        data_key: "total_sales",
        category_key: Some("quarter"),
    },
    ChartExample {
        question: "Annual sales trend",
        sql: "SELECT year(sales_date) AS year, SUM(price * quantity) AS total_sales FROM {table} GROUP BY year(sales_date) ORDER BY year",
        chart_type: ChartType::LineChart,
        title: "Annual Sales Trend",
        description: "Sales growth by year",
        data_key: "total_sales",
        category_key: Some("year"),
    },
];

/// (question, SQL) pairs for the SQL-only flow.
pub const SQL_EXAMPLES: &[(&str, &str)] = &[
    ("Show me all products", "SELECT * FROM {table}"),
    (
        "Get products with price greater than 100",
        "SELECT * FROM {table} WHERE price > 100",
    ),
    (
        "Show top 5 expensive products",
        "SELECT * FROM {table} ORDER BY price DESC LIMIT 5",
    ),
    ("Find electronics", "SELECT * FROM {table} WHERE category = 'Electronics'"),
];

pub struct PromptBuilder {
    table_name: String,
}

impl PromptBuilder {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    /// Prompt for the chart flow: SQL plus a chart configuration as one JSON object.
    pub fn chart_prompt(&self, request: &GenerationRequest) -> Prompt {
        let mut system = String::from(
            "You are a data visualization expert. Given a natural language query, generate:\n\
             1. A DuckDB SELECT query to get the data\n\
             2. A chart configuration specifying the best visualization\n\n",
        );

        self.push_schema(&mut system, &request.schema);
        system.push('\n');
        system.push_str(DATE_RULES);
        system.push_str("\n\nAvailable chart types:\n");
        for chart_type in ChartType::ALL {
            let _ = writeln!(system, "- {}: {}", chart_type, chart_type.guidance());
        }
        system.push('\n');

        match request.requested_chart_type {
            Some(chart_type) => {
                let _ = writeln!(
                    system,
                    "User requested chart type: {}. Use this chart type and shape the query to suit it.",
                    chart_type
                );
            }
            None => system.push_str("Suggest the most appropriate chart type.\n"),
        }

        system.push_str(
            "\nReturn ONLY a JSON object in this exact format, without markdown fences or explanation:\n",
        );
        system.push_str(OUTPUT_FORMAT);
        system.push_str("\n\nThe object must contain exactly the keys \"sqlQuery\" and \"chartConfig\". ");
        system.push_str("\"categoryKey\" may be omitted when the result has no category column.\n\n");

        let _ = write!(
            system,
            "Rules for SQL:\n\
             - Only SELECT statements that read from '{table}'\n\
             - Use aggregate functions for number-card (COUNT, SUM, AVG, etc.)\n\
             - For charts with categories, include GROUP BY\n\
             - For time series, ensure proper date ordering\n\
             - Use aliases for clarity (e.g., AS total_sales)\n\
             - dataKey and categoryKey must be column names or aliases returned by the query\n\
             - No semicolons\n\
             - For time-based queries, use proper date functions, NOT string matching\n\n\
             Examples:\n",
            table = self.table_name
        );

        for example in CHART_EXAMPLES {
            let artifact = example.artifact(&self.table_name);
            let rendered = serde_json::to_string_pretty(&artifact).unwrap_or_default();
            let _ = write!(
                system,
                "\nQuery: \"{}\"\nResponse:\n{}\n",
                example.question, rendered
            );
        }

        Prompt {
            system,
            user: request.natural_language_query.clone(),
        }
    }

    /// Prompt for the SQL-only flow: no chart taxonomy, bare SQL back.
    pub fn sql_prompt(&self, natural_language_query: &str, schema: &[SchemaColumn]) -> Prompt {
        let mut system = String::from(
            "You are a SQL expert. Convert natural language queries to valid DuckDB SQL queries.\n\n",
        );

        self.push_schema(&mut system, schema);

        let _ = write!(
            system,
            "\nRules:\n\
             1. Only generate SELECT queries\n\
             2. Always use proper SQL syntax for DuckDB\n\
             3. Use appropriate WHERE clauses for filtering\n\
             4. Use ORDER BY for sorting\n\
             5. Use LIMIT for restricting results\n\
             6. Return ONLY the SQL query without any explanation or markdown formatting\n\
             7. Do not include semicolons at the end\n\
             8. Use single quotes for string literals\n\
             9. Table name is always '{table}'\n\
             10. Be precise and use exact column names from the schema\n\n\
             {date_rules}\n\n\
             Examples:\n",
            table = self.table_name,
            date_rules = DATE_RULES
        );

        for (question, sql) in SQL_EXAMPLES {
            let _ = write!(
                system,
                "\nNatural: \"{}\"\nSQL: {}\n",
                question,
                sql.replace("{table}", &self.table_name)
            );
        }

        Prompt {
            system,
            user: natural_language_query.to_string(),
        }
    }

    fn push_schema(&self, out: &mut String, schema: &[SchemaColumn]) {
        let _ = writeln!(out, "Database Schema for table '{}':", self.table_name);
        for column in schema {
            let _ = writeln!(
                out,
                "- {} ({}){}",
                column.name,
                column.data_type,
                if column.is_primary_key { " PRIMARY KEY" } else { "" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generate::decode_artifact;
    use crate::pipeline::validate::SqlValidator;
    use crate::test_support::{sales_schema, seeded_connection};
    use regex::Regex;

    fn request(chart_type: Option<ChartType>) -> GenerationRequest {
        GenerationRequest {
            natural_language_query: "Show sales by category".to_string(),
            schema: sales_schema(),
            requested_chart_type: chart_type,
        }
    }

    #[test]
    fn chart_prompt_lists_every_column_with_its_type() {
        let prompt = PromptBuilder::new("sales_data").chart_prompt(&request(None));
        assert!(prompt.system.contains("Database Schema for table 'sales_data':"));
        assert!(prompt.system.contains("- id (INTEGER) PRIMARY KEY"));
        for column in sales_schema() {
            assert!(
                prompt.system.contains(&format!("- {} ({})", column.name, column.data_type)),
                "missing column {}",
                column.name
            );
        }
    }

    #[test]
    fn chart_prompt_lists_every_chart_type() {
        let prompt = PromptBuilder::new("sales_data").chart_prompt(&request(None));
        for chart_type in ChartType::ALL {
            assert!(prompt.system.contains(&format!("- {}: ", chart_type)));
        }
    }

    #[test]
    fn chart_prompt_carries_date_rules() {
        let prompt = PromptBuilder::new("sales_data").chart_prompt(&request(None));
        assert!(prompt.system.contains("'YYYY-MM-DD'"));
        assert!(prompt.system.contains("NEVER use LIKE"));
        assert!(prompt.system.contains("year(date_column)"));
    }

    #[test]
    fn requested_type_is_stated_as_a_constraint() {
        let builder = PromptBuilder::new("sales_data");
        let open = builder.chart_prompt(&request(None));
        let fixed = builder.chart_prompt(&request(Some(ChartType::PieChart)));

        assert!(open.system.contains("Suggest the most appropriate chart type."));
        assert!(fixed.system.contains("User requested chart type: pie-chart."));
        assert!(!fixed.system.contains("Suggest the most appropriate chart type."));
    }

    #[test]
    fn user_message_is_forwarded_verbatim() {
        let prompt = PromptBuilder::new("sales_data").chart_prompt(&request(None));
        assert_eq!(prompt.user, "Show sales by category");
    }

    #[test]
    fn prompts_are_deterministic() {
        let builder = PromptBuilder::new("sales_data");
        assert_eq!(builder.chart_prompt(&request(None)), builder.chart_prompt(&request(None)));
        assert_eq!(
            builder.sql_prompt("q", &sales_schema()),
            builder.sql_prompt("q", &sales_schema())
        );
    }

    #[test]
    fn table_name_is_injected() {
        let prompt = PromptBuilder::new("orders").chart_prompt(&request(None));
        assert!(prompt.system.contains("FROM orders"));
        assert!(!prompt.system.contains("sales_data"));
    }

    #[test]
    fn examples_decode_through_the_model_output_decoder() {
        for example in CHART_EXAMPLES {
            let rendered = serde_json::to_string_pretty(&example.artifact("sales_data")).unwrap();
            let decoded = decode_artifact(&rendered).unwrap();
            assert_eq!(decoded, example.artifact("sales_data"));
        }
    }

    #[test]
    fn example_data_keys_match_sql_aliases() {
        let alias = Regex::new(r"(?i)\bAS\s+(\w+)").unwrap();
        for example in CHART_EXAMPLES {
            let aliases: Vec<&str> = alias
                .captures_iter(example.sql)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            assert!(
                aliases.contains(&example.data_key),
                "{}: dataKey {} not among {:?}",
                example.question,
                example.data_key,
                aliases
            );
        }
    }

    #[test]
    fn examples_cover_the_required_query_shapes() {
        let types: Vec<ChartType> = CHART_EXAMPLES.iter().map(|e| e.chart_type).collect();
        assert!(types.contains(&ChartType::NumberCard));
        assert!(types.contains(&ChartType::BarChart));
        assert!(types.contains(&ChartType::LineChart));
        assert!(CHART_EXAMPLES.iter().any(|e| e.sql.contains("quarter(")));
        assert!(CHART_EXAMPLES.iter().any(|e| e.sql.contains("GROUP BY year(")));
    }

    #[test]
    fn example_sql_passes_static_checks_and_plans() {
        let validator = SqlValidator::new("sales_data");
        let conn = seeded_connection();
        let sql_only = SQL_EXAMPLES.iter().map(|(_, sql)| *sql);
        for sql in CHART_EXAMPLES.iter().map(|e| e.sql).chain(sql_only) {
            let sql = sql.replace("{table}", "sales_data");
            assert_eq!(validator.check_static(&sql), None, "{}", sql);
            crate::db::rows::explain(&conn, &sql).unwrap_or_else(|e| panic!("{}: {}", sql, e));
        }
    }

    #[test]
    fn sql_prompt_has_no_chart_taxonomy() {
        let prompt = PromptBuilder::new("sales_data").sql_prompt("Find electronics", &sales_schema());
        assert!(prompt.system.contains("- price (DOUBLE)"));
        assert!(prompt.system.contains("Table name is always 'sales_data'"));
        assert!(prompt.system.contains("SQL: SELECT * FROM sales_data WHERE category = 'Electronics'"));
        assert!(!prompt.system.contains("number-card"));
        assert_eq!(prompt.user, "Find electronics");
    }
}
