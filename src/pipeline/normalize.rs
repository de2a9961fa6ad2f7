use regex::Regex;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:sql|json)?[ \t]*\r?\n?").expect("valid fence pattern"));

static TRAILING_SEMICOLONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;\s]*;\s*$").expect("valid semicolon pattern"));

/// Removes every code-fence marker, bare or tagged `sql`/`json`.
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text, "").into_owned()
}

/// Reduces raw SQL-flow model output to a single statement.
///
/// Fences and trailing semicolons are dropped; if several lines remain, the
/// first one that starts with `SELECT` is taken. When no line does, the
/// cleaned text is returned as-is and validation will reject it.
pub fn normalize_sql(raw: &str) -> String {
    let cleaned = strip_code_fences(raw.trim());
    let cleaned = TRAILING_SEMICOLONS.replace(cleaned.trim(), "");
    let cleaned = cleaned.trim();

    cleaned
        .lines()
        .map(str::trim)
        .find(|line| line.to_uppercase().starts_with("SELECT"))
        .map(|line| line.trim_end_matches(';').trim_end())
        .unwrap_or(cleaned)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_sql_is_unchanged() {
        let sql = "SELECT * FROM sales_data WHERE price > 100";
        assert_eq!(normalize_sql(sql), sql);
        assert_eq!(normalize_sql(&normalize_sql(sql)), sql);
    }

    #[test]
    fn strips_language_tagged_fence() {
        let raw = "```sql\nSELECT category FROM sales_data\n```";
        assert_eq!(normalize_sql(raw), "SELECT category FROM sales_data");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\nSELECT 1 FROM sales_data\n```\n";
        assert_eq!(normalize_sql(raw), "SELECT 1 FROM sales_data");
    }

    #[test]
    fn strips_trailing_semicolons() {
        assert_eq!(normalize_sql("SELECT 1 FROM sales_data;;"), "SELECT 1 FROM sales_data");
        assert_eq!(normalize_sql("SELECT 1 FROM sales_data ; \n"), "SELECT 1 FROM sales_data");
    }

    #[test]
    fn picks_first_select_line_out_of_prose() {
        let raw = "Here is the query you asked for:\n\nselect * from sales_data limit 5;\nThis returns five rows.";
        assert_eq!(normalize_sql(raw), "select * from sales_data limit 5");
    }

    #[test]
    fn first_of_several_select_lines_wins() {
        let raw = "SELECT a FROM sales_data\nSELECT b FROM sales_data";
        assert_eq!(normalize_sql(raw), "SELECT a FROM sales_data");
    }

    #[test]
    fn text_without_select_is_returned_trimmed() {
        let raw = "  DELETE FROM sales_data;  ";
        assert_eq!(normalize_sql(raw), "DELETE FROM sales_data");
        assert_eq!(normalize_sql("I cannot help with that."), "I cannot help with that.");
    }

    #[test]
    fn inline_fence_keeps_the_statement() {
        assert_eq!(normalize_sql("```SELECT 1 FROM sales_data```"), "SELECT 1 FROM sales_data");
    }

    #[test]
    fn fence_stripping_leaves_inner_text() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}\n");
    }
}
