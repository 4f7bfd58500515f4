//! 테이블 조회 조건
//! 원격 REST 호출 시에는 쿼리 파라미터로 인코딩되고,
//! 메모리 구현에서는 행(JSON 객체)에 직접 적용된다.

// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

// endregion: --- Imports

// region:    --- Filter

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// 컬럼 조건
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Lt(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// 대소문자 무시 부분 문자열 검색 (검색어는 와일드카드 없이 그대로 비교)
    Contains(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Lt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _)
            | Filter::Contains(c, _) => c,
        }
    }

    /// 행에 조건 적용
    pub fn matches(&self, row: &Value) -> bool {
        let Some(actual) = row.get(self.column()) else {
            return false;
        };
        match self {
            Filter::Eq(_, expected) => {
                actual == expected || compare_values(actual, expected) == Some(Ordering::Equal)
            }
            Filter::Lt(_, bound) => compare_values(actual, bound) == Some(Ordering::Less),
            Filter::Gte(_, bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lte(_, bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::Contains(_, term) => actual
                .as_str()
                .map(|s| s.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(false),
        }
    }

    /// REST 쿼리 파라미터로 변환 (`price=gte.10`)
    /// 부분 문자열 검색은 검색어를 이스케이프한 정규식(`imatch`)으로 보낸다.
    pub fn to_param(&self) -> (String, String) {
        let value = match self {
            Filter::Eq(_, v) => format!("eq.{}", param_value(v)),
            Filter::Lt(_, v) => format!("lt.{}", param_value(v)),
            Filter::Gte(_, v) => format!("gte.{}", param_value(v)),
            Filter::Lte(_, v) => format!("lte.{}", param_value(v)),
            Filter::Contains(_, term) => format!("imatch.{}", regex_escape(term)),
        };
        (self.column().to_string(), value)
    }
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 숫자, 시간(RFC3339), 문자열 순으로 비교
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                x.parse::<DateTime<Utc>>().ok(),
                y.parse::<DateTime<Utc>>().ok(),
            ) {
                (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// 영숫자가 아닌 문자는 모두 리터럴로 이스케이프
fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() * 2);
    for ch in term.chars() {
        if !ch.is_alphanumeric() && !ch.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// endregion: --- Filter

// region:    --- Query

/// 조회 조건 빌더
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), to_value(value)));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Lt(column.to_string(), to_value(value)));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Gte(column.to_string(), to_value(value)));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Lte(column.to_string(), to_value(value)));
        self
    }

    /// 부분 문자열 검색 (대소문자 무시)
    pub fn contains(mut self, column: &str, term: &str) -> Self {
        self.filters
            .push(Filter::Contains(column.to_string(), term.to_string()));
        self
    }

    pub fn order(mut self, column: &str, direction: SortDirection) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// 메모리 행 목록에 조건, 정렬, 개수 제한 적용
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut rows: Vec<Value> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some((column, direction)) = &self.order {
            rows.sort_by(|a, b| {
                let ord = match (a.get(column), b.get(column)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    // null 은 항상 뒤로
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }

    /// REST 쿼리 파라미터 목록
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if let Some((column, direction)) = &self.order {
            params.push((
                "order".to_string(),
                format!("{}.{}", column, direction.as_str()),
            ));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn to_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// endregion: --- Query

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": "a", "title": "Vintage Camera", "price": 120.0}),
            json!({"id": "b", "title": "Road Bike", "price": 450}),
            json!({"id": "c", "title": "camera strap", "price": 15.5}),
            json!({"id": "d", "title": "Desk Lamp", "price": 450.0}),
        ]
    }

    fn ids(rows: &[Value]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let query = Query::new().gte("price", 15.5).lte("price", 450);
        let result = query.apply(rows());
        assert_eq!(ids(&result), vec!["a", "b", "c", "d"]);

        let query = Query::new().gte("price", 16).lte("price", 449.99);
        assert_eq!(ids(&query.apply(rows())), vec!["a"]);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let query = Query::new().contains("title", "CAMERA");
        assert_eq!(ids(&query.apply(rows())), vec!["a", "c"]);
    }

    #[test]
    fn test_contains_treats_wildcards_literally() {
        let shirts = vec![
            json!({"id": "plain", "title": "100 cotton shirt"}),
            json!({"id": "pct", "title": "100% Cotton Shirt"}),
            json!({"id": "under", "title": "a_b shirt"}),
            json!({"id": "axb", "title": "axb shirt"}),
        ];
        assert_eq!(ids(&Query::new().contains("title", "100%").apply(shirts.clone())), vec!["pct"]);
        assert_eq!(ids(&Query::new().contains("title", "A_B").apply(shirts.clone())), vec!["under"]);
        assert_eq!(ids(&Query::new().contains("title", "%").apply(shirts.clone())), vec!["pct"]);
        assert!(Query::new().contains("title", "*").apply(shirts).is_empty());

        let params = Query::new().contains("title", "a_b*c%").to_params();
        assert_eq!(
            params[1],
            ("title".to_string(), "imatch.a\\_b\\*c\\%".to_string())
        );
    }

    #[test]
    fn test_order_and_limit() {
        let query = Query::new()
            .order("price", SortDirection::Desc)
            .limit(2);
        let result = query.apply(rows());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["price"].as_f64(), Some(450.0));
        assert_eq!(result[1]["price"].as_f64(), Some(450.0));
    }

    #[test]
    fn test_eq_treats_integer_and_float_alike() {
        let query = Query::new().eq("price", 450.0);
        assert_eq!(ids(&query.apply(rows())), vec!["b", "d"]);
    }

    #[test]
    fn test_to_params() {
        let query = Query::new()
            .eq("owner_id", "u-1")
            .lt("current_bid", 12750)
            .contains("title", "bike")
            .order("created_at", SortDirection::Desc);
        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("owner_id".to_string(), "eq.u-1".to_string()),
                ("current_bid".to_string(), "lt.12750".to_string()),
                ("title".to_string(), "imatch.bike".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        let early = json!("2024-01-01T09:00:00+09:00");
        let late = json!("2024-01-01T01:00:00Z");
        assert_eq!(compare_values(&early, &late), Some(Ordering::Less));
    }
}
