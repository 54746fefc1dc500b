//! Type definitions of a low-level SQL string representation.

/// A SQL string with its bound parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
    /// for internal use and tests only
    pub param_index: u64,
}

impl Default for SQL {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A literal string
    String(String),
    /// A json value, bound as `jsonb`.
    Value(serde_json::Value),
}

impl SQL {
    pub fn new() -> SQL {
        SQL {
            sql: String::new(),
            params: vec![],
            param_index: 0,
        }
    }
    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }
    pub fn append_identifier(&mut self, sql: &str) {
        self.sql.push('"');
        self.sql.push_str(&sql.replace('"', "\"\""));
        self.sql.push('"');
    }
    pub fn append_param(&mut self, param: Param) {
        self.param_index += 1;
        self.sql.push_str(format!("${}", self.param_index).as_str());
        self.params.push(param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        let mut sql = SQL::new();
        sql.append_identifier("we\"ird");
        assert_eq!(sql.sql, "\"we\"\"ird\"");
    }

    #[test]
    fn params_are_numbered_in_order() {
        let mut sql = SQL::new();
        sql.append_param(Param::String("a".to_string()));
        sql.append_syntax(", ");
        sql.append_param(Param::Value(serde_json::json!({"b": 1})));
        assert_eq!(sql.sql, "$1, $2");
        assert_eq!(sql.param_index, 2);
        assert_eq!(sql.params.len(), 2);
    }
}
