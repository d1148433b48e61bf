use serde_json::Value;

use super::like_pattern;

/// AND-joined conditions with sequentially numbered placeholders
#[derive(Debug, Default, Clone)]
pub struct FilterWhere {
    conditions: Vec<String>,
    param_values: Vec<Value>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bound value and return its placeholder (`$1`, `$2`, ...)
    pub fn placeholder(&mut self, value: impl Into<Value>) -> String {
        self.param_values.push(value.into());
        format!("${}", self.param_values.len())
    }

    /// `column = $n`
    pub fn eq(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        let p = self.placeholder(value);
        self.conditions.push(format!("{} = {}", column, p));
        self
    }

    /// `(a ILIKE $n OR b ILIKE $n)`; one parameter shared by every column
    pub fn ilike_any(&mut self, columns: &[&'static str], term: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let p = self.placeholder(like_pattern(term));
        let parts: Vec<String> = columns
            .iter()
            .map(|column| format!("{} ILIKE {}", column, p))
            .collect();

        if parts.len() == 1 {
            self.conditions.push(parts.join(""));
        } else {
            self.conditions.push(format!("({})", parts.join(" OR ")));
        }
        self
    }

    /// A fixed predicate with no parameters, e.g. `active_flag = 'Y'`
    pub fn raw(&mut self, condition: &'static str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// A predicate already built from static identifiers and placeholders
    /// obtained through [`FilterWhere::placeholder`].
    pub fn push_condition(&mut self, condition: String) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// ` WHERE a AND b`, or an empty string when there are no conditions
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.param_values
    }

    pub fn into_params(self) -> Vec<Value> {
        self.param_values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_has_no_where() {
        let filter = FilterWhere::new();
        assert!(filter.is_empty());
        assert_eq!(filter.where_clause(), "");
        assert!(filter.params().is_empty());
    }

    #[test]
    fn numbers_placeholders_in_order() {
        let mut filter = FilterWhere::new();
        filter
            .eq("sec_users_id", 7)
            .raw("active_flag = 'Y'")
            .ilike_any(&["fname", "lname"], "ann");

        assert_eq!(
            filter.where_clause(),
            " WHERE sec_users_id = $1 AND active_flag = 'Y' AND (fname ILIKE $2 OR lname ILIKE $2)"
        );
        assert_eq!(filter.params(), &[json!(7), json!("%ann%")]);
    }

    #[test]
    fn single_column_ilike_is_not_parenthesised() {
        let mut filter = FilterWhere::new();
        filter.ilike_any(&["email_addr"], "example.com");
        assert_eq!(filter.where_clause(), " WHERE email_addr ILIKE $1");
    }

    #[test]
    fn custom_conditions_share_numbering() {
        let mut filter = FilterWhere::new();
        filter.eq("pdat_pers_emails_id", 3);
        let owner = filter.placeholder(9);
        filter.push_condition(format!(
            "pdat_person_id IN (SELECT pdat_person_id FROM pdat_person WHERE sec_users_id = {})",
            owner
        ));

        assert_eq!(
            filter.where_clause(),
            " WHERE pdat_pers_emails_id = $1 AND pdat_person_id IN (SELECT pdat_person_id FROM pdat_person WHERE sec_users_id = $2)"
        );
        assert_eq!(filter.into_params(), vec![json!(3), json!(9)]);
    }
}
