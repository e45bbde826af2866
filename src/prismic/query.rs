//! Query builder for the documents search endpoint

/// A single query predicate such as `[at(document.type, "posts")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Field path, e.g. `document.type` or `my.posts.uid`
    pub path: String,
    /// Value the field must equal
    pub value: String,
}

impl Predicate {
    /// Equality predicate
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Render in the API's predicate syntax
    pub fn to_query_string(&self) -> String {
        // A JSON string literal is a valid quoted value for the predicate language
        let value = serde_json::to_string(&self.value).unwrap_or_else(|_| "\"\"".to_string());
        format!("[at({}, {})]", self.path, value)
    }
}

/// Sort direction of an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Result ordering on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Render as `[field]` or `[field desc]`
    pub fn to_query_string(&self) -> String {
        match self.direction {
            Direction::Asc => format!("[{}]", self.field),
            Direction::Desc => format!("[{} desc]", self.field),
        }
    }
}

/// A search query against the documents endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub after: Option<String>,
    pub ordering: Option<Ordering>,
    /// Content ref to read from; the master ref when `None`
    pub reference: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    /// The `q` parameter: all predicates wrapped in one list
    pub fn q(&self) -> String {
        let inner: String = self
            .predicates
            .iter()
            .map(Predicate::to_query_string)
            .collect();
        format!("[{}]", inner)
    }

    /// Query-string parameters, excluding `ref` and `access_token`
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q())];
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(ordering) = &self.ordering {
            params.push(("orderings", ordering.to_query_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_syntax() {
        let p = Predicate::at("document.type", "posts");
        assert_eq!(p.to_query_string(), r#"[at(document.type, "posts")]"#);
    }

    #[test]
    fn test_predicate_escapes_quotes() {
        let p = Predicate::at("my.posts.uid", r#"a"b"#);
        assert_eq!(p.to_query_string(), r#"[at(my.posts.uid, "a\"b")]"#);
    }

    #[test]
    fn test_orderings() {
        assert_eq!(
            Ordering::asc("document.first_publication_date").to_query_string(),
            "[document.first_publication_date]"
        );
        assert_eq!(
            Ordering::desc("document.first_publication_date").to_query_string(),
            "[document.first_publication_date desc]"
        );
    }

    #[test]
    fn test_params() {
        let query = Query::new()
            .predicate(Predicate::at("document.type", "posts"))
            .fetch(["posts.title", "posts.author"])
            .page_size(2)
            .after("XyZ")
            .ordering(Ordering::desc("document.first_publication_date"));

        let params = query.params();
        assert_eq!(params[0], ("q", r#"[[at(document.type, "posts")]]"#.to_string()));
        assert!(params.contains(&("pageSize", "2".to_string())));
        assert!(params.contains(&("after", "XyZ".to_string())));
        assert!(params.contains(&("fetch", "posts.title,posts.author".to_string())));
        assert!(params.contains(&(
            "orderings",
            "[document.first_publication_date desc]".to_string()
        )));
    }
}
