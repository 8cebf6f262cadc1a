// List/filter/paginate query assembly for the REST list endpoints.

use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub sort: Option<Sort>,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            search: None,
            sort: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            descending,
        });
        self
    }

    /// Setting a filter resets to page 1.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self.page = 1;
        self
    }

    pub fn next_page(&self) -> Self {
        let mut q = self.clone();
        q.page = q.page.saturating_add(1);
        q
    }

    /// Query pairs in a stable order: page, perPage, q, sort, then filters by key.
    /// Blank search text and blank filter values are dropped.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ];
        if let Some(q) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("q".to_string(), q.to_string()));
        }
        if let Some(sort) = &self.sort {
            let prefix = if sort.descending { "-" } else { "" };
            pairs.push(("sort".to_string(), format!("{}{}", prefix, sort.field)));
        }
        for (k, v) in &self.filters {
            let v = v.trim();
            if !v.is_empty() {
                pairs.push((k.clone(), v.to_string()));
            }
        }
        pairs
    }

    pub fn apply(&self, url: &mut Url) {
        let mut qp = url.query_pairs_mut();
        for (k, v) in self.to_pairs() {
            qp.append_pair(&k, &v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_ordered_and_blank_values_dropped() {
        let q = ListQuery::new(20)
            .search("  civic ")
            .sort_by("price", true)
            .filter("make", "Honda")
            .filter("fuel", "")
            .filter("bodyType", "Sedan")
            .page(3);
        assert_eq!(
            q.to_pairs(),
            vec![
                ("page".into(), "3".into()),
                ("perPage".into(), "20".into()),
                ("q".into(), "civic".into()),
                ("sort".into(), "-price".into()),
                ("bodyType".into(), "Sedan".into()),
                ("make".into(), "Honda".into()),
            ]
        );
    }

    #[test]
    fn apply_encodes_into_url() {
        let mut url = Url::parse("http://localhost:8080/api/vehicles").unwrap();
        ListQuery::new(10).search("land rover").apply(&mut url);
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/vehicles?page=1&perPage=10&q=land+rover"
        );
    }

    #[test]
    fn page_never_drops_below_one() {
        let q = ListQuery::new(0).page(0);
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 1);
        assert_eq!(q.next_page().page, 2);
        assert_eq!(q.page(4).filter("make", "Kia").page, 1);
    }
}
