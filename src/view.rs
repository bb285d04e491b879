use crate::models::{ApplicationRecord, Status, StatusFilter};

/// Per-category totals over the whole, unfiltered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub applied: usize,
    pub interviewing: usize,
    pub offer: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn get(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Only(Status::Applied) => self.applied,
            StatusFilter::Only(Status::Interviewing) => self.interviewing,
            StatusFilter::Only(Status::Offer) => self.offer,
            StatusFilter::Only(Status::Rejected) => self.rejected,
        }
    }
}

#[derive(Debug)]
pub struct Derived<'a> {
    pub filtered: Vec<&'a ApplicationRecord>,
    pub counts: StatusCounts,
}

/// Project the list through the active filter and search query.
///
/// Filter and query are ANDed; input order is kept. `counts` ignores both.
pub fn derive<'a>(
    list: &'a [ApplicationRecord],
    filter: StatusFilter,
    query: &str,
) -> Derived<'a> {
    let query = query.trim().to_lowercase();

    let filtered = list
        .iter()
        .filter(|r| filter.matches(r.status))
        .filter(|r| query.is_empty() || matches_query(r, &query))
        .collect();

    Derived {
        filtered,
        counts: count_statuses(list),
    }
}

fn matches_query(record: &ApplicationRecord, query: &str) -> bool {
    [&record.company, &record.role, &record.notes]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}

fn count_statuses(list: &[ApplicationRecord]) -> StatusCounts {
    let mut counts = StatusCounts {
        all: list.len(),
        ..Default::default()
    };
    for record in list {
        match record.status {
            Status::Applied => counts.applied += 1,
            Status::Interviewing => counts.interviewing += 1,
            Status::Offer => counts.offer += 1,
            Status::Rejected => counts.rejected += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, company: &str, role: &str, status: Status, notes: &str) -> ApplicationRecord {
        ApplicationRecord {
            id: id.to_string(),
            company: company.to_string(),
            role: role.to_string(),
            status,
            date: "2024-01-01".to_string(),
            link: String::new(),
            notes: notes.to_string(),
            created_at: 0,
        }
    }

    fn sample() -> Vec<ApplicationRecord> {
        vec![
            rec("1", "Acme", "SWE", Status::Applied, ""),
            rec("2", "Globex", "SWE", Status::Offer, ""),
        ]
    }

    fn ids(derived: &Derived) -> Vec<String> {
        derived.filtered.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_filter_only() {
        let list = sample();
        let derived = derive(&list, StatusFilter::Only(Status::Offer), "");
        assert_eq!(ids(&derived), vec!["2"]);
    }

    #[test]
    fn test_search_only() {
        let list = sample();
        let derived = derive(&list, StatusFilter::All, "acme");
        assert_eq!(ids(&derived), vec!["1"]);
    }

    #[test]
    fn test_filter_and_search_are_conjunctive() {
        let list = sample();
        let derived = derive(&list, StatusFilter::Only(Status::Applied), "globex");
        assert!(derived.filtered.is_empty());
    }

    #[test]
    fn test_counts_ignore_filter_and_search() {
        let list = sample();
        let derived = derive(&list, StatusFilter::Only(Status::Offer), "globex");
        assert_eq!(derived.counts.all, list.len());
        assert_eq!(
            derived.counts,
            StatusCounts {
                all: 2,
                applied: 1,
                interviewing: 0,
                offer: 1,
                rejected: 0,
            }
        );
        assert_eq!(derived.counts.get(StatusFilter::Only(Status::Offer)), 1);
    }

    #[test]
    fn test_query_is_trimmed_and_case_folded() {
        let list = sample();
        let derived = derive(&list, StatusFilter::All, "  GLOBEX ");
        assert_eq!(ids(&derived), vec!["2"]);

        let derived = derive(&list, StatusFilter::All, "   ");
        assert_eq!(ids(&derived), vec!["1", "2"]);
    }

    #[test]
    fn test_search_matches_role_and_notes_but_not_link() {
        let mut list = vec![
            rec("1", "Acme", "Platform Engineer", Status::Applied, ""),
            rec("2", "Globex", "SWE", Status::Interviewing, "Recruiter mentioned platform team"),
            rec("3", "Initech", "SWE", Status::Rejected, ""),
        ];
        list[2].link = "https://initech.example/platform".to_string();

        let derived = derive(&list, StatusFilter::All, "platform");
        assert_eq!(ids(&derived), vec!["1", "2"]);
    }

    #[test]
    fn test_order_is_preserved() {
        let list = vec![
            rec("c", "Acme", "SWE", Status::Applied, ""),
            rec("a", "Acme", "SRE", Status::Applied, ""),
            rec("b", "Acme", "PM", Status::Applied, ""),
        ];
        let derived = derive(&list, StatusFilter::All, "acme");
        assert_eq!(ids(&derived), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_list() {
        let derived = derive(&[], StatusFilter::All, "anything");
        assert!(derived.filtered.is_empty());
        assert_eq!(derived.counts, StatusCounts::default());
    }
}
