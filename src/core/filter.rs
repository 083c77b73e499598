use super::repo::{RepoType, Repository};
use crate::error::{ForkyardError, Result};

/// A predicate over a tracked repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match on the (suffixed) name.
    Name(String),
    NamePrefix(String),
    Type(RepoType),
    /// Exact match on the current head; an empty branch selects repos not cloned yet.
    Branch(String),
}

impl Filter {
    pub fn name(name: impl Into<String>) -> Self {
        Filter::Name(name.into())
    }

    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        Filter::NamePrefix(prefix.into())
    }

    /// Type filter from user input; unknown type strings are an error.
    pub fn repo_type(type_str: &str) -> Result<Self> {
        Ok(Filter::Type(type_str.parse()?))
    }

    pub fn branch(branch: impl Into<String>) -> Self {
        Filter::Branch(branch.into())
    }

    pub fn matches(&self, repo: &Repository) -> bool {
        match self {
            Filter::Name(name) => repo.name == *name,
            Filter::NamePrefix(prefix) => repo.name.starts_with(prefix.as_str()),
            Filter::Type(t) => repo.repo_type == *t,
            Filter::Branch(branch) => repo.git_head == *branch,
        }
    }
}

/// Parse a filter expression such as `"branch=main type=controller"`.
///
/// A blank expression yields no filters. Any malformed token or unknown key
/// fails the whole expression.
pub fn build_filters(expression: &str) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();
    for token in expression.split_whitespace() {
        let mut parts = token.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ForkyardError::MalformedFilter(token.to_string()));
        };
        let filter = match key.to_ascii_lowercase().as_str() {
            "type" => Filter::repo_type(value)?,
            "name" => Filter::name(value),
            "branch" => Filter::branch(value),
            other => return Err(ForkyardError::UnknownFilterKey(other.to_string())),
        };
        filters.push(filter);
    }
    Ok(filters)
}

/// Repositories passing every filter, in input order.
pub fn select_all<'a, I>(repos: I, filters: &[Filter]) -> Vec<&'a Repository>
where
    I: IntoIterator<Item = &'a Repository>,
{
    repos
        .into_iter()
        .filter(|repo| filters.iter().all(|f| f.matches(repo)))
        .collect()
}

/// Repositories passing at least one filter, in input order, each once.
pub fn select_any<'a, I>(repos: I, filters: &[Filter]) -> Vec<&'a Repository>
where
    I: IntoIterator<Item = &'a Repository>,
{
    repos
        .into_iter()
        .filter(|repo| filters.iter().any(|f| f.matches(repo)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo(name: &str, repo_type: RepoType, head: &str) -> Repository {
        let mut repo = Repository::new(name, RepoType::Core);
        repo.repo_type = repo_type;
        repo.git_head = head.to_string();
        repo
    }

    fn names(repos: &[&Repository]) -> Vec<String> {
        repos.iter().map(|r| format!("{}:{}", r.name, r.repo_type)).collect()
    }

    #[test]
    fn blank_expression_yields_no_filters() {
        assert!(build_filters("").unwrap().is_empty());
        assert!(build_filters("   ").unwrap().is_empty());
        assert!(build_filters("\t\n").unwrap().is_empty());
    }

    #[test]
    fn parses_known_keys_case_insensitively() {
        let filters = build_filters("TYPE=core Name=foo branch=main").unwrap();
        assert_eq!(
            filters,
            vec![
                Filter::Type(RepoType::Core),
                Filter::name("foo"),
                Filter::branch("main"),
            ]
        );
    }

    #[test]
    fn tolerates_repeated_whitespace() {
        let filters = build_filters("  type=core    name=foo ").unwrap();
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn malformed_tokens_fail() {
        assert!(matches!(
            build_filters("weird"),
            Err(ForkyardError::MalformedFilter(t)) if t == "weird"
        ));
        assert!(matches!(
            build_filters("name=a=b"),
            Err(ForkyardError::MalformedFilter(_))
        ));
        assert!(matches!(
            build_filters("name=foo weird"),
            Err(ForkyardError::MalformedFilter(_))
        ));
    }

    #[test]
    fn unknown_key_fails() {
        let err = build_filters("name=foo badkey=x").unwrap_err();
        assert!(matches!(err, ForkyardError::UnknownFilterKey(ref k) if k == "badkey"));
        assert!(err.to_string().contains("badkey"));
    }

    #[test]
    fn unknown_type_fails() {
        assert!(matches!(
            build_filters("type=library"),
            Err(ForkyardError::UnknownRepoType(_))
        ));
        assert!(Filter::repo_type("controller").is_ok());
    }

    #[test]
    fn and_selection_from_expression() {
        let repos = vec![
            make_repo("foo", RepoType::Core, ""),
            make_repo("foo", RepoType::Controller, ""),
            make_repo("bar", RepoType::Core, ""),
        ];
        let filters = build_filters("type=core name=foo").unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(names(&select_all(&repos, &filters)), vec!["foo:core"]);
    }

    #[test]
    fn empty_filters_select_everything_with_and() {
        let repos = vec![
            make_repo("a", RepoType::Core, ""),
            make_repo("b", RepoType::Core, ""),
        ];
        assert_eq!(select_all(&repos, &[]).len(), 2);
    }

    #[test]
    fn or_selection_keeps_order_and_deduplicates() {
        let repos = vec![
            make_repo("a", RepoType::Core, ""),
            make_repo("b", RepoType::Core, ""),
            make_repo("c", RepoType::Core, ""),
        ];
        let filters = vec![
            Filter::name("b"),
            Filter::name("a"),
            Filter::name_prefix("a"),
        ];
        let selected = select_any(&repos, &filters);
        let selected: Vec<_> = selected.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(selected, vec!["a", "b"]);
    }

    #[test]
    fn prefix_and_branch_filters() {
        let repo = make_repo("s3-controller", RepoType::Controller, "main");
        assert!(Filter::name_prefix("s3").matches(&repo));
        assert!(!Filter::name_prefix("ecr").matches(&repo));
        assert!(Filter::branch("main").matches(&repo));
        assert!(!Filter::branch("dev").matches(&repo));
        assert!(!Filter::name("s3").matches(&repo));
    }
}
