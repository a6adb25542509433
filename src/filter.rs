use std::collections::HashSet;

use crate::catalog::ShortItem;

/// Search query plus optional tag selection.
///
/// The visible list is every catalog entry whose title or any tag contains
/// the query (case-insensitive) and, when a tag is selected, whose tags
/// include that exact tag. Catalog order is always preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  pub query: String,
  pub selected_tag: Option<String>,
}

impl Filter {
  /// Select `tag`, or clear the selection if it is already selected.
  pub fn toggle_tag(&mut self, tag: &str) {
    if self.selected_tag.as_deref() == Some(tag) {
      self.selected_tag = None;
    } else {
      self.selected_tag = Some(tag.to_string());
    }
  }

  pub fn clear_tag(&mut self) {
    self.selected_tag = None;
  }

  pub fn is_active(&self) -> bool {
    !self.query.trim().is_empty() || self.selected_tag.is_some()
  }

  pub fn matches(&self, item: &ShortItem) -> bool {
    matches_query(item, &self.query) && matches_tag(item, self.selected_tag.as_deref())
  }

  /// Indices into `catalog` of the visible entries, in catalog order.
  pub fn visible_indices(&self, catalog: &[ShortItem]) -> Vec<usize> {
    if !self.is_active() {
      return (0..catalog.len()).collect();
    }
    catalog.iter().enumerate().filter(|(_, item)| self.matches(item)).map(|(i, _)| i).collect()
  }
}

/// Case-insensitive substring match on title or any tag. An empty
/// (or whitespace-only) query matches everything.
pub fn matches_query(item: &ShortItem, query: &str) -> bool {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }
  item.title.to_lowercase().contains(&needle) || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

pub fn matches_tag(item: &ShortItem, tag: Option<&str>) -> bool {
  match tag {
    Some(tag) => item.tags.iter().any(|t| t == tag),
    None => true,
  }
}

/// Distinct tags across the catalog, in order of first appearance.
pub fn all_tags(catalog: &[ShortItem]) -> Vec<String> {
  let mut seen: HashSet<&str> = HashSet::new();
  let mut tags = Vec::new();
  for tag in catalog.iter().flat_map(|item| item.tags.iter()) {
    if seen.insert(tag) {
      tags.push(tag.clone());
    }
  }
  tags
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::ShortId;

  fn item(id: u64, title: &str, tags: &[&str]) -> ShortItem {
    ShortItem {
      id: ShortId::from(id),
      title: title.to_string(),
      video_url: format!("https://cdn.example/{}.mp4", id),
      tags: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  fn scenario() -> Vec<ShortItem> {
    vec![item(1, "Cat Fun", &["cats", "funny"]), item(2, "Dog Run", &["dogs"])]
  }

  fn ids(items: &[&ShortItem]) -> Vec<String> {
    items.iter().map(|i| i.id.to_string()).collect()
  }

  impl Filter {
    fn apply<'a>(&self, catalog: &'a [ShortItem]) -> Vec<&'a ShortItem> {
      self.visible_indices(catalog).into_iter().map(|i| &catalog[i]).collect()
    }
  }

  fn filter(query: &str, tag: Option<&str>) -> Filter {
    Filter { query: query.to_string(), selected_tag: tag.map(str::to_string) }
  }

  #[test]
  fn query_matches_title_case_insensitively() {
    let catalog = scenario();
    assert_eq!(ids(&filter("dog", None).apply(&catalog)), vec!["2"]);
    assert_eq!(ids(&filter("DOG", None).apply(&catalog)), vec!["2"]);
  }

  #[test]
  fn selected_tag_alone() {
    let catalog = scenario();
    assert_eq!(ids(&filter("", Some("cats")).apply(&catalog)), vec!["1"]);
  }

  #[test]
  fn substring_matches_across_titles_in_catalog_order() {
    let catalog = scenario();
    assert_eq!(ids(&filter("un", None).apply(&catalog)), vec!["1", "2"]);
  }

  #[test]
  fn query_matches_tags() {
    let catalog = scenario();
    assert_eq!(ids(&filter("funn", None).apply(&catalog)), vec!["1"]);
  }

  #[test]
  fn tag_match_is_exact() {
    let catalog = scenario();
    assert!(filter("", Some("cat")).apply(&catalog).is_empty());
    assert!(filter("", Some("Cats")).apply(&catalog).is_empty());
  }

  #[test]
  fn query_and_tag_are_anded() {
    let catalog = scenario();
    assert!(filter("dog", Some("cats")).apply(&catalog).is_empty());
    assert_eq!(ids(&filter("un", Some("dogs")).apply(&catalog)), vec!["2"]);
  }

  #[test]
  fn empty_filter_is_pass_through() {
    let catalog = scenario();
    let out = Filter::default().apply(&catalog);
    assert_eq!(out.len(), catalog.len());
    for (a, b) in out.iter().zip(catalog.iter()) {
      assert!(std::ptr::eq(*a, b));
    }
    assert_eq!(Filter::default().visible_indices(&catalog), vec![0, 1]);
  }

  #[test]
  fn whitespace_query_is_empty() {
    let catalog = scenario();
    assert_eq!(filter("   ", None).apply(&catalog).len(), 2);
  }

  #[test]
  fn query_then_tag_equals_combined() {
    let catalog = vec![
      item(1, "Cat Fun", &["cats", "funny"]),
      item(2, "Dog Run", &["dogs"]),
      item(3, "Funny Dogs", &["dogs", "funny"]),
      item(4, "Sunset", &[]),
      item(5, "Run cat run", &["cats", "cats"]),
    ];
    for q in ["", "un", "dog", "CAT", "zzz"] {
      for t in [None, Some("cats"), Some("dogs"), Some("funny"), Some("none")] {
        let staged: Vec<ShortItem> = filter(q, None).apply(&catalog).into_iter().cloned().collect();
        let staged = filter("", t).apply(&staged);
        let combined = filter(q, t).apply(&catalog);
        assert_eq!(ids(&staged), ids(&combined), "query {:?} tag {:?}", q, t);
      }
    }
  }

  #[test]
  fn filtering_is_idempotent() {
    let catalog = scenario();
    let f = filter("un", None);
    assert_eq!(f.visible_indices(&catalog), f.visible_indices(&catalog));
  }

  #[test]
  fn toggle_tag_selects_then_clears() {
    let mut f = Filter::default();
    f.toggle_tag("cats");
    assert_eq!(f.selected_tag.as_deref(), Some("cats"));
    f.toggle_tag("dogs");
    assert_eq!(f.selected_tag.as_deref(), Some("dogs"));
    f.toggle_tag("dogs");
    assert_eq!(f.selected_tag, None);
  }

  #[test]
  fn all_tags_first_appearance_order() {
    let catalog = vec![item(1, "a", &["b", "a"]), item(2, "b", &["a", "c", "b"])];
    assert_eq!(all_tags(&catalog), vec!["b", "a", "c"]);
  }

  #[test]
  fn visible_indices_match_apply() {
    let catalog = scenario();
    let f = filter("", Some("dogs"));
    assert_eq!(f.visible_indices(&catalog), vec![1]);
  }
}
