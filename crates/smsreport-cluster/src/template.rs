//! Template synthesis and sample selection for a cluster.

use crate::types::Cluster;

/// Placeholder emitted where members disagree.
pub const PLACEHOLDER: &str = "{variable}";

/// Position-wise template over the members' raw whitespace tokens.
///
/// A position keeps its literal token only when every member has a token
/// there and all agree. Otherwise it becomes [`PLACEHOLDER`], and runs of
/// placeholders collapse into one. Alignment runs to the longest member,
/// so trailing tokens present in only some members end as one placeholder.
pub fn body_template(cluster: &Cluster) -> String {
    let token_lists: Vec<Vec<&str>> = cluster
        .members
        .iter()
        .map(|m| m.raw_body.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect();

    match token_lists.len() {
        0 => return String::new(),
        1 => return token_lists[0].join(" "),
        _ => {}
    }

    let max_len = token_lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut template: Vec<&str> = Vec::with_capacity(max_len);

    for idx in 0..max_len {
        let first = token_lists[0].get(idx);
        let uniform = first.is_some()
            && token_lists.iter().all(|tokens| tokens.get(idx) == first);

        match (uniform, first) {
            (true, Some(token)) => template.push(token),
            _ => {
                if template.last() != Some(&PLACEHOLDER) {
                    template.push(PLACEHOLDER);
                }
            }
        }
    }

    template.join(" ")
}

/// Template for display, falling back to the representative text when the
/// template is empty or mostly placeholders.
pub fn synthesize(cluster: &Cluster, max_placeholder_ratio: f64) -> String {
    let template = body_template(cluster);
    let tokens: Vec<&str> = template.split_whitespace().collect();
    if tokens.is_empty() {
        return cluster.representative_raw.clone();
    }

    let placeholders = tokens.iter().filter(|t| **t == PLACEHOLDER).count();
    if placeholders == tokens.len()
        || placeholders as f64 / tokens.len() as f64 >= max_placeholder_ratio
    {
        return cluster.representative_raw.clone();
    }

    tokens.join(" ")
}

/// Most frequent member bodies, ties broken by first appearance.
pub fn collect_samples(cluster: &Cluster, limit: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for member in &cluster.members {
        let body = member.raw_body.trim();
        if body.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(text, _)| *text == body) {
            Some((_, n)) => *n += 1,
            None => counts.push((body, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(text, _)| text.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_body;
    use crate::types::{Message, StatusClass};
    use std::collections::BTreeMap;

    fn cluster(bodies: &[&str]) -> Cluster {
        let members: Vec<Message> = bodies
            .iter()
            .map(|b| Message {
                source_id: "t".into(),
                raw_body: b.trim().to_string(),
                normalized_body: normalize_body(b),
                status_raw: String::new(),
                status_class: StatusClass::Other,
                date: None,
                metadata: BTreeMap::new(),
            })
            .collect();
        Cluster {
            representative_normalized: members[0].normalized_body.clone(),
            representative_raw: members[0].raw_body.clone(),
            members,
        }
    }

    #[test]
    fn test_varying_link_becomes_placeholder() {
        let c = cluster(&[
            "Buy now: http://x.co/a1",
            "Buy now: http://x.co/b2",
            "Buy now: http://x.co/c3",
        ]);
        assert_eq!(body_template(&c), "Buy now: {variable}");
        assert_eq!(synthesize(&c, 0.6), "Buy now: {variable}");
    }

    #[test]
    fn test_consecutive_placeholders_collapse() {
        let c = cluster(&["Hi Ana Maria, see you", "Hi Joao Pedro, see you"]);
        assert_eq!(body_template(&c), "Hi {variable} see you");
    }

    #[test]
    fn test_length_divergence_caps_at_longest() {
        // Positions missing from some member are placeholders up to the
        // longest member; the run collapses to a single placeholder.
        let c = cluster(&["Code 123 valid today", "Code 456 valid", "Code 789 valid today only"]);
        assert_eq!(body_template(&c), "Code {variable} valid {variable}");
    }

    #[test]
    fn test_single_member_is_raw_tokens() {
        let c = cluster(&["  Hello   world  "]);
        assert_eq!(body_template(&c), "Hello world");
        assert_eq!(synthesize(&c, 0.6), "Hello world");
    }

    #[test]
    fn test_mostly_variable_falls_back() {
        let c = cluster(&["a b c d", "w x y d"]);
        // "{variable} d": 50% placeholders, under the cutoff.
        assert_eq!(synthesize(&c, 0.6), "{variable} d");

        let c = cluster(&["a b c d e", "v w x y e", "a b c d z"]);
        // "{variable}" only.
        assert_eq!(body_template(&c), "{variable}");
        assert_eq!(synthesize(&c, 0.6), "a b c d e");
    }

    #[test]
    fn test_placeholder_ratio_cutoff_is_heuristic() {
        let c = cluster(&["x b y", "z b w"]);
        // "{variable} b {variable}": two of three tokens are placeholders.
        assert_eq!(body_template(&c), "{variable} b {variable}");
        assert_eq!(synthesize(&c, 0.6), "x b y");
        assert_eq!(synthesize(&c, 0.7), "{variable} b {variable}");
    }

    #[test]
    fn test_template_has_literal_or_falls_back() {
        let c = cluster(&["Promo hoje 10% off", "Promo hoje 20% off", "Promo hoje 30% off"]);
        let t = synthesize(&c, 0.6);
        assert!(t.split_whitespace().any(|tok| tok != PLACEHOLDER));
    }

    #[test]
    fn test_samples_by_frequency() {
        let c = cluster(&["b", "a", "a", "c", "b", "a", "d"]);
        assert_eq!(collect_samples(&c, 3), vec!["a", "b", "c"]);
        assert_eq!(collect_samples(&c, 10).len(), 4);
    }
}
