//! Robots evaluator (component C).
//!
//! Parses a robots.txt body into an immutable [`RobotsRules`] value and
//! answers `allowed(ua, path)` / `crawl_delay(ua)` as pure functions of
//! `(rules, ua, path)` — grounded on the canonical variant of
//! `site_scout/crawler/crawler.py::RobotsTxtRules` in `original_source`,
//! which adopts RFC 9309 longest-match-wins with an allow tie-break.

use std::collections::HashMap;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Allow,
    Disallow,
}

#[derive(Debug, Clone)]
struct Directive {
    kind: DirectiveKind,
    pattern: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    directives: Vec<Directive>,
    crawl_delay: Option<f64>,
}

/// Parsed robots.txt rules, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: Vec<Group>,
    regex_cache: HashMap<String, Regex>,
}

impl RobotsRules {
    /// Parse `text`. Malformed lines (no `:`, unknown directive, unparsable
    /// crawl-delay) are ignored rather than rejected — spec §4.3.
    pub fn parse(text: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = match raw.split_once('#') {
                Some((before, _)) => before,
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let needs_new_group = match current {
                        None => true,
                        Some(idx) => {
                            let g = &groups[idx];
                            !g.agents.is_empty() && (!g.directives.is_empty() || g.crawl_delay.is_some())
                        }
                    };
                    if needs_new_group {
                        groups.push(Group::default());
                        current = Some(groups.len() - 1);
                    }
                    groups[current.unwrap()].agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    if value.is_empty() && key == "disallow" {
                        // An empty Disallow value means "no restriction";
                        // silently dropped per spec §3.
                        continue;
                    }
                    let idx = *current.get_or_insert_with(|| {
                        groups.push(Group {
                            agents: vec!["*".to_string()],
                            ..Default::default()
                        });
                        groups.len() - 1
                    });
                    groups[idx].directives.push(Directive {
                        kind: if key == "allow" {
                            DirectiveKind::Allow
                        } else {
                            DirectiveKind::Disallow
                        },
                        pattern: value.to_string(),
                    });
                }
                "crawl-delay" => {
                    let idx = *current.get_or_insert_with(|| {
                        groups.push(Group {
                            agents: vec!["*".to_string()],
                            ..Default::default()
                        });
                        groups.len() - 1
                    });
                    if let Ok(delay) = value.parse::<f64>() {
                        groups[idx].crawl_delay = Some(delay);
                    }
                }
                _ => continue,
            }
        }

        let mut rules = RobotsRules {
            groups,
            regex_cache: HashMap::new(),
        };
        rules.warm_cache();
        rules
    }

    /// "Allow all" rules — used when robots.txt is unavailable.
    pub fn allow_all() -> Self {
        RobotsRules::default()
    }

    fn warm_cache(&mut self) {
        let patterns: Vec<String> = self
            .groups
            .iter()
            .flat_map(|g| g.directives.iter().map(|d| d.pattern.clone()))
            .collect();
        for pattern in patterns {
            self.regex_cache
                .entry(pattern.clone())
                .or_insert_with(|| compile_pattern(&pattern));
        }
    }

    fn match_group(&self, user_agent: &str) -> Option<&Group> {
        let ua = user_agent.to_ascii_lowercase();
        for group in &self.groups {
            if group.agents.iter().any(|a| ua_matches(&ua, a)) {
                return Some(group);
            }
        }
        self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*"))
    }

    /// Whether `user_agent` may fetch `path` under these rules.
    pub fn allowed(&self, user_agent: &str, path: &str) -> bool {
        let Some(group) = self.match_group(user_agent) else {
            return true;
        };

        let mut best_len: i64 = -1;
        let mut allow: Option<bool> = None;

        for directive in &group.directives {
            if directive.pattern.is_empty() {
                continue;
            }
            let matched = self
                .regex_cache
                .get(&directive.pattern)
                .map(|re| re.is_match(path))
                .unwrap_or(false);
            if !matched {
                continue;
            }

            let rule_len = rule_length(&directive.pattern);
            let is_allow = directive.kind == DirectiveKind::Allow;
            let wins = rule_len > best_len || (rule_len == best_len && is_allow && allow == Some(false));
            if wins {
                best_len = rule_len;
                allow = Some(is_allow);
            }
        }

        allow.unwrap_or(true)
    }

    /// The crawl delay for `user_agent`'s matching group, if any.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.match_group(user_agent).and_then(|g| g.crawl_delay)
    }
}

fn ua_matches(ua: &str, pattern: &str) -> bool {
    pattern == "*" || ua.starts_with(&pattern.to_ascii_lowercase())
}

/// Rule length is the pattern's length with `*` and `$` removed — the
/// longest-match tie-break key per RFC 9309.
fn rule_length(pattern: &str) -> i64 {
    pattern.chars().filter(|c| *c != '*' && *c != '$').count() as i64
}

fn compile_pattern(pattern: &str) -> Regex {
    let end_anchored = pattern.ends_with('$');
    let body = if end_anchored { &pattern[..pattern.len() - 1] } else { pattern };

    let mut escaped = String::with_capacity(body.len() * 2);
    for ch in body.chars() {
        if ch == '*' {
            escaped.push_str(".*");
        } else {
            escaped.push_str(&regex::escape(&ch.to_string()));
        }
    }
    if end_anchored {
        escaped.push('$');
    } else {
        escaped.push_str(".*");
    }

    Regex::new(&format!("^{escaped}")).unwrap_or_else(|_| {
        // An unparsable pattern matches nothing rather than panicking the crawl.
        Regex::new("$^").expect("trivially valid never-match pattern")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_by_default_with_no_rules() {
        let rules = RobotsRules::parse("");
        assert!(rules.allowed("AnyBot", "/anything"));
    }

    #[test]
    fn disallow_blocks_prefix() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private");
        assert!(!rules.allowed("Bot", "/private/page"));
        assert!(rules.allowed("Bot", "/public"));
    }

    #[test]
    fn longest_match_wins() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /a\nAllow: /a/b");
        assert!(rules.allowed("Bot", "/a/b"));
        assert!(!rules.allowed("Bot", "/a/c"));
    }

    #[test]
    fn tie_favors_allow() {
        let rules = RobotsRules::parse("User-agent: *\nAllow: /a\nDisallow: /a");
        assert!(rules.allowed("Bot", "/a"));
    }

    #[test]
    fn empty_disallow_value_means_no_restriction() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:");
        assert!(rules.allowed("Bot", "/anything"));
    }

    #[test]
    fn wildcard_and_end_anchor_patterns() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /*.pdf$");
        assert!(!rules.allowed("Bot", "/file.pdf"));
        assert!(rules.allowed("Bot", "/file.pdf.html"));
    }

    #[test]
    fn matches_specific_agent_over_wildcard() {
        let rules = RobotsRules::parse(
            "User-agent: TestAgent\nDisallow: /page1\nUser-agent: *\nDisallow: /page2",
        );
        assert!(!rules.allowed("TestAgent/1.0", "/page1"));
        assert!(rules.allowed("TestAgent/1.0", "/page2"));
        assert!(rules.allowed("OtherBot", "/page1"));
        assert!(!rules.allowed("OtherBot", "/page2"));
    }

    #[test]
    fn crawl_delay_is_parsed() {
        let rules = RobotsRules::parse("User-agent: *\nCrawl-delay: 2.5");
        assert_eq!(rules.crawl_delay("Bot"), Some(2.5));
    }

    #[test]
    fn tolerant_of_malformed_lines() {
        let rules = RobotsRules::parse("not a directive\nUser-agent: *\nDisallow: /x\ngarbage-key-no-colon");
        assert!(!rules.allowed("Bot", "/x"));
    }

    #[test]
    fn new_user_agent_after_directives_starts_fresh_group() {
        let rules = RobotsRules::parse(
            "User-agent: a\nUser-agent: b\nDisallow: /x\nUser-agent: c\nDisallow: /y",
        );
        assert!(!rules.allowed("a", "/x"));
        assert!(!rules.allowed("b", "/x"));
        assert!(rules.allowed("c", "/x"));
        assert!(!rules.allowed("c", "/y"));
    }
}
