//! robots.txt parsing into structured groups.

use serde::Serialize;

/// One `User-agent` group and the rules that follow it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RobotsGroup {
    pub user_agents: Vec<String>,
    pub allow: Vec<String>,
    pub disallow: Vec<String>,
    pub crawl_delay: Option<f64>,
}

/// A parsed robots.txt file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RobotsTxt {
    /// URL the file was fetched from
    pub url: String,
    pub sitemaps: Vec<String>,
    pub groups: Vec<RobotsGroup>,
}

/// Parse robots.txt content.
///
/// Consecutive `User-agent` lines open a single group; `Allow`, `Disallow`
/// and `Crawl-delay` attach to the current group and are dropped when no
/// group is open. `Sitemap` lines are global. Unknown directives are ignored.
pub fn parse_robots_txt(url: &str, text: &str) -> RobotsTxt {
    let mut robots = RobotsTxt { url: url.to_string(), ..Default::default() };
    let mut current: Option<RobotsGroup> = None;
    let mut collecting_agents = false;

    for raw_line in text.lines() {
        let line = raw_line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !collecting_agents {
                    if let Some(group) = current.take() {
                        robots.groups.push(group);
                    }
                    current = Some(RobotsGroup::default());
                    collecting_agents = true;
                }
                if let Some(group) = current.as_mut()
                    && !value.is_empty()
                {
                    group.user_agents.push(value.to_string());
                }
            }
            "allow" | "disallow" | "crawl-delay" => {
                collecting_agents = false;
                let Some(group) = current.as_mut() else {
                    continue;
                };
                match key.as_str() {
                    "allow" if !value.is_empty() => group.allow.push(value.to_string()),
                    "disallow" if !value.is_empty() => group.disallow.push(value.to_string()),
                    "crawl-delay" => {
                        group.crawl_delay = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
                    }
                    _ => {}
                }
            }
            "sitemap" => {
                if !value.is_empty() {
                    robots.sitemaps.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    if let Some(group) = current {
        robots.groups.push(group);
    }
    robots
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Example robots.txt
User-agent: Googlebot
User-agent: Bingbot
Disallow: /private/
Allow: /private/public.html
Crawl-delay: 2.5

User-agent: *
Disallow: /tmp/   # scratch space
Disallow:

Sitemap: https://example.com/sitemap.xml
Host: example.com
";

    #[test]
    fn test_groups_and_sitemaps() {
        let robots = parse_robots_txt("https://example.com/robots.txt", SAMPLE);

        assert_eq!(robots.url, "https://example.com/robots.txt");
        assert_eq!(robots.sitemaps, vec!["https://example.com/sitemap.xml"]);
        assert_eq!(robots.groups.len(), 2);

        let first = &robots.groups[0];
        assert_eq!(first.user_agents, vec!["Googlebot", "Bingbot"]);
        assert_eq!(first.disallow, vec!["/private/"]);
        assert_eq!(first.allow, vec!["/private/public.html"]);
        assert_eq!(first.crawl_delay, Some(2.5));

        let second = &robots.groups[1];
        assert_eq!(second.user_agents, vec!["*"]);
        assert_eq!(second.disallow, vec!["/tmp/"]);
        assert_eq!(second.crawl_delay, None);
    }

    #[test]
    fn test_keys_case_insensitive() {
        let robots = parse_robots_txt("u", "USER-AGENT: a\nDISALLOW: /x\nsItEmAp: https://s.test/map.xml");
        assert_eq!(robots.groups[0].disallow, vec!["/x"]);
        assert_eq!(robots.sitemaps.len(), 1);
    }

    #[test]
    fn test_rules_before_any_group_dropped() {
        let robots = parse_robots_txt("u", "Disallow: /orphan\nUser-agent: *\nDisallow: /kept");
        assert_eq!(robots.groups.len(), 1);
        assert_eq!(robots.groups[0].disallow, vec!["/kept"]);
    }

    #[test]
    fn test_invalid_crawl_delay_ignored() {
        let robots = parse_robots_txt("u", "User-agent: *\nCrawl-delay: soon");
        assert_eq!(robots.groups[0].crawl_delay, None);
    }

    #[test]
    fn test_empty_file() {
        let robots = parse_robots_txt("u", "");
        assert!(robots.groups.is_empty());
        assert!(robots.sitemaps.is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let robots = parse_robots_txt("u", "User-agent: *\r\nDisallow: /a\r\n");
        assert_eq!(robots.groups[0].disallow, vec!["/a"]);
    }
}
