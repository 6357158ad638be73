//! Element locators evaluated inside the page
use serde::Serialize;
use std::fmt;

/// Describes how to find elements in the rendered document.
///
/// `pattern` and `name` are case-insensitive JavaScript regular expression sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// Plain CSS selector
    Css { selector: String },

    /// CSS selector filtered by text content
    Text { selector: String, pattern: String },

    /// Accessible role filtered by accessible name (aria-label, title or text)
    Role { role: String, name: String },

    /// `inner` searched only below visible matches of `scope`
    Within {
        scope: Box<Locator>,
        inner: Box<Locator>,
    },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    pub fn text(selector: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Text {
            selector: selector.into(),
            pattern: pattern.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn within(self, scope: Locator) -> Self {
        Self::Within {
            scope: Box::new(scope),
            inner: Box::new(self),
        }
    }

    /// Wrap `body` in a script that resolves this locator into `found` (an element array)
    pub(crate) fn script(&self, body: &str) -> String {
        let locator_json = serde_json::to_string(self).unwrap_or_else(|_| "null".to_string());
        format!(
            "(() => {{\n{}\nconst loc = {};\nconst found = loc ? __ytResolve(loc, document) : [];\n{}\n}})()",
            RESOLVER_JS, locator_json, body
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => write!(f, "{}", selector),
            Locator::Text { selector, pattern } => write!(f, "{}:has-text(/{}/i)", selector, pattern),
            Locator::Role { role, name } => write!(f, "role={}[name=/{}/i]", role, name),
            Locator::Within { scope, inner } => write!(f, "{} >> {}", scope, inner),
        }
    }
}

/// Render a candidate list for error messages
pub fn describe(candidates: &[Locator]) -> String {
    candidates
        .iter()
        .map(|locator| locator.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

const RESOLVER_JS: &str = r#"
const __ytRoles = {
  button: 'button, [role="button"], tp-yt-paper-icon-button, yt-icon-button',
  menuitem: '[role="menuitem"], ytd-menu-service-item-renderer, tp-yt-paper-item',
  link: 'a[href], [role="link"]',
};
const __ytVisible = (el) => {
  if (!el || !el.isConnected) return false;
  const style = window.getComputedStyle(el);
  if (style.visibility === 'hidden' || style.display === 'none') return false;
  const rect = el.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
};
const __ytName = (el) =>
  (el.getAttribute('aria-label') || el.getAttribute('title') || el.textContent || '').trim();
const __ytResolve = (loc, root) => {
  switch (loc.kind) {
    case 'css':
      return Array.from(root.querySelectorAll(loc.selector));
    case 'text': {
      const re = new RegExp(loc.pattern, 'i');
      return Array.from(root.querySelectorAll(loc.selector))
        .filter((el) => re.test(el.textContent || ''));
    }
    case 'role': {
      const re = new RegExp(loc.name, 'i');
      const selector = __ytRoles[loc.role] || `[role="${loc.role}"]`;
      return Array.from(root.querySelectorAll(selector)).filter((el) => re.test(__ytName(el)));
    }
    case 'within': {
      const seen = new Set();
      const out = [];
      for (const scope of __ytResolve(loc.scope, root).filter(__ytVisible)) {
        for (const el of __ytResolve(loc.inner, scope)) {
          if (!seen.has(el)) { seen.add(el); out.push(el); }
        }
      }
      return out;
    }
    default:
      return [];
  }
};
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_serializes_with_kind_tag() {
        let locator = Locator::role("menuitem", "transcript").within(Locator::css("ytd-menu-popup-renderer"));
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(json["kind"], "within");
        assert_eq!(json["scope"]["selector"], "ytd-menu-popup-renderer");
        assert_eq!(json["inner"]["kind"], "role");
        assert_eq!(json["inner"]["name"], "transcript");
    }

    #[test]
    fn test_display_reads_like_a_selector() {
        let locator = Locator::text("tp-yt-paper-button", "more");
        assert_eq!(locator.to_string(), "tp-yt-paper-button:has-text(/more/i)");
        assert_eq!(
            describe(&[Locator::css("a"), Locator::css("b")]),
            "a | b"
        );
    }

    #[test]
    fn test_script_embeds_locator_and_body() {
        let script = Locator::css("#segment-text").script("return found.length;");
        assert!(script.contains(r##""selector":"#segment-text""##));
        assert!(script.contains("return found.length;"));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }
}
