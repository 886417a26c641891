//! Selector parsing and querying.

use std::collections::BTreeSet;

use cssparser::{Parser, ParserInput, Token};
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::parser::{ParseRelative, SelectorList};

use super::arena::{ArenaDom, NodeId};
use super::element_ref::DomSelectors;
use super::node::Node;
use crate::error::{Error, Result};

/// Parse a comma-separated selector list.
pub(crate) fn parse_selector_list(selector: &str) -> Result<SelectorList<DomSelectors>> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    SelectorList::parse(&DomSelectors, &mut parser, ParseRelative::No).map_err(|e| {
        Error::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e.kind),
        }
    })
}

/// Check if any selector of the list matches an element.
pub(crate) fn matches(node: Node<'_>, list: &SelectorList<DomSelectors>) -> bool {
    let mut caches = SelectorCaches::default();
    let mut context = new_context(&mut caches);
    list.slice()
        .iter()
        .any(|s| selectors::matching::matches_selector(s, 0, None, &node, &mut context))
}

fn new_context(caches: &mut SelectorCaches) -> MatchingContext<'_, DomSelectors> {
    MatchingContext::new(
        selectors::matching::MatchingMode::Normal,
        None,
        caches,
        selectors::context::QuirksMode::NoQuirks,
        selectors::matching::NeedsSelectorFlags::No,
        selectors::matching::MatchingForInvalidation::No,
    )
}

impl ArenaDom {
    /// All attached elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = parse_selector_list(selector)?;
        let mut caches = SelectorCaches::default();
        let mut context = new_context(&mut caches);

        let matched = self
            .descendants(self.document())
            .filter(|&id| self.is_element(id))
            .filter(|&id| {
                let node = Node::new(self, id);
                list.slice().iter().any(|s| {
                    selectors::matching::matches_selector(s, 0, None, &node, &mut context)
                })
            })
            .collect();
        Ok(matched)
    }
}

/// Attribute names a selector's match result can depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrInterest {
    /// Any attribute or form-state change may flip a match.
    All,
    Names(BTreeSet<String>),
}

impl AttrInterest {
    pub(crate) fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.contains(&name.to_ascii_lowercase()),
        }
    }

    pub(crate) fn merge(&mut self, other: AttrInterest) {
        match (&mut *self, other) {
            (Self::All, _) => {}
            (_, Self::All) => *self = Self::All,
            (Self::Names(mine), Self::Names(theirs)) => mine.extend(theirs),
        }
    }
}

/// Scan a selector for the attributes it reads.
///
/// `#x` reads `id`, `.x` reads `class`, `[name]` reads `name`. Any
/// pseudo-class makes the interest unbounded.
pub(crate) fn attr_interest(selector: &str) -> AttrInterest {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    let mut names = BTreeSet::new();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::IDHash(_) | Token::Hash(_) => {
                names.insert("id".to_string());
            }
            Token::Delim('.') => {
                names.insert("class".to_string());
            }
            Token::Colon => return AttrInterest::All,
            Token::SquareBracketBlock => {
                let name: std::result::Result<_, cssparser::ParseError<'_, ()>> = parser
                    .parse_nested_block(|block| {
                        let mut last_ident = None;
                        while let Ok(token) = block.next() {
                            match token {
                                Token::Ident(ident) => {
                                    if last_ident.is_none() {
                                        last_ident = Some(ident.to_ascii_lowercase());
                                    }
                                }
                                // `[ns|attr]`: the name follows the bar.
                                Token::Delim('|') => last_ident = None,
                                _ => break,
                            }
                        }
                        // The block must be consumed in full, operator and value included.
                        while block.next().is_ok() {}
                        Ok(last_ident)
                    });
                match name {
                    Ok(Some(name)) => {
                        names.insert(name);
                    }
                    _ => return AttrInterest::All,
                }
            }
            _ => {}
        }
    }
    AttrInterest::Names(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_select_in_document_order() {
        let dom = parse_html(
            r#"<ul><li data-id="1"><ul><li data-id="2"></li></ul></li><li data-id="3"></li></ul>"#,
        );
        let ids: Vec<_> = dom
            .select("li")
            .unwrap()
            .into_iter()
            .map(|id| dom.get_attr(id, "data-id").unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_select_list_keeps_document_order() {
        let dom = parse_html(r#"<b>1</b><i>2</i><b>3</b>"#);
        let texts: Vec<_> = dom
            .select("i, b")
            .unwrap()
            .into_iter()
            .map(|id| dom.text_content(id))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_select_by_attribute_value() {
        let dom = parse_html(r#"<li data-id="1">a</li><li data-id="2">b</li><LI DATA-ID="2">c</LI>"#);
        let texts: Vec<_> = dom
            .select(r#"li[data-id="2"]"#)
            .unwrap()
            .into_iter()
            .map(|id| dom.text_content(id))
            .collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_select_skips_detached_nodes() {
        let mut dom = parse_html(r#"<p class="x">a</p><p class="x">b</p>"#);
        let first = dom.select(".x").unwrap()[0];
        dom.detach(first);
        assert_eq!(dom.select(".x").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_selector() {
        let dom = parse_html("<p></p>");
        let err = dom.select("p[").unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));
        assert!(dom.select("").is_err());
    }

    #[test]
    fn test_attr_interest() {
        let names = |s| match attr_interest(s) {
            AttrInterest::Names(n) => n.into_iter().collect::<Vec<_>>(),
            AttrInterest::All => vec!["*".to_string()],
        };
        assert_eq!(names("li"), Vec::<String>::new());
        assert_eq!(names("#main .item"), vec!["class", "id"]);
        assert_eq!(names("[data-id], a[HREF='/']"), vec!["data-id", "href"]);
        assert_eq!(names(r#"li[data-id="1"]"#), vec!["data-id"]);
        assert_eq!(names("a[href^=http] [title~=x i]"), vec!["href", "title"]);
        assert_eq!(names("input:checked"), vec!["*"]);
    }

    #[test]
    fn test_interest_merge() {
        let mut interest = attr_interest(".a");
        interest.merge(attr_interest("[title]"));
        assert!(interest.contains("class"));
        assert!(interest.contains("TITLE"));
        assert!(!interest.contains("id"));

        interest.merge(AttrInterest::All);
        assert!(interest.contains("anything"));
    }
}
