//! Classification of a search response page.
//!
//! The DOM is built and dropped inside `inspect_page` so callers never hold
//! it across an await point.

use scraper::Html;
use url::Url;

use super::{ParseError, ResponseParser};
use crate::models::{CaptchaChallenge, ProceedingBatch};

/// Text shown when the site is still working on an earlier request.
const BUSY_MARKER: &str = "Ваш запрос";

/// Text of the link to the next results page.
const NEXT_PAGE_MARKER: &str = "Следующая";

/// What a search response turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The site wants a captcha solved before answering.
    Captcha(CaptchaChallenge),
    /// Single empty-result block. `busy` is set when it is the
    /// "request in progress" notice rather than a genuine "nothing found".
    Empty { busy: bool },
    /// A results page, with the number of the following page if any.
    Records {
        batch: ProceedingBatch,
        next_page: Option<u32>,
    },
}

/// Classify an unwrapped HTML fragment.
pub fn inspect_page(fragment: &str) -> Result<PageOutcome, ParseError> {
    let html = Html::parse_document(fragment);

    if let Some(img) = html.select(selector!("#capchaVisual")).next() {
        let src = img.value().attr("src").ok_or_else(|| {
            ParseError::MalformedResponse("captcha element has no src".to_string())
        })?;
        return Ok(PageOutcome::Captcha(CaptchaChallenge::new(src)));
    }

    if html.select(selector!("[class*=\"empty\"]")).count() == 1 {
        let text: String = html.root_element().text().collect();
        return Ok(PageOutcome::Empty {
            busy: text.contains(BUSY_MARKER),
        });
    }

    let batch = ResponseParser::new().parse_html(&html)?;
    let next_page = next_page(&html)?;
    Ok(PageOutcome::Records { batch, next_page })
}

/// Page number behind the "next" link of the first pagination block.
fn next_page(html: &Html) -> Result<Option<u32>, ParseError> {
    let Some(block) = html.select(selector!("[class*=\"pagination-is\"]")).next() else {
        return Ok(None);
    };

    let links: Vec<_> = block.select(selector!("a")).collect();
    if links.is_empty() {
        return Err(ParseError::StructureMismatch(
            "pagination block has no links".to_string(),
        ));
    }

    let Some(next) = links
        .iter()
        .find(|a| a.text().collect::<String>().contains(NEXT_PAGE_MARKER))
    else {
        return Ok(None);
    };

    let href = next.value().attr("href").unwrap_or_default();
    page_from_href(href).map(Some)
}

fn page_from_href(href: &str) -> Result<u32, ParseError> {
    let missing =
        || ParseError::StructureMismatch(format!("next page link without a page number: {href:?}"));

    let base = Url::parse("https://is.fssp.gov.ru/").map_err(|_| missing())?;
    let url = base.join(href).map_err(|_| missing())?;
    let page = url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .ok_or_else(missing)?
        .1;
    page.trim().parse().map_err(|_| missing())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "<tr><td>a</td><td>b</td><td>c</td><td></td><td></td><td>f</td><td>g</td><td>h</td></tr>";

    #[test]
    fn test_captcha_page() {
        let html = r#"<form><img id="capchaVisual" src="data:image/jpeg;base64,AAAA"><input name="code"></form>"#;
        assert_eq!(
            inspect_page(html).unwrap(),
            PageOutcome::Captcha(CaptchaChallenge::new("data:image/jpeg;base64,AAAA"))
        );
    }

    #[test]
    fn test_empty_and_busy_pages() {
        let empty = r#"<div class="results"><div class="b-search-message__text empty">По вашему запросу ничего не найдено</div></div>"#;
        assert_eq!(inspect_page(empty).unwrap(), PageOutcome::Empty { busy: false });

        let busy = r#"<div class="empty">Ваш запрос обрабатывается 1 мин. 20 сек.</div>"#;
        assert_eq!(inspect_page(busy).unwrap(), PageOutcome::Empty { busy: true });
    }

    #[test]
    fn test_two_empty_markers_fall_through_to_table_check() {
        let html = r#"<div class="empty">x</div><div class="empty">y</div>"#;
        assert!(matches!(
            inspect_page(html),
            Err(ParseError::StructureMismatch(_))
        ));
    }

    #[test]
    fn test_records_without_pagination() {
        let html = format!("<table>{ROW}{ROW}</table>");
        match inspect_page(&html).unwrap() {
            PageOutcome::Records { batch, next_page } => {
                assert_eq!(batch.len(), 2);
                assert_eq!(next_page, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_next_page_link() {
        let html = format!(
            r#"<table>{ROW}</table><div class="pagination pagination-is">
               <a href="/ajax_search?is%5Bextended%5D=1&page=1">1</a>
               <a href="/ajax_search?is%5Bextended%5D=1&amp;page=2">Следующая &rarr;</a></div>"#
        );
        match inspect_page(&html).unwrap() {
            PageOutcome::Records { next_page, .. } => assert_eq!(next_page, Some(2)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_last_page_has_no_next_link() {
        let html = format!(
            r#"<table>{ROW}</table><div class="pagination-is"><a href="?page=1">Предыдущая</a></div>"#
        );
        match inspect_page(&html).unwrap() {
            PageOutcome::Records { next_page, .. } => assert_eq!(next_page, None),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_broken_pagination_is_structural() {
        for pagination in [
            r#"<div class="pagination-is"><span>1</span></div>"#,
            r#"<div class="pagination-is"><a href="/ajax_search?foo=1">Следующая</a></div>"#,
            r#"<div class="pagination-is"><a href="?page=two">Следующая</a></div>"#,
        ] {
            let html = format!("<table>{ROW}</table>{pagination}");
            assert!(matches!(
                inspect_page(&html),
                Err(ParseError::StructureMismatch(_))
            ));
        }
    }
}
