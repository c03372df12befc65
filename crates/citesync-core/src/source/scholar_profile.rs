//! Google Scholar profile page scraper.
//!
//! Reads the public `citations?user=<id>` page directly. No API key is
//! needed, but Scholar blocks automated clients aggressively, so a 403/429 is
//! reported as a provider error rather than retried.

use super::{CitationSource, DEFAULT_MAX_PAGES, check_status};
use crate::CoreError;
use crate::citations::CitationEntry;
use scraper::{Html, Selector};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const PAGE_SIZE: usize = 100;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

pub struct ScholarProfile {
    pub base_url: String,
    pub max_pages: usize,
}

impl Default for ScholarProfile {
    fn default() -> Self {
        Self {
            base_url: "https://scholar.google.com".to_string(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl ScholarProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn page_url(&self, author_id: &str, start: usize) -> String {
        format!(
            "{}/citations?user={}&hl=en&cstart={}&pagesize={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(author_id),
            start,
            PAGE_SIZE
        )
    }
}

impl CitationSource for ScholarProfile {
    fn name(&self) -> &str {
        "Google Scholar"
    }

    fn fetch<'a>(
        &'a self,
        author_id: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = Vec::new();

            for page in 0..self.max_pages {
                let url = self.page_url(author_id, page * PAGE_SIZE);
                let resp = client
                    .get(&url)
                    .header("User-Agent", USER_AGENT)
                    .header("Accept-Language", "en-US,en;q=0.5")
                    .timeout(timeout)
                    .send()
                    .await?;

                check_profile_status(resp.status(), &url)?;

                let body = resp.text().await?;

                // Parse in spawn_blocking to avoid !Send scraper types in async context
                let rows = tokio::task::spawn_blocking(move || parse_profile_page(&body))
                    .await
                    .map_err(|e| CoreError::Provider(e.to_string()))?;

                if page == 0 && rows.is_empty() {
                    return Err(CoreError::Provider(
                        "no publications found on the Scholar profile page (unknown author id or page structure not recognised)".to_string(),
                    ));
                }

                tracing::debug!(page, rows = rows.len(), "Scholar profile page");
                let full_page = rows.len() >= PAGE_SIZE;
                entries.extend(rows);
                if !full_page {
                    return Ok(entries);
                }
            }

            tracing::warn!(
                max_pages = self.max_pages,
                "Scholar pagination limit reached, later publications ignored"
            );
            Ok(entries)
        })
    }
}

/// 403 and 429 mean Scholar is blocking automated access; other failures
/// get the generic provider message.
fn check_profile_status(status: reqwest::StatusCode, url: &str) -> Result<(), CoreError> {
    if matches!(status.as_u16(), 403 | 429) {
        return Err(CoreError::Provider(format!(
            "Google Scholar refused the request ({}); automated access is likely blocked. Check manually at {}",
            status.as_u16(),
            url
        )));
    }
    check_status("Google Scholar", status)
}

/// Extract (title, citations) rows from a Scholar profile page.
///
/// Rows with no title are dropped; an empty citation cell counts as 0.
pub fn parse_profile_page(html: &str) -> Vec<CitationEntry> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.gsc_a_tr").unwrap();
    let title_selector = Selector::parse("a.gsc_a_at").unwrap();
    let cited_selector = Selector::parse("a.gsc_a_ac").unwrap();

    document
        .select(&row_selector)
        .filter_map(|row| {
            let title = row
                .select(&title_selector)
                .next()?
                .text()
                .collect::<String>()
                .trim()
                .to_string();
            if title.is_empty() {
                return None;
            }
            let citations = row
                .select(&cited_selector)
                .next()
                .map(|cell| {
                    let digits: String = cell
                        .text()
                        .collect::<String>()
                        .chars()
                        .filter(char::is_ascii_digit)
                        .collect();
                    digits.parse().unwrap_or(0)
                })
                .unwrap_or(0);
            Some(CitationEntry::new(title, citations))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body><table id="gsc_a_t"><tbody id="gsc_a_b">
<tr class="gsc_a_tr">
  <td class="gsc_a_t"><a href="/citations?view_op=1" class="gsc_a_at">Attention is all you need</a>
    <div class="gs_gray">A Vaswani, N Shazeer</div></td>
  <td class="gsc_a_c"><a href="https://scholar.google.com/scholar?cites=1" class="gsc_a_ac gs_ibl">1,234</a></td>
  <td class="gsc_a_y"><span class="gsc_a_h gsc_a_hc gs_ibl">2017</span></td>
</tr>
<tr class="gsc_a_tr">
  <td class="gsc_a_t"><a href="/citations?view_op=2" class="gsc_a_at">A Paper &amp; Its Sequel</a></td>
  <td class="gsc_a_c"><a href="" class="gsc_a_ac gs_ibl gsc_a_acm"></a></td>
</tr>
<tr class="gsc_a_tr">
  <td class="gsc_a_t"><a class="gsc_a_at">   </a></td>
  <td class="gsc_a_c"><a class="gsc_a_ac">9</a></td>
</tr>
</tbody></table></body></html>
"#;

    #[test]
    fn parses_rows() {
        let rows = parse_profile_page(PAGE);
        assert_eq!(
            rows,
            vec![
                CitationEntry::new("Attention is all you need", 1234),
                CitationEntry::new("A Paper & Its Sequel", 0),
            ]
        );
    }

    #[test]
    fn unrecognised_page_yields_nothing() {
        let page = "<html><body><p>Please show you're not a robot</p></body></html>";
        assert!(parse_profile_page(page).is_empty());
    }

    #[test]
    fn blocked_statuses_carry_manual_check_hint() {
        let url = "https://scholar.google.com/citations?user=X";
        for code in [403u16, 429] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            match check_profile_status(status, url) {
                Err(CoreError::Provider(msg)) => {
                    assert!(msg.contains("automated access is likely blocked"), "{msg}");
                    assert!(msg.contains(url), "{msg}");
                    assert!(msg.contains(&code.to_string()), "{msg}");
                }
                other => panic!("expected Provider error for {code}, got {other:?}"),
            }
        }
    }

    #[test]
    fn other_statuses_use_generic_check() {
        let url = "https://scholar.google.com/citations?user=X";
        assert!(check_profile_status(reqwest::StatusCode::OK, url).is_ok());
        match check_profile_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, url) {
            Err(CoreError::Provider(msg)) => assert!(!msg.contains("blocked"), "{msg}"),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn page_url_paginates() {
        let source = ScholarProfile {
            base_url: "https://scholar.example/".to_string(),
            max_pages: 2,
        };
        assert_eq!(
            source.page_url("AbC_12", 100),
            "https://scholar.example/citations?user=AbC_12&hl=en&cstart=100&pagesize=100"
        );
    }
}
