//! PubMed E-utilities client.
//!
//! Two phases: esearch returns PMIDs as JSON, then one batched efetch
//! returns the article XML for all of them.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use crate::error::SurveyError;
use super::element_slices;
use crate::paper::{collapse_whitespace, PaperRecord};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SOURCE_NAME: &str = "PubMed";
const ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedSource {
    client: Client,
    search_url: String,
    fetch_url: String,
    api_key: Option<String>,
}

impl PubMedSource {
    pub fn new(
        client: Client,
        search_url: impl Into<String>,
        fetch_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            fetch_url: fetch_url.into(),
            api_key,
        }
    }

    pub async fn fetch(&self, topic: &str, limit: usize) -> Result<Vec<PaperRecord>, SurveyError> {
        let pmids = self.esearch(topic, limit).await?;
        if pmids.is_empty() {
            debug!("PubMed esearch returned no PMIDs");
            return Ok(Vec::new());
        }

        let xml = self.efetch(&pmids).await?;
        let mut papers = parse_articles(&xml);
        papers.truncate(limit);
        debug!("PubMed returned {} of {} articles", papers.len(), pmids.len());
        Ok(papers)
    }

    /// Search PubMed and return a list of PMIDs.
    async fn esearch(&self, topic: &str, limit: usize) -> Result<Vec<String>, SurveyError> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", topic.to_string()),
            ("retmax", limit.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(SurveyError::source_unavailable(
                SOURCE_NAME,
                format!("esearch status: {}", response.status()),
            ));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))?;

        debug!(ids = ?data.esearchresult.idlist, "PubMed esearch returned PMIDs");
        Ok(data.esearchresult.idlist)
    }

    async fn efetch(&self, pmids: &[String]) -> Result<String, SurveyError> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("rettype", "abstract".to_string()),
            ("retmode", "xml".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .get(&self.fetch_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(SurveyError::source_unavailable(
                SOURCE_NAME,
                format!("efetch status: {}", response.status()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Pmid,
    Title,
    Abstract,
}

/// One `<PubmedArticle>` while it is being read.
#[derive(Debug, Default)]
struct ArticleDraft {
    pmid: Option<String>,
    title: String,
    abstract_parts: Vec<String>,
}

impl ArticleDraft {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Pmid => self.pmid.get_or_insert_with(String::new).push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Abstract => match self.abstract_parts.last_mut() {
                Some(part) => part.push_str(text),
                None => self.abstract_parts.push(text.to_string()),
            },
        }
    }

    fn into_record(self) -> Result<PaperRecord, SurveyError> {
        let pmid = self.pmid.as_deref().map(str::trim).unwrap_or("?").to_string();

        let title = collapse_whitespace(&self.title);
        if title.is_empty() {
            return Err(SurveyError::malformed(format!("PMID {} has no ArticleTitle", pmid)));
        }

        let abstract_text = collapse_whitespace(&self.abstract_parts.join(" "));
        if abstract_text.is_empty() {
            return Err(SurveyError::malformed(format!("PMID {} has no AbstractText", pmid)));
        }

        let url = self
            .pmid
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/{}/", ARTICLE_URL, id));

        Ok(PaperRecord::normalized(
            Some(&title),
            Some(&abstract_text),
            url.as_deref(),
        ))
    }
}

/// Parse efetch XML (`<PubmedArticleSet><PubmedArticle>...`) into records.
///
/// Each `<PubmedArticle>` is parsed on its own. Articles without a title or
/// abstract, or whose XML is broken, are skipped and the rest are kept.
fn parse_articles(xml: &str) -> Vec<PaperRecord> {
    element_slices(xml, "PubmedArticle")
        .into_iter()
        .filter_map(|article| match parse_article(article) {
            Ok(paper) => Some(paper),
            Err(e) => {
                debug!("Skipping PubMed article: {}", e);
                None
            }
        })
        .collect()
}

fn parse_article(xml: &str) -> Result<PaperRecord, SurveyError> {
    let mut reader = Reader::from_str(xml);
    let mut draft = ArticleDraft::default();
    let mut field: Option<Field> = None;
    // `<OtherAbstract>` holds translations; only `<Abstract>` text is kept.
    let mut in_abstract = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                // Only the first PMID belongs to the article; later ones are
                // inside comment/correction lists.
                b"PMID" if draft.pmid.is_none() => field = Some(Field::Pmid),
                b"ArticleTitle" => field = Some(Field::Title),
                b"Abstract" => in_abstract = true,
                b"AbstractText" if in_abstract => {
                    draft.abstract_parts.push(String::new());
                    field = Some(Field::Abstract);
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(f) = field {
                    let text = e.unescape().map_err(|err| {
                        SurveyError::malformed(format!("unreadable text: {}", err))
                    })?;
                    draft.push(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(f) = field {
                    draft.push(f, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"PMID" | b"ArticleTitle" | b"AbstractText" => field = None,
                b"Abstract" => in_abstract = false,
                b"PubmedArticle" => return draft.into_record(),
                _ => {}
            },
            Ok(Event::Eof) => {
                return Err(SurveyError::malformed("article ends without </PubmedArticle>"))
            }
            Err(e) => {
                return Err(SurveyError::malformed(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn article(pmid: &str, title: &str, abstract_xml: &str) -> String {
        format!(
            r#"<PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">{pmid}</PMID>
      <Article PubModel="Print">
        <ArticleTitle>{title}</ArticleTitle>
        {abstract_xml}
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="CommentIn"><PMID Version="1">99999999</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>"#
        )
    }

    fn article_set(articles: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" ?>\n<PubmedArticleSet>\n{}\n</PubmedArticleSet>",
            articles.join("\n")
        )
    }

    #[test]
    fn test_parse_minimal_article() {
        let xml = article_set(&[article(
            "12345678",
            "Sweat lactate sensors",
            "<Abstract><AbstractText>Test abstract.</AbstractText></Abstract>",
        )]);

        let papers = parse_articles(&xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Sweat lactate sensors");
        assert_eq!(papers[0].abstract_text, "Test abstract.");
        assert_eq!(papers[0].url, "https://pubmed.ncbi.nlm.nih.gov/12345678/");
    }

    #[test]
    fn test_parse_flattens_inline_markup_and_structured_abstracts() {
        let xml = article_set(&[article(
            "111",
            "Detecting H<sub>2</sub>O<sub>2</sub> with <i>graphene</i> electrodes",
            r#"<Abstract>
                 <AbstractText Label="BACKGROUND">Peroxide matters &amp; is common.</AbstractText>
                 <AbstractText Label="RESULTS">Sensitivity <b>doubled</b>.</AbstractText>
               </Abstract>"#,
        )]);

        let papers = parse_articles(&xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Detecting H2O2 with graphene electrodes");
        assert_eq!(
            papers[0].abstract_text,
            "Peroxide matters & is common. Sensitivity doubled."
        );
    }

    #[test]
    fn test_parse_skips_articles_missing_required_fields() {
        let xml = article_set(&[
            article("1", "No abstract here", ""),
            article(
                "2",
                "",
                "<Abstract><AbstractText>Orphan abstract.</AbstractText></Abstract>",
            ),
            article(
                "3",
                "Complete article",
                "<Abstract><AbstractText>Kept.</AbstractText></Abstract>",
            ),
        ]);

        let papers = parse_articles(&xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Complete article");
        assert_eq!(papers[0].url, "https://pubmed.ncbi.nlm.nih.gov/3/");
    }

    #[test]
    fn test_broken_article_does_not_drop_later_ones() {
        let first = article(
            "10",
            "First article",
            "<Abstract><AbstractText>Fine.</AbstractText></Abstract>",
        );
        let third = article(
            "12",
            "Third article",
            "<Abstract><AbstractText>Also fine.</AbstractText></Abstract>",
        );
        let xml = format!(
            "<PubmedArticleSet>{}<PubmedArticle><MedlineCitation><PMID>11</PMID>\
             <Article><ArticleTitle>Broken</Wrong></Article></MedlineCitation>\
             </PubmedArticle>{}</PubmedArticleSet>",
            first, third
        );

        let papers = parse_articles(&xml);
        let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First article", "Third article"]);
        assert_eq!(papers[1].url, "https://pubmed.ncbi.nlm.nih.gov/12/");
    }

    #[test]
    fn test_truncated_last_article_is_skipped() {
        let first = article(
            "10",
            "Complete",
            "<Abstract><AbstractText>Fine.</AbstractText></Abstract>",
        );
        let xml = format!(
            "<PubmedArticleSet>{}<PubmedArticle><MedlineCitation><PMID>11</PMID>\
             <Article><ArticleTitle>Cut off",
            first
        );

        let papers = parse_articles(&xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Complete");
    }

    #[test]
    fn test_other_abstract_translations_are_ignored() {
        let xml = article_set(&[article(
            "77",
            "Sensores portátiles",
            "<Abstract><AbstractText>English abstract.</AbstractText></Abstract>\
             <OtherAbstract Type=\"Publisher\" Language=\"spa\">\
             <AbstractText>Resumen en español.</AbstractText></OtherAbstract>",
        )]);

        let papers = parse_articles(&xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].abstract_text, "English abstract.");
    }

    #[tokio::test]
    async fn test_fetch_runs_search_then_batched_fetch() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("term".into(), "wearable sensors".into()),
                Matcher::UrlEncoded("retmax".into(), "2".into()),
                Matcher::UrlEncoded("retmode".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"esearchresult": {"count": "2", "idlist": ["1", "2"]}}"#)
            .expect(1)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "1,2".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
            ]))
            .with_status(200)
            .with_body(article_set(&[
                article("1", "One", "<Abstract><AbstractText>A.</AbstractText></Abstract>"),
                article("2", "Two", "<Abstract><AbstractText>B.</AbstractText></Abstract>"),
            ]))
            .expect(1)
            .create_async()
            .await;

        let source = PubMedSource::new(
            Client::new(),
            format!("{}/esearch.fcgi", server.url()),
            format!("{}/efetch.fcgi", server.url()),
            None,
        );
        let papers = source.fetch("wearable sensors", 2).await.unwrap();

        search.assert_async().await;
        fetch.assert_async().await;
        let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_fetch_with_no_ids_skips_efetch() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = PubMedSource::new(
            Client::new(),
            format!("{}/esearch.fcgi", server.url()),
            format!("{}/efetch.fcgi", server.url()),
            Some("ncbi-key".to_string()),
        );
        let papers = source.fetch("nothing matches", 5).await.unwrap();

        fetch.assert_async().await;
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unexpected_json_is_source_unavailable() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let source = PubMedSource::new(
            Client::new(),
            format!("{}/esearch.fcgi", server.url()),
            format!("{}/efetch.fcgi", server.url()),
            None,
        );
        let err = source.fetch("topic", 5).await.unwrap_err();
        assert!(matches!(
            err,
            SurveyError::SourceUnavailable { source_name: "PubMed", .. }
        ));
    }
}
