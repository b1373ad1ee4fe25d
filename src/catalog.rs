use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::CatalogError;
use crate::models::{Author, AuthorDetails, Book, BookDetails, SearchResponse};
use crate::ratings;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
/// Fixed page size used for all catalog searches.
pub const PAGE_SIZE: u32 = 20;

const HTTP_TIMEOUT_SECS: u64 = 6;
const HTTP_MAX_RETRIES: u64 = 1;
const HTTP_USER_AGENT: &str = "Openshelf/0.1 (catalog explorer)";

/// HTTP seam of the catalog client. Production goes through [`HttpTransport`];
/// tests supply a canned transport so nothing touches the network.
pub trait CatalogTransport: Send + Sync {
    fn get_json(&self, url: &str) -> Result<Value, CatalogError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(HttpTransport { client })
    }
}

impl CatalogTransport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value, CatalogError> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .header(reqwest::header::USER_AGENT, HTTP_USER_AGENT)
                .send();

            let response = match response {
                Ok(value) => value,
                Err(err) => {
                    if attempt < HTTP_MAX_RETRIES {
                        log::warn!("catalog transport error, retrying: url={} err={}", url, err);
                        std::thread::sleep(Duration::from_millis(350 * (attempt + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(err.into());
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response.json::<Value>()?);
            }

            if (status.as_u16() == 429 || status.is_server_error()) && attempt < HTTP_MAX_RETRIES {
                let retry_after_ms = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .map(|value| value * 1000)
                    .unwrap_or(350 * (attempt + 1));
                log::warn!("catalog status {}, retrying: url={}", status, url);
                std::thread::sleep(Duration::from_millis(retry_after_ms.min(4_000)));
                attempt += 1;
                continue;
            }

            return Err(CatalogError::Http {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
    }
}

// Wire shape of the subject endpoint; only the client needs it.
#[derive(Debug, Deserialize)]
struct SubjectResponse {
    #[serde(default)]
    works: Vec<SubjectWork>,
}

#[derive(Debug, Deserialize)]
struct SubjectWork {
    key: String,
    #[serde(default)]
    title: String,
    authors: Option<Vec<SubjectAuthor>>,
    first_publish_year: Option<i64>,
    cover_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SubjectAuthor {
    name: String,
}

/// Thin wrapper over the catalog's search, detail, and subject endpoints.
pub struct CatalogClient {
    base_url: String,
    page_size: u32,
    transport: Arc<dyn CatalogTransport>,
}

impl CatalogClient {
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new()?)))
    }

    pub fn with_transport(transport: Arc<dyn CatalogTransport>) -> Self {
        let base_url = std::env::var("OPENSHELF_API_BASE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        CatalogClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: PAGE_SIZE,
            transport,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search_books(&self, query: &str, page: u32) -> Result<SearchResponse<Book>, CatalogError> {
        let url = format!(
            "{}/search.json?q={}&page={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            page,
            self.page_size
        );
        let mut response: SearchResponse<Book> = serde_json::from_value(self.transport.get_json(&url)?)?;
        ratings::enrich_all(&mut response.docs);
        Ok(response)
    }

    pub fn search_authors(
        &self,
        query: &str,
        page: u32,
    ) -> Result<SearchResponse<Author>, CatalogError> {
        let url = format!(
            "{}/search/authors.json?q={}&page={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            page,
            self.page_size
        );
        Ok(serde_json::from_value(self.transport.get_json(&url)?)?)
    }

    /// Full record for a book key as served by search results
    /// (e.g. `/works/OL45883W`).
    pub fn book_details(&self, key: &str) -> Result<BookDetails, CatalogError> {
        let path = key.trim_start_matches('/');
        let url = format!("{}/{}.json", self.base_url, path);
        let mut details: BookDetails = serde_json::from_value(self.transport.get_json(&url)?)?;
        ratings::enrich(&mut details.book);
        Ok(details)
    }

    /// Full record for an author key (`OL23919A`, with or without the
    /// `/authors/` prefix).
    pub fn author_details(&self, key: &str) -> Result<AuthorDetails, CatalogError> {
        let bare = key.trim_start_matches('/');
        let bare = bare.strip_prefix("authors/").unwrap_or(bare);
        let url = format!("{}/authors/{}.json", self.base_url, bare);
        Ok(serde_json::from_value(self.transport.get_json(&url)?)?)
    }

    /// Books filed under a subject, mapped into summary records. Works with
    /// no author list get the "Unknown Author" placeholder.
    pub fn books_by_subject(&self, subject: &str, limit: u32) -> Result<Vec<Book>, CatalogError> {
        let url = format!(
            "{}/subjects/{}.json?limit={}",
            self.base_url,
            urlencoding::encode(subject),
            limit
        );
        let response: SubjectResponse = serde_json::from_value(self.transport.get_json(&url)?)?;
        let mut books: Vec<Book> = response
            .works
            .into_iter()
            .map(|work| Book {
                key: work.key,
                title: work.title,
                author_name: Some(match work.authors {
                    Some(authors) => authors.into_iter().map(|author| author.name).collect(),
                    None => vec!["Unknown Author".to_string()],
                }),
                first_publish_year: work.first_publish_year,
                cover_i: work.cover_id,
                ..Book::default()
            })
            .collect();
        ratings::enrich_all(&mut books);
        Ok(books)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::FakeTransport;
    use super::*;
    use crate::error::CatalogError;

    fn client_with(transport: &std::sync::Arc<FakeTransport>) -> CatalogClient {
        CatalogClient::with_transport(transport.clone()).with_base_url("https://catalog.test")
    }

    #[test]
    fn search_books_parses_envelope_and_synthesizes_ratings() {
        let transport = FakeTransport::new();
        transport.respond(
            "/search.json?q=dune&page=1&limit=20",
            json!({
                "docs": [
                    {"key": "/works/OL1W", "title": "Dune", "author_name": ["Frank Herbert"]},
                    {"key": "/works/OL2W", "title": "Dune Messiah"}
                ],
                "numFound": 41
            }),
        );

        let response = client_with(&transport)
            .search_books("dune", 1)
            .expect("search");

        assert_eq!(response.num_found, 41);
        assert_eq!(response.docs.len(), 2);
        for doc in &response.docs {
            let rating = doc.average_rating.expect("rating synthesized");
            assert!((1.5..=4.9).contains(&rating));
            assert!(doc.ratings_count.is_some());
        }
    }

    #[test]
    fn non_2xx_surfaces_status_and_body() {
        let transport = FakeTransport::new();
        transport.fail("/search.json", 503, "upstream unavailable");

        let err = client_with(&transport)
            .search_books("dune", 1)
            .expect_err("must fail");

        match err {
            CatalogError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn author_details_accepts_bare_and_prefixed_keys() {
        let transport = FakeTransport::new();
        transport.respond(
            "/authors/OL23919A.json",
            json!({"key": "/authors/OL23919A", "name": "J. K. Rowling", "birth_date": "31 July 1965"}),
        );

        let client = client_with(&transport);
        let bare = client.author_details("OL23919A").expect("bare key");
        let prefixed = client.author_details("/authors/OL23919A").expect("prefixed key");

        assert_eq!(bare.birth_date.as_deref(), Some("31 July 1965"));
        assert_eq!(bare.author.name, prefixed.author.name);
    }

    #[test]
    fn subject_works_map_to_books_with_unknown_author_fallback() {
        let transport = FakeTransport::new();
        transport.respond(
            "/subjects/fantasy.json?limit=10",
            json!({
                "works": [
                    {
                        "key": "/works/OL3W",
                        "title": "The Hobbit",
                        "authors": [{"name": "J. R. R. Tolkien"}],
                        "first_publish_year": 1937,
                        "cover_id": 123
                    },
                    {"key": "/works/OL4W", "title": "Anonymous Tales"}
                ]
            }),
        );

        let books = client_with(&transport)
            .books_by_subject("fantasy", 10)
            .expect("subject fetch");

        assert_eq!(books.len(), 2);
        assert_eq!(
            books[0].author_name.as_deref(),
            Some(&["J. R. R. Tolkien".to_string()][..])
        );
        assert_eq!(books[0].cover_i, Some(123));
        assert_eq!(
            books[1].author_name.as_deref(),
            Some(&["Unknown Author".to_string()][..])
        );
        assert!(books[1].average_rating.is_some());
    }

    #[test]
    fn book_details_hits_work_path_and_enriches() {
        let transport = FakeTransport::new();
        transport.respond(
            "/works/OL1W.json",
            json!({
                "key": "/works/OL1W",
                "title": "Dune",
                "description": {"type": "/type/text", "value": "Sand."},
                "covers": [44],
                "subjects": ["Science fiction"]
            }),
        );

        let details = client_with(&transport)
            .book_details("/works/OL1W")
            .expect("details");

        assert_eq!(details.book.title, "Dune");
        assert_eq!(details.covers.as_deref(), Some(&[44][..]));
        assert!(details.book.average_rating.is_some());
    }
}
