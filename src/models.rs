use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base URL of the cover image service.
pub const COVERS_BASE_URL: &str = "https://covers.openlibrary.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Books,
    Authors,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Books => "books",
            SearchType::Authors => "authors",
        }
    }
}

/// Lifecycle of a user-submitted book. The review pipeline only ever moves
/// `Pending` to `Published`; `Rejected` exists for completeness and is never
/// produced automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Pending,
    Published,
    Rejected,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Pending => "pending",
            BookStatus::Published => "published",
            BookStatus::Rejected => "rejected",
        }
    }
}

/// The catalog serves long text fields either as a bare string or as a
/// `{ "type": ..., "value": ... }` object. Both forms carry the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    Typed {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        value: String,
    },
}

impl TextValue {
    pub fn text(&self) -> &str {
        match self {
            TextValue::Text(value) => value,
            TextValue::Typed { value, .. } => value,
        }
    }
}

impl From<&str> for TextValue {
    fn from(value: &str) -> Self {
        TextValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn letter(&self) -> char {
        match self {
            CoverSize::Small => 'S',
            CoverSize::Medium => 'M',
            CoverSize::Large => 'L',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Book {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub author_name: Option<Vec<String>>,
    pub first_publish_year: Option<i64>,
    pub cover_i: Option<i64>,
    pub description: Option<TextValue>,
    // Synthesized locally; the catalog does not serve ratings.
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,
    // Fields for user-submitted books
    pub price: Option<f64>,
    pub payment_methods: Option<Vec<String>>,
    #[serde(default)]
    pub is_user_book: bool,
    pub cover_image_url: Option<String>,
    pub status: Option<BookStatus>,
    // Set on outgoing results when the book is in the saved set
    #[serde(default)]
    pub is_saved: bool,
}

impl Book {
    /// Cover image URL for this book. A submitter-provided cover always wins
    /// over the catalog's numeric cover id.
    pub fn cover_url(&self, size: CoverSize) -> Option<String> {
        if let Some(url) = &self.cover_image_url {
            return Some(url.clone());
        }
        self.cover_i
            .map(|id| format!("{}/b/id/{}-{}.jpg", COVERS_BASE_URL, id, size.letter()))
    }

    /// Fold enrichment data into this record. Fields present in `incoming`
    /// replace ours; absent fields never clobber values already filled.
    fn merge(&mut self, incoming: Book) {
        if !incoming.key.is_empty() {
            self.key = incoming.key;
        }
        if !incoming.title.is_empty() {
            self.title = incoming.title;
        }
        if incoming.author_name.is_some() {
            self.author_name = incoming.author_name;
        }
        if incoming.first_publish_year.is_some() {
            self.first_publish_year = incoming.first_publish_year;
        }
        if incoming.cover_i.is_some() {
            self.cover_i = incoming.cover_i;
        }
        if incoming.description.is_some() {
            self.description = incoming.description;
        }
        if incoming.average_rating.is_some() {
            self.average_rating = incoming.average_rating;
        }
        if incoming.ratings_count.is_some() {
            self.ratings_count = incoming.ratings_count;
        }
        if incoming.price.is_some() {
            self.price = incoming.price;
        }
        if incoming.payment_methods.is_some() {
            self.payment_methods = incoming.payment_methods;
        }
        if incoming.cover_image_url.is_some() {
            self.cover_image_url = incoming.cover_image_url;
        }
        if incoming.status.is_some() {
            self.status = incoming.status;
        }
        self.is_user_book |= incoming.is_user_book;
        self.is_saved |= incoming.is_saved;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Author {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub top_work: Option<String>,
    #[serde(default)]
    pub work_count: i64,
}

impl Author {
    pub fn photo_url(&self, size: CoverSize) -> String {
        format!(
            "{}/a/olid/{}-{}.jpg",
            COVERS_BASE_URL,
            self.key,
            size.letter()
        )
    }
}

/// A search result from the catalog. The discriminant is fixed when the
/// record is constructed, never inferred from field shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogItem {
    Book(Book),
    Author(Author),
}

impl CatalogItem {
    pub fn key(&self) -> &str {
        match self {
            CatalogItem::Book(book) => &book.key,
            CatalogItem::Author(author) => &author.key,
        }
    }

    pub fn search_type(&self) -> SearchType {
        match self {
            CatalogItem::Book(_) => SearchType::Books,
            CatalogItem::Author(_) => SearchType::Authors,
        }
    }

    pub fn as_book(&self) -> Option<&Book> {
        match self {
            CatalogItem::Book(book) => Some(book),
            CatalogItem::Author(_) => None,
        }
    }
}

/// Book record extended with the fields only the detail endpoint serves.
/// The extras stay `None` until an enrichment merge fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub subjects: Option<Vec<String>>,
    pub covers: Option<Vec<i64>>,
    pub first_publish_date: Option<String>,
}

impl BookDetails {
    pub fn from_summary(book: Book) -> Self {
        BookDetails {
            book,
            subjects: None,
            covers: None,
            first_publish_date: None,
        }
    }

    pub fn merge(&mut self, incoming: BookDetails) {
        self.book.merge(incoming.book);
        if incoming.subjects.is_some() {
            self.subjects = incoming.subjects;
        }
        if incoming.covers.is_some() {
            self.covers = incoming.covers;
        }
        if incoming.first_publish_date.is_some() {
            self.first_publish_date = incoming.first_publish_date;
        }
    }

    pub fn cover_url(&self, size: CoverSize) -> Option<String> {
        if let Some(url) = &self.book.cover_image_url {
            return Some(url.clone());
        }
        let cover_id = self
            .covers
            .as_ref()
            .and_then(|ids| ids.first().copied())
            .or(self.book.cover_i);
        cover_id.map(|id| format!("{}/b/id/{}-{}.jpg", COVERS_BASE_URL, id, size.letter()))
    }
}

/// Author record extended with biography fields from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthorDetails {
    #[serde(flatten)]
    pub author: Author,
    pub bio: Option<TextValue>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub photos: Option<Vec<i64>>,
}

impl AuthorDetails {
    pub fn from_summary(author: Author) -> Self {
        AuthorDetails {
            author,
            bio: None,
            birth_date: None,
            death_date: None,
            photos: None,
        }
    }

    pub fn merge(&mut self, incoming: AuthorDetails) {
        if !incoming.author.key.is_empty() {
            self.author.key = incoming.author.key;
        }
        if !incoming.author.name.is_empty() {
            self.author.name = incoming.author.name;
        }
        if incoming.author.top_work.is_some() {
            self.author.top_work = incoming.author.top_work;
        }
        if incoming.author.work_count != 0 {
            self.author.work_count = incoming.author.work_count;
        }
        if incoming.bio.is_some() {
            self.bio = incoming.bio;
        }
        if incoming.birth_date.is_some() {
            self.birth_date = incoming.birth_date;
        }
        if incoming.death_date.is_some() {
            self.death_date = incoming.death_date;
        }
        if incoming.photos.is_some() {
            self.photos = incoming.photos;
        }
    }

    pub fn photo_url(&self, size: CoverSize) -> String {
        match self.photos.as_ref().and_then(|ids| ids.first().copied()) {
            Some(id) => format!("{}/a/id/{}-{}.jpg", COVERS_BASE_URL, id, size.letter()),
            None => format!(
                "{}/a/olid/{}-{}.jpg?default=false",
                COVERS_BASE_URL,
                self.author.key,
                size.letter()
            ),
        }
    }
}

/// Detail-view record for either kind of catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetailRecord {
    Book(BookDetails),
    Author(AuthorDetails),
}

impl DetailRecord {
    pub fn from_summary(item: CatalogItem) -> Self {
        match item {
            CatalogItem::Book(book) => DetailRecord::Book(BookDetails::from_summary(book)),
            CatalogItem::Author(author) => {
                DetailRecord::Author(AuthorDetails::from_summary(author))
            }
        }
    }

    pub fn key(&self) -> &str {
        match self {
            DetailRecord::Book(details) => &details.book.key,
            DetailRecord::Author(details) => &details.author.key,
        }
    }

    /// Merge an enrichment result of the same kind; a mismatched kind is
    /// dropped (the resolver's sequence guard keeps kinds aligned).
    pub fn merge(&mut self, incoming: DetailRecord) {
        match (self, incoming) {
            (DetailRecord::Book(held), DetailRecord::Book(incoming)) => held.merge(incoming),
            (DetailRecord::Author(held), DetailRecord::Author(incoming)) => held.merge(incoming),
            _ => {}
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchPage {
    pub items: Vec<CatalogItem>,
    pub total_found: i64,
}

impl SearchPage {
    pub fn empty() -> Self {
        SearchPage::default()
    }

    /// Number of pages needed for `total_found` results at `page_size` per
    /// page; zero results means zero pages.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        let found = self.total_found.max(0) as u64;
        found.div_ceil(page_size as u64) as u32
    }
}

/// Wire envelope of the search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub docs: Vec<T>,
    #[serde(default, rename = "numFound")]
    pub num_found: i64,
}

/// One executed purchase. Records are append-only and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub book_key: String,
    pub book_title: String,
    pub price: f64,
    pub author_cut: f64,
    pub owner_cut: f64,
    pub timestamp: DateTime<Utc>,
}
