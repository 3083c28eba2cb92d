//! Fixtures for tests: small generated PDFs and deterministic embedders.
//! Compiled for this crate's tests and behind the `test-util` feature.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::embed::{EmbedError, Embedder};

/// Build a PDF with one page per entry of `pages`, each holding that text.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    save(text_document(pages))
}

/// Like [`text_pdf`], but the trailer declares Standard-handler encryption
/// with an owner/user password pair the empty password does not open.
pub fn encrypted_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = text_document(pages);
    doc.trailer.set(
        "Encrypt",
        dictionary! {
            "Filter" => "Standard",
            "V" => 1_i64,
            "R" => 2_i64,
            "Length" => 40_i64,
            "O" => Object::string_literal(vec![0x4f_u8; 32]),
            "U" => Object::string_literal(vec![0x55_u8; 32]),
            "P" => -44_i64,
        },
    );
    let id = Object::string_literal(vec![0x11_u8; 16]);
    doc.trailer.set("ID", vec![id.clone(), id]);
    save(doc)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize test PDF");
    bytes
}

fn text_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// `count` copies of `word`, space separated.
pub fn repeat_word(word: &str, count: usize) -> String {
    vec![word; count].join(" ")
}

/// Embeds text as a bag of keyword counts: component `i` is how many times
/// `keywords[i]` occurs (case-insensitive). Counts calls.
#[derive(Debug)]
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; self.keywords.len()];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            if let Some(i) = self.keywords.iter().position(|k| *k == word) {
                vector[i] += 1.0;
            }
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Succeeds `successes` times with a constant vector, then fails with HTTP 500.
#[derive(Debug)]
pub struct FailingEmbedder {
    successes: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn after(successes: usize) -> Self {
        Self {
            successes,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.successes {
            Ok(vec![1.0, 1.0])
        } else {
            Err(EmbedError::Status {
                status: 500,
                body: "upstream exploded".into(),
            })
        }
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Never answers.
#[derive(Debug, Default)]
pub struct StallingEmbedder;

#[async_trait]
impl Embedder for StallingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalling"
    }
}
