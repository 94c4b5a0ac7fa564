//! Index schema and field weights.

use super::tokenizer::{TAG_TOKENIZER, TEXT_TOKENIZER};
use serde::Serialize;
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};

/// Relative weight of matches in each relevance-scored field
pub const TITLE_BOOST: f32 = 3.0;
pub const HEADINGS_BOOST: f32 = 2.0;
pub const CODE_BLOCKS_BOOST: f32 = 1.5;
pub const CONTENT_BOOST: f32 = 1.0;
pub const TAGS_BOOST: f32 = 2.5;

/// Handles to every field of the document schema
#[derive(Debug, Clone, Copy)]
pub struct DocFields {
    pub url: Field,
    pub file_path: Field,
    pub title: Field,
    pub content: Field,
    pub headings: Field,
    pub code_blocks: Field,
    pub tags: Field,
}

impl DocFields {
    /// The segmented text fields with their boosts, in query order
    pub fn text_fields(&self) -> [(Field, f32); 4] {
        [
            (self.title, TITLE_BOOST),
            (self.content, CONTENT_BOOST),
            (self.headings, HEADINGS_BOOST),
            (self.code_blocks, CODE_BLOCKS_BOOST),
        ]
    }
}

/// Human-readable description of one schema field
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stored: bool,
    pub boost: Option<f32>,
}

fn text_options(tokenizer: &str, record: IndexRecordOption) -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(tokenizer)
                .set_index_option(record),
        )
        .set_stored()
}

/// Build the schema: exact identifiers, segmented text fields and a keyword list
pub fn build_schema() -> (Schema, DocFields) {
    let mut builder = Schema::builder();
    let text = text_options(TEXT_TOKENIZER, IndexRecordOption::WithFreqsAndPositions);

    let fields = DocFields {
        url: builder.add_text_field("url", STRING | STORED),
        file_path: builder.add_text_field("file_path", STRING | STORED),
        title: builder.add_text_field("title", text.clone()),
        content: builder.add_text_field("content", text.clone()),
        headings: builder.add_text_field("headings", text.clone()),
        code_blocks: builder.add_text_field("code_blocks", text),
        tags: builder.add_text_field(
            "tags",
            text_options(TAG_TOKENIZER, IndexRecordOption::WithFreqs),
        ),
    };

    (builder.build(), fields)
}

/// Static description of the schema for stats output
pub fn describe_schema() -> Vec<FieldDescriptor> {
    let field = |name, kind, boost| FieldDescriptor {
        name,
        kind,
        stored: true,
        boost,
    };
    vec![
        field("url", "id", None),
        field("file_path", "id", None),
        field("title", "text", Some(TITLE_BOOST)),
        field("content", "text", Some(CONTENT_BOOST)),
        field("headings", "text", Some(HEADINGS_BOOST)),
        field("code_blocks", "text", Some(CODE_BLOCKS_BOOST)),
        field("tags", "keyword", Some(TAGS_BOOST)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_all_fields() {
        let (schema, fields) = build_schema();
        for name in ["url", "file_path", "title", "content", "headings", "code_blocks", "tags"] {
            assert!(schema.get_field(name).is_ok(), "missing field {name}");
        }
        assert_eq!(schema.get_field("title").unwrap(), fields.title);
        assert_eq!(describe_schema().len(), 7);
    }

    #[test]
    fn test_text_fields_carry_boosts() {
        let (_, fields) = build_schema();
        let boosts: Vec<f32> = fields.text_fields().iter().map(|(_, b)| *b).collect();
        assert_eq!(boosts, vec![3.0, 1.0, 2.0, 1.5]);
    }
}
