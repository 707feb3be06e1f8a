//! Column mappings of the concrete record kinds.
//!
//! Each record kind opts into the generic store explicitly by implementing
//! `RecordTable`; payload columns are listed here and nowhere else.

use crate::model::audit::Tracked;
use crate::model::course::Course;
use crate::model::document::Document;
use crate::model::library_book::LibraryBook;
use crate::model::publication::Publication;
use crate::model::status::DocumentStatus;
use crate::model::university::University;
use crate::repo::record_repo::{
    optional_integer, optional_text, parse_uuid, read_audit, read_id, RecordTable, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;

impl RecordTable for University {
    const COLUMNS: &'static [&'static str] = &["name", "code", "country", "website"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            optional_text(self.code.as_deref()),
            optional_text(self.country.as_deref()),
            optional_text(self.website.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: read_id(row, Self::KIND)?,
            name: row.get("name")?,
            code: row.get("code")?,
            country: row.get("country")?,
            website: row.get("website")?,
            audit: read_audit(row)?,
        })
    }
}

impl RecordTable for Course {
    const COLUMNS: &'static [&'static str] =
        &["university_id", "title", "code", "credits", "description"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.university_id.to_string()),
            Value::Text(self.title.clone()),
            optional_text(self.code.as_deref()),
            optional_integer(self.credits),
            optional_text(self.description.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let university_id: String = row.get("university_id")?;
        Ok(Self {
            id: read_id(row, Self::KIND)?,
            university_id: parse_uuid(&university_id, "courses", "university_id")?,
            title: row.get("title")?,
            code: row.get("code")?,
            credits: row.get("credits")?,
            description: row.get("description")?,
            audit: read_audit(row)?,
        })
    }
}

impl RecordTable for Document {
    const COLUMNS: &'static [&'static str] =
        &["title", "description", "status", "due_date", "status_log"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            optional_text(self.description.as_deref()),
            Value::Text(self.status.as_str().to_string()),
            date_value(self.due_date),
            Value::Text(self.status_log.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: read_id(row, Self::KIND)?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: read_status(row, "documents")?,
            due_date: read_date(row, "documents", "due_date")?,
            status_log: row.get("status_log")?,
            audit: read_audit(row)?,
        })
    }
}

impl RecordTable for Publication {
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "authors",
        "journal",
        "published_on",
        "status",
        "status_log",
    ];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.authors.clone()),
            optional_text(self.journal.as_deref()),
            date_value(self.published_on),
            Value::Text(self.status.as_str().to_string()),
            Value::Text(self.status_log.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: read_id(row, Self::KIND)?,
            title: row.get("title")?,
            authors: row.get("authors")?,
            journal: row.get("journal")?,
            published_on: read_date(row, "publications", "published_on")?,
            status: read_status(row, "publications")?,
            status_log: row.get("status_log")?,
            audit: read_audit(row)?,
        })
    }
}

impl RecordTable for LibraryBook {
    const COLUMNS: &'static [&'static str] = &["title", "author", "isbn", "copies"];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.author.clone()),
            optional_text(self.isbn.as_deref()),
            Value::Integer(self.copies),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: read_id(row, Self::KIND)?,
            title: row.get("title")?,
            author: row.get("author")?,
            isbn: row.get("isbn")?,
            copies: row.get("copies")?,
            audit: read_audit(row)?,
        })
    }
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map_or(Value::Null, |date| Value::Text(date.to_string()))
}

fn read_date(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => text.parse::<NaiveDate>().map(Some).map_err(|_| {
            RepoError::InvalidData(format!("invalid date `{text}` in {table}.{column}"))
        }),
        None => Ok(None),
    }
}

fn read_status(row: &Row<'_>, table: &str) -> RepoResult<DocumentStatus> {
    let text: String = row.get("status")?;
    text.parse()
        .map_err(|_| RepoError::InvalidData(format!("invalid status `{text}` in {table}.status")))
}
