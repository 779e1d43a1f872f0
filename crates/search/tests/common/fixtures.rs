//! Test fixtures: a handful of users, forms, translations, files and tags.

use chrono::{NaiveDate, NaiveDateTime};

use old_search::sql::{DATE_STORAGE_FORMAT, DATETIME_STORAGE_FORMAT};

/// A form row.
#[derive(Debug, Clone)]
pub struct FormFixture {
    pub id: i64,
    pub transcription: String,
    pub morpheme_break: Option<String>,
    pub comments: Option<String>,
    pub status: Option<String>,
    pub date_elicited: Option<NaiveDate>,
    pub datetime_entered: Option<NaiveDateTime>,
    pub enterer_id: Option<i64>,
}

impl FormFixture {
    pub fn new(id: i64, transcription: impl Into<String>) -> Self {
        Self {
            id,
            transcription: transcription.into(),
            morpheme_break: None,
            comments: None,
            status: None,
            date_elicited: None,
            datetime_entered: None,
            enterer_id: None,
        }
    }

    pub fn with_morpheme_break(mut self, morpheme_break: &str) -> Self {
        self.morpheme_break = Some(morpheme_break.to_string());
        self
    }

    pub fn with_comments(mut self, comments: &str) -> Self {
        self.comments = Some(comments.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_date_elicited(mut self, y: i32, m: u32, d: u32) -> Self {
        self.date_elicited = NaiveDate::from_ymd_opt(y, m, d);
        self
    }

    pub fn with_datetime_entered(mut self, datetime: &str) -> Self {
        self.datetime_entered =
            Some(NaiveDateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M:%S").unwrap());
        self
    }

    pub fn with_enterer(mut self, user_id: i64) -> Self {
        self.enterer_id = Some(user_id);
        self
    }

    pub fn date_elicited_text(&self) -> Option<String> {
        self.date_elicited
            .map(|d| d.format(DATE_STORAGE_FORMAT).to_string())
    }

    pub fn datetime_entered_text(&self) -> Option<String> {
        self.datetime_entered
            .map(|dt| dt.format(DATETIME_STORAGE_FORMAT).to_string())
    }
}

/// The seeded forms.
///
/// | id | transcription | enterer | files | translations      | tags       | memorizers |
/// |----|---------------|---------|-------|-------------------|------------|------------|
/// | 1  | dog           | Joel    | 10    | dog, canine       |            |            |
/// | 2  | Dog           | Sally   | 11    |                   | restricted |            |
/// | 3  | cat           |         |       | feline            |            | Joel       |
/// | 4  | chien         | Bob     |       |                   |            | Sally      |
pub fn form_fixtures() -> Vec<FormFixture> {
    vec![
        FormFixture::new(1, "dog")
            .with_morpheme_break("dog")
            .with_status("tested")
            .with_date_elicited(2011, 5, 1)
            .with_datetime_entered("2012-03-01T10:00:00")
            .with_enterer(1),
        FormFixture::new(2, "Dog")
            .with_morpheme_break("Dog-s")
            .with_comments("plural")
            .with_status("requires testing")
            .with_date_elicited(2012, 6, 1)
            .with_datetime_entered("2013-01-15T08:30:00")
            .with_enterer(2),
        FormFixture::new(3, "cat")
            .with_comments("loan")
            .with_status("tested")
            .with_datetime_entered("2012-03-01T10:00:01"),
        FormFixture::new(4, "chien")
            .with_morpheme_break("chien")
            .with_status("tested")
            .with_date_elicited(2010, 1, 31)
            .with_enterer(3),
    ]
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use rusqlite::params;

    use old_search::SqliteExecutor;

    use super::form_fixtures;

    /// An in-memory executor over the built-in schema with the fixture rows
    /// loaded.
    pub fn seeded_executor() -> SqliteExecutor {
        let executor = SqliteExecutor::in_memory(super::super::registry())
            .expect("Failed to create SQLite executor");
        executor.init_schema().expect("Failed to initialize schema");

        let conn = executor.connection();
        conn.execute_batch(
            "INSERT INTO user (id, username, first_name, last_name, role) VALUES
                (1, 'jdunham', 'Joel', 'Dunham', 'administrator'),
                (2, 'ssmith', 'Sally', 'Smith', 'contributor'),
                (3, 'bjones', 'Bob', 'Jones', 'viewer');
             INSERT INTO file (id, filename, size) VALUES
                (10, 'dog.wav', 2048),
                (11, 'dogs.wav', 4096);
             INSERT INTO formfile (form_id, file_id) VALUES (1, 10), (2, 11);
             INSERT INTO translation (id, transcription, grammaticality, form_id) VALUES
                (1, 'dog', '', 1),
                (2, 'canine', '', 1),
                (3, 'feline', '', 3);
             INSERT INTO tag (id, name) VALUES (1, 'restricted');
             INSERT INTO formtag (form_id, tag_id) VALUES (2, 1);
             INSERT INTO userform (form_id, user_id) VALUES (3, 1), (4, 2);",
        )
        .expect("Failed to load fixtures");

        for form in form_fixtures() {
            conn.execute(
                "INSERT INTO form (id, transcription, morpheme_break, comments, status,
                    date_elicited, datetime_entered, enterer_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    form.id,
                    form.transcription,
                    form.morpheme_break,
                    form.comments,
                    form.status,
                    form.date_elicited_text(),
                    form.datetime_entered_text(),
                    form.enterer_id,
                ],
            )
            .expect("Failed to insert form");
        }

        executor
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::seeded_executor;
