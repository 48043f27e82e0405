use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{self, Book, BookComment, NewBookComment, User};
use crate::schema::book_comments;
use crate::validation;

impl BookComment {
    pub fn create(
        conn: &mut SqliteConnection,
        author: &User,
        book: &Book,
        comment: &str,
    ) -> Result<BookComment> {
        let mut errors = ValidationErrors::new();
        validation::presence(&mut errors, "comment", comment);
        errors.into_result()?;

        let now = models::now();
        let created = diesel::insert_into(book_comments::table)
            .values(&NewBookComment {
                comment,
                user_id: author.id,
                book_id: book.id,
                created_at: now,
                updated_at: now,
            })
            .returning(BookComment::as_returning())
            .get_result(conn)?;
        tracing::info!(comment_id = created.id, book_id = book.id, "created comment");
        Ok(created)
    }

    pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<BookComment> {
        book_comments::table
            .find(id)
            .select(BookComment::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::NotFound("book comment"))
    }

    pub fn destroy(self, conn: &mut SqliteConnection) -> Result<()> {
        diesel::delete(&self).execute(conn)?;
        tracing::info!(comment_id = self.id, "destroyed comment");
        Ok(())
    }
}

impl Book {
    /// Comments on this book, oldest first.
    pub fn comments(&self, conn: &mut SqliteConnection) -> Result<Vec<BookComment>> {
        Ok(BookComment::belonging_to(self)
            .order(book_comments::id.asc())
            .select(BookComment::as_select())
            .load(conn)?)
    }
}
