use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{self, Book, NewBook, User};
use crate::schema::{book_comments, books, favorites};
use crate::validation;

fn validate(title: &str, body: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    validation::presence(&mut errors, "title", title);
    if validation::presence(&mut errors, "body", body) {
        validation::length(&mut errors, "body", body, None, Some(validation::BOOK_BODY_MAX));
    }
    errors.into_result()
}

impl Book {
    pub fn create(conn: &mut SqliteConnection, owner: &User, title: &str, body: &str) -> Result<Book> {
        validate(title, body)?;
        let now = models::now();
        let book = diesel::insert_into(books::table)
            .values(&NewBook {
                title,
                body,
                user_id: owner.id,
                created_at: now,
                updated_at: now,
            })
            .returning(Book::as_returning())
            .get_result(conn)?;
        tracing::info!(book_id = book.id, user_id = owner.id, "created book");
        Ok(book)
    }

    pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<Book> {
        books::table
            .find(id)
            .select(Book::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::NotFound("book"))
    }

    /// Every book, newest first.
    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<Book>> {
        Ok(books::table
            .order((books::created_at.desc(), books::id.desc()))
            .select(Book::as_select())
            .load(conn)?)
    }

    pub fn by_user(conn: &mut SqliteConnection, owner: &User) -> Result<Vec<Book>> {
        Ok(Book::belonging_to(owner)
            .order(books::id.desc())
            .select(Book::as_select())
            .load(conn)?)
    }

    pub fn owner(&self, conn: &mut SqliteConnection) -> Result<User> {
        User::find(conn, self.user_id)
    }

    pub fn update(&self, conn: &mut SqliteConnection, title: &str, body: &str) -> Result<Book> {
        validate(title, body)?;
        let book = diesel::update(self)
            .set((
                books::title.eq(title),
                books::body.eq(body),
                books::updated_at.eq(models::now()),
            ))
            .returning(Book::as_returning())
            .get_result(conn)?;
        tracing::info!(book_id = book.id, "updated book");
        Ok(book)
    }

    /// Deletes the book together with its favorites and comments.
    pub fn destroy(self, conn: &mut SqliteConnection) -> Result<()> {
        conn.transaction(|conn| -> Result<()> {
            diesel::delete(favorites::table.filter(favorites::book_id.eq(self.id)))
                .execute(conn)?;
            diesel::delete(book_comments::table.filter(book_comments::book_id.eq(self.id)))
                .execute(conn)?;
            diesel::delete(&self).execute(conn)?;
            Ok(())
        })?;
        tracing::info!(book_id = self.id, "destroyed book");
        Ok(())
    }
}
