use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::{Error, Result};
use crate::models::{self, Book, Favorite, NewFavorite, User};
use crate::schema::favorites;

impl User {
    /// Idempotent: favoriting twice returns the same row.
    pub fn favorite(&self, conn: &mut SqliteConnection, book: &Book) -> Result<Favorite> {
        let now = models::now();
        diesel::insert_into(favorites::table)
            .values(&NewFavorite {
                user_id: self.id,
                book_id: book.id,
                created_at: now,
                updated_at: now,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        let favorite = favorites::table
            .filter(favorites::user_id.eq(self.id))
            .filter(favorites::book_id.eq(book.id))
            .select(Favorite::as_select())
            .first(conn)?;
        tracing::debug!(user_id = self.id, book_id = book.id, "favorited");
        Ok(favorite)
    }

    pub fn unfavorite(&self, conn: &mut SqliteConnection, book: &Book) -> Result<()> {
        let deleted = diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(self.id))
                .filter(favorites::book_id.eq(book.id)),
        )
        .execute(conn)?;
        if deleted == 0 {
            return Err(Error::NotFound("favorite"));
        }
        tracing::debug!(user_id = self.id, book_id = book.id, "unfavorited");
        Ok(())
    }
}

impl Book {
    pub fn is_favorited_by(&self, conn: &mut SqliteConnection, user: &User) -> Result<bool> {
        let favorite = Favorite::belonging_to(self).filter(favorites::user_id.eq(user.id));
        Ok(diesel::select(diesel::dsl::exists(favorite)).get_result(conn)?)
    }

    pub fn favorites_count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        Ok(Favorite::belonging_to(self).count().get_result(conn)?)
    }
}
