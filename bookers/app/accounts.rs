use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};

use crate::auth;
use crate::error::{taken_on_conflict, Error, Result, ValidationErrors};
use crate::models::{self, NewUser, User};
use crate::schema::{book_comments, books, favorites, relationships, users};
use crate::storage::{self, DiskService};
use crate::validation;

pub const GUEST_NAME: &str = "guestuser";
pub const GUEST_EMAIL: &str = "guest@example.com";

/// Attachment slot holding the avatar.
pub const PROFILE_IMAGE: &str = "profile_image";
pub const RECORD_TYPE: &str = "User";

#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub introduction: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub name: Option<&'a str>,
    /// `Some(None)` clears the introduction.
    pub introduction: Option<Option<&'a str>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct ProfileChangeset<'a> {
    name: Option<&'a str>,
    introduction: Option<Option<&'a str>>,
    updated_at: chrono::NaiveDateTime,
}

fn name_taken(conn: &mut SqliteConnection, name: &str, except: Option<i32>) -> Result<bool> {
    let mut query: users::BoxedQuery<'_, Sqlite> =
        users::table.filter(users::name.eq(name)).into_boxed();
    if let Some(id) = except {
        query = query.filter(users::id.ne(id));
    }
    Ok(diesel::select(diesel::dsl::exists(query)).get_result(conn)?)
}

fn email_taken(conn: &mut SqliteConnection, email: &str) -> Result<bool> {
    Ok(
        diesel::select(diesel::dsl::exists(users::table.filter(users::email.eq(email))))
            .get_result(conn)?,
    )
}

impl User {
    pub fn find(conn: &mut SqliteConnection, id: i32) -> Result<User> {
        users::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::NotFound("user"))
    }

    pub fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<User>> {
        Ok(users::table
            .filter(users::name.eq(name))
            .select(User::as_select())
            .first(conn)
            .optional()?)
    }

    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<User>> {
        Ok(users::table
            .order(users::id.asc())
            .select(User::as_select())
            .load(conn)?)
    }

    /// Validates and inserts a new account. Nothing is written when any
    /// field is rejected.
    pub fn register(conn: &mut SqliteConnection, reg: &Registration<'_>) -> Result<User> {
        let email = validation::normalize_email(reg.email);
        let mut errors = ValidationErrors::new();
        validation::name(&mut errors, reg.name);
        validation::email(&mut errors, &email);
        validation::password(&mut errors, reg.password);
        validation::introduction(&mut errors, reg.introduction);
        if !errors.contains("name") && name_taken(conn, reg.name, None)? {
            errors.add("name", "has already been taken");
        }
        if !errors.contains("email") && email_taken(conn, &email)? {
            errors.add("email", "has already been taken");
        }
        errors.into_result()?;

        let digest = auth::hash_password(reg.password)?;
        let now = models::now();
        let new_user = NewUser {
            name: reg.name,
            email: &email,
            encrypted_password: &digest,
            introduction: reg.introduction,
            created_at: now,
            updated_at: now,
        };
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(|e| taken_on_conflict(e, &["name", "email"]))?;
        tracing::info!(user_id = user.id, name = %user.name, "registered user");
        Ok(user)
    }

    /// The shared demo account. Repeated calls return the same row.
    pub fn guest(conn: &mut SqliteConnection) -> Result<User> {
        conn.immediate_transaction(|conn| -> Result<User> {
            let lookup = || {
                users::table
                    .filter(users::name.eq(GUEST_NAME))
                    .filter(users::email.eq(GUEST_EMAIL))
                    .select(User::as_select())
            };
            if let Some(user) = lookup().first(conn).optional()? {
                return Ok(user);
            }

            let digest = auth::hash_password(&auth::random_token(16))?;
            let now = models::now();
            let new_user = NewUser {
                name: GUEST_NAME,
                email: GUEST_EMAIL,
                encrypted_password: &digest,
                introduction: None,
                created_at: now,
                updated_at: now,
            };
            let inserted = diesel::insert_into(users::table)
                .values(&new_user)
                .on_conflict_do_nothing()
                .execute(conn)?;
            let user = match lookup().first(conn).optional()? {
                Some(user) => user,
                // A regular account already holds one of the guest keys.
                None if name_taken(conn, GUEST_NAME, None)? => {
                    return Err(ValidationErrors::single("name", "has already been taken").into())
                }
                None => {
                    return Err(ValidationErrors::single("email", "has already been taken").into())
                }
            };
            if inserted > 0 {
                tracing::info!(user_id = user.id, "created guest user");
            }
            Ok(user)
        })
    }

    pub fn is_guest(&self) -> bool {
        self.name == GUEST_NAME && self.email == GUEST_EMAIL
    }

    pub fn update_profile(
        &self,
        conn: &mut SqliteConnection,
        changes: &ProfileChanges<'_>,
    ) -> Result<User> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = changes.name {
            validation::name(&mut errors, name);
            if !errors.contains("name") && name_taken(conn, name, Some(self.id))? {
                errors.add("name", "has already been taken");
            }
        }
        if let Some(introduction) = changes.introduction {
            validation::introduction(&mut errors, introduction);
        }
        errors.into_result()?;

        let changeset = ProfileChangeset {
            name: changes.name,
            introduction: changes.introduction,
            updated_at: models::now(),
        };
        let user = diesel::update(self)
            .set(&changeset)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(|e| taken_on_conflict(e, &["name"]))?;
        tracing::info!(user_id = user.id, "updated profile");
        Ok(user)
    }

    /// Deletes the account with its books (and their favorites and
    /// comments), both directions of its follow edges, its favorites, its
    /// comments and its profile image.
    pub fn destroy(self, conn: &mut SqliteConnection, disk: &DiskService) -> Result<()> {
        let purged = conn.transaction(|conn| -> Result<_> {
            let owned_books = || {
                books::table
                    .filter(books::user_id.eq(self.id))
                    .select(books::id)
            };
            diesel::delete(favorites::table.filter(favorites::book_id.eq_any(owned_books())))
                .execute(conn)?;
            diesel::delete(
                book_comments::table.filter(book_comments::book_id.eq_any(owned_books())),
            )
            .execute(conn)?;
            let book_count = diesel::delete(books::table.filter(books::user_id.eq(self.id)))
                .execute(conn)?;
            diesel::delete(favorites::table.filter(favorites::user_id.eq(self.id)))
                .execute(conn)?;
            diesel::delete(book_comments::table.filter(book_comments::user_id.eq(self.id)))
                .execute(conn)?;
            let edge_count = diesel::delete(
                relationships::table.filter(
                    relationships::follower_id
                        .eq(self.id)
                        .or(relationships::followed_id.eq(self.id)),
                ),
            )
            .execute(conn)?;
            let purged = storage::detach_all(conn, RECORD_TYPE, self.id)?;
            diesel::delete(&self).execute(conn)?;
            tracing::info!(user_id = self.id, book_count, edge_count, "destroyed user");
            Ok(purged)
        })?;
        for blob in &purged {
            disk.delete_blob(&blob.key)?;
        }
        Ok(())
    }
}
