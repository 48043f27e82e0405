use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::*;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub encrypted_password: String,
    pub introduction: Option<String>,
    #[serde(skip)]
    pub reset_password_token: Option<String>,
    #[serde(skip)]
    pub reset_password_sent_at: Option<NaiveDateTime>,
    #[serde(skip)]
    pub remember_created_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub encrypted_password: &'a str,
    pub introduction: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = books)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = books)]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A follow edge: `follower_id` follows `followed_id`.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = relationships)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Relationship {
    pub id: i32,
    pub follower_id: i32,
    pub followed_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = relationships)]
pub struct NewRelationship {
    pub follower_id: i32,
    pub followed_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = favorites)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Book))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Favorite {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = favorites)]
pub struct NewFavorite {
    pub user_id: i32,
    pub book_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = book_comments)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Book))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookComment {
    pub id: i32,
    pub comment: String,
    pub user_id: i32,
    pub book_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = book_comments)]
pub struct NewBookComment<'a> {
    pub comment: &'a str,
    pub user_id: i32,
    pub book_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = storage_blobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Blob {
    pub id: i32,
    pub key: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub checksum: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = storage_blobs)]
pub struct NewBlob<'a> {
    pub key: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub byte_size: i64,
    pub checksum: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = storage_attachments)]
#[diesel(belongs_to(Blob))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Attachment {
    pub id: i32,
    pub name: String,
    pub record_type: String,
    pub record_id: i32,
    pub blob_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = storage_attachments)]
pub struct NewAttachment<'a> {
    pub name: &'a str,
    pub record_type: &'a str,
    pub record_id: i32,
    pub blob_id: i32,
    pub created_at: NaiveDateTime,
}

pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
