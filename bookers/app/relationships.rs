//! The follow graph: one `relationships` edge table read in two directions.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::{Error, Result, ValidationErrors};
use crate::models::{self, NewRelationship, Relationship, User};
use crate::schema::{relationships, users};

impl User {
    /// Makes `self` follow `target_id`. Following someone already followed
    /// returns the existing edge.
    pub fn follow(&self, conn: &mut SqliteConnection, target_id: i32) -> Result<Relationship> {
        if target_id == self.id {
            return Err(ValidationErrors::single("followed_id", "can't be yourself").into());
        }
        User::find(conn, target_id)?;

        let now = models::now();
        let inserted = diesel::insert_into(relationships::table)
            .values(&NewRelationship {
                follower_id: self.id,
                followed_id: target_id,
                created_at: now,
                updated_at: now,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        let edge = relationships::table
            .filter(relationships::follower_id.eq(self.id))
            .filter(relationships::followed_id.eq(target_id))
            .select(Relationship::as_select())
            .first(conn)?;
        if inserted > 0 {
            tracing::info!(follower_id = self.id, followed_id = target_id, "followed");
        } else {
            tracing::debug!(follower_id = self.id, followed_id = target_id, "already following");
        }
        Ok(edge)
    }

    /// Removes the edge `self -> target_id`. A missing edge is an error.
    pub fn unfollow(&self, conn: &mut SqliteConnection, target_id: i32) -> Result<()> {
        let edge = relationships::table
            .filter(relationships::follower_id.eq(self.id))
            .filter(relationships::followed_id.eq(target_id))
            .select(Relationship::as_select())
            .first(conn)
            .optional()?
            .ok_or(Error::NotFound("relationship"))?;
        diesel::delete(&edge).execute(conn)?;
        tracing::info!(follower_id = self.id, followed_id = target_id, "unfollowed");
        Ok(())
    }

    pub fn is_following(&self, conn: &mut SqliteConnection, other: &User) -> Result<bool> {
        let edge = relationships::table
            .filter(relationships::follower_id.eq(self.id))
            .filter(relationships::followed_id.eq(other.id));
        Ok(diesel::select(diesel::dsl::exists(edge)).get_result(conn)?)
    }

    /// Users `self` follows, oldest edge first.
    pub fn followings(&self, conn: &mut SqliteConnection) -> Result<Vec<User>> {
        Ok(relationships::table
            .inner_join(users::table.on(users::id.eq(relationships::followed_id)))
            .filter(relationships::follower_id.eq(self.id))
            .order(relationships::id.asc())
            .select(User::as_select())
            .load(conn)?)
    }

    /// Users following `self`, oldest edge first.
    pub fn followers(&self, conn: &mut SqliteConnection) -> Result<Vec<User>> {
        Ok(relationships::table
            .inner_join(users::table.on(users::id.eq(relationships::follower_id)))
            .filter(relationships::followed_id.eq(self.id))
            .order(relationships::id.asc())
            .select(User::as_select())
            .load(conn)?)
    }

    pub fn followings_count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        Ok(relationships::table
            .filter(relationships::follower_id.eq(self.id))
            .count()
            .get_result(conn)?)
    }

    pub fn followers_count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        Ok(relationships::table
            .filter(relationships::followed_id.eq(self.id))
            .count()
            .get_result(conn)?)
    }
}
