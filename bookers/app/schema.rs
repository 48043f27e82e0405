diesel::table! {
    book_comments (id) {
        id -> Integer,
        comment -> Text,
        user_id -> Integer,
        book_id -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    books (id) {
        id -> Integer,
        title -> Text,
        body -> Text,
        user_id -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    favorites (id) {
        id -> Integer,
        user_id -> Integer,
        book_id -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    relationships (id) {
        id -> Integer,
        follower_id -> Integer,
        followed_id -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    storage_attachments (id) {
        id -> Integer,
        name -> Text,
        record_type -> Text,
        record_id -> Integer,
        blob_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    storage_blobs (id) {
        id -> Integer,
        key -> Text,
        filename -> Text,
        content_type -> Text,
        byte_size -> BigInt,
        checksum -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        encrypted_password -> Text,
        introduction -> Nullable<Text>,
        reset_password_token -> Nullable<Text>,
        reset_password_sent_at -> Nullable<Timestamp>,
        remember_created_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(book_comments -> books (book_id));
diesel::joinable!(book_comments -> users (user_id));
diesel::joinable!(books -> users (user_id));
diesel::joinable!(favorites -> books (book_id));
diesel::joinable!(favorites -> users (user_id));
diesel::joinable!(storage_attachments -> storage_blobs (blob_id));

diesel::allow_tables_to_appear_in_same_query!(
    book_comments,
    books,
    favorites,
    relationships,
    storage_attachments,
    storage_blobs,
    users,
);
