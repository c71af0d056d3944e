diesel::table! {
    notes (id) {
        id -> Varchar,
        content -> Text,
        is_encrypted -> Bool,
        created_at -> Timestamp,
        expires_at -> Timestamp,
    }
}
