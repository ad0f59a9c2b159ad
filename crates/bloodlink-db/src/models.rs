//! Database row types — these map directly to SQLite rows.
//! Distinct from the bloodlink-types API models to keep the DB layer
//! independent; enums and dates travel as the TEXT the schema stores.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct DonationRequestRow {
    pub id: String,
    pub requester_id: String,
    pub name: String,
    pub age: i64,
    pub sex: String,
    pub blood_type: String,
    pub content: String,
    pub image_key: Option<String>,
    pub location: String,
    pub donation_due_date: String,
    pub donator_registered_id: String,
    pub status: String,
    pub created_at: String,
}

pub struct NewDonationRequest<'a> {
    pub id: &'a str,
    pub requester_id: &'a str,
    pub name: &'a str,
    pub age: i64,
    pub sex: &'a str,
    pub blood_type: &'a str,
    pub content: &'a str,
    pub image_key: Option<&'a str>,
    pub location: &'a str,
    pub donation_due_date: &'a str,
    pub donator_registered_id: &'a str,
}

pub struct DonationPostRow {
    pub id: String,
    pub donor_id: String,
    pub donor_username: String,
    pub image_key: Option<String>,
    pub blood_type: String,
    pub age: i64,
    pub sex: String,
    pub region: String,
    pub introduction: String,
    pub created_at: String,
}

pub struct NewDonationPost<'a> {
    pub id: &'a str,
    pub donor_id: &'a str,
    pub image_key: Option<&'a str>,
    pub blood_type: &'a str,
    pub age: i64,
    pub sex: &'a str,
    pub region: &'a str,
    pub introduction: &'a str,
}

pub struct RequestPostRow {
    pub id: String,
    pub requester_id: String,
    pub requester_username: String,
    pub image_key: Option<String>,
    pub blood_type: String,
    pub region: String,
    pub reason: String,
    pub created_at: String,
}

pub struct NewRequestPost<'a> {
    pub id: &'a str,
    pub requester_id: &'a str,
    pub image_key: Option<&'a str>,
    pub blood_type: &'a str,
    pub region: &'a str,
    pub reason: &'a str,
}
