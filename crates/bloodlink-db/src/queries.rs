use crate::Database;
use crate::models::{
    DonationPostRow, DonationRequestRow, NewDonationPost, NewDonationRequest, NewRequestPost,
    RequestPostRow, UserRow,
};
use anyhow::Result;
use rusqlite::Row;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, created_at FROM users WHERE username = ?1",
            )?;
            let row = stmt
                .query_row([username], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, username, password, created_at FROM users WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    // -- Donation requests --

    pub fn insert_donation_request(&self, req: &NewDonationRequest<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO donation_requests
                    (id, requester_id, name, age, sex, blood_type, content, image_key,
                     location, donation_due_date, donator_registered_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    req.id,
                    req.requester_id,
                    req.name,
                    req.age,
                    req.sex,
                    req.blood_type,
                    req.content,
                    req.image_key,
                    req.location,
                    req.donation_due_date,
                    req.donator_registered_id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_donation_request(&self, id: &str) -> Result<Option<DonationRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DONATION_REQUEST_COLUMNS} FROM donation_requests d WHERE d.id = ?1"
            ))?;
            let row = stmt.query_row([id], map_donation_request).optional()?;
            Ok(row)
        })
    }

    // -- Board: donation cards --

    pub fn insert_donation_post(&self, post: &NewDonationPost<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO donation_posts
                    (id, donor_id, image_key, blood_type, age, sex, region, introduction)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    post.id,
                    post.donor_id,
                    post.image_key,
                    post.blood_type,
                    post.age,
                    post.sex,
                    post.region,
                    post.introduction,
                ],
            )?;
            Ok(())
        })
    }

    /// Newest cards first, poster username joined in.
    pub fn list_donation_posts(&self, limit: u32) -> Result<Vec<DonationPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.donor_id, u.username, p.image_key, p.blood_type,
                        p.age, p.sex, p.region, p.introduction, p.created_at
                 FROM donation_posts p
                 JOIN users u ON p.donor_id = u.id
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_donation_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_donation_post(&self, id: &str) -> Result<Option<DonationPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.donor_id, u.username, p.image_key, p.blood_type,
                        p.age, p.sex, p.region, p.introduction, p.created_at
                 FROM donation_posts p
                 JOIN users u ON p.donor_id = u.id
                 WHERE p.id = ?1",
            )?;
            let row = stmt.query_row([id], map_donation_post).optional()?;
            Ok(row)
        })
    }

    // -- Board: request cards --

    pub fn insert_request_post(&self, post: &NewRequestPost<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO request_posts
                    (id, requester_id, image_key, blood_type, region, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    post.id,
                    post.requester_id,
                    post.image_key,
                    post.blood_type,
                    post.region,
                    post.reason,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_request_posts(&self, limit: u32) -> Result<Vec<RequestPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.requester_id, u.username, p.image_key, p.blood_type,
                        p.region, p.reason, p.created_at
                 FROM request_posts p
                 JOIN users u ON p.requester_id = u.id
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_request_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_request_post(&self, id: &str) -> Result<Option<RequestPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.requester_id, u.username, p.image_key, p.blood_type,
                        p.region, p.reason, p.created_at
                 FROM request_posts p
                 JOIN users u ON p.requester_id = u.id
                 WHERE p.id = ?1",
            )?;
            let row = stmt.query_row([id], map_request_post).optional()?;
            Ok(row)
        })
    }
}

/// Column list shared with the matching query so both map rows identically.
pub(crate) const DONATION_REQUEST_COLUMNS: &str =
    "d.id, d.requester_id, d.name, d.age, d.sex, d.blood_type, d.content, d.image_key, \
     d.location, d.donation_due_date, d.donator_registered_id, d.status, d.created_at";

pub(crate) fn map_donation_request(row: &Row<'_>) -> rusqlite::Result<DonationRequestRow> {
    Ok(DonationRequestRow {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        sex: row.get(4)?,
        blood_type: row.get(5)?,
        content: row.get(6)?,
        image_key: row.get(7)?,
        location: row.get(8)?,
        donation_due_date: row.get(9)?,
        donator_registered_id: row.get(10)?,
        status: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn map_donation_post(row: &Row<'_>) -> rusqlite::Result<DonationPostRow> {
    Ok(DonationPostRow {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        donor_username: row.get(2)?,
        image_key: row.get(3)?,
        blood_type: row.get(4)?,
        age: row.get(5)?,
        sex: row.get(6)?,
        region: row.get(7)?,
        introduction: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_request_post(row: &Row<'_>) -> rusqlite::Result<RequestPostRow> {
    Ok(RequestPostRow {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        requester_username: row.get(2)?,
        image_key: row.get(3)?,
        blood_type: row.get(4)?,
        region: row.get(5)?,
        reason: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "argon2-hash").unwrap();
        id
    }

    #[test]
    fn usernames_are_unique() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "donor");
        let dup = db.create_user(&Uuid::new_v4().to_string(), "donor", "other-hash");
        assert!(dup.is_err());
    }

    #[test]
    fn donation_request_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let requester = user(&db, "requester");
        let id = Uuid::new_v4().to_string();
        db.insert_donation_request(&NewDonationRequest {
            id: &id,
            requester_id: &requester,
            name: "John Doe",
            age: 35,
            sex: "M",
            blood_type: "A-",
            content: "Emergency blood donation needed",
            image_key: None,
            location: "Seoul",
            donation_due_date: "2025-05-13",
            donator_registered_id: "123456-7890",
        })
        .unwrap();

        let row = db.get_donation_request(&id).unwrap().unwrap();
        assert_eq!(row.requester_id, requester);
        assert_eq!(row.blood_type, "A-");
        assert_eq!(row.status, "open");
        assert_eq!(row.donation_due_date, "2025-05-13");

        assert!(db.get_donation_request("missing").unwrap().is_none());
    }

    #[test]
    fn board_lists_newest_first_with_usernames() {
        let db = Database::open_in_memory().unwrap();
        let donor = user(&db, "donor");

        let first = Uuid::new_v4().to_string();
        let second = Uuid::new_v4().to_string();
        for (id, region) in [(&first, "Seoul"), (&second, "Busan")] {
            db.insert_donation_post(&NewDonationPost {
                id,
                donor_id: &donor,
                image_key: None,
                blood_type: "O+",
                age: 28,
                sex: "F",
                region,
                introduction: "happy to help",
            })
            .unwrap();
        }

        let posts = db.list_donation_posts(50).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, second);
        assert_eq!(posts[0].donor_username, "donor");
        assert_eq!(posts[1].id, first);
    }

    #[test]
    fn request_posts_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let requester = user(&db, "requester");
        let id = Uuid::new_v4().to_string();
        db.insert_request_post(&NewRequestPost {
            id: &id,
            requester_id: &requester,
            image_key: Some("abc.jpg"),
            blood_type: "AB-",
            region: "Incheon",
            reason: "surgery scheduled",
        })
        .unwrap();

        let row = db.get_request_post(&id).unwrap().unwrap();
        assert_eq!(row.requester_username, "requester");
        assert_eq!(row.image_key.as_deref(), Some("abc.jpg"));

        let listed = db.list_request_posts(10).unwrap();
        assert_eq!(listed.len(), 1);
    }
}
